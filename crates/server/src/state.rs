//! Application state shared by every handler

use statement::{RenderCache, RenderConfig};
use std::sync::Arc;
use std::time::Duration;

/// Extra time a whole request may take beyond the render timeout
const REQUEST_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cache: RenderCache,
    render_timeout: Duration,
}

impl AppState {
    pub fn new(config: Arc<RenderConfig>, render_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cache: RenderCache::new(config),
                render_timeout,
            }),
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.inner.cache
    }

    /// Budget for one render before it is cancelled
    pub fn render_timeout(&self) -> Duration {
        self.inner.render_timeout
    }

    /// Budget for a whole request, render and file read included
    pub fn request_timeout(&self) -> Duration {
        self.inner.render_timeout + REQUEST_GRACE
    }
}
