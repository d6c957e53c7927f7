//! stmtpdf server
//!
//! Serves password-protected statement PDFs rendered from monthly text
//! files, caching each rendered document on disk.

use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes;
pub mod state;

pub use error::{AppError, ErrorResponse};
pub use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/stmt", routes::statements::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.request_timeout()))
        .with_state(state)
}
