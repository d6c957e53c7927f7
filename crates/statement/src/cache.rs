//! Existence-based render cache
//!
//! A cached PDF is valid for as long as it exists. Nothing compares it with
//! the current configuration; `force_refresh` is the only way to replace it.

use crate::cancel::Cancellation;
use crate::compositor::PageCompositor;
use crate::config::RenderConfig;
use crate::naming::{PathResolver, StatementPaths};
use crate::pdf_canvas::PdfCanvas;
use crate::renderer::{DocumentRenderer, RenderRequest};
use crate::source::read_lines;
use crate::{Result, StatementError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Decision taken for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No artifact yet; render it
    Miss,
    /// Artifact exists and no refresh was asked for
    Hit,
    /// Refresh requested; render regardless of the artifact
    ForcedMiss,
}

impl CacheState {
    pub fn resolve(exists: bool, force_refresh: bool) -> Self {
        match (force_refresh, exists) {
            (true, _) => CacheState::ForcedMiss,
            (false, true) => CacheState::Hit,
            (false, false) => CacheState::Miss,
        }
    }

    pub fn needs_render(self) -> bool {
        self != CacheState::Hit
    }
}

/// A readable PDF on disk and how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub path: PathBuf,
    pub state: CacheState,
}

/// The render chain invoked on a miss
pub trait Render {
    /// Produce the document bytes for `request`; nothing may be written to
    /// `paths.output`
    fn render(
        &self,
        request: &RenderRequest,
        paths: &StatementPaths,
        cancel: &Cancellation,
    ) -> Result<Vec<u8>>;
}

/// Line source, page compositor and document renderer over a PDF canvas
#[derive(Debug, Clone)]
pub struct StatementPipeline {
    config: Arc<RenderConfig>,
}

impl StatementPipeline {
    pub fn new(config: Arc<RenderConfig>) -> Self {
        Self { config }
    }
}

impl Render for StatementPipeline {
    fn render(
        &self,
        request: &RenderRequest,
        paths: &StatementPaths,
        cancel: &Cancellation,
    ) -> Result<Vec<u8>> {
        let lines = read_lines(&paths.input)?;
        let composition = PageCompositor::new(&self.config).compose(&lines);
        let renderer = DocumentRenderer::new(&self.config);
        let settings = renderer.settings(request);
        let mut canvas = PdfCanvas::new();
        let bytes = renderer.render(&composition, &settings, &mut canvas, cancel)?;
        Ok(bytes)
    }
}

/// Maps statement keys to cached PDFs, rendering on a miss
#[derive(Debug, Clone)]
pub struct RenderCache<R = StatementPipeline> {
    resolver: PathResolver,
    renderer: R,
}

impl RenderCache<StatementPipeline> {
    pub fn new(config: Arc<RenderConfig>) -> Self {
        let resolver = PathResolver::from_config(&config);
        Self::with_renderer(resolver, StatementPipeline::new(config))
    }
}

impl<R: Render> RenderCache<R> {
    pub fn with_renderer(resolver: PathResolver, renderer: R) -> Self {
        Self { resolver, renderer }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn fetch(&self, request: &RenderRequest) -> Result<CachedArtifact> {
        self.fetch_with(request, &Cancellation::new())
    }

    /// Return the cached artifact for `request`, rendering it when needed
    ///
    /// On error no artifact is created or replaced.
    pub fn fetch_with(
        &self,
        request: &RenderRequest,
        cancel: &Cancellation,
    ) -> Result<CachedArtifact> {
        let paths = self.resolver.resolve(&request.key);
        let state = CacheState::resolve(paths.output.is_file(), request.force_refresh);

        if !state.needs_render() {
            debug!(key = %request.key, path = %paths.output.display(), "cache hit");
            return Ok(CachedArtifact {
                path: paths.output,
                state,
            });
        }

        info!(key = %request.key, state = ?state, "rendering statement");
        let bytes = self.renderer.render(request, &paths, cancel)?;
        cancel.check()?;
        write_atomic(&paths.output, &bytes)?;
        info!(
            key = %request.key,
            path = %paths.output.display(),
            bytes = bytes.len(),
            "statement cached"
        );

        Ok(CachedArtifact {
            path: paths.output,
            state,
        })
    }
}

/// Mode of every cached PDF
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// Write through a temporary file in the same directory, then rename
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| {
        warn!(path = %path.display(), error = %source, "failed to write statement");
        StatementError::Write {
            path: path.to_path_buf(),
            source,
        }
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    // Temp files are created 0600; cached PDFs must stay readable to other users
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))
            .map_err(write_error)?;
    }
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
