//! Statement rendering pipeline
//!
//! Turns monthly account-statement text files into password-protected,
//! paginated PDFs and keeps the results in an existence-based disk cache:
//!
//! - [`naming`]: where the text input and PDF output of a statement live
//! - [`source`]: reading a statement file into lines
//! - [`compositor`]: laying lines out as [`DrawOperation`]s
//! - [`canvas`] / [`pdf_canvas`]: the drawing capability and its PDF adapter
//! - [`renderer`]: applying a composition to a canvas
//! - [`cache`]: Miss / Hit / ForcedMiss decisions and atomic artifact writes
//!
//! # Example
//!
//! ```ignore
//! use statement::{RenderCache, RenderConfig, RenderRequest, StatementKey};
//! use std::sync::Arc;
//!
//! let config = Arc::new(RenderConfig::load("conf.json")?);
//! config.validate()?;
//! let cache = RenderCache::new(config);
//! let key = StatementKey::new("1234567", "202401".parse()?);
//! let artifact = cache.fetch(&RenderRequest::new(key))?;
//! println!("{} ({:?})", artifact.path.display(), artifact.state);
//! ```

pub mod cache;
pub mod cancel;
pub mod canvas;
pub mod compositor;
pub mod config;
pub mod naming;
pub mod pdf_canvas;
pub mod renderer;
pub mod source;

pub use cache::{CacheState, CachedArtifact, Render, RenderCache, StatementPipeline};
pub use cancel::Cancellation;
pub use canvas::{Canvas, DocumentSettings, RecordingCanvas};
pub use compositor::{Composition, DrawOperation, PageCompositor};
pub use config::{BackgroundImage, Encryption, PaperSize, RenderConfig};
pub use naming::{KeyError, PathResolver, Period, StatementKey, StatementPaths};
pub use pdf_canvas::PdfCanvas;
pub use renderer::{DocumentRenderer, RenderRequest};
pub use source::read_lines;

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the pipeline to its caller
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("statement input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Failures while driving the drawing capability
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font error: {0}")]
    Font(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("render cancelled")]
    Cancelled,
}

/// Configuration that cannot be loaded or is out of range
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for statement operations
pub type Result<T> = std::result::Result<T, StatementError>;
