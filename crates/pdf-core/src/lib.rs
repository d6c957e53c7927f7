//! PDF Core - Low-level PDF writing
//!
//! This crate provides functionality for:
//! - Building a new PDF document on a fixed page size
//! - Embedding a TrueType font (Type0 / Identity-H)
//! - Inserting text at specific coordinates
//! - Inserting images (JPEG, PNG)
//! - Stream compression and password protection (Standard security handler)
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{PageSize, PdfDocument, Permissions, Protection};
//!
//! let mut doc = PdfDocument::new(PageSize::A4);
//! doc.add_font("body", &std::fs::read("fonts/Courier.ttf")?)?;
//! doc.set_font("body", 10.0)?;
//! let page = doc.add_page()?;
//! doc.insert_text("Hello, World!", page, 40.0, 60.0)?;
//! doc.set_protection(Protection::new("user", "owner", Permissions::PRINT));
//! doc.save("output.pdf")?;
//! ```

mod document;
mod font;
mod image;
mod security;
mod text;

pub use document::PdfDocument;
pub use font::FontData;
pub use image::ImageXObject;
pub use security::{rc4, EncryptionStrength, Permissions, Protection, SecurityHandler};
pub use text::{generate_text_operators, TextRenderContext};

use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Unknown page size: {0}")]
    UnknownPageSize(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Page dimensions in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A3: PageSize = PageSize {
        width: 841.89,
        height: 1190.55,
    };
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
    pub const A5: PageSize = PageSize {
        width: 419.53,
        height: 595.28,
    };
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
    pub const LEGAL: PageSize = PageSize {
        width: 612.0,
        height: 1008.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

impl FromStr for PageSize {
    type Err = PdfError;

    /// Parse a paper size tag such as `A4` or `letter` (case-insensitive)
    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "A3" => Ok(Self::A3),
            "A4" => Ok(Self::A4),
            "A5" => Ok(Self::A5),
            "LETTER" => Ok(Self::LETTER),
            "LEGAL" => Ok(Self::LEGAL),
            _ => Err(PdfError::UnknownPageSize(tag.to_string())),
        }
    }
}
