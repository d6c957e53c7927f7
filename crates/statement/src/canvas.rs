//! The drawing capability the renderer depends on

use crate::compositor::DrawOperation;
use crate::RenderError;
use pdf_core::{EncryptionStrength, PageSize, Permissions};
use std::path::{Path, PathBuf};

/// Page size, protection and metadata of a document about to be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSettings {
    pub page_size: PageSize,
    /// Password needed to open the document
    pub user_password: String,
    /// Password that lifts every restriction
    pub owner_password: String,
    pub permissions: Permissions,
    pub strength: EncryptionStrength,
    pub title: String,
}

/// Narrow page-drawing interface
///
/// Text is drawn at a vertical cursor owned by the canvas: [`Canvas::add_page`]
/// places it, [`Canvas::line_break`] moves it down.
pub trait Canvas {
    fn start_document(&mut self, settings: &DocumentSettings) -> Result<(), RenderError>;

    /// zlib level, 0 to 9
    fn set_compression(&mut self, level: u32);

    fn set_font(&mut self, font_file: &Path, size: f64) -> Result<(), RenderError>;

    /// Start a new page with the cursor `top` points below the top edge
    fn add_page(&mut self, top: f64) -> Result<(), RenderError>;

    /// Draw `text` at the cursor, `x` points from the left edge
    fn draw_text(&mut self, x: f64, text: &str) -> Result<(), RenderError>;

    fn line_break(&mut self, height: f64);

    /// Draw an image at its natural size, top-left corner at (`x`, `y`)
    fn place_image(&mut self, path: &Path, x: f64, y: f64) -> Result<(), RenderError>;

    /// Serialize the finished document
    fn finish(&mut self) -> Result<Vec<u8>, RenderError>;
}

/// A page recorded by [`RecordingCanvas`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedPage {
    pub top: f64,
    pub operations: Vec<DrawOperation>,
}

impl RecordedPage {
    pub fn texts(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                DrawOperation::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Canvas that records what it is asked to draw instead of producing a PDF
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub settings: Option<DocumentSettings>,
    pub compression: Option<u32>,
    pub font: Option<(PathBuf, f64)>,
    pub pages: Vec<RecordedPage>,
    pub finished: bool,
    fail_font: bool,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`Canvas::set_font`] fail, as it would with an unreadable font file
    pub fn failing_font() -> Self {
        Self {
            fail_font: true,
            ..Self::default()
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text drawn, in drawing order
    pub fn texts(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|page| page.texts()).collect()
    }

    fn current_page(&mut self) -> Result<&mut RecordedPage, RenderError> {
        self.pages
            .last_mut()
            .ok_or(RenderError::Pdf(pdf_core::PdfError::InvalidPage(0, 0)))
    }
}

impl Canvas for RecordingCanvas {
    fn start_document(&mut self, settings: &DocumentSettings) -> Result<(), RenderError> {
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn set_compression(&mut self, level: u32) {
        self.compression = Some(level);
    }

    fn set_font(&mut self, font_file: &Path, size: f64) -> Result<(), RenderError> {
        if self.fail_font {
            return Err(RenderError::Font(format!(
                "{}: cannot load font",
                font_file.display()
            )));
        }
        self.font = Some((font_file.to_path_buf(), size));
        Ok(())
    }

    fn add_page(&mut self, top: f64) -> Result<(), RenderError> {
        self.pages.push(RecordedPage {
            top,
            operations: Vec::new(),
        });
        Ok(())
    }

    fn draw_text(&mut self, x: f64, text: &str) -> Result<(), RenderError> {
        self.current_page()?.operations.push(DrawOperation::Text {
            content: text.to_string(),
            x,
        });
        Ok(())
    }

    fn line_break(&mut self, height: f64) {
        if let Ok(page) = self.current_page() {
            page.operations.push(DrawOperation::LineBreak { height });
        }
    }

    fn place_image(&mut self, path: &Path, x: f64, y: f64) -> Result<(), RenderError> {
        self.current_page()?.operations.push(DrawOperation::Image {
            path: path.to_path_buf(),
            x,
            y,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, RenderError> {
        self.finished = true;
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            out.push_str(&format!("page {}\n", i + 1));
            for text in page.texts() {
                out.push_str(text);
                out.push('\n');
            }
        }
        Ok(out.into_bytes())
    }
}
