//! [`Canvas`] backed by `pdf_core::PdfDocument`

use crate::canvas::{Canvas, DocumentSettings};
use crate::RenderError;
use pdf_core::{PdfDocument, PdfError, Protection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

const FONT_NAME: &str = "statement";

/// Draws into a protected PDF document
#[derive(Debug, Default)]
pub struct PdfCanvas {
    doc: Option<PdfDocument>,
    compression: Option<u32>,
    page: usize,
    cursor_y: f64,
    /// Distance from the top of a text line to its baseline
    ascent: f64,
    images: HashMap<PathBuf, Vec<u8>>,
}

fn not_started() -> RenderError {
    RenderError::Pdf(PdfError::SaveError("document not started".to_string()))
}

impl PdfCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn doc_mut(&mut self) -> Result<&mut PdfDocument, RenderError> {
        self.doc.as_mut().ok_or_else(not_started)
    }

    fn image_bytes(&mut self, path: &Path) -> Result<&[u8], RenderError> {
        if !self.images.contains_key(path) {
            let bytes = std::fs::read(path)
                .map_err(|e| RenderError::Image(format!("{}: {e}", path.display())))?;
            self.images.insert(path.to_path_buf(), bytes);
        }
        Ok(self.images.get(path).map(Vec::as_slice).unwrap_or_default())
    }
}

impl Canvas for PdfCanvas {
    fn start_document(&mut self, settings: &DocumentSettings) -> Result<(), RenderError> {
        let mut doc = PdfDocument::new(settings.page_size);
        doc.set_title(&settings.title);
        doc.set_protection(
            Protection::new(
                &settings.user_password,
                &settings.owner_password,
                settings.permissions,
            )
            .with_strength(settings.strength),
        );
        if let Some(level) = self.compression {
            doc.set_compression(level);
        }
        self.doc = Some(doc);
        self.page = 0;
        Ok(())
    }

    fn set_compression(&mut self, level: u32) {
        self.compression = Some(level);
        if let Some(doc) = self.doc.as_mut() {
            doc.set_compression(level);
        }
    }

    fn set_font(&mut self, font_file: &Path, size: f64) -> Result<(), RenderError> {
        let font_error = |e: &dyn std::fmt::Display| {
            RenderError::Font(format!("{}: {e}", font_file.display()))
        };
        let data = std::fs::read(font_file).map_err(|e| font_error(&e))?;
        let doc = self.doc_mut()?;
        doc.add_font(FONT_NAME, &data).map_err(|e| font_error(&e))?;
        doc.set_font(FONT_NAME, size as f32).map_err(|e| font_error(&e))?;
        self.ascent = doc.current_ascent().map_err(|e| font_error(&e))?;
        Ok(())
    }

    fn add_page(&mut self, top: f64) -> Result<(), RenderError> {
        self.page = self.doc_mut()?.add_page()?;
        self.cursor_y = top;
        Ok(())
    }

    fn draw_text(&mut self, x: f64, text: &str) -> Result<(), RenderError> {
        let (page, baseline) = (self.page, self.cursor_y + self.ascent);
        match self.doc_mut()?.insert_text(text, page, x, baseline) {
            Err(PdfError::FontNotFound(name)) => {
                Err(RenderError::Font(format!("no font selected ({name})")))
            }
            other => Ok(other?),
        }
    }

    fn line_break(&mut self, height: f64) {
        self.cursor_y += height;
    }

    fn place_image(&mut self, path: &Path, x: f64, y: f64) -> Result<(), RenderError> {
        let page = self.page;
        let data = self.image_bytes(path)?.to_vec();
        self.doc_mut()?
            .insert_image(&data, page, x, y)
            .map_err(|e| RenderError::Image(format!("{}: {e}", path.display())))
    }

    fn finish(&mut self) -> Result<Vec<u8>, RenderError> {
        let doc = self.doc.take().ok_or_else(not_started)?;
        if let Ok(missing) = doc.missing_chars() {
            if !missing.is_empty() {
                warn!(
                    count = missing.len(),
                    chars = ?missing,
                    "characters without a glyph in the font"
                );
            }
        }
        Ok(doc.to_bytes()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_core::{EncryptionStrength, PageSize, Permissions};

    fn settings() -> DocumentSettings {
        DocumentSettings {
            page_size: PageSize::A4,
            user_password: "1234".to_string(),
            owner_password: "fds123".to_string(),
            permissions: Permissions::PRINT | Permissions::COPY | Permissions::MODIFY,
            strength: EncryptionStrength::Rc4_128,
            title: "1234567.202401".to_string(),
        }
    }

    #[test]
    fn test_missing_font_file() {
        let mut canvas = PdfCanvas::new();
        canvas.start_document(&settings()).unwrap();
        assert!(matches!(
            canvas.set_font(Path::new("/nonexistent/font.ttf"), 10.0),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn test_invalid_font_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let mut canvas = PdfCanvas::new();
        canvas.start_document(&settings()).unwrap();
        assert!(matches!(
            canvas.set_font(&path, 10.0),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn test_text_without_font_is_a_font_error() {
        let mut canvas = PdfCanvas::new();
        canvas.start_document(&settings()).unwrap();
        canvas.add_page(0.0).unwrap();
        assert!(matches!(
            canvas.draw_text(0.0, "x"),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn test_missing_image_file() {
        let mut canvas = PdfCanvas::new();
        canvas.start_document(&settings()).unwrap();
        canvas.add_page(0.0).unwrap();
        assert!(matches!(
            canvas.place_image(Path::new("/nonexistent/bg.png"), 0.0, 0.0),
            Err(RenderError::Image(_))
        ));
    }

    #[test]
    fn test_drawing_before_start() {
        let mut canvas = PdfCanvas::new();
        assert!(matches!(canvas.add_page(0.0), Err(RenderError::Pdf(_))));
        assert!(matches!(canvas.finish(), Err(RenderError::Pdf(_))));
    }

    #[test]
    fn test_blank_protected_document() {
        let mut canvas = PdfCanvas::new();
        canvas.set_compression(1);
        canvas.start_document(&settings()).unwrap();
        canvas.add_page(0.0).unwrap();
        canvas.add_page(0.0).unwrap();
        let bytes = canvas.finish().unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&bytes).contains("/Encrypt"));
    }
}
