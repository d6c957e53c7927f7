//! Applying a composition to a canvas

use crate::cancel::Cancellation;
use crate::canvas::{Canvas, DocumentSettings};
use crate::compositor::{Composition, DrawOperation};
use crate::config::RenderConfig;
use crate::naming::StatementKey;
use crate::RenderError;
use pdf_core::Permissions;
use tracing::debug;

/// One request for a statement document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub key: StatementKey,
    /// User password; the configured default applies when absent
    pub password: Option<String>,
    /// Render even when a cached artifact exists
    pub force_refresh: bool,
}

impl RenderRequest {
    pub fn new(key: StatementKey) -> Self {
        Self {
            key,
            password: None,
            force_refresh: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

/// Drives a [`Canvas`] through a [`Composition`]
#[derive(Debug, Clone, Copy)]
pub struct DocumentRenderer<'a> {
    config: &'a RenderConfig,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    /// Page size, passwords and permissions for `request`
    pub fn settings(&self, request: &RenderRequest) -> DocumentSettings {
        let user_password = request
            .password
            .clone()
            .unwrap_or_else(|| self.config.default_password.clone());
        DocumentSettings {
            page_size: self.config.page_size(),
            user_password,
            owner_password: self.config.owner_password.clone(),
            permissions: Permissions::PRINT | Permissions::COPY | Permissions::MODIFY,
            strength: self.config.encryption.strength(),
            title: request.key.stem(),
        }
    }

    /// Draw every operation and return the finished document bytes
    ///
    /// `cancel` is checked before the document starts, at every page break
    /// and before the document is finished.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        composition: &Composition,
        settings: &DocumentSettings,
        canvas: &mut C,
        cancel: &Cancellation,
    ) -> Result<Vec<u8>, RenderError> {
        cancel.check()?;
        canvas.start_document(settings)?;
        canvas.set_compression(self.config.compress_level);
        canvas.set_font(&self.config.font_file, self.config.font_size_points())?;
        canvas.add_page(composition.first_page_top)?;

        for op in &composition.operations {
            match op {
                DrawOperation::Text { content, x } => canvas.draw_text(*x, content)?,
                DrawOperation::LineBreak { height } => canvas.line_break(*height),
                DrawOperation::PageBreak { top } => {
                    cancel.check()?;
                    canvas.add_page(*top)?;
                }
                DrawOperation::Image { path, x, y } => canvas.place_image(path, *x, *y)?,
            }
        }

        cancel.check()?;
        let bytes = canvas.finish()?;
        debug!(
            title = %settings.title,
            pages = composition.page_count(),
            bytes = bytes.len(),
            "document rendered"
        );
        Ok(bytes)
    }
}
