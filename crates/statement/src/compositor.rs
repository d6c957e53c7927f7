//! Page layout: statement lines to draw operations
//!
//! The compositor only decides *what* goes on which page. Positions are in
//! points from the top-left corner; the vertical cursor is owned by whoever
//! applies the operations.

use crate::config::{BackgroundImage, RenderConfig};
use std::path::PathBuf;
use tracing::warn;

/// Form feed, the page-break sentinel of statement files
pub const FORM_FEED: char = '\u{0C}';

/// One drawing instruction, independent of any PDF library
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOperation {
    /// Draw `content` at the current vertical cursor, `x` points from the left
    Text { content: String, x: f64 },
    /// Move the vertical cursor down by `height`
    LineBreak { height: f64 },
    /// Start a new page with the cursor at `top`
    PageBreak { top: f64 },
    /// Draw an image at its natural size with its top-left corner at (`x`, `y`)
    Image { path: PathBuf, x: f64, y: f64 },
}

/// The draw operations of one document
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Vertical cursor on the first page
    pub first_page_top: f64,
    pub operations: Vec<DrawOperation>,
}

impl Composition {
    pub fn page_count(&self) -> usize {
        1 + self
            .operations
            .iter()
            .filter(|op| matches!(op, DrawOperation::PageBreak { .. }))
            .count()
    }

    /// Text contents grouped by page
    pub fn pages(&self) -> Vec<Vec<&str>> {
        let mut pages = vec![Vec::new()];
        for op in &self.operations {
            match op {
                DrawOperation::PageBreak { .. } => pages.push(Vec::new()),
                DrawOperation::Text { content, .. } => {
                    if let Some(page) = pages.last_mut() {
                        page.push(content.as_str());
                    }
                }
                _ => {}
            }
        }
        pages
    }
}

/// True for lines that mark a page break
pub fn is_page_break(line: &str) -> bool {
    line.contains(FORM_FEED)
}

/// Lays out statement lines according to a [`RenderConfig`]
#[derive(Debug)]
pub struct PageCompositor<'a> {
    config: &'a RenderConfig,
    background: Option<BackgroundImage>,
}

impl<'a> PageCompositor<'a> {
    /// An unusable background image setting disables the image with a warning
    pub fn new(config: &'a RenderConfig) -> Self {
        let background = config.background().unwrap_or_else(|err| {
            warn!(error = %err, "background image skipped");
            None
        });
        Self { config, background }
    }

    pub fn compose<S: AsRef<str>>(&self, lines: &[S]) -> Composition {
        let line_height = self.config.line_height();
        let mut operations = Vec::with_capacity(lines.len() * 2 + 8);

        self.push_background(&mut operations);
        for header in &self.config.header {
            push_line(&mut operations, header, 0.0, line_height);
        }

        let mut body_started = false;
        for line in lines {
            let line = line.as_ref();
            if is_page_break(line) {
                if self.config.skip_leading_form_feed && !body_started {
                    continue;
                }
                operations.push(DrawOperation::PageBreak {
                    top: self.config.continuation_offset(),
                });
                self.push_background(&mut operations);
            } else {
                push_line(
                    &mut operations,
                    line,
                    self.config.text_horizontal_offset,
                    line_height,
                );
                body_started = true;
            }
        }

        for footer in &self.config.footer {
            push_line(&mut operations, footer, 0.0, line_height);
        }

        Composition {
            first_page_top: self.config.text_vertical_offset,
            operations,
        }
    }

    fn push_background(&self, operations: &mut Vec<DrawOperation>) {
        if let Some(image) = &self.background {
            operations.push(DrawOperation::Image {
                path: image.path.clone(),
                x: image.x,
                y: image.y,
            });
        }
    }
}

fn push_line(operations: &mut Vec<DrawOperation>, content: &str, x: f64, height: f64) {
    operations.push(DrawOperation::Text {
        content: content.to_string(),
        x,
    });
    operations.push(DrawOperation::LineBreak { height });
}
