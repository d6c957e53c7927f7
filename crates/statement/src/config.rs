//! Render configuration loaded from the JSON config file

use crate::ConfigError;
use pdf_core::{EncryptionStrength, PageSize};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Owner secret used when the config file does not set one
pub const DEFAULT_OWNER_PASSWORD: &str = "fds123";

/// Paper size tag (`A3`, `A4`, `A5`, `Letter`, `Legal`), case-insensitive
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct PaperSize(PageSize);

impl PaperSize {
    pub fn page_size(self) -> PageSize {
        self.0
    }
}

impl TryFrom<String> for PaperSize {
    type Error = String;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse::<PageSize>()
            .map(PaperSize)
            .map_err(|e| e.to_string())
    }
}

/// RC4 key length of the protection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Encryption {
    #[serde(rename = "rc4-40")]
    Rc4_40,
    #[default]
    #[serde(rename = "rc4-128")]
    Rc4_128,
}

impl Encryption {
    pub fn strength(self) -> EncryptionStrength {
        match self {
            Encryption::Rc4_40 => EncryptionStrength::Rc4_40,
            Encryption::Rc4_128 => EncryptionStrength::Rc4_128,
        }
    }
}

/// Background image drawn at the same spot on every page
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub path: PathBuf,
    pub x: f64,
    pub y: f64,
}

/// Immutable configuration shared by every stage of the pipeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderConfig {
    /// Directory holding the statement text files
    pub path_to_text: PathBuf,
    /// Directory the rendered PDFs are cached in
    pub path_to_pdf: PathBuf,
    pub font_file: PathBuf,
    /// Font size in points; also the default line pitch
    pub font_size: u32,
    #[serde(default)]
    pub paper_size: PaperSize,
    /// Lines drawn before the body on the first page
    #[serde(default)]
    pub header: Vec<String>,
    /// Lines drawn after the body on the last page
    #[serde(default)]
    pub footer: Vec<String>,
    /// `[path, x, y]`, all strings; an empty path disables the image
    #[serde(default)]
    pub bg_image: Vec<String>,
    #[serde(default)]
    pub text_vertical_offset: f64,
    #[serde(default)]
    pub text_horizontal_offset: f64,
    #[serde(default)]
    pub line_height: Option<f64>,
    /// Top of the text on every page after the first
    #[serde(default)]
    pub continuation_offset: Option<f64>,
    /// Ignore form feeds that come before any body text
    #[serde(default)]
    pub skip_leading_form_feed: bool,
    /// Look for input under a `<YYYYMM>` sub-directory
    #[serde(default = "default_text_by_period")]
    pub text_by_period: bool,
    #[serde(default = "default_owner_password")]
    pub owner_password: String,
    /// User password for requests that carry none
    #[serde(default)]
    pub default_password: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u32,
    #[serde(default)]
    pub encryption: Encryption,
}

fn default_text_by_period() -> bool {
    true
}

fn default_owner_password() -> String {
    DEFAULT_OWNER_PASSWORD.to_string()
}

fn default_compress_level() -> u32 {
    1
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl RenderConfig {
    /// Read and parse a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check ranges and cross-field rules that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_to_text.as_os_str().is_empty() {
            return Err(invalid("PathToText", "must not be empty"));
        }
        if self.path_to_pdf.as_os_str().is_empty() {
            return Err(invalid("PathToPdf", "must not be empty"));
        }
        if self.font_file.as_os_str().is_empty() {
            return Err(invalid("FontFile", "must not be empty"));
        }
        if self.font_size == 0 {
            return Err(invalid("FontSize", "must be greater than zero"));
        }
        if let Some(height) = self.line_height {
            if !(height.is_finite() && height > 0.0) {
                return Err(invalid("LineHeight", format!("must be positive, got {height}")));
            }
        }
        if self.compress_level > 9 {
            return Err(invalid(
                "CompressLevel",
                format!("must be between 0 and 9, got {}", self.compress_level),
            ));
        }
        self.background()?;
        Ok(())
    }

    /// The configured background image, if any
    pub fn background(&self) -> Result<Option<BackgroundImage>, ConfigError> {
        let path = match self.bg_image.first() {
            Some(path) if !path.trim().is_empty() => path,
            _ => return Ok(None),
        };
        let offset = |index: usize, field: &'static str| -> Result<f64, ConfigError> {
            let raw = self
                .bg_image
                .get(index)
                .ok_or_else(|| invalid("BgImage", format!("missing {field} offset")))?;
            raw.trim()
                .parse::<f64>()
                .map_err(|_| invalid("BgImage", format!("{field} offset `{raw}` is not a number")))
        };
        Ok(Some(BackgroundImage {
            path: PathBuf::from(path),
            x: offset(1, "x")?,
            y: offset(2, "y")?,
        }))
    }

    pub fn page_size(&self) -> PageSize {
        self.paper_size.page_size()
    }

    pub fn font_size_points(&self) -> f64 {
        self.font_size as f64
    }

    /// Vertical advance per line
    pub fn line_height(&self) -> f64 {
        self.line_height.unwrap_or(self.font_size as f64)
    }

    /// Top of the text on pages after the first
    pub fn continuation_offset(&self) -> f64 {
        self.continuation_offset
            .unwrap_or(self.text_vertical_offset + 2.1 * self.font_size as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"{
        "PathToText": "/data/txt",
        "PathToPdf": "/data/pdf",
        "FontFile": "/fonts/mono.ttf",
        "FontSize": 10
    }"#;

    fn with_background(values: &[&str]) -> RenderConfig {
        let mut config = RenderConfig::from_json(MINIMAL).unwrap();
        config.bg_image = values.iter().map(|v| v.to_string()).collect();
        config
    }

    #[test]
    fn test_defaults() {
        let config = RenderConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.page_size(), PageSize::A4);
        assert_eq!(config.owner_password, "fds123");
        assert_eq!(config.default_password, "");
        assert_eq!(config.compress_level, 1);
        assert_eq!(config.encryption, Encryption::Rc4_128);
        assert!(config.text_by_period);
        assert!(!config.skip_leading_form_feed);
        assert_eq!(config.line_height(), 10.0);
        assert_eq!(config.continuation_offset(), 21.0);
        assert!(config.header.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "PathToText": "txt",
            "PathToPdf": "pdf",
            "FontFile": "mono.ttf",
            "FontSize": 9,
            "PaperSize": "letter",
            "Header": ["BANK", "Statement"],
            "Footer": ["-- end --"],
            "BgImage": ["logo.png", "20", " 30.5 "],
            "TextVerticalOffset": 40,
            "TextHorizontalOffset": 12.5,
            "LineHeight": 11,
            "ContinuationOffset": 60,
            "SkipLeadingFormFeed": true,
            "TextByPeriod": false,
            "OwnerPassword": "owner",
            "DefaultPassword": "0000",
            "CompressLevel": 6,
            "Encryption": "rc4-40"
        }"#;
        let config = RenderConfig::from_json(json).unwrap();
        assert_eq!(config.page_size(), PageSize::LETTER);
        assert_eq!(config.header, vec!["BANK", "Statement"]);
        assert_eq!(config.line_height(), 11.0);
        assert_eq!(config.continuation_offset(), 60.0);
        assert_eq!(config.encryption.strength(), EncryptionStrength::Rc4_40);
        assert_eq!(
            config.background().unwrap(),
            Some(BackgroundImage {
                path: PathBuf::from("logo.png"),
                x: 20.0,
                y: 30.5,
            })
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_paper_size() {
        let json = MINIMAL.replace("\"FontSize\": 10", "\"FontSize\": 10, \"PaperSize\": \"B5\"");
        assert!(matches!(
            RenderConfig::from_json(&json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_paper_size_tags() {
        let paper = |tag: &str| PaperSize::try_from(tag.to_string()).map(PaperSize::page_size);
        assert_eq!(paper("a3"), Ok(PageSize::A3));
        assert_eq!(paper(" Legal "), Ok(PageSize::LEGAL));
        assert_eq!(paper("LETTER"), Ok(PageSize::LETTER));
        assert!(paper("B5").unwrap_err().contains("B5"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = RenderConfig::from_json(r#"{"PathToText": "t"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_font_size_is_invalid() {
        let mut config = RenderConfig::from_json(MINIMAL).unwrap();
        config.font_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "FontSize", .. })
        ));
    }

    #[test]
    fn test_compress_level_range() {
        let mut config = RenderConfig::from_json(MINIMAL).unwrap();
        config.compress_level = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "CompressLevel", .. })
        ));
    }

    #[test]
    fn test_background_disabled() {
        assert_eq!(with_background(&[]).background().unwrap(), None);
        assert_eq!(with_background(&["", "x", "y"]).background().unwrap(), None);
    }

    #[test]
    fn test_background_non_numeric_offset() {
        let config = with_background(&["logo.png", "left", "10"]);
        assert!(matches!(
            config.background(),
            Err(ConfigError::Invalid { field: "BgImage", .. })
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_background_missing_offset() {
        assert!(with_background(&["logo.png", "10"]).background().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = RenderConfig::load("/nonexistent/conf.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
