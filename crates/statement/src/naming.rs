//! Statement keys and the paths derived from them
//!
//! [`PathResolver`] is the only place that knows the `<account>.<YYYYMM>`
//! file naming pattern; the line source and the render cache both go
//! through it.

use crate::config::RenderConfig;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Extension of the statement text files
pub const TEXT_EXTENSION: &str = "TXT";
/// Extension of the rendered documents
pub const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("period `{0}` is not a valid YYYYMM month")]
    InvalidPeriod(String),
}

/// A statement month, written `YYYYMM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, KeyError> {
        match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(_) if (0..=9999).contains(&year) => Ok(Self { year, month }),
            _ => Err(KeyError::InvalidPeriod(format!("{year:04}{month:02}"))),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for Period {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidPeriod(s.to_string());
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = s[..4].parse().map_err(|_| invalid())?;
        let month = s[4..].parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// Identifies one statement document
///
/// The account identifier is used verbatim in file names; callers are
/// expected to have rejected path separators and `..` already.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    account: String,
    period: Period,
}

impl StatementKey {
    pub fn new(account: impl Into<String>, period: Period) -> Self {
        Self {
            account: account.into(),
            period,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// `<account>.<YYYYMM>`, shared by input and output file names
    pub fn stem(&self) -> String {
        format!("{}.{}", self.account, self.period)
    }
}

impl fmt::Display for StatementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPaths {
    /// Statement text file
    pub input: PathBuf,
    /// Cached PDF
    pub output: PathBuf,
}

/// Maps statement keys to input and output paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    text_dir: PathBuf,
    pdf_dir: PathBuf,
    text_by_period: bool,
}

impl PathResolver {
    pub fn new(
        text_dir: impl Into<PathBuf>,
        pdf_dir: impl Into<PathBuf>,
        text_by_period: bool,
    ) -> Self {
        Self {
            text_dir: text_dir.into(),
            pdf_dir: pdf_dir.into(),
            text_by_period,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            &config.path_to_text,
            &config.path_to_pdf,
            config.text_by_period,
        )
    }

    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    /// `<text>/<YYYYMM>/<account>.<YYYYMM>.TXT` (or without the month directory)
    pub fn input_path(&self, key: &StatementKey) -> PathBuf {
        let mut path = self.text_dir.clone();
        if self.text_by_period {
            path.push(key.period().to_string());
        }
        path.push(format!("{}.{TEXT_EXTENSION}", key.stem()));
        path
    }

    /// `<pdf>/<account>.<YYYYMM>.pdf`
    pub fn output_path(&self, key: &StatementKey) -> PathBuf {
        self.pdf_dir.join(format!("{}.{PDF_EXTENSION}", key.stem()))
    }

    pub fn resolve(&self, key: &StatementKey) -> StatementPaths {
        StatementPaths {
            input: self.input_path(key),
            output: self.output_path(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key() -> StatementKey {
        StatementKey::new("1234567", "202401".parse().unwrap())
    }

    #[test]
    fn test_period_parse_and_display() {
        let period: Period = "202401".parse().unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 1);
        assert_eq!(period.to_string(), "202401");
    }

    #[test]
    fn test_period_rejects_bad_input() {
        for bad in ["", "2024", "2024011", "202413", "202400", "2024-1", "20240a", "../../"] {
            assert_eq!(
                bad.parse::<Period>(),
                Err(KeyError::InvalidPeriod(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_key_stem() {
        assert_eq!(key().stem(), "1234567.202401");
        assert_eq!(key().to_string(), "1234567.202401");
    }

    #[test]
    fn test_resolve_by_period() {
        let resolver = PathResolver::new("/data/txt", "/data/pdf", true);
        let paths = resolver.resolve(&key());
        assert_eq!(paths.input, PathBuf::from("/data/txt/202401/1234567.202401.TXT"));
        assert_eq!(paths.output, PathBuf::from("/data/pdf/1234567.202401.pdf"));
    }

    #[test]
    fn test_resolve_flat() {
        let resolver = PathResolver::new("txt", "pdf", false);
        assert_eq!(
            resolver.input_path(&key()),
            PathBuf::from("txt/1234567.202401.TXT")
        );
    }

    #[test]
    fn test_resolve_is_stable() {
        let resolver = PathResolver::new("/data/txt", "/data/pdf", true);
        let first = resolver.resolve(&key());
        for _ in 0..3 {
            assert_eq!(resolver.resolve(&key()), first);
        }
        assert_eq!(resolver.output_path(&key()), first.output);
    }
}
