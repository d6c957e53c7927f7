//! Reading statement text files

use crate::{Result, StatementError};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a statement file into its lines, in order
///
/// Form-feed characters are kept in the lines that carry them. A missing or
/// unreadable file is reported as [`StatementError::InputNotFound`].
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), "statement input missing");
        } else {
            warn!(path = %path.display(), error = %err, "statement input unreadable");
        }
        StatementError::InputNotFound(path.to_path_buf())
    })?;
    Ok(split_lines(&decode(&bytes)))
}

/// Decode as UTF-8, falling back to Windows-1252 for legacy 8-bit files
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

/// Split on `\n`, dropping a trailing `\r`; no empty line after a final newline
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
