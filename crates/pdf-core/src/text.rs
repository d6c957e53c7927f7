//! Text rendering utilities

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, Tf, Td, Tj, ET) that render text
/// with its baseline starting at the given position.
///
/// # Arguments
/// * `text_hex` - Hex-encoded glyph IDs (e.g., "<0041004200>")
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `ctx` - Text rendering context
pub fn generate_text_operators(text_hex: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");

    // Set font and size: /F1 12 Tf
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));

    // Move to position: x y Td
    ops.push_str(&format!("{} {} Td\n", format_number(x), format_number(y)));

    // Show text: <hex> Tj
    ops.push_str(&format!("{text_hex} Tj\n"));

    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Format a coordinate with at most two decimals, trimming trailing zeros
pub(crate) fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx(font_name: &str, font_size: f32) -> TextRenderContext {
        TextRenderContext {
            font_name: font_name.to_string(),
            font_size,
        }
    }

    #[test]
    fn test_generate_text_operators() {
        let ops = generate_text_operators("<00480065006C006C006F>", 100.0, 700.0, &ctx("F1", 12.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.starts_with("BT\n"));
        assert!(ops_str.contains("/F1 12 Tf"));
        assert!(ops_str.contains("100 700 Td"));
        assert!(ops_str.contains("<00480065006C006C006F> Tj"));
        assert!(ops_str.ends_with("ET\n"));
    }

    #[test]
    fn test_generate_text_operators_fractional_position() {
        let ops = generate_text_operators("<0041>", 12.5, 829.891, &ctx("F2", 9.5));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("/F2 9.5 Tf"));
        assert!(ops_str.contains("12.5 829.89 Td"));
    }

    #[test]
    fn test_generate_text_operators_empty_text() {
        let ops = generate_text_operators("<>", 0.0, 0.0, &ctx("F1", 12.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("0 0 Td"));
        assert!(ops_str.contains("<> Tj"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(595.28), "595.28");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.005), "1");
    }
}
