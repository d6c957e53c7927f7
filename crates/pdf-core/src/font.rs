//! Font handling for PDF documents

use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeMap;

/// Glyph resolved from the font for a used character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    id: u16,
    advance: u16,
}

/// Vertical metrics read once from the font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FontMetrics {
    units_per_em: u16,
    ascender: i16,
    descender: i16,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
        }
    }
}

/// Font data structure for embedded fonts
///
/// The whole TrueType program is embedded, so glyph IDs in content streams
/// are the font's own IDs. Characters are resolved to glyphs when first used.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    ttf_data: Vec<u8>,
    /// Characters used so far, with their glyphs
    glyphs: BTreeMap<char, Glyph>,
    metrics: FontMetrics,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let face = ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        let metrics = FontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
        };

        Ok(Self {
            name: name.to_string(),
            ttf_data: ttf_data.to_vec(),
            glyphs: BTreeMap::new(),
            metrics,
        })
    }

    /// Record characters as used, resolving their glyphs
    pub fn add_chars(&mut self, text: &str) {
        let pending: Vec<char> = text
            .chars()
            .filter(|c| !self.glyphs.contains_key(c))
            .collect();
        if pending.is_empty() {
            return;
        }

        let face = ttf_parser::Face::parse(&self.ttf_data, 0).ok();
        for c in pending {
            let glyph = face
                .as_ref()
                .and_then(|face| {
                    let id = face.glyph_index(c)?;
                    Some(Glyph {
                        id: id.0,
                        advance: face.glyph_hor_advance(id).unwrap_or(0),
                    })
                })
                .unwrap_or(Glyph { id: 0, advance: 0 });
            self.glyphs.insert(c, glyph);
        }
    }

    /// Number of distinct characters used
    pub fn used_char_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Get glyph ID for a used character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.glyphs.get(&c).map(|g| g.id)
    }

    /// Characters that were used but have no glyph in this font
    pub fn missing_chars(&self) -> Vec<char> {
        self.glyphs
            .iter()
            .filter(|(_, g)| g.id == 0)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.metrics.units_per_em
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.metrics.ascender
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.metrics.descender
    }

    /// Ascender height in points for a given font size
    pub fn ascent_points(&self, font_size: f32) -> f32 {
        self.metrics.ascender as f32 / self.units_per_em() as f32 * font_size
    }

    /// Calculate text width in font units (only characters already added)
    pub fn text_width(&self, text: &str) -> u32 {
        text.chars()
            .filter_map(|c| self.glyphs.get(&c))
            .map(|g| g.advance as u32)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Convert a value in font units to PDF glyph space (1/1000 em)
    fn to_glyph_space(&self, value: i32) -> i64 {
        (value as f64 * 1000.0 / self.units_per_em() as f64).round() as i64
    }

    /// Generate all PDF objects needed to embed this font
    pub fn to_pdf_objects(&self) -> FontObjects {
        let font_name = Object::Name(self.name.clone().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(Dictionary::new(), tounicode_content.into_bytes());

        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![("Length1", Object::Integer(self.ttf_data.len() as i64))]),
            self.ttf_data.clone(),
        );

        let ascent = self.to_glyph_space(self.ascender() as i32);
        let descent = self.to_glyph_space(self.descender() as i32);
        let font_bbox = vec![
            Object::Integer(0),
            Object::Integer(descent),
            Object::Integer(1000),
            Object::Integer(ascent),
        ];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", Object::Integer(4)), // Symbolic font
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(ascent)),
            ("Descent", Object::Integer(descent)),
            ("CapHeight", Object::Integer(ascent)),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference((0, 0))), // Placeholder, set when embedding
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", Object::Integer(0)),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))), // Placeholder, set when embedding
            ("CIDToGIDMap", "Identity".into()),
            ("W", self.generate_widths_array().into()),
            ("DW", Object::Integer(1000)),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()), // Placeholder
            ("ToUnicode", Object::Reference((0, 0))),                    // Placeholder
        ]);

        FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        }
    }

    /// Encode text as hex string of glyph IDs for the PDF Tj operator
    ///
    /// Characters not yet added encode as GID 0 (.notdef).
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::new();
        for c in text.chars() {
            let gid = self.glyph_id(c).unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        format!("<{result}>")
    }

    /// Generate /W array for glyph widths
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut by_gid: BTreeMap<u16, u16> = BTreeMap::new();
        for glyph in self.glyphs.values() {
            by_gid.insert(glyph.id, glyph.advance);
        }

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        let mut widths = Vec::with_capacity(by_gid.len() * 2);
        for (gid, advance) in by_gid {
            widths.push(Object::Integer(gid as i64));
            widths.push(vec![Object::Integer(self.to_glyph_space(advance as i32))].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // .notdef has no meaningful Unicode value
        let mapped: Vec<(u16, char)> = self
            .glyphs
            .iter()
            .filter(|(_, g)| g.id != 0)
            .map(|(c, g)| (g.id, *c))
            .collect();

        // bfchar sections are limited to 100 entries
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                cmap.push_str(&format!("<{gid:04X}> <{}>\n", utf16_hex(*c)));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// UTF-16BE hex of a character (surrogate pairs for astral code points)
fn utf16_hex(c: char) -> String {
    let mut buf = [0u16; 2];
    c.encode_utf16(&mut buf)
        .iter()
        .map(|unit| format!("{unit:04X}"))
        .collect()
}
