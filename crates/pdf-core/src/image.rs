//! Raster images as PDF XObjects
//!
//! JPEG data is embedded as-is behind `DCTDecode`. PNG data is decoded,
//! flattened onto white and re-packed as `FlateDecode` samples.

use crate::text::format_number;
use crate::{PdfError, Result};
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Object, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RasterKind {
    Jpeg,
    Png,
}

fn sniff(data: &[u8]) -> Result<RasterKind> {
    if data.len() < PNG_SIGNATURE.len() {
        return Err(PdfError::ImageError("image data too short".to_string()));
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(RasterKind::Jpeg);
    }
    if data.starts_with(&PNG_SIGNATURE) {
        return Ok(RasterKind::Png);
    }
    Err(PdfError::ImageError(
        "unsupported image format (expected JPEG or PNG)".to_string(),
    ))
}

/// Frame header of a JPEG: pixel size and component count
#[derive(Debug, Clone, Copy)]
struct JpegFrame {
    width: u32,
    height: u32,
    components: u8,
}

/// Walk the marker segments until the first start-of-frame
fn read_jpeg_frame(data: &[u8]) -> Result<JpegFrame> {
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        // C4 (DHT), C8 (JPG) and CC (DAC) share the range but are not frames
        let is_frame = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            return Ok(JpegFrame {
                height: u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32,
                width: u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32,
                components: data[i + 9],
            });
        }
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }
    Err(PdfError::ImageError("JPEG frame header not found".to_string()))
}

fn blend_on_white(value: u8, alpha: u8) -> u8 {
    let a = alpha as f32 / 255.0;
    (value as f32 * a + 255.0 * (1.0 - a)).round() as u8
}

/// Image XObject ready to be added to a document
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `DeviceRGB` or `DeviceGray`
    pub color_space: &'static str,
    pub bits_per_component: u8,
    /// `DCTDecode` or `FlateDecode`
    pub filter: &'static str,
    /// Encoded sample data
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Build an XObject from JPEG or PNG bytes, picking the path by signature
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match sniff(data)? {
            RasterKind::Jpeg => Self::from_jpeg(data),
            RasterKind::Png => Self::from_png(data),
        }
    }

    /// Pass-through embedding of baseline or progressive JPEG data
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let frame = read_jpeg_frame(data)?;
        let color_space = match frame.components {
            1 => "DeviceGray",
            3 => "DeviceRGB",
            n => {
                return Err(PdfError::ImageError(format!(
                    "unsupported JPEG component count: {n}"
                )))
            }
        };
        Ok(Self {
            width: frame.width,
            height: frame.height,
            color_space,
            bits_per_component: 8,
            filter: "DCTDecode",
            data: data.to_vec(),
        })
    }

    /// Decode a PNG and store its samples zlib-compressed
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_decoder()?;
        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        let decoded = DynamicImage::from_decoder(decoder)?;

        let (samples, color_space) = match color_type {
            ColorType::L8 | ColorType::L16 => (decoded.to_luma8().into_raw(), "DeviceGray"),
            ColorType::La8 | ColorType::La16 => {
                let samples = decoded
                    .to_luma_alpha8()
                    .pixels()
                    .map(|p| blend_on_white(p[0], p[1]))
                    .collect();
                (samples, "DeviceGray")
            }
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => {
                let mut samples = Vec::with_capacity(width as usize * height as usize * 3);
                for p in decoded.to_rgba8().pixels() {
                    samples.extend(p.0[..3].iter().map(|&c| blend_on_white(c, p[3])));
                }
                (samples, "DeviceRGB")
            }
            _ => (decoded.to_rgb8().into_raw(), "DeviceRGB"),
        };

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&samples)?;

        Ok(Self {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "FlateDecode",
            data: encoder.finish()?,
        })
    }

    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set("ColorSpace", Object::Name(self.color_space.as_bytes().to_vec()));
        dict.set(
            "BitsPerComponent",
            Object::Integer(self.bits_per_component as i64),
        );
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        Stream::new(dict, self.data.clone())
    }
}

/// Content operators painting `image_name` into the given rectangle
///
/// `x`/`y` address the lower-left corner in PDF user space.
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{image_name} Do\nQ\n",
        format_number(width),
        format_number(height),
        format_number(x),
        format_number(y)
    )
    .into_bytes()
}
