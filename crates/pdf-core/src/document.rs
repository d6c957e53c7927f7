//! PDF document builder

use crate::font::FontData;
use crate::image::{generate_image_operators, ImageXObject};
use crate::security::{Protection, SecurityHandler};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{PageSize, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const PRODUCER: &str = concat!("stmtpdf ", env!("CARGO_PKG_VERSION"));

/// Text placed before the font's glyph set is final
struct BufferedTextOp {
    text: String,
    font_name: String,
    page: usize,
    x: f64,
    /// Baseline in PDF coordinates (from bottom)
    y: f64,
    font_size: f32,
}

/// An embedded image shared by every page that draws it
#[derive(Clone, Copy)]
struct EmbeddedImage {
    id: ObjectId,
    width: u32,
    height: u32,
}

/// A new PDF document with pages of one fixed size
///
/// Content is buffered per page and written out by [`PdfDocument::to_bytes`]
/// or [`PdfDocument::save`]: fonts are embedded with the glyphs actually used,
/// streams are compressed, then everything is encrypted when protection is set.
pub struct PdfDocument {
    inner: Document,
    pages_id: ObjectId,
    page_size: PageSize,
    page_count: usize,
    fonts: HashMap<String, FontData>,
    /// Font name -> resource name (e.g. "F1")
    font_resources: HashMap<String, String>,
    next_font_resource: u32,
    current_font: Option<String>,
    current_font_size: f32,
    page_fonts: HashMap<usize, BTreeSet<String>>,
    embedded_images: HashMap<u64, EmbeddedImage>,
    page_images: HashMap<usize, BTreeMap<String, ObjectId>>,
    next_image_resource: u32,
    page_content_buffer: HashMap<usize, Vec<u8>>,
    buffered_text_ops: Vec<BufferedTextOp>,
    compression: u32,
    protection: Option<Protection>,
    title: Option<String>,
    file_id: Option<Vec<u8>>,
}

impl PdfDocument {
    /// Create an empty document; pages are added with [`PdfDocument::add_page`]
    pub fn new(page_size: PageSize) -> Self {
        let mut inner = Document::with_version("1.5");
        let pages_id = inner.new_object_id();
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        Self {
            inner,
            pages_id,
            page_size,
            page_count: 0,
            fonts: HashMap::new(),
            font_resources: HashMap::new(),
            next_font_resource: 1,
            current_font: None,
            current_font_size: 12.0,
            page_fonts: HashMap::new(),
            embedded_images: HashMap::new(),
            page_images: HashMap::new(),
            next_image_resource: 1,
            page_content_buffer: HashMap::new(),
            buffered_text_ops: Vec::new(),
            compression: 6,
            protection: None,
            title: None,
            file_id: None,
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Append a blank page and return its 1-based number
    pub fn add_page(&mut self) -> Result<usize> {
        self.page_count += 1;
        Ok(self.page_count)
    }

    /// Register a TrueType font under `name`
    pub fn add_font(&mut self, name: &str, ttf_data: &[u8]) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        let font = FontData::from_ttf(name, ttf_data)?;
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    /// Select the font used by subsequent [`PdfDocument::insert_text`] calls
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }
        self.current_font = Some(name.to_string());
        self.current_font_size = size;
        Ok(())
    }

    pub fn font_size(&self) -> f32 {
        self.current_font_size
    }

    /// Ascent of the current font at the current size, in points
    pub fn current_ascent(&self) -> Result<f64> {
        let font = self.current_font_data()?;
        Ok(font.ascent_points(self.current_font_size) as f64)
    }

    /// Width of `text` in the current font, in points
    pub fn text_width(&self, text: &str) -> Result<f64> {
        let font = self.current_font_data()?;
        Ok(font.text_width_points(text, self.current_font_size) as f64)
    }

    /// Characters drawn so far that the current font has no glyph for
    pub fn missing_chars(&self) -> Result<Vec<char>> {
        Ok(self.current_font_data()?.missing_chars())
    }

    fn current_font_data(&self) -> Result<&FontData> {
        let name = self
            .current_font
            .as_deref()
            .ok_or_else(|| PdfError::FontNotFound("no font selected".to_string()))?;
        self.fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))
    }

    fn check_page(&self, page: usize) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(PdfError::InvalidPage(page, self.page_count));
        }
        Ok(())
    }

    /// Insert text with its baseline `y` points below the top edge
    pub fn insert_text(&mut self, text: &str, page: usize, x: f64, y: f64) -> Result<()> {
        self.check_page(page)?;
        if text.is_empty() {
            return Ok(());
        }

        let font_name = self
            .current_font
            .clone()
            .ok_or_else(|| PdfError::FontNotFound("no font selected".to_string()))?;
        let font = self
            .fonts
            .get_mut(&font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
        font.add_chars(text);

        self.font_resource(&font_name);
        self.page_fonts
            .entry(page)
            .or_default()
            .insert(font_name.clone());

        self.buffered_text_ops.push(BufferedTextOp {
            text: text.to_string(),
            font_name,
            page,
            x,
            y: self.page_size.height - y,
            font_size: self.current_font_size,
        });
        Ok(())
    }

    fn font_resource(&mut self, font_name: &str) -> String {
        if let Some(resource) = self.font_resources.get(font_name) {
            return resource.clone();
        }
        let resource = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        self.font_resources
            .insert(font_name.to_string(), resource.clone());
        resource
    }

    /// Draw an image at its pixel size, one pixel per point, with its
    /// top-left corner at (`x`, `y`) from the top-left of the page
    pub fn insert_image(&mut self, data: &[u8], page: usize, x: f64, y: f64) -> Result<()> {
        self.check_page(page)?;
        let (resource, image) = self.image_resource(data, page)?;
        let (width, height) = (image.width as f64, image.height as f64);
        let pdf_y = self.page_size.height - y - height;
        let ops = generate_image_operators(&resource, x, pdf_y, width, height);
        self.buffer_content(page, &ops);
        Ok(())
    }

    /// Embed `data` once per document and register it on `page`
    fn image_resource(&mut self, data: &[u8], page: usize) -> Result<(String, EmbeddedImage)> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let key = hasher.finish();

        let image = match self.embedded_images.get(&key) {
            Some(image) => *image,
            None => {
                let xobject = ImageXObject::from_bytes(data)?;
                let image = EmbeddedImage {
                    id: self.inner.add_object(xobject.to_pdf_stream()),
                    width: xobject.width,
                    height: xobject.height,
                };
                self.embedded_images.insert(key, image);
                image
            }
        };

        let resources = self.page_images.entry(page).or_default();
        if let Some((name, _)) = resources.iter().find(|(_, id)| **id == image.id) {
            return Ok((name.clone(), image));
        }
        let name = format!("Im{}", self.next_image_resource);
        self.next_image_resource += 1;
        resources.insert(name.clone(), image.id);
        Ok((name, image))
    }

    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// zlib level for content streams; 0 stores them uncompressed
    pub fn set_compression(&mut self, level: u32) {
        self.compression = level.min(9);
    }

    pub fn set_protection(&mut self, protection: Protection) {
        self.protection = Some(protection);
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Fix the first `/ID` element instead of deriving one at save time
    pub fn set_file_id(&mut self, id: &[u8]) {
        self.file_id = Some(id.to_vec());
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Finish the document and serialize it
    pub fn to_bytes(mut self) -> Result<Vec<u8>> {
        self.encode_buffered_text()?;
        let font_ids = self.embed_fonts();
        self.write_pages(&font_ids);
        self.write_info();
        self.compress_streams()?;

        let file_id = self.file_id.take().unwrap_or_else(|| self.derive_file_id());
        if let Some(protection) = self.protection.take() {
            SecurityHandler::new(&protection, &file_id).apply(&mut self.inner);
        }
        self.inner.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(file_id.clone(), StringFormat::Hexadecimal),
                Object::String(file_id, StringFormat::Hexadecimal),
            ]),
        );

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    fn encode_buffered_text(&mut self) -> Result<()> {
        let ops = std::mem::take(&mut self.buffered_text_ops);
        for op in ops {
            let font = self
                .fonts
                .get(&op.font_name)
                .ok_or_else(|| PdfError::FontNotFound(op.font_name.clone()))?;
            let text_hex = font.encode_text_hex(&op.text);
            let ctx = TextRenderContext {
                font_name: self.font_resource(&op.font_name),
                font_size: op.font_size,
            };
            let operators = generate_text_operators(&text_hex, op.x, op.y, &ctx);
            self.buffer_content(op.page, &operators);
        }
        Ok(())
    }

    /// Embed every font that drew at least one character
    fn embed_fonts(&mut self) -> HashMap<String, ObjectId> {
        let mut names: Vec<&String> = self
            .fonts
            .iter()
            .filter(|(_, font)| font.used_char_count() > 0)
            .map(|(name, _)| name)
            .collect();
        names.sort();

        let mut ids = HashMap::new();
        for name in names {
            let objects = self.fonts[name].to_pdf_objects();

            let font_file_id = self.inner.add_object(objects.font_file_stream);
            let mut descriptor = objects.font_descriptor;
            descriptor.set("FontFile2", Object::Reference(font_file_id));
            let descriptor_id = self.inner.add_object(descriptor);

            let mut cid_font = objects.cid_font;
            cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
            let cid_font_id = self.inner.add_object(cid_font);

            let tounicode_id = self.inner.add_object(objects.tounicode_stream);
            let mut type0 = objects.type0_font;
            type0.set(
                "DescendantFonts",
                Object::Array(vec![Object::Reference(cid_font_id)]),
            );
            type0.set("ToUnicode", Object::Reference(tounicode_id));
            ids.insert(name.clone(), self.inner.add_object(type0));
        }
        ids
    }

    fn write_pages(&mut self, font_ids: &HashMap<String, ObjectId>) {
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.page_size.width as _),
            Object::Real(self.page_size.height as _),
        ];

        let mut kids = Vec::with_capacity(self.page_count);
        for page in 1..=self.page_count {
            let content = self.page_content_buffer.remove(&page).unwrap_or_default();
            let content_id = self.inner.add_object(Stream::new(Dictionary::new(), content));

            let mut resources = Dictionary::new();
            if let Some(fonts) = self.page_fonts.get(&page) {
                let mut font_dict = Dictionary::new();
                for name in fonts {
                    if let (Some(resource), Some(id)) =
                        (self.font_resources.get(name), font_ids.get(name))
                    {
                        font_dict.set(resource.as_bytes().to_vec(), Object::Reference(*id));
                    }
                }
                resources.set("Font", font_dict);
            }
            if let Some(images) = self.page_images.get(&page) {
                let mut xobjects = Dictionary::new();
                for (name, id) in images {
                    xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
                }
                resources.set("XObject", xobjects);
            }

            let page_id = self.inner.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        self.inner.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(self.page_count as i64),
            }),
        );
    }

    fn write_info(&mut self) {
        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.inner.add_object(info);
        self.inner.trailer.set("Info", info_id);
    }

    /// Flate-encode every stream that has no filter yet
    fn compress_streams(&mut self) -> Result<()> {
        if self.compression == 0 {
            return Ok(());
        }
        let level = flate2::Compression::new(self.compression);
        for object in self.inner.objects.values_mut() {
            let Object::Stream(stream) = object else {
                continue;
            };
            if stream.dict.has(b"Filter") {
                continue;
            }
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(&stream.content)?;
            let compressed = encoder.finish()?;
            stream.dict.set("Filter", "FlateDecode");
            stream.set_content(compressed);
        }
        Ok(())
    }

    fn derive_file_id(&self) -> Vec<u8> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut ctx = md5::Context::new();
        ctx.consume(self.title.as_deref().unwrap_or_default());
        ctx.consume(self.page_count.to_le_bytes());
        ctx.consume(nanos.to_le_bytes());
        ctx.compute().0.to_vec()
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_size", &self.page_size)
            .field("pages", &self.page_count)
            .field("fonts", &self.fonts.len())
            .field("compression", &self.compression)
            .field("protected", &self.protection.is_some())
            .finish()
    }
}
