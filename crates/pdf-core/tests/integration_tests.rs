//! Integration tests for pdf-core
//!
//! Documents are built end to end, serialized, then parsed back with lopdf.

use lopdf::{Document, Object};
use pdf_core::{
    EncryptionStrength, PageSize, PdfDocument, PdfError, Permissions, Protection, SecurityHandler,
};
use std::io::Read;

const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fonts/DejaVuSansMono.ttf");

fn load_test_font() -> Vec<u8> {
    std::fs::read(FONT_PATH).expect("Failed to read test font file")
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(
        8,
        4,
        image::Rgb([200u8, 10, 10]),
    ));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn page_content(doc: &Document, page: u32) -> String {
    let page_id = doc.get_pages()[&page];
    let dict = doc.get_dictionary(page_id).unwrap();
    let contents = dict.get(b"Contents").unwrap().as_reference().unwrap();
    let stream = doc.get_object(contents).unwrap().as_stream().unwrap();
    let raw = match stream.dict.get(b"Filter") {
        Ok(_) => {
            let mut out = Vec::new();
            flate2::read::ZlibDecoder::new(stream.content.as_slice())
                .read_to_end(&mut out)
                .unwrap();
            out
        }
        Err(_) => stream.content.clone(),
    };
    String::from_utf8(raw).unwrap()
}

fn text_document(lines: &[&[&str]]) -> PdfDocument {
    let mut doc = PdfDocument::new(PageSize::A4);
    doc.add_font("body", &load_test_font()).unwrap();
    doc.set_font("body", 10.0).unwrap();
    for page_lines in lines {
        let page = doc.add_page().unwrap();
        for (i, line) in page_lines.iter().enumerate() {
            doc.insert_text(line, page, 20.0, 40.0 + 10.0 * i as f64)
                .unwrap();
        }
    }
    doc
}

#[test]
fn test_text_pages_roundtrip_through_lopdf() {
    let doc = text_document(&[&["HDR", "Jan line 1"], &["Jan line 2", "FTR"]]);
    let loaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();

    assert_eq!(loaded.get_pages().len(), 2);

    let first = page_content(&loaded, 1);
    assert_eq!(first.matches("BT\n").count(), 2);
    assert!(first.contains("/F1 10 Tf"));

    let second = page_content(&loaded, 2);
    assert_eq!(second.matches(" Tj\n").count(), 2);
}

#[test]
fn test_font_is_embedded_as_type0() {
    let doc = text_document(&[&["Statement"]]);
    let loaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();

    let page = loaded.get_dictionary(loaded.get_pages()[&1]).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    let font_ref = fonts.get(b"F1").unwrap().as_reference().unwrap();
    let font = loaded.get_dictionary(font_ref).unwrap();

    assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
    assert_eq!(
        font.get(b"Encoding").unwrap().as_name().unwrap(),
        b"Identity-H"
    );
    assert!(font.get(b"ToUnicode").unwrap().as_reference().is_ok());
    let descendants = font.get(b"DescendantFonts").unwrap().as_array().unwrap();
    let cid_font = loaded
        .get_dictionary(descendants[0].as_reference().unwrap())
        .unwrap();
    assert_eq!(
        cid_font.get(b"Subtype").unwrap().as_name().unwrap(),
        b"CIDFontType2"
    );
}

#[test]
fn test_pages_without_text_have_no_font_resources() {
    let doc = text_document(&[&["only page one"], &[]]);
    let loaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();

    let page = loaded.get_dictionary(loaded.get_pages()[&2]).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"Font").is_err());
    assert_eq!(page_content(&loaded, 2), "");
}

#[test]
fn test_background_image_on_every_page() {
    let png = png_bytes();
    let mut doc = text_document(&[&["a"], &["b"], &["c"]]);
    for page in 1..=3 {
        doc.insert_image(&png, page, 10.0, 10.0).unwrap();
    }
    let loaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();

    let mut image_ids = Vec::new();
    for page in 1..=3u32 {
        assert!(page_content(&loaded, page).contains("8 0 0 4 10 827.89 cm"));
        let dict = loaded.get_dictionary(loaded.get_pages()[&page]).unwrap();
        let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let (_, reference) = xobjects.iter().next().unwrap();
        image_ids.push(reference.as_reference().unwrap());
    }
    image_ids.dedup();
    assert_eq!(image_ids.len(), 1);
}

#[test]
fn test_letter_page_size() {
    let mut doc = PdfDocument::new(PageSize::LETTER);
    doc.add_page().unwrap();
    let loaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();

    let page = loaded.get_dictionary(loaded.get_pages()[&1]).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 612.0).abs() < 0.01);
    assert!((height - 792.0).abs() < 0.01);
}

fn info_title(doc: &Document) -> Vec<u8> {
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    info.get(b"Title").unwrap().as_str().unwrap().to_vec()
}

fn protected_bytes(user: &str, strength: EncryptionStrength) -> Vec<u8> {
    let permissions = Permissions::PRINT | Permissions::COPY | Permissions::MODIFY;
    let mut doc = text_document(&[&["secret balance"]]);
    doc.set_title("1234567.202401");
    doc.set_protection(Protection::new(user, "fds123", permissions).with_strength(strength));
    doc.to_bytes().unwrap()
}

#[test]
fn test_protected_document_opens_only_with_user_password() {
    for strength in [EncryptionStrength::Rc4_40, EncryptionStrength::Rc4_128] {
        let bytes = protected_bytes("9876", strength);
        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("/Filter /Standard") || raw.contains("/Filter/Standard"));
        assert!(!raw.contains("1234567.202401"), "{strength:?}: title left in clear");

        let loaded = Document::load_mem(&bytes).unwrap();
        assert!(loaded.is_encrypted());
        assert!(loaded.clone().decrypt("0000").is_err(), "{strength:?}");

        let mut doc = loaded;
        doc.decrypt("9876").unwrap();
        assert_eq!(info_title(&doc), b"1234567.202401", "{strength:?}");
        let content = page_content(&doc, 1);
        assert!(content.contains("/F1 10 Tf"), "{strength:?}: {content}");
        assert!(content.contains("Tj"), "{strength:?}: {content}");
    }
}

#[test]
fn test_empty_user_password_opens_with_blank() {
    let bytes = protected_bytes("", EncryptionStrength::Rc4_128);
    let mut doc = Document::load_mem(&bytes).unwrap();
    assert!(doc.clone().decrypt("9876").is_err());
    doc.decrypt("").unwrap();
    assert_eq!(info_title(&doc), b"1234567.202401");
}

#[test]
fn test_security_handler_authenticates_both_passwords() {
    let protection = Protection::new("9876", "fds123", Permissions::PRINT | Permissions::COPY);
    let handler = SecurityHandler::new(&protection, b"stmt-1234567-24");
    assert!(handler.authenticate_user(b"9876"));
    assert!(handler.authenticate_owner(b"fds123"));
    assert!(!handler.authenticate_user(b"0000"));
}

#[test]
fn test_rc4_40_dictionary() {
    let handler = SecurityHandler::new(
        &Protection::new("", "fds123", Permissions::PRINT)
            .with_strength(EncryptionStrength::Rc4_40),
        b"abc",
    );
    let dict = handler.encrypt_dictionary();
    assert_eq!(dict.get(b"V").unwrap().as_i64().unwrap(), 1);
    assert_eq!(dict.get(b"R").unwrap().as_i64().unwrap(), 2);
    assert_eq!(dict.get(b"Length").unwrap().as_i64().unwrap(), 40);
    match dict.get(b"O").unwrap() {
        Object::String(bytes, _) => assert_eq!(bytes.len(), 32),
        other => panic!("unexpected /O entry: {other:?}"),
    }
}

#[test]
fn test_insert_text_on_missing_page() {
    let mut doc = text_document(&[&["x"]]);
    let err = doc.insert_text("y", 5, 0.0, 0.0).unwrap_err();
    assert!(matches!(err, PdfError::InvalidPage(5, 1)));
}

#[test]
fn test_duplicate_font_name() {
    let mut doc = PdfDocument::new(PageSize::A4);
    let font = load_test_font();
    doc.add_font("body", &font).unwrap();
    assert!(matches!(
        doc.add_font("body", &font),
        Err(PdfError::FontAlreadyExists(_))
    ));
}

#[test]
fn test_save_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    text_document(&[&["saved"]]).save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5"));
}
