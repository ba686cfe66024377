use chrono::NaiveDateTime;
use lopdf::{Dictionary, Document, Object};

const MIN_IMAGE_WIDTH: i64 = 100;
const MIN_IMAGE_HEIGHT: i64 = 100;

/// Document properties extracted from a PDF body.
#[derive(Debug, Clone, Default)]
pub struct PdfProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub producer: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub pages: usize,
    pub images: usize,
    pub version: String,
}

impl PdfProperties {
    /// Fails when the bytes aren't a readable PDF; the caller skips the
    /// document in that case.
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        let info = info_dict(&doc);

        Ok(Self {
            title: info_string(info, b"Title"),
            author: info_string(info, b"Author"),
            subject: info_string(info, b"Subject"),
            keywords: info_string(info, b"Keywords"),
            producer: info_string(info, b"Producer"),
            created: info_string(info, b"CreationDate").and_then(|d| parse_pdf_date(&d)),
            modified: info_string(info, b"ModDate").and_then(|d| parse_pdf_date(&d)),
            pages: doc.get_pages().len(),
            images: count_large_images(&doc),
            version: doc.version.clone(),
        })
    }
}

fn info_dict(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(info: Option<&Dictionary>, key: &[u8]) -> Option<String> {
    match info?.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_pdf_string(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// Text strings in the Info dictionary are either UTF-16BE with a BOM or
/// PDFDocEncoding, which is close enough to Latin-1 for metadata fields.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Parses a PDF date like `D:20000102030405-06'00'`, dropping the timezone.
pub fn parse_pdf_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.strip_prefix("D:").unwrap_or(raw);
    let stamp = raw.get(..14)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()
}

/// Counts image XObjects bigger than 100x100, the same cutoff the report
/// applies to filter out icons and decorations.
fn count_large_images(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|obj| {
            let Object::Stream(stream) = obj else {
                return false;
            };
            let dict = &stream.dict;
            let is_image = dict
                .get(b"Subtype")
                .and_then(|o| o.as_name())
                .map(|name| name == b"Image".as_slice())
                .unwrap_or(false);
            if !is_image {
                return false;
            }
            let width = dict.get(b"Width").and_then(|o| o.as_i64()).unwrap_or(0);
            let height = dict.get(b"Height").and_then(|o| o.as_i64()).unwrap_or(0);
            width > MIN_IMAGE_WIDTH && height > MIN_IMAGE_HEIGHT
        })
        .count()
}

/// Human readable 1024-based file size, e.g. `1.5MB`.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["", "KB", "MB", "GB", "TB", "PB", "EB", "ZB"] {
        if size.abs() < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}YB")
}

/// Minimal single-page PDF used by tests in this crate.
#[cfg(test)]
pub(crate) fn sample_pdf(title: &str) -> Vec<u8> {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Author" => Object::string_literal("City Clerk"),
        "Producer" => Object::string_literal("pdfscout test"),
        "CreationDate" => Object::string_literal("D:20000102030405Z"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
