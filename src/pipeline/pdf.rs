//! PDF assembly: ordered pages → one multi-page PDF in memory.
//!
//! Each page becomes a single `DCTDecode` image XObject drawn to fill a page
//! whose MediaBox matches the image size at the configured DPI. The page tree
//! is flat: one `/Pages` node whose `/Kids` are in document order.

use crate::error::Pages2PdfError;
use crate::pipeline::encode;
use crate::pipeline::load::PageImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// Value written to the Info dictionary's `/Creator` and `/Producer`.
const PRODUCER: &str = concat!("pages2pdf ", env!("CARGO_PKG_VERSION"));

/// Options for [`assemble_pdf`].
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Pixels per inch used to size pages.
    pub dpi: u32,
    /// JPEG quality for embedded page images.
    pub jpeg_quality: u8,
    /// Document title for the Info dictionary. `None` writes no Info dict.
    pub title: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            dpi: 72,
            jpeg_quality: 90,
            title: None,
        }
    }
}

/// Build a PDF containing `pages` in the given order and serialise it.
pub fn assemble_pdf(pages: &[PageImage], options: &PdfOptions) -> Result<Vec<u8>, Pages2PdfError> {
    if pages.is_empty() {
        return Err(Pages2PdfError::PdfEncode("no pages to assemble".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_page(&mut doc, pages_id, page, options)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(ref title) = options.title {
        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(title),
            "Creator" => text_string(PRODUCER),
            "Producer" => text_string(PRODUCER),
        });
        doc.trailer.set("Info", info_id);
    }

    // Image streams opted out of compression; this only touches content streams.
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| Pages2PdfError::PdfEncode(format!("serialise: {e}")))?;
    debug!("Assembled {} pages → {} bytes PDF", count, buf.len());
    Ok(buf)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page: &PageImage,
    options: &PdfOptions,
) -> Result<ObjectId, Pages2PdfError> {
    let (width, height) = page.image.dimensions();
    let jpeg = encode::encode_jpeg(&page.image, options.jpeg_quality)
        .map_err(|e| Pages2PdfError::PdfEncode(format!("page {}: {e}", page.page)))?;

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let (w_pt, h_pt) = page_size_points(width, height, options.dpi);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w_pt),
                    0_i64.into(),
                    0_i64.into(),
                    Object::Real(h_pt),
                    0_i64.into(),
                    0_i64.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content = content
        .encode()
        .map_err(|e| Pages2PdfError::PdfEncode(format!("page {} content: {e}", page.page)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), Object::Real(w_pt), Object::Real(h_pt)],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
        "Contents" => content_id,
    }))
}

/// Page size in PDF points (1/72 inch).
pub fn page_size_points(width_px: u32, height_px: u32, dpi: u32) -> (f32, f32) {
    let scale = 72.0 / dpi.max(1) as f32;
    (width_px as f32 * scale, height_px as f32 * scale)
}

/// Encode a PDF text string: PDFDocEncoding-compatible ASCII stays literal,
/// anything else is written as UTF-16BE with a byte-order mark.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}
