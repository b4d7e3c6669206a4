//! Page loading: read one page file and classify the outcome.
//!
//! The result is a tagged value rather than an error hierarchy. Exactly two
//! page-level conditions are recoverable, and each has its own variant:
//!
//! * [`PageOutcome::Missing`]: the store reports `NotFound`;
//! * [`PageOutcome::Corrupt`]: bytes exist but are not a complete image in
//!   any recognised format.
//!
//! Anything else is not a property of the page content, so it becomes a fatal
//! [`Pages2PdfError::UnclassifiedPage`] for the caller to surface. That
//! includes permission errors, decoder limits, and valid images in a format
//! this build has no decoder for. Deleting those would make a fetcher
//! download the same bytes forever.
//!
//! ## Truncated JPEGs
//!
//! A download cut off inside the JPEG scan data still decodes: the codec pads
//! the missing rows. Such files are caught before decoding by the missing
//! end-of-image marker (`FF D9`) and reported as corrupt.

use crate::error::Pages2PdfError;
use crate::storage::PageStore;
use image::error::{ImageFormatHint, UnsupportedErrorKind};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, RgbImage};
use std::io::{self, Cursor};
use std::path::Path;
use tracing::debug;

/// A decoded, flattened page ready for embedding.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page: usize,
    /// Opaque 8-bit RGB pixels.
    pub image: RgbImage,
}

/// Outcome of loading one page.
#[derive(Debug)]
pub enum PageOutcome {
    Decoded(DynamicImage),
    Corrupt { detail: String },
    Missing,
}

/// Read and decode the page at `path`.
///
/// The file handle (or store entry) is released before this returns; only the
/// decoded pixels are kept.
pub fn load_page(
    store: &dyn PageStore,
    path: &Path,
    page: usize,
) -> Result<PageOutcome, Pages2PdfError> {
    let bytes = match store.read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PageOutcome::Missing),
        Err(e) => {
            return Err(Pages2PdfError::UnclassifiedPage {
                page,
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    if is_truncated_jpeg(&bytes) {
        return Ok(PageOutcome::Corrupt {
            detail: "JPEG data ends before the end-of-image marker".into(),
        });
    }

    match decode_bytes(&bytes) {
        Ok(img) => {
            debug!(
                "Decoded page {} → {}x{} {:?}",
                page,
                img.width(),
                img.height(),
                img.color()
            );
            Ok(PageOutcome::Decoded(img))
        }
        Err(e) if is_corruption(&e) => Ok(PageOutcome::Corrupt {
            detail: e.to_string(),
        }),
        Err(e) => Err(Pages2PdfError::UnclassifiedPage {
            page,
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Decode an in-memory image, sniffing the format from its content.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()
}

/// JPEG bytes that stop before the `FF D9` end-of-image marker.
///
/// Trailing NUL or whitespace padding after the marker is tolerated.
fn is_truncated_jpeg(bytes: &[u8]) -> bool {
    if !matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg)) {
        return false;
    }
    let end = bytes
        .iter()
        .rposition(|&b| !matches!(b, 0x00 | b' ' | b'\t' | b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    !bytes[..end].ends_with(&[0xFF, 0xD9])
}

/// Does this decode error describe bad page content?
///
/// Header-level truncation surfaces as a decoding error or as premature EOF
/// from the in-memory reader. An unsupported error only counts when the
/// format itself could not be recognised.
fn is_corruption(err: &ImageError) -> bool {
    match err {
        ImageError::Decoding(_) => true,
        ImageError::Unsupported(e) => matches!(
            e.kind(),
            UnsupportedErrorKind::Format(ImageFormatHint::Unknown)
        ),
        ImageError::IoError(e) => matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
        ),
        // Limits, Parameter, Encoding: not a property of the file content.
        _ => false,
    }
}
