//! Image encoding: flattened `RgbImage` → baseline JPEG bytes.
//!
//! Pages are embedded in the PDF as `DCTDecode` streams, so each page is
//! JPEG-encoded once here. Re-encoding (rather than copying the source file)
//! guarantees a plain 3-channel baseline JPEG regardless of what the fetcher
//! stored: PNG, CMYK JPEG, or progressive JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};
use tracing::debug;

/// Encode `img` as JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(img)?;
    debug!(
        "Encoded {}x{} page → {} bytes JPEG (q={})",
        img.width(),
        img.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let data = encode_jpeg(&img, 90).expect("encode should succeed");
        // SOI marker
        assert_eq!(&data[..2], &[0xFF, 0xD8]);

        let back = image::load_from_memory(&data).expect("valid jpeg");
        assert_eq!((back.width(), back.height()), (10, 10));
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let hi = encode_jpeg(&img, 95).unwrap();
        let lo = encode_jpeg(&img, 20).unwrap();
        assert!(lo.len() <= hi.len(), "lo={} hi={}", lo.len(), hi.len());
    }
}
