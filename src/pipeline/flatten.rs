//! Alpha flattening: any decoded image → opaque 8-bit RGB.
//!
//! PDF image XObjects with `DCTDecode` carry no alpha channel, so transparent
//! pixels are composited onto a solid background before encoding.

use image::{DynamicImage, Rgb, RgbImage};

/// Flatten `img` onto `background`, returning a 3-channel image.
///
/// Images without an alpha channel are only converted; fully opaque pixels
/// keep their colour exactly.
pub fn flatten(img: DynamicImage, background: [u8; 3]) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = Rgb([
            blend(r, background[0], a),
            blend(g, background[1], a),
            blend(b, background[2], a),
        ]);
    }
    out
}

fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u16::from(alpha);
    let v = (u16::from(fg) * a + u16::from(bg) * (255 - a) + 127) / 255;
    v as u8
}
