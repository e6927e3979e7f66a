//! Thumbnail rendering for ledger previews.

use derive_getters::Getters;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, Rgb, RgbImage};
use tracing::debug;

/// Longest edge of a rendered thumbnail, in pixels.
pub const THUMBNAIL_MAX_EDGE: u32 = 256;

/// JPEG quality for rendered thumbnails.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Rendered preview of a generation result.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Thumbnail {
    /// Encoded thumbnail bytes
    data: Vec<u8>,
    /// MIME type of the encoding
    mime: String,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
}

/// Renders a bounded-size JPEG preview from raw image bytes.
///
/// The source is decoded, resized to fit within
/// [`THUMBNAIL_MAX_EDGE`] on its longest edge (aspect ratio preserved), and
/// any alpha channel is flattened onto a white background before encoding.
///
/// # Errors
///
/// Returns an error if the source bytes cannot be decoded or the thumbnail
/// cannot be encoded.
pub fn render_thumbnail(image_bytes: &[u8]) -> Result<Thumbnail, image::ImageError> {
    let source = image::load_from_memory(image_bytes)?;
    debug!(
        width = source.width(),
        height = source.height(),
        "Decoded source image"
    );

    let resized = source.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE);
    let rgb = if resized.color().has_alpha() {
        flatten_onto_white(&resized)
    } else {
        resized.to_rgb8()
    };

    let (width, height) = rgb.dimensions();
    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, THUMBNAIL_JPEG_QUALITY);
    encoder.encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
    debug!(width, height, bytes = data.len(), "Rendered thumbnail");

    Ok(Thumbnail {
        data,
        mime: "image/jpeg".to_string(),
        width,
        height,
    })
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flattened = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        let target = flattened.get_pixel_mut(x, y);
        for channel in 0..3 {
            let source = u32::from(pixel[channel]);
            target[channel] = ((source * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let source = RgbaImage::from_pixel(width, height, pixel);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(source)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png");
        bytes
    }

    #[test]
    fn renders_jpeg_within_bounds() {
        let bytes = png_bytes(1024, 512, Rgba([10, 20, 30, 255]));
        let thumb = render_thumbnail(&bytes).expect("render");
        assert_eq!(thumb.mime(), "image/jpeg");
        assert_eq!(*thumb.width(), 256);
        assert_eq!(*thumb.height(), 128);
        assert!(!thumb.data().is_empty());
    }

    #[test]
    fn small_sources_are_not_upscaled() {
        let bytes = png_bytes(64, 48, Rgba([200, 200, 200, 255]));
        let thumb = render_thumbnail(&bytes).expect("render");
        assert_eq!(*thumb.width(), 64);
        assert_eq!(*thumb.height(), 48);
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let bytes = png_bytes(32, 32, Rgba([0, 0, 0, 0]));
        let thumb = render_thumbnail(&bytes).expect("render");
        let decoded = image::load_from_memory(thumb.data()).expect("decode").to_rgb8();
        let center = decoded.get_pixel(16, 16);
        // JPEG is lossy; fully transparent black should come out near-white.
        assert!(center[0] > 240 && center[1] > 240 && center[2] > 240);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(render_thumbnail(&[0, 1, 2, 3]).is_err());
    }
}
