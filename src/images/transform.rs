use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::images::TransformError;
use crate::models::ColorSample;

pub const MAX_SCALE_WIDTH: u32 = 1024;

const JPEG_QUALITY: u8 = 85;
const BLUR_SIGMA: f32 = 4.0;

/// Proportional width-driven resize. The width bound is checked here,
/// after decode, keeping the reference ordering: the source is fetched
/// and decoded before an oversized width is rejected.
pub fn scale_to_width(data: &[u8], width: u32) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory(data)?;

    if width > MAX_SCALE_WIDTH {
        return Err(TransformError::WidthTooLarge);
    }

    let (source_width, source_height) = img.dimensions();
    let scale = width as f64 / source_width as f64;
    let height = ((source_height as f64 * scale).round() as u32).max(1);

    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    encode_jpeg(&resized)
}

/// Re-encode the source as JPEG without resizing. Used by the fallback
/// branch to persist something under the derivative key while the
/// response carries the original bytes.
pub fn reencode_jpeg(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory(data)?;
    encode_jpeg(&img)
}

/// Blurred thumbnail: source and mask both scaled to a third of the
/// source dimensions, gaussian blur, then a destination-in composite so
/// the mask's alpha defines the retained shape. Output is RGBA PNG.
pub fn blur_with_mask(data: &[u8], mask_path: &Path) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory(data)?;
    let mask = image::open(mask_path)?;

    let (source_width, source_height) = img.dimensions();
    let width = (source_width / 3).max(1);
    let height = (source_height / 3).max(1);

    let small = img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();
    let mask = mask.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();

    let mut blurred = imageops::blur(&small, BLUR_SIGMA);

    // Destination-in: keep the blurred pixels, take alpha from the mask.
    for (pixel, mask_pixel) in blurred.pixels_mut().zip(mask.pixels()) {
        pixel[3] = ((pixel[3] as u16 * mask_pixel[3] as u16) / 255) as u8;
    }

    let mut output = Vec::new();
    DynamicImage::ImageRgba8(blurred).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;

    Ok(output)
}

/// Reduce the source to its dominant color: a 1x1 Lanczos resize, read
/// back as a normalized srgb triple plus the pixel population it stands
/// in for.
pub fn color_average(data: &[u8]) -> Result<ColorSample, TransformError> {
    let img = image::load_from_memory(data)?;

    let (source_width, source_height) = img.dimensions();
    let pixel = img.resize_exact(1, 1, FilterType::Lanczos3).to_rgba8();
    let [r, g, b, _] = pixel.get_pixel(0, 0).0;

    Ok(ColorSample {
        color: format!(
            "srgb({:.6},{:.6},{:.6})",
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0
        ),
        count: source_width as u64 * source_height as u64,
    })
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut output = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder.encode_image(img)?;
    Ok(output)
}
