//! PNG encoding through the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// Decode any raster format the `image` crate understands and re-encode it as PNG.
#[cfg(feature = "transcode")]
pub fn to_png(data: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(data)?;
    encode(&image)
}

/// Raw pixel layouts found in PDF image XObjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawLayout {
    /// 8-bit grayscale, one byte per pixel
    Gray8,
    /// 8-bit RGB, three bytes per pixel
    Rgb8,
}

/// Build a PNG from uncompressed pixel rows.
pub fn encode_raw(width: u32, height: u32, layout: RawLayout, pixels: Vec<u8>) -> Result<Vec<u8>> {
    let image = match layout {
        RawLayout::Gray8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        RawLayout::Rgb8 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| {
        Error::AssetTranscode(format!(
            "pixel buffer does not match {}x{} {:?}",
            width, height, layout
        ))
    })?;

    encode(&image)
}

fn encode(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
