//! Template store: the uploaded base image and its pixel dimensions.
//!
//! A [`Template`] is immutable once decoded. Re-uploading replaces it
//! wholesale; clones share the pixel buffer.

use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;

use crate::codec;
use crate::config::DEFAULT_MAX_TEMPLATE_BYTES;
use crate::error::LaurelError;

/// Decoded template raster.
#[derive(Debug, Clone)]
pub struct Template {
    image: Arc<RgbaImage>,
}

impl Template {
    /// Wrap an already decoded image.
    pub fn from_image(img: DynamicImage) -> Result<Self, LaurelError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(LaurelError::Decode(
                "Failed to get image dimensions".to_string(),
            ));
        }
        Ok(Self {
            image: Arc::new(img.to_rgba8()),
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, GIF, WebP, ...), enforcing the default size limit.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LaurelError> {
        Self::from_bytes_limited(bytes, DEFAULT_MAX_TEMPLATE_BYTES)
    }

    /// Decode encoded image bytes, rejecting inputs larger than `max_bytes`.
    pub fn from_bytes_limited(bytes: &[u8], max_bytes: usize) -> Result<Self, LaurelError> {
        if bytes.is_empty() {
            return Err(LaurelError::Validation("Template is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        let img = decode_image(bytes)?;
        Self::from_image(img)
    }

    /// Decode a base64 `data:` URL.
    pub fn from_data_url(url: &str, max_bytes: usize) -> Result<Self, LaurelError> {
        let data_url = codec::parse_data_url(url)?;
        Self::from_bytes_limited(&data_url.data, max_bytes)
    }

    /// Read and decode an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LaurelError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

#[cfg(feature = "heif")]
fn decode_image(bytes: &[u8]) -> Result<DynamicImage, LaurelError> {
    if is_heic(bytes) {
        return decode_heic(bytes);
    }
    image::load_from_memory(bytes)
        .map_err(|e| LaurelError::Decode(format!("Failed to decode image: {}", e)))
}

#[cfg(not(feature = "heif"))]
fn decode_image(bytes: &[u8]) -> Result<DynamicImage, LaurelError> {
    image::load_from_memory(bytes)
        .map_err(|e| LaurelError::Decode(format!("Failed to decode image: {}", e)))
}

/// Check if the data looks like a HEIC/HEIF file by examining magic bytes.
/// HEIC files have an "ftyp" box near the start with HEIC-related brand codes.
#[cfg(feature = "heif")]
fn is_heic(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    matches!(
        &data[8..12],
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"hevm" | b"hevs" | b"mif1" | b"msf1"
    )
}

/// Decode a HEIC/HEIF image using libheif.
#[cfg(feature = "heif")]
fn decode_heic(data: &[u8]) -> Result<DynamicImage, LaurelError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data)
        .map_err(|e| LaurelError::Decode(format!("Failed to read HEIC: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| LaurelError::Decode(format!("Failed to get primary image: {}", e)))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| LaurelError::Decode(format!("Failed to decode HEIC image: {}", e)))?;

    let planes = decoded.planes();
    let interleaved = planes
        .interleaved
        .ok_or_else(|| LaurelError::Decode("No interleaved RGB data in HEIC".to_string()))?;

    let width = decoded.width();
    let height = decoded.height();
    let stride = interleaved.stride;
    let data = interleaved.data;

    let rgb = image::RgbImage::from_fn(width, height, |x, y| {
        let offset = y as usize * stride + x as usize * 3;
        match data.get(offset..offset + 3) {
            Some(px) => image::Rgb([px[0], px[1], px[2]]),
            None => image::Rgb([255, 255, 255]),
        }
    });

    Ok(DynamicImage::ImageRgb8(rgb))
}

/// Validation error for a template over `max_bytes`.
pub(crate) fn too_large(max_bytes: usize) -> LaurelError {
    LaurelError::Validation(format!(
        "File size too large. Maximum size is {}.",
        human_size(max_bytes)
    ))
}

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeOptions, OutputFormat, encode, to_data_url};
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        encode(&img, &EncodeOptions::default()).unwrap()
    }

    #[test]
    fn test_from_bytes_keeps_dimensions() {
        let template = Template::from_bytes(&png_bytes(800, 600)).unwrap();
        assert_eq!(template.dimensions(), (800, 600));
        assert_eq!(template.image().dimensions(), (800, 600));
    }

    #[test]
    fn test_from_data_url() {
        let url = to_data_url(&png_bytes(40, 30), OutputFormat::Png);
        let template = Template::from_data_url(&url, DEFAULT_MAX_TEMPLATE_BYTES).unwrap();
        assert_eq!(template.width(), 40);
        assert_eq!(template.height(), 30);
    }

    #[test]
    fn test_rejects_malformed_bytes() {
        let err = Template::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, LaurelError::Decode(_)));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(Template::from_bytes(&[]).unwrap_err().is_validation());

        let bytes = png_bytes(10, 10);
        let err = Template::from_bytes_limited(&bytes, bytes.len() - 1).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_clone_shares_pixels() {
        let template = Template::from_bytes(&png_bytes(4, 4)).unwrap();
        let copy = template.clone();
        assert!(std::ptr::eq(template.image(), copy.image()));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(5 * 1024 * 1024), "5MB");
        assert_eq!(human_size(1000), "1000 bytes");
    }
}
