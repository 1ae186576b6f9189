//! Image encoding, `data:` URL framing and output file naming.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{Rgba, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::LaurelError;

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = LaurelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(LaurelError::Validation(format!(
                "Unknown output format '{}' (expected png or jpeg)",
                other
            ))),
        }
    }
}

/// How a rendered canvas is turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    /// JPEG quality, 1-100. Ignored for PNG.
    pub jpeg_quality: u8,
    /// Favour speed over size (previews).
    pub fast: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            jpeg_quality: 90,
            fast: false,
        }
    }
}

impl EncodeOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Options for a quick preview render.
    pub fn preview() -> Self {
        Self {
            fast: true,
            ..Default::default()
        }
    }
}

/// Encode an RGBA canvas.
pub fn encode(img: &RgbaImage, options: &EncodeOptions) -> Result<Vec<u8>, LaurelError> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);

    match options.format {
        OutputFormat::Png => {
            let compression = if options.fast {
                CompressionType::Fast
            } else {
                CompressionType::Default
            };
            let encoder = PngEncoder::new_with_quality(&mut cursor, compression, FilterType::Adaptive);
            img.write_with_encoder(encoder)
                .map_err(|e| LaurelError::Encode(format!("PNG encoding failed: {}", e)))?;
        }
        OutputFormat::Jpeg => {
            let quality = options.jpeg_quality.clamp(1, 100);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            flatten_on_white(img)
                .write_with_encoder(encoder)
                .map_err(|e| LaurelError::Encode(format!("JPEG encoding failed: {}", e)))?;
        }
    }

    Ok(bytes)
}

/// JPEG has no alpha channel; composite transparent areas over white.
fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let alpha = a as f32 / 255.0;
        let over = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Parse a base64 `data:` URL (`data:image/png;base64,....`).
pub fn parse_data_url(url: &str) -> Result<DataUrl, LaurelError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| LaurelError::Decode("Invalid template URL format".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| LaurelError::Decode("Invalid template URL format".to_string()))?;

    let mut parts = header.split(';');
    let mime_type = parts.next().unwrap_or("").to_string();
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(LaurelError::Decode(
            "Only base64-encoded data URLs are supported".to_string(),
        ));
    }

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(LaurelError::Decode("Data URL has no payload".to_string()));
    }

    let data = BASE64
        .decode(payload.as_bytes())
        .map_err(|e| LaurelError::Decode(format!("Invalid base64 payload: {}", e)))?;

    Ok(DataUrl { mime_type, data })
}

/// Frame encoded bytes as a `data:` URL.
pub fn to_data_url(bytes: &[u8], format: OutputFormat) -> String {
    format!("data:{};base64,{}", format.mime_type(), BASE64.encode(bytes))
}

/// Download file name for a recipient: `certificate_<name>.<ext>`.
///
/// Whitespace runs collapse to a single `_`; path separators and characters
/// that are invalid in common filesystems become `_`.
pub fn certificate_file_name(recipient: &str, format: OutputFormat) -> String {
    let mut stem = String::with_capacity(recipient.len());
    let mut in_space = false;

    for ch in recipient.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => stem.push('_'),
            c if c.is_control() => stem.push('_'),
            c => stem.push(c),
        }
    }

    if stem.is_empty() || stem.chars().all(|c| c == '.' || c == '_') {
        stem = "unnamed".to_string();
    }

    format!("certificate_{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_name_collapses_whitespace() {
        assert_eq!(
            certificate_file_name("Ada   Lovelace", OutputFormat::Png),
            "certificate_Ada_Lovelace.png"
        );
        assert_eq!(
            certificate_file_name(" Grace\tHopper ", OutputFormat::Jpeg),
            "certificate_Grace_Hopper.jpg"
        );
    }

    #[test]
    fn test_file_name_strips_path_separators() {
        assert_eq!(
            certificate_file_name("../etc/passwd", OutputFormat::Png),
            "certificate_.._etc_passwd.png"
        );
        assert_eq!(certificate_file_name("   ", OutputFormat::Png), "certificate_unnamed.png");
    }

    #[test]
    fn test_parse_data_url() {
        let url = to_data_url(b"hello", OutputFormat::Png);
        assert!(url.starts_with("data:image/png;base64,"));
        let parsed = parse_data_url(&url).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.data, b"hello");
    }

    #[test]
    fn test_parse_data_url_rejects_garbage() {
        assert!(parse_data_url("https://example.com/a.png").is_err());
        assert!(parse_data_url("data:image/png;base64").is_err());
        assert!(parse_data_url("data:image/png,plain").is_err());
        assert!(parse_data_url("data:image/png;base64,").is_err());
        assert!(parse_data_url("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_encode_png_and_jpeg() {
        let img = RgbaImage::from_pixel(16, 8, Rgba([200, 10, 10, 255]));

        let png = encode(&img, &EncodeOptions::default()).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));

        let jpeg = encode(&img, &EncodeOptions::new(OutputFormat::Jpeg)).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_flatten_transparent_is_white() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("gif".parse::<OutputFormat>().is_err());
        let fmt: OutputFormat = serde_json::from_str("\"jpg\"").unwrap();
        assert_eq!(fmt, OutputFormat::Jpeg);
    }
}
