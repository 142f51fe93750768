//! Decoding of signature and stamp images into PDF image payloads

use std::io::Write;

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ColorType, ImageFormat};
use shared_types::{hash_document, DocsignError, Result};

/// Pixel data ready to be written as an image XObject
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub bits_per_component: u8,
    pub filter: &'static str,
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, when the source had transparency
    pub alpha: Option<Vec<u8>>,
    /// Digest of the source bytes, used to share one XObject per image
    pub source_digest: String,
}

impl RasterImage {
    /// Decode PNG or JPEG bytes. Anything else is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|e| DocsignError::UnsupportedAssetFormat(e.to_string()))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(DocsignError::UnsupportedAssetFormat(format!(
                "{:?} images are not supported",
                format
            )));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| DocsignError::UnsupportedAssetFormat(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(DocsignError::UnsupportedAssetFormat(
                "image has no pixels".to_string(),
            ));
        }
        let source_digest = hash_document(bytes);

        if format == ImageFormat::Jpeg {
            // JPEG streams embed as-is
            let color_space = match decoded.color() {
                ColorType::L8 | ColorType::La8 => "DeviceGray",
                _ => "DeviceRGB",
            };
            return Ok(Self {
                width,
                height,
                color_space,
                bits_per_component: 8,
                filter: "DCTDecode",
                data: bytes.to_vec(),
                alpha: None,
                source_digest,
            });
        }

        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut has_alpha = false;
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            if a != 255 {
                has_alpha = true;
            }
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        Ok(Self {
            width,
            height,
            color_space: "DeviceRGB",
            bits_per_component: 8,
            filter: "FlateDecode",
            data: flate_compress(&rgb)?,
            alpha: if has_alpha {
                Some(flate_compress(&alpha)?)
            } else {
                None
            },
            source_digest,
        })
    }

    /// Decode a `data:image/png;base64,...` URL as produced by signature pads
    pub fn from_data_url(url: &str) -> Result<Self> {
        Self::decode(&decode_data_url(url)?)
    }
}

/// Extract the payload of a base64 data URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| DocsignError::UnsupportedAssetFormat("not a data URL".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(DocsignError::UnsupportedAssetFormat(format!(
            "data URL is not base64 encoded: {}",
            header
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DocsignError::UnsupportedAssetFormat(format!("invalid base64: {}", e)))
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| DocsignError::Pdf(format!("failed to compress image: {}", e)))
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    /// Encode a solid RGBA image
    pub fn png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, alpha]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}
