//! JPEG encoding for saving edited images.
//!
//! Callers speak in the canvas-style quality factor (0.0 to 1.0); the
//! encoder takes the integer JPEG quality (1 to 100).

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use thiserror::Error;

use crate::config::DEFAULT_EXPORT_QUALITY;
use crate::decode::DecodedImage;

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Map a 0.0–1.0 quality factor onto JPEG quality 1–100.
///
/// Non-finite factors fall back to the default export quality.
pub fn quality_from_factor(factor: f32) -> u8 {
    let factor = if factor.is_finite() {
        factor
    } else {
        DEFAULT_EXPORT_QUALITY
    };
    (factor.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode an RGB bitmap to JPEG bytes at the given quality factor.
pub fn encode_jpeg(image: &DecodedImage, quality_factor: f32) -> Result<Vec<u8>, EncodeError> {
    let DecodedImage {
        width,
        height,
        ref pixels,
    } = *image;
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: pixels.len(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality_from_factor(quality_factor))
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}
