//! Decoding of uploaded or downloaded image bytes with EXIF orientation
//! handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};
use tracing::debug;

use super::{DecodeError, DecodedImage, Orientation};

/// Decode JPEG, PNG or WebP bytes, applying EXIF orientation correction.
///
/// The format is guessed from the content, not from a file name.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be recognised
/// and `DecodeError::CorruptedFile` if decoding fails part-way.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let orientation = extract_orientation(bytes);
    let img = read_dynamic(bytes)?;
    let rgb = apply_orientation(img, orientation).into_rgb8();
    let decoded = DecodedImage::from_rgb_image(rgb);
    if decoded.is_empty() {
        return Err(DecodeError::EmptyImage);
    }
    debug!(
        width = decoded.width,
        height = decoded.height,
        ?orientation,
        "decoded image"
    );
    Ok(decoded)
}

fn read_dynamic(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}

/// EXIF orientation of the bytes; `Normal` when absent or unreadable.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    extract_orientation(bytes)
}

fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
