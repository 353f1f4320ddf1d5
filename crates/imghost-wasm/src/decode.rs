//! Image decoding bindings.
//!
//! ```typescript
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const image = decode_image(bytes);
//! const editor = new JsImagePreviewer(image);
//! ```

use crate::types::JsDecodedImage;
use imghost_core::decode;
use wasm_bindgen::prelude::*;

/// Decode JPEG, PNG or WebP bytes, applying the EXIF orientation.
///
/// Fails when the format is not recognized or the data is corrupt.
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8]) -> Result<JsDecodedImage, JsValue> {
    decode::decode_image(bytes)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// EXIF orientation tag (1-8); 1 when absent.
#[wasm_bindgen]
pub fn image_orientation(bytes: &[u8]) -> u8 {
    decode::get_orientation(bytes) as u8
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_decode_invalid_bytes() {
        assert!(decode_image(&[0, 1, 2, 3]).is_err());
    }

    #[wasm_bindgen_test]
    fn test_decode_encoded_jpeg() {
        let source = JsDecodedImage::new(8, 6, vec![90u8; 8 * 6 * 3]);
        let jpeg = crate::encode::encode_jpeg(&source, 0.9).unwrap();
        let image = decode_image(&jpeg).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert_eq!(image_orientation(&jpeg), 1);
    }
}
