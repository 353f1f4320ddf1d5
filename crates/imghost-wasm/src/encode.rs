//! JPEG encoding binding.

use crate::types::JsDecodedImage;
use imghost_core::encode;
use wasm_bindgen::prelude::*;

/// Encode an image as JPEG. `quality_factor` uses the canvas convention
/// (0.0 to 1.0, e.g. 0.9).
#[wasm_bindgen]
pub fn encode_jpeg(image: &JsDecodedImage, quality_factor: f32) -> Result<Vec<u8>, JsValue> {
    encode::encode_jpeg(image.as_decoded(), quality_factor)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_encoder_accepts_wrapped_image() {
        let img = JsDecodedImage::new(10, 10, vec![128u8; 10 * 10 * 3]);
        let jpeg = imghost_core::encode::encode_jpeg(img.as_decoded(), 0.9).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_encode_jpeg_basic() {
        let img = JsDecodedImage::new(50, 50, vec![128u8; 50 * 50 * 3]);
        let jpeg = encode_jpeg(&img, 0.9).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[wasm_bindgen_test]
    fn test_encode_jpeg_mismatched_buffer() {
        let img = JsDecodedImage::new(100, 100, vec![128u8; 50 * 50 * 3]);
        assert!(encode_jpeg(&img, 0.9).is_err());
    }
}
