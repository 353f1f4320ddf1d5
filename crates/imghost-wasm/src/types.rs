//! JavaScript-facing image buffer.

use imghost_core::decode::DecodedImage;
use wasm_bindgen::prelude::*;

/// Decoded RGB image held in WASM memory.
///
/// `pixels()` copies the buffer into a new `Uint8Array`; keep the image on
/// the WASM side between edits and only copy out what gets drawn.
#[wasm_bindgen]
pub struct JsDecodedImage {
    inner: DecodedImage,
}

#[wasm_bindgen]
impl JsDecodedImage {
    /// Wrap RGB pixel data (3 bytes per pixel, row-major).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsDecodedImage {
        JsDecodedImage {
            inner: DecodedImage::new(width, height, pixels),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.pixels.len()
    }

    pub fn pixels(&self) -> Vec<u8> {
        self.inner.pixels.clone()
    }

    /// RGBA copy of the pixels, ready for `new ImageData(...)`.
    pub fn rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.inner.pixels.len() / 3 * 4);
        for rgb in self.inner.pixels.chunks_exact(3) {
            out.extend_from_slice(rgb);
            out.push(255);
        }
        out
    }
}

impl JsDecodedImage {
    pub(crate) fn from_decoded(inner: DecodedImage) -> Self {
        Self { inner }
    }

    pub(crate) fn as_decoded(&self) -> &DecodedImage {
        &self.inner
    }
}
