//! Image editor bindings.
//!
//! ```typescript
//! const editor = new JsImagePreviewer(decode_image(bytes));
//! editor.set_brightness(130);
//! editor.apply_preset("sepia");
//! ctx.putImageData(new ImageData(new Uint8ClampedArray(editor.render().rgba()), w, h), 0, 0);
//! ```

use crate::types::JsDecodedImage;
use imghost_core::config::DEFAULT_EXPORT_QUALITY;
use imghost_core::preview::{ExportedImage, ImagePreviewer, PreviewParams, Preset};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct JsImagePreviewer {
    inner: ImagePreviewer,
}

#[wasm_bindgen]
impl JsImagePreviewer {
    #[wasm_bindgen(constructor)]
    pub fn new(source: &JsDecodedImage) -> JsImagePreviewer {
        JsImagePreviewer {
            inner: ImagePreviewer::new(source.as_decoded().clone()),
        }
    }

    /// Current parameters as `{brightness, contrast, saturation, rotation, scale}`.
    pub fn params(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.params())?)
    }

    /// Replace parameters from a (possibly partial) object; missing fields
    /// take their defaults.
    pub fn set_params(&mut self, params: JsValue) -> Result<(), JsValue> {
        let params: PreviewParams = serde_wasm_bindgen::from_value(params)?;
        self.inner.set_params(params);
        Ok(())
    }

    pub fn set_brightness(&mut self, percent: f32) {
        self.inner.set_brightness(percent);
    }

    pub fn set_contrast(&mut self, percent: f32) {
        self.inner.set_contrast(percent);
    }

    pub fn set_saturation(&mut self, percent: f32) {
        self.inner.set_saturation(percent);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.inner.set_rotation(degrees);
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.inner.set_scale(scale);
    }

    /// Apply a preset by id (`"none"`, `"grayscale"`, `"sepia"`, ...).
    pub fn apply_preset(&mut self, id: &str) -> Result<(), JsValue> {
        let preset = Preset::from_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown preset: {id}")))?;
        self.inner.apply_preset(preset);
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn preset(&self) -> String {
        self.inner.preset().id().to_string()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// CSS `filter` value for drawing the preview with a canvas context.
    pub fn filter_string(&self) -> String {
        self.inner.filter_string()
    }

    pub fn render(&self) -> JsDecodedImage {
        JsDecodedImage::from_decoded(self.inner.render())
    }

    /// Render and encode as JPEG; the quality factor defaults to 0.9.
    pub fn export_jpeg(&self, quality_factor: Option<f32>) -> Result<Vec<u8>, JsValue> {
        self.export(None, quality_factor).map(|exported| exported.bytes)
    }
}

impl JsImagePreviewer {
    pub(crate) fn export(
        &self,
        original_name: Option<&str>,
        quality_factor: Option<f32>,
    ) -> Result<ExportedImage, JsValue> {
        self.inner
            .export(
                original_name,
                quality_factor.unwrap_or(DEFAULT_EXPORT_QUALITY),
            )
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Every preset id, in display order.
#[wasm_bindgen]
pub fn preset_ids() -> Vec<String> {
    Preset::ALL.iter().map(|p| p.id().to_string()).collect()
}
