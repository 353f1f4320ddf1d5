//! Image editor preview: color filters plus rotation/scale, rendered from
//! the untouched source on every change.
//!
//! ## Pipeline
//! 1. Filters (brightness → contrast → saturate) on the source pixels
//! 2. Rotate and scale about the centre onto a same-size black canvas
//!
//! Parameters are never accumulated into the source, so [`reset`] always
//! restores the original. There is no undo history.
//!
//! [`reset`]: ImagePreviewer::reset

mod filter;
mod geometry;
mod params;

pub use filter::apply_filters;
pub use geometry::apply_transform;
pub use params::{PreviewParams, Preset, PERCENT_RANGE, ROTATION_RANGE, SCALE_RANGE};

use tracing::debug;

use crate::api::FilePart;
use crate::decode::DecodedImage;
use crate::encode::{encode_jpeg, EncodeError};
use crate::upload::file_part;

/// File name used when the edited image has none.
pub const DEFAULT_EXPORT_NAME: &str = "edited-image.jpg";
pub const EXPORT_CONTENT_TYPE: &str = "image/jpeg";

/// Render `source` with `params` (clamped to their ranges).
pub fn render(source: &DecodedImage, params: &PreviewParams) -> DecodedImage {
    let params = params.clamped();
    if params.is_identity() {
        return source.clone();
    }
    let mut filtered = source.clone();
    apply_filters(&mut filtered.pixels, &params);
    if params.has_transform() {
        apply_transform(&filtered, params.rotation, params.scale)
    } else {
        filtered
    }
}

/// An encoded edit ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedImage {
    pub fn into_file_part(self) -> FilePart {
        file_part(&self.file_name, self.content_type, self.bytes)
    }
}

/// Holds the source bitmap and the current parameters.
#[derive(Debug, Clone)]
pub struct ImagePreviewer {
    source: DecodedImage,
    params: PreviewParams,
    preset: Preset,
}

impl ImagePreviewer {
    pub fn new(source: DecodedImage) -> Self {
        Self {
            source,
            params: PreviewParams::default(),
            preset: Preset::None,
        }
    }

    pub fn source(&self) -> &DecodedImage {
        &self.source
    }

    pub fn params(&self) -> PreviewParams {
        self.params
    }

    /// Replace all parameters at once; values are clamped.
    pub fn set_params(&mut self, params: PreviewParams) {
        self.params = params.clamped();
    }

    pub fn set_brightness(&mut self, percent: f32) {
        self.set_params(PreviewParams {
            brightness: percent,
            ..self.params
        });
    }

    pub fn set_contrast(&mut self, percent: f32) {
        self.set_params(PreviewParams {
            contrast: percent,
            ..self.params
        });
    }

    pub fn set_saturation(&mut self, percent: f32) {
        self.set_params(PreviewParams {
            saturation: percent,
            ..self.params
        });
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.set_params(PreviewParams {
            rotation: degrees,
            ..self.params
        });
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.set_params(PreviewParams {
            scale,
            ..self.params
        });
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.preset = preset;
        self.params.apply_preset(preset);
    }

    /// Back to 100/100/100, 0°, 1×, no preset.
    pub fn reset(&mut self) {
        self.params.reset();
        self.preset = Preset::None;
    }

    pub fn filter_string(&self) -> String {
        self.params.filter_string()
    }

    pub fn render(&self) -> DecodedImage {
        render(&self.source, &self.params)
    }

    /// Encode the rendered image as JPEG, named after `original_name` or
    /// [`DEFAULT_EXPORT_NAME`].
    pub fn export(
        &self,
        original_name: Option<&str>,
        quality_factor: f32,
    ) -> Result<ExportedImage, EncodeError> {
        let rendered = self.render();
        let bytes = encode_jpeg(&rendered, quality_factor)?;
        let file_name = original_name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_EXPORT_NAME)
            .to_string();
        debug!(%file_name, size = bytes.len(), "exported edited image");
        Ok(ExportedImage {
            file_name,
            content_type: EXPORT_CONTENT_TYPE,
            bytes,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_reset_after_any_edits_renders_source(
            edits in prop::collection::vec((0usize..6, -50.0f32..400.0), 0..12)
        ) {
            let src = DecodedImage::filled(5, 3, [12, 200, 77]);
            let mut previewer = ImagePreviewer::new(src.clone());
            for (which, value) in edits {
                match which {
                    0 => previewer.set_brightness(value),
                    1 => previewer.set_contrast(value),
                    2 => previewer.set_saturation(value),
                    3 => previewer.set_rotation(value),
                    4 => previewer.set_scale(value / 100.0),
                    _ => previewer.apply_preset(Preset::ALL[value.abs() as usize % Preset::ALL.len()]),
                }
            }
            previewer.reset();
            prop_assert_eq!(previewer.params(), PreviewParams::default());
            prop_assert_eq!(previewer.render(), src);
        }

        #[test]
        fn prop_render_keeps_dimensions(
            w in 1u32..12,
            h in 1u32..12,
            rotation in 0.0f32..360.0,
            scale in 0.5f32..2.0,
        ) {
            let src = DecodedImage::filled(w, h, [40, 40, 40]);
            let params = PreviewParams { rotation, scale, ..Default::default() };
            let out = render(&src, &params);
            prop_assert_eq!((out.width, out.height), (w, h));
            prop_assert_eq!(out.pixels.len(), (w * h * 3) as usize);
        }
    }
}
