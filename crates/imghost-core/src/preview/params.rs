//! Editor parameters and filter presets.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Brightness, contrast and saturation, in percent.
pub const PERCENT_RANGE: RangeInclusive<f32> = 0.0..=200.0;
/// Rotation in degrees.
pub const ROTATION_RANGE: RangeInclusive<f32> = 0.0..=360.0;
/// Uniform scale factor.
pub const SCALE_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Everything the previewer applies to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Clockwise, in degrees.
    pub rotation: f32,
    pub scale: f32,
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

impl PreviewParams {
    /// Every field pulled into its slider range; NaN becomes the default.
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            brightness: clamp_to(self.brightness, &PERCENT_RANGE, d.brightness),
            contrast: clamp_to(self.contrast, &PERCENT_RANGE, d.contrast),
            saturation: clamp_to(self.saturation, &PERCENT_RANGE, d.saturation),
            rotation: clamp_to(self.rotation, &ROTATION_RANGE, d.rotation),
            scale: clamp_to(self.scale, &SCALE_RANGE, d.scale),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_filter(&self) -> bool {
        self.brightness != 100.0 || self.contrast != 100.0 || self.saturation != 100.0
    }

    /// 0° and 360° are the same orientation.
    pub fn has_transform(&self) -> bool {
        (self.rotation % 360.0) != 0.0 || self.scale != 1.0
    }

    pub fn is_identity(&self) -> bool {
        !self.has_filter() && !self.has_transform()
    }

    /// The CSS `filter` value for a canvas 2D context.
    pub fn filter_string(&self) -> String {
        format!(
            "brightness({}%) contrast({}%) saturate({}%)",
            self.brightness, self.contrast, self.saturation
        )
    }

    /// Set the components the preset defines; the rest are left alone.
    pub fn apply_preset(&mut self, preset: Preset) {
        let (brightness, contrast, saturation) = preset.components();
        if let Some(b) = brightness {
            self.brightness = b;
        }
        if let Some(c) = contrast {
            self.contrast = c;
        }
        if let Some(s) = saturation {
            self.saturation = s;
        }
    }
}

/// One-click looks offered by the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    None,
    Grayscale,
    Sepia,
    Vintage,
    Bright,
    Contrast,
    Warm,
    Cool,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Preset::None,
        Preset::Grayscale,
        Preset::Sepia,
        Preset::Vintage,
        Preset::Bright,
        Preset::Contrast,
        Preset::Warm,
        Preset::Cool,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Preset::None => "none",
            Preset::Grayscale => "grayscale",
            Preset::Sepia => "sepia",
            Preset::Vintage => "vintage",
            Preset::Bright => "bright",
            Preset::Contrast => "contrast",
            Preset::Warm => "warm",
            Preset::Cool => "cool",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    /// (brightness, contrast, saturation) set by the preset.
    fn components(self) -> (Option<f32>, Option<f32>, Option<f32>) {
        match self {
            Preset::None => (Some(100.0), Some(100.0), Some(100.0)),
            Preset::Grayscale => (None, None, Some(0.0)),
            Preset::Sepia => (Some(110.0), Some(90.0), Some(80.0)),
            Preset::Vintage => (None, Some(120.0), None),
            Preset::Bright => (Some(120.0), Some(110.0), None),
            Preset::Contrast => (None, Some(150.0), None),
            Preset::Warm | Preset::Cool => (None, None, Some(120.0)),
        }
    }
}
