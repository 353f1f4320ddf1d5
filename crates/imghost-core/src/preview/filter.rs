//! Color filters with CSS filter-effects semantics.
//!
//! ## Filter Order
//! 1. Brightness: `v * b`
//! 2. Contrast: `(v - 0.5) * c + 0.5`
//! 3. Saturate: the CSS `saturate()` color matrix
//!
//! Factors are the percentages divided by 100. Channels are clamped to
//! `[0, 1]` after every step, as a browser does between chained filters.

use super::PreviewParams;

/// Apply brightness, contrast and saturation to RGB pixel data in place.
pub fn apply_filters(pixels: &mut [u8], params: &PreviewParams) {
    if !params.has_filter() {
        return;
    }
    let b = params.brightness / 100.0;
    let c = params.contrast / 100.0;
    let s = params.saturation / 100.0;

    for chunk in pixels.chunks_exact_mut(3) {
        let mut rgb = [
            chunk[0] as f32 / 255.0,
            chunk[1] as f32 / 255.0,
            chunk[2] as f32 / 255.0,
        ];

        rgb = clamp(apply_brightness(rgb, b));
        rgb = clamp(apply_contrast(rgb, c));
        rgb = clamp(apply_saturate(rgb, s));

        for (out, v) in chunk.iter_mut().zip(rgb) {
            *out = (v * 255.0).round() as u8;
        }
    }
}

#[inline]
fn clamp(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|v| v.clamp(0.0, 1.0))
}

#[inline]
fn apply_brightness(rgb: [f32; 3], b: f32) -> [f32; 3] {
    if b == 1.0 {
        return rgb;
    }
    rgb.map(|v| v * b)
}

#[inline]
fn apply_contrast(rgb: [f32; 3], c: f32) -> [f32; 3] {
    if c == 1.0 {
        return rgb;
    }
    rgb.map(|v| (v - 0.5) * c + 0.5)
}

/// `s = 0` is fully desaturated (luma), `s = 1` is unchanged, `s > 1`
/// oversaturates.
#[inline]
fn apply_saturate(rgb: [f32; 3], s: f32) -> [f32; 3] {
    if s == 1.0 {
        return rgb;
    }
    let [r, g, b] = rgb;
    [
        (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
        (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
        (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
    ]
}
