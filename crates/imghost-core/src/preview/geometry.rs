//! Rotation and scale about the image centre, drawn onto a canvas of the
//! source's own size.
//!
//! # Algorithm
//!
//! The forward transform matches a 2D canvas context doing
//! `translate(c) · rotate(θ) · scale(s) · translate(-c)` with y pointing
//! down, so positive angles turn the image clockwise on screen. The output
//! is produced by inverse mapping: for each destination pixel centre,
//!
//! ```text
//! dx = x - cx,  dy = y - cy
//! src_x = ( dx * cos θ + dy * sin θ) / s + cx
//! src_y = (-dx * sin θ + dy * cos θ) / s + cy
//! ```
//!
//! and the source is sampled bilinearly there. Destination pixels that map
//! outside the source stay black.

use crate::decode::DecodedImage;

/// Rotate by `rotation_degrees` (clockwise) and scale by `scale` around the
/// centre. The output has the same dimensions as `image`.
pub fn apply_transform(image: &DecodedImage, rotation_degrees: f32, scale: f32) -> DecodedImage {
    let turn = (rotation_degrees as f64).rem_euclid(360.0);
    if (turn.abs() < 1e-9 || (360.0 - turn).abs() < 1e-9) && scale == 1.0 {
        return image.clone();
    }
    if image.is_empty() || scale <= 0.0 || !scale.is_finite() {
        return DecodedImage::filled(image.width, image.height, [0, 0, 0]);
    }

    let (w, h) = (image.width, image.height);
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let theta = turn.to_radians();
    let (sin, cos) = theta.sin_cos();
    let inv_scale = 1.0 / scale as f64;

    let mut output = vec![0u8; w as usize * h as usize * 3];

    for dst_y in 0..h {
        for dst_x in 0..w {
            // Work at pixel centres.
            let dx = dst_x as f64 + 0.5 - cx;
            let dy = dst_y as f64 + 0.5 - cy;

            let src_x = (dx * cos + dy * sin) * inv_scale + cx - 0.5;
            let src_y = (-dx * sin + dy * cos) * inv_scale + cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, src_x, src_y) {
                let idx = (dst_y as usize * w as usize + dst_x as usize) * 3;
                output[idx..idx + 3].copy_from_slice(&pixel);
            }
        }
    }

    DecodedImage::new(w, h, output)
}

#[inline]
fn get_pixel_f64(image: &DecodedImage, px: usize, py: usize) -> [f64; 3] {
    let idx = (py * image.width as usize + px) * 3;
    [
        image.pixels[idx] as f64,
        image.pixels[idx + 1] as f64,
        image.pixels[idx + 2] as f64,
    ]
}

/// Bilinear sample at pixel coordinates `(x, y)` (integers are pixel
/// centres). Points within half a pixel of the border are covered and use
/// the edge pixels; anything further out is `None`.
fn sample_bilinear(image: &DecodedImage, x: f64, y: f64) -> Option<[u8; 3]> {
    let (w, h) = (image.width as f64, image.height as f64);
    if x < -0.5 || x > w - 0.5 || y < -0.5 || y > h - 0.5 {
        return None;
    }

    let max_x = image.width as usize - 1;
    let max_y = image.height as usize - 1;
    let x = x.clamp(0.0, max_x as f64);
    let y = y.clamp(0.0, max_y as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(max_x);
    let y1 = (y0 + 1).min(max_y);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_pixel_f64(image, x0, y0);
    let p10 = get_pixel_f64(image, x1, y0);
    let p01 = get_pixel_f64(image, x0, y1);
    let p11 = get_pixel_f64(image, x1, y1);

    let mut result = [0u8; 3];
    for i in 0..3 {
        let v = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 image whose pixels encode their position: R = x * 100, G = y * 100.
    fn gradient() -> DecodedImage {
        let mut pixels = Vec::new();
        for y in 0..3u8 {
            for x in 0..3u8 {
                pixels.extend_from_slice(&[x * 100, y * 100, 50]);
            }
        }
        DecodedImage::new(3, 3, pixels)
    }

    // ===== Identity Tests =====

    #[test]
    fn test_identity_returns_copy() {
        let img = gradient();
        assert_eq!(apply_transform(&img, 0.0, 1.0), img);
        assert_eq!(apply_transform(&img, 360.0, 1.0), img);
    }

    // ===== Rotation Tests =====

    #[test]
    fn test_rotate_180() {
        let img = gradient();
        let out = apply_transform(&img, 180.0, 1.0);
        assert_eq!(out.pixel(0, 0), img.pixel(2, 2));
        assert_eq!(out.pixel(2, 0), img.pixel(0, 2));
        assert_eq!(out.pixel(1, 1), img.pixel(1, 1));
    }

    #[test]
    fn test_rotate_90_is_clockwise() {
        let img = gradient();
        let out = apply_transform(&img, 90.0, 1.0);
        // Clockwise: the top-left corner moves to the top-right.
        assert_eq!(out.pixel(2, 0), img.pixel(0, 0));
        assert_eq!(out.pixel(0, 0), img.pixel(0, 2));
        assert_eq!(out.pixel(2, 2), img.pixel(2, 0));
    }

    #[test]
    fn test_rotation_keeps_dimensions() {
        let img = DecodedImage::filled(40, 10, [200, 200, 200]);
        let out = apply_transform(&img, 45.0, 1.0);
        assert_eq!((out.width, out.height), (40, 10));
        // Corners of a wide image rotated 45° are uncovered.
        assert_eq!(out.pixel(0, 0), [0, 0, 0]);
        assert_eq!(out.pixel(20, 5), [200, 200, 200]);
    }

    // ===== Scale Tests =====

    #[test]
    fn test_scale_down_leaves_black_border() {
        let img = DecodedImage::filled(8, 8, [255, 255, 255]);
        let out = apply_transform(&img, 0.0, 0.5);
        assert_eq!(out.pixel(0, 0), [0, 0, 0]);
        assert_eq!(out.pixel(7, 7), [0, 0, 0]);
        assert_eq!(out.pixel(4, 4), [255, 255, 255]);
    }

    #[test]
    fn test_scale_up_crops_to_centre() {
        let img = gradient();
        let out = apply_transform(&img, 0.0, 2.0);
        // Every output pixel is covered and the centre is unchanged.
        assert_eq!(out.pixel(1, 1), img.pixel(1, 1));
        assert_ne!(out.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_empty_image() {
        let img = DecodedImage::new(0, 0, vec![]);
        assert!(apply_transform(&img, 30.0, 1.0).is_empty());
    }
}
