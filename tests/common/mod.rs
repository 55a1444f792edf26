//! Synthetic stereo pairs shared by the integration tests.

#![allow(dead_code)]

use image::{GrayImage, Luma};

/// Deterministic per-pixel noise.
pub fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([hash(x, y, seed)]))
}

/// Noise smoothed over 2x2 cells, so the pre-filter saturates less often.
pub fn texture(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let a = hash(x / 2, y / 2, seed) as u32;
        let b = hash(x, y, seed ^ 0x9e37_79b9) as u32;
        Luma([((3 * a + b) / 4) as u8])
    })
}

/// `img` translated left by `shift` pixels, the right edge column repeated.
pub fn shift_left(img: &GrayImage, shift: u32) -> GrayImage {
    let w = img.width();
    GrayImage::from_fn(w, img.height(), |x, y| {
        *img.get_pixel((x + shift).min(w - 1), y)
    })
}

/// Add bounded deterministic noise to every pixel.
pub fn perturb(img: &GrayImage, amplitude: i32, seed: u32) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let n = hash(x, y, seed) as i32 % (2 * amplitude + 1) - amplitude;
        let v = img.get_pixel(x, y)[0] as i32 + n;
        Luma([v.clamp(0, 255) as u8])
    })
}

/// A left image and a right image that sees it shifted by `disparity` pixels.
pub fn shifted_pair(width: u32, height: u32, disparity: u32) -> (GrayImage, GrayImage) {
    let left = texture(width, height, 11);
    let right = shift_left(&left, disparity);
    (left, right)
}

fn hash(x: u32, y: u32, seed: u32) -> u8 {
    let mut v = x.wrapping_mul(0x27d4_eb2d) ^ y.wrapping_mul(0x1656_67b1) ^ seed;
    v ^= v >> 15;
    v = v.wrapping_mul(0x85eb_ca6b);
    v ^= v >> 13;
    v = v.wrapping_mul(0xc2b2_ae35);
    v ^= v >> 16;
    (v & 0xff) as u8
}
