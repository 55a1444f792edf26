//! # Pre-filtering
//!
//! Normalises both images of a pair before matching so that exposure differences between the two
//! cameras do not dominate the matching cost. The output of every filter is a response clamped to
//! `±pre_filter_cap` and offset by `pre_filter_cap`, so it lies in `0..=2 * cap`.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{GrayImage, Luma};
use imageproc::{filter::box_filter, gradients::horizontal_sobel};

use crate::params::{ParameterSet, PreFilterType};

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Apply the pre-filter selected by `params` to one image.
pub fn apply(image: &GrayImage, params: &ParameterSet) -> GrayImage {
    match params.pre_filter_type {
        PreFilterType::NormalizedResponse => {
            normalized_response(image, params.pre_filter_size, params.pre_filter_cap)
        }
        PreFilterType::XSobel => x_sobel(image, params.pre_filter_cap),
    }
}

/// Centre-weighted intensity minus the mean of a `size x size` neighbourhood.
///
/// Pixels outside the image are replaced by the nearest edge pixel.
pub fn normalized_response(image: &GrayImage, size: i32, cap: i32) -> GrayImage {
    let radius = (size / 2).max(0) as u32;
    let mean = box_filter(image, radius, radius);
    let (w, h) = image.dimensions();

    let px = |x: i64, y: i64| -> i32 {
        let x = x.clamp(0, w as i64 - 1) as u32;
        let y = y.clamp(0, h as i64 - 1) as u32;
        image.get_pixel(x, y)[0] as i32
    };

    GrayImage::from_fn(w, h, |x, y| {
        let (xi, yi) = (x as i64, y as i64);
        let centre = 4 * px(xi, yi) + px(xi - 1, yi) + px(xi + 1, yi) + px(xi, yi - 1) + px(xi, yi + 1);
        let local_mean = mean.get_pixel(x, y)[0] as i32;
        let response = (centre - 8 * local_mean) / 8;
        Luma([cap_response(response, cap)])
    })
}

/// Horizontal 3x3 Sobel response.
pub fn x_sobel(image: &GrayImage, cap: i32) -> GrayImage {
    let sobel = horizontal_sobel(image);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([cap_response(sobel.get_pixel(x, y)[0] as i32, cap)])
    })
}

fn cap_response(response: i32, cap: i32) -> u8 {
    (response.clamp(-cap, cap) + cap) as u8
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(w: u32, h: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let mut v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed;
            v ^= v >> 13;
            v = v.wrapping_mul(0x5bd1_e995);
            v ^= v >> 15;
            Luma([(v & 0xff) as u8])
        })
    }

    #[test]
    fn uniform_image_maps_to_cap() {
        let img = GrayImage::from_pixel(16, 16, Luma([120]));
        let params = ParameterSet::default().with_pre_filter_size(9).with_pre_filter_cap(20);
        assert!(apply(&img, &params).pixels().all(|p| p[0] == 20));

        let params = params.with_pre_filter_type(PreFilterType::XSobel);
        assert!(apply(&img, &params).pixels().all(|p| p[0] == 20));
    }

    #[test]
    fn response_stays_within_cap() {
        let img = noise(32, 24, 7);
        for cap in [1, 15, 63] {
            let out = normalized_response(&img, 9, cap);
            assert!(out.pixels().all(|p| (p[0] as i32) <= 2 * cap));
            let out = x_sobel(&img, cap);
            assert!(out.pixels().all(|p| (p[0] as i32) <= 2 * cap));
        }
    }

    #[test]
    fn response_is_translation_equivariant_in_the_interior() {
        let img = noise(48, 16, 3);
        let shifted = GrayImage::from_fn(48, 16, |x, y| *img.get_pixel((x + 5).min(47), y));

        let a = normalized_response(&img, 7, 31);
        let b = normalized_response(&shifted, 7, 31);
        for y in 0..16 {
            for x in 10..30 {
                assert_eq!(a.get_pixel(x + 5, y), b.get_pixel(x, y));
            }
        }
    }
}
