//! # General disparity objects
//!
//! This module provides the disparity map, the stereo pair it is computed from, and the trait
//! implemented by disparity algorithms.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{GrayImage, Luma, RgbImage};

use crate::colormap;
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of fractional bits in a fixed-point disparity.
pub const DISP_SHIFT: u32 = 4;

/// Fixed-point scale, `1 << DISP_SHIFT`.
pub const DISP_SCALE: i32 = 1 << DISP_SHIFT;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A rectified stereo pair of identically sized grayscale images.
#[derive(Debug, Clone)]
pub struct StereoPair {
    left: GrayImage,
    right: GrayImage,
}

/// A dense fixed-point disparity map.
///
/// Each cell holds either a disparity scaled by [`DISP_SCALE`] or the invalid sentinel
/// `(min_disparity - 1) * DISP_SCALE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisparityMap {
    width: u32,
    height: u32,
    min_disparity: i32,
    num_disparities: i32,
    data: Vec<i16>,
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

pub trait DisparityAlgorithm {
    /// Compute the disparity map of the given stereo pair.
    fn compute(&self, pair: &StereoPair) -> Result<DisparityMap>;
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StereoPair {
    /// Build a pair, rejecting empty or differently sized images.
    pub fn new(left: GrayImage, right: GrayImage) -> Result<Self> {
        check_pair(&left, &right)?;
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &GrayImage {
        &self.left
    }

    pub fn right(&self) -> &GrayImage {
        &self.right
    }

    pub fn width(&self) -> u32 {
        self.left.width()
    }

    pub fn height(&self) -> u32 {
        self.left.height()
    }

    pub fn into_inner(self) -> (GrayImage, GrayImage) {
        (self.left, self.right)
    }
}

impl DisparityMap {
    /// Create a map with every cell set to the invalid sentinel.
    pub fn new(width: u32, height: u32, min_disparity: i32, num_disparities: i32) -> Self {
        let invalid = invalid_value(min_disparity);
        Self {
            width,
            height,
            min_disparity,
            num_disparities,
            data: vec![invalid; width as usize * height as usize],
        }
    }

    pub(crate) fn from_raw(
        width: u32,
        height: u32,
        min_disparity: i32,
        num_disparities: i32,
        data: Vec<i16>,
    ) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            min_disparity,
            num_disparities,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn min_disparity(&self) -> i32 {
        self.min_disparity
    }

    pub fn num_disparities(&self) -> i32 {
        self.num_disparities
    }

    /// The sentinel marking a pixel without a disparity.
    pub fn invalid_value(&self) -> i16 {
        invalid_value(self.min_disparity)
    }

    /// Raw fixed-point cell at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> i16 {
        self.data[self.index(x, y)]
    }

    pub fn put(&mut self, x: u32, y: u32, val: i16) {
        let idx = self.index(x, y);
        self.data[idx] = val;
    }

    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        self.get(x, y) != self.invalid_value()
    }

    /// Disparity in pixels at `(x, y)`, or `None` for an invalid pixel.
    pub fn disparity(&self, x: u32, y: u32) -> Option<f32> {
        let val = self.get(x, y);
        if val == self.invalid_value() {
            None
        } else {
            Some(val as f32 / DISP_SCALE as f32)
        }
    }

    pub fn as_raw(&self) -> &[i16] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<i16> {
        self.data
    }

    pub fn valid_count(&self) -> usize {
        let invalid = self.invalid_value();
        self.data.iter().filter(|&&v| v != invalid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.data.len() - self.valid_count()
    }

    /// Smallest and largest valid disparity in pixels.
    pub fn valid_range(&self) -> Option<(f32, f32)> {
        let invalid = self.invalid_value();
        let (min, max) = self
            .data
            .iter()
            .filter(|&&v| v != invalid)
            .fold((i16::MAX, i16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if min > max {
            None
        } else {
            Some((
                min as f32 / DISP_SCALE as f32,
                max as f32 / DISP_SCALE as f32,
            ))
        }
    }

    /// Converts the map to a normalised GrayImage.
    ///
    /// Every cell, the invalid sentinel included, is stretched from the observed minimum and
    /// maximum onto `0..=255`. A constant map becomes all black.
    pub fn to_luma_normalised(&self) -> GrayImage {
        let norm = self.normalised();
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let v = norm[self.index(x, y)];
            Luma([(v * 255.0).round() as u8])
        })
    }

    /// Converts the map to a jet colour-mapped RgbImage, with the normalisation used by
    /// `to_luma_normalised`.
    pub fn to_color(&self) -> RgbImage {
        let norm = self.normalised();
        RgbImage::from_fn(self.width, self.height, |x, y| {
            colormap::jet(norm[self.index(x, y)])
        })
    }

    fn normalised(&self) -> Vec<f32> {
        let (min, max) = self
            .data
            .iter()
            .fold((i16::MAX, i16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max as f32 - min as f32;

        self.data
            .iter()
            .map(|&v| {
                if range > 0.0 {
                    (v as f32 - min as f32) / range
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Invalid sentinel for a given minimum disparity.
pub fn invalid_value(min_disparity: i32) -> i16 {
    ((min_disparity - 1) * DISP_SCALE) as i16
}

/// Check that both images are non-empty and the same size.
pub(crate) fn check_pair(left: &GrayImage, right: &GrayImage) -> Result<()> {
    for img in [left, right] {
        if img.width() == 0 || img.height() == 0 {
            return Err(Error::EmptyImage {
                width: img.width(),
                height: img.height(),
            });
        }
    }

    if left.dimensions() != right.dimensions() {
        return Err(Error::InputMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_all_invalid() {
        let map = DisparityMap::new(8, 4, 0, 16);
        assert_eq!(map.invalid_value(), -16);
        assert_eq!(map.valid_count(), 0);
        assert_eq!(map.invalid_count(), 32);
        assert_eq!(map.valid_range(), None);
        assert_eq!(map.disparity(3, 2), None);
    }

    #[test]
    fn fixed_point_values_read_back_in_pixels() {
        let mut map = DisparityMap::new(4, 4, -8, 16);
        map.put(1, 1, 8 * DISP_SCALE as i16);
        map.put(2, 1, -(4 * DISP_SCALE as i16) + 8);
        assert_eq!(map.disparity(1, 1), Some(8.0));
        assert_eq!(map.disparity(2, 1), Some(-3.5));
        assert_eq!(map.valid_range(), Some((-3.5, 8.0)));
        assert_eq!(map.valid_count(), 2);
    }

    #[test]
    fn normalisation_spans_full_range() {
        let mut map = DisparityMap::new(2, 1, 0, 16);
        map.put(1, 0, 160);
        let gray = map.to_luma_normalised();
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 0)[0], 255);

        let color = map.to_color();
        assert_eq!(color.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(color.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn pair_rejects_mismatch_and_empty() {
        let a = GrayImage::new(64, 64);
        let b = GrayImage::new(32, 32);
        assert!(matches!(
            StereoPair::new(a.clone(), b),
            Err(Error::InputMismatch { left: (64, 64), right: (32, 32) })
        ));
        assert!(matches!(
            StereoPair::new(GrayImage::new(0, 4), GrayImage::new(0, 4)),
            Err(Error::EmptyImage { .. })
        ));
        assert!(StereoPair::new(a.clone(), a).is_ok());
    }
}
