//! # Block matching parameters
//!
//! This module provides the immutable parameter record consumed by the block matcher, the legal
//! range of each parameter, and the snapping rules an input layer (slider, CLI flag) applies
//! before a value reaches the matcher.
//!
//! The matcher itself never fixes a bad value: `ParameterSet::validate` reports it instead.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::disparity::DISP_SCALE;
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Smallest pre-filter and block window size.
pub const MIN_WINDOW_SIZE: i32 = 5;

/// Largest pre-filter and block window size.
pub const MAX_WINDOW_SIZE: i32 = 255;

/// Largest pre-filter cap.
pub const MAX_PRE_FILTER_CAP: i32 = 63;

/// `num_disparities` must be a positive multiple of this.
pub const DISPARITY_STEP: i32 = 16;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// The normalisation pass applied to both images before matching.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreFilterType {
    /// Centre-weighted intensity minus the local box mean.
    #[default]
    NormalizedResponse,

    /// Horizontal Sobel response.
    XSobel,
}

/// One of the ten tunable integer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    PreFilterSize,
    PreFilterCap,
    BlockSize,
    MinDisparity,
    NumDisparities,
    TextureThreshold,
    UniquenessRatio,
    SpeckleWindowSize,
    SpeckleRange,
    Disp12MaxDiff,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Parameters of one block matching run.
///
/// The value is `Copy` and is rebuilt (or edited through the `with_*` methods) on every change,
/// then passed by value into the matcher.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ParameterSet {
    pub pre_filter_type: PreFilterType,
    pub pre_filter_size: i32,
    pub pre_filter_cap: i32,
    pub block_size: i32,
    pub min_disparity: i32,
    pub num_disparities: i32,
    pub texture_threshold: i32,
    pub uniqueness_ratio: i32,
    pub speckle_window_size: i32,
    pub speckle_range: i32,
    pub disp12_max_diff: i32,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            pre_filter_type: PreFilterType::NormalizedResponse,
            pre_filter_size: 41,
            pre_filter_cap: 31,
            block_size: 41,
            min_disparity: -64,
            num_disparities: 128,
            texture_threshold: 10,
            uniqueness_ratio: 15,
            speckle_window_size: 0,
            speckle_range: 0,
            disp12_max_diff: -1,
        }
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pre_filter_type(mut self, kind: PreFilterType) -> Self {
        self.pre_filter_type = kind;
        self
    }

    pub fn with_pre_filter_size(mut self, size: i32) -> Self {
        self.pre_filter_size = size;
        self
    }

    pub fn with_pre_filter_cap(mut self, cap: i32) -> Self {
        self.pre_filter_cap = cap;
        self
    }

    pub fn with_block_size(mut self, size: i32) -> Self {
        self.block_size = size;
        self
    }

    /// Set the searched range as `min..min + num`.
    pub fn with_disparity_range(mut self, min: i32, num: i32) -> Self {
        self.min_disparity = min;
        self.num_disparities = num;
        self
    }

    pub fn with_texture_threshold(mut self, threshold: i32) -> Self {
        self.texture_threshold = threshold;
        self
    }

    pub fn with_uniqueness_ratio(mut self, ratio: i32) -> Self {
        self.uniqueness_ratio = ratio;
        self
    }

    /// Set the speckle filter region size and neighbour range. A size of 0 disables it.
    pub fn with_speckle(mut self, window_size: i32, range: i32) -> Self {
        self.speckle_window_size = window_size;
        self.speckle_range = range;
        self
    }

    /// Set the left/right consistency tolerance, `-1` disables the check.
    pub fn with_disp12_max_diff(mut self, diff: i32) -> Self {
        self.disp12_max_diff = diff;
        self
    }

    /// Read a single integer parameter.
    pub fn get(&self, param: Parameter) -> i32 {
        match param {
            Parameter::PreFilterSize => self.pre_filter_size,
            Parameter::PreFilterCap => self.pre_filter_cap,
            Parameter::BlockSize => self.block_size,
            Parameter::MinDisparity => self.min_disparity,
            Parameter::NumDisparities => self.num_disparities,
            Parameter::TextureThreshold => self.texture_threshold,
            Parameter::UniquenessRatio => self.uniqueness_ratio,
            Parameter::SpeckleWindowSize => self.speckle_window_size,
            Parameter::SpeckleRange => self.speckle_range,
            Parameter::Disp12MaxDiff => self.disp12_max_diff,
        }
    }

    /// Return a copy with one parameter replaced. The value is stored as given.
    pub fn with(mut self, param: Parameter, value: i32) -> Self {
        let field = match param {
            Parameter::PreFilterSize => &mut self.pre_filter_size,
            Parameter::PreFilterCap => &mut self.pre_filter_cap,
            Parameter::BlockSize => &mut self.block_size,
            Parameter::MinDisparity => &mut self.min_disparity,
            Parameter::NumDisparities => &mut self.num_disparities,
            Parameter::TextureThreshold => &mut self.texture_threshold,
            Parameter::UniquenessRatio => &mut self.uniqueness_ratio,
            Parameter::SpeckleWindowSize => &mut self.speckle_window_size,
            Parameter::SpeckleRange => &mut self.speckle_range,
            Parameter::Disp12MaxDiff => &mut self.disp12_max_diff,
        };
        *field = value;
        self
    }

    /// Largest disparity searched.
    pub fn max_disparity(&self) -> i32 {
        self.min_disparity + self.num_disparities - 1
    }

    /// Check every parameter against its legal range, and the block size against the image.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        check_odd_window(Parameter::PreFilterSize, self.pre_filter_size)?;

        if !(1..=MAX_PRE_FILTER_CAP).contains(&self.pre_filter_cap) {
            return Err(out_of_range(
                Parameter::PreFilterCap,
                self.pre_filter_cap,
                "must be within 1..=63",
            ));
        }

        check_odd_window(Parameter::BlockSize, self.block_size)?;

        if self.num_disparities <= 0 || self.num_disparities % DISPARITY_STEP != 0 {
            return Err(out_of_range(
                Parameter::NumDisparities,
                self.num_disparities,
                "must be a positive multiple of 16",
            ));
        }

        // Both the sentinel and the largest disparity are stored as 16-bit fixed point
        let lowest = (self.min_disparity as i64 - 1) * DISP_SCALE as i64;
        let highest = (self.min_disparity as i64 + self.num_disparities as i64) * DISP_SCALE as i64;
        if lowest < i16::MIN as i64 {
            return Err(out_of_range(
                Parameter::MinDisparity,
                self.min_disparity,
                "must be at least -2047",
            ));
        }
        if highest > i16::MAX as i64 {
            return Err(out_of_range(
                Parameter::NumDisparities,
                self.num_disparities,
                "min_disparity + num_disparities must not exceed 2047",
            ));
        }

        for param in [
            Parameter::TextureThreshold,
            Parameter::UniquenessRatio,
            Parameter::SpeckleWindowSize,
            Parameter::SpeckleRange,
        ] {
            let value = self.get(param);
            if value < 0 {
                return Err(out_of_range(param, value, "must be non-negative"));
            }
        }

        if self.disp12_max_diff < -1 {
            return Err(out_of_range(
                Parameter::Disp12MaxDiff,
                self.disp12_max_diff,
                "must be -1 (disabled) or non-negative",
            ));
        }

        if self.block_size as i64 > width.min(height) as i64 {
            return Err(Error::BlockSizeTooLarge {
                block_size: self.block_size,
                width,
                height,
            });
        }

        Ok(())
    }
}

impl Parameter {
    pub const ALL: [Parameter; 10] = [
        Parameter::PreFilterSize,
        Parameter::PreFilterCap,
        Parameter::BlockSize,
        Parameter::MinDisparity,
        Parameter::NumDisparities,
        Parameter::TextureThreshold,
        Parameter::UniquenessRatio,
        Parameter::SpeckleWindowSize,
        Parameter::SpeckleRange,
        Parameter::Disp12MaxDiff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::PreFilterSize => "pre_filter_size",
            Parameter::PreFilterCap => "pre_filter_cap",
            Parameter::BlockSize => "block_size",
            Parameter::MinDisparity => "min_disparity",
            Parameter::NumDisparities => "num_disparities",
            Parameter::TextureThreshold => "texture_threshold",
            Parameter::UniquenessRatio => "uniqueness_ratio",
            Parameter::SpeckleWindowSize => "speckle_window_size",
            Parameter::SpeckleRange => "speckle_range",
            Parameter::Disp12MaxDiff => "disp12_max_diff",
        }
    }

    /// Bounds of the input control for this parameter.
    ///
    /// `dims` is the smallest width and height over the loaded images, if any; it caps the block
    /// size.
    pub fn range(self, dims: Option<(u32, u32)>) -> RangeInclusive<i32> {
        match self {
            Parameter::PreFilterSize => MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE,
            Parameter::PreFilterCap => 1..=MAX_PRE_FILTER_CAP,
            Parameter::BlockSize => MIN_WINDOW_SIZE..=max_block_size(dims),
            Parameter::MinDisparity => -255..=255,
            Parameter::NumDisparities => DISPARITY_STEP..=256,
            Parameter::TextureThreshold
            | Parameter::UniquenessRatio
            | Parameter::SpeckleWindowSize
            | Parameter::SpeckleRange => 0..=100,
            Parameter::Disp12MaxDiff => -1..=100,
        }
    }

    /// Coerce a raw control value into a legal one.
    ///
    /// Window sizes are forced odd by stepping down, the number of disparities is rounded down to
    /// a multiple of 16, and the result is clamped into `range`.
    pub fn snap(self, value: i32, dims: Option<(u32, u32)>) -> i32 {
        let range = self.range(dims);
        match self {
            Parameter::PreFilterSize | Parameter::BlockSize => {
                let value = value.clamp(*range.start(), *range.end());
                if value % 2 == 0 {
                    value - 1
                } else {
                    value
                }
            }
            Parameter::NumDisparities => {
                let value = value - value.rem_euclid(DISPARITY_STEP);
                value.clamp(*range.start(), *range.end())
            }
            _ => value.clamp(*range.start(), *range.end()),
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Largest block size allowed for images of the given size: the smaller dimension, kept within
/// `5..=255`.
pub fn max_block_size(dims: Option<(u32, u32)>) -> i32 {
    let mut value = MAX_WINDOW_SIZE;
    if let Some((w, h)) = dims {
        value = value.min(w.min(h).min(i32::MAX as u32) as i32);
    }
    value.max(MIN_WINDOW_SIZE)
}

fn check_odd_window(param: Parameter, value: i32) -> Result<()> {
    if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&value) || value % 2 == 0 {
        return Err(out_of_range(param, value, "must be odd and within 5..=255"));
    }
    Ok(())
}

fn out_of_range(param: Parameter, value: i32, expected: &'static str) -> Error {
    Error::ParameterOutOfRange {
        parameter: param.name(),
        value,
        expected,
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_for_vga() {
        assert!(ParameterSet::default().validate(640, 480).is_ok());
    }

    #[test]
    fn even_block_size_is_rejected() {
        let params = ParameterSet::default().with_block_size(20);
        match params.validate(640, 480) {
            Err(Error::ParameterOutOfRange { parameter, value, .. }) => {
                assert_eq!(parameter, "block_size");
                assert_eq!(value, 20);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn block_size_is_capped_by_image() {
        let params = ParameterSet::default().with_block_size(41);
        assert!(matches!(
            params.validate(40, 480),
            Err(Error::BlockSizeTooLarge { block_size: 41, .. })
        ));
    }

    #[test]
    fn fixed_point_overflow_is_rejected() {
        let params = ParameterSet::default().with_disparity_range(2000, 64);
        assert!(matches!(
            params.validate(640, 480),
            Err(Error::ParameterOutOfRange { parameter: "num_disparities", .. })
        ));

        let params = ParameterSet::default().with_disparity_range(-3000, 16);
        assert!(matches!(
            params.validate(640, 480),
            Err(Error::ParameterOutOfRange { parameter: "min_disparity", .. })
        ));
    }

    #[test]
    fn disp12_below_minus_one_is_rejected() {
        let params = ParameterSet::default().with_disp12_max_diff(-2);
        assert!(params.validate(640, 480).is_err());
        let params = ParameterSet::default().with_disp12_max_diff(-1);
        assert!(params.validate(640, 480).is_ok());
    }

    #[test]
    fn snapping_follows_control_rules() {
        assert_eq!(Parameter::BlockSize.snap(20, None), 19);
        assert_eq!(Parameter::BlockSize.snap(21, None), 21);
        assert_eq!(Parameter::BlockSize.snap(300, None), 255);
        assert_eq!(Parameter::BlockSize.snap(100, Some((64, 32))), 31);
        assert_eq!(Parameter::PreFilterSize.snap(2, None), 5);
        assert_eq!(Parameter::NumDisparities.snap(17, None), 16);
        assert_eq!(Parameter::NumDisparities.snap(47, None), 32);
        assert_eq!(Parameter::NumDisparities.snap(3, None), 16);
        assert_eq!(Parameter::Disp12MaxDiff.snap(-5, None), -1);
        assert_eq!(Parameter::PreFilterCap.snap(0, None), 1);
    }

    #[test]
    fn max_block_size_tracks_smaller_dimension() {
        assert_eq!(max_block_size(None), 255);
        assert_eq!(max_block_size(Some((640, 480))), 255);
        assert_eq!(max_block_size(Some((64, 32))), 32);
        assert_eq!(max_block_size(Some((3, 3))), 5);
    }

    #[test]
    fn with_and_get_cover_every_parameter() {
        let mut params = ParameterSet::default();
        for (i, param) in Parameter::ALL.iter().enumerate() {
            params = params.with(*param, i as i32 + 100);
        }
        for (i, param) in Parameter::ALL.iter().enumerate() {
            assert_eq!(params.get(*param), i as i32 + 100);
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: ParameterSet =
            serde_json::from_str(r#"{ "block_size": 9, "pre_filter_type": "x_sobel" }"#).unwrap();
        assert_eq!(params.block_size, 9);
        assert_eq!(params.pre_filter_type, PreFilterType::XSobel);
        assert_eq!(params.num_disparities, ParameterSet::default().num_disparities);
    }
}
