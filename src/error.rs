//! # Error standards
//!
//! This module provides a standardised error enum and result type for this crate.

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Standard result type used in the disparity crate.
pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Input image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Left and right images should be the same size (left is {left:?}, right is {right:?})")]
    InputMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("Parameter {parameter} = {value} is out of range: {expected}")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: i32,
        expected: &'static str,
    },

    #[error(
        "Block size {block_size} is larger than the smaller image dimension ({width}x{height})"
    )]
    BlockSizeTooLarge {
        block_size: i32,
        width: u32,
        height: u32,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter file: {0}")]
    Config(#[from] serde_json::Error),

    #[cfg(feature = "statistics")]
    #[error("Error was thrown while plotting statistics: {0}")]
    Plot(String),
}
