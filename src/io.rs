//! # I/O helpers
//!
//! - `load_gray`: decode any supported image file into 8-bit grayscale.
//! - `load_pair`: load and size-check a left/right pair.
//! - `load_params` / `save_params`: parameter sets as JSON.
//! - `save_color` / `save_luma`: write a rendered disparity map.

use std::fs;
use std::path::Path;

use image::GrayImage;
use log::debug;

use crate::disparity::{DisparityMap, StereoPair};
use crate::error::*;
use crate::params::ParameterSet;

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)?.into_luma8();
    debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

pub fn load_pair(left: &Path, right: &Path) -> Result<StereoPair> {
    StereoPair::new(load_gray(left)?, load_gray(right)?)
}

/// Read a parameter set from JSON. Missing fields take their default values.
pub fn load_params(path: &Path) -> Result<ParameterSet> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn save_params(params: &ParameterSet, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, serde_json::to_string_pretty(params)?)?;
    Ok(())
}

/// Save the jet rendering of a disparity map; the format follows the file extension.
pub fn save_color(map: &DisparityMap, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    map.to_color().save(path)?;
    Ok(())
}

/// Save the grayscale rendering of a disparity map.
pub fn save_luma(map: &DisparityMap, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    map.to_luma_normalised().save(path)?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
