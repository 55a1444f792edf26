//! # Tuner session
//!
//! The state a parameter tuning front end keeps between edits: the current image pair and the
//! current parameter set. Images are replaced wholesale, parameters one field at a time, and
//! every recomputation is an explicit, full call into the block matcher. Coalescing rapid edits is
//! left to the front end.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::GrayImage;
use log::{debug, info};

use crate::block_matching::compute_disparity;
use crate::disparity::DisparityMap;
use crate::error::*;
use crate::params::{Parameter, ParameterSet};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TunerSession {
    left: Option<GrayImage>,
    right: Option<GrayImage>,
    params: ParameterSet,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl TunerSession {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            left: None,
            right: None,
            params,
        }
    }

    pub fn params(&self) -> ParameterSet {
        self.params
    }

    pub fn left(&self) -> Option<&GrayImage> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&GrayImage> {
        self.right.as_ref()
    }

    /// Replace the left image. The stored block size is re-snapped to the new image bounds.
    pub fn set_left(&mut self, image: GrayImage) {
        info!("left image replaced ({}x{})", image.width(), image.height());
        self.left = Some(image);
        self.resnap_block_size();
    }

    /// Replace the right image. The stored block size is re-snapped to the new image bounds.
    pub fn set_right(&mut self, image: GrayImage) {
        info!("right image replaced ({}x{})", image.width(), image.height());
        self.right = Some(image);
        self.resnap_block_size();
    }

    /// Replace the whole parameter set, as given.
    pub fn set_parameters(&mut self, params: ParameterSet) {
        self.params = params;
    }

    /// Snap `value` to the control rules of `param`, store it, and return the stored value.
    pub fn set_parameter(&mut self, param: Parameter, value: i32) -> i32 {
        let snapped = param.snap(value, self.image_bounds());
        if snapped != value {
            debug!("{} = {} snapped to {}", param, value, snapped);
        }
        self.params = self.params.with(param, snapped);
        snapped
    }

    /// Smallest width and height over the loaded images.
    pub fn image_bounds(&self) -> Option<(u32, u32)> {
        [self.left.as_ref(), self.right.as_ref()]
            .into_iter()
            .flatten()
            .map(|img| img.dimensions())
            .reduce(|(w0, h0), (w1, h1)| (w0.min(w1), h0.min(h1)))
    }

    /// Run the block matcher on the current state.
    ///
    /// Returns `Ok(None)` until both images are loaded.
    pub fn recompute(&self) -> Result<Option<DisparityMap>> {
        let (left, right) = match (&self.left, &self.right) {
            (Some(l), Some(r)) => (l, r),
            _ => return Ok(None),
        };

        compute_disparity(left, right, self.params).map(Some)
    }

    fn resnap_block_size(&mut self) {
        let current = self.params.block_size;
        self.set_parameter(Parameter::BlockSize, current);
    }
}
