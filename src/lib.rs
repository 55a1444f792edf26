//! # Block matching disparity
//!
//! This crate computes dense disparity maps from rectified stereo pairs with sum-of-absolute-
//! differences block matching, and provides the pieces a parameter tuning front end needs around
//! it: parameter ranges and snapping, session state, and jet colour rendering.
//!
//! ```no_run
//! use bm_disparity::prelude::*;
//!
//! # fn main() -> bm_disparity::Result<()> {
//! let pair = bm_disparity::io::load_pair("left.png".as_ref(), "right.png".as_ref())?;
//! let params = ParameterSet::default()
//!     .with_block_size(15)
//!     .with_disparity_range(0, 64);
//! let map = BlockMatcher::new(params).compute(&pair)?;
//! bm_disparity::io::save_color(&map, "disparity.png".as_ref())?;
//! # Ok(())
//! # }
//! ```

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod block_matching;
pub mod colormap;
mod disparity;
mod error;
pub mod io;
pub mod params;
pub mod prefilter;
pub mod session;
pub mod speckle;
pub mod stats;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use crate::block_matching::{compute_disparity, BlockMatcher};
pub use crate::disparity::{
    invalid_value, DisparityAlgorithm, DisparityMap, StereoPair, DISP_SCALE, DISP_SHIFT,
};
pub use crate::error::{Error, Result};
pub use crate::params::{Parameter, ParameterSet, PreFilterType};
pub use crate::session::TunerSession;

pub mod prelude {
    pub use crate::block_matching::{compute_disparity, BlockMatcher};
    pub use crate::disparity::{DisparityAlgorithm, DisparityMap, StereoPair};
    pub use crate::params::{Parameter, ParameterSet, PreFilterType};
    pub use crate::session::TunerSession;
}
