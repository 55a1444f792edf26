//! # Block matching disparity computation
//!
//! Sum-of-absolute-differences block matching over a rectified pair. For every left pixel whose
//! whole search range fits in the image, the cost of every candidate disparity is evaluated, the
//! cheapest one is kept and then rejected again if the window is untextured, the match is
//! ambiguous, or the right-to-left match disagrees. Surviving disparities are refined to 1/16 px
//! with a parabola through the three costs around the minimum, and small isolated regions are
//! removed by the speckle filter.
//!
//! Rows are evaluated in parallel bands of 16. Within a band the vertical window sums
//! are carried from row to row, so a row costs one added and one removed image row per candidate.
//! The speckle filter runs after all bands are done.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::Instant;

use image::GrayImage;
use log::{debug, trace};
use rayon::prelude::*;

use crate::disparity::{
    check_pair, invalid_value, DisparityAlgorithm, DisparityMap, StereoPair, DISP_SCALE,
};
use crate::error::*;
use crate::params::ParameterSet;
use crate::{prefilter, speckle};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Rows per parallel band. Column sums are carried down a band and rebuilt at its top.
const BAND_ROWS: usize = 16;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Block matching stereo correspondence with a fixed parameter set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockMatcher {
    params: ParameterSet,
}

/// Where in the image the full disparity search can be evaluated.
#[derive(Debug, Clone, Copy)]
struct SearchGeometry {
    width: usize,
    half: usize,
    min_disparity: i32,
    num_disparities: usize,
    /// Rows `y_lo..y_hi` have a full window vertically.
    y_lo: usize,
    y_hi: usize,
    /// Columns `x_lo..x_hi` have every candidate right window inside the image.
    x_lo: usize,
    x_hi: usize,
}

/// Vertical window sums for one row, carried down a band.
///
/// `sad` holds, per candidate disparity, the absolute differences summed over the rows of the
/// window for every column `c_lo..c_hi`; `texture` the same for the left gradient.
struct ColumnSums {
    c_lo: usize,
    columns: usize,
    sad: Vec<u32>,
    texture: Vec<u32>,
}

/// Pre-filtered inputs shared read-only by all row workers.
struct MatchInputs<'a> {
    left: &'a [u8],
    right: &'a [u8],
    gradient: &'a [u16],
    params: &'a ParameterSet,
    geom: SearchGeometry,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl BlockMatcher {
    /// Create a new instance of the algorithm with the given parameters.
    pub fn new(params: ParameterSet) -> Self {
        Self { params }
    }

    pub fn params(&self) -> ParameterSet {
        self.params
    }
}

impl DisparityAlgorithm for BlockMatcher {
    fn compute(&self, pair: &StereoPair) -> Result<DisparityMap> {
        compute_disparity(pair.left(), pair.right(), self.params)
    }
}

impl SearchGeometry {
    fn new(width: u32, height: u32, params: &ParameterSet) -> Self {
        let (w, h) = (width as i64, height as i64);
        let half = (params.block_size / 2) as i64;
        let min_d = params.min_disparity as i64;
        let max_d = params.max_disparity() as i64;

        // Left window at x needs x - half >= 0, every right window x - d - half >= 0 and
        // x - d + half <= w - 1.
        let x_lo = (half + max_d.max(0)).clamp(0, w);
        let x_hi = (w - half + min_d.min(0)).clamp(0, w);

        Self {
            width: width as usize,
            half: half as usize,
            min_disparity: params.min_disparity,
            num_disparities: params.num_disparities as usize,
            y_lo: half.min(h) as usize,
            y_hi: (h - half).max(0) as usize,
            x_lo: x_lo as usize,
            x_hi: x_hi.max(x_lo) as usize,
        }
    }

    fn covers_row(&self, y: usize) -> bool {
        y >= self.y_lo && y < self.y_hi && self.x_lo < self.x_hi
    }

    fn span(&self) -> usize {
        self.x_hi - self.x_lo
    }
}

impl ColumnSums {
    /// Sum the window rows around `y` from scratch.
    fn new(inputs: &MatchInputs, y: usize) -> Self {
        let geom = &inputs.geom;
        let c_lo = geom.x_lo - geom.half;
        let columns = geom.span() + 2 * geom.half;
        let mut sums = Self {
            c_lo,
            columns,
            sad: vec![0; geom.num_disparities * columns],
            texture: vec![0; columns],
        };

        for yy in (y - geom.half)..=(y + geom.half) {
            sums.add_row(inputs, yy);
        }

        sums
    }

    /// Move the window from row `y - 1` to row `y`.
    fn advance(&mut self, inputs: &MatchInputs, y: usize) {
        let half = inputs.geom.half;
        self.add_row(inputs, y + half);
        self.remove_row(inputs, y - half - 1);
    }

    fn sad(&self, k: usize) -> &[u32] {
        &self.sad[k * self.columns..(k + 1) * self.columns]
    }

    fn add_row(&mut self, inputs: &MatchInputs, yy: usize) {
        let w = inputs.geom.width;
        for k in 0..inputs.geom.num_disparities {
            let d = inputs.geom.min_disparity as i64 + k as i64;
            let sad = &mut self.sad[k * self.columns..(k + 1) * self.columns];
            for (j, acc) in sad.iter_mut().enumerate() {
                *acc += pixel_diff(inputs, self.c_lo + j, d, yy, w);
            }
        }
        for (j, acc) in self.texture.iter_mut().enumerate() {
            *acc += inputs.gradient[yy * w + self.c_lo + j] as u32;
        }
    }

    fn remove_row(&mut self, inputs: &MatchInputs, yy: usize) {
        let w = inputs.geom.width;
        for k in 0..inputs.geom.num_disparities {
            let d = inputs.geom.min_disparity as i64 + k as i64;
            let sad = &mut self.sad[k * self.columns..(k + 1) * self.columns];
            for (j, acc) in sad.iter_mut().enumerate() {
                *acc -= pixel_diff(inputs, self.c_lo + j, d, yy, w);
            }
        }
        for (j, acc) in self.texture.iter_mut().enumerate() {
            *acc -= inputs.gradient[yy * w + self.c_lo + j] as u32;
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Compute the disparity map of a rectified pair.
///
/// The inputs and parameters are validated first; on failure nothing is computed. The result is
/// independent of how rows are scheduled across threads.
pub fn compute_disparity(
    left: &GrayImage,
    right: &GrayImage,
    params: ParameterSet,
) -> Result<DisparityMap> {
    check_pair(left, right)?;
    let (width, height) = left.dimensions();
    params.validate(width, height)?;

    let start = Instant::now();

    // ---- PRE FILTER ----

    let (pre_left, pre_right) = rayon::join(
        || prefilter::apply(left, &params),
        || prefilter::apply(right, &params),
    );
    let gradient = horizontal_gradient(&pre_left);
    trace!("pre-filter done in {:?}", start.elapsed());

    // ---- STEREO CORRELATION ----

    let geom = SearchGeometry::new(width, height, &params);
    let inputs = MatchInputs {
        left: pre_left.as_raw(),
        right: pre_right.as_raw(),
        gradient: &gradient,
        params: &params,
        geom,
    };

    let invalid = invalid_value(params.min_disparity);
    let mut data = vec![invalid; width as usize * height as usize];

    data.par_chunks_mut(width as usize * BAND_ROWS)
        .enumerate()
        .for_each(|(band, rows)| match_band(&inputs, band * BAND_ROWS, rows));
    trace!("correlation done in {:?}", start.elapsed());

    // ---- POST FILTER ----

    if params.speckle_window_size > 0 {
        let removed = speckle::filter_speckles(
            &mut data,
            width as usize,
            height as usize,
            invalid,
            params.speckle_window_size as usize,
            params.speckle_range.saturating_mul(DISP_SCALE),
        );
        trace!("speckle filter removed {} pixels", removed);
    }

    let map = DisparityMap::from_raw(
        width,
        height,
        params.min_disparity,
        params.num_disparities,
        data,
    );

    debug!(
        "block matching {}x{} (block {}, disparities {}..{}): {} valid pixels in {:.1} ms",
        width,
        height,
        params.block_size,
        params.min_disparity,
        params.min_disparity + params.num_disparities,
        map.valid_count(),
        start.elapsed().as_secs_f64() * 1e3
    );

    Ok(map)
}

/// Evaluate the rows of one band, starting at row `y0`. `rows` starts out filled with the invalid
/// sentinel.
fn match_band(inputs: &MatchInputs, y0: usize, rows: &mut [i16]) {
    let geom = &inputs.geom;
    let w = geom.width;
    let y_start = y0.max(geom.y_lo);
    let y_end = (y0 + rows.len() / w).min(geom.y_hi);
    if y_start >= y_end || !geom.covers_row(y_start) {
        return;
    }

    let mut sums = ColumnSums::new(inputs, y_start);
    for y in y_start..y_end {
        if y > y_start {
            sums.advance(inputs, y);
        }
        let offset = (y - y0) * w;
        match_row(inputs, &sums, &mut rows[offset..offset + w]);
    }
}

/// Evaluate one output row from the column sums centred on it.
fn match_row(inputs: &MatchInputs, sums: &ColumnSums, row: &mut [i16]) {
    let geom = &inputs.geom;
    let params = inputs.params;
    let (nd, window) = (geom.num_disparities, 2 * geom.half + 1);
    let span = geom.span();

    let mut costs = vec![0u32; span * nd];
    for k in 0..nd {
        for (i, sum) in sliding_sums(sums.sad(k), window).enumerate() {
            costs[i * nd + k] = sum;
        }
    }
    let texture: Vec<u32> = sliding_sums(&sums.texture, window).collect();

    for i in 0..span {
        let x = geom.x_lo + i;
        let cost = &costs[i * nd..(i + 1) * nd];

        if (texture[i] as i64) < params.texture_threshold as i64 {
            continue;
        }

        let (best_k, best) = argmin(cost);

        if !is_unique(cost, best_k, best, params.uniqueness_ratio) {
            continue;
        }

        if params.disp12_max_diff >= 0 {
            let xr = x as i64 - (geom.min_disparity as i64 + best_k as i64);
            let rl_k = right_to_left_best(&costs, geom, xr);
            if (rl_k as i64 - best_k as i64).abs() > params.disp12_max_diff as i64 {
                continue;
            }
        }

        let disp = (geom.min_disparity + best_k as i32) * DISP_SCALE + subpixel_offset(cost, best_k);
        row[x] = disp as i16;
    }
}

/// `|left(xc, yy) - right(xc - d, yy)|` on the pre-filtered images.
fn pixel_diff(inputs: &MatchInputs, xc: usize, d: i64, yy: usize, w: usize) -> u32 {
    let xr = (xc as i64 - d) as usize;
    inputs.left[yy * w + xc].abs_diff(inputs.right[yy * w + xr]) as u32
}

/// Sums of every `window`-long run in `values`.
fn sliding_sums(values: &[u32], window: usize) -> impl Iterator<Item = u32> + '_ {
    let first: u32 = values[..window].iter().sum();
    std::iter::once(first).chain(
        (window..values.len()).scan(first, move |sum, i| {
            *sum = *sum + values[i] - values[i - window];
            Some(*sum)
        }),
    )
}

/// Index and value of the first minimum.
fn argmin(cost: &[u32]) -> (usize, u32) {
    cost.iter()
        .enumerate()
        .fold((0, u32::MAX), |(bk, bc), (k, &c)| if c < bc { (k, c) } else { (bk, bc) })
}

/// A match is unique if no candidate outside the immediate neighbours of the winner comes within
/// `ratio` percent of the winning cost.
fn is_unique(cost: &[u32], best_k: usize, best: u32, ratio: i32) -> bool {
    let ratio = ratio as i64;
    !cost.iter().enumerate().any(|(k, &c)| {
        (k as i64 - best_k as i64).abs() > 1 && c as i64 * (100 - ratio) < best as i64 * 100
    })
}

/// Best disparity index for right column `xr`, searching the left pixels `xr + d` of this row.
fn right_to_left_best(costs: &[u32], geom: &SearchGeometry, xr: i64) -> usize {
    let nd = geom.num_disparities;
    let mut best = (0, u32::MAX);

    for k in 0..nd {
        let xl = xr + geom.min_disparity as i64 + k as i64;
        if xl < geom.x_lo as i64 || xl >= geom.x_hi as i64 {
            continue;
        }
        let c = costs[(xl as usize - geom.x_lo) * nd + k];
        if c < best.1 {
            best = (k, c);
        }
    }

    best.0
}

/// Fixed-point offset of the parabola vertex through the costs at `k - 1`, `k` and `k + 1`.
///
/// Returns 0 at either end of the search range. The result lies in `-8..=8`.
fn subpixel_offset(cost: &[u32], k: usize) -> i32 {
    if k == 0 || k + 1 >= cost.len() {
        return 0;
    }

    let c_minus = cost[k - 1] as i64;
    let c_plus = cost[k + 1] as i64;
    let c_best = cost[k] as i64;

    let den = 2 * (c_minus + c_plus - 2 * c_best);
    if den <= 0 {
        return 0;
    }

    let num = (c_minus - c_plus) * DISP_SCALE as i64;
    let frac = if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    };

    let limit = (DISP_SCALE / 2) as i64;
    frac.clamp(-limit, limit) as i32
}

/// Absolute horizontal gradient `|p(x + 1) - p(x - 1)|`, edges replicated.
fn horizontal_gradient(image: &GrayImage) -> Vec<u16> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let raw = image.as_raw();
    let mut out = vec![0u16; w * h];

    for y in 0..h {
        let row = &raw[y * w..(y + 1) * w];
        for x in 0..w {
            let l = row[x.saturating_sub(1)];
            let r = row[(x + 1).min(w - 1)];
            out[y * w + x] = l.abs_diff(r) as u16;
        }
    }

    out
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
