//! # Disparity statistics
//!
//! Per-row summaries of a disparity map. With the `statistics` feature the row ranges can be
//! plotted to a bitmap, which is handy when tuning the disparity search range.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use crate::disparity::DisparityMap;

#[cfg(feature = "statistics")]
use crate::error::*;
#[cfg(feature = "statistics")]
use plotters::prelude::*;
#[cfg(feature = "statistics")]
use std::path::Path;

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Smallest and largest valid disparity (pixels) of every row; `None` for rows with no valid
/// pixel.
pub fn row_ranges(map: &DisparityMap) -> Vec<Option<(f32, f32)>> {
    (0..map.height())
        .map(|y| {
            (0..map.width())
                .filter_map(|x| map.disparity(x, y))
                .fold(None, |acc: Option<(f32, f32)>, d| match acc {
                    None => Some((d, d)),
                    Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
                })
        })
        .collect()
}

/// Fraction of valid pixels in each row.
pub fn row_density(map: &DisparityMap) -> Vec<f32> {
    (0..map.height())
        .map(|y| {
            let valid = (0..map.width()).filter(|&x| map.is_valid(x, y)).count();
            valid as f32 / map.width() as f32
        })
        .collect()
}

/// Plot the per-row minimum (red) and maximum (blue) disparity against the row index.
#[cfg(feature = "statistics")]
pub fn plot_row_ranges(map: &DisparityMap, path: &Path) -> Result<()> {
    let ranges = row_ranges(map);

    let area = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    area.fill(&WHITE).map_err(plot_err)?;

    let min = map.min_disparity() as f32;
    let max = (map.min_disparity() + map.num_disparities()) as f32;

    let mut chart = ChartBuilder::on(&area)
        .margin(5)
        .build_cartesian_2d(min..max, 0..map.height() as i32)
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            ranges
                .iter()
                .enumerate()
                .filter_map(|(y, r)| r.map(|(lo, _)| (lo, y as i32))),
            &RED,
        ))
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(
            ranges
                .iter()
                .enumerate()
                .filter_map(|(y, r)| r.map(|(_, hi)| (hi, y as i32))),
            &BLUE,
        ))
        .map_err(plot_err)?;

    area.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(feature = "statistics")]
fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_summarise_valid_pixels_only() {
        let mut map = DisparityMap::new(4, 3, 0, 16);
        map.put(0, 1, 32);
        map.put(3, 1, 72);
        map.put(2, 2, 16);

        assert_eq!(row_ranges(&map), vec![None, Some((2.0, 4.5)), Some((1.0, 1.0))]);
        assert_eq!(row_density(&map), vec![0.0, 0.5, 0.25]);
    }

    #[cfg(feature = "statistics")]
    #[test]
    fn plot_is_written() {
        let mut map = DisparityMap::new(8, 8, 0, 16);
        for y in 0..8 {
            map.put(1, y, (y as i16 + 1) * 16);
            map.put(6, y, (y as i16 + 4) * 16);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.png");
        plot_row_ranges(&map, &path).unwrap();
        assert!(path.exists());
    }
}
