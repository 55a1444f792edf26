//! bm-tune: compute one block matching disparity map from the command line.
//!
//! Parameters start from the defaults (or a JSON file), individual flags override them, and every
//! override goes through the same snapping rules as an interactive control.

use std::path::PathBuf;

use bm_disparity::prelude::*;
use bm_disparity::{io, stats};
use clap::{Parser, ValueEnum};
use log::{debug, info, LevelFilter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "bm-tune")]
#[command(about = "Block matching stereo disparity with tunable parameters")]
#[command(version)]
struct Cli {
    /// Left (reference) image.
    #[arg(long)]
    left: PathBuf,

    /// Right image, same size as the left one.
    #[arg(long)]
    right: PathBuf,

    /// Output rendering (PNG, JPEG, ...).
    #[arg(long)]
    out: PathBuf,

    /// JSON parameter file; missing fields take default values.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Write the final parameter set to this JSON file.
    #[arg(long)]
    save_params: Option<PathBuf>,

    /// Render as grayscale instead of the jet colour map.
    #[arg(long)]
    gray: bool,

    /// Plot the per-row disparity range to this PNG.
    #[cfg(feature = "statistics")]
    #[arg(long)]
    plot: Option<PathBuf>,

    #[arg(long, value_enum)]
    pre_filter_type: Option<PreFilterArg>,

    #[arg(long)]
    pre_filter_size: Option<i32>,

    #[arg(long)]
    pre_filter_cap: Option<i32>,

    /// SAD window size.
    #[arg(long)]
    block_size: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    min_disparity: Option<i32>,

    #[arg(long)]
    num_disparities: Option<i32>,

    #[arg(long)]
    texture_threshold: Option<i32>,

    #[arg(long)]
    uniqueness_ratio: Option<i32>,

    #[arg(long)]
    speckle_window_size: Option<i32>,

    #[arg(long)]
    speckle_range: Option<i32>,

    /// Left/right consistency tolerance, -1 disables the check.
    #[arg(long, allow_negative_numbers = true)]
    disp12_max_diff: Option<i32>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PreFilterArg {
    Normalized,
    XSobel,
}

impl Cli {
    fn overrides(&self) -> [(Parameter, Option<i32>); 10] {
        [
            (Parameter::PreFilterSize, self.pre_filter_size),
            (Parameter::PreFilterCap, self.pre_filter_cap),
            (Parameter::BlockSize, self.block_size),
            (Parameter::MinDisparity, self.min_disparity),
            (Parameter::NumDisparities, self.num_disparities),
            (Parameter::TextureThreshold, self.texture_threshold),
            (Parameter::UniquenessRatio, self.uniqueness_ratio),
            (Parameter::SpeckleWindowSize, self.speckle_window_size),
            (Parameter::SpeckleRange, self.speckle_range),
            (Parameter::Disp12MaxDiff, self.disp12_max_diff),
        ]
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut params = match &cli.params {
        Some(path) => io::load_params(path)?,
        None => ParameterSet::default(),
    };
    if let Some(kind) = cli.pre_filter_type {
        params = params.with_pre_filter_type(match kind {
            PreFilterArg::Normalized => PreFilterType::NormalizedResponse,
            PreFilterArg::XSobel => PreFilterType::XSobel,
        });
    }

    let mut session = TunerSession::new(params);
    session.set_left(io::load_gray(&cli.left)?);
    session.set_right(io::load_gray(&cli.right)?);

    for (param, value) in cli.overrides() {
        if let Some(value) = value {
            let stored = session.set_parameter(param, value);
            if stored != value {
                info!("{param}: {value} adjusted to {stored}");
            }
        }
    }

    if let Some(path) = &cli.save_params {
        io::save_params(&session.params(), path)?;
    }

    let map = session
        .recompute()?
        .ok_or("both images are required")?;

    info!(
        "{} of {} pixels valid",
        map.valid_count(),
        map.width() as usize * map.height() as usize
    );
    if let Some((lo, hi)) = map.valid_range() {
        info!("disparity range {lo:.2}..{hi:.2} px");
    }
    let density = stats::row_density(&map);
    if let Some((y, d)) = density
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
    {
        debug!("sparsest row {y}: {:.1}% valid", d * 100.0);
    }

    if cli.gray {
        io::save_luma(&map, &cli.out)?;
    } else {
        io::save_color(&map, &cli.out)?;
    }

    #[cfg(feature = "statistics")]
    if let Some(path) = &cli.plot {
        stats::plot_row_ranges(&map, path)?;
    }

    Ok(())
}
