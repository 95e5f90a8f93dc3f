// threadlab-calibrate [--millis N]... [--json]
// threadlab-calibrate -V

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use threadlab::{busywork, Calibrator, Result};

const DEFAULT_MILLIS: [u64; 2] = [100, 1000];

/// Finds how far the naive prime search has to run on this machine to keep a
/// core busy for the requested durations.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Target duration in milliseconds, may be repeated
    #[clap(short, long)]
    millis: Vec<u64>,

    /// Print the calibrations as JSON
    #[clap(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "the version of threadlab-calibrate is"
    );
    let args = Args::parse();

    let millis = if args.millis.is_empty() {
        DEFAULT_MILLIS.to_vec()
    } else {
        args.millis
    };

    let calibrator = Calibrator::default();
    let mut calibrations = Vec::with_capacity(millis.len());
    for ms in millis {
        let calibration = calibrator.calibrate(Duration::from_millis(ms))?;
        info!(
            requested_ms = ms,
            bound = calibration.bound,
            "calibrated bound"
        );
        calibrations.push(calibration);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&calibrations)?);
    } else {
        println!(
            "reference bounds: 100ms = {}, 1s = {}",
            busywork::BOUND_100MS,
            busywork::BOUND_1S
        );
        for calibration in &calibrations {
            println!(
                "{} ms -> bound {} (took {} ms)",
                calibration.requested.as_millis(),
                calibration.bound,
                calibration.measured.as_millis()
            );
        }
    }
    Ok(())
}
