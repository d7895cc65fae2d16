use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{WrapErr, bail};
use rupture::report::{render_cube, render_square, summary};
use rupture::worker::DEFAULT_CHUNK;
use rupture::{RunConfig, SweepRequest, SweepResponse, SweepWorker, init_logging};
use rupture_core::{AxisLetter, Dims, RuptureEnvelope, SweepGrid};

#[derive(Parser, Debug)]
#[command(name = "rupture")]
#[command(about = "Estimate fault rupture envelopes over a parameter grid")]
struct Args {
    /// YAML run description
    config: PathBuf,

    /// Samples per axis (overrides the run file)
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Cancel the sweep after this many seconds
    #[arg(short, long)]
    timeout_secs: Option<u64>,

    /// Grid points evaluated between cancellation checks by the host
    #[arg(long, default_value_t = DEFAULT_CHUNK)]
    chunk: usize,

    /// Evaluate grid points in parallel
    #[arg(short, long)]
    parallel: bool,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write logs to `<dir>/rupture.log` instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.log_dir.as_deref(), &args.log_level)?;

    let mut config = RunConfig::load(&args.config)?;
    if let Some(n) = args.samples {
        config.samples = n;
    }
    let envelope = config.build().wrap_err("failed to set up the sweep")?;
    tracing::info!(
        dims = ?config.dims,
        samples = config.samples,
        faces = envelope.geometry().len(),
        "run file loaded"
    );

    let worker = SweepWorker::new();
    worker.send(SweepRequest::Run {
        envelope: Box::new(envelope.clone()),
        dims: config.dims,
        chunk: args.chunk,
        parallel: args.parallel,
    });

    let deadline = args
        .timeout_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut cancel_sent = false;

    loop {
        let response = match worker.recv_timeout(Duration::from_millis(100)) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                if !cancel_sent && deadline.is_some_and(|d| Instant::now() >= d) {
                    tracing::warn!("timeout reached, cancelling sweep");
                    worker.cancel();
                    cancel_sent = true;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => bail!("sweep worker exited unexpectedly"),
        };

        match response {
            SweepResponse::Progress { current, total } => {
                tracing::info!("progress {current}/{total}");
            }
            SweepResponse::Complete { report, grid, .. } => {
                println!("{}", render(&envelope, config.dims, &grid));
                println!("{}", summary(&report));
                break;
            }
            SweepResponse::Cancelled { report, grid } => {
                println!("{}", render(&envelope, config.dims, &grid));
                println!("{}", summary(&report));
                tracing::warn!("results are incomplete");
                break;
            }
            SweepResponse::Error(e) => bail!("sweep failed: {e}"),
        }
    }

    tracing::info!("shutting down");
    Ok(())
}

fn render(envelope: &RuptureEnvelope, dims: Dims, grid: &SweepGrid<f64>) -> String {
    let x = envelope.axis(AxisLetter::X);
    let y = envelope.axis(AxisLetter::Y);
    match dims {
        Dims::Two => render_square(grid, x, y),
        Dims::Three => render_cube(grid, x, y, envelope.axis(AxisLetter::Z)),
    }
}
