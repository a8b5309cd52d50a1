// SPDX-License-Identifier: GPL-3.0-or-later
use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mosse_tracker::{Region, Tracker, TrackerError};

mod frame_source;
mod moving_average;
mod settings;

use crate::frame_source::{FrameSource, ImageSequence};
use crate::moving_average::{BoxcarFilter, MovingAverage};
use crate::settings::{Args, Settings};

/// How many frames the reported frame rate is averaged over.
const FRAME_RATE_WINDOW: usize = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Summary {
    frames: usize,
    successes: usize,
}

/// Write one result line: `index success x y width height milliseconds fps`.
fn report<W: Write>(
    out: &mut W,
    index: usize,
    success: bool,
    region: &Region,
    frame_time: Duration,
    average: Duration,
) -> io::Result<()> {
    let (x, y, width, height) = region.corner();
    let average = average.as_secs_f64();
    let fps = if average > 0.0 { 1.0 / average } else { 0.0 };
    writeln!(
        out,
        "{} {} {:.1} {:.1} {:.1} {:.1} {:.3} {:.1}",
        index,
        success,
        x,
        y,
        width,
        height,
        frame_time.as_secs_f64() * 1000.0,
        fps
    )
}

/// Start tracking `seed` on the first frame of `source`, then track through the rest of it.
fn run<S, W>(
    source: &mut S,
    tracker: &mut dyn Tracker,
    seed: Region,
    reset_on_failure: bool,
    out: &mut W,
) -> anyhow::Result<Summary>
where
    S: FrameSource,
    W: Write,
{
    let first = source
        .next_frame()?
        .context("There are no frames to track through")?;
    let start = Instant::now();
    tracker
        .init(&first, seed)
        .context("Unable to start tracking")?;
    let init_time = start.elapsed();
    report(out, 0, true, &seed, init_time, init_time)?;

    let mut frame_times = BoxcarFilter::<Duration, FRAME_RATE_WINDOW>::new();
    let mut summary = Summary {
        frames: 1,
        successes: 1,
    };
    while let Some(frame) = source.next_frame()? {
        let index = summary.frames;
        summary.frames += 1;
        let start = Instant::now();
        let result = tracker.update(&frame);
        let frame_time = start.elapsed();
        let average = frame_times.update(frame_time);
        match result {
            Ok(region) => {
                summary.successes += 1;
                report(out, index, true, &region, frame_time, average)?;
            }
            Err(TrackerError::TrackerLost { region, psr }) => {
                report(out, index, false, &region, frame_time, average)?;
                if reset_on_failure {
                    if let Some(psr) = psr {
                        warn!(index, psr, "Object lost, stopping");
                    }
                    break;
                }
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Unable to track frame {}", index))
            }
        }
    }
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::from_args();
    let settings = Settings::load(args.config_path.as_deref())?;
    let directory = args
        .frames
        .or_else(|| settings.sequence.path.clone())
        .context("No frame directory given (use --frames or set sequence.path)")?;
    let mut source = ImageSequence::open(&directory, &settings.sequence.extensions)?;
    info!(
        frames = source.len(),
        backend = ?settings.backend,
        "Starting tracking benchmark"
    );
    let mut tracker = settings.backend.create(&settings.tracker);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = run(
        &mut source,
        tracker.as_mut(),
        args.seed_region,
        settings.reset_on_failure,
        &mut out,
    )?;
    info!(
        frames = summary.frames,
        successes = summary.successes,
        state = %tracker.state(),
        "Finished"
    );
    Ok(())
}
