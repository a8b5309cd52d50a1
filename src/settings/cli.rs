// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use structopt::StructOpt;

use mosse_tracker::Region;

#[derive(Debug, StructOpt)]
#[structopt(about = "Track a single object through a directory of frames.")]
pub struct Args {
    /// Path to a configuration file. Built-in defaults are used if not given.
    #[structopt(short, long = "config", parse(from_os_str))]
    pub config_path: Option<PathBuf>,

    /// The object to track on the first frame, as `x,y,width,height` (top-left corner and size).
    #[structopt(short, long)]
    pub seed_region: Region,

    /// Directory of frames to track through. Overrides `sequence.path` in the config file.
    #[structopt(short, long, parse(from_os_str))]
    pub frames: Option<PathBuf>,
}
