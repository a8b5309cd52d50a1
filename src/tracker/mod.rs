// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;

use serde::Deserialize;

use crate::error::TrackerError;
use crate::geometry::Region;
use crate::image_buffer::GrayFrame;

mod correlate;
mod filter;
mod learning_rate;
mod mosse;
mod patch;
mod preprocess;
#[cfg(test)]
pub(crate) mod scene;
mod settings;
mod spectrum;

pub use learning_rate::LearningRate;
pub use mosse::{Localization, MosseTracker};
pub use settings::{PerturbationBounds, TrackerSettings};

/// The operations every single-object tracker provides.
///
/// A tracker is seeded with a region on one frame, then asked where that object is on each
/// following frame. Frames after `init` must all be the same size as the seed frame.
pub trait Tracker: fmt::Debug {
    /// Start (or restart) tracking the object inside `region` on `frame`.
    fn init(&mut self, frame: &GrayFrame, region: Region) -> Result<(), TrackerError>;

    /// Locate the object on the next frame.
    fn update(&mut self, frame: &GrayFrame) -> Result<Region, TrackerError>;

    fn state(&self) -> SessionState;
}

/// Where a tracker is in its lifecycle.
///
/// `Uninitialized` → (`init`) → `Tracking` → (low confidence) → `Lost`. `init` can be called from
/// any state and always leads to `Tracking` when it succeeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    Tracking,
    Lost,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Tracking => "tracking",
            Self::Lost => "lost",
        })
    }
}

/// The available tracker implementations, selectable by name in configuration files.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Mosse,
}

impl Default for Backend {
    fn default() -> Self {
        Self::Mosse
    }
}

impl Backend {
    pub fn create(&self, settings: &TrackerSettings) -> Box<dyn Tracker + Send> {
        match self {
            Self::Mosse => Box::new(MosseTracker::new(*settings)),
        }
    }
}
