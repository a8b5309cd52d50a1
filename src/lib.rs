// SPDX-License-Identifier: GPL-3.0-or-later
//! Single object tracking using adaptive correlation filters.
//!
//! A [`Tracker`] is seeded with a [`Region`] on one grayscale frame, then reports where that object
//! is on each following frame, along with whether it is still confident it has the object at all.
//! [`MosseTracker`] implements this with a MOSSE filter, trained in the frequency domain and
//! adapted after every frame.
//!
//! ```no_run
//! use mosse_tracker::{grayscale, MosseTracker, Region, Tracker, TrackerSettings};
//!
//! # fn main() -> anyhow::Result<()> {
//! let first = image::open("frame-0000.png")?;
//! let next = image::open("frame-0001.png")?;
//! let mut tracker = MosseTracker::new(TrackerSettings::default());
//! tracker.init(&grayscale(&first), Region::from_corner(40.0, 30.0, 32.0, 32.0))?;
//! let region = tracker.update(&grayscale(&next))?;
//! println!("Object is now at {}", region);
//! # Ok(())
//! # }
//! ```
pub mod error;
pub mod geometry;
pub mod image_buffer;
pub mod tracker;

pub use error::TrackerError;
pub use geometry::{Point, Region};
pub use image_buffer::{grayscale, GrayFrame};
pub use tracker::{
    Backend, LearningRate, Localization, MosseTracker, PerturbationBounds, SessionState, Tracker,
    TrackerSettings,
};
