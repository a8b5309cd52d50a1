// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use serde::Deserialize;

use mosse_tracker::{Backend, TrackerSettings};

mod cli;

pub(crate) use cli::Args;

/// Where to find the frames to track through.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct SequenceSettings {
    /// A directory of images, played back in file name order.
    #[serde(default)]
    pub(crate) path: Option<PathBuf>,

    /// Only files with one of these extensions (compared case-insensitively) are used as frames.
    #[serde(default = "SequenceSettings::default_extensions")]
    pub(crate) extensions: Vec<String>,
}

impl SequenceSettings {
    fn default_extensions() -> Vec<String> {
        vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            path: None,
            extensions: Self::default_extensions(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Settings {
    /// Tracker tuning parameters.
    #[serde(default)]
    pub(crate) tracker: TrackerSettings,

    /// Which tracker implementation to use.
    #[serde(default)]
    pub(crate) backend: Backend,

    #[serde(default)]
    pub(crate) sequence: SequenceSettings,

    /// Stop tracking the first time the object is lost, instead of reporting the loss on every
    /// following frame.
    #[serde(default)]
    pub(crate) reset_on_failure: bool,
}

impl Settings {
    /// Load settings from a TOML file, or use the defaults if there's no file given.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let settings = match path {
            None => Self::default(),
            Some(path) => {
                let contents = fs::read_to_string(path).with_context(|| {
                    format!("Unable to read configuration file {}", path.display())
                })?;
                toml::from_str(&contents).with_context(|| {
                    format!("Unable to parse configuration file {}", path.display())
                })?
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the values serde can't, naming the offending field.
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        let tracker = &self.tracker;
        if !tracker.psr_threshold.is_finite() {
            bail!(
                "tracker.psr_threshold must be a finite number (got {})",
                tracker.psr_threshold
            );
        }
        if !(tracker.sigma.is_finite() && tracker.sigma > 0.0) {
            bail!("tracker.sigma must be positive (got {})", tracker.sigma);
        }
        if !(tracker.regularization.is_finite() && tracker.regularization > 0.0) {
            bail!(
                "tracker.regularization must be positive (got {})",
                tracker.regularization
            );
        }
        if !(tracker.padding.is_finite() && tracker.padding >= 1.0) {
            bail!(
                "tracker.padding must be at least 1 (got {})",
                tracker.padding
            );
        }
        let bounds = &tracker.perturbation;
        let limits = [
            ("rotation", bounds.rotation),
            ("scale", bounds.scale),
            ("translation", bounds.translation),
        ];
        for (name, limit) in limits.iter() {
            if !(limit.is_finite() && *limit >= 0.0) {
                bail!(
                    "tracker.perturbation.{} must be zero or positive (got {})",
                    name,
                    limit
                );
            }
        }
        if bounds.scale >= 1.0 {
            bail!(
                "tracker.perturbation.scale must be less than 1 (got {})",
                bounds.scale
            );
        }
        if bounds.translation >= 0.5 {
            bail!(
                "tracker.perturbation.translation is a fraction of the region size and must be \
                 less than 0.5 (got {})",
                bounds.translation
            );
        }
        if self.sequence.extensions.is_empty() {
            bail!("sequence.extensions must list at least one file extension");
        }
        Ok(())
    }
}
