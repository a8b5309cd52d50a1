// SPDX-License-Identifier: GPL-3.0-or-later
use std::num::NonZeroUsize;

use serde::Deserialize;

use super::learning_rate::LearningRate;

/// Limits for the random warps applied to the seed patch when training a new filter.
///
/// Every warp blurs the trained filter a little, so these are kept small. Fine textures lose the
/// most.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct PerturbationBounds {
    /// Maximum rotation, in radians, in either direction.
    #[serde(default = "PerturbationBounds::default_rotation")]
    pub rotation: f32,

    /// Maximum relative change in scale. `0.05` allows anywhere from 95% to 105%.
    #[serde(default = "PerturbationBounds::default_scale")]
    pub scale: f32,

    /// Maximum shift along each axis, as a fraction of the region's shorter side.
    #[serde(default = "PerturbationBounds::default_translation")]
    pub translation: f32,
}

impl PerturbationBounds {
    const fn default_rotation() -> f32 {
        0.05
    }

    const fn default_scale() -> f32 {
        0.05
    }

    const fn default_translation() -> f32 {
        0.05
    }
}

impl Default for PerturbationBounds {
    fn default() -> Self {
        Self {
            rotation: Self::default_rotation(),
            scale: Self::default_scale(),
            translation: Self::default_translation(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct TrackerSettings {
    /// The peak-to-sidelobe ratio below which the object is considered lost.
    #[serde(default = "TrackerSettings::default_psr_threshold")]
    pub psr_threshold: f64,

    /// How quickly the filter adapts to the object's appearance after each frame.
    #[serde(default)]
    pub learning_rate: LearningRate,

    /// The spread (in pixels) of the Gaussian the filter is trained to respond with.
    #[serde(default = "TrackerSettings::default_sigma")]
    pub sigma: f64,

    /// Added to the filter denominator to keep the division stable.
    #[serde(default = "TrackerSettings::default_regularization")]
    pub regularization: f64,

    /// How much bigger than the region the sampled patch is, along each side. The extra context
    /// puts the object's outline inside the patch, which is all there is to go on for objects
    /// without any texture of their own. Values below 1 are treated as 1.
    #[serde(default = "TrackerSettings::default_padding")]
    pub padding: f64,

    /// Half the size of the window around the response peak that is excluded from the sidelobe
    /// when computing the peak-to-sidelobe ratio.
    #[serde(default = "TrackerSettings::default_sidelobe_exclusion")]
    pub sidelobe_exclusion: usize,

    /// The number of samples (the seed patch and random warps of it) used to train a new filter.
    #[serde(default = "TrackerSettings::default_training_samples")]
    pub training_samples: NonZeroUsize,

    #[serde(default)]
    pub perturbation: PerturbationBounds,

    /// Seed for the random warps, so that training is repeatable.
    #[serde(default = "TrackerSettings::default_seed")]
    pub seed: u64,
}

impl TrackerSettings {
    /// The conventional MOSSE threshold; 7 and below usually means the lock is gone.
    const fn default_psr_threshold() -> f64 {
        7.0
    }

    const fn default_sigma() -> f64 {
        2.0
    }

    const fn default_regularization() -> f64 {
        1e-5
    }

    const fn default_padding() -> f64 {
        2.0
    }

    const fn default_sidelobe_exclusion() -> usize {
        5
    }

    fn default_training_samples() -> NonZeroUsize {
        NonZeroUsize::new(8).expect("8 to be non-zero")
    }

    const fn default_seed() -> u64 {
        0x5eed_0f_7ac4
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            psr_threshold: Self::default_psr_threshold(),
            learning_rate: LearningRate::default(),
            sigma: Self::default_sigma(),
            regularization: Self::default_regularization(),
            padding: Self::default_padding(),
            sidelobe_exclusion: Self::default_sidelobe_exclusion(),
            training_samples: Self::default_training_samples(),
            perturbation: PerturbationBounds::default(),
            seed: Self::default_seed(),
        }
    }
}
