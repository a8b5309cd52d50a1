// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::ops::{Add, Mul};

use serde::Deserialize;

/// The weight given to a new frame when blending it into the filter.
///
/// Always in `(0, 1]`. Larger values adapt faster to appearance changes, but also drift faster.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "f64")]
pub struct LearningRate(f64);

impl LearningRate {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Exponential moving average step: `(1 - rate) * current + rate * sample`.
    pub(crate) fn blend<T>(&self, current: T, sample: T) -> T
    where
        T: Mul<f64, Output = T> + Add<Output = T>,
    {
        current * (1.0 - self.0) + sample * self.0
    }
}

impl TryFrom<f64> for LearningRate {
    type Error = &'static str;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        if rate > 0.0 && rate <= 1.0 {
            Ok(Self(rate))
        } else {
            Err("learning rate must be greater than 0 and at most 1")
        }
    }
}

impl Default for LearningRate {
    fn default() -> Self {
        Self(0.125)
    }
}
