// SPDX-License-Identifier: GPL-3.0-or-later
use std::f64::consts::PI;

use ndarray::{Array1, Array2, Axis};

use crate::image_buffer::GrayFrame;

/// Turns raw patches into signals that are ready for a forward transform.
///
/// Holds the (patch-sized) window so it's only computed once per session.
#[derive(Clone, Debug)]
pub(crate) struct Preprocessor {
    window: Array2<f64>,
}

const MIN_ENERGY: f64 = 1e-9;

/// A symmetric Hann window, matching the usual `0.5 - 0.5cos(2πn / (N - 1))` form.
fn hann(length: usize) -> Array1<f64> {
    if length < 2 {
        return Array1::ones(length);
    }
    let denominator = (length - 1) as f64;
    Array1::from_shape_fn(length, |n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denominator).cos())
}

impl Preprocessor {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        let rows = hann(height).insert_axis(Axis(1));
        let columns = hann(width).insert_axis(Axis(0));
        Self {
            window: &rows * &columns,
        }
    }

    pub(crate) fn dim(&self) -> (usize, usize) {
        self.window.dim()
    }

    /// Log-compress, normalize and window a patch.
    ///
    /// The patch must be the same size as the window this preprocessor was created with. The
    /// result is indexed `[row, column]`.
    pub(crate) fn process(&self, patch: &GrayFrame) -> Array2<f64> {
        let (rows, columns) = self.window.dim();
        debug_assert_eq!(
            (patch.width() as usize, patch.height() as usize),
            (columns, rows),
            "Patch and window dimensions differ"
        );
        let mut signal = Array2::from_shape_fn((rows, columns), |(row, column)| {
            let value = patch.get_pixel(column as u32, row as u32)[0];
            (f64::from(value) + 1.0).ln()
        });
        let mean = signal.mean().unwrap_or(0.0);
        signal.mapv_inplace(|v| v - mean);
        let energy = signal.iter().map(|v| v * v).sum::<f64>().sqrt();
        // A flat patch has nothing left after centering except rounding error.
        if energy > MIN_ENERGY {
            signal.mapv_inplace(|v| v / energy);
        } else {
            signal.fill(0.0);
        }
        signal * &self.window
    }
}
