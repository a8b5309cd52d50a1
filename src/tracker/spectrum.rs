// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, ArrayViewMut1, Axis};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Planned 2D discrete Fourier transforms for one fixed array size.
///
/// Transforms are done row by row, then column by column, each with a 1D FFT.
#[derive(Clone)]
pub(crate) struct Spectrum {
    rows: usize,
    columns: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    column_forward: Arc<dyn Fft<f64>>,
    column_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Spectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spectrum")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Run a 1D transform over a single (possibly non-contiguous) lane of an array.
fn transform_lane(
    fft: &dyn Fft<f64>,
    mut lane: ArrayViewMut1<Complex64>,
    buffer: &mut Vec<Complex64>,
) {
    buffer.clear();
    buffer.extend(lane.iter().copied());
    fft.process(buffer);
    lane.iter_mut()
        .zip(buffer.iter())
        .for_each(|(out, value)| *out = *value);
}

impl Spectrum {
    pub(crate) fn new(rows: usize, columns: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            rows,
            columns,
            row_forward: planner.plan_fft_forward(columns),
            row_inverse: planner.plan_fft_inverse(columns),
            column_forward: planner.plan_fft_forward(rows),
            column_inverse: planner.plan_fft_inverse(rows),
        }
    }

    pub(crate) fn dim(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    fn transform(
        &self,
        data: &mut Array2<Complex64>,
        row_fft: &dyn Fft<f64>,
        column_fft: &dyn Fft<f64>,
    ) {
        debug_assert_eq!(data.dim(), self.dim(), "Array and plan dimensions differ");
        let mut buffer = Vec::with_capacity(self.rows.max(self.columns));
        for row in data.axis_iter_mut(Axis(0)) {
            transform_lane(row_fft, row, &mut buffer);
        }
        for column in data.axis_iter_mut(Axis(1)) {
            transform_lane(column_fft, column, &mut buffer);
        }
    }

    /// Forward transform of a real signal.
    pub(crate) fn forward(&self, signal: &Array2<f64>) -> Array2<Complex64> {
        let mut data = signal.mapv(|v| Complex64::new(v, 0.0));
        self.transform(
            &mut data,
            self.row_forward.as_ref(),
            self.column_forward.as_ref(),
        );
        data
    }

    /// Inverse transform, normalized so that `inverse(forward(x)) == x`.
    pub(crate) fn inverse(&self, mut data: Array2<Complex64>) -> Array2<Complex64> {
        self.transform(
            &mut data,
            self.row_inverse.as_ref(),
            self.column_inverse.as_ref(),
        );
        let scale = (self.rows * self.columns) as f64;
        data.mapv_inplace(|v| v / scale);
        data
    }
}
