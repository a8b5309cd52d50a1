// SPDX-License-Identifier: GPL-3.0-or-later
//! The MOSSE correlation filter.
//!
//! The filter is kept as two accumulators: the numerator `Σ conj(F)·G` and the denominator
//! `Σ conj(F)·F`, where `F` is the transform of a training patch and `G` is the transform of the
//! desired response. The filter itself is their (regularized) elementwise ratio, which is already
//! the conjugated filter `H*`, so correlating a new patch is a plain elementwise product.
//!
//! # Citations
//! Bolme, D. S., Beveridge, J. R., Draper, B. A., & Lui, Y. M. (2010). Visual object tracking
//! using adaptive correlation filters. In 2010 IEEE Computer Society Conference on Computer
//! Vision and Pattern Recognition (pp. 2544–2550). IEEE. https://doi.org/10.1109/CVPR.2010.5539960
use ndarray::{Array2, Zip};
use rustfft::num_complex::Complex64;

use super::learning_rate::LearningRate;

/// A Gaussian with its peak (of 1.0) at `peak`, indexed `[row, column]`.
pub(crate) fn desired_response(
    rows: usize,
    columns: usize,
    peak: (usize, usize),
    sigma: f64,
) -> Array2<f64> {
    let denominator = 2.0 * sigma * sigma;
    let (peak_row, peak_column) = (peak.0 as f64, peak.1 as f64);
    Array2::from_shape_fn((rows, columns), |(row, column)| {
        let distance = (row as f64 - peak_row).powi(2) + (column as f64 - peak_column).powi(2);
        (-distance / denominator).exp()
    })
}

#[derive(Clone, Debug)]
pub(crate) struct CorrelationFilter {
    numerator: Array2<Complex64>,
    denominator: Array2<Complex64>,
    kernel: Array2<Complex64>,
    /// Transform of the desired response. Constant for the life of the filter.
    target: Array2<Complex64>,
    regularization: f64,
}

impl CorrelationFilter {
    /// Train a new filter from the transforms of one or more samples.
    ///
    /// The accumulators are averaged over the samples, so that a later [`blend`][Self::blend]
    /// weighs a new frame against the training set by the learning rate alone.
    pub(crate) fn train<I>(target: Array2<Complex64>, samples: I, regularization: f64) -> Self
    where
        I: IntoIterator<Item = Array2<Complex64>>,
    {
        let mut numerator = Array2::zeros(target.dim());
        let mut denominator = Array2::zeros(target.dim());
        let mut count = 0usize;
        for sample in samples {
            debug_assert_eq!(sample.dim(), target.dim(), "Sample and target sizes differ");
            Zip::from(&mut numerator)
                .and(&mut denominator)
                .and(&sample)
                .and(&target)
                .for_each(|numer, denom, f, g| {
                    let f_conj = f.conj();
                    *numer += f_conj * g;
                    *denom += f_conj * f;
                });
            count += 1;
        }
        if count > 1 {
            let scale = count as f64;
            numerator.mapv_inplace(|v| v / scale);
            denominator.mapv_inplace(|v| v / scale);
        }
        let mut filter = Self {
            kernel: Array2::zeros(target.dim()),
            numerator,
            denominator,
            target,
            regularization,
        };
        filter.refresh();
        filter
    }

    fn refresh(&mut self) {
        let regularization = self.regularization;
        Zip::from(&mut self.kernel)
            .and(&self.numerator)
            .and(&self.denominator)
            .for_each(|kernel, numer, denom| *kernel = *numer / (*denom + regularization));
    }

    /// Blend a single new sample into the accumulators (an exponential moving average).
    pub(crate) fn blend(&mut self, sample: &Array2<Complex64>, rate: LearningRate) {
        debug_assert_eq!(sample.dim(), self.target.dim(), "Sample and target sizes differ");
        Zip::from(&mut self.numerator)
            .and(&mut self.denominator)
            .and(sample)
            .and(&self.target)
            .for_each(|numer, denom, f, g| {
                let f_conj = f.conj();
                *numer = rate.blend(*numer, f_conj * g);
                *denom = rate.blend(*denom, f_conj * f);
            });
        self.refresh();
    }

    /// Elementwise product of the filter with a patch transform; the transform of the response.
    pub(crate) fn apply(&self, spectrum: &Array2<Complex64>) -> Array2<Complex64> {
        &self.kernel * spectrum
    }

    /// The dimensions of the filter, and both accumulators, as `(rows, columns)`.
    pub(crate) fn dim(&self) -> (usize, usize) {
        debug_assert_eq!(self.kernel.dim(), self.numerator.dim());
        debug_assert_eq!(self.kernel.dim(), self.denominator.dim());
        self.kernel.dim()
    }

    #[cfg(test)]
    pub(crate) fn kernel(&self) -> &Array2<Complex64> {
        &self.kernel
    }
}
