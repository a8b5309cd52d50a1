// SPDX-License-Identifier: GPL-3.0-or-later
use ndarray::Array2;

/// Keeps the PSR finite when the sidelobe is perfectly flat.
const PSR_EPSILON: f64 = 1e-5;

/// What was found in one correlation response.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Peak {
    /// `[row, column]` of the largest response value.
    pub(crate) position: (usize, usize),
    pub(crate) value: f64,
    /// Peak-to-sidelobe ratio.
    pub(crate) psr: f64,
}

fn argmax(response: &Array2<f64>) -> ((usize, usize), f64) {
    response
        .indexed_iter()
        .fold(((0, 0), f64::NEG_INFINITY), |best, (index, value)| {
            if *value > best.1 {
                (index, *value)
            } else {
                best
            }
        })
}

/// Find the peak of a (real) correlation response and score how much it stands out.
///
/// The sidelobe is every value outside of a `(2 * exclusion + 1)` square centered on the peak.
/// For small responses the exclusion radius shrinks to a quarter of the shorter side so there is
/// always a sidelobe left to measure.
pub(crate) fn find_peak(response: &Array2<f64>, exclusion: usize) -> Peak {
    let (rows, columns) = response.dim();
    let (position, value) = argmax(response);
    let exclusion = exclusion.min(rows.min(columns) / 4);
    let (peak_row, peak_column) = position;
    let excluded = |row: usize, column: usize| {
        row + exclusion >= peak_row
            && row <= peak_row + exclusion
            && column + exclusion >= peak_column
            && column <= peak_column + exclusion
    };
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut sum_squares = 0.0;
    for ((row, column), v) in response.indexed_iter() {
        if !excluded(row, column) {
            count += 1;
            sum += v;
            sum_squares += v * v;
        }
    }
    let psr = if count == 0 {
        0.0
    } else {
        let mean = sum / count as f64;
        let variance = (sum_squares / count as f64 - mean * mean).max(0.0);
        (value - mean) / (variance.sqrt() + PSR_EPSILON)
    };
    Peak {
        position,
        value,
        psr,
    }
}

#[cfg(test)]
mod test {
    use float_cmp::{approx_eq, F64Margin};
    use ndarray::Array2;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;
    use rand_distr::{Distribution, Normal};

    use super::find_peak;

    fn noise(rows: usize, columns: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        Array2::from_shape_simple_fn((rows, columns), || normal.sample(&mut rng))
    }

    #[test]
    fn finds_peak() {
        let mut response = Array2::<f64>::zeros((16, 20));
        response[[3, 17]] = 2.0;
        response[[10, 2]] = 1.0;
        let peak = find_peak(&response, 5);
        assert_eq!(peak.position, (3, 17));
        assert_eq!(peak.value, 2.0);
    }

    #[test]
    fn sharp_peak_high_psr() {
        let mut response = noise(32, 32, 1) * 0.01;
        response[[16, 16]] = 1.0;
        let peak = find_peak(&response, 5);
        assert_eq!(peak.position, (16, 16));
        assert!(peak.psr > 20.0, "PSR was {}", peak.psr);
    }

    #[test]
    fn noise_low_psr() {
        let response = noise(32, 32, 2);
        let peak = find_peak(&response, 5);
        assert!(peak.psr < 7.0, "PSR was {}", peak.psr);
    }

    #[test]
    fn flat_response() {
        let response = Array2::from_elem((10, 10), 0.5);
        let peak = find_peak(&response, 2);
        assert!(approx_eq!(f64, peak.psr, 0.0, F64Margin::default()));
    }

    #[test]
    fn peak_excluded_from_sidelobe() {
        // Only the excluded window differs from the sidelobe, so the sidelobe is perfectly flat
        // and the PSR is just the peak height over the epsilon.
        let mut response = Array2::<f64>::zeros((20, 20));
        response[[0, 0]] = 1.0;
        response[[1, 1]] = 0.5;
        let peak = find_peak(&response, 2);
        assert_eq!(peak.position, (0, 0));
        assert!(peak.psr > 1e4, "PSR was {}", peak.psr);
    }
}
