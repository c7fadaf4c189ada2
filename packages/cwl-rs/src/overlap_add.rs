use crate::windowing::{hanning, Window};
use nalgebra::DMatrix;

/// Overlap-add accumulator for tapered window residuals
///
/// Holds the running sum of tapered residuals and of the taper weights that
/// covered each column. Both have the shape of the signal matrix being
/// corrected.
pub struct OverlapAdd {
    corrected: DMatrix<f64>,
    weight_sum: DMatrix<f64>,
    taper: Vec<f64>,
}

impl OverlapAdd {
    /// Zeroed accumulators for `n_channels × n_times`, tapering with a
    /// Hanning window of `window_size` samples.
    pub fn new(n_channels: usize, n_times: usize, window_size: usize) -> Self {
        Self {
            corrected: DMatrix::zeros(n_channels, n_times),
            weight_sum: DMatrix::zeros(n_channels, n_times),
            taper: hanning(window_size),
        }
    }

    /// Add one window's residual (channels × window length).
    ///
    /// Windows shorter than the full window size use the leading part of the
    /// taper.
    pub fn accumulate(&mut self, window: Window, residual: &DMatrix<f64>) {
        let len = window.len().min(self.taper.len());
        for ch in 0..residual.nrows() {
            for i in 0..len {
                let weight = self.taper[i];
                let col = window.start + i;
                self.corrected[(ch, col)] += residual[(ch, i)] * weight;
                self.weight_sum[(ch, col)] += weight;
            }
        }
    }

    /// Accumulated taper weight per element
    pub fn weight_sum(&self) -> &DMatrix<f64> {
        &self.weight_sum
    }

    /// Number of columns no window covered
    pub fn uncovered_columns(&self) -> usize {
        self.weight_sum
            .column_iter()
            .filter(|col| col.iter().all(|&w| w == 0.0))
            .count()
    }

    /// Divide the accumulated residuals by their weights.
    ///
    /// Elements with zero weight are divided by one, which leaves them at zero.
    pub fn finish(self) -> DMatrix<f64> {
        let uncovered = self.uncovered_columns();
        if uncovered > 0 {
            log::warn!(
                "{} column(s) received no window weight; emitting zeros there",
                uncovered
            );
        }

        let mut corrected = self.corrected;
        corrected.zip_apply(&self.weight_sum, |value, weight| {
            let w = if weight == 0.0 { 1.0 } else { weight };
            *value /= w;
        });
        corrected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windowing::windows;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weights_match_covering_windows() {
        // 8 samples, window 4, step 2: starts 0, 2, 4, 6
        let taper = hanning(4);
        let mut ola = OverlapAdd::new(1, 8, 4);
        for w in windows(8, 4, 2) {
            ola.accumulate(w, &DMatrix::from_element(1, w.len(), 1.0));
        }

        let expected = [
            taper[0],
            taper[1],
            taper[2] + taper[0],
            taper[3] + taper[1],
            taper[2] + taper[0],
            taper[3] + taper[1],
            taper[2] + taper[0],
            taper[3] + taper[1],
        ];
        for (col, &e) in expected.iter().enumerate() {
            assert!(ola.weight_sum()[(0, col)] > 0.0);
            assert_abs_diff_eq!(ola.weight_sum()[(0, col)], e, epsilon = 1e-12);
        }
        assert_eq!(ola.uncovered_columns(), 0);
    }

    #[test]
    fn test_constant_residual_is_reconstructed() {
        let mut ola = OverlapAdd::new(2, 10, 4);
        for w in windows(10, 4, 2) {
            ola.accumulate(w, &DMatrix::from_element(2, w.len(), 3.5));
        }
        let out = ola.finish();
        for &v in out.iter() {
            assert_abs_diff_eq!(v, 3.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_uncovered_columns_stay_zero() {
        let mut ola = OverlapAdd::new(1, 6, 2);
        ola.accumulate(Window { start: 0, end: 2 }, &DMatrix::from_element(1, 2, 1.0));
        assert_eq!(ola.uncovered_columns(), 4);
        let out = ola.finish();
        assert_abs_diff_eq!(out[(0, 0)], 1.0, epsilon = 1e-12);
        assert_eq!(out[(0, 5)], 0.0);
    }
}
