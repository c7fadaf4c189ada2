//! Per-window least-squares fit of the signal channels onto the embedded
//! reference channels.
//!
//! Every embedded reference row is one predictor. The design matrix of a
//! window is shared by all signal channels, so it is decomposed once and
//! every channel is solved against the same SVD. Rank-deficient windows
//! (fewer samples than predictors, flat references) get the minimum-norm
//! solution: singular values at or below `eps * max(m, n) * σ_max` are
//! treated as zero.

use crate::error::{CwlError, Result};
use crate::windowing::Window;
use nalgebra::DMatrix;

/// Bound on SVD iterations before a window is reported as failed
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Fit `eeg` (signal channels × time) on `embedded` (predictors × time)
/// over `window` and return the residual (signal channels × window length).
pub fn fit_window(eeg: &DMatrix<f64>, embedded: &DMatrix<f64>, window: Window) -> Result<DMatrix<f64>> {
    if eeg.ncols() != embedded.ncols() {
        return Err(CwlError::ShapeMismatch(format!(
            "signal has {} samples but embedded reference has {}",
            eeg.ncols(),
            embedded.ncols()
        )));
    }
    if window.is_empty() || window.end > eeg.ncols() {
        return Err(CwlError::ShapeMismatch(format!(
            "window {}..{} outside signal of {} samples",
            window.start,
            window.end,
            eeg.ncols()
        )));
    }

    let len = window.len();
    // Observations in rows, one column per predictor / channel
    let design = embedded.columns(window.start, len).transpose();
    let target = eeg.columns(window.start, len).transpose();

    let coefficients = solve_min_norm(design.clone(), &target)?;
    let fitted = &design * coefficients;

    Ok((target - fitted).transpose())
}

/// Minimum-norm least-squares solution of `design * x ≈ target`.
pub fn solve_min_norm(design: DMatrix<f64>, target: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = design.shape();
    let svd = design
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| {
            CwlError::Regression(format!(
                "SVD of {}x{} design matrix did not converge",
                rows, cols
            ))
        })?;

    let sigma_max = svd
        .singular_values
        .iter()
        .fold(0.0_f64, |acc, &s| acc.max(s));
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * sigma_max;

    svd.solve(target, cutoff)
        .map_err(|e| CwlError::Regression(e.to_string()))
}
