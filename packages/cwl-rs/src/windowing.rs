use crate::error::{CwlError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half-open column range `[start, end)` of one analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Distance between window starts: `floor(window_size * (1 - overlap))`
pub fn window_step(window_size: usize, overlap: f64) -> Result<usize> {
    if window_size == 0 {
        return Err(CwlError::InvalidConfig(
            "window size must be at least one sample".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&overlap) {
        return Err(CwlError::InvalidConfig(format!(
            "overlap must be in [0, 1), got {}",
            overlap
        )));
    }

    let step = (window_size as f64 * (1.0 - overlap)).floor() as usize;
    if step < 1 {
        return Err(CwlError::InvalidConfig(format!(
            "window of {} samples with overlap {} leaves no step between windows",
            window_size, overlap
        )));
    }
    Ok(step)
}

/// Windows starting at `0, step, 2 * step, ...` while the start lies inside
/// the signal. The last windows are cut short at `n_times`.
pub fn windows(n_times: usize, window_size: usize, step: usize) -> Vec<Window> {
    (0..n_times)
        .step_by(step.max(1))
        .map(|start| Window {
            start,
            end: (start + window_size).min(n_times),
        })
        .collect()
}

/// Hanning taper of length `len` without zero end points:
/// `w[k] = 0.5 * (1 - cos(2πk / (len + 1)))` for `k = 1..=len`.
///
/// Every sample of a covered column therefore contributes a positive weight.
pub fn hanning(len: usize) -> Vec<f64> {
    let denom = (len + 1) as f64;
    (1..=len)
        .map(|k| 0.5 * (1.0 - (2.0 * PI * k as f64 / denom).cos()))
        .collect()
}
