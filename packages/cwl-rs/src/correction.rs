use crate::embedding::delay_embed;
use crate::error::{CwlError, Result};
use crate::overlap_add::OverlapAdd;
use crate::profile_scope;
use crate::regression::fit_window;
use crate::types::{ChannelSet, CorrectionParameters, CwlConfig};
use crate::windowing::{window_step, windows};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Remove the part of `eeg` explained by `embedded` window by window and
/// blend the tapered residuals back together.
///
/// `eeg` is signal channels × time, `embedded` is predictors × time. Windows
/// are fitted in parallel; the overlap-add runs in window order so the
/// result does not depend on scheduling.
pub fn correct(
    eeg: &DMatrix<f64>,
    embedded: &DMatrix<f64>,
    window_size: usize,
    overlap: f64,
) -> Result<DMatrix<f64>> {
    let step = window_step(window_size, overlap)?;
    if embedded.nrows() == 0 {
        return Err(CwlError::InvalidConfig(
            "embedded reference has no predictor rows".to_string(),
        ));
    }
    if eeg.ncols() != embedded.ncols() {
        return Err(CwlError::ShapeMismatch(format!(
            "signal has {} samples but embedded reference has {}",
            eeg.ncols(),
            embedded.ncols()
        )));
    }

    if let Some(bad) = eeg.iter().chain(embedded.iter()).find(|v| !v.is_finite()) {
        return Err(CwlError::Regression(format!(
            "cannot fit non-finite sample {}",
            bad
        )));
    }

    let (n_channels, n_times) = eeg.shape();
    let segments = windows(n_times, window_size, step);

    log::debug!(
        "Correcting {} channels x {} samples with {} windows ({} predictors)",
        n_channels,
        n_times,
        segments.len(),
        embedded.nrows()
    );

    let residuals = segments
        .par_iter()
        .map(|&window| fit_window(eeg, embedded, window))
        .collect::<Result<Vec<_>>>()?;

    let mut ola = OverlapAdd::new(n_channels, n_times, window_size);
    for (window, residual) in segments.iter().zip(residuals.iter()) {
        ola.accumulate(*window, residual);
    }

    Ok(ola.finish())
}

/// Correct every signal row of `data` (all channels × time, declared order).
///
/// Data is multiplied by `scale_factor` before the regression and divided
/// by it afterwards. Reference rows are returned as given.
pub fn correct_channels(
    data: &DMatrix<f64>,
    channels: &ChannelSet,
    params: &CorrectionParameters,
    overlap: f64,
    scale_factor: f64,
) -> Result<DMatrix<f64>> {
    if data.nrows() != channels.len() {
        return Err(CwlError::ChannelMismatch {
            expected: channels.len(),
            actual: data.nrows(),
        });
    }

    let scaled = data * scale_factor;
    let reference = scaled.select_rows(channels.reference_indices());
    let eeg = scaled.select_rows(channels.signal_indices());

    let embedded = delay_embed(&reference, params.max_shift);
    let corrected = correct(&eeg, &embedded, params.window_size, overlap)?;

    let mut output = data.clone();
    for (row, &ch) in channels.signal_indices().iter().enumerate() {
        output.set_row(ch, &(corrected.row(row) / scale_factor));
    }
    Ok(output)
}

/// One-shot correction of a complete recording without the streaming buffer.
pub fn correct_recording(
    data: &DMatrix<f64>,
    channels: &ChannelSet,
    config: &CwlConfig,
) -> Result<DMatrix<f64>> {
    profile_scope!("correct_recording", data.nrows(), data.ncols());

    let params = config.parameters()?;
    log::info!(
        "Offline correction: {} samples, window {} / step {}, max shift {}",
        data.ncols(),
        params.window_size,
        params.step,
        params.max_shift
    );

    correct_channels(data, channels, &params, config.overlap, config.scale_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn channel_set(names: &[&str]) -> ChannelSet {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        ChannelSet::partition(&names, "CWL").unwrap()
    }

    #[test]
    fn test_constant_scenario_gives_zero_output() {
        let reference = DMatrix::from_element(1, 8, 1.0);
        let eeg = DMatrix::from_element(1, 8, 2.0);
        let embedded = delay_embed(&reference, 0);
        let out = correct(&eeg, &embedded, 4, 0.0).unwrap();
        assert_eq!(out.shape(), (1, 8));
        for &v in out.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_reference_returns_input() {
        let reference = DMatrix::zeros(2, 40);
        let eeg = DMatrix::from_fn(3, 40, |c, t| ((c + 1) as f64 * t as f64 * 0.3).sin());
        let embedded = delay_embed(&reference, 2);
        let out = correct(&eeg, &embedded, 10, 0.5).unwrap();
        for (a, b) in out.iter().zip(eeg.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_scaled_artifact_is_removed() {
        let artifact = DMatrix::from_fn(1, 64, |_, t| (t as f64 * 0.7).sin() * 50.0);
        let eeg = DMatrix::from_fn(2, 64, |c, t| artifact[(0, t)] * (c as f64 + 0.5));
        let out = correct(&eeg, &delay_embed(&artifact, 1), 16, 0.5).unwrap();
        for &v in out.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_step_below_one_rejected() {
        let eeg = DMatrix::zeros(1, 8);
        let embedded = DMatrix::zeros(1, 8);
        assert!(matches!(
            correct(&eeg, &embedded, 1, 0.5),
            Err(CwlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let mut eeg = DMatrix::from_element(1, 8, 1.0);
        eeg[(0, 5)] = f64::INFINITY;
        let embedded = DMatrix::from_fn(1, 8, |_, t| t as f64);
        assert!(matches!(
            correct(&eeg, &embedded, 4, 0.5),
            Err(CwlError::Regression(_))
        ));
    }

    #[test]
    fn test_empty_predictors_rejected() {
        let eeg = DMatrix::zeros(1, 8);
        let embedded = DMatrix::zeros(0, 8);
        assert!(correct(&eeg, &embedded, 4, 0.5).is_err());
    }

    #[test]
    fn test_reference_rows_untouched() {
        let channels = channel_set(&["Fp1", "CWL1", "Cz"]);
        let data = DMatrix::from_fn(3, 32, |c, t| (c * 100 + t) as f64);
        let config = CwlConfig {
            time_delay: 0.0,
            window_duration: 1.0,
            overlap: 0.5,
            sample_rate: 8.0,
            ..CwlConfig::default()
        };
        let out = correct_recording(&data, &channels, &config).unwrap();
        assert_eq!(out.shape(), data.shape());
        assert_eq!(out.row(1), data.row(1));
    }

    #[test]
    fn test_channel_count_checked() {
        let channels = channel_set(&["Fp1", "CWL1"]);
        let data = DMatrix::zeros(3, 16);
        let config = CwlConfig::with_sample_rate(4.0);
        assert!(matches!(
            correct_recording(&data, &channels, &config),
            Err(CwlError::ChannelMismatch { expected: 2, actual: 3 })
        ));
    }
}
