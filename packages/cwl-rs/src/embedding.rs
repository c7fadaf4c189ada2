//! Delay embedding of the reference channels.
//!
//! Each reference channel is expanded into `2k + 1` time-shifted copies
//! (`k = ceil(time_delay * sample_rate)`) so the regression can model
//! artifacts that reach the EEG channels with a small lag.

use nalgebra::DMatrix;

/// Largest embedding shift in samples for a delay in seconds
pub fn max_shift(time_delay: f64, sample_rate: f64) -> usize {
    (time_delay * sample_rate).ceil().max(0.0) as usize
}

/// Stack shifted copies of `reference` (channels × time) for every shift in
/// `-max_shift..=max_shift`.
///
/// Columns that a circular shift would wrap around keep their unshifted
/// values instead, so no artificial periodicity is introduced. The output
/// has `reference.nrows() * (2 * max_shift + 1)` rows ordered shift-major,
/// from the most negative shift to the most positive.
pub fn delay_embed(reference: &DMatrix<f64>, max_shift: usize) -> DMatrix<f64> {
    let (n_channels, n_times) = reference.shape();
    let n_shifts = 2 * max_shift + 1;
    let mut embedded = DMatrix::<f64>::zeros(n_channels * n_shifts, n_times);

    for (block, shift) in (-(max_shift as isize)..=max_shift as isize).enumerate() {
        let row_offset = block * n_channels;

        for t in 0..n_times {
            let source = source_column(t, shift, n_times);
            for ch in 0..n_channels {
                embedded[(row_offset + ch, t)] = reference[(ch, source)];
            }
        }
    }

    embedded
}

/// Column of the unshifted data that lands at column `t` after shifting by `shift`.
fn source_column(t: usize, shift: isize, n_times: usize) -> usize {
    if shift > 0 {
        let s = shift as usize;
        if t >= s {
            t - s
        } else {
            t
        }
    } else if shift < 0 {
        let s = shift.unsigned_abs();
        if t + s < n_times {
            t + s
        } else {
            t
        }
    } else {
        t
    }
}
