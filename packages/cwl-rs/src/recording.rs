use crate::controller::CwlController;
use crate::error::{CwlError, Result};
use crate::types::Chunk;
use memmap2::Mmap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// A multi-channel recording exchanged as JSON
///
/// `samples` has one row per time sample with one value per channel.
/// When `timestamps` is omitted they are derived from `sample_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub channels: Vec<String>,
    pub sample_rate: f64,
    #[serde(default)]
    pub timestamps: Vec<f64>,
    pub samples: Vec<Vec<f64>>,
}

impl Recording {
    /// Number of time samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    /// Fill in missing timestamps and check row widths and ordering.
    pub fn normalize(&mut self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(CwlError::InvalidConfig(format!(
                "recording sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }

        if self.timestamps.is_empty() && !self.samples.is_empty() {
            self.timestamps = (0..self.samples.len())
                .map(|i| i as f64 / self.sample_rate)
                .collect();
        }

        if self.timestamps.len() != self.samples.len() {
            return Err(CwlError::ShapeMismatch(format!(
                "recording has {} sample rows but {} timestamps",
                self.samples.len(),
                self.timestamps.len()
            )));
        }

        if let Some(row) = self.samples.iter().find(|r| r.len() != self.channels.len()) {
            return Err(CwlError::ChannelMismatch {
                expected: self.channels.len(),
                actual: row.len(),
            });
        }

        if let Some(&bad) = self.timestamps.iter().find(|t| !t.is_finite()) {
            return Err(CwlError::InvalidTimestamp(bad));
        }

        if let Some(pair) = self.timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(CwlError::NonMonotonicTimestamps {
                previous: pair[0],
                next: pair[1],
            });
        }

        Ok(())
    }

    /// Samples as a channels × time matrix
    pub fn channel_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.channels.len(), self.len(), |ch, t| self.samples[t][ch])
    }

    /// Same channels and timestamps with samples taken from a channels × time matrix
    pub fn with_channel_matrix(&self, data: &DMatrix<f64>) -> Recording {
        Recording {
            channels: self.channels.clone(),
            sample_rate: self.sample_rate,
            timestamps: self.timestamps.clone(),
            samples: data
                .column_iter()
                .map(|col| col.iter().copied().collect())
                .collect(),
        }
    }

    /// Consecutive chunks of at most `chunk_size` samples
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = Chunk> + '_ {
        let size = chunk_size.max(1);
        self.samples
            .chunks(size)
            .zip(self.timestamps.chunks(size))
            .map(|(samples, timestamps)| Chunk::new(samples.to_vec(), timestamps.to_vec()))
    }
}

/// Read a JSON recording through a memory map.
pub fn load_recording(path: &Path) -> Result<Recording> {
    if !path.exists() {
        return Err(CwlError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("recording not found: {}", path.display()),
        )));
    }

    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(CwlError::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("recording file is empty: {}", path.display()),
        )));
    }
    // Safety: the map is read-only and dropped before this function returns
    let mmap = unsafe { Mmap::map(&file)? };
    let mut recording: Recording = serde_json::from_slice(&mmap)?;
    recording.normalize()?;

    log::info!(
        "Loaded {}: {} channels, {} samples at {} Hz",
        path.display(),
        recording.channels.len(),
        recording.len(),
        recording.sample_rate
    );

    Ok(recording)
}

/// Stream `recording` through `controller` in chunks of `chunk_size` samples
/// and collect what the controller emits.
pub fn replay(
    recording: &Recording,
    controller: &mut CwlController,
    chunk_size: usize,
) -> Result<Recording> {
    if controller.channels().names() != recording.channels.as_slice() {
        return Err(CwlError::ShapeMismatch(
            "recording channel order differs from the controller's".to_string(),
        ));
    }

    let mut emitted = Chunk::default();
    for chunk in recording.chunks(chunk_size) {
        emitted.extend(controller.process_chunk(&chunk)?);
    }

    log::debug!(
        "Replayed {} samples: {:?}",
        recording.len(),
        controller.stats()
    );

    Ok(Recording {
        channels: recording.channels.clone(),
        sample_rate: recording.sample_rate,
        timestamps: emitted.timestamps,
        samples: emitted.samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CwlConfig;
    use std::io::Write;

    fn recording(n: usize) -> Recording {
        Recording {
            channels: vec!["Fp1".to_string(), "CWL1".to_string()],
            sample_rate: 8.0,
            timestamps: Vec::new(),
            samples: (0..n).map(|t| vec![t as f64, (t as f64).sin()]).collect(),
        }
    }

    #[test]
    fn test_normalize_fills_timestamps() {
        let mut rec = recording(4);
        rec.normalize().unwrap();
        assert_eq!(rec.timestamps, vec![0.0, 0.125, 0.25, 0.375]);
    }

    #[test]
    fn test_normalize_rejects_ragged_rows() {
        let mut rec = recording(4);
        rec.samples[2].push(1.0);
        assert!(matches!(rec.normalize(), Err(CwlError::ChannelMismatch { .. })));
    }

    #[test]
    fn test_normalize_rejects_non_finite_timestamps() {
        let mut rec = recording(3);
        rec.timestamps = vec![f64::NAN, 1.0, 2.0];
        assert!(matches!(rec.normalize(), Err(CwlError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_matrix_round_trip() {
        let mut rec = recording(5);
        rec.normalize().unwrap();
        let m = rec.channel_matrix();
        assert_eq!(m.shape(), (2, 5));
        assert_eq!(rec.with_channel_matrix(&m), rec);
    }

    #[test]
    fn test_chunks_cover_recording() {
        let mut rec = recording(10);
        rec.normalize().unwrap();
        let sizes: Vec<usize> = rec.chunks(4).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_replay_preserves_timestamps() {
        let mut rec = recording(30);
        rec.normalize().unwrap();
        let config = CwlConfig {
            time_delay: 0.0,
            window_duration: 1.0,
            sample_rate: 8.0,
            ..CwlConfig::default()
        };
        let mut controller = CwlController::new(config, &rec.channels).unwrap();
        let out = replay(&rec, &mut controller, 3).unwrap();
        assert_eq!(out.len(), rec.len());
        assert_eq!(out.timestamps, rec.timestamps);
        assert_eq!(out.samples[0], rec.samples[0]);
    }

    #[test]
    fn test_load_recording_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"channels": ["Cz", "CWL1"], "sample_rate": 4.0, "samples": [[1.0, 2.0], [3.0, 4.0]]}}"#
        )
        .unwrap();
        let rec = load_recording(file.path()).unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.timestamps, vec![0.0, 0.25]);
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        match load_recording(file.path()) {
            Err(CwlError::IoError(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_recording(Path::new("/nonexistent/recording.json")).is_err());
    }
}
