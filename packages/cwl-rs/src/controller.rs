// Streaming CWL correction controller
//
// Receives chunks from the surrounding streaming runtime one at a time:
// - appends them to a bounded sample buffer
// - passes chunks through untouched while the buffer is still filling
// - once a full window is buffered, corrects the whole buffer and emits the
//   corrected samples matching the chunk that was just received

use crate::buffer::SampleBuffer;
use crate::correction::correct_channels;
use crate::error::Result;
use crate::profiling::ProfileScope;
use crate::types::{ChannelSet, Chunk, CorrectionParameters, CwlConfig};
use serde::{Deserialize, Serialize};

/// Buffer phase of the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    /// Fewer samples than one window; chunks pass through
    Filling,
    /// A full window is buffered; chunks are corrected
    Ready,
}

/// Counters describing the stream seen so far
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControllerStats {
    pub chunks_received: u64,
    pub samples_received: u64,
    pub passthrough_chunks: u64,
    pub corrected_chunks: u64,
    pub samples_evicted: u64,
    pub last_correction_ms: f64,
}

/// Stateful CWL corrector for one stream
pub struct CwlController {
    config: CwlConfig,
    params: CorrectionParameters,
    channels: ChannelSet,
    buffer: SampleBuffer,
    stats: ControllerStats,
}

impl CwlController {
    /// Create a controller for a stream with the given channel order.
    ///
    /// Fails if the configuration is invalid or the channels cannot be split
    /// into reference and signal channels.
    pub fn new(config: CwlConfig, channel_names: &[String]) -> Result<Self> {
        let params = config.parameters()?;
        let channels = ChannelSet::partition(channel_names, &config.reference_tag)?;

        log::info!(
            "CWL controller: {} signal / {} reference channels, window {} samples (step {}), max shift {}, {} predictors",
            channels.signal_indices().len(),
            channels.reference_indices().len(),
            params.window_size,
            params.step,
            params.max_shift,
            params.predictor_count(channels.reference_indices().len())
        );

        let buffer = SampleBuffer::new(channels.len(), params.window_size);

        Ok(Self {
            config,
            params,
            channels,
            buffer,
            stats: ControllerStats::default(),
        })
    }

    /// Process one incoming chunk and return the chunk to emit downstream.
    ///
    /// The emitted chunk has the same rows, channels and timestamps as the
    /// input. While the buffer is filling the input is returned unchanged;
    /// afterwards the signal channels hold corrected values.
    ///
    /// Any error leaves the controller as it was before the call: a chunk
    /// rejected by validation (wrong width, bad timestamps) never reaches the
    /// buffer, and a chunk whose correction fails is rolled back, including
    /// the earlier pieces of a chunk longer than the buffer.
    pub fn process_chunk(&mut self, chunk: &Chunk) -> Result<Chunk> {
        self.buffer.check(chunk)?;

        if chunk.is_empty() {
            return Ok(Chunk::default());
        }

        let saved = (self.buffer.clone(), self.stats.clone());
        let result = self.process_blocks(chunk);
        if result.is_err() {
            (self.buffer, self.stats) = saved;
        }
        result
    }

    fn process_blocks(&mut self, chunk: &Chunk) -> Result<Chunk> {
        self.stats.chunks_received += 1;
        self.stats.samples_received += chunk.len() as u64;

        let capacity = self.buffer.capacity();
        if chunk.len() <= capacity {
            return self.process_block(chunk);
        }

        // Longer than the buffer: feed it in buffer-sized pieces so every
        // sample is emitted exactly once.
        let mut emitted = Chunk::default();
        let mut start = 0;
        while start < chunk.len() {
            let end = (start + capacity).min(chunk.len());
            emitted.extend(self.process_block(&chunk.slice(start..end))?);
            start = end;
        }
        Ok(emitted)
    }

    fn process_block(&mut self, block: &Chunk) -> Result<Chunk> {
        self.buffer.append(block);

        if !self.buffer.is_full() {
            self.stats.passthrough_chunks += 1;
            log::trace!(
                "Buffer filling: {}/{} samples",
                self.buffer.len(),
                self.buffer.capacity()
            );
            return Ok(block.clone());
        }

        let evicted = self.buffer.truncate_to_capacity();
        self.stats.samples_evicted += evicted as u64;

        let scope = ProfileScope::new(
            "cwl_correction_pass",
            self.channels.len(),
            self.buffer.len(),
        );
        let corrected = correct_channels(
            &self.buffer.channel_matrix(),
            &self.channels,
            &self.params,
            self.config.overlap,
            self.config.scale_factor,
        )?;
        self.stats.last_correction_ms = scope.elapsed_ms();
        self.stats.corrected_chunks += 1;

        let n_times = corrected.ncols();
        let first = n_times - block.len();
        let samples = (first..n_times)
            .map(|t| corrected.column(t).iter().copied().collect())
            .collect();
        let timestamps = self.buffer.timestamps()[first..].to_vec();

        Ok(Chunk::new(samples, timestamps))
    }

    pub fn state(&self) -> BufferState {
        if self.buffer.is_full() {
            BufferState::Ready
        } else {
            BufferState::Filling
        }
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn parameters(&self) -> &CorrectionParameters {
        &self.params
    }

    pub fn config(&self) -> &CwlConfig {
        &self.config
    }

    /// Samples currently held in the buffer
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Timestamps currently held in the buffer, oldest first
    pub fn buffered_timestamps(&self) -> Vec<f64> {
        self.buffer.timestamps()
    }

    /// Drop buffered data and statistics (stream restart or seek)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stats = ControllerStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CwlError;

    fn config() -> CwlConfig {
        CwlConfig {
            time_delay: 0.0,
            window_duration: 1.0,
            overlap: 0.5,
            sample_rate: 8.0,
            reference_tag: "CWL".to_string(),
            scale_factor: 1.0,
        }
    }

    fn names() -> Vec<String> {
        vec!["Fp1".to_string(), "CWL1".to_string()]
    }

    fn chunk(start: usize, len: usize) -> Chunk {
        let samples = (start..start + len)
            .map(|t| vec![(t as f64 * 0.9).sin() + 3.0, (t as f64 * 0.4).cos()])
            .collect();
        let timestamps = (start..start + len).map(|t| t as f64 / 8.0).collect();
        Chunk::new(samples, timestamps)
    }

    #[test]
    fn test_missing_reference_channels_rejected() {
        let err = CwlController::new(config(), &["Fp1".to_string()]).err().unwrap();
        assert!(matches!(err, CwlError::InvalidConfig(_)));
    }

    #[test]
    fn test_filling_passes_through() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        let input = chunk(0, 5);
        let output = controller.process_chunk(&input).unwrap();
        assert_eq!(output, input);
        assert_eq!(controller.state(), BufferState::Filling);
        assert_eq!(controller.stats().passthrough_chunks, 1);
    }

    #[test]
    fn test_ready_after_full_window() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        controller.process_chunk(&chunk(0, 5)).unwrap();
        let output = controller.process_chunk(&chunk(5, 3)).unwrap();
        assert_eq!(controller.state(), BufferState::Ready);
        assert_eq!(output.len(), 3);
        assert_eq!(output.timestamps, chunk(5, 3).timestamps);
        assert_eq!(controller.stats().corrected_chunks, 1);
    }

    #[test]
    fn test_rejected_chunk_leaves_state() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        controller.process_chunk(&chunk(0, 4)).unwrap();
        assert!(controller.process_chunk(&chunk(2, 4)).is_err());
        assert_eq!(controller.buffered_samples(), 4);
        assert_eq!(controller.stats().chunks_received, 1);
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        let output = controller.process_chunk(&Chunk::default()).unwrap();
        assert!(output.is_empty());
        assert_eq!(controller.stats().chunks_received, 0);
    }

    #[test]
    fn test_nan_first_timestamp_rejected() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        let bad = Chunk::new(vec![vec![1.0, 2.0]], vec![f64::NAN]);
        assert!(matches!(
            controller.process_chunk(&bad),
            Err(CwlError::InvalidTimestamp(_))
        ));
        assert_eq!(controller.buffered_samples(), 0);
        assert!(controller.process_chunk(&chunk(8, 1)).is_ok());
    }

    #[test]
    fn test_failed_correction_rolls_back() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        controller.process_chunk(&chunk(0, 8)).unwrap();
        let stats = controller.stats().clone();
        let timestamps = controller.buffered_timestamps();

        let mut bad = chunk(8, 2);
        bad.samples[1][0] = f64::NAN;
        assert!(matches!(
            controller.process_chunk(&bad),
            Err(CwlError::Regression(_))
        ));
        assert_eq!(controller.stats(), &stats);
        assert_eq!(controller.buffered_timestamps(), timestamps);

        // Same timestamps are still accepted afterwards
        let output = controller.process_chunk(&chunk(8, 2)).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(controller.stats().chunks_received, stats.chunks_received + 1);
    }

    #[test]
    fn test_failed_long_chunk_rolls_back_every_piece() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        let mut bad = chunk(0, 20);
        bad.samples[18][0] = f64::NAN;
        assert!(controller.process_chunk(&bad).is_err());
        assert_eq!(controller.buffered_samples(), 0);
        assert_eq!(controller.stats(), &ControllerStats::default());
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut controller = CwlController::new(config(), &names()).unwrap();
        controller.process_chunk(&chunk(0, 10)).unwrap();
        controller.reset();
        assert_eq!(controller.buffered_samples(), 0);
        assert_eq!(controller.state(), BufferState::Filling);
        assert_eq!(controller.stats(), &ControllerStats::default());
    }
}
