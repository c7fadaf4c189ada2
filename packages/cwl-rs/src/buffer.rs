// Bounded sample buffer for the streaming controller
//
// Stores the most recent samples of every channel together with their
// timestamps. Old samples are evicted from the front once the capacity is
// exceeded, so memory stays at O(capacity × channels) for unbounded streams.

use crate::error::{CwlError, Result};
use crate::types::Chunk;
use nalgebra::DMatrix;
use std::collections::VecDeque;

/// Channel-major FIFO buffer of samples and timestamps
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    channels: Vec<VecDeque<f64>>,
    timestamps: VecDeque<f64>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(n_channels: usize, capacity: usize) -> Self {
        Self {
            channels: (0..n_channels).map(|_| VecDeque::new()).collect(),
            timestamps: VecDeque::new(),
            capacity,
        }
    }

    /// Check that `chunk` can be appended without breaking alignment.
    ///
    /// Every row must have one value per channel, there must be one
    /// timestamp per row, and timestamps must keep increasing strictly from
    /// the last buffered one. NaN and infinite timestamps are rejected.
    pub fn check(&self, chunk: &Chunk) -> Result<()> {
        if chunk.timestamps.len() != chunk.samples.len() {
            return Err(CwlError::ShapeMismatch(format!(
                "chunk has {} sample rows but {} timestamps",
                chunk.samples.len(),
                chunk.timestamps.len()
            )));
        }

        if let Some(row) = chunk.samples.iter().find(|row| row.len() != self.channels.len()) {
            return Err(CwlError::ChannelMismatch {
                expected: self.channels.len(),
                actual: row.len(),
            });
        }

        let mut previous = self.last_timestamp();
        for &next in &chunk.timestamps {
            if !next.is_finite() {
                return Err(CwlError::InvalidTimestamp(next));
            }
            if let Some(prev) = previous {
                if next <= prev {
                    return Err(CwlError::NonMonotonicTimestamps {
                        previous: prev,
                        next,
                    });
                }
            }
            previous = Some(next);
        }

        Ok(())
    }

    /// Append a chunk (rows = time) after the newest buffered sample.
    ///
    /// The chunk is not checked; call [`SampleBuffer::check`] first.
    pub fn append(&mut self, chunk: &Chunk) {
        for row in &chunk.samples {
            for (channel, &value) in self.channels.iter_mut().zip(row.iter()) {
                channel.push_back(value);
            }
        }
        self.timestamps.extend(chunk.timestamps.iter().copied());
    }

    /// Drop the oldest samples beyond the capacity; returns how many were dropped.
    pub fn truncate_to_capacity(&mut self) -> usize {
        let excess = self.len().saturating_sub(self.capacity);
        if excess > 0 {
            for channel in &mut self.channels {
                channel.drain(..excess);
            }
            self.timestamps.drain(..excess);
        }
        excess
    }

    /// Number of buffered samples per channel
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// True once the buffer holds at least `capacity` samples
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.back().copied()
    }

    /// Buffered timestamps, oldest first
    pub fn timestamps(&self) -> Vec<f64> {
        self.timestamps.iter().copied().collect()
    }

    /// Buffered samples as a channels × time matrix
    pub fn channel_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.channels.len(), self.len(), |ch, t| self.channels[ch][t])
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        self.timestamps.clear();
    }
}
