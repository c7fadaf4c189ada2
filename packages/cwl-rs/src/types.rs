use crate::error::{CwlError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Largest window or embedding shift, in samples, a config may ask for
pub const MAX_WINDOW_SAMPLES: usize = u32::MAX as usize;

/// Correction settings fixed at construction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CwlConfig {
    /// Half-width of the reference delay embedding, in seconds
    #[serde(default = "default_time_delay")]
    pub time_delay: f64,

    /// Length of the analysis window and of the sample buffer, in seconds
    #[serde(default = "default_window_duration")]
    pub window_duration: f64,

    /// Fraction of each window shared with the next one, in [0, 1)
    #[serde(default = "default_overlap")]
    pub overlap: f64,

    /// Sampling rate of the incoming stream (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Channels whose identifier contains this tag are reference channels
    #[serde(default = "default_reference_tag")]
    pub reference_tag: String,

    /// Multiplier applied to the buffer before regression and divided out afterwards
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
}

fn default_time_delay() -> f64 {
    21e-3
}
fn default_window_duration() -> f64 {
    4.0
}
fn default_overlap() -> f64 {
    0.5
}
fn default_sample_rate() -> f64 {
    250.0
}
fn default_reference_tag() -> String {
    "CWL".to_string()
}
fn default_scale_factor() -> f64 {
    1e-6
}

impl Default for CwlConfig {
    fn default() -> Self {
        Self {
            time_delay: default_time_delay(),
            window_duration: default_window_duration(),
            overlap: default_overlap(),
            sample_rate: default_sample_rate(),
            reference_tag: default_reference_tag(),
            scale_factor: default_scale_factor(),
        }
    }
}

impl CwlConfig {
    /// Config with the stock correction settings for a given sampling rate
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Check every value and derive the sample-domain parameters.
    pub fn parameters(&self) -> Result<CorrectionParameters> {
        self.validate()?;

        let window_samples = (self.window_duration * self.sample_rate).ceil();
        if window_samples > MAX_WINDOW_SAMPLES as f64 {
            return Err(CwlError::InvalidConfig(format!(
                "window of {} s at {} Hz exceeds {} samples",
                self.window_duration, self.sample_rate, MAX_WINDOW_SAMPLES
            )));
        }
        if (self.time_delay * self.sample_rate).ceil() > MAX_WINDOW_SAMPLES as f64 {
            return Err(CwlError::InvalidConfig(format!(
                "time_delay of {} s at {} Hz exceeds {} samples",
                self.time_delay, self.sample_rate, MAX_WINDOW_SAMPLES
            )));
        }

        let window_size = window_samples as usize;
        let step = crate::windowing::window_step(window_size, self.overlap)?;
        let max_shift = crate::embedding::max_shift(self.time_delay, self.sample_rate);

        Ok(CorrectionParameters {
            window_size,
            step,
            max_shift,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(CwlError::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !self.window_duration.is_finite() || self.window_duration <= 0.0 {
            return Err(CwlError::InvalidConfig(format!(
                "window_duration must be positive, got {}",
                self.window_duration
            )));
        }
        if !self.time_delay.is_finite() || self.time_delay < 0.0 {
            return Err(CwlError::InvalidConfig(format!(
                "time_delay must be non-negative, got {}",
                self.time_delay
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(CwlError::InvalidConfig(format!(
                "overlap must be in [0, 1), got {}",
                self.overlap
            )));
        }
        if !self.scale_factor.is_finite() || self.scale_factor == 0.0 {
            return Err(CwlError::InvalidConfig(format!(
                "scale_factor must be finite and non-zero, got {}",
                self.scale_factor
            )));
        }
        if self.reference_tag.is_empty() {
            return Err(CwlError::InvalidConfig(
                "reference_tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sample-domain parameters derived from a [`CwlConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionParameters {
    /// Analysis window length in samples; also the buffer capacity
    pub window_size: usize,
    /// Distance between consecutive window starts
    pub step: usize,
    /// Largest delay-embedding shift, in samples
    pub max_shift: usize,
}

impl CorrectionParameters {
    /// Number of shifted copies produced per reference channel
    pub fn shifts(&self) -> usize {
        2 * self.max_shift + 1
    }

    /// Number of regression predictors for `reference_count` reference channels
    pub fn predictor_count(&self, reference_count: usize) -> usize {
        reference_count * self.shifts()
    }
}

/// Ordered channel identifiers split into reference and signal channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSet {
    names: Vec<String>,
    reference: Vec<usize>,
    signal: Vec<usize>,
}

impl ChannelSet {
    /// Partition `names` by whether they contain `reference_tag`.
    ///
    /// Fails when either side of the partition is empty.
    pub fn partition(names: &[String], reference_tag: &str) -> Result<Self> {
        let (reference, signal): (Vec<usize>, Vec<usize>) =
            (0..names.len()).partition(|&i| names[i].contains(reference_tag));

        if reference.is_empty() {
            return Err(CwlError::InvalidConfig(format!(
                "no reference channels matching '{}' among {} channels",
                reference_tag,
                names.len()
            )));
        }
        if signal.is_empty() {
            return Err(CwlError::InvalidConfig(
                "every channel is a reference channel; nothing to correct".to_string(),
            ));
        }

        Ok(Self {
            names: names.to_vec(),
            reference,
            signal,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Row indices of the reference channels, in declared order
    pub fn reference_indices(&self) -> &[usize] {
        &self.reference
    }

    /// Row indices of the signal channels, in declared order
    pub fn signal_indices(&self) -> &[usize] {
        &self.signal
    }

    pub fn reference_names(&self) -> Vec<&str> {
        self.reference.iter().map(|&i| self.names[i].as_str()).collect()
    }

    pub fn signal_names(&self) -> Vec<&str> {
        self.signal.iter().map(|&i| self.names[i].as_str()).collect()
    }
}

/// A block of consecutive samples as exchanged with the streaming runtime
///
/// `samples` holds one row per time sample, each row ordered like the
/// controller's [`ChannelSet`]. `timestamps` has one entry per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub samples: Vec<Vec<f64>>,
    pub timestamps: Vec<f64>,
}

impl Chunk {
    pub fn new(samples: Vec<Vec<f64>>, timestamps: Vec<f64>) -> Self {
        Self {
            samples,
            timestamps,
        }
    }

    /// Number of time samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy of the rows in `range`
    pub fn slice(&self, range: Range<usize>) -> Chunk {
        Chunk {
            samples: self.samples[range.clone()].to_vec(),
            timestamps: self.timestamps[range].to_vec(),
        }
    }

    /// Append another chunk's rows after this one's
    pub fn extend(&mut self, other: Chunk) {
        self.samples.extend(other.samples);
        self.timestamps.extend(other.timestamps);
    }

    /// Rows restricted to the signal channels of `channels` (time × signal count)
    pub fn signal_rows(&self, channels: &ChannelSet) -> Vec<Vec<f64>> {
        self.samples
            .iter()
            .map(|row| channels.signal_indices().iter().map(|&c| row[c]).collect())
            .collect()
    }
}
