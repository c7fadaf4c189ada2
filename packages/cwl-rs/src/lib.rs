//! Real-time removal of carbon-wire-loop (CWL) artifacts from EEG recorded
//! inside an MRI scanner.
//!
//! The reference (CWL) channels are delay-embedded, every signal channel is
//! regressed onto them over overlapping windows, and the Hanning-tapered
//! residuals are overlap-added into the corrected signal. [`CwlController`]
//! drives this over a bounded buffer as chunks arrive from a stream;
//! [`correct_recording`] does the same for a complete recording in one pass.

pub mod buffer;
pub mod controller;
pub mod correction;
pub mod embedding;
pub mod error;
pub mod overlap_add;
pub mod profiling;
pub mod recording;
pub mod regression;
pub mod types;
pub mod windowing;

pub use buffer::SampleBuffer;
pub use controller::{BufferState, ControllerStats, CwlController};
pub use correction::{correct, correct_channels, correct_recording};
pub use embedding::{delay_embed, max_shift};
pub use error::{CwlError, Result};
pub use overlap_add::OverlapAdd;
pub use recording::{load_recording, replay, Recording};
pub use types::*;
pub use windowing::{hanning, window_step, windows, Window};

pub use nalgebra::DMatrix;
