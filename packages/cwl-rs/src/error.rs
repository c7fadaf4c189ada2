use thiserror::Error;

#[derive(Error, Debug)]
pub enum CwlError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel mismatch: expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Timestamp must be finite, got {0}")]
    InvalidTimestamp(f64),

    #[error("Timestamps must be strictly increasing: {previous} followed by {next}")]
    NonMonotonicTimestamps { previous: f64, next: f64 },

    #[error("Regression failed: {0}")]
    Regression(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse recording: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CwlError>;
