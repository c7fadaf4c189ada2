use crate::cli::CorrectionArgs;
use crate::exit_codes;
use cwl_rs::{
    correct_recording, load_recording, replay, ChannelSet, ControllerStats, CorrectionParameters,
    CwlConfig, CwlController, Recording,
};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Validate a single file path: existence and JSON extension.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("Input file not found: {}", file_path));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !ext.eq_ignore_ascii_case("json") {
        return Err(format!(
            "Unsupported file extension '{}'. Recordings must be JSON documents",
            ext
        ));
    }

    Ok(())
}

/// Build the correction config: defaults, then `--config`, then flags.
pub fn resolve_config(args: &CorrectionArgs, sample_rate: f64) -> Result<CwlConfig, String> {
    let mut config = match args.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
            serde_json::from_str::<CwlConfig>(&text)
                .map_err(|e| format!("Invalid config '{}': {}", path, e))?
        }
        None => CwlConfig::default(),
    };

    if let Some(v) = args.time_delay {
        config.time_delay = v;
    }
    if let Some(v) = args.window_duration {
        config.window_duration = v;
    }
    if let Some(v) = args.overlap {
        config.overlap = v;
    }
    if let Some(ref v) = args.reference_tag {
        config.reference_tag = v.clone();
    }
    if let Some(v) = args.scale_factor {
        config.scale_factor = v;
    }
    config.sample_rate = sample_rate;

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Everything written for one corrected recording
#[derive(Serialize)]
pub struct CorrectionReport {
    pub id: String,
    pub source_file: String,
    pub mode: &'static str,
    pub config: CwlConfig,
    pub parameters: CorrectionParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ControllerStats>,
    pub processing_time_ms: f64,
    pub created_at: String,
    pub recording: Recording,
}

/// Why a recording could not be corrected
#[derive(Debug)]
pub enum Failure {
    /// Bad file, recording or settings
    Input(String),
    /// The correction itself failed
    Execution(String),
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::Input(_) => exit_codes::INPUT_ERROR,
            Failure::Execution(_) => exit_codes::EXECUTION_ERROR,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Input(msg) | Failure::Execution(msg) => f.write_str(msg),
        }
    }
}

/// Load, configure and correct one recording.
pub fn correct_file(
    file_path: &str,
    args: &CorrectionArgs,
    chunk_size: usize,
    offline: bool,
) -> Result<CorrectionReport, Failure> {
    validate_file(file_path).map_err(Failure::Input)?;

    if chunk_size == 0 {
        return Err(Failure::Input(
            "Chunk size (--chunk-size) must be greater than 0".to_string(),
        ));
    }

    let recording =
        load_recording(Path::new(file_path)).map_err(|e| Failure::Input(e.to_string()))?;
    let config = resolve_config(args, recording.sample_rate).map_err(Failure::Input)?;
    let parameters = config
        .parameters()
        .map_err(|e| Failure::Input(e.to_string()))?;
    let channels = ChannelSet::partition(&recording.channels, &config.reference_tag)
        .map_err(|e| Failure::Input(e.to_string()))?;

    let start = Instant::now();
    let (corrected, stats) = if offline {
        let data = correct_recording(&recording.channel_matrix(), &channels, &config)
            .map_err(|e| Failure::Execution(e.to_string()))?;
        (recording.with_channel_matrix(&data), None)
    } else {
        let mut controller = CwlController::new(config.clone(), &recording.channels)
            .map_err(|e| Failure::Execution(e.to_string()))?;
        let corrected = replay(&recording, &mut controller, chunk_size)
            .map_err(|e| Failure::Execution(e.to_string()))?;
        (corrected, Some(controller.stats().clone()))
    };

    Ok(CorrectionReport {
        id: uuid::Uuid::new_v4().to_string(),
        source_file: file_path.to_string(),
        mode: if offline { "offline" } else { "streaming" },
        config,
        parameters,
        stats,
        processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        created_at: chrono::Utc::now().to_rfc3339(),
        recording: corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_defaults() {
        let args = CorrectionArgs {
            overlap: Some(0.25),
            reference_tag: Some("ECG".to_string()),
            ..Default::default()
        };
        let config = resolve_config(&args, 500.0).unwrap();
        assert_eq!(config.overlap, 0.25);
        assert_eq!(config.reference_tag, "ECG");
        assert_eq!(config.sample_rate, 500.0);
        assert_eq!(config.window_duration, 4.0);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"window_duration": 2.0, "overlap": 0.75}}"#).unwrap();
        let args = CorrectionArgs {
            config: Some(file.path().to_str().unwrap().to_string()),
            overlap: Some(0.5),
            ..Default::default()
        };
        let config = resolve_config(&args, 250.0).unwrap();
        assert_eq!(config.window_duration, 2.0);
        assert_eq!(config.overlap, 0.5);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let args = CorrectionArgs {
            overlap: Some(1.5),
            ..Default::default()
        };
        assert!(resolve_config(&args, 250.0).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(validate_file(file.path().to_str().unwrap()).is_err());
        assert!(validate_file("/nonexistent/recording.json").is_err());
    }
}
