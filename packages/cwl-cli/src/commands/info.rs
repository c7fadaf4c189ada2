use crate::cli::InfoArgs;
use crate::cwl_params;
use crate::exit_codes;
use crate::output;
use cwl_rs::profiling::profile_log_path;
use cwl_rs::{ChannelSet, CorrectionParameters, CwlConfig};
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    config: CwlConfig,
    parameters: CorrectionParameters,
    window_seconds: f64,
    latency_samples: usize,
    signal_channels: Vec<String>,
    reference_channels: Vec<String>,
    predictor_count: usize,
    profile_log: String,
}

pub fn execute(args: InfoArgs) -> i32 {
    let config = match cwl_params::resolve_config(&args.correction, args.sample_rate) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let parameters = match config.parameters() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let channels = match ChannelSet::partition(&args.channels, &config.reference_tag) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        window_seconds: parameters.window_size as f64 / config.sample_rate,
        // Corrected output starts once the buffer holds a full window
        latency_samples: parameters.window_size,
        signal_channels: channels.signal_names().iter().map(|s| s.to_string()).collect(),
        reference_channels: channels
            .reference_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        predictor_count: parameters.predictor_count(channels.reference_indices().len()),
        profile_log: profile_log_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unavailable".to_string()),
        config,
        parameters,
    };

    if args.json {
        if let Err(e) = output::emit(&info, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("cwl CLI v{}", info.cli_version);
        println!();
        println!(
            "Window: {} samples ({:.3}s), step {} samples",
            info.parameters.window_size, info.window_seconds, info.parameters.step
        );
        println!(
            "Delay embedding: max shift {} ({} shifts per reference channel)",
            info.parameters.max_shift,
            info.parameters.shifts()
        );
        println!("Signal channels: {}", info.signal_channels.join(", "));
        println!("Reference channels: {}", info.reference_channels.join(", "));
        println!("Predictors per window: {}", info.predictor_count);
        println!("Profile log (CWL_PROFILE=1): {}", info.profile_log);
    }

    exit_codes::SUCCESS
}
