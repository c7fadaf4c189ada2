use crate::cli::ValidateArgs;
use crate::cwl_params;
use crate::exit_codes;
use crate::output;
use cwl_rs::{load_recording, ChannelSet};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidateOutput {
    file: String,
    valid: bool,
    channels: Option<usize>,
    signal_channels: Option<usize>,
    reference_channels: Option<usize>,
    samples: Option<usize>,
    sample_rate: Option<f64>,
    duration_seconds: Option<f64>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut result = ValidateOutput {
        file: args.file.clone(),
        valid: false,
        channels: None,
        signal_channels: None,
        reference_channels: None,
        samples: None,
        sample_rate: None,
        duration_seconds: None,
        error: None,
    };

    let checked = cwl_params::validate_file(&args.file)
        .and_then(|_| load_recording(Path::new(&args.file)).map_err(|e| e.to_string()))
        .and_then(|recording| {
            result.channels = Some(recording.channels.len());
            result.samples = Some(recording.len());
            result.sample_rate = Some(recording.sample_rate);
            result.duration_seconds = Some(recording.duration_seconds());

            let channels = ChannelSet::partition(&recording.channels, &args.reference_tag)
                .map_err(|e| e.to_string())?;
            result.signal_channels = Some(channels.signal_indices().len());
            result.reference_channels = Some(channels.reference_indices().len());
            Ok(())
        });

    if let Err(msg) = checked {
        result.error = Some(msg);
    } else {
        result.valid = true;
    }

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "Recording '{}' is valid ({} channels: {} signal / {} reference, {} samples at {} Hz)",
            args.file,
            result.channels.unwrap_or(0),
            result.signal_channels.unwrap_or(0),
            result.reference_channels.unwrap_or(0),
            result.samples.unwrap_or(0),
            result.sample_rate.unwrap_or(0.0)
        );
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::INPUT_ERROR
    }
}
