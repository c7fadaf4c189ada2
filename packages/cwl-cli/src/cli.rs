use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cwl",
    version,
    about = "CWL artifact correction for simultaneous EEG-fMRI",
    long_about = "Remove carbon-wire-loop artifacts from EEG recordings by windowed regression\n\
                  onto delay-embedded reference channels. Recordings are JSON documents with\n\
                  `channels`, `sample_rate`, `samples` (rows = time) and optional `timestamps`."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Correct a single recording
    Run(RunArgs),
    /// Correct every recording matching a glob pattern
    Batch(BatchArgs),
    /// Show the correction parameters derived from a configuration
    Info(InfoArgs),
    /// Validate a recording file
    Validate(ValidateArgs),
}

/// Correction settings shared by the subcommands; flags override `--config`
#[derive(Args, Clone, Default)]
pub struct CorrectionArgs {
    /// JSON file with correction settings
    #[arg(long, env = "CWL_CONFIG")]
    pub config: Option<String>,

    /// Reference embedding half-width in seconds
    #[arg(long)]
    pub time_delay: Option<f64>,

    /// Analysis window length in seconds
    #[arg(long)]
    pub window_duration: Option<f64>,

    /// Window overlap fraction in [0, 1)
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Tag identifying reference channels
    #[arg(long)]
    pub reference_tag: Option<String>,

    /// Scale applied before regression and removed afterwards
    #[arg(long)]
    pub scale_factor: Option<f64>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Input recording (JSON)
    #[arg(long)]
    pub file: String,

    #[command(flatten)]
    pub correction: CorrectionArgs,

    /// Samples per streamed chunk
    #[arg(long, default_value_t = 50)]
    pub chunk_size: usize,

    /// Correct the whole recording at once instead of streaming it
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting input recordings (e.g. "data/*.json")
    #[arg(long)]
    pub pattern: String,

    #[command(flatten)]
    pub correction: CorrectionArgs,

    /// Samples per streamed chunk
    #[arg(long, default_value_t = 50)]
    pub chunk_size: usize,

    /// Correct each recording at once instead of streaming it
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Directory for `<stem>_cwl.json` reports (default: JSON lines on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Keep going after a failed recording
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List matching files without correcting them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Sampling rate in Hz
    #[arg(long)]
    pub sample_rate: f64,

    /// Channel identifiers in stream order
    #[arg(long, num_args = 1..)]
    pub channels: Vec<String>,

    #[command(flatten)]
    pub correction: CorrectionArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input recording (JSON)
    #[arg(long)]
    pub file: String,

    /// Tag identifying reference channels
    #[arg(long, default_value = "CWL")]
    pub reference_tag: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "cwl",
            "run",
            "--file",
            "rec.json",
            "--overlap",
            "0.25",
            "--chunk-size",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.file, "rec.json");
                assert_eq!(args.correction.overlap, Some(0.25));
                assert_eq!(args.correction.time_delay, None);
                assert_eq!(args.chunk_size, 10);
                assert!(!args.offline);
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_info_requires_sample_rate() {
        assert!(Cli::try_parse_from(["cwl", "info", "--channels", "Cz", "CWL1"]).is_err());
    }
}
