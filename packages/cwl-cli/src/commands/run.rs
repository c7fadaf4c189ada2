use crate::cli::RunArgs;
use crate::cwl_params;
use crate::exit_codes;
use crate::output;
use std::path::Path;

pub fn execute(args: RunArgs) -> i32 {
    if !args.quiet {
        eprintln!(
            "Correcting {} ({} mode)...",
            args.file,
            if args.offline { "offline" } else { "streaming" }
        );
    }

    let report = match cwl_params::correct_file(
        &args.file,
        &args.correction,
        args.chunk_size,
        args.offline,
    ) {
        Ok(report) => report,
        Err(failure) => {
            eprintln!("Error: {}", failure);
            return failure.exit_code();
        }
    };

    if !args.quiet {
        eprintln!(
            "  Window: {} samples, step {}, max shift {}",
            report.parameters.window_size, report.parameters.step, report.parameters.max_shift
        );
        if let Some(ref stats) = report.stats {
            eprintln!(
                "  Chunks: {} received, {} passed through, {} corrected",
                stats.chunks_received, stats.passthrough_chunks, stats.corrected_chunks
            );
        }
        eprintln!("  Done in {:.1}ms", report.processing_time_ms);
    }

    if let Err(e) = output::emit(&report, args.compact, args.output.as_deref().map(Path::new)) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
    }

    exit_codes::SUCCESS
}
