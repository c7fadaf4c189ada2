use crate::cli::BatchArgs;
use crate::cwl_params::{self, CorrectionReport, Failure};
use crate::exit_codes;
use crate::output;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    // Dry-run mode: print file list and exit
    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let start_time = Instant::now();

    // Recordings are independent; correct them in parallel, report in order
    let results: Vec<Result<CorrectionReport, Failure>> = files
        .par_iter()
        .map(|file| {
            cwl_params::correct_file(file, &args.correction, args.chunk_size, args.offline)
        })
        .collect();

    let total = files.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (i, (file_path, result)) in files.iter().zip(results).enumerate() {
        if !args.quiet {
            eprintln!("[{}/{}] {}", i + 1, total, file_path);
        }

        let written = result
            .map_err(|failure| failure.to_string())
            .and_then(|report| write_report(&report, file_path, args.output_dir.as_deref()));

        match written {
            Ok(()) => succeeded += 1,
            Err(msg) => {
                eprintln!("  Error: {}", msg);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }

    if !args.quiet {
        eprintln!(
            "Batch complete: {} succeeded, {} failed ({:.2}s)",
            succeeded,
            failed,
            start_time.elapsed().as_secs_f64()
        );
    }

    if failed > 0 {
        exit_codes::EXECUTION_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

/// Expand the glob pattern into a sorted list of files.
fn resolve_files(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern).map_err(|e| format!("Invalid glob pattern: {}", e))?;

    let mut files: Vec<String> = paths
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    files.sort();
    Ok(files)
}

/// Write `<stem>_cwl.json` into `output_dir`, or one JSON line to stdout.
fn write_report(
    report: &CorrectionReport,
    file_path: &str,
    output_dir: Option<&str>,
) -> Result<(), String> {
    match output_dir {
        Some(dir) => {
            let stem = Path::new(file_path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let out_path = Path::new(dir).join(format!("{}_cwl.json", stem));
            output::emit(report, false, Some(&out_path))
        }
        None => output::emit(report, true, None),
    }
}
