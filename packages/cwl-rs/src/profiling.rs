// Timing of correction passes
//
// Every pass is logged at debug level. With CWL_PROFILE set, a record with
// the pass size and throughput is also appended to
// <data_local_dir>/CWL/correction_profile.log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Set to any value to also append timings to the profile log file
pub const PROFILE_ENV_VAR: &str = "CWL_PROFILE";

/// Timing guard for one correction pass over `channels` × `samples`
pub struct ProfileScope {
    label: &'static str,
    channels: usize,
    samples: usize,
    start: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str, channels: usize, samples: usize) -> Self {
        Self {
            label,
            channels,
            samples,
            start: Instant::now(),
        }
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    fn record(&self, elapsed_ms: f64) -> String {
        let per_second = if elapsed_ms > 0.0 {
            self.samples as f64 / (elapsed_ms / 1000.0)
        } else {
            0.0
        };
        format!(
            "{} | {}x{} samples | {:.3}ms | {:.0} samples/s",
            self.label, self.channels, self.samples, elapsed_ms, per_second
        )
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let record = self.record(self.elapsed_ms());
        log::debug!("[PROFILE] {}", record);

        if std::env::var_os(PROFILE_ENV_VAR).is_none() {
            return;
        }
        let Some(path) = profile_log_path() else {
            log::warn!("No local data directory; profile record dropped");
            return;
        };
        let appended = path
            .parent()
            .map_or(Ok(()), |dir| std::fs::create_dir_all(dir))
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&path))
            .and_then(|mut file| {
                writeln!(file, "{} | {}", chrono::Utc::now().to_rfc3339(), record)
            });
        if let Err(e) = appended {
            log::warn!("Failed to append to {}: {}", path.display(), e);
        }
    }
}

/// Time the rest of the enclosing block as a pass over `channels` × `samples`
#[macro_export]
macro_rules! profile_scope {
    ($label:expr, $channels:expr, $samples:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($label, $channels, $samples);
    };
}

/// Where records go when [`PROFILE_ENV_VAR`] is set
pub fn profile_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("CWL").join("correction_profile.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_carries_pass_size() {
        let scope = ProfileScope::new("cwl_correction_pass", 4, 1000);
        let record = scope.record(500.0);
        assert_eq!(
            record,
            "cwl_correction_pass | 4x1000 samples | 500.000ms | 2000 samples/s"
        );
    }

    #[test]
    fn test_record_with_zero_elapsed() {
        let scope = ProfileScope::new("correct_recording", 2, 8);
        assert!(scope.record(0.0).ends_with("| 0 samples/s"));
    }

    #[test]
    fn test_log_path_under_cwl_directory() {
        if let Some(path) = profile_log_path() {
            assert!(path.ends_with("CWL/correction_profile.log"));
        }
    }
}
