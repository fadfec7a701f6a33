//! Append-only JSONL run log.
//!
//! One file per run under the state directory. Pure observability: the
//! engine writes events and never reads them back.

use crate::core::runtime::ProgressSink;
use crate::core::types::{RunEvent, TimestampedEvent};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Generate an ISO 8601 timestamp without a chrono dependency.
pub fn now_iso8601() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let time_secs = secs % 86400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        time_secs / 3600,
        (time_secs % 3600) / 60,
        time_secs % 60
    )
}

/// Days since 1970-01-01 to a Gregorian (year, month, day).
/// Howard Hinnant's civil_from_days algorithm.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Generate a run ID from the current time.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the run log path for a run ID.
pub fn run_log_path(state_dir: &Path, run_id: &str) -> PathBuf {
    state_dir.join("runs").join(format!("{run_id}.jsonl"))
}

/// Progress sink that appends each event as one timestamped JSON line.
///
/// Log failures are reported once through `tracing` and never interrupt the
/// run.
pub struct JsonlSink {
    path: PathBuf,
    file: Option<File>,
}

impl JsonlSink {
    /// Open (create) the run log for appending.
    pub fn open(state_dir: &Path, run_id: &str) -> std::io::Result<Self> {
        let path = run_log_path(state_dir, run_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressSink for JsonlSink {
    fn post(&mut self, event: RunEvent) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let te = TimestampedEvent {
            ts: now_iso8601(),
            event,
        };
        let line = match serde_json::to_string(&te) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "run log serialize error, disabling log");
                self.file = None;
                return;
            }
        };
        if let Err(e) = writeln!(file, "{line}") {
            warn!(path = %self.path.display(), error = %e, "run log write error, disabling log");
            self.file = None;
        }
    }
}
