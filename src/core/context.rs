//! Execution context and run status tracking.
//!
//! `ExecutionContext` carries the run-scoped environment every step sees;
//! `RunStatus` owns the authoritative timer and the ordered step log.

use crate::core::types::{RunOutcome, StepOutcome, StepRecord, TargetEnvironment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Log verbosity threshold carried in the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

/// Run-scoped environment shared by every step of one run.
///
/// Created at compile time by the engine variant's `initialize_context`.
/// One context belongs to exactly one run; never share it across
/// concurrent runs.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Deployment destination for this run
    pub target: TargetEnvironment,

    /// Project root directory
    pub project_path: PathBuf,

    /// Configuration directory
    pub config_path: PathBuf,

    /// Source directory
    pub source_path: PathBuf,

    /// Data directory
    pub data_path: PathBuf,

    /// Verbosity threshold
    pub log_level: LogLevel,

    /// Caller-supplied compile options, opaque pass-through
    pub compile_options: serde_json::Value,

    /// Run-scoped scratch state. Executors extend it as they run; values
    /// written by one step are visible to every later step of the same run.
    /// The lock is held only for the duration of a read or write, never
    /// across an await.
    pub state: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl ExecutionContext {
    /// Write a value into the shared run state.
    pub fn set_state(&self, key: impl Into<String>, value: serde_json::Value) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value);
    }

    /// Read a value from the shared run state.
    pub fn get_state(&self, key: &str) -> Option<serde_json::Value> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

/// Timer plus ordered step log for one run.
///
/// Single source of truth for elapsed time and per-step results. The timer
/// is monotonic (`Instant`-based); `elapsed()` works mid-run and after
/// `stop_timer()`.
#[derive(Debug)]
pub struct RunStatus {
    started_at: Option<Instant>,
    stopped_after: Option<Duration>,
    records: Vec<StepRecord>,
}

impl RunStatus {
    pub fn new() -> Self {
        Self {
            started_at: None,
            stopped_after: None,
            records: Vec::new(),
        }
    }

    /// Start (or restart) the run timer.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.stopped_after = None;
    }

    /// Freeze the elapsed time.
    pub fn stop_timer(&mut self) {
        if self.stopped_after.is_none() {
            self.stopped_after = Some(self.running_elapsed());
        }
    }

    /// Elapsed time; the frozen value once `stop_timer` has been called.
    pub fn elapsed(&self) -> Duration {
        self.stopped_after.unwrap_or_else(|| self.running_elapsed())
    }

    fn running_elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Append a step record to the ordered log.
    pub fn record_step(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// Ordered step log so far.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Stop the timer and fold the step log into a final summary.
    ///
    /// The overall outcome is `Error` if any step failed, `Warning` if any
    /// step warned, otherwise `Success`. `halted` marks a run cut short by
    /// the halt policy.
    pub fn finalize(&mut self, halted: bool) -> RunSummary {
        self.stop_timer();

        let mut succeeded = 0u32;
        let mut warned = 0u32;
        let mut failed = 0u32;
        for r in &self.records {
            match r.result.outcome {
                StepOutcome::Success => succeeded += 1,
                StepOutcome::Warning => warned += 1,
                StepOutcome::Error => failed += 1,
            }
        }

        let outcome = if failed > 0 {
            RunOutcome::Error
        } else if warned > 0 {
            RunOutcome::Warning
        } else {
            RunOutcome::Success
        };

        RunSummary {
            outcome,
            halted,
            steps_succeeded: succeeded,
            steps_warned: warned,
            steps_failed: failed,
            total_duration: self.elapsed(),
            records: self.records.clone(),
        }
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a run: outcome, counts, timing, and the full step log.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub halted: bool,
    pub steps_succeeded: u32,
    pub steps_warned: u32,
    pub steps_failed: u32,
    pub total_duration: Duration,
    pub records: Vec<StepRecord>,
}
