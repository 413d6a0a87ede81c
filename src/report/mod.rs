//! Erase report
//!
//! Every regular file a run visits ends up here as exactly one
//! [`FileOutcome`]. Workers append concurrently through
//! [`EraseReport::add_outcome`]; the log and both tallies sit behind a single
//! mutex so an outcome is never counted without being logged.
//!
//! Once every worker has been joined the owner calls
//! [`EraseReport::complete`] with the run's [`RunStatus`], which consumes the
//! live report and returns a read-only [`CompletedReport`] for rendering.
//! Appending after completion is therefore impossible rather than merely
//! discouraged. A report only passes when the run itself completed and no
//! file failed.

pub mod hardware;
pub mod render;

pub use hardware::HardwareSnapshot;
pub use render::{render_json, render_text, write_report, ReportFormat};

use crate::config::WipeConfig;
use crate::error::{FileError, Result};
use crate::walker::WipeResult;
use crate::wipe::WipeMethod;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Terminal state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    /// Overwritten and removed
    Wiped,
    /// Anything short of overwritten and removed
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Wiped => "WIPED",
            OutcomeStatus::Failed => "FAILED",
        }
    }
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    #[serde(serialize_with = "serialize_path")]
    pub path: PathBuf,
    pub status: OutcomeStatus,
    pub passes_applied: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    /// File overwritten with `passes` passes and removed
    pub fn wiped(path: impl Into<PathBuf>, passes: u32) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Wiped,
            passes_applied: passes,
            error_kind: None,
            error: None,
        }
    }

    /// File left behind after `passes` completed passes
    pub fn failed(path: impl Into<PathBuf>, passes: u32, error: &FileError) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Failed,
            passes_applied: passes,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    pub fn is_wiped(&self) -> bool {
        self.status == OutcomeStatus::Wiped
    }
}

/// How the run as a whole ended, independent of per-file outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum RunStatus {
    /// Traversal finished, every worker drained the queue and every root was removed
    Completed,
    /// Stopped by a shutdown request; roots were left in place
    Interrupted,
    /// Run-level error (bad root, worker failure, root removal failure)
    Failed(String),
}

impl RunStatus {
    /// Derive the status from what the coordinator returned
    pub fn from_run(outcome: &Result<WipeResult>) -> Self {
        match outcome {
            Ok(result) if result.completed => RunStatus::Completed,
            Ok(_) => RunStatus::Interrupted,
            Err(e) => RunStatus::Failed(e.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Interrupted => f.write_str("interrupted"),
            RunStatus::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

/// Settings echoed into the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    pub method: WipeMethod,
    /// Pass count as requested by the operator
    pub requested_passes: u32,
    /// Pass count each file actually receives
    pub effective_passes: u32,
    pub force: bool,
    pub stealth: bool,
    pub workers: usize,
}

impl RunSettings {
    pub fn from_config(config: &WipeConfig) -> Self {
        Self {
            method: config.method,
            requested_passes: config.passes,
            effective_passes: config.effective_passes(),
            force: config.force,
            stealth: config.silent,
            workers: config.worker_count,
        }
    }
}

#[derive(Debug, Default)]
struct OutcomeLog {
    outcomes: Vec<FileOutcome>,
    success_count: u64,
    error_count: u64,
}

/// Live report shared by all workers during a run
#[derive(Debug)]
pub struct EraseReport {
    run_id: Uuid,
    target: String,
    settings: RunSettings,
    start_time: DateTime<Utc>,
    hardware: HardwareSnapshot,
    log: Mutex<OutcomeLog>,
}

impl EraseReport {
    /// Start a report, capturing the host's hardware snapshot now
    pub fn new(target: impl Into<String>, settings: RunSettings) -> Self {
        Self::with_hardware(target, settings, HardwareSnapshot::capture())
    }

    /// Start a report with a caller-supplied hardware snapshot
    pub fn with_hardware(
        target: impl Into<String>,
        settings: RunSettings,
        hardware: HardwareSnapshot,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target: target.into(),
            settings,
            start_time: Utc::now(),
            hardware,
            log: Mutex::new(OutcomeLog::default()),
        }
    }

    /// Start a report describing every root in `config`
    pub fn for_config(config: &WipeConfig) -> Self {
        Self::new(config.target_description(), RunSettings::from_config(config))
    }

    /// Append one outcome and bump its tally as a single step
    pub fn add_outcome(&self, outcome: FileOutcome) {
        let mut log = self.log.lock();
        match outcome.status {
            OutcomeStatus::Wiped => log.success_count += 1,
            OutcomeStatus::Failed => log.error_count += 1,
        }
        log.outcomes.push(outcome);
    }

    /// Current (success, error) tallies
    pub fn counts(&self) -> (u64, u64) {
        let log = self.log.lock();
        (log.success_count, log.error_count)
    }

    /// Number of outcomes logged so far
    pub fn len(&self) -> usize {
        self.log.lock().outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Seal the report with the run's final status and stamp the end time
    pub fn complete(self, status: RunStatus) -> CompletedReport {
        let log = self.log.into_inner();
        CompletedReport {
            run_id: self.run_id,
            target: self.target,
            start_time: self.start_time,
            end_time: Utc::now(),
            status,
            settings: self.settings,
            hardware: self.hardware,
            success_count: log.success_count,
            error_count: log.error_count,
            outcomes: log.outcomes,
        }
    }
}

/// Sealed report, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct CompletedReport {
    pub run_id: Uuid,
    pub target: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RunStatus,
    pub settings: RunSettings,
    pub hardware: HardwareSnapshot,
    pub success_count: u64,
    pub error_count: u64,
    /// In completion order, not traversal order
    pub outcomes: Vec<FileOutcome>,
}

impl CompletedReport {
    /// True when the run completed and no file failed
    pub fn passed(&self) -> bool {
        self.status.is_completed() && self.error_count == 0
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }

    /// Outcome for a given path, if it was visited
    pub fn outcome_for(&self, path: &Path) -> Option<&FileOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_wiped())
    }
}

fn serialize_path<S: Serializer>(path: &Path, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use std::thread;

    pub(crate) fn test_settings() -> RunSettings {
        RunSettings {
            method: WipeMethod::Deep,
            requested_passes: 2,
            effective_passes: 2,
            force: false,
            stealth: true,
            workers: 4,
        }
    }

    fn test_report() -> EraseReport {
        EraseReport::with_hardware("/tmp/target", test_settings(), HardwareSnapshot::default())
    }

    #[test]
    fn test_add_outcome_tallies() {
        let report = test_report();
        report.add_outcome(FileOutcome::wiped("/tmp/target/a", 2));
        let err = FileError::Access {
            path: "/tmp/target/b".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        report.add_outcome(FileOutcome::failed("/tmp/target/b", 0, &err));

        assert_eq!(report.counts(), (1, 1));
        assert_eq!(report.len(), 2);

        let done = report.complete(RunStatus::Completed);
        assert!(!done.passed());
        assert_eq!(done.success_count + done.error_count, done.outcomes.len() as u64);
        assert!(done.end_time >= done.start_time);

        let failed = done.outcome_for(Path::new("/tmp/target/b")).unwrap();
        assert_eq!(failed.error_kind, Some("access"));
        assert_eq!(done.failures().count(), 1);
    }

    #[test]
    fn test_concurrent_appends_keep_invariant() {
        let report = Arc::new(test_report());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let report = Arc::clone(&report);
                thread::spawn(move || {
                    for i in 0..250 {
                        let path = format!("/tmp/target/{t}/{i}");
                        if i % 5 == 0 {
                            report.add_outcome(FileOutcome::failed(
                                path,
                                1,
                                &FileError::Interrupted,
                            ));
                        } else {
                            report.add_outcome(FileOutcome::wiped(path, 2));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = Arc::try_unwrap(report).unwrap();
        let done = report.complete(RunStatus::Completed);
        assert_eq!(done.outcomes.len(), 2000);
        assert_eq!(done.success_count, 1600);
        assert_eq!(done.error_count, 400);
    }

    #[test]
    fn test_empty_report_passes() {
        let done = test_report().complete(RunStatus::Completed);
        assert!(done.passed());
        assert!(done.outcomes.is_empty());
    }

    #[test]
    fn test_run_level_failure_never_passes() {
        let done = test_report().complete(RunStatus::Failed("root gone".into()));
        assert_eq!(done.error_count, 0);
        assert!(!done.passed());

        let done = test_report().complete(RunStatus::Interrupted);
        assert!(!done.passed());
    }

    #[test]
    fn test_run_status_from_run() {
        let ok = WipeResult {
            completed: true,
            ..WipeResult::default()
        };
        assert_eq!(RunStatus::from_run(&Ok(ok)), RunStatus::Completed);
        assert_eq!(
            RunStatus::from_run(&Ok(WipeResult::default())),
            RunStatus::Interrupted
        );

        let err = crate::error::WipeError::Config(crate::error::ConfigError::NoRoots);
        let status = RunStatus::from_run(&Err(err));
        assert!(matches!(status, RunStatus::Failed(ref msg) if msg.contains("No target directories")));
    }

    #[test]
    fn test_run_status_serializes_tagged() {
        let json = serde_json::to_value(RunStatus::Failed("boom".into())).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"], "boom");
        let json = serde_json::to_value(RunStatus::Completed).unwrap();
        assert_eq!(json["state"], "completed");
    }

    #[test]
    fn test_outcome_serializes_status_uppercase() {
        let json = serde_json::to_value(FileOutcome::wiped("/x", 3)).unwrap();
        assert_eq!(json["status"], "WIPED");
        assert_eq!(json["passes_applied"], 3);
        assert_eq!(json["path"], "/x");
        assert!(json.get("error").is_none());
    }
}
