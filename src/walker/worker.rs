//! Worker thread logic for parallel file wiping
//!
//! Each worker:
//! - Pulls file paths from the shared path queue
//! - Re-checks the path, since files can vanish between traversal and pickup
//! - Optionally escalates permissions (`--force`)
//! - Overwrites the file, then removes it
//! - Records exactly one outcome per path in the erase report

use crate::config::WipeConfig;
use crate::error::{FileError, WorkerError};
use crate::escalate::PermissionEscalator;
use crate::report::{EraseReport, FileOutcome};
use crate::walker::queue::{PathQueueReceiver, WipeTask};
use crate::wipe::{FileWiper, PassPlan};
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use tracing::{debug, info, trace, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files overwritten and removed
    pub files_wiped: AtomicU64,

    /// Files recorded as failed
    pub files_failed: AtomicU64,

    /// Bytes written over all passes
    pub bytes_overwritten: AtomicU64,
}

impl WorkerStats {
    fn record_wiped(&self, bytes: u64) {
        self.files_wiped.fetch_add(1, Ordering::Relaxed);
        self.bytes_overwritten.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_failed(&self, bytes: u64) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        self.bytes_overwritten.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Everything a worker borrows from the coordinator for the length of a run
#[derive(Clone, Copy)]
pub struct WorkerContext<'a> {
    pub config: &'a WipeConfig,
    pub plan: &'a PassPlan,
    pub wiper: &'a FileWiper,
    pub escalator: &'a dyn PermissionEscalator,
    pub report: &'a EraseReport,
    pub shutdown: &'a AtomicBool,
}

/// A worker thread that processes wipe tasks
pub struct Worker<'scope> {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<ScopedJoinHandle<'scope, ()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl<'scope> Worker<'scope> {
    /// Spawn a new worker thread inside `scope`
    pub fn spawn<'env>(
        scope: &'scope Scope<'scope, 'env>,
        id: usize,
        ctx: WorkerContext<'env>,
        queue: PathQueueReceiver,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("wiper-{}", id))
            .spawn_scoped(scope, move || worker_loop(id, ctx, queue, &stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|panic| WorkerError::Panicked {
                id: self.id,
                message: panic_message(panic.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Worker thread panicked".into())
}

/// Main worker loop: drain the queue until it is closed and empty
fn worker_loop(id: usize, ctx: WorkerContext<'_>, queue: PathQueueReceiver, stats: &WorkerStats) {
    debug!(worker = id, "Worker starting");

    while let Some(task) = queue.recv() {
        // Once shutdown is requested the rest of the queue is drained unwiped
        let outcome = if ctx.shutdown.load(Ordering::Relaxed) {
            stats.record_failed(0);
            FileOutcome::failed(&task.path, 0, &FileError::Interrupted)
        } else {
            process_file(id, &task, ctx, stats)
        };

        if outcome.is_wiped() {
            trace!(worker = id, path = %task.path.display(), "File wiped");
        } else {
            warn!(
                worker = id,
                path = %task.path.display(),
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "File not wiped"
            );
        }

        ctx.report.add_outcome(outcome);
    }

    info!(
        worker = id,
        wiped = stats.files_wiped.load(Ordering::Relaxed),
        failed = stats.files_failed.load(Ordering::Relaxed),
        "Worker finished"
    );
}

/// Wipe and remove one file, producing its outcome
fn process_file(
    worker_id: usize,
    task: &WipeTask,
    ctx: WorkerContext<'_>,
    stats: &WorkerStats,
) -> FileOutcome {
    let path = task.path.as_path();

    // Re-check: the file may have disappeared or changed type since traversal
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            stats.record_failed(0);
            return FileOutcome::failed(
                path,
                0,
                &FileError::NotRegularFile {
                    path: path.to_path_buf(),
                },
            );
        }
        Err(source) => {
            stats.record_failed(0);
            return FileOutcome::failed(
                path,
                0,
                &FileError::Access {
                    path: path.to_path_buf(),
                    source,
                },
            );
        }
    }

    if ctx.config.force {
        if let Err(e) = ctx.escalator.escalate(path) {
            warn!(worker = worker_id, path = %path.display(), error = %e, "Permission escalation failed");
        }
    }

    debug!(worker = worker_id, path = %path.display(), "Overwriting file");

    match ctx.wiper.wipe(path, ctx.plan) {
        Ok(wiped) => match fs::remove_file(path) {
            Ok(()) => {
                stats.record_wiped(wiped.bytes_written);
                FileOutcome::wiped(path, wiped.passes_completed)
            }
            Err(source) => {
                stats.record_failed(wiped.bytes_written);
                FileOutcome::failed(path, wiped.passes_completed, &FileError::Removal { source })
            }
        },
        Err(failure) => {
            stats.record_failed(0);
            FileOutcome::failed(path, failure.passes_completed, &failure.error)
        }
    }
}

/// Aggregate statistics from multiple workers: (wiped, failed, bytes)
pub fn aggregate_stats<'a, I>(stats: I) -> (u64, u64, u64)
where
    I: IntoIterator<Item = &'a Arc<WorkerStats>>,
{
    stats.into_iter().fold((0, 0, 0), |(wiped, failed, bytes), s| {
        (
            wiped + s.files_wiped.load(Ordering::Relaxed),
            failed + s.files_failed.load(Ordering::Relaxed),
            bytes + s.bytes_overwritten.load(Ordering::Relaxed),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalate::NoEscalation;
    use crate::report::{CompletedReport, HardwareSnapshot, OutcomeStatus, RunSettings, RunStatus};
    use crate::walker::queue::PathQueue;
    use crate::wipe::{RandomSource, WipeMethod};
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    struct FixedRandom;

    impl RandomSource for FixedRandom {
        fn fill(&self, buf: &mut [u8]) -> Result<(), String> {
            buf.fill(0x5A);
            Ok(())
        }
    }

    /// Owns everything a `WorkerContext` borrows
    struct Harness {
        config: WipeConfig,
        plan: PassPlan,
        wiper: FileWiper,
        report: EraseReport,
        shutdown: AtomicBool,
    }

    impl Harness {
        fn new(root: &Path, method: WipeMethod, passes: u32, shutdown: bool) -> Self {
            let config = WipeConfig::new(vec![root.to_path_buf()], method);
            let report = EraseReport::with_hardware(
                config.target_description(),
                RunSettings::from_config(&config),
                HardwareSnapshot::default(),
            );
            Self {
                plan: method.plan(passes),
                config,
                wiper: FileWiper::new(Arc::new(FixedRandom)),
                report,
                shutdown: AtomicBool::new(shutdown),
            }
        }

        fn ctx(&self) -> WorkerContext<'_> {
            WorkerContext {
                config: &self.config,
                plan: &self.plan,
                wiper: &self.wiper,
                escalator: &NoEscalation,
                report: &self.report,
                shutdown: &self.shutdown,
            }
        }

        fn finish(self) -> CompletedReport {
            self.report.complete(RunStatus::Completed)
        }
    }

    fn write_files(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("f{i}"));
                fs::write(&path, vec![i as u8; 100]).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_vanished_file_is_access_failure() {
        let dir = tempdir().unwrap();
        let harness = Harness::new(dir.path(), WipeMethod::Deep, 2, false);
        let stats = WorkerStats::default();

        let task = WipeTask::new(dir.path().join("gone.txt"));
        let outcome = process_file(0, &task, harness.ctx(), &stats);

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some("access"));
        assert_eq!(outcome.passes_applied, 0);
        assert_eq!(stats.files_failed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_overwritten.load(Ordering::Relaxed), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unremovable_file_keeps_completed_passes() {
        use std::os::unix::fs::PermissionsExt;

        if unsafe { libc::geteuid() } == 0 {
            eprintln!("skipping: running as root");
            return;
        }

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file = locked.join("secret.txt");
        fs::write(&file, vec![0x11u8; 100]).unwrap();
        // Contents stay writable, the directory entry cannot be removed
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        let harness = Harness::new(dir.path(), WipeMethod::Deep, 2, false);
        let stats = WorkerStats::default();
        let outcome = process_file(0, &WipeTask::new(file.clone()), harness.ctx(), &stats);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error_kind, Some("removal"));
        assert_eq!(outcome.passes_applied, 2);
        assert_eq!(stats.files_failed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_overwritten.load(Ordering::Relaxed), 200);

        let contents = fs::read(&file).unwrap();
        assert_eq!(contents.len(), 100);
        assert!(contents.iter().all(|&b| b != 0x11));
    }

    #[test]
    fn test_shutdown_drains_queue_as_interrupted() {
        let dir = tempdir().unwrap();
        let files = write_files(dir.path(), 3);
        let harness = Harness::new(dir.path(), WipeMethod::Quick, 1, true);
        let stats = WorkerStats::default();

        let (tx, rx) = PathQueue::new(4).split();
        for path in &files {
            tx.send(WipeTask::new(path.clone())).unwrap();
        }
        drop(tx);
        worker_loop(0, harness.ctx(), rx, &stats);

        let report = harness.finish();
        assert_eq!(report.outcomes.len(), 3);
        for outcome in &report.outcomes {
            assert_eq!(outcome.status, OutcomeStatus::Failed);
            assert_eq!(outcome.error_kind, Some("interrupted"));
            assert_eq!(outcome.passes_applied, 0);
        }
        assert_eq!(stats.files_failed.load(Ordering::Relaxed), 3);
        assert!(files.iter().all(|f| f.exists()));
    }

    #[test]
    fn test_worker_loop_wipes_and_removes() {
        let dir = tempdir().unwrap();
        let files = write_files(dir.path(), 3);
        let harness = Harness::new(dir.path(), WipeMethod::Deep, 2, false);
        let stats = WorkerStats::default();

        let (tx, rx) = PathQueue::new(4).split();
        for path in &files {
            tx.send(WipeTask::new(path.clone())).unwrap();
        }
        drop(tx);
        worker_loop(0, harness.ctx(), rx, &stats);

        let report = harness.finish();
        assert_eq!((report.success_count, report.error_count), (3, 0));
        assert!(report.outcomes.iter().all(|o| o.passes_applied == 2));
        assert_eq!(stats.bytes_overwritten.load(Ordering::Relaxed), 600);
        assert!(files.iter().all(|f| !f.exists()));
    }

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();

        stats.record_wiped(1024);
        stats.record_wiped(10);
        stats.record_failed(0);

        assert_eq!(stats.files_wiped.load(Ordering::Relaxed), 2);
        assert_eq!(stats.files_failed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_overwritten.load(Ordering::Relaxed), 1034);
    }

    #[test]
    fn test_aggregate_stats() {
        let a = Arc::new(WorkerStats::default());
        let b = Arc::new(WorkerStats::default());
        a.record_wiped(100);
        b.record_wiped(50);
        b.record_failed(7);

        assert_eq!(aggregate_stats([&a, &b]), (2, 1, 157));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
