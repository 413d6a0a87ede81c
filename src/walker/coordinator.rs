//! Wipe coordinator - orchestrates the parallel wipe run
//!
//! The coordinator is responsible for:
//! - Re-validating the root directories (fatal before anything is touched)
//! - Setting up the path queue and the worker pool
//! - Traversing the roots and feeding the queue
//! - Waiting for every worker (the barrier before root removal)
//! - Removing the roots and reporting final statistics
//!
//! Root removal is best-effort and unconditional on per-file failures:
//! a removed root does not mean every file was wiped. Check the report's
//! error count for that.

use crate::config::WipeConfig;
use crate::error::{ConfigError, FileError, Result, WipeError, WorkerError};
use crate::escalate::{OwnerEscalator, PermissionEscalator};
use crate::report::{EraseReport, FileOutcome};
use crate::walker::queue::{PathQueue, PathQueueSender, QueueClosed, WipeTask};
use crate::walker::worker::{aggregate_stats, Worker, WorkerContext};
use crate::wipe::{FileWiper, OsRandom, PassPlan, RandomSource};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Interval between progress callbacks
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a finished wipe run
#[derive(Debug, Clone, Default)]
pub struct WipeResult {
    /// Regular files found and queued for wiping
    pub files_seen: u64,

    /// Files overwritten and removed
    pub wiped: u64,

    /// Files that ended FAILED (including interrupted ones)
    pub failed: u64,

    /// Entries that could not be read during traversal
    pub traversal_errors: u64,

    /// Symlinks and special files left for the root removal
    pub skipped: u64,

    /// Bytes written over all passes of all files
    pub bytes_overwritten: u64,

    /// Time taken for the run
    pub duration: Duration,

    /// Whether the run completed (vs was interrupted)
    pub completed: bool,

    /// Number of roots removed after the barrier
    pub roots_removed: usize,
}

#[derive(Debug, Default)]
struct TraversalCounts {
    errors: u64,
    skipped: u64,
}

/// Coordinates one wipe run over every configured root
pub struct WipeCoordinator {
    /// Configuration
    config: WipeConfig,

    /// Passes applied to every file
    plan: PassPlan,

    /// Overwrite engine shared by all workers
    wiper: FileWiper,

    /// Used when `force` is set
    escalator: Box<dyn PermissionEscalator>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl WipeCoordinator {
    /// Create a new coordinator
    pub fn new(config: WipeConfig) -> Result<Self> {
        config.validate()?;

        let plan = config.method.plan(config.passes);
        debug!(method = %config.method, passes = plan.len(), "Pass plan built");

        Ok(Self {
            config,
            plan,
            wiper: FileWiper::new(Arc::new(OsRandom)),
            escalator: Box::new(OwnerEscalator),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the random source used for random passes
    pub fn with_random_source(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.wiper = FileWiper::new(rng);
        self
    }

    /// Replace the permission escalator used with `force`
    pub fn with_escalator(mut self, escalator: Box<dyn PermissionEscalator>) -> Self {
        self.escalator = escalator;
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn config(&self) -> &WipeConfig {
        &self.config
    }

    pub fn plan(&self) -> &PassPlan {
        &self.plan
    }

    /// Run the wipe, recording every file outcome in `report`
    pub fn run(&self, report: &EraseReport) -> Result<WipeResult> {
        self.execute(report, None)
    }

    /// Run the wipe, calling `progress_callback` periodically from a
    /// separate thread until all workers have finished
    pub fn run_with_progress<F>(&self, report: &EraseReport, progress_callback: F) -> Result<WipeResult>
    where
        F: Fn(WipeProgress) + Sync,
    {
        self.execute(report, Some(&progress_callback))
    }

    fn execute(
        &self,
        report: &EraseReport,
        progress: Option<&(dyn Fn(WipeProgress) + Sync)>,
    ) -> Result<WipeResult> {
        let roots = self.validate_roots()?;
        let start = Instant::now();

        info!(
            roots = %self.config.target_description(),
            method = %self.config.method,
            passes = self.plan.len(),
            workers = self.config.worker_count,
            "Starting wipe"
        );

        let ctx = WorkerContext {
            config: &self.config,
            plan: &self.plan,
            wiper: &self.wiper,
            escalator: self.escalator.as_ref(),
            report,
            shutdown: &self.shutdown,
        };
        let files_seen = AtomicU64::new(0);
        let done = AtomicBool::new(false);

        let (traversal, (wiped, failed, bytes), worker_error) =
            thread::scope(|scope| -> Result<_> {
                // The sender lives in this closure, so any early return closes
                // the queue and lets already spawned workers drain and exit
                let queue = PathQueue::new(self.config.queue_size);
                let queue_stats = queue.stats();
                let (tx, rx) = queue.split();

                let mut workers = Vec::with_capacity(self.config.worker_count);
                for id in 0..self.config.worker_count {
                    workers.push(Worker::spawn(scope, id, ctx, rx.clone())?);
                }
                info!(count = workers.len(), "Workers spawned");

                // Only workers hold a receiver, so the queue disconnects
                // and traversal stops if every one of them dies
                drop(rx);

                let stats: Vec<_> = workers.iter().map(Worker::stats).collect();

                if let Some(callback) = progress {
                    let stats = stats.clone();
                    let (done, files_seen) = (&done, &files_seen);
                    let total_workers = workers.len();
                    thread::Builder::new()
                        .name("wipe-progress".into())
                        .spawn_scoped(scope, move || {
                            loop {
                                // One last update after the barrier carries the final counts
                                let finished = done.load(Ordering::Acquire);
                                let (wiped, failed, bytes) = aggregate_stats(&stats);
                                callback(WipeProgress {
                                    files_seen: files_seen.load(Ordering::Relaxed),
                                    wiped,
                                    failed,
                                    bytes_overwritten: bytes,
                                    queue_size: queue_stats.depth() as usize,
                                    total_workers,
                                    elapsed: start.elapsed(),
                                });
                                if finished {
                                    break;
                                }
                                thread::sleep(PROGRESS_INTERVAL);
                            }
                        })
                        .map_err(WipeError::Io)?;
                }

                let traversal = self.traverse(&roots, &tx, report, &files_seen);

                // Close the queue; workers exit once it is drained
                drop(tx);

                let mut worker_error: Option<WorkerError> = None;
                for worker in workers {
                    let id = worker.id();
                    if let Err(e) = worker.join() {
                        error!(worker = id, error = %e, "Worker failed to join cleanly");
                        worker_error.get_or_insert(e);
                    }
                }
                done.store(true, Ordering::Release);

                Ok((traversal, aggregate_stats(&stats), worker_error))
            })?;

        // Barrier passed: no worker touches the filesystem from here on
        if let Some(e) = worker_error {
            warn!("Worker failure, leaving roots in place");
            return Err(e.into());
        }

        let completed = !self.shutdown.load(Ordering::SeqCst);
        let roots_removed = if completed {
            self.remove_roots(&roots)?
        } else {
            warn!("Run interrupted, leaving roots in place");
            0
        };

        let result = WipeResult {
            files_seen: files_seen.load(Ordering::Relaxed),
            wiped,
            failed,
            traversal_errors: traversal.errors,
            skipped: traversal.skipped,
            bytes_overwritten: bytes,
            duration: start.elapsed(),
            completed,
            roots_removed,
        };

        info!(
            files = result.files_seen,
            wiped = result.wiped,
            failed = result.failed,
            traversal_errors = result.traversal_errors,
            bytes = result.bytes_overwritten,
            duration_secs = result.duration.as_secs(),
            "Wipe finished"
        );

        Ok(result)
    }

    /// Stat every root again and drop roots nested inside another root
    fn validate_roots(&self) -> Result<Vec<PathBuf>> {
        let mut resolved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.config.roots.len());

        for root in &self.config.roots {
            let metadata = fs::symlink_metadata(root).map_err(|e| ConfigError::InvalidRoot {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            if metadata.file_type().is_symlink() {
                return Err(ConfigError::InvalidRoot {
                    path: root.clone(),
                    reason: "is a symbolic link, pass the directory it points to".into(),
                }
                .into());
            }
            if !metadata.is_dir() {
                return Err(ConfigError::RootNotDirectory { path: root.clone() }.into());
            }
            let canonical = root.canonicalize().map_err(|e| ConfigError::InvalidRoot {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            resolved.push((root.clone(), canonical));
        }

        let roots = resolved
            .iter()
            .enumerate()
            .filter(|(i, (root, canonical))| {
                let covered = resolved.iter().enumerate().any(|(j, (_, other))| {
                    j != *i
                        && canonical.starts_with(other)
                        && (canonical != other || j < *i)
                });
                if covered {
                    warn!(root = %root.display(), "Root lies inside another root, covered by its traversal");
                }
                !covered
            })
            .map(|(_, (root, _))| root.clone())
            .collect();

        Ok(roots)
    }

    /// Walk every root in order, queueing regular files
    fn traverse(
        &self,
        roots: &[PathBuf],
        tx: &PathQueueSender,
        report: &EraseReport,
        files_seen: &AtomicU64,
    ) -> TraversalCounts {
        let mut counts = TraversalCounts::default();

        'roots: for root in roots {
            debug!(root = %root.display(), "Traversing root");

            for entry in WalkDir::new(root).follow_links(false) {
                if self.shutdown.load(Ordering::Relaxed) {
                    info!("Shutdown requested, stopping traversal");
                    break 'roots;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                        warn!(path = %path.display(), error = %err, "Cannot read entry");
                        counts.errors += 1;
                        let reason = err
                            .io_error()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| err.to_string());
                        report.add_outcome(FileOutcome::failed(
                            path.clone(),
                            0,
                            &FileError::Traversal { path, reason },
                        ));
                        continue;
                    }
                };

                let file_type = entry.file_type();
                if file_type.is_file() {
                    files_seen.fetch_add(1, Ordering::Relaxed);
                    if let Err(QueueClosed(task)) = tx.send(WipeTask::new(entry.into_path())) {
                        error!(path = %task.path.display(), "No workers left, stopping traversal");
                        report.add_outcome(FileOutcome::failed(task.path, 0, &FileError::Interrupted));
                        break 'roots;
                    }
                } else if !file_type.is_dir() {
                    counts.skipped += 1;
                    debug!(path = %entry.path().display(), "Skipping non-regular entry");
                }
            }
        }

        counts
    }

    /// Remove every root, attempting all of them before reporting a failure
    fn remove_roots(&self, roots: &[PathBuf]) -> Result<usize> {
        let mut removed = 0;
        let mut first_failure: Option<WipeError> = None;

        for root in roots {
            match fs::remove_dir_all(root) {
                Ok(()) => {
                    removed += 1;
                    info!(root = %root.display(), "Root removed");
                }
                Err(source) => {
                    error!(root = %root.display(), error = %source, "Failed to remove root");
                    first_failure.get_or_insert(WipeError::RootRemoval {
                        path: root.clone(),
                        source,
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct WipeProgress {
    /// Files found so far
    pub files_seen: u64,

    /// Files wiped and removed
    pub wiped: u64,

    /// Files failed
    pub failed: u64,

    /// Bytes written so far
    pub bytes_overwritten: u64,

    /// Current queue size
    pub queue_size: usize,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl WipeProgress {
    /// Files finished (either way)
    pub fn processed(&self) -> u64 {
        self.wiped + self.failed
    }

    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Calculate overwrite throughput in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_overwritten as f64 / secs
        } else {
            0.0
        }
    }
}
