//! Configuration types for dirshred
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//!
//! Root directories themselves are checked by the coordinator right before
//! the run starts, so a config can be built ahead of time.

use crate::discovery;
use crate::error::ConfigError;
use crate::report::ReportFormat;
use crate::wipe::{WipeMethod, SECURE_PASSES};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Securely overwrite and remove every file under one or more directories
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirshred",
    version,
    about = "Securely overwrite and remove every file under one or more directories",
    long_about = "Overwrites each regular file beneath the target directories with the chosen \
                  pass pattern, syncs it to disk, deletes it, and finally removes the target \
                  directories themselves. An erase report is written when the run ends.\n\n\
                  Overwriting logical blocks does not guarantee physical erasure on SSDs, \
                  flash media, or copy-on-write and journaling filesystems.",
    after_help = "EXAMPLES:\n    \
        dirshred /mnt/scratch/old-project\n    \
        dirshred -m secure -w 16 /data/export --report erase.txt\n    \
        dirshred -m multilayered -n 3 --force --silent /srv/tmp\n    \
        dirshred --user-folders --report-format json --report /root/erase.json"
)]
pub struct CliArgs {
    /// Directories to destroy (each is removed after its files are wiped)
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// Overwrite method
    #[arg(short = 'm', long, value_enum, default_value_t = WipeMethod::Deep)]
    pub method: WipeMethod,

    /// Number of passes for deep and multilayered (0 leaves contents untouched)
    #[arg(short = 'n', long, default_value = "3", value_name = "NUM")]
    pub passes: u32,

    /// Try to take ownership and grant write access before wiping each file
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Suppress progress and warnings; only the report is produced
    #[arg(short = 's', long, visible_alias = "stealth")]
    pub silent: bool,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Path queue size (bounds memory use on huge trees)
    #[arg(long, default_value = "1024", value_name = "NUM")]
    pub queue_size: usize,

    /// Also target the current user's Desktop, Documents, Downloads, Videos, Music and Pictures
    #[arg(long)]
    pub user_folders: bool,

    /// Also target every mounted non-system volume
    #[arg(long)]
    pub volumes: bool,

    /// Report output file (default: erasure_report_<id>.<ext> in the working directory)
    #[arg(short = 'r', long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report_format: ReportFormat,

    /// Verbose output (per-file debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    // Wiping is I/O bound; oversubscribe the cores
    num_cpus::get() * 2
}

/// Validated runtime configuration for one wipe run
#[derive(Debug, Clone)]
pub struct WipeConfig {
    /// Target directories, in the order they are traversed
    pub roots: Vec<PathBuf>,

    /// Overwrite method
    pub method: WipeMethod,

    /// Requested pass count (only used by deep and multilayered)
    pub passes: u32,

    /// Escalate permissions before each file
    pub force: bool,

    /// Suppress narration
    pub silent: bool,

    /// Number of worker threads
    pub worker_count: usize,

    /// Path queue capacity
    pub queue_size: usize,

    /// Where to write the report (None: generated name in working directory)
    pub report_path: Option<PathBuf>,

    /// Report format
    pub report_format: ReportFormat,

    /// Verbose logging
    pub verbose: bool,
}

impl WipeConfig {
    /// Config with defaults for everything but roots and method
    pub fn new(roots: Vec<PathBuf>, method: WipeMethod) -> Self {
        Self {
            roots,
            method,
            passes: 3,
            force: false,
            silent: false,
            worker_count: 4,
            queue_size: 1024,
            report_path: None,
            report_format: ReportFormat::Text,
            verbose: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut roots = args.roots;

        if args.user_folders {
            roots.extend(discovery::user_data_folders());
        }
        if args.volumes {
            roots.extend(discovery::non_system_volumes());
        }
        let roots = discovery::dedup_roots(roots);

        if !args.method.uses_pass_count() && args.passes != 3 {
            debug!(
                method = %args.method,
                passes = args.passes,
                "Pass count ignored for fixed-pass method"
            );
        }

        let config = Self {
            roots,
            method: args.method,
            passes: args.passes,
            force: args.force,
            silent: args.silent,
            worker_count: args.workers,
            queue_size: args.queue_size,
            report_path: args.report,
            report_format: args.report_format,
            verbose: args.verbose,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants that do not depend on the roots existing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: MAX_WORKERS,
            });
        }

        if self.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: self.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if let Some(report) = &self.report_path {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(ConfigError::InvalidReportPath {
                        path: report.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let report = self.resolved_report_path();
        if let Some(root) = self.roots.iter().find(|root| is_within(&report, root)) {
            return Err(ConfigError::ReportInsideRoot {
                report,
                root: root.clone(),
            });
        }

        Ok(())
    }

    /// Passes each file receives under this config
    pub fn effective_passes(&self) -> u32 {
        match self.method {
            WipeMethod::Quick => 1,
            WipeMethod::Deep => self.passes,
            WipeMethod::Secure => SECURE_PASSES,
            WipeMethod::MultiLayered => self.passes + SECURE_PASSES,
        }
    }

    /// Report path, falling back to the working directory (run id filled in later)
    fn resolved_report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("erasure_report.{}", self.report_format.extension())))
    }

    /// Default report file name for a run id
    pub fn default_report_name(&self, run_id: &uuid::Uuid) -> PathBuf {
        PathBuf::from(format!(
            "erasure_report_{}.{}",
            run_id,
            self.report_format.extension()
        ))
    }

    /// Human-readable description of all roots
    pub fn target_description(&self) -> String {
        self.roots
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// True when `path` would end up inside `root` once both are absolute
fn is_within(path: &Path, root: &Path) -> bool {
    let Some(root) = absolutize(root) else {
        return false;
    };
    // The report file usually does not exist yet; resolve its directory instead
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            absolutize(parent).map(|p| p.join(name))
        }
        _ => absolutize(path),
    };
    resolved.is_some_and(|p| p.starts_with(&root))
}

fn absolutize(path: &Path) -> Option<PathBuf> {
    path.canonicalize()
        .ok()
        .or_else(|| std::path::absolute(path).ok())
}
