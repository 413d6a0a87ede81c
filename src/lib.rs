//! dirshred - Concurrent Secure-Overwrite Directory Wiper
//!
//! Destroys the contents of every file beneath one or more directories by
//! overwriting them with configurable pass patterns, syncing each pass to
//! stable storage, unlinking the files and finally removing the
//! directories. Every file ends up in an auditable erase report.
//!
//! # Features
//!
//! - **Pass Strategies**: quick (one zero pass), deep (alternating random
//!   and `0xFF` passes), secure (the 35-pass Gutmann sequence) and
//!   multilayered (deep followed by secure).
//!
//! - **Parallel Wiping**: A fixed pool of worker threads drains a bounded
//!   path queue fed by a single traversal, so memory stays flat on trees
//!   with millions of files.
//!
//! - **Per-File Accounting**: Failures never abort the run. Each file gets
//!   exactly one WIPED or FAILED outcome, appended under a single lock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Target root directories                      │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ walkdir (no link following)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            ┌──────────────────────────┐                         │
//! │            │       Path Queue         │                         │
//! │            │  (crossbeam bounded)     │                         │
//! │            │  - Backpressure support  │                         │
//! │            └────────────┬─────────────┘                         │
//! │                         │                                       │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐     │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │     │
//! │  │FileWiper│  │FileWiper│  │FileWiper│         │FileWiper│     │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘     │
//! │       └────────────┼────────────┼────────────────────┘          │
//! │                    ▼            ▼                               │
//! │            ┌──────────────────────────┐                         │
//! │            │       Erase Report       │                         │
//! │            │  - append + tally        │                         │
//! │            │  - hardware snapshot     │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │ barrier: all workers joined
//!                               ▼
//!                    ┌──────────────────┐
//!                    │ remove_dir_all   │
//!                    │ + report file    │
//!                    └──────────────────┘
//! ```
//!
//! # Caveats
//!
//! Overwriting logical blocks does not guarantee that the physical cells
//! are overwritten on SSDs and other wear-leveled flash, nor that older
//! copies are gone on copy-on-write or journaling filesystems and
//! snapshots. Nothing is read back to verify the overwrite.
//!
//! # Example
//!
//! ```bash
//! # Deep wipe with the default three passes
//! dirshred /mnt/scratch/old-project
//!
//! # Gutmann wipe with 16 workers and a JSON report
//! dirshred -m secure -w 16 --report-format json -r erase.json /data/export
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod escalate;
pub mod progress;
pub mod report;
pub mod walker;
pub mod wipe;

pub use config::{CliArgs, WipeConfig};
pub use error::{Result, WipeError};
pub use report::{CompletedReport, EraseReport, FileOutcome, OutcomeStatus, RunStatus};
pub use walker::{WipeCoordinator, WipeResult};
pub use wipe::{FileWiper, PassPlan, WipeMethod};
