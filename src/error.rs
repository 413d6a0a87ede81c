//! Error types for dirshred
//!
//! This module defines the error hierarchy for a wipe run:
//! - Configuration errors (bad roots, bad worker counts) abort the run
//!   before any file is touched
//! - Per-file errors never leave the worker that hit them; they are turned
//!   into report entries
//! - Root removal failures surface as a run-level error because a lingering
//!   root is observable residue
//! - Report writing errors are kept apart from the wipe outcome itself
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path involved
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a wipe run
#[derive(Error, Debug)]
pub enum WipeError {
    /// Configuration errors (fatal, nothing has been wiped yet)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Report rendering or writing errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// The root directory could not be removed after the workers finished
    #[error("Failed to remove root directory '{path}': {source}")]
    RootRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors outside of any single file wipe
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors, raised before any wiping starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Nothing to wipe
    #[error("No target directories given (pass ROOTS, --user-folders or --volumes)")]
    NoRoots,

    /// Root path missing or unreadable
    #[error("Invalid root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Root path exists but is not a directory
    #[error("Root '{path}' is not a directory")]
    RootNotDirectory { path: PathBuf },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Report output path error
    #[error("Invalid report path '{path}': {reason}")]
    InvalidReportPath { path: PathBuf, reason: String },

    /// Report would be written somewhere the run is about to destroy
    #[error("Report path '{report}' lies inside target root '{root}'")]
    ReportInsideRoot { report: PathBuf, root: PathBuf },
}

/// Per-file failure, recorded in the report as a FAILED outcome
#[derive(Error, Debug)]
pub enum FileError {
    /// Directory entry could not be read during traversal
    #[error("cannot read entry '{path}': {reason}")]
    Traversal { path: PathBuf, reason: String },

    /// File could not be opened or stat'ed
    #[error("cannot access '{path}': {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path is no longer a regular file
    #[error("'{path}' is not a regular file")]
    NotRegularFile { path: PathBuf },

    /// The random source failed to produce a full chunk
    #[error("failed to read random data: {0}")]
    Random(String),

    /// Fewer bytes written than requested
    #[error("short write at offset {offset}: wrote {written} of {requested} bytes")]
    ShortWrite {
        offset: u64,
        written: usize,
        requested: usize,
    },

    /// Write or seek failed during a pass
    #[error("write failed on pass {pass}: {source}")]
    Io {
        pass: u32,
        #[source]
        source: std::io::Error,
    },

    /// Flush to stable storage failed; on-disk state is undefined
    #[error("failed to sync to stable storage on pass {pass}: {source}")]
    Flush {
        pass: u32,
        #[source]
        source: std::io::Error,
    },

    /// Delete failed after a successful overwrite
    #[error("overwritten but not removed: {source}")]
    Removal {
        #[source]
        source: std::io::Error,
    },

    /// Run was interrupted before this file was processed
    #[error("run interrupted before file was processed")]
    Interrupted,
}

impl FileError {
    /// Short stable label for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::Traversal { .. } => "traversal",
            FileError::Access { .. } | FileError::NotRegularFile { .. } => "access",
            FileError::Random(_)
            | FileError::ShortWrite { .. }
            | FileError::Io { .. }
            | FileError::Flush { .. } => "io",
            FileError::Removal { .. } => "removal",
            FileError::Interrupted => "interrupted",
        }
    }

    /// Check whether the failure came from missing permissions
    pub fn is_permission_denied(&self) -> bool {
        match self {
            FileError::Access { source, .. } | FileError::Removal { source } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be started
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },
}

/// Report output errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Failed to create or write the report file
    #[error("Failed to write report '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Permission escalation failure (never fatal)
#[derive(Error, Debug)]
pub enum EscalationError {
    /// Metadata or permission change failed
    #[error("permission change failed on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External helper command failed
    #[error("{command} failed on '{path}': {output}")]
    Command {
        command: &'static str,
        path: PathBuf,
        output: String,
    },
}

/// Result type alias for WipeError
pub type Result<T> = std::result::Result<T, WipeError>;

/// Result type alias for ReportError
pub type ReportResult<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_file_error_kind() {
        let denied = FileError::Access {
            path: "/test".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(denied.kind(), "access");
        assert!(denied.is_permission_denied());

        let short = FileError::ShortWrite {
            offset: 4096,
            written: 10,
            requested: 4096,
        };
        assert_eq!(short.kind(), "io");
        assert!(!short.is_permission_denied());
    }

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::RootNotDirectory {
            path: "/etc/hosts".into(),
        };
        let wipe_err: WipeError = config_err.into();
        assert!(matches!(wipe_err, WipeError::Config(_)));
        assert!(wipe_err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_short_write_message() {
        let err = FileError::ShortWrite {
            offset: 0,
            written: 3,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "short write at offset 0: wrote 3 of 10 bytes"
        );
    }
}
