//! Single-file overwrite
//!
//! The wiper opens one file, overwrites its current byte range once per
//! pass in the plan and syncs each pass to stable storage. It never deletes:
//! removal is the caller's decision once the overwrite succeeded.

use crate::error::FileError;
use crate::wipe::strategy::{PassPattern, PassPlan, RandomSource, CHUNK_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Something a pass sequence can be written to
///
/// Implemented for [`File`]; tests use in-memory targets to observe the
/// exact write and sync sequence.
pub trait WipeTarget {
    /// Move the write position back to offset 0
    fn rewind(&mut self) -> io::Result<()>;

    /// Write one chunk, returning the number of bytes accepted
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Force written data to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl WipeTarget for File {
    fn rewind(&mut self) -> io::Result<()> {
        Seek::rewind(self)
    }

    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Successful overwrite of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WipeStats {
    /// Passes written and synced
    pub passes_completed: u32,

    /// Total bytes written over all passes
    pub bytes_written: u64,
}

/// Failed overwrite of one file
#[derive(Debug)]
pub struct WipeFailure {
    /// Passes fully written and synced before the failure
    pub passes_completed: u32,

    /// What went wrong
    pub error: FileError,
}

impl WipeFailure {
    fn before_first_pass(error: FileError) -> Self {
        Self {
            passes_completed: 0,
            error,
        }
    }
}

/// Applies a pass plan to files
#[derive(Clone)]
pub struct FileWiper {
    rng: Arc<dyn RandomSource>,
}

impl FileWiper {
    /// Create a wiper drawing random passes from `rng`
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }

    /// Overwrite the file at `path` with every pass in `plan`
    ///
    /// The size is taken from the open handle, not from an earlier
    /// path-based stat, so a file swapped between traversal and open is
    /// measured as it is now.
    pub fn wipe(&self, path: &Path, plan: &PassPlan) -> Result<WipeStats, WipeFailure> {
        let mut file = open_for_overwrite(path).map_err(|source| {
            WipeFailure::before_first_pass(FileError::Access {
                path: path.to_path_buf(),
                source,
            })
        })?;

        let metadata = file.metadata().map_err(|source| {
            WipeFailure::before_first_pass(FileError::Access {
                path: path.to_path_buf(),
                source,
            })
        })?;

        if !metadata.is_file() {
            return Err(WipeFailure::before_first_pass(FileError::NotRegularFile {
                path: path.to_path_buf(),
            }));
        }

        trace!(
            path = %path.display(),
            size = metadata.len(),
            passes = plan.len(),
            "Overwriting file"
        );

        self.overwrite(&mut file, metadata.len(), plan)
    }

    /// Write every pass in `plan` over `size` bytes of `target`
    ///
    /// Each pass is synced before the next one starts. The first failing
    /// step aborts the remaining passes.
    pub fn overwrite<T: WipeTarget>(
        &self,
        target: &mut T,
        size: u64,
        plan: &PassPlan,
    ) -> Result<WipeStats, WipeFailure> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut stats = WipeStats::default();

        for (index, pattern) in plan.iter().enumerate() {
            let pass = index as u32 + 1;
            self.run_pass(target, size, *pattern, pass, &mut buf)
                .map_err(|error| WipeFailure {
                    passes_completed: stats.passes_completed,
                    error,
                })?;
            stats.passes_completed += 1;
            stats.bytes_written += size;
        }

        Ok(stats)
    }

    fn run_pass<T: WipeTarget>(
        &self,
        target: &mut T,
        size: u64,
        pattern: PassPattern,
        pass: u32,
        buf: &mut [u8],
    ) -> Result<(), FileError> {
        target
            .rewind()
            .map_err(|source| FileError::Io { pass, source })?;

        let constant = pattern.is_constant();
        if constant {
            pattern
                .fill_chunk(buf, 0, self.rng.as_ref())
                .map_err(FileError::Random)?;
        }

        let mut offset = 0u64;
        while offset < size {
            let len = (size - offset).min(CHUNK_SIZE as u64) as usize;
            let chunk = &mut buf[..len];

            if !constant {
                pattern
                    .fill_chunk(chunk, offset, self.rng.as_ref())
                    .map_err(FileError::Random)?;
            }

            let written = write_chunk(target, chunk, pass)?;
            if written != len {
                return Err(FileError::ShortWrite {
                    offset,
                    written,
                    requested: len,
                });
            }
            offset += len as u64;
        }

        target
            .sync()
            .map_err(|source| FileError::Flush { pass, source })
    }
}

/// Single write call, retried only when interrupted by a signal
fn write_chunk<T: WipeTarget>(target: &mut T, chunk: &[u8], pass: u32) -> Result<usize, FileError> {
    loop {
        match target.write_chunk(chunk) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(FileError::Io { pass, source }),
        }
    }
}

/// Open write-only, without truncation and without following a final symlink
///
/// `O_NONBLOCK` keeps a FIFO swapped in after traversal from parking the
/// worker in `open` until a reader shows up. It has no effect on regular
/// files, and anything that is not one is rejected right after the open.
fn open_for_overwrite(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK);
    }

    options.open(path)
}
