//! Permission escalation
//!
//! With `--force`, each file is passed to a [`PermissionEscalator`] before
//! it is wiped. Escalation is best-effort: a failure is logged as a warning
//! and the wipe is attempted anyway, so a file that stays inaccessible shows
//! up in the report as an access failure.

use crate::error::EscalationError;
use std::fs;
use std::path::Path;

/// Grants the current process the access needed to overwrite and unlink a file
pub trait PermissionEscalator: Send + Sync {
    fn escalate(&self, path: &Path) -> Result<(), EscalationError>;
}

/// Escalator that never touches permissions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEscalation;

impl PermissionEscalator for NoEscalation {
    fn escalate(&self, _path: &Path) -> Result<(), EscalationError> {
        Ok(())
    }
}

/// Platform escalator
///
/// On Unix this adds the owner write bit to the file and owner write and
/// search bits to its directory, which is enough to overwrite and unlink a
/// file the process owns. On Windows it takes ownership with `takeown` and
/// grants Administrators full control with `icacls`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnerEscalator;

#[cfg(unix)]
impl PermissionEscalator for OwnerEscalator {
    fn escalate(&self, path: &Path) -> Result<(), EscalationError> {
        add_mode_bits(path, 0o200)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            add_mode_bits(parent, 0o300)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn add_mode_bits(path: &Path, bits: u32) -> Result<(), EscalationError> {
    use std::os::unix::fs::PermissionsExt;

    let io_err = |source| EscalationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::symlink_metadata(path).map_err(io_err)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & bits == bits {
        return Ok(());
    }
    permissions.set_mode(mode | bits);
    fs::set_permissions(path, permissions).map_err(io_err)
}

#[cfg(windows)]
impl PermissionEscalator for OwnerEscalator {
    fn escalate(&self, path: &Path) -> Result<(), EscalationError> {
        clear_readonly(path)?;
        run_helper("takeown", path, &["/F"], &[])?;
        run_helper("icacls", path, &[], &["/grant", "Administrators:F", "/C"])
    }
}

#[cfg(windows)]
fn clear_readonly(path: &Path) -> Result<(), EscalationError> {
    let io_err = |source| EscalationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut permissions = fs::metadata(path).map_err(io_err)?.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions).map_err(io_err)?;
    }
    Ok(())
}

#[cfg(windows)]
fn run_helper(
    command: &'static str,
    path: &Path,
    before: &[&str],
    after: &[&str],
) -> Result<(), EscalationError> {
    let output = std::process::Command::new(command)
        .args(before)
        .arg(path)
        .args(after)
        .output()
        .map_err(|source| EscalationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(EscalationError::Command {
            command,
            path: path.to_path_buf(),
            output: text.trim().to_string(),
        })
    }
}
