//! Target discovery
//!
//! Helpers that turn `--user-folders` and `--volumes` into concrete root
//! directories. `--user-folders` covers every user profile on the machine,
//! not just the account running the wipe. Only existing directories are
//! returned; the coordinator still re-validates every root before the run
//! starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-user data folders targeted by `--user-folders`
pub const USER_FOLDERS: [&str; 6] = [
    "Desktop",
    "Documents",
    "Downloads",
    "Videos",
    "Music",
    "Pictures",
];

/// Mount points that hold the running system and are never offered as targets
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const SYSTEM_MOUNTS: [&str; 10] = [
    "/", "/boot", "/efi", "/usr", "/var", "/opt", "/home", "/tmp", "/nix", "/snap",
];

/// Pseudo-filesystem prefixes skipped regardless of device
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const PSEUDO_PREFIXES: [&str; 4] = ["/proc", "/sys", "/dev", "/run"];

/// Template and shared profiles that belong to no real user
const SHARED_PROFILES: [&str; 5] = ["Public", "Default", "Default User", "All Users", "Shared"];

/// Current user's home directory from the environment
pub fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directories holding one profile per user on this platform
fn profile_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        let drive = std::env::var_os("SystemDrive")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_else(|| "C:".into());
        vec![PathBuf::from(format!("{drive}\\Users"))]
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Users")]
    } else {
        vec![PathBuf::from("/home")]
    }
}

/// Existing data folders of every user profile on the machine
///
/// Profiles are read from the platform's profile directory; the current
/// user's home is added in case it lives elsewhere, such as `/root`.
pub fn user_data_folders() -> Vec<PathBuf> {
    let mut homes: Vec<PathBuf> = profile_roots()
        .iter()
        .flat_map(|root| user_profiles_under(root))
        .collect();
    homes.extend(home_dir());

    let folders: Vec<PathBuf> = dedup_roots(homes)
        .iter()
        .flat_map(|home| user_data_folders_in(home))
        .collect();
    if folders.is_empty() {
        debug!("No user folders discovered");
    }
    folders
}

/// Existing data folders of every profile below `profiles_root`
pub fn user_data_folders_under(profiles_root: &Path) -> Vec<PathBuf> {
    user_profiles_under(profiles_root)
        .iter()
        .flat_map(|home| user_data_folders_in(home))
        .collect()
}

/// Profile directories directly below `profiles_root`, sorted
///
/// Symlinked entries and shared profiles are skipped.
fn user_profiles_under(profiles_root: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(profiles_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(root = %profiles_root.display(), error = %e, "Cannot list user profiles");
            return Vec::new();
        }
    };

    let mut profiles: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| !SHARED_PROFILES.iter().any(|shared| entry.file_name() == *shared))
        .map(|entry| entry.path())
        .collect();
    profiles.sort();
    profiles
}

/// Existing data folders below `home`
pub fn user_data_folders_in(home: &Path) -> Vec<PathBuf> {
    USER_FOLDERS
        .iter()
        .map(|name| home.join(name))
        .filter(|path| path.is_dir())
        .collect()
}

/// Mount points of non-system block-device volumes
#[cfg(target_os = "linux")]
pub fn non_system_volumes() -> Vec<PathBuf> {
    match std::fs::read_to_string("/proc/self/mounts") {
        Ok(mounts) => parse_mounts(&mounts)
            .into_iter()
            .filter(|p| p.is_dir())
            .collect(),
        Err(e) => {
            debug!(error = %e, "Cannot read mount table, no volumes discovered");
            Vec::new()
        }
    }
}

/// Mount points of non-system block-device volumes
#[cfg(not(target_os = "linux"))]
pub fn non_system_volumes() -> Vec<PathBuf> {
    debug!("Volume discovery is only supported on Linux");
    Vec::new()
}

/// Extract candidate mount points from a `/proc/mounts` style table
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mounts(table: &str) -> Vec<PathBuf> {
    let mounts = table
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = unescape_mount(fields.next()?);
            device.starts_with("/dev/").then_some(mount_point)
        })
        .filter(|mp| !is_system_mount(mp))
        .map(PathBuf::from)
        .collect();
    dedup_roots(mounts)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn is_system_mount(mount_point: &str) -> bool {
    let path = Path::new(mount_point);
    SYSTEM_MOUNTS.iter().any(|sys| {
        if *sys == "/" {
            mount_point == "/"
        } else {
            path.starts_with(sys)
        }
    }) || PSEUDO_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Decode the octal escapes (`\040` for space etc.) used in mount tables
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let code = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(code) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Drop repeated roots, keeping first-seen order
pub fn dedup_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    roots
        .into_iter()
        .filter(|root| seen.insert(root.clone()))
        .collect()
}
