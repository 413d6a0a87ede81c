//! Host snapshot embedded in every report

use serde::Serialize;

/// Host information captured once when the report is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareSnapshot {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub cpu_model: String,
    pub cpu_count: usize,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
}

impl HardwareSnapshot {
    /// Inspect the current host
    ///
    /// Fields that cannot be determined are left as "unknown" or 0; probing
    /// never fails the run.
    pub fn capture() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        let (cpu_model, total_memory_bytes, used_memory_bytes) = read_platform();

        Self {
            hostname,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_model,
            cpu_count: num_cpus::get(),
            total_memory_bytes,
            used_memory_bytes,
        }
    }
}

#[cfg(target_os = "linux")]
fn read_platform() -> (String, u64, u64) {
    let cpu_model = std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|s| parse_cpu_model(&s))
        .unwrap_or_else(|| "unknown".to_string());

    let (total, used) = std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|s| parse_meminfo(&s))
        .unwrap_or((0, 0));

    (cpu_model, total, used)
}

#[cfg(not(target_os = "linux"))]
fn read_platform() -> (String, u64, u64) {
    ("unknown".to_string(), 0, 0)
}

/// First "model name" line of /proc/cpuinfo
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|model| !model.is_empty())
}

/// (total, used) bytes from /proc/meminfo; used = MemTotal - MemAvailable
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(meminfo: &str) -> Option<(u64, u64)> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse::<u64>()
            .ok()
            .map(|kib| kib * 1024)
    };

    let total = field("MemTotal:")?;
    let available = field("MemAvailable:").unwrap_or(total);
    Some((total, total.saturating_sub(available)))
}
