//! Report rendering
//!
//! Turns a [`CompletedReport`] into a human-readable text document or a
//! JSON document. Writing the report is judged on its own: a failed write
//! does not change what the run did to the files.

use crate::error::{ReportError, ReportResult};
use crate::report::{CompletedReport, OutcomeStatus};
use humansize::{format_size, BINARY};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Output format of the report file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Plain text document
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl ReportFormat {
    /// File extension used for generated report names
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Render the report as plain text
pub fn render_text<W: Write>(report: &CompletedReport, out: &mut W) -> io::Result<()> {
    let rule = "===================================";
    writeln!(out, "{rule}")?;
    writeln!(out, " Secure Erase Report")?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;

    let settings = &report.settings;
    writeln!(out, "Report ID        : {}", report.run_id)?;
    writeln!(out, "Target           : {}", report.target)?;
    writeln!(out, "Started          : {}", report.start_time.to_rfc2822())?;
    writeln!(out, "Finished         : {}", report.end_time.to_rfc2822())?;
    writeln!(out, "Wipe method      : {}", settings.method)?;
    writeln!(
        out,
        "Wipe passes      : {} (requested {})",
        settings.effective_passes, settings.requested_passes
    )?;
    writeln!(out, "Force mode       : {}", settings.force)?;
    writeln!(out, "Stealth mode     : {}", settings.stealth)?;
    writeln!(out, "Workers          : {}", settings.workers)?;
    writeln!(
        out,
        "Operation status : {}",
        if report.passed() { "PASSED" } else { "FAILED" }
    )?;
    writeln!(out, "Run outcome      : {}", report.status)?;
    writeln!(out)?;

    let hw = &report.hardware;
    writeln!(out, "Host:")?;
    writeln!(out, "  Hostname       : {}", hw.hostname)?;
    writeln!(out, "  Platform       : {} ({})", hw.os, hw.arch)?;
    writeln!(out, "  CPU            : {} x{}", hw.cpu_model, hw.cpu_count)?;
    writeln!(
        out,
        "  Memory         : {} used of {}",
        format_size(hw.used_memory_bytes, BINARY),
        format_size(hw.total_memory_bytes, BINARY)
    )?;
    writeln!(out)?;

    writeln!(out, "Files erased:")?;
    for outcome in &report.outcomes {
        match outcome.status {
            OutcomeStatus::Wiped => writeln!(
                out,
                "- {} : [WIPED] ({} passes)",
                outcome.path.display(),
                outcome.passes_applied
            )?,
            OutcomeStatus::Failed => writeln!(
                out,
                "- {} : [FAILED] ({} passes) Reason: {}",
                outcome.path.display(),
                outcome.passes_applied,
                outcome.error.as_deref().unwrap_or("unknown")
            )?,
        }
    }
    writeln!(out)?;

    writeln!(out, "Total files successfully erased: {}", report.success_count)?;
    writeln!(out, "Total files failed: {}", report.error_count)?;
    writeln!(out, "Elapsed time: {:.3}s", report.elapsed().as_secs_f64())?;
    Ok(())
}

/// Render the report as pretty-printed JSON
pub fn render_json<W: Write>(report: &CompletedReport, out: &mut W) -> ReportResult<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out).map_err(serde_json::Error::io)?;
    Ok(())
}

/// Write the report to `path` in the given format
pub fn write_report(report: &CompletedReport, path: &Path, format: ReportFormat) -> ReportResult<()> {
    let write_err = |source: io::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);

    match format {
        ReportFormat::Text => render_text(report, &mut out).map_err(write_err)?,
        ReportFormat::Json => render_json(report, &mut out)?,
    }

    out.flush().map_err(write_err)?;
    out.get_ref().sync_all().map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;
    use crate::report::tests::test_settings;
    use crate::report::{EraseReport, FileOutcome, HardwareSnapshot, RunStatus};
    use tempfile::tempdir;

    fn sample_report() -> CompletedReport {
        sample_live_report().complete(RunStatus::Completed)
    }

    fn sample_live_report() -> EraseReport {
        let report = EraseReport::with_hardware(
            "/data/target",
            test_settings(),
            HardwareSnapshot {
                hostname: "box".into(),
                os: "linux".into(),
                arch: "x86_64".into(),
                cpu_model: "Test CPU".into(),
                cpu_count: 4,
                total_memory_bytes: 8 * 1024 * 1024 * 1024,
                used_memory_bytes: 2 * 1024 * 1024 * 1024,
            },
        );
        report.add_outcome(FileOutcome::wiped("/data/target/a.txt", 2));
        report.add_outcome(FileOutcome::failed(
            "/data/target/b.txt",
            1,
            &FileError::Interrupted,
        ));
        report
    }

    #[test]
    fn test_render_text_lines() {
        let mut out = Vec::new();
        render_text(&sample_report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Secure Erase Report"));
        assert!(text.contains("Target           : /data/target"));
        assert!(text.contains("Operation status : FAILED"));
        assert!(text.contains("Run outcome      : completed"));
        assert!(text.contains("- /data/target/a.txt : [WIPED] (2 passes)"));
        assert!(text.contains(
            "- /data/target/b.txt : [FAILED] (1 passes) Reason: run interrupted before file was processed"
        ));
        assert!(text.contains("Total files successfully erased: 1"));
        assert!(text.contains("Total files failed: 1"));
        assert!(text.contains("CPU            : Test CPU x4"));
    }

    #[test]
    fn test_render_text_run_failure_without_file_errors() {
        let report = EraseReport::with_hardware(
            "/data/gone",
            test_settings(),
            HardwareSnapshot::default(),
        )
        .complete(RunStatus::Failed("Invalid root '/data/gone'".into()));

        let mut out = Vec::new();
        render_text(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Operation status : FAILED"));
        assert!(text.contains("Run outcome      : failed: Invalid root '/data/gone'"));
        assert!(!text.contains("PASSED"));
    }

    #[test]
    fn test_render_json_structure() {
        let mut out = Vec::new();
        render_json(&sample_report(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["target"], "/data/target");
        assert_eq!(value["success_count"], 1);
        assert_eq!(value["error_count"], 1);
        assert_eq!(value["settings"]["method"], "deep");
        assert_eq!(value["outcomes"][1]["status"], "FAILED");
        assert_eq!(value["outcomes"][1]["error_kind"], "interrupted");
        assert_eq!(value["hardware"]["hostname"], "box");
        assert_eq!(value["status"]["state"], "completed");
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        write_report(&sample_report(), &path, ReportFormat::Text).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("==="));
    }

    #[test]
    fn test_write_report_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let report = sample_live_report().complete(RunStatus::Interrupted);
        let err = write_report(&report, &path, ReportFormat::Json).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ReportFormat::Text.extension(), "txt");
        assert_eq!(ReportFormat::Json.extension(), "json");
    }
}
