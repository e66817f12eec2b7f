use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::bytes::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp embedded in report file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S%.3f";

/// Per-run values fixed at startup and shared by every report write
#[derive(Debug, Clone)]
pub struct RunContext {
    program: String,
    reports_dir: PathBuf,
    started_at: DateTime<Local>,
}

impl RunContext {
    /// Capture the run start time now
    pub fn new(program: impl Into<String>, reports_dir: impl Into<PathBuf>) -> Self {
        Self::started_at(program, reports_dir, Local::now())
    }

    pub fn started_at(
        program: impl Into<String>,
        reports_dir: impl Into<PathBuf>,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            program: program.into(),
            reports_dir: reports_dir.into(),
            started_at,
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// `<reports-dir>/<program>-<timestamp>.txt`, identical for the whole run
    pub fn report_path(&self) -> PathBuf {
        self.reports_dir.join(format!(
            "{}-{}.txt",
            self.program,
            self.started_at.format(TIMESTAMP_FORMAT)
        ))
    }
}

/// Appends scanner output of flagged repositories to the run's report file
pub struct ReportWriter {
    context: RunContext,
    color_codes: Regex,
}

impl ReportWriter {
    pub fn new(context: RunContext) -> Self {
        Self {
            context,
            color_codes: Regex::new(r"\x1b\[[0-9;]*m").expect("valid color code pattern"),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.context.report_path()
    }

    /// Append one block: identifier line, output, blank line
    pub fn append(&self, identifier: &str, output: &[u8]) -> Result<PathBuf> {
        let dir = self.context.reports_dir();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create reports directory: {:?}", dir))?;

        let path = self.context.report_path();
        let body = self.clean_output(output);

        let mut block = Vec::with_capacity(identifier.len() + body.len() + 3);
        block.extend_from_slice(identifier.as_bytes());
        block.push(b'\n');
        block.extend_from_slice(&body);
        if !body.is_empty() && !body.ends_with(b"\n") {
            block.push(b'\n');
        }
        block.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open report file: {:?}", path))?;
        file.write_all(&block)
            .with_context(|| format!("Failed to write report file: {:?}", path))?;

        debug!("Wrote {} bytes for {} to {:?}", block.len(), identifier, path);
        Ok(path)
    }

    /// Strip color codes from text output; bytes that are not UTF-8 pass through untouched
    fn clean_output(&self, output: &[u8]) -> Vec<u8> {
        if std::str::from_utf8(output).is_err() {
            debug!("Scanner output is not valid UTF-8, writing it unmodified");
            return output.to_vec();
        }
        self.color_codes.replace_all(output, &b""[..]).into_owned()
    }
}
