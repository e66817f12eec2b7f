//! Scan engine - runs the scanner over every target and collects findings
//!
//! Targets are scanned in list order. With `max_parallel > 1` several scanner
//! processes run at once, but results are still consumed in list order by a
//! single loop, so report writes and the problem list stay serialized.

use crate::report::ReportWriter;
use crate::scanner::{ScanOutcome, ScannerCommand};
use crate::selector::ScanTarget;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Repositories that produced findings, in discovery order, each listed once
#[derive(Debug, Clone, Default)]
pub struct ProblemList {
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl ProblemList {
    /// Record an identifier; returns false if it was already present
    pub fn record(&mut self, identifier: &str) -> bool {
        if !self.seen.insert(identifier.to_string()) {
            return false;
        }
        self.entries.push(identifier.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Results from a complete sweep
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub total_repositories: usize,
    pub clean: usize,
    pub flagged: usize,
    pub errored: usize,
    pub report_failures: usize,
    pub duration: Duration,
    pub problems: ProblemList,
    /// Report file, set once at least one block was written
    pub report_path: Option<PathBuf>,
}

impl ScanSummary {
    /// Console text listing flagged repositories, `None` when nothing was found
    pub fn problem_report(&self) -> Option<String> {
        if self.problems.is_empty() {
            return None;
        }

        let mut text = format!(
            "Problems detected in {} repository(s) which are listed below\n\
             Please review the generated report for additional detail\n",
            self.problems.len()
        );
        for identifier in self.problems.entries() {
            text.push_str(identifier);
            text.push('\n');
        }
        Some(text)
    }
}

/// Drives the scanner over a target list
pub struct ScanEngine {
    scanner: ScannerCommand,
    writer: ReportWriter,
    max_parallel: usize,
}

impl ScanEngine {
    pub fn new(scanner: ScannerCommand, writer: ReportWriter, max_parallel: usize) -> Self {
        Self {
            scanner,
            writer,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn writer(&self) -> &ReportWriter {
        &self.writer
    }

    /// Scan every target; per-repository failures never abort the sweep
    pub async fn run(&self, targets: Vec<ScanTarget>) -> ScanSummary {
        let start_time = Instant::now();
        let total_repositories = targets.len();

        info!(
            "Scanning {} repositories with up to {} concurrent scan(s)",
            total_repositories, self.max_parallel
        );

        let scanner = &self.scanner;
        let mut results = stream::iter(targets)
            .map(|target| async move {
                let outcome = scanner.scan(&target).await;
                (target, outcome)
            })
            .buffered(self.max_parallel);

        let mut summary = ScanSummary {
            total_repositories,
            clean: 0,
            flagged: 0,
            errored: 0,
            report_failures: 0,
            duration: Duration::ZERO,
            problems: ProblemList::default(),
            report_path: None,
        };

        while let Some((target, outcome)) = results.next().await {
            self.record(&mut summary, &target, outcome);
        }

        summary.duration = start_time.elapsed();

        info!(
            "Sweep completed in {:.2}s: {} clean, {} flagged, {} errored",
            summary.duration.as_secs_f64(),
            summary.clean,
            summary.flagged,
            summary.errored
        );

        summary
    }

    fn record(&self, summary: &mut ScanSummary, target: &ScanTarget, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Clean => {
                summary.clean += 1;
            }
            ScanOutcome::Flagged { exit_code, output } => {
                summary.flagged += 1;
                warn!("Problems found in: {} (exit code {})", target.url, exit_code);

                if !summary.problems.record(&target.url) {
                    return;
                }

                match self.writer.append(&target.url, &output) {
                    Ok(path) => summary.report_path = Some(path),
                    Err(e) => {
                        summary.report_failures += 1;
                        error!("Failed to write report entry for {}: {:#}", target.url, e);
                    }
                }
            }
            ScanOutcome::Errored { reason } => {
                summary.errored += 1;
                error!("Problem checking repo {}: {}", target.url, reason);
            }
        }
    }
}
