//! Preflight checks
//!
//! Run before any network call so that a sweep does not spend minutes
//! listing repositories only to fail on the first report write.

use crate::report::RunContext;
use crate::scanner::ScannerCommand;

/// Result of the preflight checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Scanner executable status (warning only, scans fail per repository)
    pub scanner: CheckResult,
    /// Reports directory status
    pub reports_dir: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub fn run(scanner: &ScannerCommand, context: &RunContext) -> Self {
        Self {
            scanner: Self::check_scanner(scanner),
            reports_dir: Self::check_reports_dir(context),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.scanner.passed && self.reports_dir.passed
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        [&self.scanner, &self.reports_dir]
            .into_iter()
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        [&self.scanner, &self.reports_dir]
            .into_iter()
            .filter(|r| r.is_warning)
            .collect()
    }

    fn check_scanner(scanner: &ScannerCommand) -> CheckResult {
        let program = scanner.program().display().to_string();
        if scanner.is_available() {
            CheckResult::ok(format!("Scanner found: {}", program))
        } else {
            CheckResult::warning_with_details(
                format!("Scanner not found: {}", program),
                "Every repository will be reported as errored.\n\
                 Install trufflehog or set scanner.program in the configuration.",
            )
        }
    }

    fn check_reports_dir(context: &RunContext) -> CheckResult {
        let dir = context.reports_dir();

        if dir.exists() && !dir.is_dir() {
            return CheckResult::error_with_details(
                format!("Reports path is not a directory: {}", dir.display()),
                "Remove the file or choose another directory with --reports-dir",
            );
        }

        // Existing directories are checked lazily at the first write; a missing
        // one must at least have a usable ancestor.
        let ancestor = dir
            .ancestors()
            .skip(1)
            .find(|p| p.as_os_str().is_empty() || p.exists());
        match ancestor {
            Some(p) if !p.as_os_str().is_empty() && !p.is_dir() => CheckResult::error_with_details(
                format!("Cannot create reports directory: {}", dir.display()),
                format!("{} is not a directory", p.display()),
            ),
            _ => CheckResult::ok(format!("Reports directory: {}", dir.display())),
        }
    }
}
