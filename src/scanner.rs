use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::Config;
use crate::selector::ScanTarget;

/// Outcome of scanning one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Scanner exited zero
    Clean,
    /// Scanner exited non-zero; its combined output is the findings text
    Flagged {
        exit_code: i32,
        output: Vec<u8>,
    },
    /// Scanner could not run to completion
    Errored { reason: String },
}

/// External secret scanner, invoked once per clone URL
#[derive(Debug, Clone)]
pub struct ScannerCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ScannerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.scanner.program, config.scanner.args.clone())
            .with_timeout(config.scan_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Full argument vector passed for a clone URL (program excluded)
    pub fn argv(&self, url: &str) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.push(url.to_string());
        argv
    }

    /// Check whether the scanner program can be found
    pub fn is_available(&self) -> bool {
        if self.program.components().count() > 1 {
            return self.program.is_file();
        }

        Command::new("which")
            .arg(&self.program)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Run the scanner against one target.
    ///
    /// The URL is passed as its own argument, never through a shell.
    pub async fn scan(&self, target: &ScanTarget) -> ScanOutcome {
        info!("Checking: {}", target.url);

        let mut command = AsyncCommand::new(&self.program);
        command
            .args(self.argv(&target.url))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match timeout(limit, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return ScanOutcome::Errored {
                        reason: format!("scan timed out after {}s", limit.as_secs()),
                    }
                }
            },
            None => command.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ScanOutcome::Errored {
                    reason: format!("failed to run {}: {}", self.program.display(), e),
                }
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        match output.status.code() {
            Some(0) => {
                if !combined.is_empty() {
                    debug!(
                        "Scanner exited cleanly for {} with {} bytes of output",
                        target.url,
                        combined.len()
                    );
                }
                ScanOutcome::Clean
            }
            Some(exit_code) => ScanOutcome::Flagged {
                exit_code,
                output: combined,
            },
            None => ScanOutcome::Errored {
                reason: "scanner was terminated by a signal".to_string(),
            },
        }
    }
}

/// Fake scanners for tests: shell scripts run through `/bin/sh`
#[cfg(all(test, unix))]
pub(crate) mod testing {
    use super::ScannerCommand;
    use std::path::Path;

    pub fn fake_scanner(dir: &Path, body: &str) -> ScannerCommand {
        let script = dir.join("fake-scanner.sh");
        std::fs::write(&script, format!("{}\n", body)).expect("Failed to write fake scanner");
        ScannerCommand::new(
            "/bin/sh",
            vec![
                script.to_string_lossy().into_owned(),
                "--regex".to_string(),
                "--entropy=False".to_string(),
            ],
        )
    }
}
