use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for secretsweep
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// External secret scanner invocation
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Scan loop behavior
    #[serde(default)]
    pub scan: ScanConfig,

    /// Report file location
    #[serde(default)]
    pub reports: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Base URL of the REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Repositories requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Upper bound on pages followed for a single listing
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// Scanner executable configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    /// Program to run, looked up on PATH when not absolute
    #[serde(default = "default_scanner_program")]
    pub program: String,

    /// Arguments placed before the clone URL
    #[serde(default = "default_scanner_args")]
    pub args: Vec<String>,
}

/// Scan loop configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanConfig {
    /// Maximum scanner processes running at once
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Timeout for a single scan in seconds (0 disables the timeout)
    #[serde(default)]
    pub timeout: u64,
}

/// Report file configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    /// Directory holding the dated report files
    #[serde(default = "default_reports_directory")]
    pub directory: String,

    /// File name prefix, followed by the run timestamp
    #[serde(default = "default_reports_prefix")]
    pub prefix: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_max_pages() -> usize {
    1000
}
fn default_scanner_program() -> String {
    "trufflehog".to_string()
}
fn default_scanner_args() -> Vec<String> {
    vec!["--regex".to_string(), "--entropy=False".to_string()]
}
fn default_max_parallel() -> usize {
    1
}
fn default_reports_directory() -> String {
    "reports".to_string()
}
fn default_reports_prefix() -> String {
    env!("CARGO_PKG_NAME").to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: default_scanner_program(),
            args: default_scanner_args(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            timeout: 0,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_directory(),
            prefix: default_reports_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to built-in defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join(env!("CARGO_PKG_NAME")).join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.reports.directory = shellexpand::full(&self.reports.directory)
            .context("Failed to expand reports.directory path")?
            .into_owned();

        self.scanner.program = shellexpand::full(&self.scanner.program)
            .context("Failed to expand scanner.program path")?
            .into_owned();

        Ok(())
    }

    /// Per-scan timeout, `None` when disabled
    pub fn scan_timeout(&self) -> Option<Duration> {
        match self.scan.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn reports_directory(&self) -> PathBuf {
        PathBuf::from(&self.reports.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.scanner.program, "trufflehog");
        assert_eq!(config.scanner.args, vec!["--regex", "--entropy=False"]);
        assert_eq!(config.scan.max_parallel, 1);
        assert_eq!(config.scan.timeout, 0);
        assert_eq!(config.reports.directory, "reports");
        assert_eq!(config.reports.prefix, "secretsweep");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_scan_timeout() {
        let mut config = Config::default();
        assert!(config.scan_timeout().is_none());

        config.scan.timeout = 90;
        assert_eq!(config.scan_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_expand_paths() {
        env::set_var("TEST_SECRETSWEEP_HOME", "/test/home");

        let mut config = Config::default();
        config.reports.directory = "${TEST_SECRETSWEEP_HOME}/reports".to_string();
        config.scanner.program = "${TEST_SECRETSWEEP_HOME}/bin/trufflehog".to_string();

        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.reports.directory, "/test/home/reports");
        assert_eq!(config.scanner.program, "/test/home/bin/trufflehog");

        env::remove_var("TEST_SECRETSWEEP_HOME");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/config.yml");
        let result = Config::load(nonexistent_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.yml");
        std::fs::write(&path, "invalid: yaml: content: [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains("secretsweep"));
        assert!(default_path.to_string_lossy().ends_with("config.yml"));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
github:
  api_url: "https://github.example.com/api/v3"
  per_page: 50
scanner:
  program: "/opt/bin/trufflehog"
  args: ["--regex"]
scan:
  max_parallel: 4
  timeout: 600
reports:
  directory: "/var/lib/secretsweep"
logging:
  level: "debug"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        assert_eq!(config.github.per_page, 50);
        assert_eq!(config.github.max_pages, 1000);
        assert_eq!(config.scanner.program, "/opt/bin/trufflehog");
        assert_eq!(config.scanner.args, vec!["--regex"]);
        assert_eq!(config.scan.max_parallel, 4);
        assert_eq!(config.scan.timeout, 600);
        assert_eq!(config.reports.directory, "/var/lib/secretsweep");
        assert_eq!(config.reports.prefix, "secretsweep");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").expect("Failed to parse YAML");
        assert_eq!(config.scanner.program, "trufflehog");
        assert_eq!(config.scan.max_parallel, 1);
    }
}
