/// Common test utilities and helpers for secretsweep tests

use assert_fs::prelude::*;
use assert_fs::TempDir;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

/// Isolated working area: config file, fake scanner and reports directory
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.temp_dir.child("reports").path().to_path_buf()
    }

    /// Write a fake scanner script and a config pointing at it and at `api_url`
    pub fn create_config(&self, api_url: &str, scanner_body: &str) -> PathBuf {
        let script = self.temp_dir.child("fake-scanner.sh");
        script
            .write_str(&format!("{}\n", scanner_body))
            .expect("Failed to write fake scanner");

        let config = self.temp_dir.child("config.yml");
        config
            .write_str(&format!(
                r#"
github:
  api_url: "{api_url}"
scanner:
  program: "/bin/sh"
  args: ["{script}", "--regex", "--entropy=False"]
reports:
  directory: "{reports}"
"#,
                api_url = api_url,
                script = script.path().display(),
                reports = self.reports_dir().display(),
            ))
            .expect("Failed to write test config");
        config.path().to_path_buf()
    }

    /// Report files written so far
    pub fn report_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.reports_dir()) {
            Ok(entries) => {
                let mut files: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
                files.sort();
                files
            }
            Err(_) => Vec::new(),
        }
    }

    /// Run the binary with a clean credential environment
    pub async fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_secretsweep"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.temp_dir.path())
            .output()
            .await
            .expect("Failed to execute secretsweep")
    }
}

/// Mock GitHub repository data for testing
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub name: String,
    pub owner: String,
    pub is_private: bool,
}

impl MockRepository {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            is_private: false,
        }
    }

    pub fn as_private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }

    pub fn ssh_url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.owner, self.name)
    }

    /// JSON as served by `GET /user/repos`
    pub fn to_json(&self) -> Value {
        json!({
            "id": 1,
            "name": self.name,
            "full_name": format!("{}/{}", self.owner, self.name),
            "private": self.is_private,
            "clone_url": self.https_url(),
            "ssh_url": self.ssh_url(),
        })
    }
}

/// Test data sets for common scenarios
pub struct TestDataSets;

impl TestDataSets {
    /// Mixed public and private repositories, deliberately unsorted
    pub fn mixed_repositories() -> Vec<MockRepository> {
        vec![
            MockRepository::new("zeta-service", "acme"),
            MockRepository::new("Leaky-App", "acme"),
            MockRepository::new("internal-tools", "acme").as_private(),
            MockRepository::new("docs", "acme"),
        ]
    }

    pub fn to_json(repos: &[MockRepository]) -> Value {
        Value::Array(repos.iter().map(MockRepository::to_json).collect())
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
