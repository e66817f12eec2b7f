//! secretsweep - Sweep GitHub repositories for leaked secrets
//!
//! secretsweep lists every repository visible to an account or organization,
//! runs an external secret scanner against each clone URL and collects the
//! output of flagged repositories into a dated report file.
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`github`]: GitHub API access and paginated repository listing
//! - [`selector`]: Clone URL selection and scan ordering
//! - [`scanner`]: External scanner invocation
//! - [`report`]: Report file writing
//! - [`sweep`]: Scan loop and summary
//! - [`health`]: Preflight checks

pub mod config;
pub mod github;
pub mod health;
pub mod report;
pub mod scanner;
pub mod selector;
pub mod sweep;

pub use config::Config;
pub use github::{Credentials, GitHubApi, ListScope, Repository, RepositoryLister};
pub use health::HealthCheck;
pub use report::{ReportWriter, RunContext};
pub use scanner::{ScanOutcome, ScannerCommand};
pub use selector::{select_targets, ScanTarget};
pub use sweep::{ScanEngine, ScanSummary};
