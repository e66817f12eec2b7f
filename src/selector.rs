//! Clone URL selection
//!
//! GitHub rate limits ssh clones much harder than https ones, and exceeding
//! the quota shows up as "connection reset by peer" halfway through a sweep.
//! The ssh URL is therefore only used where it is required: private
//! repositories, and only when private scanning was asked for.

use crate::github::{Repository, Visibility};

/// Transport used for a clone URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMethod {
    /// Use SSH (git@github.com:user/repo.git)
    Ssh,
    /// Use HTTPS (https://github.com/user/repo.git)
    Https,
}

/// A repository queued for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Clone URL handed to the scanner, also the identifier used in reports
    pub url: String,

    /// Repository display name (owner/name)
    pub name: String,

    pub clone_method: CloneMethod,
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Pick the clone method for one repository, `None` when it must be skipped
pub fn select_clone_method(repo: &Repository, include_private: bool) -> Option<CloneMethod> {
    match (repo.visibility(), include_private) {
        (Visibility::Private, true) => Some(CloneMethod::Ssh),
        (Visibility::Private, false) => None,
        (Visibility::Public, _) => Some(CloneMethod::Https),
    }
}

/// Build the ordered scan list: one URL per selected repository, sorted
/// case-insensitively, exact duplicates removed.
pub fn select_targets(repos: &[Repository], include_private: bool) -> Vec<ScanTarget> {
    let mut targets: Vec<ScanTarget> = repos
        .iter()
        .filter_map(|repo| {
            let clone_method = select_clone_method(repo, include_private)?;
            let url = match clone_method {
                CloneMethod::Ssh => repo.ssh_url.clone(),
                CloneMethod::Https => repo.clone_url.clone(),
            };
            Some(ScanTarget {
                url,
                name: repo.display_name().to_string(),
                clone_method,
            })
        })
        .collect();

    targets.sort_by(|a, b| {
        a.url
            .to_lowercase()
            .cmp(&b.url.to_lowercase())
            .then_with(|| a.url.cmp(&b.url))
    });
    targets.dedup_by(|a, b| a.url == b.url);

    targets
}
