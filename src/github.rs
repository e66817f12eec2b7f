use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;

/// GitHub credentials supplied on the command line or through the environment
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token
    Token(String),
    /// Username and password pair
    Basic { username: String, password: String },
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Basic {{ username: {:?}, password: *** }}", username)
            }
        }
    }
}

impl Credentials {
    /// Pick credentials: explicit token, then username + password, then `GITHUB_TOKEN`
    pub fn resolve(
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let token = token.filter(|t| !t.is_empty());
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());

        if let Some(token) = token {
            return Ok(Credentials::Token(token));
        }

        if let (Some(username), Some(password)) = (username, password) {
            return Ok(Credentials::Basic { username, password });
        }

        if let Ok(token) = Self::try_environment_token() {
            return Ok(Credentials::Token(token));
        }

        Err(anyhow!(
            "You must specify either a GitHub access token (--token or GITHUB_TOKEN) \
             or a username and password (--user and --password)"
        ))
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> Result<String> {
        debug!("Attempting environment variable authentication");

        let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;

        if token.is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }

        debug!("Using GITHUB_TOKEN environment variable");
        Ok(token)
    }
}

/// Which repositories to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every repository visible to the authenticated account
    AuthenticatedUser,
    /// Repositories of one organization
    Organization(String),
}

impl ListScope {
    pub fn from_org(org: Option<String>) -> Self {
        match org.filter(|o| !o.is_empty()) {
            Some(org) => ListScope::Organization(org),
            None => ListScope::AuthenticatedUser,
        }
    }
}

impl std::fmt::Display for ListScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListScope::AuthenticatedUser => f.write_str("authenticated user"),
            ListScope::Organization(org) => write!(f, "organization {}", org),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Repository record as returned by the GitHub REST API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub private: bool,
    /// HTTPS clone URL
    pub clone_url: String,
    /// SSH clone URL
    pub ssh_url: String,
}

impl Repository {
    pub fn visibility(&self) -> Visibility {
        if self.private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    /// `owner/name` when known, otherwise the bare name
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

/// One page of a repository listing
#[derive(Debug, Clone, Default)]
pub struct RepoPage {
    pub repositories: Vec<Repository>,
    /// Absolute URL of the following page, if any
    pub next: Option<String>,
}

/// Transport for paginated repository listings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Fetch the first page of a listing
    async fn first_page(&self, scope: &ListScope) -> Result<RepoPage>;

    /// Fetch the page a previous `next` link pointed at
    async fn page_at(&self, url: &str) -> Result<RepoPage>;
}

/// GitHub REST API client
pub struct GitHubApi {
    http: reqwest::Client,
    api_url: String,
    per_page: u32,
    credentials: Credentials,
}

impl GitHubApi {
    pub fn new(config: &GitHubConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let api_url = config.api_url.trim_end_matches('/').to_string();
        Url::parse(&api_url).with_context(|| format!("Invalid GitHub API URL: {}", api_url))?;

        match &credentials {
            Credentials::Token(_) => info!("Authenticating to {} with a token", api_url),
            Credentials::Basic { username, .. } => {
                info!("Authenticating to {} as {}", api_url, username)
            }
        }

        Ok(Self {
            http,
            api_url,
            per_page: config.per_page.max(1),
            credentials,
        })
    }

    fn first_page_url(&self, scope: &ListScope) -> String {
        match scope {
            ListScope::AuthenticatedUser => format!(
                "{}/user/repos?per_page={}&page=1",
                self.api_url, self.per_page
            ),
            ListScope::Organization(org) => format!(
                "{}/orgs/{}/repos?per_page={}&page=1",
                self.api_url, org, self.per_page
            ),
        }
    }

    async fn get_page(&self, url: &str) -> Result<RepoPage> {
        debug!("GET {}", url);

        let request = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        let request = match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach GitHub API at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GitHub API returned {} for {}: {}",
                status,
                url,
                body.trim()
            ));
        }

        let next = match response.headers().get(LINK) {
            Some(value) => match value.to_str() {
                Ok(header) => parse_next_link(header),
                Err(_) => {
                    warn!("Ignoring non-text Link header from {}", url);
                    None
                }
            },
            None => None,
        };

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;
        let repositories: Vec<Repository> = serde_json::from_slice(&body)
            .with_context(|| format!("Failed to decode repository list from {}", url))?;

        Ok(RepoPage { repositories, next })
    }
}

#[async_trait]
impl RepositoryApi for GitHubApi {
    async fn first_page(&self, scope: &ListScope) -> Result<RepoPage> {
        let url = self.first_page_url(scope);
        self.get_page(&url).await
    }

    async fn page_at(&self, url: &str) -> Result<RepoPage> {
        self.get_page(url).await
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
///
/// A malformed next link yields `None`, which ends pagination.
pub fn parse_next_link(header: &str) -> Option<String> {
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let target = parts.next().unwrap_or_default().trim();

        let is_next = parts.any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        });
        if !is_next {
            continue;
        }

        let url = target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .filter(|u| Url::parse(u).is_ok());

        return match url {
            Some(url) => Some(url.to_string()),
            None => {
                warn!("Malformed pagination link {:?}, treating as last page", entry.trim());
                None
            }
        };
    }

    None
}

/// Follows pagination until the listing is exhausted
pub struct RepositoryLister<A> {
    api: A,
    max_pages: usize,
}

impl<A: RepositoryApi> RepositoryLister<A> {
    pub fn new(api: A, max_pages: usize) -> Self {
        Self {
            api,
            max_pages: max_pages.max(1),
        }
    }

    /// List every repository in scope, all pages concatenated in page order
    pub async fn list(&self, scope: &ListScope) -> Result<Vec<Repository>> {
        debug!("Fetching repositories for {}", scope);

        let mut page = self
            .api
            .first_page(scope)
            .await
            .with_context(|| format!("Failed to fetch repositories for {} page 1", scope))?;
        let mut repositories = Vec::new();
        let mut fetched = 1;

        loop {
            let RepoPage {
                repositories: items,
                next,
            } = page;
            repositories.extend(items);

            let Some(next) = next else {
                break;
            };

            if fetched >= self.max_pages {
                warn!(
                    "Reached maximum pagination limit ({} pages) for {}",
                    self.max_pages, scope
                );
                break;
            }

            fetched += 1;
            page = self.api.page_at(&next).await.with_context(|| {
                format!("Failed to fetch repositories for {} page {}", scope, fetched)
            })?;
        }

        info!(
            "Found {} repositories across {} page(s) for {}",
            repositories.len(),
            fetched,
            scope
        );
        Ok(repositories)
    }
}
