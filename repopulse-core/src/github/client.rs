//! HTTP client for the GitHub REST API
//!
//! All operations degrade rather than abort: a failed fetch surfaces as a
//! logged warning plus partial (or zero) data, and the callers carry on
//! with the next repository. Only client construction can fail hard.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::types::CommitRecord;

use super::{has_next_page, last_page};

/// Rough average used to turn language byte counts into a line estimate.
pub const BYTES_PER_LINE: u64 = 40;

/// Repository metadata from GET /repos/{owner}/{repo}
#[derive(Debug, Deserialize)]
pub struct RepoInfo {
    /// Default branch name; GitHub omits it for some repository states
    pub default_branch: Option<String>,
    /// Current star count
    #[serde(default)]
    pub stargazers_count: u64,
}

/// One entry from the paginated commits listing.
#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<DateTime<Utc>>,
}

/// Authenticated GitHub API client scoped to one account.
pub struct GithubClient {
    http_client: reqwest::Client,
    base_url: String,
    owner: String,
    per_page: u32,
    page_delay: Duration,
}

impl GithubClient {
    /// Create a client for `config.owner` using the given token.
    ///
    /// Returns an error if the configuration is invalid. No request
    /// timeout is set: runs are strictly sequential and a slow response
    /// blocks the run rather than aborting it.
    pub fn new(config: &GithubConfig, token: &str) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|e| Error::Config(format!("invalid token: {}", e)))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("repopulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            per_page: config.per_page,
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    /// The account this client is scoped to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn repo_url(&self, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(repo)
        )
    }

    /// Fetch repository metadata (default branch, star count).
    pub async fn repo_info(&self, repo: &str) -> Result<RepoInfo> {
        let response = self
            .http_client
            .get(self.repo_url(repo))
            .send()
            .await
            .map_err(|e| Error::Github(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Github(format!(
                "cannot access repo {}: {}",
                repo, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Github(format!("failed to parse response: {}", e)))
    }

    /// Current star count for a repository.
    pub async fn current_star_count(&self, repo: &str) -> Result<u64> {
        Ok(self.repo_info(repo).await?.stargazers_count)
    }

    /// Estimate lines of code from the languages endpoint.
    ///
    /// Sums per-language byte counts and divides by [`BYTES_PER_LINE`].
    /// An estimate, never exact.
    pub async fn estimate_lines_of_code(&self, repo: &str) -> Result<u64> {
        let url = format!("{}/languages", self.repo_url(repo));
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Github(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Github(format!(
                "cannot fetch languages for {}: {}",
                repo, status
            )));
        }

        let languages: HashMap<String, u64> = response
            .json()
            .await
            .map_err(|e| Error::Github(format!("failed to parse response: {}", e)))?;

        let total_bytes: u64 = languages.values().sum();
        Ok((total_bytes + BYTES_PER_LINE / 2) / BYTES_PER_LINE)
    }

    /// Fetch every commit on the default branch, optionally since a date.
    ///
    /// Pages through the commits endpoint in strictly increasing page
    /// order until a page comes back empty or the `Link` header has no
    /// `rel="next"`. A 409 means the repository is empty and yields an
    /// empty sequence. Any other failure mid-pagination is logged as a
    /// warning and the commits collected so far are returned.
    pub async fn fetch_all_commits(
        &self,
        repo: &str,
        since: Option<DateTime<Utc>>,
    ) -> Vec<CommitRecord> {
        let info = match self.repo_info(repo).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(repo, error = %e, "Cannot access repository");
                return Vec::new();
            }
        };
        let branch = info.default_branch.unwrap_or_else(|| "main".to_string());

        let mut commits = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut request = self
                .http_client
                .get(format!("{}/commits", self.repo_url(repo)))
                .query(&[("sha", branch.as_str())])
                .query(&[("per_page", self.per_page), ("page", page)]);
            if let Some(since) = since {
                request = request.query(&[("since", since.to_rfc3339())]);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(repo, page, error = %e, "Commit page request failed");
                    break;
                }
            };

            let status = response.status();
            if status == StatusCode::CONFLICT {
                // 409: empty repository, not an error
                tracing::warn!(repo, "Repository is empty");
                return Vec::new();
            }
            if !status.is_success() {
                tracing::warn!(repo, page, %status, "Cannot fetch commits");
                break;
            }

            // Grab the pagination header before consuming the body
            let link_header = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            let items: Vec<CommitItem> = match response.json().await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(repo, page, error = %e, "Malformed commit page");
                    break;
                }
            };
            if items.is_empty() {
                break;
            }

            for item in items {
                match item.commit.author.and_then(|a| a.date) {
                    Some(date) => commits.push(CommitRecord {
                        date,
                        sha: item.sha,
                    }),
                    None => tracing::debug!(repo, sha = %item.sha, "Commit without author date"),
                }
            }

            tracing::debug!(repo, page, total = commits.len(), "Fetched commit page");

            match link_header {
                Some(header) if has_next_page(&header) => {}
                _ => break,
            }
            page += 1;

            tokio::time::sleep(self.page_delay).await;
        }

        commits
    }

    /// Total commit count without walking every page.
    ///
    /// Requests one commit per page and reads the `rel="last"` page
    /// number from the `Link` header; with no header the repository has
    /// at most one commit.
    pub async fn commit_count(&self, repo: &str, since: Option<DateTime<Utc>>) -> Result<u64> {
        let info = self.repo_info(repo).await?;
        let branch = info.default_branch.unwrap_or_else(|| "main".to_string());

        let mut request = self
            .http_client
            .get(format!("{}/commits", self.repo_url(repo)))
            .query(&[("sha", branch.as_str())])
            .query(&[("per_page", "1")]);
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Github(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Ok(0);
        }
        if !status.is_success() {
            return Err(Error::Github(format!(
                "cannot fetch commits for {}: {}",
                repo, status
            )));
        }

        let link_header = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(pages) = link_header.as_deref().and_then(last_page) {
            return Ok(pages);
        }

        let items: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::Github(format!("failed to parse response: {}", e)))?;
        Ok(items.len() as u64)
    }
}
