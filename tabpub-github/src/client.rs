//! GitHub REST client for pull request files and comments.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tabpub_publish::{ChangeSet, HostError, PullRequestHost, PullRequestId};

/// Default REST endpoint, used when `GITHUB_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Entries per page when listing pull request files (the API maximum).
const PER_PAGE: usize = 100;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("tabpub/", env!("CARGO_PKG_VERSION"));

/// One element of `GET /repos/{repo}/pulls/{n}/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    /// `added`, `modified`, `removed`, `renamed`, ...
    pub status: String,
}

/// Paths from one page of pull request files, without removed files.
pub fn changed_paths(files: Vec<PullRequestFile>) -> impl Iterator<Item = String> {
    files
        .into_iter()
        .filter(|file| file.status != "removed")
        .map(|file| file.filename)
}

/// Blocking GitHub client scoped to one repository.
///
/// The token is kept in a [`SecretString`] and only exposed when building the
/// `Authorization` header.
#[derive(Debug)]
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    repository: String,
    token: SecretString,
}

impl GitHubClient {
    /// `repository` is the `owner/name` slug.
    pub fn new(api_url: &str, repository: impl Into<String>, token: SecretString) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_owned(),
            repository: repository.into(),
            token,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.repository, tail)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set(
                "Authorization",
                &format!("Bearer {}", self.token.expose_secret()),
            )
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION)
    }

    fn files_page(
        &self,
        pr: PullRequestId,
        page: usize,
    ) -> Result<Vec<PullRequestFile>, HostError> {
        const OP: &str = "list pull request files";
        let response = self
            .request("GET", &self.url(&format!("pulls/{}/files", pr.0)))
            .query("per_page", &PER_PAGE.to_string())
            .query("page", &page.to_string())
            .call()
            .map_err(|e| host_err(OP, e))?;
        response.into_json().map_err(|e| HostError::Decode {
            operation: OP,
            message: e.to_string(),
        })
    }
}

impl PullRequestHost for GitHubClient {
    fn list_changed_files(&self, pr: PullRequestId) -> Result<ChangeSet, HostError> {
        let mut paths = Vec::new();
        let mut page = 1;
        loop {
            let files = self.files_page(pr, page)?;
            let last = files.len() < PER_PAGE;
            paths.extend(changed_paths(files));
            if last {
                break;
            }
            page += 1;
        }
        tracing::debug!(
            pull_request = %pr,
            files = paths.len(),
            pages = page,
            "listed changed files"
        );
        Ok(paths.into_iter().collect())
    }

    fn post_comment(&self, pr: PullRequestId, text: &str) -> Result<(), HostError> {
        self.request("POST", &self.url(&format!("issues/{}/comments", pr.0)))
            .send_json(serde_json::json!({ "body": text }))
            .map_err(|e| host_err("create comment", e))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Map a ureq failure, keeping GitHub's `message` when the body has one.
fn host_err(operation: &'static str, err: ureq::Error) -> HostError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ApiMessage>(&body)
                .map(|m| m.message)
                .unwrap_or(body);
            HostError::Status {
                operation,
                status,
                message,
            }
        }
        ureq::Error::Transport(transport) => HostError::Transport {
            operation,
            source: Box::new(transport),
        },
    }
}
