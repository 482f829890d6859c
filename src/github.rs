//! Repository-host client: the `RepoHost` seam and its GitHub implementation.
//!
//! The workflow only needs six operations (ref lookup/creation, PR
//! list/creation, file get/put), so they are an explicit trait rather than a
//! full API binding. Real implementation: `GitHubClient` over the REST v3
//! git/pulls/contents endpoints. Test double: `mock::MockRepoHost`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::errors::HostError;

/// A resolved git ref.
#[derive(Debug, Clone)]
pub struct GitRef {
    pub sha: String,
}

/// An open pull request (subset of fields we care about).
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
}

/// Request to open a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// A file fetched from a branch: decoded bytes plus the blob digest the
/// host reported at read time. The digest is the compare-and-swap token
/// for a later write.
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub content: Vec<u8>,
    pub sha: String,
    pub html_url: String,
}

/// A file write request. `prior_sha` present makes the write conditional:
/// the host rejects it if the file's digest no longer matches.
#[derive(Debug, Clone)]
pub struct FileWrite {
    pub message: String,
    pub content: Vec<u8>,
    pub prior_sha: Option<String>,
}

/// Reference to the content produced by a successful write.
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub html_url: String,
}

/// Abstraction over the repository host for testability.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Resolve a branch ref. `NotFound` means the branch does not exist.
    async fn get_ref(&self, branch: &str) -> Result<GitRef, HostError>;

    /// Create a branch pointing at `sha`. `AlreadyExists` means another
    /// writer won the creation race.
    async fn create_ref(&self, branch: &str, sha: &str) -> Result<(), HostError>;

    /// List open pull requests from `head_branch` into `base`.
    async fn list_pull_requests(
        &self,
        base: &str,
        head_branch: &str,
    ) -> Result<Vec<PullRequest>, HostError>;

    /// Open a pull request. `AlreadyExists` means an equivalent PR is
    /// already open.
    async fn create_pull_request(&self, req: &NewPullRequest) -> Result<PullRequest, HostError>;

    /// Fetch a file from a branch. `NotFound` means the file is absent.
    async fn get_file(&self, path: &str, branch: &str) -> Result<RepoFile, HostError>;

    /// Create or update a file on a branch. `CasConflict` means the
    /// conditional write lost.
    async fn put_file(
        &self,
        path: &str,
        branch: &str,
        write: &FileWrite,
    ) -> Result<WrittenFile, HostError>;
}

const USER_AGENT: &str = "commentgate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// GitHub REST v3 implementation of `RepoHost`, scoped to one repository.
///
/// Constructed explicitly from `Config` and injected where needed; there is
/// no shared global client.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

// ── Wire response shapes ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    content: Option<String>,
    sha: String,
    html_url: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    html_url: String,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    full_ref: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        use anyhow::Context;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, tail
        )
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HostError> {
        debug!(%endpoint, "GitHub request");
        builder
            .send()
            .await
            .map_err(|source| HostError::Request {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    /// Map a non-success response to a `HostError`. 404 becomes `NotFound`;
    /// everything else is a generic status error carrying the (truncated)
    /// body for the log.
    async fn fail(endpoint: &str, resp: reqwest::Response) -> HostError {
        let status = resp.status().as_u16();
        let message = truncate(resp.text().await.unwrap_or_default());
        if status == 404 {
            return HostError::NotFound {
                resource: endpoint.to_string(),
            };
        }
        HostError::Status {
            status,
            endpoint: endpoint.to_string(),
            message,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, HostError> {
        resp.json::<T>().await.map_err(|e| HostError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

fn truncate(mut message: String) -> String {
    const LIMIT: usize = 300;
    if message.len() > LIMIT {
        let mut end = LIMIT;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn get_ref(&self, branch: &str) -> Result<GitRef, HostError> {
        let endpoint = format!("git/ref/heads/{branch}");
        let url = self.repo_url(&endpoint);
        let resp = self.send(&endpoint, self.request(Method::GET, &url)).await?;
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        let body: RefResponse = Self::decode(&endpoint, resp).await?;
        Ok(GitRef {
            sha: body.object.sha,
        })
    }

    async fn create_ref(&self, branch: &str, sha: &str) -> Result<(), HostError> {
        let endpoint = "git/refs".to_string();
        let url = self.repo_url(&endpoint);
        let body = CreateRefBody {
            full_ref: format!("refs/heads/{branch}"),
            sha,
        };
        let resp = self
            .send(&endpoint, self.request(Method::POST, &url).json(&body))
            .await?;
        // 422 here means the ref came into existence since we looked.
        if resp.status().as_u16() == 422 {
            return Err(HostError::AlreadyExists {
                resource: format!("ref {branch}"),
            });
        }
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        base: &str,
        head_branch: &str,
    ) -> Result<Vec<PullRequest>, HostError> {
        let endpoint = "pulls".to_string();
        let url = self.repo_url(&endpoint);
        let head = format!("{}:{}", self.owner, head_branch);
        let resp = self
            .send(
                &endpoint,
                self.request(Method::GET, &url).query(&[
                    ("state", "open"),
                    ("base", base),
                    ("head", head.as_str()),
                ]),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        Self::decode(&endpoint, resp).await
    }

    async fn create_pull_request(&self, req: &NewPullRequest) -> Result<PullRequest, HostError> {
        let endpoint = "pulls".to_string();
        let url = self.repo_url(&endpoint);
        let resp = self
            .send(&endpoint, self.request(Method::POST, &url).json(req))
            .await?;
        if resp.status().as_u16() == 422 {
            return Err(HostError::AlreadyExists {
                resource: format!("pull request {} -> {}", req.head, req.base),
            });
        }
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        Self::decode(&endpoint, resp).await
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<RepoFile, HostError> {
        let endpoint = format!("contents/{path}");
        let url = self.repo_url(&endpoint);
        let resp = self
            .send(
                &endpoint,
                self.request(Method::GET, &url).query(&[("ref", branch)]),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        let body: ContentResponse = Self::decode(&endpoint, resp).await?;
        let encoded: String = body
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let content = BASE64.decode(encoded).map_err(|e| HostError::Decode {
            endpoint: endpoint.clone(),
            message: format!("invalid base64 file content: {e}"),
        })?;
        Ok(RepoFile {
            content,
            sha: body.sha,
            html_url: body.html_url,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        branch: &str,
        write: &FileWrite,
    ) -> Result<WrittenFile, HostError> {
        let endpoint = format!("contents/{path}");
        let url = self.repo_url(&endpoint);
        let body = PutFileBody {
            message: &write.message,
            content: BASE64.encode(&write.content),
            branch,
            sha: write.prior_sha.as_deref(),
        };
        let resp = self
            .send(&endpoint, self.request(Method::PUT, &url).json(&body))
            .await?;
        let status = resp.status().as_u16();
        // 409 is the documented conflict status; in practice a stale sha can
        // also surface as a 422 validation error mentioning the mismatch.
        if status == 409 || status == 422 {
            return Err(HostError::CasConflict {
                path: path.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(Self::fail(&endpoint, resp).await);
        }
        let body: PutResponse = Self::decode(&endpoint, resp).await?;
        Ok(WrittenFile {
            html_url: body.content.html_url,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ref_body_uses_full_ref_name() {
        let body = CreateRefBody {
            full_ref: "refs/heads/cmt_main_hello".to_string(),
            sha: "abc123",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"ref":"refs/heads/cmt_main_hello","sha":"abc123"}"#);
    }

    #[test]
    fn test_put_file_body_omits_sha_when_absent() {
        let body = PutFileBody {
            message: "New comment for hello",
            content: "W10=".to_string(),
            branch: "cmt_main_hello",
            sha: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("\"sha\""));

        let body = PutFileBody { sha: Some("abc"), ..body };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"sha\":\"abc\""));
    }

    #[test]
    fn test_content_response_deserialize() {
        let json = r#"{
            "content": "W1xuXQ==\n",
            "sha": "3d21ec5",
            "html_url": "https://github.com/o/r/blob/b/data/comments/x.json",
            "encoding": "base64"
        }"#;
        let resp: ContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.sha, "3d21ec5");
        assert!(resp.content.is_some());
    }

    #[test]
    fn test_pull_request_deserialize() {
        let json = r#"{
            "number": 7,
            "title": "[main] Comments on post hello-world",
            "html_url": "https://github.com/o/r/pull/7",
            "state": "open"
        }"#;
        let pr: PullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(pr.number, 7);
        assert!(pr.title.contains("[main]"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let short = truncate("short".to_string());
        assert_eq!(short, "short");
        let long = truncate("é".repeat(400));
        assert!(long.len() <= 300);
        assert!(long.chars().all(|c| c == 'é'));
    }
}
