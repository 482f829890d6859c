//! Runtime configuration, read from the environment.
//!
//! Everything the GitHub client needs is resolved up front into an explicit
//! `Config` value; components receive a constructed client rather than
//! reaching for globals.

use anyhow::{Context, Result, anyhow};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Connection settings for the comment repository.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub token with push access to the comment repository.
    pub token: String,
    pub owner: String,
    pub repo: String,
    /// API root; overridable to point the client at a test server.
    pub api_url: String,
    /// Base branch submissions default to when the caller names none.
    pub default_base: String,
}

impl Config {
    /// Read configuration from `COMMENTGATE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var("COMMENTGATE_TOKEN").context("COMMENTGATE_TOKEN is not set")?;
        if !is_valid_github_token(&token) {
            return Err(anyhow!(
                "COMMENTGATE_TOKEN does not look like a GitHub token (unknown prefix)"
            ));
        }
        let slug = std::env::var("COMMENTGATE_REPO").context("COMMENTGATE_REPO is not set")?;
        let (owner, repo) = parse_repo_slug(&slug)
            .ok_or_else(|| anyhow!("COMMENTGATE_REPO must be owner/repo, got {slug:?}"))?;
        let api_url = std::env::var("COMMENTGATE_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let default_base =
            std::env::var("COMMENTGATE_BASE").unwrap_or_else(|_| "main".to_string());
        Ok(Self {
            token,
            owner,
            repo,
            api_url,
            default_base,
        })
    }
}

/// Validate that a string looks like a GitHub token based on its prefix.
///
/// Format check only — it does not verify the token is active or has the
/// right scopes. Catches pasted-garbage configuration before any network
/// call.
pub fn is_valid_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    GITHUB_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Split an `owner/repo` slug (exactly two non-empty segments).
pub fn parse_repo_slug(slug: &str) -> Option<(String, String)> {
    let (owner, repo) = slug.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
