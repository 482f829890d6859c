//! Branch and pull-request management for pending comments.
//!
//! Every entry gets one long-lived working branch forked from the base
//! branch, and one open pull request gating its comments into the published
//! site. Neither is tracked in any table: the branch is found by its
//! deterministic name and the PR by title markers, so both operations are
//! idempotent and safe to re-run after a partial failure.

use tracing::{info, warn};

use crate::errors::{HostError, SubmitError};
use crate::github::{NewPullRequest, PullRequest, RepoHost};

/// Fixed body of the auto-generated moderation PR.
const PR_BODY: &str = "This is an auto generated PR for comments.";

/// Current working-branch naming convention.
pub fn branch_name(base: &str, entry_id: &str) -> String {
    format!("cmt_{base}_{entry_id}")
}

/// Naming convention of an earlier deployment. Entries that already have a
/// branch under this name keep accumulating comments on it.
fn legacy_branch_name(base: &str, entry_id: &str) -> String {
    format!("comment_{base}_{entry_id}")
}

fn pr_title(base: &str, entry_id: &str) -> String {
    format!("[{base}] Comments on post {entry_id}")
}

/// Whether an open PR title identifies this (base, entry) pair. Accepts the
/// marked form and the unmarked title an earlier deployment used.
fn title_matches(title: &str, base: &str, entry_id: &str) -> bool {
    (title.contains(&format!("[{base}]")) && title.contains(&format!("post {entry_id}")))
        || title == format!("Comment on {entry_id}")
}

/// Ensure the working branch for `(base, entry_id)` exists and return its
/// name. An existing branch (current or legacy naming) is returned without
/// mutation; otherwise the branch is forked from the base branch's current
/// commit. Losing the creation race to a concurrent submission is success.
pub async fn ensure_branch(
    host: &dyn RepoHost,
    base: &str,
    entry_id: &str,
) -> Result<String, SubmitError> {
    let name = branch_name(base, entry_id);
    match host.get_ref(&name).await {
        Ok(_) => return Ok(name),
        Err(HostError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let legacy = legacy_branch_name(base, entry_id);
    match host.get_ref(&legacy).await {
        Ok(_) => return Ok(legacy),
        Err(HostError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    // A missing base branch is fatal; the NotFound propagates as-is.
    let base_ref = host.get_ref(base).await?;
    match host.create_ref(&name, &base_ref.sha).await {
        Ok(()) => {
            info!(branch = %name, %base, "created comment branch");
            Ok(name)
        }
        Err(HostError::AlreadyExists { .. }) => {
            warn!(branch = %name, "lost branch creation race; reusing existing branch");
            Ok(name)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure exactly one open pull request gates `branch` into `base` and
/// return it. Matching is by title convention; if creation loses a race to
/// a concurrent submission, the winner's PR is re-listed and returned.
pub async fn ensure_pull_request(
    host: &dyn RepoHost,
    base: &str,
    entry_id: &str,
    branch: &str,
) -> Result<PullRequest, SubmitError> {
    if let Some(pr) = find_open(host, base, entry_id, branch).await? {
        return Ok(pr);
    }

    let req = NewPullRequest {
        title: pr_title(base, entry_id),
        head: branch.to_string(),
        base: base.to_string(),
        body: PR_BODY.to_string(),
    };
    match host.create_pull_request(&req).await {
        Ok(pr) => {
            info!(pr = pr.number, %branch, "opened comment pull request");
            Ok(pr)
        }
        Err(HostError::AlreadyExists { .. }) => {
            warn!(%branch, "lost pull request creation race; re-listing");
            find_open(host, base, entry_id, branch)
                .await?
                .ok_or_else(|| {
                    // The host claims it exists but won't show it to us.
                    SubmitError::Host(HostError::Status {
                        status: 422,
                        endpoint: "pulls".to_string(),
                        message: format!(
                            "pull request for {branch} reported as existing but not listed"
                        ),
                    })
                })
        }
        Err(e) => Err(e.into()),
    }
}

async fn find_open(
    host: &dyn RepoHost,
    base: &str,
    entry_id: &str,
    branch: &str,
) -> Result<Option<PullRequest>, SubmitError> {
    let open = host.list_pull_requests(base, branch).await?;
    Ok(open
        .into_iter()
        .find(|pr| title_matches(&pr.title, base, entry_id)))
}
