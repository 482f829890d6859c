//! Comment log access: read the current log from the working branch and
//! write an updated one back under optimistic concurrency control.
//!
//! The compare-and-swap token is the blob digest the host reported when the
//! file was read. A conditional write with a stale digest fails with a
//! distinct conflict error; nothing here retries or merges.

use tracing::{debug, info};

use crate::comment::{Comment, from_log_bytes, log_path, to_log_bytes};
use crate::errors::{HostError, SubmitError};
use crate::github::{FileWrite, RepoHost};

/// The comment file as read: raw bytes plus the digest observed at read
/// time. Absent file = no `PriorFile`, and the next write is unconditional.
#[derive(Debug, Clone)]
pub struct PriorFile {
    pub bytes: Vec<u8>,
    pub sha: String,
}

/// Load the comment log for `entry_id` from `branch`.
///
/// An absent file is a valid empty state. A file that exists but fails to
/// parse is fatal — never treated as empty, since an unconditional rewrite
/// would silently drop every published comment.
pub async fn load(
    host: &dyn RepoHost,
    branch: &str,
    entry_id: &str,
) -> Result<(Vec<Comment>, Option<PriorFile>), SubmitError> {
    let path = log_path(entry_id);
    let file = match host.get_file(&path, branch).await {
        Ok(file) => file,
        Err(HostError::NotFound { .. }) => {
            debug!(%path, %branch, "no comment log yet; starting empty");
            return Ok((Vec::new(), None));
        }
        Err(e) => return Err(e.into()),
    };

    let comments = from_log_bytes(&file.content).map_err(|source| SubmitError::Codec {
        action: "parse",
        entry_id: entry_id.to_string(),
        source,
    })?;
    debug!(%path, count = comments.len(), sha = %file.sha, "loaded comment log");
    Ok((
        comments,
        Some(PriorFile {
            bytes: file.content,
            sha: file.sha,
        }),
    ))
}

/// Serialize `comments` and write them to the log file on `branch`,
/// conditional on `prior`'s digest when the file existed at read time.
/// Returns the content URL of the written file.
pub async fn commit(
    host: &dyn RepoHost,
    branch: &str,
    entry_id: &str,
    comments: &[Comment],
    prior: Option<&PriorFile>,
) -> Result<String, SubmitError> {
    let path = log_path(entry_id);
    let content = to_log_bytes(comments).map_err(|source| SubmitError::Codec {
        action: "serialize",
        entry_id: entry_id.to_string(),
        source,
    })?;
    let write = FileWrite {
        message: format!("New comment for {entry_id}"),
        content,
        prior_sha: prior.map(|p| p.sha.clone()),
    };
    debug!(
        %path,
        prior_len = prior.map(|p| p.bytes.len()),
        "writing comment log"
    );
    match host.put_file(&path, branch, &write).await {
        Ok(written) => {
            info!(%path, %branch, count = comments.len(), "committed comment log");
            Ok(written.html_url)
        }
        Err(HostError::CasConflict { .. }) => Err(SubmitError::Conflict { path }),
        Err(e) => Err(e.into()),
    }
}
