//! Shared comment data model and the on-disk log format.
//!
//! A comment log is a JSON array of `Comment` records, one file per entry at
//! `data/comments/<entryId>.json`, tab-indented, insertion order preserved.
//! The key order and indentation are part of the wire contract: published
//! logs are diffed in pull requests and rendered by the site generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One submitted comment record, exactly as stored in the per-entry log.
///
/// Field declaration order matches the serialized key order. `reply_id`
/// holds a comment id on submission but a display name after validation
/// resolves it; stored logs depend on that shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "entryId")]
    pub entry_id: String,
    pub name: String,
    #[serde(rename = "replyThread")]
    pub reply_thread: String,
    #[serde(rename = "replyId")]
    pub reply_id: String,
    #[serde(rename = "replyName")]
    pub reply_name: String,
    pub website: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub body: String,
}

/// Submitted fields of a not-yet-validated comment, as received from the
/// transport layer. Reply fields may be dangling or inconsistent until
/// validation resolves them.
#[derive(Debug, Clone, Default)]
pub struct CommentDraft {
    pub name: String,
    pub body: String,
    pub website: String,
    pub email: String,
    pub reply_thread: String,
    pub reply_id: String,
    pub reply_name: String,
}

impl Comment {
    /// Stamp a draft with a fresh id and submission time.
    pub fn from_draft(entry_id: &str, draft: CommentDraft) -> Self {
        Comment {
            id: next_comment_id(),
            entry_id: entry_id.to_string(),
            name: draft.name,
            reply_thread: draft.reply_thread,
            reply_id: draft.reply_id,
            reply_name: draft.reply_name,
            website: draft.website,
            email: draft.email,
            date: Utc::now(),
            body: draft.body,
        }
    }
}

/// Comment ids are the submission time in nanoseconds since the epoch,
/// lower-hex. Monotonically-increasing-ish and unique within an entry.
fn next_comment_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}

/// Deterministic repository path of an entry's comment log.
pub fn log_path(entry_id: &str) -> String {
    format!("data/comments/{entry_id}.json")
}

/// Serialize a comment log in its canonical form: a JSON array with
/// one-tab indentation and stable key order.
pub fn to_log_bytes(comments: &[Comment]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    comments.serialize(&mut ser)?;
    Ok(buf)
}

/// Parse a comment log. A file that exists but does not parse is an error
/// for the caller to surface, never an empty log.
pub fn from_log_bytes(bytes: &[u8]) -> Result<Vec<Comment>, serde_json::Error> {
    serde_json::from_slice(bytes)
}
