//! Typed error hierarchy for the comment submission workflow.
//!
//! Two top-level enums cover the two failure surfaces:
//! - `HostError` — repository-host (GitHub) request failures
//! - `SubmitError` — workflow failures, split into client fault vs server fault

use thiserror::Error;

/// Errors from the repository host client.
///
/// The variants callers branch on are split out; everything else collapses
/// into `Request`/`Status`/`Decode`.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host reported 404 for this resource. Callers decide whether that
    /// is an error: an absent comment file or branch ref is a valid state.
    #[error("GitHub returned 404 for {resource}")]
    NotFound { resource: String },

    /// Creating a ref or pull request failed because an equivalent one
    /// already exists. A lost creation race lands here and is treated as
    /// success by the branch/PR manager.
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    /// A contents write was rejected because the file's digest no longer
    /// matches the one supplied as the compare-and-swap precondition.
    #[error("write to {path} rejected: content changed since it was read")]
    CasConflict { path: String },

    #[error("GitHub request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub returned {status} for {endpoint}: {message}")]
    Status {
        status: u16,
        endpoint: String,
        message: String,
    },

    #[error("failed to decode GitHub response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// Errors from a single comment submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The submission itself is at fault (missing fields, dangling reply
    /// references, missing entry id). Raised strictly before any write, so
    /// no remote state has been mutated.
    #[error("{0}")]
    Client(String),

    /// The comment log changed between read and write. The submission is
    /// lost; the caller may prompt for re-submission. No retry is performed.
    #[error("comment file {path} changed since it was read")]
    Conflict { path: String },

    /// Comment log (de)serialization failure. A log that exists but does
    /// not parse is fatal, never treated as empty.
    #[error("failed to {action} comment log for {entry_id}: {source}")]
    Codec {
        action: &'static str,
        entry_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SubmitError {
    /// The client-fault/server-fault split the transport layer maps onto
    /// 4xx/5xx responses.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, SubmitError::Client(_))
    }
}

/// Wire shape of a failed submission, as reported to the transport layer.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFailure {
    pub error_message: String,
    pub is_client_fault: bool,
}

impl From<&SubmitError> for SubmissionFailure {
    fn from(err: &SubmitError) -> Self {
        SubmissionFailure {
            error_message: err.to_string(),
            is_client_fault: err.is_client_fault(),
        }
    }
}
