//! Submission orchestrator: the one entry point that takes a draft comment
//! and lands it on the entry's moderation pull request.
//!
//! Sequence: ensure working branch → load log → validate/thread the draft →
//! append → conditional commit → ensure pull request → report links. Each
//! submission is an independent, stateless unit of work; the remote
//! repository does all the coordination.

use serde::Serialize;

use crate::branch::{ensure_branch, ensure_pull_request};
use crate::comment::{Comment, CommentDraft};
use crate::errors::SubmitError;
use crate::github::RepoHost;
use crate::store;
use crate::validate::validate;

/// A successful submission, in the shape the transport layer returns to
/// the commenter.
#[derive(Debug, Serialize)]
pub struct SubmissionOutcome {
    pub comment: Comment,
    pub links: SubmissionLinks,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLinks {
    /// The committed comment file on the working branch.
    pub comment_file_url: String,
    /// The moderation pull request gating this entry's comments.
    pub pull_request_url: String,
}

/// Submit `draft` as a comment on `entry_id`, gated on `base`.
///
/// Validation failures surface before anything is written. Branch and PR
/// creation may outlive a failed commit; both are idempotent, so the next
/// attempt of the same submission simply reuses them.
pub async fn submit(
    host: &dyn RepoHost,
    base: &str,
    entry_id: &str,
    draft: CommentDraft,
) -> Result<SubmissionOutcome, SubmitError> {
    if entry_id.is_empty() {
        return Err(SubmitError::Client("missing entry id".to_string()));
    }

    let branch = ensure_branch(host, base, entry_id).await?;
    let (mut comments, prior) = store::load(host, &branch, entry_id).await?;

    let mut comment = Comment::from_draft(entry_id, draft);
    validate(&mut comment, &comments)?;
    comments.push(comment.clone());

    let comment_file_url = store::commit(host, &branch, entry_id, &comments, prior.as_ref()).await?;
    let pull_request = ensure_pull_request(host, base, entry_id, &branch).await?;

    Ok(SubmissionOutcome {
        comment,
        links: SubmissionLinks {
            comment_file_url,
            pull_request_url: pull_request.html_url,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{from_log_bytes, log_path};
    use crate::github::mock::MockRepoHost;
    use std::sync::atomic::Ordering;

    const ENTRY: &str = "hello-world";
    const BRANCH: &str = "cmt_main_hello-world";

    fn host_with_main() -> MockRepoHost {
        MockRepoHost::new().with_branch("main", "abc123")
    }

    fn draft(name: &str, body: &str) -> CommentDraft {
        CommentDraft {
            name: name.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    fn stored_log(host: &MockRepoHost) -> Vec<Comment> {
        let bytes = host.file_bytes(BRANCH, &log_path(ENTRY)).unwrap();
        from_log_bytes(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_first_comment_on_new_entry() {
        // Scenario: empty prior state, one valid top-level comment.
        let host = host_with_main();
        let outcome = submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap();

        // Branch forked from main.
        assert!(host.has_branch(BRANCH));
        assert_eq!(host.get_ref(BRANCH).await.unwrap().sha, "abc123");

        // One-record log with all reply fields empty.
        let log = stored_log(&host);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].name, "Alice");
        assert_eq!(log[0].entry_id, ENTRY);
        assert_eq!(log[0].reply_thread, "");
        assert_eq!(log[0].reply_id, "");
        assert_eq!(log[0].reply_name, "");

        // PR opened with both title markers.
        assert_eq!(host.open_pr_count(), 1);

        // Response carries the comment and both links.
        assert_eq!(outcome.comment.name, "Alice");
        assert!(outcome.links.comment_file_url.contains(&log_path(ENTRY)));
        assert!(outcome.links.pull_request_url.contains("/pull/"));
    }

    #[tokio::test]
    async fn test_reply_threads_onto_existing_comment() {
        // Scenario: second submission replying to the first.
        let host = host_with_main();
        let first = submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap();

        let mut reply = draft("Bob", "reply");
        reply.reply_thread = first.comment.id.clone();
        submit(&host, "main", ENTRY, reply).await.unwrap();

        let log = stored_log(&host);
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].name, "Bob");
        assert_eq!(log[1].reply_thread, first.comment.id);
        assert_eq!(log[1].reply_name, "Alice");
        assert_eq!(log[1].reply_id, "");

        // No second branch or PR.
        assert_eq!(host.create_ref_calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.create_pr_calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.open_pr_count(), 1);
    }

    #[tokio::test]
    async fn test_reply_to_specific_comment_resolves_display_name() {
        let host = host_with_main();
        let first = submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap();
        let mut second = draft("Carol", "also here");
        second.reply_thread = first.comment.id.clone();
        let second = submit(&host, "main", ENTRY, second).await.unwrap();

        let mut third = draft("Bob", "answering Carol");
        third.reply_thread = first.comment.id.clone();
        third.reply_id = second.comment.id.clone();
        let third = submit(&host, "main", ENTRY, third).await.unwrap();

        assert_eq!(third.comment.reply_id, "Carol");
        assert_eq!(third.comment.reply_thread, first.comment.id);
    }

    #[tokio::test]
    async fn test_dangling_thread_rejected_without_write() {
        let host = host_with_main();
        submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap();
        let before = host.file_bytes(BRANCH, &log_path(ENTRY)).unwrap();

        let mut bad = draft("Bob", "reply");
        bad.reply_thread = "no-such-id".to_string();
        let err = submit(&host, "main", ENTRY, bad).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(
            err.to_string(),
            "the thread you are replying to does not exist"
        );
        // The log file was not modified.
        assert_eq!(host.file_bytes(BRANCH, &log_path(ENTRY)).unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_entry_id_rejected_before_any_host_call() {
        let host = host_with_main();
        let err = submit(&host, "main", "", draft("Alice", "hi"))
            .await
            .unwrap_err();
        assert!(err.is_client_fault());
        assert_eq!(err.to_string(), "missing entry id");
        assert_eq!(host.create_ref_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_draft_leaves_no_log_behind() {
        // Validation failure on a brand-new entry: the branch may exist
        // (idempotent, reused later) but no comment file is written.
        let host = host_with_main();
        let err = submit(&host, "main", ENTRY, draft("", "hi"))
            .await
            .unwrap_err();
        assert!(err.is_client_fault());
        assert!(host.file_bytes(BRANCH, &log_path(ENTRY)).is_none());
        assert_eq!(host.open_pr_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_log_aborts_submission() {
        let host = host_with_main();
        host.seed_file(BRANCH, &log_path(ENTRY), b"not json");
        // Need the branch to exist so load is reached.
        let host = host.with_branch(BRANCH, "abc123");

        let err = submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap_err();
        assert!(!err.is_client_fault());
        assert!(matches!(err, SubmitError::Codec { action: "parse", .. }));
        // The corrupt file is left untouched for a human to inspect.
        assert_eq!(
            host.file_bytes(BRANCH, &log_path(ENTRY)).unwrap(),
            b"not json"
        );
    }

    #[tokio::test]
    async fn test_comments_accumulate_across_environments_independently() {
        let host = MockRepoHost::new()
            .with_branch("main", "abc123")
            .with_branch("dev", "def456");
        submit(&host, "main", ENTRY, draft("Alice", "hi"))
            .await
            .unwrap();
        submit(&host, "dev", ENTRY, draft("Bob", "testing"))
            .await
            .unwrap();

        assert!(host.has_branch("cmt_main_hello-world"));
        assert!(host.has_branch("cmt_dev_hello-world"));
        assert_eq!(host.open_pr_count(), 2);
        assert_eq!(stored_log(&host).len(), 1);
    }
}
