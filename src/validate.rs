//! Pure validation and reply-thread resolution for a draft comment.
//!
//! Rules run in a fixed order and the first failure wins, so the error a
//! commenter sees for a given bad submission never changes. No I/O: the
//! rules see only the draft and a snapshot of the existing log.

use crate::comment::Comment;
use crate::errors::SubmitError;

type Rule = fn(&mut Comment, &[Comment]) -> Result<(), &'static str>;

/// Evaluation order is load-bearing; see the error-precedence tests below.
const RULES: &[Rule] = &[require_name, require_body, resolve_reply];

/// Validate `draft` against the existing log, resolving its reply
/// references in place. Does not append to `existing`.
pub fn validate(draft: &mut Comment, existing: &[Comment]) -> Result<(), SubmitError> {
    for rule in RULES {
        rule(draft, existing).map_err(|msg| SubmitError::Client(msg.to_string()))?;
    }
    Ok(())
}

fn require_name(draft: &mut Comment, _existing: &[Comment]) -> Result<(), &'static str> {
    if draft.name.is_empty() {
        return Err("you must provide a name");
    }
    Ok(())
}

fn require_body(draft: &mut Comment, _existing: &[Comment]) -> Result<(), &'static str> {
    if draft.body.is_empty() {
        return Err("you must provide a comment body");
    }
    Ok(())
}

fn resolve_reply(draft: &mut Comment, existing: &[Comment]) -> Result<(), &'static str> {
    if draft.reply_thread.is_empty() {
        // Top-level comment; discard any stray reply fields.
        draft.reply_id.clear();
        draft.reply_name.clear();
        return Ok(());
    }

    let thread = existing
        .iter()
        .find(|c| c.id == draft.reply_thread)
        .ok_or("the thread you are replying to does not exist")?;

    if draft.reply_id.is_empty() {
        // Replying to the thread root.
        draft.reply_name = thread.name.clone();
        return Ok(());
    }

    let target = existing
        .iter()
        .find(|c| c.id == draft.reply_id)
        .ok_or("the comment you are replying to does not exist")?;

    // The field deliberately ends up holding the target's display name
    // rather than its id; published logs depend on this shape.
    draft.reply_id = target.name.clone();
    Ok(())
}
