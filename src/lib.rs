pub mod branch;
pub mod comment;
pub mod config;
pub mod errors;
pub mod github;
pub mod store;
pub mod submit;
pub mod validate;

pub use comment::{Comment, CommentDraft};
pub use errors::{SubmissionFailure, SubmitError};
pub use submit::{SubmissionOutcome, submit};
