use std::collections::BTreeMap;

use domain::{CommentId, DomainError};
use thiserror::Error;

/// Field name to message, as returned by the validation hooks.
pub type FieldErrors = BTreeMap<String, String>;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Comments are disabled on this site")]
    CommentsDisabled,

    #[error("Unknown comment area {component}/{area}")]
    UnknownArea { component: String, area: String },

    #[error("Page size {requested} exceeds the maximum of {max}")]
    PageSizeTooLarge { requested: i64, max: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed for comment {comment_id:?}: {errors:?}")]
    Validation {
        comment_id: Option<CommentId>,
        errors: FieldErrors,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Comment {0} not found")]
    CommentNotFound(CommentId),

    #[error("Comments not found: {0:?}")]
    MissingComments(Vec<CommentId>),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn validation(comment_id: Option<CommentId>, field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        EngineError::Validation { comment_id, errors }
    }
}
