use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid value for sort direction (value: {0}), allowed values are: ASC,DESC")]
    InvalidSortDirection(String),

    #[error("Invalid subscription status: {0}")]
    InvalidSubscription(String),

    #[error("Invalid component or area name: '{0}'")]
    InvalidName(String),

    #[error("A pseudonym cannot be removed, only changed")]
    CannotRemovePseudonym,

    #[error("Custom data is not a valid JSON object: {0}")]
    InvalidCustomData(#[from] serde_json::Error),
}
