use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("profile is missing required parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("invalid profile parameter {key}={value}: {reason}")]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },

    #[error("malformed profile entry: {0}")]
    MalformedProfile(String),

    #[error("invalid node reference: {0}")]
    InvalidNode(String),
}
