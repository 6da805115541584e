use ecv_transport::TransportError;
use thiserror::Error;

/// Errors from shard queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The command never reached the node.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The object store tool ran but exited non-zero.
    #[error("{operation} failed with exit code {code:?}: {stderr}")]
    ToolFailed {
        operation: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool printed nothing where output was expected.
    #[error("{0} produced no output")]
    EmptyOutput(&'static str),

    /// Output could not be parsed as JSON.
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A shard dump lacks a field needed to place the fragment.
    #[error("shard dump is missing `{0}`")]
    MissingField(&'static str),

    /// A shard dump field holds a value that cannot be used.
    #[error("shard dump field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Object store queries only make sense against storage daemons.
    #[error("{0} is not a storage node")]
    NotAStorageNode(String),

    /// The fragment is not known to this backend.
    #[error("unknown fragment {0}")]
    UnknownFragment(String),
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
