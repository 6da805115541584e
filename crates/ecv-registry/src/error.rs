use ecv_transport::TransportError;
use ecv_types::{ObjectKey, ShardIndex, TypeError};
use thiserror::Error;

/// Errors from cluster metadata queries.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{0}` produced no output")]
    EmptyOutput(String),

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no pool with id {0}")]
    UnknownPool(i64),

    #[error("pool {0} has no erasure code profile")]
    NotErasureCoded(String),

    #[error("no erasure code profile named {0}")]
    UnknownProfile(String),

    #[error("invalid profile: {0}")]
    Profile(#[from] TypeError),
}

/// Result alias for metadata queries.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The object's profile could not be resolved; it was not created.
    #[error("cannot resolve profile of pool {pool} for {key}: {source}")]
    ProfileResolution {
        key: ObjectKey,
        pool: i64,
        #[source]
        source: MetadataError,
    },

    /// Shard index outside `[0, k + m)`.
    #[error("{key}: shard {index} out of range for {total} shards")]
    ShardOutOfRange {
        key: ObjectKey,
        index: ShardIndex,
        total: u32,
    },

    /// Shard bytes do not match the object's chunk size.
    #[error("{key}: shard {index} is {actual} bytes, chunk size is {expected}")]
    ShardLengthMismatch {
        key: ObjectKey,
        index: ShardIndex,
        expected: u64,
        actual: u64,
    },
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
