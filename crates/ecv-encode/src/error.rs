use std::path::PathBuf;

use ecv_transport::TransportError;
use ecv_types::ShardIndex;
use thiserror::Error;

/// Errors from erasure-code engines.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The command never reached the node.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The erasure code tool ran but exited non-zero.
    #[error("erasure code tool {operation} failed with exit code {code:?}: {stderr}")]
    ToolFailed {
        operation: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool's output could not be interpreted.
    #[error("unexpected {operation} output: {output:?}")]
    InvalidOutput {
        operation: &'static str,
        output: String,
    },

    /// Stripe unit unusable for this engine.
    #[error("invalid stripe unit {0}")]
    InvalidStripeUnit(u64),

    /// A requested shard index is outside `[0, k + m)`.
    #[error("shard {index} out of range for {total} shards")]
    ShardOutOfRange { index: ShardIndex, total: u32 },

    /// Fewer shards than needed to reconstruct the data.
    #[error("need {needed} shards to decode, have {available}")]
    NotEnoughShards { needed: u32, available: usize },

    /// Shard files that should be the same length are not.
    #[error("shard {index} is {actual} bytes, expected {expected}")]
    ShardLength {
        index: ShardIndex,
        expected: usize,
        actual: usize,
    },

    /// The codec rejected its parameters or input.
    #[error("codec error: {0}")]
    Codec(String),

    /// Reading input or writing output failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for engine operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
