use std::path::PathBuf;

use ecv_encode::EncodeError;
use ecv_types::{ObjectKey, ShardIndex};
use thiserror::Error;

/// Errors that end a verification run.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{object}: data shard {shard} is missing")]
    MissingDataShard { object: ObjectKey, shard: ShardIndex },

    #[error("{object}: parity shard {shard} is missing")]
    MissingParityShard { object: ObjectKey, shard: ShardIndex },

    #[error("{object}: encoding failed: {source}")]
    Encode {
        object: ObjectKey,
        #[source]
        source: EncodeError,
    },

    #[error("{object}: parity shard {shard} differs from regenerated parity at byte {first_difference}")]
    ParityMismatch {
        object: ObjectKey,
        shard: ShardIndex,
        first_difference: usize,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan task failed: {0}")]
    Scan(String),
}

impl VerifyError {
    /// The object the error is about, if any.
    pub fn object(&self) -> Option<&ObjectKey> {
        match self {
            Self::MissingDataShard { object, .. }
            | Self::MissingParityShard { object, .. }
            | Self::Encode { object, .. }
            | Self::ParityMismatch { object, .. } => Some(object),
            Self::Io { .. } | Self::Scan(_) => None,
        }
    }
}

/// Result alias for verification.
pub type VerifyResult<T> = Result<T, VerifyError>;
