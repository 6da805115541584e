use std::path::{Path, PathBuf};

use ecv_types::{ErasureCodeProfile, ShardSet};

use crate::error::EncodeResult;

/// A reference erasure-code implementation.
///
/// Calls block until the engine finishes; there is no timeout at this
/// layer.
pub trait EncodeEngine: Send + Sync {
    /// Per-shard size for an object of `object_size` bytes under `profile`.
    ///
    /// Deterministic in its inputs. Used as the stripe unit for
    /// [`encode`](Self::encode).
    fn chunk_size(&self, profile: &ErasureCodeProfile, object_size: u64) -> EncodeResult<u64>;

    /// Encode the data shards in `input` and write each shard in `wanted`
    /// to `<input>.<index>`.
    ///
    /// `input` holds the k data shards concatenated in index order; input
    /// shorter than a whole number of stripes (`k * stripe_unit`) is zero
    /// padded. Data shards in `wanted` are written too.
    fn encode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        wanted: &ShardSet,
        input: &Path,
    ) -> EncodeResult<()>;

    /// Reconstruct the data from `<input>.<index>` for each index in
    /// `available` and write it to `<input>.decoded`, returning that path.
    fn decode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        available: &ShardSet,
        input: &Path,
    ) -> EncodeResult<PathBuf>;
}

impl<T: EncodeEngine + ?Sized> EncodeEngine for Box<T> {
    fn chunk_size(&self, profile: &ErasureCodeProfile, object_size: u64) -> EncodeResult<u64> {
        (**self).chunk_size(profile, object_size)
    }

    fn encode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        wanted: &ShardSet,
        input: &Path,
    ) -> EncodeResult<()> {
        (**self).encode(profile, stripe_unit, wanted, input)
    }

    fn decode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        available: &ShardSet,
        input: &Path,
    ) -> EncodeResult<PathBuf> {
        (**self).decode(profile, stripe_unit, available, input)
    }
}
