use std::fs;

use ecv_encode::{shard_path, EncodeEngine, EncodeError};
use ecv_registry::{EcObject, ObjectRegistry};
use ecv_types::{ShardIndex, ShardSet};
use tracing::{debug, error, info};

use crate::error::{VerifyError, VerifyResult};
use crate::report::{ObjectReport, ParityDigest, VerificationSummary};
use crate::scratch::{io_error, ScratchLayout};

/// Regenerates parity with an [`EncodeEngine`] and compares it with the
/// parity held by the cluster.
pub struct VerificationEngine<E> {
    encoder: E,
    scratch: ScratchLayout,
}

impl<E: EncodeEngine> VerificationEngine<E> {
    pub fn new(encoder: E, scratch: ScratchLayout) -> Self {
        Self { encoder, scratch }
    }

    pub fn scratch(&self) -> &ScratchLayout {
        &self.scratch
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Verify one object.
    ///
    /// All `k` data shards and all `m` parity shards must be present. The
    /// data shards are concatenated into the object's scratch blob, encoded
    /// to every shard index, and the stored parity shards `k..k+m` are
    /// compared with the encoder's output in index order.
    pub fn verify_object(&self, object: &EcObject) -> VerifyResult<ObjectReport> {
        let key = object.key();
        let profile = object.profile();

        if let Some(&shard) = object.missing_data().first() {
            return Err(VerifyError::MissingDataShard {
                object: key.clone(),
                shard,
            });
        }
        if let Some(&shard) = object.missing_parity().first() {
            return Err(VerifyError::MissingParityShard {
                object: key.clone(),
                shard,
            });
        }
        let data = object.data_bytes().ok_or_else(|| VerifyError::MissingDataShard {
            object: key.clone(),
            shard: ShardIndex::new(0),
        })?;

        let input = self.scratch.write_input(key, &data)?;
        let encode_err = |source: EncodeError| VerifyError::Encode {
            object: key.clone(),
            source,
        };
        let stripe_unit = self
            .encoder
            .chunk_size(profile, object.object_size())
            .map_err(encode_err)?;
        self.encoder
            .encode(profile, stripe_unit, &ShardSet::dense(profile.shard_count()), &input)
            .map_err(encode_err)?;
        debug!(object = %key, stripe_unit, input = %input.display(), "encoded object");

        let mut parity = Vec::with_capacity(profile.m() as usize);
        for (shard, slot) in object.parity_slots() {
            let stored = slot.bytes().ok_or_else(|| VerifyError::MissingParityShard {
                object: key.clone(),
                shard,
            })?;
            let path = shard_path(&input, shard);
            let regenerated = fs::read(&path).map_err(|source| io_error(&path, source))?;
            if let Some(first_difference) = first_difference(stored, &regenerated) {
                error!(
                    object = %key,
                    shard = %shard,
                    first_difference,
                    stored_len = stored.len(),
                    regenerated_len = regenerated.len(),
                    "parity mismatch"
                );
                return Err(VerifyError::ParityMismatch {
                    object: key.clone(),
                    shard,
                    first_difference,
                });
            }
            parity.push(ParityDigest::of(shard, stored));
        }

        info!(object = %key, shards = parity.len(), "parity consistent");
        Ok(ObjectReport {
            object: key.clone(),
            profile: profile.to_tool_string(),
            object_size: object.object_size(),
            stripe_unit,
            parity,
        })
    }

    /// Verify every object in the registry, in key order, stopping at the
    /// first failure.
    pub fn verify_all(&self, registry: &ObjectRegistry) -> VerifyResult<VerificationSummary> {
        let mut summary = VerificationSummary::default();
        for object in registry.iter() {
            summary.objects.push(self.verify_object(object)?);
        }
        info!(
            objects = summary.objects_checked(),
            shards = summary.shards_compared(),
            "verification passed"
        );
        Ok(summary)
    }
}

/// Offset of the first byte at which `a` and `b` differ. A length
/// difference counts as a difference at the end of the shorter slice.
fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
