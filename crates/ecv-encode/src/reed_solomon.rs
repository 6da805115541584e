use std::fs;
use std::path::{Path, PathBuf};

use ecv_types::{ErasureCodeProfile, ShardIndex, ShardSet};
use reed_solomon_simd::{ReedSolomonDecoder, ReedSolomonEncoder};
use tracing::debug;

use crate::error::{EncodeError, EncodeResult};
use crate::layout::{decoded_path, shard_path};
use crate::traits::EncodeEngine;

/// Bytes of alignment per data shard when sizing chunks.
const CHUNK_ALIGNMENT: u64 = 32;

/// In-process systematic Reed-Solomon engine.
///
/// Data shards are the input split into stripe-unit chunks; parity shards
/// are the codec's recovery shards. Objects longer than one stripe are
/// encoded stripe by stripe and each shard file holds its chunks from every
/// stripe in order.
///
/// The profile's `plugin` and `technique` are not interpreted, so parity
/// only agrees with shards produced by this same codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReedSolomonEngine;

impl ReedSolomonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Encode one object held in memory, returning all `k + m` shards.
    pub fn encode_bytes(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        data: &[u8],
    ) -> EncodeResult<Vec<Vec<u8>>> {
        let su = checked_stripe_unit(stripe_unit)?;
        let k = profile.k() as usize;
        let m = profile.m() as usize;
        let stripe_width = su * k;

        let mut padded = data.to_vec();
        let stripes = padded.len().div_ceil(stripe_width).max(1);
        padded.resize(stripes * stripe_width, 0);

        let mut shards = vec![Vec::with_capacity(stripes * su); k + m];
        for stripe in padded.chunks(stripe_width) {
            let mut encoder = ReedSolomonEncoder::new(k, m, su).map_err(codec)?;
            for (i, chunk) in stripe.chunks(su).enumerate() {
                encoder.add_original_shard(chunk).map_err(codec)?;
                shards[i].extend_from_slice(chunk);
            }
            let result = encoder.encode().map_err(codec)?;
            for (j, recovery) in result.recovery_iter().enumerate() {
                shards[k + j].extend_from_slice(recovery);
            }
        }
        Ok(shards)
    }

    /// Reconstruct the data from at least k shards held in memory.
    pub fn decode_shards(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        shards: &[(ShardIndex, Vec<u8>)],
    ) -> EncodeResult<Vec<u8>> {
        let su = checked_stripe_unit(stripe_unit)?;
        let k = profile.k() as usize;
        let m = profile.m() as usize;
        if shards.len() < k {
            return Err(EncodeError::NotEnoughShards {
                needed: profile.k(),
                available: shards.len(),
            });
        }

        let shard_len = shards[0].1.len();
        for (index, bytes) in shards {
            if index.get() >= profile.shard_count() {
                return Err(EncodeError::ShardOutOfRange {
                    index: *index,
                    total: profile.shard_count(),
                });
            }
            if bytes.len() != shard_len || bytes.len() % su != 0 {
                return Err(EncodeError::ShardLength {
                    index: *index,
                    expected: shard_len.max(su),
                    actual: bytes.len(),
                });
            }
        }

        let stripes = shard_len / su;
        let mut out = vec![0u8; stripes * su * k];
        for stripe in 0..stripes {
            let range = stripe * su..(stripe + 1) * su;
            let base = stripe * su * k;
            let mut decoder = ReedSolomonDecoder::new(k, m, su).map_err(codec)?;
            for (index, bytes) in shards {
                let i = index.as_usize();
                let chunk = &bytes[range.clone()];
                if i < k {
                    out[base + i * su..base + (i + 1) * su].copy_from_slice(chunk);
                    decoder.add_original_shard(i, chunk).map_err(codec)?;
                } else {
                    decoder.add_recovery_shard(i - k, chunk).map_err(codec)?;
                }
            }
            let result = decoder.decode().map_err(codec)?;
            for (i, restored) in result.restored_original_iter() {
                out[base + i * su..base + (i + 1) * su].copy_from_slice(restored);
            }
        }
        Ok(out)
    }
}

impl EncodeEngine for ReedSolomonEngine {
    fn chunk_size(&self, profile: &ErasureCodeProfile, object_size: u64) -> EncodeResult<u64> {
        let k = u64::from(profile.k());
        let alignment = k * CHUNK_ALIGNMENT;
        let padded = object_size.div_ceil(alignment) * alignment;
        Ok(padded / k)
    }

    fn encode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        wanted: &ShardSet,
        input: &Path,
    ) -> EncodeResult<()> {
        check_indices(profile, wanted)?;
        let data = read(input)?;
        let shards = self.encode_bytes(profile, stripe_unit, &data)?;
        for index in wanted.iter() {
            let path = shard_path(input, index);
            fs::write(&path, &shards[index.as_usize()]).map_err(|source| EncodeError::Io {
                path: path.clone(),
                source,
            })?;
        }
        debug!(
            input = %input.display(),
            stripe_unit,
            shards = wanted.len(),
            "reed-solomon encode complete"
        );
        Ok(())
    }

    fn decode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        available: &ShardSet,
        input: &Path,
    ) -> EncodeResult<PathBuf> {
        check_indices(profile, available)?;
        let shards = available
            .iter()
            .map(|index| Ok((index, read(&shard_path(input, index))?)))
            .collect::<EncodeResult<Vec<_>>>()?;
        let data = self.decode_shards(profile, stripe_unit, &shards)?;
        let out = decoded_path(input);
        fs::write(&out, data).map_err(|source| EncodeError::Io {
            path: out.clone(),
            source,
        })?;
        Ok(out)
    }
}

fn checked_stripe_unit(stripe_unit: u64) -> EncodeResult<usize> {
    // The codec works on 16-bit symbols.
    if stripe_unit == 0 || stripe_unit % 2 != 0 {
        return Err(EncodeError::InvalidStripeUnit(stripe_unit));
    }
    usize::try_from(stripe_unit).map_err(|_| EncodeError::InvalidStripeUnit(stripe_unit))
}

fn check_indices(profile: &ErasureCodeProfile, set: &ShardSet) -> EncodeResult<()> {
    match set.iter().find(|i| i.get() >= profile.shard_count()) {
        Some(index) => Err(EncodeError::ShardOutOfRange {
            index,
            total: profile.shard_count(),
        }),
        None => Ok(()),
    }
}

fn read(path: &Path) -> EncodeResult<Vec<u8>> {
    fs::read(path).map_err(|source| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn codec(e: reed_solomon_simd::Error) -> EncodeError {
    EncodeError::Codec(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};

    fn profile(k: u32, m: u32) -> ErasureCodeProfile {
        ErasureCodeProfile::new("jerasure", k, m)
            .unwrap()
            .with_technique("reed_sol_van")
    }

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen()).collect()
    }

    #[test]
    fn chunk_size_for_4_plus_2() {
        let engine = ReedSolomonEngine::new();
        assert_eq!(engine.chunk_size(&profile(4, 2), 4096).unwrap(), 1024);
        assert_eq!(engine.chunk_size(&profile(4, 2), 4000).unwrap(), 1024);
        assert_eq!(engine.chunk_size(&profile(3, 2), 1).unwrap(), 32);
        assert_eq!(engine.chunk_size(&profile(3, 2), 0).unwrap(), 0);
    }

    #[test]
    fn encode_is_systematic() {
        let engine = ReedSolomonEngine::new();
        let data = random_bytes(4 * 64, 1);
        let shards = engine.encode_bytes(&profile(4, 2), 64, &data).unwrap();
        assert_eq!(shards.len(), 6);
        for (i, shard) in shards.iter().take(4).enumerate() {
            assert_eq!(shard[..], data[i * 64..(i + 1) * 64]);
        }
        assert!(shards.iter().all(|s| s.len() == 64));
    }

    #[test]
    fn short_input_is_zero_padded() {
        let engine = ReedSolomonEngine::new();
        let data = random_bytes(100, 2);
        let mut padded = data.clone();
        padded.resize(128, 0);
        let a = engine.encode_bytes(&profile(2, 1), 64, &data).unwrap();
        let b = engine.encode_bytes(&profile(2, 1), 64, &padded).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multi_stripe_shards_concatenate_per_stripe_chunks() {
        let engine = ReedSolomonEngine::new();
        let data = random_bytes(2 * 2 * 32, 3);
        let whole = engine.encode_bytes(&profile(2, 1), 32, &data).unwrap();
        let first = engine.encode_bytes(&profile(2, 1), 32, &data[..64]).unwrap();
        let second = engine.encode_bytes(&profile(2, 1), 32, &data[64..]).unwrap();
        for i in 0..3 {
            assert_eq!(whole[i], [first[i].clone(), second[i].clone()].concat());
        }
    }

    #[test]
    fn odd_stripe_unit_is_rejected() {
        let engine = ReedSolomonEngine::new();
        assert!(matches!(
            engine.encode_bytes(&profile(2, 1), 33, &[0u8; 66]),
            Err(EncodeError::InvalidStripeUnit(33))
        ));
        assert!(matches!(
            engine.encode_bytes(&profile(2, 1), 0, &[]),
            Err(EncodeError::InvalidStripeUnit(0))
        ));
    }

    #[test]
    fn encode_writes_shard_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ec-obj");
        let data = random_bytes(3 * 32, 4);
        fs::write(&input, &data).unwrap();

        let engine = ReedSolomonEngine::new();
        let p = profile(3, 2);
        engine.encode(&p, 32, &ShardSet::dense(5), &input).unwrap();

        let expected = engine.encode_bytes(&p, 32, &data).unwrap();
        for i in 0..5u32 {
            let written = fs::read(shard_path(&input, ShardIndex::new(i))).unwrap();
            assert_eq!(written, expected[i as usize]);
        }
    }

    #[test]
    fn encode_rejects_out_of_range_index() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ec-obj");
        fs::write(&input, [0u8; 64]).unwrap();
        let err = ReedSolomonEngine::new()
            .encode(&profile(2, 1), 32, &ShardSet::dense(4), &input)
            .unwrap_err();
        assert!(matches!(err, EncodeError::ShardOutOfRange { total: 3, .. }));
    }

    #[test]
    fn encode_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReedSolomonEngine::new()
            .encode(&profile(2, 1), 32, &ShardSet::dense(3), &dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Io { .. }));
    }

    #[test]
    fn decode_recovers_from_parity() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ec-obj");
        let data = random_bytes(4 * 64 * 2, 5);
        fs::write(&input, &data).unwrap();

        let engine = ReedSolomonEngine::new();
        let p = profile(4, 2);
        engine.encode(&p, 64, &ShardSet::dense(6), &input).unwrap();

        // Lose data shards 0 and 2.
        let available: ShardSet = [1, 3, 4, 5].into_iter().map(ShardIndex::new).collect();
        let out = engine.decode(&p, 64, &available, &input).unwrap();
        assert_eq!(out, decoded_path(&input));
        assert_eq!(fs::read(out).unwrap(), data);
    }

    #[test]
    fn decode_needs_k_shards() {
        let engine = ReedSolomonEngine::new();
        let err = engine
            .decode_shards(&profile(3, 2), 32, &[(ShardIndex::new(0), vec![0; 32])])
            .unwrap_err();
        assert!(matches!(err, EncodeError::NotEnoughShards { needed: 3, available: 1 }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn encoding_is_deterministic(k in 1u32..6, m in 1u32..4, units in 1usize..4, seed in any::<u64>()) {
            let engine = ReedSolomonEngine::new();
            let p = profile(k, m);
            let su = 32 * units as u64;
            let data = random_bytes(k as usize * su as usize, seed);
            let first = engine.encode_bytes(&p, su, &data).unwrap();
            let second = engine.encode_bytes(&p, su, &data).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
