use bytes::Bytes;
use ecv_types::{ErasureCodeProfile, ObjectKey, ShardIndex, ShardSet, ShardSlot};

use crate::error::{RegistryError, RegistryResult};

/// What happened when a shard was offered to an [`EcObject`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// The slot was empty and now holds the shard.
    Filled,
    /// The slot was already filled. The stored bytes are unchanged;
    /// `conflicting` is set when the offered bytes differ from them.
    Duplicate { conflicting: bool },
}

/// One logical erasure-coded object, assembled from its shards.
///
/// Has exactly `k + m` slots. The profile and chunk size are fixed when the
/// object is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcObject {
    key: ObjectKey,
    pool: i64,
    profile: ErasureCodeProfile,
    chunk_size: u64,
    slots: Vec<ShardSlot>,
}

impl EcObject {
    /// Create an object with every slot absent.
    pub fn new(key: ObjectKey, pool: i64, profile: ErasureCodeProfile, chunk_size: u64) -> Self {
        let slots = vec![ShardSlot::Absent; profile.shard_count() as usize];
        Self {
            key,
            pool,
            profile,
            chunk_size,
            slots,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Pool of the fragment that created the object.
    pub fn pool(&self) -> i64 {
        self.pool
    }

    pub fn profile(&self) -> &ErasureCodeProfile {
        &self.profile
    }

    /// Size in bytes of every shard.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Logical size of the object: one chunk per data shard.
    pub fn object_size(&self) -> u64 {
        self.chunk_size.saturating_mul(u64::from(self.profile.k()))
    }

    pub fn slots(&self) -> &[ShardSlot] {
        &self.slots
    }

    /// The slot at `index`, or `None` past `k + m`.
    pub fn slot(&self, index: ShardIndex) -> Option<&ShardSlot> {
        self.slots.get(index.as_usize())
    }

    /// Store `bytes` in slot `index` unless it is already filled.
    pub fn fill(&mut self, index: ShardIndex, bytes: Bytes) -> RegistryResult<FillOutcome> {
        let total = self.profile.shard_count();
        let slot = self
            .slots
            .get_mut(index.as_usize())
            .ok_or_else(|| RegistryError::ShardOutOfRange {
                key: self.key.clone(),
                index,
                total,
            })?;
        if bytes.len() as u64 != self.chunk_size {
            return Err(RegistryError::ShardLengthMismatch {
                key: self.key.clone(),
                index,
                expected: self.chunk_size,
                actual: bytes.len() as u64,
            });
        }
        match slot {
            ShardSlot::Present(existing) => Ok(FillOutcome::Duplicate {
                conflicting: *existing != bytes,
            }),
            ShardSlot::Absent => {
                *slot = ShardSlot::Present(bytes);
                Ok(FillOutcome::Filled)
            }
        }
    }

    /// Indices of the slots that hold a shard.
    pub fn present(&self) -> ShardSet {
        self.indices_where(ShardSlot::is_present)
    }

    /// Indices of the slots still absent.
    pub fn missing(&self) -> ShardSet {
        self.indices_where(|s| !s.is_present())
    }

    /// Absent data slots, in index order.
    pub fn missing_data(&self) -> Vec<ShardIndex> {
        self.profile
            .data_range()
            .map(ShardIndex::new)
            .filter(|i| !self.slots[i.as_usize()].is_present())
            .collect()
    }

    /// Absent parity slots, in index order.
    pub fn missing_parity(&self) -> Vec<ShardIndex> {
        self.profile
            .parity_range()
            .map(ShardIndex::new)
            .filter(|i| !self.slots[i.as_usize()].is_present())
            .collect()
    }

    /// The `k` data shards in index order, if all are present.
    pub fn data_shards(&self) -> Option<Vec<Bytes>> {
        self.profile
            .data_range()
            .map(|i| self.slots[i as usize].bytes().cloned())
            .collect()
    }

    /// Concatenation of the data shards, if all are present.
    ///
    /// For a systematic code this is the input the encoder is fed to
    /// regenerate parity.
    pub fn data_bytes(&self) -> Option<Vec<u8>> {
        let shards = self.data_shards()?;
        let mut out = Vec::with_capacity(self.object_size() as usize);
        for shard in &shards {
            out.extend_from_slice(shard);
        }
        Some(out)
    }

    /// Parity slots as `(index, slot)` pairs over `[k, k + m)`.
    pub fn parity_slots(&self) -> impl Iterator<Item = (ShardIndex, &ShardSlot)> + '_ {
        self.profile
            .parity_range()
            .map(move |i| (ShardIndex::new(i), &self.slots[i as usize]))
    }

    /// Whether every one of the `k + m` slots is filled.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(ShardSlot::is_present)
    }

    fn indices_where(&self, pred: impl Fn(&ShardSlot) -> bool) -> ShardSet {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| pred(s))
            .map(|(i, _)| ShardIndex::new(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(k: u32, m: u32) -> EcObject {
        let profile = ErasureCodeProfile::new("jerasure", k, m).unwrap();
        EcObject::new(ObjectKey::head("obj"), 1, profile, 4)
    }

    fn shard(fill: u8) -> Bytes {
        Bytes::from(vec![fill; 4])
    }

    #[test]
    fn new_object_has_k_plus_m_absent_slots() {
        let obj = object(4, 2);
        assert_eq!(obj.slots().len(), 6);
        assert_eq!(obj.object_size(), 16);
        assert!(obj.present().is_empty());
        assert_eq!(obj.missing(), ShardSet::dense(6));
        assert!(!obj.is_complete());
        assert!(obj.data_shards().is_none());
    }

    #[test]
    fn fill_then_duplicate() {
        let mut obj = object(2, 1);
        assert_eq!(obj.fill(ShardIndex::new(1), shard(7)).unwrap(), FillOutcome::Filled);
        assert_eq!(
            obj.fill(ShardIndex::new(1), shard(7)).unwrap(),
            FillOutcome::Duplicate { conflicting: false }
        );
        assert_eq!(
            obj.fill(ShardIndex::new(1), shard(9)).unwrap(),
            FillOutcome::Duplicate { conflicting: true }
        );
        assert_eq!(obj.slot(ShardIndex::new(1)).unwrap().bytes().unwrap(), &shard(7));
    }

    #[test]
    fn out_of_range_and_wrong_length_are_rejected() {
        let mut obj = object(2, 1);
        assert!(matches!(
            obj.fill(ShardIndex::new(3), shard(0)),
            Err(RegistryError::ShardOutOfRange { total: 3, .. })
        ));
        assert!(matches!(
            obj.fill(ShardIndex::new(0), Bytes::from_static(b"abc")),
            Err(RegistryError::ShardLengthMismatch { expected: 4, actual: 3, .. })
        ));
        assert!(obj.present().is_empty());
    }

    #[test]
    fn data_and_parity_views_follow_k() {
        let mut obj = object(3, 2);
        for i in 0..3 {
            obj.fill(ShardIndex::new(i), shard(i as u8)).unwrap();
        }
        assert!(obj.missing_data().is_empty());
        assert_eq!(obj.missing_parity(), vec![ShardIndex::new(3), ShardIndex::new(4)]);
        assert_eq!(obj.data_bytes().unwrap(), [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);

        let parity: Vec<u32> = obj.parity_slots().map(|(i, _)| i.get()).collect();
        assert_eq!(parity, vec![3, 4]);

        obj.fill(ShardIndex::new(3), shard(8)).unwrap();
        obj.fill(ShardIndex::new(4), shard(9)).unwrap();
        assert!(obj.is_complete());
    }
}
