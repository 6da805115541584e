use std::collections::BTreeMap;

use bytes::Bytes;
use ecv_query::FragmentMeta;
use ecv_types::ObjectKey;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::object::{EcObject, FillOutcome};
use crate::resolver::ProfileResolver;

/// What [`ObjectRegistry::ingest`] did with a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First fragment of a new object.
    Created,
    /// Filled an empty slot of a known object.
    Filled,
    /// The slot was already filled and kept its bytes.
    Duplicate { conflicting: bool },
}

/// Counts over the registry's contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub objects: usize,
    pub complete: usize,
    pub shards_present: usize,
    pub shards_missing: usize,
}

/// Logical objects keyed by (oid, snapid), iterated in key order.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<ObjectKey, EcObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one shard fragment into its object.
    ///
    /// The object is created on first sight, after `resolver` supplies the
    /// profile of the fragment's pool. A fragment that is rejected, whether
    /// for its index, its length or an unresolvable profile, leaves the
    /// registry unchanged.
    pub fn ingest<R>(&mut self, meta: &FragmentMeta, bytes: Bytes, resolver: &R) -> RegistryResult<IngestOutcome>
    where
        R: ProfileResolver + ?Sized,
    {
        if let Some(object) = self.objects.get_mut(&meta.key) {
            if object.pool() != meta.pool {
                warn!(
                    object = %meta.key,
                    pool = meta.pool,
                    known_pool = object.pool(),
                    "fragment pool differs from object pool"
                );
            }
            return Ok(match object.fill(meta.shard, bytes)? {
                FillOutcome::Filled => {
                    debug!(object = %meta.key, shard = %meta.shard, "filled shard");
                    IngestOutcome::Filled
                }
                FillOutcome::Duplicate { conflicting } => {
                    if conflicting {
                        warn!(object = %meta.key, shard = %meta.shard, "duplicate shard with different contents");
                    } else {
                        debug!(object = %meta.key, shard = %meta.shard, "duplicate shard ignored");
                    }
                    IngestOutcome::Duplicate { conflicting }
                }
            });
        }

        let profile = resolver
            .resolve(meta.pool)
            .map_err(|source| RegistryError::ProfileResolution {
                key: meta.key.clone(),
                pool: meta.pool,
                source,
            })?;
        let mut object = EcObject::new(meta.key.clone(), meta.pool, profile, meta.chunk_size);
        object.fill(meta.shard, bytes)?;
        debug!(
            object = %meta.key,
            shard = %meta.shard,
            profile = %object.profile(),
            object_size = object.object_size(),
            "created object"
        );
        self.objects.insert(meta.key.clone(), object);
        Ok(IngestOutcome::Created)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&EcObject> {
        self.objects.get(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in key order.
    pub fn iter(&self) -> impl Iterator<Item = &EcObject> + '_ {
        self.objects.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjectKey> + '_ {
        self.objects.keys()
    }

    /// Objects with at least one absent slot.
    pub fn incomplete(&self) -> impl Iterator<Item = &EcObject> + '_ {
        self.objects.values().filter(|o| !o.is_complete())
    }

    pub fn stats(&self) -> RegistryStats {
        self.objects.values().fold(RegistryStats::default(), |mut s, o| {
            let present = o.present().len();
            s.objects += 1;
            s.complete += usize::from(o.is_complete());
            s.shards_present += present;
            s.shards_missing += o.slots().len() - present;
            s
        })
    }
}

#[cfg(test)]
mod tests {
    use ecv_types::{ErasureCodeProfile, ShardIndex};
    use proptest::prelude::*;

    use super::*;
    use crate::error::MetadataError;
    use crate::memory::InMemoryClusterMetadata;

    fn metadata() -> InMemoryClusterMetadata {
        let md = InMemoryClusterMetadata::new();
        md.add_pool(1, "ec42", ErasureCodeProfile::new("jerasure", 4, 2).unwrap());
        md.add_pool(2, "ec21", ErasureCodeProfile::new("jerasure", 2, 1).unwrap());
        md
    }

    fn meta(oid: &str, snapid: i64, pool: i64, shard: u32) -> FragmentMeta {
        FragmentMeta {
            key: ObjectKey::new(oid, snapid),
            pool,
            shard: ShardIndex::new(shard),
            chunk_size: 4,
        }
    }

    fn chunk(fill: u8) -> Bytes {
        Bytes::from(vec![fill; 4])
    }

    #[test]
    fn first_fragment_creates_the_object() {
        let md = metadata();
        let mut reg = ObjectRegistry::new();
        let out = reg.ingest(&meta("a", -2, 1, 3), chunk(3), &md).unwrap();
        assert_eq!(out, IngestOutcome::Created);

        let obj = reg.get(&ObjectKey::head("a")).unwrap();
        assert_eq!(obj.profile().k(), 4);
        assert_eq!(obj.slots().len(), 6);
        assert_eq!(obj.object_size(), 16);
        assert!(obj.slot(ShardIndex::new(3)).unwrap().is_present());
        assert_eq!(obj.present().len(), 1);
    }

    #[test]
    fn later_fragments_fill_and_duplicates_keep_first_bytes() {
        let md = metadata();
        let mut reg = ObjectRegistry::new();
        reg.ingest(&meta("a", -2, 1, 0), chunk(0), &md).unwrap();
        assert_eq!(reg.ingest(&meta("a", -2, 1, 1), chunk(1), &md).unwrap(), IngestOutcome::Filled);
        assert_eq!(
            reg.ingest(&meta("a", -2, 1, 1), chunk(5), &md).unwrap(),
            IngestOutcome::Duplicate { conflicting: true }
        );
        let obj = reg.get(&ObjectKey::head("a")).unwrap();
        assert_eq!(obj.slot(ShardIndex::new(1)).unwrap().bytes().unwrap(), &chunk(1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn snapshots_are_distinct_objects() {
        let md = metadata();
        let mut reg = ObjectRegistry::new();
        reg.ingest(&meta("a", -2, 1, 0), chunk(0), &md).unwrap();
        reg.ingest(&meta("a", 4, 1, 0), chunk(0), &md).unwrap();
        assert_eq!(reg.len(), 2);
        let keys: Vec<String> = reg.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["a_-2", "a_4"]);
    }

    #[test]
    fn rejected_fragment_creates_nothing() {
        let md = metadata();
        let mut reg = ObjectRegistry::new();
        assert!(matches!(
            reg.ingest(&meta("a", -2, 2, 3), chunk(0), &md),
            Err(RegistryError::ShardOutOfRange { total: 3, .. })
        ));
        assert!(matches!(
            reg.ingest(&meta("a", -2, 2, 0), Bytes::from_static(b"xy"), &md),
            Err(RegistryError::ShardLengthMismatch { expected: 4, actual: 2, .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn unresolvable_profile_is_retried_on_next_fragment() {
        let md = InMemoryClusterMetadata::new();
        let mut reg = ObjectRegistry::new();
        match reg.ingest(&meta("a", -2, 7, 0), chunk(0), &md) {
            Err(RegistryError::ProfileResolution { pool: 7, source, .. }) => {
                assert!(matches!(source, MetadataError::UnknownPool(7)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(reg.is_empty());

        md.add_pool(7, "late", ErasureCodeProfile::new("isa", 2, 2).unwrap());
        assert_eq!(reg.ingest(&meta("a", -2, 7, 1), chunk(1), &md).unwrap(), IngestOutcome::Created);
        assert_eq!(reg.get(&ObjectKey::head("a")).unwrap().profile().m(), 2);
    }

    /// Resolves every pool by parsing a fixed `k=v` profile listing, the
    /// way raw cluster parameters arrive.
    struct ListingResolver(&'static str);

    impl ProfileResolver for ListingResolver {
        fn resolve(&self, _pool: i64) -> crate::error::MetadataResult<ErasureCodeProfile> {
            Ok(ErasureCodeProfile::parse(self.0)?)
        }
    }

    #[test]
    fn oversized_profile_is_a_resolution_error() {
        let mut reg = ObjectRegistry::new();
        let resolver = ListingResolver("k=4294967295\nm=1\nplugin=jerasure");
        match reg.ingest(&meta("a", -2, 3, 0), chunk(0), &resolver) {
            Err(RegistryError::ProfileResolution { pool: 3, source, .. }) => {
                assert!(matches!(
                    source,
                    MetadataError::Profile(ecv_types::TypeError::InvalidParameter { ref key, .. }) if key == "k"
                ));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn stats_and_incomplete() {
        let md = metadata();
        let mut reg = ObjectRegistry::new();
        for i in 0..3 {
            reg.ingest(&meta("full", -2, 2, i), chunk(i as u8), &md).unwrap();
        }
        reg.ingest(&meta("part", -2, 2, 0), chunk(0), &md).unwrap();

        let stats = reg.stats();
        assert_eq!(
            stats,
            RegistryStats {
                objects: 2,
                complete: 1,
                shards_present: 4,
                shards_missing: 2,
            }
        );
        let incomplete: Vec<&str> = reg.incomplete().map(|o| o.key().oid()).collect();
        assert_eq!(incomplete, vec!["part"]);
    }

    proptest! {
        #[test]
        fn ingest_order_does_not_matter(order in Just((0u32..6).collect::<Vec<_>>()).prop_shuffle()) {
            let md = metadata();
            let mut reg = ObjectRegistry::new();
            for &i in &order {
                reg.ingest(&meta("o", -2, 1, i), chunk(i as u8), &md).unwrap();
            }
            let obj = reg.get(&ObjectKey::head("o")).unwrap();
            prop_assert!(obj.is_complete());
            for i in 0..6u32 {
                prop_assert_eq!(obj.slot(ShardIndex::new(i)).unwrap().bytes().unwrap(), &chunk(i as u8));
            }
        }

        #[test]
        fn objects_per_distinct_identity(ids in prop::collection::vec(("[a-c]{1,2}", -2i64..3), 1..20)) {
            let md = metadata();
            let mut reg = ObjectRegistry::new();
            for (oid, snap) in &ids {
                reg.ingest(&meta(oid, *snap, 1, 0), chunk(0), &md).unwrap();
            }
            let distinct: std::collections::BTreeSet<_> = ids.iter().cloned().collect();
            prop_assert_eq!(reg.len(), distinct.len());
        }
    }
}
