use ecv_types::{ObjectKey, ShardIndex};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Metadata of one shard, as printed by the object store tool's `dump`.
///
/// Every field is optional so that partial dumps still parse. The fields
/// verification relies on are pulled out by [`ShardDump::fragment_meta`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardDump {
    pub id: ShardDumpId,
    pub hinfo: Option<HashInfo>,
    pub stat: Option<ObjectStat>,
}

/// The `id` section of a shard dump.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardDumpId {
    pub oid: Option<String>,
    pub key: Option<String>,
    pub snapid: Option<i64>,
    pub hash: Option<u64>,
    pub max: Option<u64>,
    pub pool: Option<i64>,
    pub namespace: Option<String>,
    pub shard_id: Option<i64>,
}

/// EC hash info kept alongside every shard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashInfo {
    /// Size in bytes of each shard of the object.
    pub total_chunk_size: Option<u64>,
    pub cumulative_shard_hashes: Vec<ShardHash>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardHash {
    pub shard: u32,
    pub hash: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStat {
    pub size: Option<u64>,
}

/// The fields of a shard dump that place a fragment within its object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentMeta {
    pub key: ObjectKey,
    pub pool: i64,
    pub shard: ShardIndex,
    /// Declared size of each of the object's shards.
    pub chunk_size: u64,
}

impl ShardDump {
    /// Parse the JSON printed by `dump`.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        serde_json::from_str(text).map_err(|source| QueryError::Parse {
            what: "shard dump",
            source,
        })
    }

    /// Extract the identity, pool, shard index and chunk size.
    ///
    /// Reports the first missing or unusable field.
    pub fn fragment_meta(&self) -> QueryResult<FragmentMeta> {
        let oid = self
            .id
            .oid
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or(QueryError::MissingField("id.oid"))?;
        let snapid = self.id.snapid.ok_or(QueryError::MissingField("id.snapid"))?;
        let pool = self.id.pool.ok_or(QueryError::MissingField("id.pool"))?;
        let shard_id = self.id.shard_id.ok_or(QueryError::MissingField("id.shard_id"))?;
        let shard = u32::try_from(shard_id).map_err(|_| QueryError::InvalidField {
            field: "id.shard_id",
            reason: format!("{shard_id} is not a shard of an EC object"),
        })?;
        let chunk_size = self
            .hinfo
            .as_ref()
            .and_then(|h| h.total_chunk_size)
            .ok_or(QueryError::MissingField("hinfo.total_chunk_size"))?;
        if chunk_size == 0 {
            return Err(QueryError::InvalidField {
                field: "hinfo.total_chunk_size",
                reason: "zero".into(),
            });
        }

        Ok(FragmentMeta {
            key: ObjectKey::new(oid, snapid),
            pool,
            shard: ShardIndex::new(shard),
            chunk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": {"oid": "rbd_data.1012.0000", "key": "", "snapid": -2, "hash": 3195381552,
               "max": 0, "pool": 2, "namespace": "", "shard_id": 3},
        "info": {"oid": {"oid": "rbd_data.1012.0000"}, "size": 4096},
        "stat": {"size": 1024, "blksize": 4096, "blocks": 8, "nlink": 1},
        "hinfo": {"total_chunk_size": 1024,
                  "cumulative_shard_hashes": [{"shard": 0, "hash": 1}, {"shard": 3, "hash": 2}]}
    }"#;

    #[test]
    fn full_dump_yields_meta() {
        let dump = ShardDump::from_json(DUMP).unwrap();
        let meta = dump.fragment_meta().unwrap();
        assert_eq!(meta.key, ObjectKey::head("rbd_data.1012.0000"));
        assert_eq!(meta.pool, 2);
        assert_eq!(meta.shard, ShardIndex::new(3));
        assert_eq!(meta.chunk_size, 1024);
        assert_eq!(dump.hinfo.unwrap().cumulative_shard_hashes.len(), 2);
    }

    #[test]
    fn partial_dump_parses_but_lacks_meta() {
        let dump = ShardDump::from_json(r#"{"id": {"oid": "o", "snapid": 4, "pool": 1}}"#).unwrap();
        assert!(matches!(
            dump.fragment_meta(),
            Err(QueryError::MissingField("id.shard_id"))
        ));
    }

    #[test]
    fn missing_hinfo_is_reported() {
        let dump =
            ShardDump::from_json(r#"{"id": {"oid": "o", "snapid": -2, "pool": 1, "shard_id": 0}}"#)
                .unwrap();
        assert!(matches!(
            dump.fragment_meta(),
            Err(QueryError::MissingField("hinfo.total_chunk_size"))
        ));
    }

    #[test]
    fn no_shard_marker_is_invalid() {
        let dump = ShardDump::from_json(
            r#"{"id": {"oid": "o", "snapid": -2, "pool": 1, "shard_id": -1},
                "hinfo": {"total_chunk_size": 16}}"#,
        )
        .unwrap();
        assert!(matches!(
            dump.fragment_meta(),
            Err(QueryError::InvalidField { field: "id.shard_id", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            ShardDump::from_json("{\"id\": "),
            Err(QueryError::Parse { .. })
        ));
        assert_eq!(ShardDump::from_json("{}").unwrap(), ShardDump::default());
    }
}
