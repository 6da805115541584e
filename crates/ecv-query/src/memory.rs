use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use ecv_types::{NodeRef, ObjectKey, ShardIndex};
use serde_json::{json, Value};

use crate::dump::ShardDump;
use crate::error::{QueryError, QueryResult};
use crate::listing::FragmentRef;
use crate::traits::ShardQuery;

#[derive(Clone, Debug)]
struct StoredFragment {
    fragment: FragmentRef,
    dump: Value,
    bytes: Bytes,
}

/// In-memory [`ShardQuery`] for tests and embedding.
///
/// Holds, per node, the listing entry, the dump JSON and the bytes of each
/// fragment. Nodes with no fragments list as empty output, matching what
/// the object store tool prints for a store without EC shards.
#[derive(Debug, Default)]
pub struct InMemoryShardQuery {
    nodes: RwLock<HashMap<NodeRef, Vec<StoredFragment>>>,
}

impl InMemoryShardQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fragment with an explicit dump record.
    pub fn insert(&self, node: &NodeRef, fragment: FragmentRef, dump: Value, bytes: Bytes) {
        self.nodes
            .write()
            .expect("lock poisoned")
            .entry(node.clone())
            .or_default()
            .push(StoredFragment {
                fragment,
                dump,
                bytes,
            });
    }

    /// Store one shard of `key` on `node`, with a listing entry and dump
    /// shaped like the object store tool's output. The declared chunk size
    /// is the length of `bytes`.
    pub fn add_shard(&self, node: &NodeRef, key: &ObjectKey, pool: i64, shard: ShardIndex, bytes: Bytes) {
        let id = json!({
            "oid": key.oid(),
            "key": "",
            "snapid": key.snapid(),
            "hash": 0,
            "max": 0,
            "pool": pool,
            "namespace": "",
            "shard_id": shard.get(),
        });
        let dump = json!({
            "id": id.clone(),
            "hinfo": {"total_chunk_size": bytes.len(), "cumulative_shard_hashes": []},
        });
        let fragment = FragmentRef::new(format!("{pool}.0s{shard}"), id);
        self.insert(node, fragment, dump, bytes);
    }

    /// Number of fragments held across all nodes.
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<StoredFragment> {
        let nodes = self.nodes.read().expect("lock poisoned");
        nodes
            .get(node)
            .and_then(|list| list.iter().find(|f| f.fragment == *fragment))
            .cloned()
            .ok_or_else(|| QueryError::UnknownFragment(fragment.to_string()))
    }
}

impl ShardQuery for InMemoryShardQuery {
    fn list_shard_fragments(&self, node: &NodeRef) -> QueryResult<Vec<FragmentRef>> {
        let nodes = self.nodes.read().expect("lock poisoned");
        match nodes.get(node) {
            Some(list) if !list.is_empty() => Ok(list.iter().map(|f| f.fragment.clone()).collect()),
            _ => Err(QueryError::EmptyOutput("list")),
        }
    }

    fn dump_shard_info(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<ShardDump> {
        let stored = self.find(node, fragment)?;
        serde_json::from_value(stored.dump).map_err(|source| QueryError::Parse {
            what: "shard dump",
            source,
        })
    }

    fn fetch_shard_bytes(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<Bytes> {
        let stored = self.find(node, fragment)?;
        if stored.bytes.is_empty() {
            return Err(QueryError::EmptyOutput("get-bytes"));
        }
        Ok(stored.bytes)
    }
}
