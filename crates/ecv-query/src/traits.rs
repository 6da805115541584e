use bytes::Bytes;
use ecv_types::NodeRef;

use crate::dump::ShardDump;
use crate::error::QueryResult;
use crate::listing::FragmentRef;

/// Read-only queries against one node's local object store.
///
/// Implementations hold no per-run state and have no side effects beyond
/// the reads themselves.
pub trait ShardQuery: Send + Sync {
    /// List the EC shard fragments stored on `node`.
    ///
    /// Lines that cannot be parsed are skipped. No output at all is an
    /// error ([`QueryError::EmptyOutput`](crate::QueryError::EmptyOutput)),
    /// which callers normally read as "no EC shards here".
    fn list_shard_fragments(&self, node: &NodeRef) -> QueryResult<Vec<FragmentRef>>;

    /// Dump the metadata of one fragment.
    ///
    /// The returned record may be partial; use
    /// [`ShardDump::fragment_meta`] to extract the fields verification needs.
    fn dump_shard_info(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<ShardDump>;

    /// Fetch the raw bytes of one fragment. Never returns an empty shard.
    fn fetch_shard_bytes(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<Bytes>;
}
