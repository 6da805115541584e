use std::sync::Arc;

use bytes::Bytes;
use ecv_query::{FragmentMeta, FragmentRef, QueryError, ShardQuery};
use ecv_registry::{IngestOutcome, ObjectRegistry, ProfileResolver};
use ecv_types::NodeRef;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{VerifyError, VerifyResult};

/// What a scan did on one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeScanReport {
    pub node: NodeRef,
    /// Fragments in the node's listing.
    pub listed: usize,
    /// Fragments that created or filled a slot.
    pub ingested: usize,
    /// Fragments for slots already filled.
    pub duplicates: usize,
    /// Fragments dropped on a soft error.
    pub skipped: usize,
    /// Why the node could not be listed, if it could not.
    pub list_error: Option<String>,
}

impl NodeScanReport {
    fn new(node: NodeRef) -> Self {
        Self {
            node,
            listed: 0,
            ingested: 0,
            duplicates: 0,
            skipped: 0,
            list_error: None,
        }
    }

    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Created | IngestOutcome::Filled => self.ingested += 1,
            IngestOutcome::Duplicate { .. } => self.duplicates += 1,
        }
    }
}

/// A fragment read from a node, ready for the registry.
#[derive(Debug)]
struct FetchedFragment {
    node: NodeRef,
    meta: FragmentMeta,
    bytes: Bytes,
}

/// Listing-side counts of one node.
#[derive(Debug, Default)]
struct FetchCounts {
    listed: usize,
    skipped: usize,
    list_error: Option<String>,
}

/// Walks storage nodes and feeds their shard fragments into a registry.
///
/// Every problem with a single fragment or node is logged and skipped so
/// one bad shard never hides the rest of the cluster.
pub struct ClusterScanner<Q, R> {
    query: Arc<Q>,
    resolver: R,
}

impl<Q, R> ClusterScanner<Q, R>
where
    Q: ShardQuery,
    R: ProfileResolver,
{
    pub fn new(query: Arc<Q>, resolver: R) -> Self {
        Self { query, resolver }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Scan one node into `registry`.
    pub fn scan_node(&self, node: &NodeRef, registry: &mut ObjectRegistry) -> NodeScanReport {
        let mut report = NodeScanReport::new(node.clone());
        let counts = fetch_node(self.query.as_ref(), node, |fragment| {
            self.ingest(registry, fragment, &mut report);
            true
        });
        report.listed = counts.listed;
        report.skipped += counts.skipped;
        report.list_error = counts.list_error;
        log_report(&report);
        report
    }

    /// Scan nodes one after another.
    pub fn scan(&self, nodes: &[NodeRef], registry: &mut ObjectRegistry) -> Vec<NodeScanReport> {
        nodes.iter().map(|node| self.scan_node(node, registry)).collect()
    }

    fn ingest(&self, registry: &mut ObjectRegistry, fragment: FetchedFragment, report: &mut NodeScanReport) {
        match registry.ingest(&fragment.meta, fragment.bytes, &self.resolver) {
            Ok(outcome) => report.record(outcome),
            Err(e) => {
                warn!(node = %fragment.node, object = %fragment.meta.key, error = %e, "fragment rejected");
                report.skipped += 1;
            }
        }
    }
}

impl<Q, R> ClusterScanner<Q, R>
where
    Q: ShardQuery + 'static,
    R: ProfileResolver,
{
    /// Scan nodes in parallel.
    ///
    /// Up to `parallelism` nodes are queried at once, each on a blocking
    /// task with its own channel to this task, which is the only one that
    /// touches `registry`. Channels are drained in the order of `nodes`, so
    /// the registry and the reports come out exactly as [`scan`](Self::scan)
    /// would leave them, whatever order the nodes answer in.
    pub async fn scan_concurrent(
        &self,
        nodes: &[NodeRef],
        registry: &mut ObjectRegistry,
        parallelism: usize,
    ) -> VerifyResult<Vec<NodeScanReport>> {
        let permits = Arc::new(Semaphore::new(parallelism.max(1)));

        // Unbounded: a node that finishes early must not hold its permit
        // while it waits for the nodes ahead of it to be drained.
        let mut workers = Vec::with_capacity(nodes.len());
        for node in nodes {
            let (tx, rx) = mpsc::unbounded_channel::<FetchedFragment>();
            let query = Arc::clone(&self.query);
            let permits = Arc::clone(&permits);
            let node = node.clone();
            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| VerifyError::Scan(e.to_string()))?;
                tokio::task::spawn_blocking(move || {
                    fetch_node(query.as_ref(), &node, |fragment| tx.send(fragment).is_ok())
                })
                .await
                .map_err(|e| VerifyError::Scan(e.to_string()))
            });
            workers.push((rx, handle));
        }

        let mut reports = Vec::with_capacity(nodes.len());
        for (node, (mut rx, handle)) in nodes.iter().zip(workers) {
            let mut report = NodeScanReport::new(node.clone());
            while let Some(fragment) = rx.recv().await {
                self.ingest(registry, fragment, &mut report);
            }
            let counts = handle.await.map_err(|e| VerifyError::Scan(e.to_string()))??;
            report.listed = counts.listed;
            report.skipped += counts.skipped;
            report.list_error = counts.list_error;
            log_report(&report);
            reports.push(report);
        }
        Ok(reports)
    }
}

/// List `node` and hand every fragment that reads cleanly to `sink`.
/// Stops early if `sink` returns false.
fn fetch_node<Q, F>(query: &Q, node: &NodeRef, mut sink: F) -> FetchCounts
where
    Q: ShardQuery + ?Sized,
    F: FnMut(FetchedFragment) -> bool,
{
    let mut counts = FetchCounts::default();
    let fragments = match query.list_shard_fragments(node) {
        Ok(fragments) => fragments,
        Err(QueryError::EmptyOutput(_)) => {
            debug!(node = %node, "no EC shards on node");
            return counts;
        }
        Err(e) => {
            warn!(node = %node, error = %e, "cannot list shards");
            counts.list_error = Some(e.to_string());
            return counts;
        }
    };
    counts.listed = fragments.len();

    for fragment in &fragments {
        match fetch_fragment(query, node, fragment) {
            Ok(fetched) => {
                debug!(
                    node = %node,
                    object = %fetched.meta.key,
                    shard = %fetched.meta.shard,
                    "fetched shard"
                );
                if !sink(fetched) {
                    break;
                }
            }
            Err(e) => {
                warn!(node = %node, fragment = %fragment, error = %e, "skipping fragment");
                counts.skipped += 1;
            }
        }
    }
    counts
}

fn fetch_fragment<Q>(query: &Q, node: &NodeRef, fragment: &FragmentRef) -> Result<FetchedFragment, QueryError>
where
    Q: ShardQuery + ?Sized,
{
    let meta = query.dump_shard_info(node, fragment)?.fragment_meta()?;
    let bytes = query.fetch_shard_bytes(node, fragment)?;
    Ok(FetchedFragment {
        node: node.clone(),
        meta,
        bytes,
    })
}

fn log_report(report: &NodeScanReport) {
    info!(
        node = %report.node,
        listed = report.listed,
        ingested = report.ingested,
        duplicates = report.duplicates,
        skipped = report.skipped,
        "scanned node"
    );
}

#[cfg(test)]
mod tests {
    use ecv_query::InMemoryShardQuery;
    use ecv_registry::InMemoryClusterMetadata;
    use ecv_types::{ErasureCodeProfile, ObjectKey, ShardIndex};
    use serde_json::json;

    use super::*;

    fn metadata() -> InMemoryClusterMetadata {
        let md = InMemoryClusterMetadata::new();
        md.add_pool(1, "ec21", ErasureCodeProfile::new("jerasure", 2, 1).unwrap());
        md
    }

    fn chunk(fill: u8) -> Bytes {
        Bytes::from(vec![fill; 8])
    }

    /// Three nodes, one shard of "obj" on each, plus a duplicate of shard 0
    /// on node 2.
    fn cluster() -> Arc<InMemoryShardQuery> {
        let q = InMemoryShardQuery::new();
        let key = ObjectKey::head("obj");
        q.add_shard(&NodeRef::osd(0), &key, 1, ShardIndex::new(0), chunk(0));
        q.add_shard(&NodeRef::osd(1), &key, 1, ShardIndex::new(1), chunk(1));
        q.add_shard(&NodeRef::osd(2), &key, 1, ShardIndex::new(2), chunk(2));
        q.add_shard(&NodeRef::osd(2), &key, 1, ShardIndex::new(0), chunk(0));
        Arc::new(q)
    }

    fn nodes() -> Vec<NodeRef> {
        (0..3).map(NodeRef::osd).collect()
    }

    #[test]
    fn sequential_scan_assembles_object() {
        let scanner = ClusterScanner::new(cluster(), metadata());
        let mut registry = ObjectRegistry::new();
        let reports = scanner.scan(&nodes(), &mut registry);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].listed, 2);
        assert_eq!(reports[2].ingested, 1);
        assert_eq!(reports[2].duplicates, 1);
        assert!(registry.get(&ObjectKey::head("obj")).unwrap().is_complete());
    }

    #[test]
    fn empty_node_is_not_an_error() {
        let scanner = ClusterScanner::new(cluster(), metadata());
        let mut registry = ObjectRegistry::new();
        let report = scanner.scan_node(&NodeRef::osd(9), &mut registry);
        assert_eq!(report.listed, 0);
        assert!(report.list_error.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn bad_fragments_are_skipped() {
        let q = InMemoryShardQuery::new();
        let node = NodeRef::osd(0);
        // Dump without hinfo.
        let id = json!({"oid": "broken", "snapid": -2, "pool": 1, "shard_id": 0});
        q.insert(
            &node,
            FragmentRef::new("1.0s0", id.clone()),
            json!({"id": id}),
            chunk(0),
        );
        // Pool with no profile.
        q.add_shard(&node, &ObjectKey::head("orphan"), 7, ShardIndex::new(0), chunk(0));
        // Index past k + m.
        q.add_shard(&node, &ObjectKey::head("wide"), 1, ShardIndex::new(5), chunk(0));
        q.add_shard(&node, &ObjectKey::head("good"), 1, ShardIndex::new(1), chunk(1));

        let scanner = ClusterScanner::new(Arc::new(q), metadata());
        let mut registry = ObjectRegistry::new();
        let report = scanner.scan_node(&node, &mut registry);
        assert_eq!(report.listed, 4);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.ingested, 1);
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec![&ObjectKey::head("good")]);
    }

    #[test]
    fn monitor_listing_failure_is_recorded() {
        struct Refusing;
        impl ShardQuery for Refusing {
            fn list_shard_fragments(&self, node: &NodeRef) -> ecv_query::QueryResult<Vec<FragmentRef>> {
                Err(QueryError::NotAStorageNode(node.to_string()))
            }
            fn dump_shard_info(&self, _: &NodeRef, f: &FragmentRef) -> ecv_query::QueryResult<ecv_query::ShardDump> {
                Err(QueryError::UnknownFragment(f.to_string()))
            }
            fn fetch_shard_bytes(&self, _: &NodeRef, f: &FragmentRef) -> ecv_query::QueryResult<Bytes> {
                Err(QueryError::UnknownFragment(f.to_string()))
            }
        }

        let scanner = ClusterScanner::new(Arc::new(Refusing), metadata());
        let mut registry = ObjectRegistry::new();
        let report = scanner.scan_node(&NodeRef::mon("a"), &mut registry);
        assert!(report.list_error.unwrap().contains("mon.a"));
    }

    #[tokio::test]
    async fn concurrent_scan_matches_sequential() {
        let scanner = ClusterScanner::new(cluster(), metadata());

        let mut sequential = ObjectRegistry::new();
        let expected = scanner.scan(&nodes(), &mut sequential);

        let mut concurrent = ObjectRegistry::new();
        let reports = scanner.scan_concurrent(&nodes(), &mut concurrent, 2).await.unwrap();

        assert_eq!(reports, expected);
        assert_eq!(
            concurrent.get(&ObjectKey::head("obj")),
            sequential.get(&ObjectKey::head("obj"))
        );
    }

    /// Delays the listing of one node so it answers after the others.
    struct Slow {
        inner: Arc<InMemoryShardQuery>,
        slow: NodeRef,
    }

    impl ShardQuery for Slow {
        fn list_shard_fragments(&self, node: &NodeRef) -> ecv_query::QueryResult<Vec<FragmentRef>> {
            if *node == self.slow {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            self.inner.list_shard_fragments(node)
        }
        fn dump_shard_info(&self, node: &NodeRef, f: &FragmentRef) -> ecv_query::QueryResult<ecv_query::ShardDump> {
            self.inner.dump_shard_info(node, f)
        }
        fn fetch_shard_bytes(&self, node: &NodeRef, f: &FragmentRef) -> ecv_query::QueryResult<Bytes> {
            self.inner.fetch_shard_bytes(node, f)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn conflicting_copies_resolve_in_node_order() {
        let q = InMemoryShardQuery::new();
        let key = ObjectKey::head("obj");
        q.add_shard(&NodeRef::osd(0), &key, 1, ShardIndex::new(0), chunk(0xaa));
        q.add_shard(&NodeRef::osd(1), &key, 1, ShardIndex::new(0), chunk(0xbb));
        q.add_shard(&NodeRef::osd(1), &key, 1, ShardIndex::new(1), chunk(1));
        let query = Arc::new(Slow {
            inner: Arc::new(q),
            slow: NodeRef::osd(0),
        });
        let scanner = ClusterScanner::new(query, metadata());
        let order = vec![NodeRef::osd(0), NodeRef::osd(1), NodeRef::osd(0)];

        let mut sequential = ObjectRegistry::new();
        let expected = scanner.scan(&order, &mut sequential);

        let mut concurrent = ObjectRegistry::new();
        let reports = scanner.scan_concurrent(&order, &mut concurrent, 3).await.unwrap();

        assert_eq!(reports, expected);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].duplicates, 1);
        let object = concurrent.get(&key).unwrap();
        assert_eq!(object.slot(ShardIndex::new(0)).unwrap().bytes(), Some(&chunk(0xaa)));
        assert_eq!(Some(object), sequential.get(&key));
    }
}
