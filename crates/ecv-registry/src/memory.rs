use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ecv_types::{ErasureCodeProfile, NodeRef};

use crate::error::{MetadataError, MetadataResult};
use crate::resolver::{ClusterMetadata, ProfileResolver};

#[derive(Debug, Default)]
struct State {
    nodes: BTreeSet<NodeRef>,
    pools: HashMap<i64, String>,
    profiles: HashMap<String, ErasureCodeProfile>,
}

/// In-memory [`ClusterMetadata`] for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryClusterMetadata {
    state: RwLock<State>,
}

impl InMemoryClusterMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: NodeRef) {
        self.state.write().expect("lock poisoned").nodes.insert(node);
    }

    /// Register a named profile.
    pub fn add_profile(&self, name: impl Into<String>, profile: ErasureCodeProfile) {
        self.state
            .write()
            .expect("lock poisoned")
            .profiles
            .insert(name.into(), profile);
    }

    /// Point `pool` at the profile called `name`.
    pub fn set_pool_profile(&self, pool: i64, name: impl Into<String>) {
        self.state
            .write()
            .expect("lock poisoned")
            .pools
            .insert(pool, name.into());
    }

    /// Register a profile and a pool using it.
    pub fn add_pool(&self, pool: i64, name: &str, profile: ErasureCodeProfile) {
        self.add_profile(name, profile);
        self.set_pool_profile(pool, name);
    }
}

impl ClusterMetadata for InMemoryClusterMetadata {
    fn list_storage_nodes(&self) -> MetadataResult<Vec<NodeRef>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.nodes.iter().cloned().collect())
    }

    fn pool_profile_name(&self, pool: i64) -> MetadataResult<String> {
        let state = self.state.read().expect("lock poisoned");
        state
            .pools
            .get(&pool)
            .cloned()
            .ok_or(MetadataError::UnknownPool(pool))
    }

    fn profile_parameters(&self, name: &str) -> MetadataResult<ErasureCodeProfile> {
        let state = self.state.read().expect("lock poisoned");
        state
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownProfile(name.to_string()))
    }
}

impl ProfileResolver for InMemoryClusterMetadata {
    fn resolve(&self, pool: i64) -> MetadataResult<ErasureCodeProfile> {
        self.resolve_pool_profile(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_list_in_order() {
        let md = InMemoryClusterMetadata::new();
        md.add_node(NodeRef::osd(2));
        md.add_node(NodeRef::osd(0));
        md.add_node(NodeRef::osd(2));
        assert_eq!(md.list_storage_nodes().unwrap(), vec![NodeRef::osd(0), NodeRef::osd(2)]);
    }

    #[test]
    fn pool_resolves_through_profile_name() {
        let md = InMemoryClusterMetadata::new();
        md.add_pool(3, "ec42", ErasureCodeProfile::new("jerasure", 4, 2).unwrap());
        assert_eq!(md.pool_profile_name(3).unwrap(), "ec42");
        assert_eq!(md.resolve(3).unwrap().shard_count(), 6);
    }

    #[test]
    fn dangling_profile_name_is_unknown() {
        let md = InMemoryClusterMetadata::new();
        md.set_pool_profile(1, "gone");
        assert!(matches!(md.resolve(1), Err(MetadataError::UnknownProfile(n)) if n == "gone"));
        assert!(matches!(md.resolve(2), Err(MetadataError::UnknownPool(2))));
    }
}
