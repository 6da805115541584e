use std::collections::HashMap;
use std::sync::RwLock;

use ecv_types::{ErasureCodeProfile, NodeRef};
use tracing::debug;

use crate::error::MetadataResult;

/// Resolves the erasure code profile of a pool.
pub trait ProfileResolver {
    fn resolve(&self, pool: i64) -> MetadataResult<ErasureCodeProfile>;
}

/// Cluster-wide metadata needed to drive a scan.
pub trait ClusterMetadata: Send + Sync {
    /// Every storage node in the cluster.
    fn list_storage_nodes(&self) -> MetadataResult<Vec<NodeRef>>;

    /// Name of the erasure code profile configured on `pool`.
    fn pool_profile_name(&self, pool: i64) -> MetadataResult<String>;

    /// Parameters of the named erasure code profile.
    fn profile_parameters(&self, name: &str) -> MetadataResult<ErasureCodeProfile>;

    /// Pool id to profile, through the profile name.
    fn resolve_pool_profile(&self, pool: i64) -> MetadataResult<ErasureCodeProfile> {
        let name = self.pool_profile_name(pool)?;
        self.profile_parameters(&name)
    }
}

impl<T: ProfileResolver + ?Sized> ProfileResolver for &T {
    fn resolve(&self, pool: i64) -> MetadataResult<ErasureCodeProfile> {
        (**self).resolve(pool)
    }
}

/// Remembers successful resolutions per pool.
///
/// Failures are not remembered, so a later lookup of the same pool asks
/// the inner resolver again.
pub struct CachingResolver<R> {
    inner: R,
    cache: RwLock<HashMap<i64, ErasureCodeProfile>>,
}

impl<R: ProfileResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of pools resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.read().expect("lock poisoned").len()
    }
}

impl<R: ProfileResolver> ProfileResolver for CachingResolver<R> {
    fn resolve(&self, pool: i64) -> MetadataResult<ErasureCodeProfile> {
        if let Some(profile) = self.cache.read().expect("lock poisoned").get(&pool) {
            return Ok(profile.clone());
        }
        let profile = self.inner.resolve(pool)?;
        debug!(pool, profile = %profile, "resolved pool profile");
        self.cache
            .write()
            .expect("lock poisoned")
            .insert(pool, profile.clone());
        Ok(profile)
    }
}
