use ecv_transport::NodeTransport;
use ecv_types::{ErasureCodeProfile, NodeRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{MetadataError, MetadataResult};
use crate::resolver::{ClusterMetadata, ProfileResolver};

/// How to invoke the cluster admin CLI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CephCliConfig {
    /// CLI binary name or path.
    pub binary: String,
}

impl Default for CephCliConfig {
    fn default() -> Self {
        Self { binary: "ceph".into() }
    }
}

#[derive(Debug, Deserialize)]
struct OsdDump {
    #[serde(default)]
    pools: Vec<PoolEntry>,
    #[serde(default)]
    osds: Vec<OsdEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    pool: i64,
    pool_name: String,
}

#[derive(Debug, Deserialize)]
struct OsdEntry {
    osd: u32,
}

#[derive(Debug, Deserialize)]
struct PoolProfileReply {
    #[serde(default)]
    erasure_code_profile: String,
}

/// [`ClusterMetadata`] read from the cluster admin CLI on a monitor node.
///
/// Storage nodes are taken from the OSD map. A pool's profile is found by
/// mapping the pool id to its name, asking the pool for its
/// `erasure_code_profile` property and fetching that profile.
pub struct CephClusterMetadata<T> {
    transport: T,
    mon: NodeRef,
    config: CephCliConfig,
}

impl<T: NodeTransport> CephClusterMetadata<T> {
    pub fn new(transport: T, mon: NodeRef, config: CephCliConfig) -> Self {
        Self {
            transport,
            mon,
            config,
        }
    }

    /// The node admin commands run on.
    pub fn mon(&self) -> &NodeRef {
        &self.mon
    }

    fn command(&self, what: &'static str, args: &[&str]) -> MetadataResult<Value> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.config.binary.clone());
        argv.extend(args.iter().map(|a| a.to_string()));
        debug!(node = %self.mon, command = %argv.join(" "), "running admin command");

        let output = self.transport.run(&self.mon, &argv)?;
        if !output.success() {
            error!(
                node = %self.mon,
                command = %argv.join(" "),
                code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "admin command failed"
            );
            return Err(MetadataError::CommandFailed {
                command: argv.join(" "),
                code: output.exit_code,
                stderr: output.stderr,
            });
        }
        if output.stdout_is_blank() {
            return Err(MetadataError::EmptyOutput(argv.join(" ")));
        }
        serde_json::from_slice(&output.stdout).map_err(|source| MetadataError::Parse { what, source })
    }

    fn typed<D: DeserializeOwned>(&self, what: &'static str, args: &[&str]) -> MetadataResult<D> {
        let value = self.command(what, args)?;
        serde_json::from_value(value).map_err(|source| MetadataError::Parse { what, source })
    }

    fn osd_dump(&self) -> MetadataResult<OsdDump> {
        self.typed("osd dump", &["osd", "dump", "--format=json"])
    }
}

impl<T: NodeTransport> ClusterMetadata for CephClusterMetadata<T> {
    fn list_storage_nodes(&self) -> MetadataResult<Vec<NodeRef>> {
        let dump = self.osd_dump()?;
        Ok(dump.osds.iter().map(|o| NodeRef::osd(o.osd)).collect())
    }

    fn pool_profile_name(&self, pool: i64) -> MetadataResult<String> {
        let dump = self.osd_dump()?;
        let entry = dump
            .pools
            .iter()
            .find(|p| p.pool == pool)
            .ok_or(MetadataError::UnknownPool(pool))?;
        let reply: PoolProfileReply = self.typed(
            "pool property",
            &[
                "osd",
                "pool",
                "get",
                entry.pool_name.as_str(),
                "erasure_code_profile",
                "--format=json",
            ],
        )?;
        if reply.erasure_code_profile.is_empty() {
            return Err(MetadataError::NotErasureCoded(entry.pool_name.clone()));
        }
        Ok(reply.erasure_code_profile)
    }

    fn profile_parameters(&self, name: &str) -> MetadataResult<ErasureCodeProfile> {
        let value = self.command(
            "erasure code profile",
            &["osd", "erasure-code-profile", "get", name, "--format=json"],
        )?;
        Ok(ErasureCodeProfile::from_json(&value)?)
    }
}

impl<T: NodeTransport> ProfileResolver for CephClusterMetadata<T> {
    fn resolve(&self, pool: i64) -> MetadataResult<ErasureCodeProfile> {
        self.resolve_pool_profile(pool)
    }
}
