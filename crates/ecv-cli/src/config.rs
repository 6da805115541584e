use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use ecv_encode::{ErasureCodeToolConfig, Staging};
use ecv_query::ObjectStoreToolConfig;
use ecv_registry::CephCliConfig;
use ecv_transport::Launcher;
use ecv_types::NodeRef;
use ecv_verify::ScratchLayout;
use serde::{Deserialize, Serialize};

/// Settings for an `ecv` run, read from TOML. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcvConfig {
    pub cluster: ClusterConfig,
    pub transport: Launcher,
    pub tools: ToolsConfig,
    pub scratch: ScratchLayout,
    pub scan: ScanConfig,
    pub encoder: EncoderConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Monitor that answers pool and profile queries.
    pub mon: String,
    pub mon_host: Option<String>,
    /// OSDs to scan. Empty means every OSD in the OSD map.
    pub osds: Vec<u32>,
    /// Host of each OSD, keyed by daemon name (`osd.3`).
    pub hosts: BTreeMap<String, String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            mon: "a".into(),
            mon_host: None,
            osds: Vec::new(),
            hosts: BTreeMap::new(),
        }
    }
}

impl ClusterConfig {
    pub fn mon_node(&self) -> NodeRef {
        let node = NodeRef::mon(self.mon.clone());
        match &self.mon_host {
            Some(host) => node.with_host(host.clone()),
            None => node,
        }
    }

    /// Attach the configured host, if any, to `node`.
    pub fn with_host(&self, node: NodeRef) -> NodeRef {
        match self.hosts.get(&node.daemon_name()) {
            Some(host) => node.with_host(host.clone()),
            None => node,
        }
    }

    pub fn osd_node(&self, id: u32) -> NodeRef {
        self.with_host(NodeRef::osd(id))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub objectstore: ObjectStoreToolConfig,
    pub erasure_code: ErasureCodeToolConfig,
    pub ceph: CephCliConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// OSDs queried at once; 1 scans sequentially.
    pub parallelism: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderKind {
    /// `ceph-erasure-code-tool` on a cluster node.
    #[default]
    Tool,
    /// In-process Reed-Solomon.
    ReedSolomon,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub kind: EncoderKind,
    /// Node the tool runs on, as `osd.N` or `mon.X`. Defaults to the monitor.
    pub node: Option<String>,
}

impl EcvConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Read `path`, or fall back to the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Node the erasure code tool runs on.
    pub fn encoder_node(&self) -> anyhow::Result<NodeRef> {
        match &self.encoder.node {
            Some(name) => {
                let node: NodeRef = name
                    .parse()
                    .with_context(|| format!("invalid encoder node {name}"))?;
                Ok(if node.host.is_some() { node } else { self.cluster.with_host(node) })
            }
            None => Ok(self.cluster.mon_node()),
        }
    }

    /// How the erasure code tool's files reach its node under the
    /// configured launcher.
    ///
    /// Local launchers share the scratch directory. Ssh copies files over
    /// the transport. A cephadm shell keeps nothing between commands, so
    /// the tool encoder cannot run through it.
    pub fn encoder_staging(&self) -> anyhow::Result<Staging> {
        if self.transport.shares_filesystem() {
            Ok(Staging::Shared)
        } else if self.transport.keeps_files() {
            Ok(Staging::Transfer)
        } else {
            anyhow::bail!(
                "encoder kind \"tool\" cannot run through a cephadm shell; \
                 set [encoder] kind = \"reed-solomon\" or use the local, sudo or ssh transport"
            )
        }
    }
}
