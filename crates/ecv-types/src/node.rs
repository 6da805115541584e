use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Role of a cluster node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Object storage daemon holding shards, by numeric id.
    Osd(u32),
    /// Monitor answering pool and profile queries, by name.
    Mon(String),
}

/// A node commands can be run against.
///
/// `host` is only needed by launchers that reach the node remotely.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub host: Option<String>,
}

impl NodeRef {
    pub fn osd(id: u32) -> Self {
        Self {
            kind: NodeKind::Osd(id),
            host: None,
        }
    }

    pub fn mon(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Mon(name.into()),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// The OSD id, if this node is a storage daemon.
    pub fn osd_id(&self) -> Option<u32> {
        match self.kind {
            NodeKind::Osd(id) => Some(id),
            NodeKind::Mon(_) => None,
        }
    }

    /// Daemon name, e.g. `osd.3` or `mon.a`.
    pub fn daemon_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Osd(id) => write!(f, "osd.{id}"),
            NodeKind::Mon(name) => write!(f, "mon.{name}"),
        }
    }
}

impl FromStr for NodeRef {
    type Err = TypeError;

    /// Parse `osd.<id>` or `mon.<name>`, optionally followed by `@<host>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, host) = match s.split_once('@') {
            Some((name, host)) if !host.is_empty() => (name, Some(host.to_string())),
            Some(_) => return Err(TypeError::InvalidNode(s.to_string())),
            None => (s, None),
        };
        let kind = match name.split_once('.') {
            Some(("osd", id)) => NodeKind::Osd(
                id.parse()
                    .map_err(|_| TypeError::InvalidNode(s.to_string()))?,
            ),
            Some(("mon", mon)) if !mon.is_empty() => NodeKind::Mon(mon.to_string()),
            _ => return Err(TypeError::InvalidNode(s.to_string())),
        };
        Ok(Self { kind, host })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(NodeRef::osd(3).to_string(), "osd.3");
        assert_eq!(NodeRef::mon("a").daemon_name(), "mon.a");
    }

    #[test]
    fn parse_with_and_without_host() {
        let node: NodeRef = "osd.12@storage-3".parse().unwrap();
        assert_eq!(node.osd_id(), Some(12));
        assert_eq!(node.host.as_deref(), Some("storage-3"));

        let node: NodeRef = "mon.a".parse().unwrap();
        assert_eq!(node.kind, NodeKind::Mon("a".into()));
        assert!(node.host.is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("osd.x".parse::<NodeRef>().is_err());
        assert!("mds.1".parse::<NodeRef>().is_err());
        assert!("osd.1@".parse::<NodeRef>().is_err());
        assert!("mon.".parse::<NodeRef>().is_err());
    }
}
