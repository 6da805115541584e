use bytes::Bytes;
use ecv_transport::{NodeTransport, ToolOutput};
use ecv_types::NodeRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::dump::ShardDump;
use crate::error::{QueryError, QueryResult};
use crate::listing::{parse_listing, FragmentRef};
use crate::traits::ShardQuery;

/// How to invoke the object store tool on a storage node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreToolConfig {
    /// Tool binary name or path.
    pub binary: String,
    /// Data path of an OSD; `{id}` is replaced with the OSD id.
    pub data_path_template: String,
}

impl Default for ObjectStoreToolConfig {
    fn default() -> Self {
        Self {
            binary: "ceph-objectstore-tool".into(),
            data_path_template: "/var/lib/ceph/osd/ceph-{id}".into(),
        }
    }
}

/// [`ShardQuery`] backed by `ceph-objectstore-tool`.
///
/// The tool reads the OSD's store directly, so the daemon must not be
/// running while it is queried. Stopping and restarting daemons is left to
/// whoever drives the scan.
pub struct ObjectStoreTool<T> {
    transport: T,
    config: ObjectStoreToolConfig,
}

impl<T: NodeTransport> ObjectStoreTool<T> {
    pub fn new(transport: T, config: ObjectStoreToolConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ObjectStoreToolConfig {
        &self.config
    }

    /// Full tool argv for `cmd` against `node`'s store.
    pub fn command_line(&self, node: &NodeRef, cmd: &[&str]) -> QueryResult<Vec<String>> {
        let id = node
            .osd_id()
            .ok_or_else(|| QueryError::NotAStorageNode(node.to_string()))?;
        let data_path = self.config.data_path_template.replace("{id}", &id.to_string());
        let mut args = vec![
            self.config.binary.clone(),
            "--err-to-stderr".into(),
            "--no-mon-config".into(),
            "--data-path".into(),
            data_path,
        ];
        args.extend(cmd.iter().map(|s| s.to_string()));
        Ok(args)
    }

    fn run(&self, node: &NodeRef, operation: &'static str, cmd: &[&str]) -> QueryResult<ToolOutput> {
        let args = self.command_line(node, cmd)?;
        let output = self.transport.run(node, &args)?;
        if !output.success() {
            error!(
                node = %node,
                operation,
                code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "object store tool failed"
            );
            return Err(QueryError::ToolFailed {
                operation,
                code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

impl<T: NodeTransport> ShardQuery for ObjectStoreTool<T> {
    fn list_shard_fragments(&self, node: &NodeRef) -> QueryResult<Vec<FragmentRef>> {
        let output = self.run(node, "list", &["--op", "list"])?;
        if output.stdout_is_blank() {
            return Err(QueryError::EmptyOutput("list"));
        }
        let fragments = parse_listing(&output.stdout_text());
        debug!(node = %node, count = fragments.len(), "listed EC shard fragments");
        Ok(fragments)
    }

    fn dump_shard_info(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<ShardDump> {
        let output = self.run(node, "dump", &["--json", fragment.as_selector(), "dump"])?;
        if output.stdout_is_blank() {
            return Err(QueryError::EmptyOutput("dump"));
        }
        ShardDump::from_json(&output.stdout_text())
    }

    fn fetch_shard_bytes(&self, node: &NodeRef, fragment: &FragmentRef) -> QueryResult<Bytes> {
        let output = self.run(node, "get-bytes", &[fragment.as_selector(), "get-bytes"])?;
        if output.stdout.is_empty() {
            return Err(QueryError::EmptyOutput("get-bytes"));
        }
        Ok(Bytes::from(output.stdout))
    }
}
