use std::fs;
use std::path::{Path, PathBuf};

use ecv_transport::{NodeTransport, ToolOutput};
use ecv_types::{ErasureCodeProfile, NodeRef, ShardSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{EncodeError, EncodeResult};
use crate::layout::{decoded_path, shard_path};
use crate::traits::EncodeEngine;

/// How to invoke the erasure code tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErasureCodeToolConfig {
    /// Tool binary name or path.
    pub binary: String,
}

impl Default for ErasureCodeToolConfig {
    fn default() -> Self {
        Self {
            binary: "ceph-erasure-code-tool".into(),
        }
    }
}

/// How the tool's input and output files reach the node it runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Staging {
    /// The node sees this machine's filesystem. Paths are passed as is.
    #[default]
    Shared,
    /// Inputs are copied to the same path on the node before each run and
    /// outputs are copied back afterwards, all through the transport.
    Transfer,
}

/// [`EncodeEngine`] that runs `ceph-erasure-code-tool` on one node.
///
/// Paths handed to the engine are local. With [`Staging::Transfer`] the
/// engine mirrors them on the node around every tool run.
pub struct ToolEncodeEngine<T> {
    transport: T,
    node: NodeRef,
    config: ErasureCodeToolConfig,
    staging: Staging,
}

impl<T: NodeTransport> ToolEncodeEngine<T> {
    pub fn new(transport: T, node: NodeRef, config: ErasureCodeToolConfig) -> Self {
        Self {
            transport,
            node,
            config,
            staging: Staging::Shared,
        }
    }

    pub fn with_staging(mut self, staging: Staging) -> Self {
        self.staging = staging;
        self
    }

    /// The node the tool runs on.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn staging(&self) -> Staging {
        self.staging
    }

    fn run(&self, operation: &'static str, args: Vec<String>) -> EncodeResult<ToolOutput> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push(self.config.binary.clone());
        argv.push(operation.to_string());
        argv.extend(args);
        debug!(node = %self.node, operation, args = ?&argv[2..], "running erasure code tool");
        self.checked(operation, &argv, None)
    }

    fn checked(&self, operation: &'static str, argv: &[String], input: Option<&[u8]>) -> EncodeResult<ToolOutput> {
        let output = match input {
            Some(input) => self.transport.run_with_input(&self.node, argv, input)?,
            None => self.transport.run(&self.node, argv)?,
        };
        if !output.success() {
            error!(
                node = %self.node,
                operation,
                code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "erasure code tool failed"
            );
            return Err(EncodeError::ToolFailed {
                operation,
                code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    /// Copy the local file at `path` to the same path on the node.
    fn upload(&self, path: &Path) -> EncodeResult<()> {
        if self.staging == Staging::Shared {
            return Ok(());
        }
        let data = fs::read(path).map_err(|source| EncodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let mkdir: Vec<String> = vec!["mkdir".into(), "-p".into(), parent.display().to_string()];
            self.checked("stage", &mkdir, None)?;
        }
        let dd: Vec<String> = vec![
            "dd".into(),
            format!("of={}", path.display()),
            "bs=1M".into(),
            "status=none".into(),
        ];
        self.checked("stage", &dd, Some(&data))?;
        debug!(node = %self.node, path = %path.display(), bytes = data.len(), "staged file on node");
        Ok(())
    }

    /// Copy the file at `path` on the node to the same local path.
    fn download(&self, path: &Path) -> EncodeResult<()> {
        if self.staging == Staging::Shared {
            return Ok(());
        }
        let cat: Vec<String> = vec!["cat".into(), path.display().to_string()];
        let output = self.checked("fetch", &cat, None)?;
        fs::write(path, &output.stdout).map_err(|source| EncodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(node = %self.node, path = %path.display(), bytes = output.stdout.len(), "fetched file from node");
        Ok(())
    }
}

impl<T: NodeTransport> EncodeEngine for ToolEncodeEngine<T> {
    fn chunk_size(&self, profile: &ErasureCodeProfile, object_size: u64) -> EncodeResult<u64> {
        let output = self.run(
            "calc-chunk-size",
            vec![profile.to_tool_string(), object_size.to_string()],
        )?;
        let text = output.stdout_text();
        let trimmed = text.trim();
        trimmed.parse::<u64>().map_err(|_| {
            error!(output = %trimmed, "erasure code tool returned no usable chunk size");
            EncodeError::InvalidOutput {
                operation: "calc-chunk-size",
                output: trimmed.to_string(),
            }
        })
    }

    fn encode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        wanted: &ShardSet,
        input: &Path,
    ) -> EncodeResult<()> {
        self.upload(input)?;
        self.run(
            "encode",
            vec![
                profile.to_tool_string(),
                stripe_unit.to_string(),
                wanted.to_tool_arg(),
                input.display().to_string(),
            ],
        )?;
        for index in wanted.iter() {
            self.download(&shard_path(input, index))?;
        }
        Ok(())
    }

    fn decode(
        &self,
        profile: &ErasureCodeProfile,
        stripe_unit: u64,
        available: &ShardSet,
        input: &Path,
    ) -> EncodeResult<PathBuf> {
        for index in available.iter() {
            self.upload(&shard_path(input, index))?;
        }
        self.run(
            "decode",
            vec![
                profile.to_tool_string(),
                stripe_unit.to_string(),
                available.to_tool_arg(),
                input.display().to_string(),
            ],
        )?;
        let decoded = decoded_path(input);
        self.download(&decoded)?;
        Ok(decoded)
    }
}
