//! Reference erasure-code engines.
//!
//! An [`EncodeEngine`] turns a file holding an object's data shards into
//! one file per shard, named `<input>.<index>`, and can reconstruct data
//! from a subset of those files. Verification only uses
//! [`EncodeEngine::chunk_size`] and [`EncodeEngine::encode`].
//!
//! # Engines
//!
//! - [`ToolEncodeEngine`] -- runs `ceph-erasure-code-tool` on a node
//! - [`ReedSolomonEngine`] -- systematic Reed-Solomon computed in-process
//!
//! Both read and write local files. The tool engine either relies on its
//! node sharing this machine's filesystem or copies files to and from the
//! node around every run; see [`Staging`].

pub mod error;
pub mod layout;
pub mod reed_solomon;
pub mod tool;
pub mod traits;

pub use error::{EncodeError, EncodeResult};
pub use layout::{decoded_path, shard_path};
pub use reed_solomon::ReedSolomonEngine;
pub use tool::{ErasureCodeToolConfig, Staging, ToolEncodeEngine};
pub use traits::EncodeEngine;
