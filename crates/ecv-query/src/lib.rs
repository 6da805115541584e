//! Read-only shard queries against a single storage node.
//!
//! A node's local object store is asked three things: which EC shard
//! fragments it holds, the metadata of one fragment, and the raw bytes of
//! one fragment. The answers are never cached; every call goes to the node.
//!
//! # Implementations
//!
//! All backends implement the [`ShardQuery`] trait:
//!
//! - [`ObjectStoreTool`] -- drives `ceph-objectstore-tool` through a
//!   [`NodeTransport`](ecv_transport::NodeTransport)
//! - [`InMemoryShardQuery`] -- fragments held in memory for tests and embedding
//!
//! Every failure is returned as a [`QueryError`]. Whether a failure skips a
//! fragment or stops the run is the caller's decision.

pub mod dump;
pub mod error;
pub mod listing;
pub mod memory;
pub mod tool;
pub mod traits;

pub use dump::{FragmentMeta, HashInfo, ShardDump, ShardDumpId};
pub use error::{QueryError, QueryResult};
pub use listing::{parse_listing, FragmentRef};
pub use memory::InMemoryShardQuery;
pub use tool::{ObjectStoreTool, ObjectStoreToolConfig};
pub use traits::ShardQuery;
