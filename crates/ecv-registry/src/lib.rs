//! Registry of logical erasure-coded objects.
//!
//! Shard fragments arrive one at a time, from whichever node holds them, in
//! no particular order. The [`ObjectRegistry`] groups them by
//! [`ObjectKey`](ecv_types::ObjectKey) into [`EcObject`]s, resolving each
//! object's coding profile the first time the object is seen.
//!
//! # Design Rules
//!
//! 1. Identity is (oid, snapid) only. The node and shard index of the first
//!    fragment seen do not matter.
//! 2. A shard slot is written at most once; later fragments for a filled
//!    slot leave it untouched.
//! 3. Indices outside `[0, k + m)` and shards of the wrong length are
//!    rejected, never stored.
//! 4. If the profile cannot be resolved the object is not created, and the
//!    next fragment for the same key tries again.
//! 5. Objects are never removed. The registry lives for one run and is
//!    owned by whoever drives it; there is no global instance.

pub mod ceph;
pub mod error;
pub mod memory;
pub mod object;
pub mod registry;
pub mod resolver;

pub use ceph::{CephCliConfig, CephClusterMetadata};
pub use error::{MetadataError, MetadataResult, RegistryError, RegistryResult};
pub use memory::InMemoryClusterMetadata;
pub use object::{EcObject, FillOutcome};
pub use registry::{IngestOutcome, ObjectRegistry, RegistryStats};
pub use resolver::{CachingResolver, ClusterMetadata, ProfileResolver};
