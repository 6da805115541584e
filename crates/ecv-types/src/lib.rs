//! Foundation types for EC parity verification.
//!
//! Every other `ecv` crate depends on `ecv-types`. The types here carry no
//! behaviour beyond validation and formatting; querying, encoding and
//! comparing live in the crates above.
//!
//! # Key Types
//!
//! - [`ObjectKey`] -- Stable identity of a logical EC object (oid + snapshot tag)
//! - [`ShardIndex`] -- Position of a shard within an object's `k + m` slots
//! - [`ShardSet`] -- Ordered set of shard indices, as passed to the EC tool
//! - [`ShardSlot`] -- `Absent | Present(bytes)` slot holding one shard
//! - [`ErasureCodeProfile`] -- Typed coding profile (k, m, plugin, parameters)
//! - [`NodeRef`] -- A storage node or monitor in the cluster

pub mod error;
pub mod node;
pub mod object;
pub mod profile;
pub mod shard;

pub use error::TypeError;
pub use node::{NodeKind, NodeRef};
pub use object::ObjectKey;
pub use profile::{ErasureCodeProfile, MAX_SHARD_COUNT};
pub use shard::{ShardIndex, ShardSet, ShardSlot};
