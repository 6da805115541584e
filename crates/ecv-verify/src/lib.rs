//! Parity verification for erasure-coded objects.
//!
//! Verification regenerates the parity of every registered object from its
//! data shards and compares the result, byte for byte, with the parity the
//! cluster stores. The first disagreement ends the run.
//!
//! # Workflow
//!
//! 1. A [`ClusterScanner`] lists the shard fragments on each storage node
//!    and feeds them into an [`ObjectRegistry`](ecv_registry::ObjectRegistry).
//! 2. A [`VerificationEngine`] walks the registry in key order. For each
//!    object it writes the data shards to a scratch file, asks its
//!    [`EncodeEngine`](ecv_encode::EncodeEngine) for fresh parity and
//!    compares shards `k..k+m`.
//! 3. The resulting [`VerificationSummary`] prints in the familiar
//!    `Results:` form or serializes to JSON.
//!
//! Scanning tolerates bad fragments: they are logged and skipped.
//! Verification does not: a missing shard, an encoder failure or a parity
//! mismatch is returned as a [`VerifyError`].

pub mod engine;
pub mod error;
pub mod report;
pub mod scanner;
pub mod scratch;

pub use engine::VerificationEngine;
pub use error::{VerifyError, VerifyResult};
pub use report::{ObjectReport, ParityDigest, VerificationSummary};
pub use scanner::{ClusterScanner, NodeScanReport};
pub use scratch::ScratchLayout;
