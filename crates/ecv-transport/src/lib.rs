//! Command transport to cluster nodes.
//!
//! Everything the verifier learns about the cluster comes from running a
//! command on some node and reading its output. This crate hides how the
//! command gets there behind the [`NodeTransport`] trait.
//!
//! # Implementations
//!
//! - [`ProcessTransport`] -- spawns a local process, optionally wrapped by a
//!   [`Launcher`] (`sudo`, `ssh`, `cephadm shell`)
//! - [`ScriptedTransport`] -- canned responses for tests and embedding
//!
//! A command that runs and exits non-zero is not a transport error. The
//! transport reports it in [`ToolOutput`] and the caller decides what a
//! failed exit means.

pub mod error;
pub mod output;
pub mod process;
pub mod scripted;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use output::ToolOutput;
pub use process::{Launcher, ProcessTransport};
pub use scripted::ScriptedTransport;
pub use traits::NodeTransport;
