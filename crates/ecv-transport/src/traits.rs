use std::sync::Arc;

use ecv_types::NodeRef;

use crate::error::TransportResult;
use crate::output::ToolOutput;

/// Runs a command on a cluster node and captures its output.
///
/// Calls block until the command exits. There is no timeout at this layer;
/// an implementation that needs one must enforce it itself.
pub trait NodeTransport: Send + Sync {
    /// Run `args` on `node`.
    ///
    /// Returns `Err` only when the command could not be delivered. A
    /// non-zero exit is reported through [`ToolOutput::success`].
    fn run(&self, node: &NodeRef, args: &[String]) -> TransportResult<ToolOutput>;

    /// Run `args` on `node` with `input` fed to its standard input.
    fn run_with_input(&self, node: &NodeRef, args: &[String], input: &[u8]) -> TransportResult<ToolOutput>;
}

impl<T: NodeTransport + ?Sized> NodeTransport for Arc<T> {
    fn run(&self, node: &NodeRef, args: &[String]) -> TransportResult<ToolOutput> {
        (**self).run(node, args)
    }

    fn run_with_input(&self, node: &NodeRef, args: &[String], input: &[u8]) -> TransportResult<ToolOutput> {
        (**self).run_with_input(node, args, input)
    }
}

impl<T: NodeTransport + ?Sized> NodeTransport for &T {
    fn run(&self, node: &NodeRef, args: &[String]) -> TransportResult<ToolOutput> {
        (**self).run(node, args)
    }

    fn run_with_input(&self, node: &NodeRef, args: &[String], input: &[u8]) -> TransportResult<ToolOutput> {
        (**self).run_with_input(node, args, input)
    }
}
