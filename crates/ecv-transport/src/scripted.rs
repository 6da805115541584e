//! Scripted transport for tests and embedding.
//!
//! [`ScriptedTransport`] answers commands from a table of canned outputs
//! and records every call it receives. Commands with no scripted answer
//! exit with code 127, as a shell would for a missing binary.

use std::collections::HashMap;
use std::sync::Mutex;

use ecv_types::NodeRef;

use crate::error::TransportResult;
use crate::output::ToolOutput;
use crate::traits::NodeTransport;

type Script = HashMap<(Option<NodeRef>, Vec<String>), ToolOutput>;

/// In-memory [`NodeTransport`] with canned responses.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<(NodeRef, Vec<String>)>>,
    inputs: Mutex<Vec<(NodeRef, Vec<String>, Vec<u8>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `args` run on `node` with `output`.
    pub fn respond<S: AsRef<str>>(&self, node: &NodeRef, args: &[S], output: ToolOutput) {
        self.script
            .lock()
            .expect("lock poisoned")
            .insert((Some(node.clone()), to_owned_args(args)), output);
    }

    /// Answer `args` run on any node with `output`. Node-specific answers
    /// take precedence.
    pub fn respond_any<S: AsRef<str>>(&self, args: &[S], output: ToolOutput) {
        self.script
            .lock()
            .expect("lock poisoned")
            .insert((None, to_owned_args(args)), output);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<(NodeRef, Vec<String>)> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Standard input of every call made through
    /// [`run_with_input`](NodeTransport::run_with_input), in order.
    pub fn inputs(&self) -> Vec<(NodeRef, Vec<String>, Vec<u8>)> {
        self.inputs.lock().expect("lock poisoned").clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }
}

impl NodeTransport for ScriptedTransport {
    fn run(&self, node: &NodeRef, args: &[String]) -> TransportResult<ToolOutput> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push((node.clone(), args.to_vec()));

        let script = self.script.lock().expect("lock poisoned");
        let key = (Some(node.clone()), args.to_vec());
        let output = script
            .get(&key)
            .or_else(|| script.get(&(None, args.to_vec())))
            .cloned()
            .unwrap_or_else(|| ToolOutput::failed(127, format!("{}: command not found", args.join(" "))));
        Ok(output)
    }

    fn run_with_input(&self, node: &NodeRef, args: &[String], input: &[u8]) -> TransportResult<ToolOutput> {
        self.inputs
            .lock()
            .expect("lock poisoned")
            .push((node.clone(), args.to_vec(), input.to_vec()));
        self.run(node, args)
    }
}

fn to_owned_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|a| a.as_ref().to_string()).collect()
}
