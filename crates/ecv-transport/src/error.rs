use thiserror::Error;

/// Errors from delivering a command to a node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The command could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Feeding standard input to the command failed.
    #[error("failed to write stdin of `{program}`: {source}")]
    Stdin {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The launcher needs a host address the node does not have.
    #[error("node {0} has no host address")]
    MissingHost(String),

    /// Nothing to run.
    #[error("empty command line")]
    EmptyCommand,
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
