use std::io;

use thiserror::Error;

use tabsync_shared::ProtocolError;

/// Errors raised by a feature executor
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor thread or its runtime could not be started
    #[error("Failed to start executor {name}: {source}")]
    Runtime {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    /// The executor was shut down before the request completed
    #[error("Executor {name} is shut down")]
    ShutDown { name: &'static str },

    /// A task tried to wait for its own executor
    #[error("Executor {name} cannot be waited on from its own thread")]
    FlushFromExecutor { name: &'static str },
}

/// Errors raised while setting up or driving a [`SyncServer`](crate::SyncServer)
#[derive(Debug, Error)]
pub enum SyncServerError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
