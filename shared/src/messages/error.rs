use tabsync_serde::SerdeErr;
use thiserror::Error;

/// Errors raised while encoding, decoding or routing replication messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The envelope header could not be read
    #[error("Malformed message envelope: {source}")]
    MalformedEnvelope {
        #[source]
        source: SerdeErr,
    },

    /// The payload of a known message kind could not be read
    #[error("Failed to decode message {kind}: {source}")]
    Decode {
        kind: String,
        #[source]
        source: SerdeErr,
    },

    /// No handler has been registered under this name
    #[error("Unknown message kind {kind}")]
    UnknownKind { kind: String },

    /// An envelope was opened as a different message than it carries
    #[error("Expected message {expected}, envelope carries {actual}")]
    KindMismatch {
        expected: &'static str,
        actual: String,
    },

    /// A handler for this name is already registered
    #[error("Message kind {kind} registered twice")]
    AlreadyRegistered { kind: &'static str },
}
