use std::time::Duration;

use crate::endpoint::CommandKind;
use crate::response::BridgeError;
use crate::transport::TransportError;

/// All error types that can occur when talking to a bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client has no usable address/token pair.
    #[error("bridge client is not configured; run discovery and pairing first")]
    NotReady,

    /// The request never produced a usable response.
    #[error("{kind} request failed: {source}")]
    Transport {
        kind: CommandKind,
        #[source]
        source: TransportError,
    },

    /// The bridge answered with an error entry.
    #[error("{kind} rejected by bridge: {error}")]
    Device { kind: CommandKind, error: BridgeError },

    /// Nobody pressed the link button before the deadline.
    #[error("pairing timed out after {0:?}; press the link button and retry")]
    PairingTimedOut(Duration),

    /// The pairing loop was cancelled before it finished.
    #[error("pairing cancelled")]
    PairingCancelled,

    /// Discovery returned no bridge for this network.
    #[error("no bridge found on the local network")]
    BridgeNotFound,

    /// A URL was requested without the credential it needs.
    #[error("{kind} endpoint needs a {what}")]
    MissingCredential { kind: CommandKind, what: String },

    /// A URL was requested without the resource identifier it needs.
    #[error("{0} endpoint needs a resource id")]
    MissingIdentifier(CommandKind),

    /// The resource identifier is not a single URL path segment.
    #[error("{kind} endpoint cannot address resource id {id:?}")]
    InvalidIdentifier { kind: CommandKind, id: String },

    /// The operation cannot be used with this command kind.
    #[error("{0} is not supported by this operation")]
    UnsupportedCommand(CommandKind),

    /// The bridge answered with a body this command cannot interpret.
    #[error("unexpected {kind} response: {reason}")]
    UnexpectedResponse { kind: CommandKind, reason: String },

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The credential store could not be read or written.
    #[error("credential store {action} error: {err:?}")]
    Store { action: String, err: std::io::Error },
}

impl Error {
    /// Create a new transport error
    pub fn transport(kind: CommandKind, source: TransportError) -> Self {
        Error::Transport { kind, source }
    }

    /// Create a new device error
    pub fn device(kind: CommandKind, error: BridgeError) -> Self {
        Error::Device { kind, error }
    }

    /// Create a new missing credential error
    pub fn missing_credential(kind: CommandKind, what: &str) -> Self {
        Error::MissingCredential {
            kind,
            what: what.to_string(),
        }
    }

    /// Create a new unexpected response error
    pub fn unexpected(kind: CommandKind, reason: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a new credential store error
    pub fn store(action: &str, err: std::io::Error) -> Self {
        Error::Store {
            action: action.to_string(),
            err,
        }
    }

    /// The bridge error code, if the bridge rejected the request.
    pub fn device_code(&self) -> Option<u16> {
        match self {
            Error::Device { error, .. } => Some(error.code),
            _ => None,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
