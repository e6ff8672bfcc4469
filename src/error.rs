//! Error types for every layer of the crate.

use bluest::Uuid;
use thiserror::Error;

/// Why a notification payload could not be turned into a [`crate::TelemetryFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A field would have been read past the end of the payload.
    #[error("frame truncated at byte offset {offset}")]
    Truncated { offset: usize },

    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// The payload is a response to something other than a data request.
    /// Callers are expected to ignore these.
    #[error("unrecognized frame type 0x{0:02X}")]
    UnrecognizedFrameType(u8),
}

/// Failures reported by a [`crate::Transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bluetooth error: {0}")]
    Ble(#[from] bluest::Error),

    #[error("default bluetooth adapter not found")]
    AdapterUnavailable,

    #[error("the device does not expose service {0}")]
    ServiceNotFound(Uuid),

    #[error("the device does not expose characteristic {0}")]
    CharacteristicNotFound(Uuid),

    #[error("transport rejected the operation: {0}")]
    Rejected(String),
}

/// Fatal outcomes of a [`crate::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("device not found")]
    DiscoveryTimeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] TransportError),

    #[error("transport disconnected")]
    TransportDisconnected,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
