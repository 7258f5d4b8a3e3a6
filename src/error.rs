//! Error types for thumper-client.

use thiserror::Error;

use crate::envelope::DecodeError;

/// Boxed error returned by message handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all thumper operations.
#[derive(Debug, Error)]
pub enum ThumperError {
    /// I/O error on the relay or RPC stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (topology files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (invalid frame, out-of-order disposition, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Relay closed in the middle of a frame or while a reply was expected.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Delivery metadata could not be decoded.
    #[error("Envelope decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Message handler failed; the message was rejected.
    #[error("Handler failed for delivery {delivery_tag}: {source}")]
    Handler {
        /// Delivery tag of the rejected message.
        delivery_tag: u64,
        /// Error raised by the handler.
        source: BoxError,
    },

    /// Invalid argument passed to a management call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The host runtime answered an RPC call with an error.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Invalid configuration (relay address, environment).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Topology declaration failed for the named entity.
    #[error("Failed to declare {entity}: {source}")]
    Declare {
        /// Human-readable entity description, e.g. `queue orders`.
        entity: String,
        /// Underlying failure.
        source: Box<ThumperError>,
    },
}

/// Result type alias using ThumperError.
pub type Result<T> = std::result::Result<T, ThumperError>;
