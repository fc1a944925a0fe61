//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding replication messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a message).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// event tag from a newer module version.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but violates a protocol rule, such as
    /// a `start` with an empty participant list.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
