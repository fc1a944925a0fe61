//! Unified error type for the Simulcard engine.

use simulcard_host::HostError;
use simulcard_protocol::ProtocolError;
use simulcard_session::SessionError;

/// Top-level error for engine operations.
///
/// The lifecycle variants are this crate's own: they guard the singleton
/// slot and the authority boundary. Everything else wraps a lower layer's
/// error transparently, so `?` converts throughout.
///
/// None of these ever cross the replication channel. A failure on one
/// client is that client's problem; every other client's state is
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum SimulcardError {
    /// No candidate stack (nor any stack in the world) has a card left
    /// to draw or choose.
    #[error("no card stack with available cards")]
    NoEligibleStacks,

    /// A start was attempted while a session is already running locally.
    /// Checked before anything is broadcast, so a conflicting start never
    /// clobbers the running round on other clients.
    #[error("a session is already running")]
    SessionActive,

    /// A lifecycle action was attempted with no running session.
    #[error("no session is running")]
    NotRunning,

    /// A lifecycle mutation was attempted by a non-authority client.
    #[error("only the authority may {0}")]
    AuthorityRequired(&'static str),

    /// A session-level precondition failed (empty or duplicated
    /// participant configuration).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A host reference no longer resolves.
    #[error(transparent)]
    Host(#[from] HostError),

    /// A message failed to encode or decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The message bus refused a broadcast or receive.
    #[error("bus failure: {0}")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),
}
