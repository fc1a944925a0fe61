//! Error types for the host seam layer.

use simulcard_protocol::{CardId, StackId, TokenId, UserId};

/// Errors that can occur when talking to the host application.
///
/// Reference resolution failures are fatal to rendering the participant
/// they belong to and must be surfaced, never silently swallowed: the
/// host's stores are the source of truth, and a dangling id means the
/// referenced document was deleted out from under the session.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The token document no longer exists on the scene.
    #[error("token {0} does not exist")]
    UnknownToken(TokenId),

    /// The user is not part of this world.
    #[error("user {0} does not exist")]
    UnknownUser(UserId),

    /// The card stack document no longer exists.
    #[error("card stack {0} does not exist")]
    UnknownStack(StackId),

    /// The card is not part of the given stack.
    #[error("card {card} does not exist in stack {stack}")]
    UnknownCard { stack: StackId, card: CardId },

    /// The broadcast channel is gone; no further messages can flow.
    #[error("broadcast channel closed")]
    ChannelClosed,

    /// A message failed to encode for the channel.
    #[error(transparent)]
    Codec(#[from] simulcard_protocol::ProtocolError),
}
