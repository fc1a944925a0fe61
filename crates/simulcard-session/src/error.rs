//! Error types for the session layer.

use simulcard_protocol::TokenId;

/// Errors that can occur constructing or operating on a session.
///
/// Guard no-ops (choosing while locked, re-revealing, re-validating) are
/// deliberately NOT errors: they happen in normal operation whenever two
/// clients' messages race, and the mutation methods report them by
/// returning `false` instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session needs at least one participant.
    #[error("no participants configured")]
    NoParticipants,

    /// Two participant entries named the same token.
    #[error("duplicate participant {0}")]
    DuplicateParticipant(TokenId),
}
