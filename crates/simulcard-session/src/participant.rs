//! The participant record: one token/user pairing in a session.

use simulcard_protocol::{
    CardId, ParticipantSetup, StackId, TokenId, UserId,
};

/// One participant in the running session.
///
/// A plain data record: ids only, no materialized host documents, no
/// computed accessors. Whatever needs a token name or a card face resolves
/// the id through the host at read time. Mutation happens exclusively
/// through [`Session`](crate::Session), which owns every participant and
/// enforces the lock and reveal guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// The token this participant plays as. Doubles as the participant's
    /// identity: unique within the session, immutable after creation.
    pub token: TokenId,

    /// The user controlling the token.
    pub user: UserId,

    /// The stack this participant draws from.
    pub stack: StackId,

    /// The chosen card, if one has been picked or drawn yet.
    pub card: Option<CardId>,

    /// Whether the chosen card is visible to everyone. Monotonic: once
    /// set, only a full restart clears it.
    pub revealed: bool,

    /// Whether the card is drawn at random instead of picked by the user.
    pub auto: bool,
}

impl Participant {
    /// The participant's identity key.
    pub fn id(&self) -> &TokenId {
        &self.token
    }

    /// Whether the given user controls this participant.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user == user
    }

    /// Whether a card has been chosen or drawn.
    pub fn has_chosen(&self) -> bool {
        self.card.is_some()
    }
}

impl From<ParticipantSetup> for Participant {
    fn from(setup: ParticipantSetup) -> Self {
        Self {
            token: setup.token,
            user: setup.user,
            stack: setup.stack,
            card: setup.card,
            revealed: false,
            auto: setup.auto,
        }
    }
}
