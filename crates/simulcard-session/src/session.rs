//! The session state machine.
//!
//! A [`Session`] is one round of simultaneous card selection among a fixed
//! set of participants. Its lifecycle, as seen from one client:
//!
//! ```text
//!             start                    validate
//! (no session) ────→ Active(unlocked) ─────────→ Active(locked)
//!                          ↑                           │
//!                          └────────── restart ────────┘
//!                                 close (from either)
//!                          ────────────────────────────→ (no session)
//! ```
//!
//! Card choice is permitted only while unlocked; reveal is permitted in
//! both Active states. Every mutation returns whether state actually
//! changed, and "no" is the answer for anything a message race can
//! produce: choosing while locked, re-revealing, re-validating, touching
//! an unknown participant. Senders and receivers run the exact same
//! guards, because the transport promises no ordering across different
//! message kinds.

use std::collections::HashSet;

use simulcard_protocol::{
    CardId, ParticipantSetup, TokenId, UpdateFields, UserId,
};

use crate::{Participant, SessionError};

/// One round of simultaneous card selection.
///
/// Each client holds its own copy, kept consistent with everyone else's by
/// replaying the same broadcast messages. There is at most one per client;
/// the engine owns the singleton slot.
#[derive(Debug, Clone)]
pub struct Session {
    participants: Vec<Participant>,
    locked: bool,
}

impl Session {
    /// Builds a session from the participant configuration carried by a
    /// `start` message.
    ///
    /// # Errors
    /// - [`SessionError::NoParticipants`] for an empty configuration.
    /// - [`SessionError::DuplicateParticipant`] when two entries share a
    ///   token.
    pub fn new(
        setups: Vec<ParticipantSetup>,
    ) -> Result<Self, SessionError> {
        if setups.is_empty() {
            return Err(SessionError::NoParticipants);
        }

        let mut seen = HashSet::new();
        for setup in &setups {
            if !seen.insert(setup.token.clone()) {
                return Err(SessionError::DuplicateParticipant(
                    setup.token.clone(),
                ));
            }
        }

        Ok(Self {
            participants: setups.into_iter().map(Participant::from).collect(),
            locked: false,
        })
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// The participants, in configuration order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Looks up a participant by identity.
    pub fn participant(&self, token: &TokenId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == token)
    }

    fn participant_mut(
        &mut self,
        token: &TokenId,
    ) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.token == token)
    }

    /// Whether choices are locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the given user controls at least one participant.
    pub fn has_member(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p.is_owned_by(user))
    }

    /// Whether every participant has a card.
    pub fn all_chosen(&self) -> bool {
        self.participants.iter().all(Participant::has_chosen)
    }

    /// Whether every participant's card is revealed.
    pub fn all_revealed(&self) -> bool {
        self.participants.iter().all(|p| p.revealed)
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Sets a participant's card choice.
    ///
    /// Returns `false` without touching anything when the session is
    /// locked, the participant is unknown, the participant is already
    /// revealed (a revealed card is frozen until restart), or the same
    /// card is already chosen.
    pub fn choose_card(&mut self, token: &TokenId, card: CardId) -> bool {
        if self.locked {
            return false;
        }
        let Some(p) = self.participant_mut(token) else {
            return false;
        };
        if p.revealed || p.card.as_ref() == Some(&card) {
            return false;
        }
        tracing::debug!(participant = %token, %card, "card chosen");
        p.card = Some(card);
        true
    }

    /// Marks a participant's card as revealed.
    ///
    /// Idempotent: returns `false` if already revealed or unknown.
    /// Reveals are allowed while locked; the lock freezes choices, not
    /// visibility.
    pub fn reveal(&mut self, token: &TokenId) -> bool {
        let Some(p) = self.participant_mut(token) else {
            return false;
        };
        if p.revealed {
            return false;
        }
        tracing::debug!(participant = %token, "participant revealed");
        p.revealed = true;
        true
    }

    /// Locks all card choices. Idempotent.
    pub fn validate(&mut self) -> bool {
        if self.locked {
            return false;
        }
        tracing::debug!("session locked");
        self.locked = true;
        true
    }

    /// Clears every participant's card and reveal flag and unlocks.
    ///
    /// This is the restart's clearing half; re-drawing cards for
    /// auto-assign participants is the engine's job, since it needs the
    /// host's stores and a random source.
    pub fn reset(&mut self) {
        tracing::debug!("session reset");
        for p in &mut self.participants {
            p.card = None;
            p.revealed = false;
        }
        self.locked = false;
    }

    /// Applies the partial update carried by an inbound `update` message.
    ///
    /// The whole update is dropped while locked (mirroring the sender's
    /// own guard); within an update, a card change is dropped for a
    /// revealed participant and a reveal flag is applied only in the
    /// `false → true` direction.
    pub fn apply_update(
        &mut self,
        token: &TokenId,
        fields: &UpdateFields,
    ) -> bool {
        if self.locked {
            return false;
        }
        let Some(p) = self.participant_mut(token) else {
            return false;
        };

        let mut changed = false;
        if let Some(card) = &fields.card {
            if !p.revealed && p.card.as_ref() != Some(card) {
                p.card = Some(card.clone());
                changed = true;
            }
        }
        if fields.revealed == Some(true) && !p.revealed {
            p.revealed = true;
            changed = true;
        }
        changed
    }
}
