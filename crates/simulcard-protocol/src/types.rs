//! Core protocol types for Simulcard's replication channel.
//!
//! This module defines every structure that travels on the wire: the
//! identifiers that name host documents, and the six replication messages
//! that keep one shared card-selection round consistent across every
//! connected client.
//!
//! The host application delivers these messages over a single named
//! broadcast channel ([`CHANNEL`]). Every connected client receives every
//! message; there is no point-to-point addressing.

use serde::{Deserialize, Serialize};

use std::fmt;

/// The broadcast channel this module's messages travel on.
///
/// Scoped to the module id so other plugins sharing the same socket
/// never see (or collide with) our traffic.
pub const CHANNEL: &str = "module.simulcard";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Declares a string-backed id newtype.
///
/// Host document ids are opaque strings minted by the host's database.
/// Wrapping each kind in its own type means a `StackId` can never be
/// passed where a `TokenId` is expected, even though both are strings
/// underneath. `#[serde(transparent)]` keeps the wire format a plain
/// JSON string, which is what the host's own documents use.
macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Creates an id from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

id_type! {
    /// Identifies a token document on the host's active scene.
    ///
    /// A participant's identity IS its token id: the token is the stable
    /// key a participant is looked up by for the whole session.
    TokenId
}

id_type! {
    /// Identifies a user connected to the host world.
    UserId
}

id_type! {
    /// Identifies a card stack (deck) document in the host world.
    StackId
}

id_type! {
    /// Identifies a single card within a stack.
    CardId
}

// ---------------------------------------------------------------------------
// Participant configuration
// ---------------------------------------------------------------------------

/// One participant entry as carried by the `start` message.
///
/// These are plain id references, never materialized documents: the host's
/// stores remain the source of truth and are re-resolved on every read.
/// `card` is pre-filled by the authority for auto-assign participants so
/// every receiver instantiates an identical session without rolling its
/// own dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSetup {
    /// Token this participant plays as (doubles as the participant id).
    pub token: TokenId,

    /// User who controls the token.
    pub user: UserId,

    /// Stack the participant draws from.
    pub stack: StackId,

    /// Pre-chosen card, if any. Set at start time for auto-assign
    /// participants; absent for everyone else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardId>,

    /// Whether this participant's card is drawn at random instead of
    /// being picked by its user.
    #[serde(default)]
    pub auto: bool,
}

impl ParticipantSetup {
    /// Creates a manual-choice participant entry.
    pub fn new(token: TokenId, user: UserId, stack: StackId) -> Self {
        Self {
            token,
            user,
            stack,
            card: None,
            auto: false,
        }
    }

    /// Marks this participant as auto-assign.
    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Partial participant updates
// ---------------------------------------------------------------------------

/// The partial-update payload of an `update` message.
///
/// Only the fields present are applied; absent fields leave the
/// participant untouched. Receivers apply these under their own guard
/// checks (lock held, reveal monotonicity), so a late or duplicated
/// update degrades to a no-op instead of corrupting state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFields {
    /// New card choice for the participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardId>,

    /// New reveal flag. Only the `false → true` direction is ever
    /// applied; reveals are monotonic until a restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed: Option<bool>,
}

impl UpdateFields {
    /// An update that sets the participant's card.
    pub fn choose(card: CardId) -> Self {
        Self {
            card: Some(card),
            revealed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionMessage, the replication events
// ---------------------------------------------------------------------------

/// A replication event broadcast to every connected client.
///
/// Each session-affecting action maps to exactly one outbound message,
/// and each inbound message maps to one deterministic local mutation.
/// `actor` fields carry the display name of whoever triggered the event,
/// for notification text only; they carry no authority.
///
/// `#[serde(tag = "event")]` produces internally tagged JSON, so a
/// `validate` message looks like:
///
/// ```json
/// { "event": "validate", "actor": "Gamemaster" }
/// ```
///
/// which matches what the host's socket channel carries for this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SessionMessage {
    /// Authority → all: a new session begins with these participants.
    /// Receivers instantiate a local session only if their own user is
    /// in the list.
    Start {
        actor: String,
        participants: Vec<ParticipantSetup>,
    },

    /// Any client → all: partial mutation of one participant.
    Update {
        participant: TokenId,
        fields: UpdateFields,
    },

    /// Authority → all: the participant's chosen card becomes visible.
    Reveal {
        participant: TokenId,
        actor: String,
    },

    /// Authority → all: choices are locked; no further card changes.
    Validate { actor: String },

    /// Authority → all: clear all choices and reveals, unlock.
    Restart { actor: String },

    /// Authority → all: tear the session down everywhere.
    Close { actor: String },
}

impl SessionMessage {
    /// The lowercase event tag, as it appears on the wire.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Update { .. } => "update",
            Self::Reveal { .. } => "reveal",
            Self::Validate { .. } => "validate",
            Self::Restart { .. } => "restart",
            Self::Close { .. } => "close",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
