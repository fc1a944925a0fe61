//! # Simulcard
//!
//! Simultaneous card selection for virtual tabletops: a GM picks a group
//! of token/user participants, each privately selects one card from a
//! shared deck, and choices are revealed together instead of in turn.
//!
//! There is no server-side state. Every client runs its own
//! [`SessionClient`] holding a full copy of the round; consistency is
//! eventual, achieved by replaying the same broadcast messages against
//! every copy, with receiver-side guards making out-of-order delivery
//! safe.
//!
//! ## Quick start
//!
//! ```rust
//! use simulcard::prelude::*;
//!
//! // One shared world and bus stand in for the host application.
//! let world = MemoryWorld::new();
//! world.add_user("gm", "Gamemaster", true);
//! world.add_user("u1", "Alice", true);
//! world.add_token("t1", "Knight", "knight.webp", "knight.webp");
//! world.add_stack("s1", "Deck");
//! world.add_card(&StackId::new("s1"), "c1", "Ace", "ace.webp");
//!
//! let hub = BusHub::new();
//! let mut gm = SessionClient::new(
//!     MemoryHost::new(world.clone(), "gm", true),
//!     hub.connect(),
//!     HostSettings::default(),
//! );
//!
//! gm.start(
//!     &[],
//!     vec![ParticipantSetup::new(
//!         TokenId::new("t1"),
//!         UserId::new("u1"),
//!         StackId::new("s1"),
//!     )],
//! )
//! .unwrap();
//! assert!(gm.is_running());
//! ```

mod client;
mod error;

pub use client::{Applied, SessionClient};
pub use error::SimulcardError;

/// The common imports for embedding Simulcard.
pub mod prelude {
    pub use crate::{Applied, SessionClient, SimulcardError};
    pub use simulcard_host::{
        Announcer, ArtSource, BusHub, ChannelBus, HostEntities, HostError,
        HostSettings, Identity, MemoryHost, MemoryWorld, MessageBus,
        RevealAnnouncement,
    };
    pub use simulcard_protocol::{
        CHANNEL, CardId, ParticipantSetup, SessionMessage, StackId,
        TokenId, UpdateFields, UserId,
    };
    pub use simulcard_session::{Session, SessionError, ViewState};
}
