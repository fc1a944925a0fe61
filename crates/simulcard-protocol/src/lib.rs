//! Wire protocol for Simulcard.
//!
//! This crate defines the language every client in a world speaks to keep
//! one shared card-selection round consistent:
//!
//! - **Types** ([`SessionMessage`], [`ParticipantSetup`], the id
//!   newtypes) — the structures that travel on the broadcast channel.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between the host's raw socket channel and the
//! session layer. It knows nothing about sessions, locks, or authority;
//! it only defines message shapes.
//!
//! ```text
//! Host socket (bytes) → Protocol (SessionMessage) → Session (state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CHANNEL, CardId, ParticipantSetup, SessionMessage, StackId, TokenId,
    UpdateFields, UserId,
};
