//! Host application seams for Simulcard.
//!
//! The session core runs inside a host application that owns everything
//! heavy: documents, identity, chat, settings, and the socket. This crate
//! defines the narrow traits the core consumes, plus in-memory
//! implementations ([`MemoryWorld`], [`MemoryHost`], [`BusHub`]) so the
//! core can be driven end to end without a host.
//!
//! - [`HostEntities`] — lazy id-based resolution into the document stores.
//! - [`Identity`] — who the local client is, and whether they hold
//!   authority.
//! - [`Announcer`] — fire-and-forget chat announcements for reveals.
//! - [`HostSettings`] — the persisted flags the core reads.
//! - [`MessageBus`] — the broadcast channel replication rides on.

#![allow(async_fn_in_trait)]

mod announce;
mod bus;
mod entities;
mod error;
mod identity;
mod memory;
mod settings;

pub use announce::{Announcer, RevealAnnouncement};
pub use bus::{BusHub, ChannelBus, ClientId, MessageBus};
pub use entities::{
    CardRecord, HostEntities, StackRecord, TokenRecord, UserRecord,
};
pub use error::HostError;
pub use identity::Identity;
pub use memory::{MemoryHost, MemoryWorld};
pub use settings::{ArtSource, HostSettings};
