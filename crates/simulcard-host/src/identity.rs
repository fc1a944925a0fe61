//! Identity seam: who is the local client, and are they the authority?
//!
//! The host owns user accounts and the GM flag. The session core only ever
//! asks two questions, so the seam is two methods. Authority is checked in
//! the core before every lifecycle mutation; it is not just a UI nicety.

use simulcard_protocol::UserId;

/// The local client's identity within the host world.
pub trait Identity: Send + Sync + 'static {
    /// The user this client is logged in as.
    fn user_id(&self) -> UserId;

    /// Whether this client is the session authority (the GM).
    fn is_authority(&self) -> bool;
}
