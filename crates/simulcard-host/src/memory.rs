//! In-memory host doubles for tests and demos.
//!
//! [`MemoryWorld`] stands in for the host's document stores; it is
//! shareable (`Clone` hands out another handle to the same data) and
//! mutable mid-test, so "the GM deleted the deck" scenarios are one
//! method call. [`MemoryHost`] wraps a world handle with a local user
//! identity and a recording announcer, giving each simulated client a
//! complete host to talk to.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use simulcard_protocol::{CardId, StackId, TokenId, UserId};

use crate::{
    Announcer, CardRecord, HostEntities, HostError, Identity,
    RevealAnnouncement, StackRecord, TokenRecord, UserRecord,
};

// ---------------------------------------------------------------------------
// MemoryWorld
// ---------------------------------------------------------------------------

#[derive(Default)]
struct WorldData {
    tokens: BTreeMap<TokenId, TokenRecord>,
    users: BTreeMap<UserId, UserRecord>,
    stacks: BTreeMap<StackId, StackRecord>,
}

/// An in-memory stand-in for the host's token/user/stack stores.
///
/// Cloning returns another handle to the same shared data, so several
/// simulated clients resolve against one world, just like real clients
/// share one server-backed database.
#[derive(Clone, Default)]
pub struct MemoryWorld {
    inner: Arc<Mutex<WorldData>>,
}

impl MemoryWorld {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, WorldData> {
        self.inner.lock().expect("world mutex poisoned")
    }

    /// Adds a user to the world.
    pub fn add_user(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        active: bool,
    ) {
        let id = UserId::new(id);
        self.data().users.insert(
            id.clone(),
            UserRecord {
                id,
                name: name.into(),
                active,
            },
        );
    }

    /// Adds a token to the active scene.
    pub fn add_token(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        texture: impl Into<String>,
        actor_art: impl Into<String>,
    ) {
        let id = TokenId::new(id);
        self.data().tokens.insert(
            id.clone(),
            TokenRecord {
                id,
                name: name.into(),
                texture: texture.into(),
                actor_art: actor_art.into(),
            },
        );
    }

    /// Adds an empty card stack.
    pub fn add_stack(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = StackId::new(id);
        self.data().stacks.insert(
            id.clone(),
            StackRecord {
                id,
                name: name.into(),
                cards: Vec::new(),
            },
        );
    }

    /// Adds a card to an existing stack.
    ///
    /// # Panics
    /// Panics if the stack was never added; that is a bug in the test
    /// fixture, not a runtime condition.
    pub fn add_card(
        &self,
        stack: &StackId,
        id: impl Into<String>,
        name: impl Into<String>,
        face: impl Into<String>,
    ) {
        let id = CardId::new(id);
        self.data()
            .stacks
            .get_mut(stack)
            .expect("add_card: stack not in world")
            .cards
            .push(CardRecord {
                id,
                name: name.into(),
                face: face.into(),
                drawn: false,
            });
    }

    /// Flags a card as drawn out of its stack.
    pub fn mark_drawn(&self, stack: &StackId, card: &CardId) {
        if let Some(stack) = self.data().stacks.get_mut(stack) {
            if let Some(card) =
                stack.cards.iter_mut().find(|c| &c.id == card)
            {
                card.drawn = true;
            }
        }
    }

    /// Deletes a token, as the GM can at any time.
    pub fn remove_token(&self, id: &TokenId) {
        self.data().tokens.remove(id);
    }

    /// Deletes a card stack.
    pub fn remove_stack(&self, id: &StackId) {
        self.data().stacks.remove(id);
    }
}

impl HostEntities for MemoryWorld {
    fn token(&self, id: &TokenId) -> Result<TokenRecord, HostError> {
        self.data()
            .tokens
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::UnknownToken(id.clone()))
    }

    fn user(&self, id: &UserId) -> Result<UserRecord, HostError> {
        self.data()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::UnknownUser(id.clone()))
    }

    fn stack(&self, id: &StackId) -> Result<StackRecord, HostError> {
        self.data()
            .stacks
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::UnknownStack(id.clone()))
    }

    fn stacks(&self) -> Vec<StackRecord> {
        // BTreeMap iteration gives a stable id order, which keeps the
        // "fall back to all stacks with cards" path deterministic.
        self.data().stacks.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// MemoryHost
// ---------------------------------------------------------------------------

/// One simulated client's complete host: shared world, local identity,
/// and a recording announcer.
pub struct MemoryHost {
    world: MemoryWorld,
    user: UserId,
    authority: bool,
    announcements: Arc<Mutex<Vec<RevealAnnouncement>>>,
}

impl MemoryHost {
    /// Creates a host for a client logged in as `user`.
    pub fn new(
        world: MemoryWorld,
        user: impl Into<String>,
        authority: bool,
    ) -> Self {
        Self {
            world,
            user: UserId::new(user),
            authority,
            announcements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The shared world this host resolves against.
    pub fn world(&self) -> &MemoryWorld {
        &self.world
    }

    /// Snapshot of every announcement posted so far.
    pub fn announcements(&self) -> Vec<RevealAnnouncement> {
        self.announcements
            .lock()
            .expect("announcements mutex poisoned")
            .clone()
    }
}

impl HostEntities for MemoryHost {
    fn token(&self, id: &TokenId) -> Result<TokenRecord, HostError> {
        self.world.token(id)
    }

    fn user(&self, id: &UserId) -> Result<UserRecord, HostError> {
        self.world.user(id)
    }

    fn stack(&self, id: &StackId) -> Result<StackRecord, HostError> {
        self.world.stack(id)
    }

    fn stacks(&self) -> Vec<StackRecord> {
        self.world.stacks()
    }
}

impl Identity for MemoryHost {
    fn user_id(&self) -> UserId {
        self.user.clone()
    }

    fn is_authority(&self) -> bool {
        self.authority
    }
}

impl Announcer for MemoryHost {
    fn post_reveal(&self, announcement: RevealAnnouncement) {
        tracing::info!(
            speaker = %announcement.speaker,
            card = %announcement.card,
            "reveal announced"
        );
        self.announcements
            .lock()
            .expect("announcements mutex poisoned")
            .push(announcement);
    }
}
