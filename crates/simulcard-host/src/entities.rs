//! Entity records and the resolution seam into the host's document stores.
//!
//! The session never caches materialized host documents. It stores ids and
//! resolves them through [`HostEntities`] every time attributes are needed,
//! because the host's stores may change between accesses (a GM can rename a
//! token or delete a deck mid-round).

use simulcard_protocol::{CardId, StackId, TokenId, UserId};

use crate::HostError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Snapshot of a token document at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: TokenId,
    /// Display name shown for the participant.
    pub name: String,
    /// Path to the token's own artwork.
    pub texture: String,
    /// Path to the artwork of the actor behind the token.
    pub actor_art: String,
}

/// Snapshot of a user document at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Whether the user is currently connected to the world.
    pub active: bool,
}

/// Snapshot of a single card within a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub id: CardId,
    pub name: String,
    /// Path to the card's face artwork.
    pub face: String,
    /// Whether the card has already been drawn out of the stack.
    pub drawn: bool,
}

/// Snapshot of a card stack (deck) document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRecord {
    pub id: StackId,
    pub name: String,
    pub cards: Vec<CardRecord>,
}

impl StackRecord {
    /// Looks up a card in this stack by id.
    pub fn card(&self, id: &CardId) -> Option<&CardRecord> {
        self.cards.iter().find(|c| &c.id == id)
    }

    /// Iterates the cards eligible for selection.
    ///
    /// With `filter_drawn` set, cards already drawn out of the stack are
    /// excluded, so a card dealt elsewhere can't be picked twice.
    pub fn available_cards(
        &self,
        filter_drawn: bool,
    ) -> impl Iterator<Item = &CardRecord> {
        self.cards
            .iter()
            .filter(move |c| !(filter_drawn && c.drawn))
    }

    /// Whether any card is eligible for selection.
    pub fn has_available_cards(&self, filter_drawn: bool) -> bool {
        self.available_cards(filter_drawn).next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Resolution seam
// ---------------------------------------------------------------------------

/// Lookup into the host's document stores.
///
/// Every method resolves by id at call time and returns an owned snapshot.
/// Each may fail with a [`HostError`] if the id no longer resolves; callers
/// surface that instead of tolerating a silent null.
pub trait HostEntities: Send + Sync + 'static {
    /// Resolves a token on the active scene.
    fn token(&self, id: &TokenId) -> Result<TokenRecord, HostError>;

    /// Resolves a user of this world.
    fn user(&self, id: &UserId) -> Result<UserRecord, HostError>;

    /// Resolves a card stack.
    fn stack(&self, id: &StackId) -> Result<StackRecord, HostError>;

    /// Resolves a single card within a stack.
    fn card(
        &self,
        stack: &StackId,
        card: &CardId,
    ) -> Result<CardRecord, HostError> {
        let stack_record = self.stack(stack)?;
        stack_record
            .card(card)
            .cloned()
            .ok_or_else(|| HostError::UnknownCard {
                stack: stack.clone(),
                card: card.clone(),
            })
    }

    /// Returns every card stack in the world, in a stable order.
    fn stacks(&self) -> Vec<StackRecord>;

    /// Finds a stack by id, exact name, or name fragment.
    ///
    /// GM-facing entry points accept human input here, so the match is
    /// deliberately forgiving; the first stack (in [`stacks`](Self::stacks)
    /// order) whose name contains the fragment wins.
    fn find_stack(&self, id_or_name: &str) -> Option<StackRecord> {
        let stacks = self.stacks();
        stacks
            .iter()
            .find(|s| s.id.as_str() == id_or_name || s.name == id_or_name)
            .or_else(|| stacks.iter().find(|s| s.name.contains(id_or_name)))
            .cloned()
    }
}
