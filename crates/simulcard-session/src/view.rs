//! View projection: session state resolved into renderable data.
//!
//! The core never renders and never triggers a re-render. Mutations report
//! whether anything changed; when the embedding host decides to redraw, it
//! asks for a [`ViewState`] and feeds it to its own templating layer.
//! Every id is resolved here, at read time, so the view always reflects
//! the host's current documents.

use serde::Serialize;
use simulcard_host::{
    ArtSource, HostEntities, HostError, HostSettings,
};
use simulcard_protocol::{CardId, TokenId, UserId};

use crate::Session;

/// A resolved card, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub name: String,
    /// Path to the card's face artwork.
    pub face: String,
}

/// One participant, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    pub token: TokenId,
    /// The token's display name.
    pub name: String,
    /// Display artwork, chosen per the art source setting.
    pub art: String,
    /// Display name of the controlling user.
    pub user_name: String,
    /// The chosen card, resolved. Whether to show its face or its back
    /// is the renderer's call, based on `revealed` and `owned`.
    pub card: Option<CardView>,
    pub revealed: bool,
    pub auto: bool,
    /// Whether the viewing user controls this participant.
    pub owned: bool,
}

/// The full render model for one client's view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub participants: Vec<ParticipantView>,
    /// Whether the viewing client is the session authority.
    pub is_authority: bool,
    pub is_locked: bool,
    /// Every participant has a card; the authority can sensibly validate.
    pub all_chosen: bool,
    /// Every card is face-up; the round is done.
    pub all_revealed: bool,
}

impl ViewState {
    /// Projects the session into renderable data for one viewing user.
    ///
    /// # Errors
    /// Fails with the underlying [`HostError`] if any participant's
    /// token, user, or card no longer resolves. A dangling reference is
    /// surfaced, not skipped: rendering a round with a silently missing
    /// participant would misreport the table.
    pub fn project<H: HostEntities>(
        session: &Session,
        host: &H,
        viewer: &UserId,
        is_authority: bool,
        settings: &HostSettings,
    ) -> Result<Self, HostError> {
        let mut participants = Vec::with_capacity(session.participants().len());

        for p in session.participants() {
            let token = host.token(&p.token)?;
            let user = host.user(&p.user)?;
            let card = match &p.card {
                Some(card_id) => {
                    let card = host.card(&p.stack, card_id)?;
                    Some(CardView {
                        id: card.id,
                        name: card.name,
                        face: card.face,
                    })
                }
                None => None,
            };

            let art = match settings.art_source {
                ArtSource::TokenTexture => token.texture,
                ArtSource::ActorPortrait => token.actor_art,
            };

            participants.push(ParticipantView {
                token: p.token.clone(),
                name: token.name,
                art,
                user_name: user.name,
                card,
                revealed: p.revealed,
                auto: p.auto,
                owned: p.is_owned_by(viewer),
            });
        }

        Ok(Self {
            participants,
            is_authority,
            is_locked: session.is_locked(),
            all_chosen: session.all_chosen(),
            all_revealed: session.all_revealed(),
        })
    }
}
