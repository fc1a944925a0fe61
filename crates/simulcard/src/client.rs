//! The per-client session engine.
//!
//! One [`SessionClient`] lives on each connected client. It owns the
//! singleton session slot and drives both halves of replication:
//!
//! - **Local actions** (`start`, `choose_card`, `reveal`, ...) mutate the
//!   local session and broadcast the matching message. The sender applies
//!   optimistically; it never waits for its own echo.
//! - **Inbound messages** ([`apply`](SessionClient::apply)) re-derive the
//!   same mutation from the payload, under the same guard checks, and
//!   report what happened as an [`Applied`] event so the embedding UI can
//!   decide whether to re-render or notify.
//!
//! Authority is enforced here, not in the UI: lifecycle mutations refuse
//! with [`SimulcardError::AuthorityRequired`] on non-authority clients.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use simulcard_host::{
    Announcer, HostEntities, HostSettings, Identity, MessageBus,
    RevealAnnouncement, StackRecord,
};
use simulcard_protocol::{
    CardId, ParticipantSetup, SessionMessage, StackId, TokenId,
    UpdateFields, UserId,
};
use simulcard_session::{Session, ViewState};

use crate::SimulcardError;

// ---------------------------------------------------------------------------
// Applied
// ---------------------------------------------------------------------------

/// What an inbound message did to local state.
///
/// `Ignored` covers every guard no-op: no local session, lock held,
/// already revealed, unknown participant, or a `start` this client is not
/// part of. Nothing about an ignored message is an error; the transport
/// has no cross-kind ordering, so stale messages are routine.
///
/// Actor names come straight from the payload and exist for notification
/// text only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A session was installed from a remote `start`.
    Started { actor: String },
    /// A participant changed (card choice, usually).
    Updated { participant: TokenId },
    /// A participant's card became visible.
    Revealed { participant: TokenId, actor: String },
    /// Choices are now locked.
    Validated { actor: String },
    /// The round was cleared and unlocked.
    Restarted { actor: String },
    /// The session was torn down.
    Closed { actor: String },
    /// The message changed nothing.
    Ignored,
}

// ---------------------------------------------------------------------------
// SessionClient
// ---------------------------------------------------------------------------

/// One client's engine: session slot, host seams, bus endpoint.
pub struct SessionClient<H, B>
where
    H: HostEntities + Identity + Announcer,
    B: MessageBus,
{
    host: H,
    bus: B,
    settings: HostSettings,
    session: Option<Session>,
    rng: StdRng,
}

impl<H, B> SessionClient<H, B>
where
    H: HostEntities + Identity + Announcer,
    B: MessageBus,
{
    /// Creates an engine for this client.
    pub fn new(host: H, bus: B, settings: HostSettings) -> Self {
        Self {
            host,
            bus,
            settings,
            session: None,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates an engine with a seeded random source, so auto-assign
    /// draws are reproducible in tests.
    pub fn seeded(
        host: H,
        bus: B,
        settings: HostSettings,
        seed: u64,
    ) -> Self {
        Self {
            host,
            bus,
            settings,
            session: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Whether a session is currently running on this client.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// The running session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The host this client talks to.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Projects the running session into renderable data for the local
    /// user.
    pub fn view(&self) -> Result<ViewState, SimulcardError> {
        let session =
            self.session.as_ref().ok_or(SimulcardError::NotRunning)?;
        Ok(ViewState::project(
            session,
            &self.host,
            &self.host.user_id(),
            self.host.is_authority(),
            &self.settings,
        )?)
    }

    // -----------------------------------------------------------------
    // Local actions
    // -----------------------------------------------------------------

    /// Starts a new session with the given participant configuration.
    ///
    /// `candidate_stacks` narrows which decks count as eligible; when
    /// empty (or when none of them resolve with cards left), every stack
    /// in the world with available cards is eligible instead. Auto-assign
    /// participants get a uniformly random card drawn here, before the
    /// `start` broadcast, so every receiver installs an identical round.
    ///
    /// # Errors
    /// - [`AuthorityRequired`](SimulcardError::AuthorityRequired) for
    ///   non-authority callers.
    /// - [`SessionActive`](SimulcardError::SessionActive) when a session
    ///   is already running locally. Nothing is broadcast.
    /// - [`NoEligibleStacks`](SimulcardError::NoEligibleStacks) /
    ///   [`Session`](SimulcardError::Session) for bad configuration.
    pub fn start(
        &mut self,
        candidate_stacks: &[StackId],
        configs: Vec<ParticipantSetup>,
    ) -> Result<(), SimulcardError> {
        self.require_authority("start a session")?;
        if self.session.is_some() {
            return Err(SimulcardError::SessionActive);
        }

        let filter = self.settings.filter_drawn_cards;
        let mut eligible: Vec<StackRecord> = candidate_stacks
            .iter()
            .filter_map(|id| self.host.stack(id).ok())
            .filter(|s| s.has_available_cards(filter))
            .collect();
        if eligible.is_empty() {
            eligible = self
                .host
                .stacks()
                .into_iter()
                .filter(|s| s.has_available_cards(filter))
                .collect();
        }
        if eligible.is_empty() {
            return Err(SimulcardError::NoEligibleStacks);
        }

        // Pre-draw for auto-assign participants. Each stack is resolved
        // fresh; a dangling stack reference fails the start here, before
        // anything is broadcast.
        let mut setups = configs;
        for setup in &mut setups {
            if setup.auto {
                let stack = self.host.stack(&setup.stack)?;
                setup.card = draw_card(&stack, filter, &mut self.rng);
            }
        }

        // Validates non-empty configuration and unique tokens.
        let session = Session::new(setups.clone())?;

        self.bus
            .broadcast(&SessionMessage::Start {
                actor: self.actor_name(),
                participants: setups,
            })
            .map_err(bus_err)?;

        tracing::info!(
            participants = session.participants().len(),
            "session started"
        );
        self.session = Some(session);
        Ok(())
    }

    /// Sets a participant's card choice and broadcasts it.
    ///
    /// Any client may call this; restricting a participant to its owning
    /// user is the UI's concern. Returns `Ok(false)` without broadcasting
    /// when the choice is a guard no-op (locked, revealed, unknown
    /// participant, same card).
    ///
    /// # Errors
    /// Fails if no session is running or the card does not resolve
    /// within the participant's stack.
    pub fn choose_card(
        &mut self,
        participant: &TokenId,
        card: CardId,
    ) -> Result<bool, SimulcardError> {
        let stack_id = {
            let session =
                self.session.as_ref().ok_or(SimulcardError::NotRunning)?;
            match session.participant(participant) {
                Some(p) => p.stack.clone(),
                None => return Ok(false),
            }
        };
        // The card must exist in the participant's stack right now.
        self.host.card(&stack_id, &card)?;

        let session =
            self.session.as_mut().ok_or(SimulcardError::NotRunning)?;
        let changed = session.choose_card(participant, card.clone());
        if changed {
            self.bus
                .broadcast(&SessionMessage::Update {
                    participant: participant.clone(),
                    fields: UpdateFields::choose(card),
                })
                .map_err(bus_err)?;
            tracing::info!(%participant, "card chosen");
        }
        Ok(changed)
    }

    /// Reveals one participant's card. Authority only.
    ///
    /// Idempotent: `Ok(false)` if already revealed. Announces the reveal
    /// to the host's chat when the setting asks for it; announcement
    /// failures are logged and swallowed, never rolling back the reveal.
    pub fn reveal(
        &mut self,
        participant: &TokenId,
    ) -> Result<bool, SimulcardError> {
        self.require_authority("reveal a card")?;
        self.reveal_unchecked(participant)
    }

    /// Reveals every not-yet-revealed participant. Authority only.
    ///
    /// One broadcast (and one announcement) per participant, so replay
    /// on every receiver is uniform with single reveals. Returns how
    /// many participants were newly revealed.
    pub fn reveal_all(&mut self) -> Result<usize, SimulcardError> {
        self.require_authority("reveal all cards")?;
        let pending: Vec<TokenId> = self
            .session
            .as_ref()
            .ok_or(SimulcardError::NotRunning)?
            .participants()
            .iter()
            .filter(|p| !p.revealed)
            .map(|p| p.token.clone())
            .collect();

        let mut revealed = 0;
        for token in pending {
            if self.reveal_unchecked(&token)? {
                revealed += 1;
            }
        }
        Ok(revealed)
    }

    fn reveal_unchecked(
        &mut self,
        participant: &TokenId,
    ) -> Result<bool, SimulcardError> {
        let actor = self.actor_name();
        let session =
            self.session.as_mut().ok_or(SimulcardError::NotRunning)?;
        let changed = session.reveal(participant);
        if changed {
            self.bus
                .broadcast(&SessionMessage::Reveal {
                    participant: participant.clone(),
                    actor,
                })
                .map_err(bus_err)?;
            tracing::info!(%participant, "card revealed");
            if self.settings.announce_reveals {
                if let Err(e) = self.announce(participant) {
                    tracing::warn!(
                        %participant,
                        error = %e,
                        "reveal announcement failed"
                    );
                }
            }
        }
        Ok(changed)
    }

    /// Locks all card choices. Authority only. Idempotent.
    pub fn validate(&mut self) -> Result<bool, SimulcardError> {
        self.require_authority("validate the session")?;
        let actor = self.actor_name();
        let session =
            self.session.as_mut().ok_or(SimulcardError::NotRunning)?;
        let changed = session.validate();
        if changed {
            self.bus
                .broadcast(&SessionMessage::Validate { actor })
                .map_err(bus_err)?;
            tracing::info!("session locked");
        }
        Ok(changed)
    }

    /// Restarts the round. Authority only.
    ///
    /// Clears every choice and reveal, unlocks, then re-draws for
    /// auto-assign participants. The wire order mirrors the local order:
    /// receivers see `restart` first and the re-draw `update`s after, so
    /// replaying them lands everyone in the same state.
    pub fn restart(&mut self) -> Result<(), SimulcardError> {
        self.require_authority("restart the session")?;
        if self.session.is_none() {
            return Err(SimulcardError::NotRunning);
        }
        let actor = self.actor_name();

        self.bus
            .broadcast(&SessionMessage::Restart { actor })
            .map_err(bus_err)?;

        let session = self
            .session
            .as_mut()
            .ok_or(SimulcardError::NotRunning)?;
        session.reset();

        let autos: Vec<(TokenId, StackId)> = session
            .participants()
            .iter()
            .filter(|p| p.auto)
            .map(|p| (p.token.clone(), p.stack.clone()))
            .collect();

        let filter = self.settings.filter_drawn_cards;
        for (token, stack_id) in autos {
            let stack = self.host.stack(&stack_id)?;
            let Some(card) = draw_card(&stack, filter, &mut self.rng)
            else {
                // Stack ran dry; the participant simply has no card
                // until someone refills the deck and restarts again.
                continue;
            };
            self.bus
                .broadcast(&SessionMessage::Update {
                    participant: token.clone(),
                    fields: UpdateFields::choose(card.clone()),
                })
                .map_err(bus_err)?;
            if let Some(session) = self.session.as_mut() {
                session.apply_update(&token, &UpdateFields::choose(card));
            }
        }

        tracing::info!("session restarted");
        Ok(())
    }

    /// Tears the session down everywhere. Authority only.
    pub fn close(&mut self) -> Result<(), SimulcardError> {
        self.require_authority("close the session")?;
        if self.session.is_none() {
            return Err(SimulcardError::NotRunning);
        }
        let actor = self.actor_name();
        self.bus
            .broadcast(&SessionMessage::Close { actor })
            .map_err(bus_err)?;
        self.session = None;
        tracing::info!("session closed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Inbound replication
    // -----------------------------------------------------------------

    /// Applies one inbound message to local state.
    ///
    /// Never fails and never panics: anything that can't be applied
    /// (no session, lock held, unknown participant, a `start` this user
    /// is not part of) is reported as [`Applied::Ignored`]. The guards
    /// here mirror the senders' own checks; both sides enforce them
    /// independently because the transport may interleave message kinds
    /// differently for different receivers.
    pub fn apply(&mut self, msg: SessionMessage) -> Applied {
        match msg {
            SessionMessage::Start {
                actor,
                participants,
            } => {
                if self.session.is_some() {
                    tracing::warn!(
                        %actor,
                        "ignoring start while a session is live"
                    );
                    return Applied::Ignored;
                }
                // Only participants get a local session; everyone else
                // stays a bystander with nothing to render.
                let me = self.host.user_id();
                if !participants.iter().any(|p| p.user == me) {
                    return Applied::Ignored;
                }
                match Session::new(participants) {
                    Ok(session) => {
                        tracing::info!(%actor, "session started remotely");
                        self.session = Some(session);
                        Applied::Started { actor }
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "ignoring malformed start"
                        );
                        Applied::Ignored
                    }
                }
            }

            SessionMessage::Update {
                participant,
                fields,
            } => {
                let Some(session) = self.session.as_mut() else {
                    return Applied::Ignored;
                };
                if session.apply_update(&participant, &fields) {
                    Applied::Updated { participant }
                } else {
                    Applied::Ignored
                }
            }

            SessionMessage::Reveal { participant, actor } => {
                let Some(session) = self.session.as_mut() else {
                    return Applied::Ignored;
                };
                if session.reveal(&participant) {
                    Applied::Revealed { participant, actor }
                } else {
                    Applied::Ignored
                }
            }

            SessionMessage::Validate { actor } => {
                let Some(session) = self.session.as_mut() else {
                    return Applied::Ignored;
                };
                if session.validate() {
                    Applied::Validated { actor }
                } else {
                    Applied::Ignored
                }
            }

            SessionMessage::Restart { actor } => {
                let Some(session) = self.session.as_mut() else {
                    return Applied::Ignored;
                };
                session.reset();
                Applied::Restarted { actor }
            }

            SessionMessage::Close { actor } => {
                // Unconditional teardown; the slot is simply overwritten.
                if self.session.take().is_some() {
                    tracing::info!(%actor, "session closed remotely");
                    Applied::Closed { actor }
                } else {
                    Applied::Ignored
                }
            }
        }
    }

    /// Waits for the next inbound message and applies it.
    ///
    /// Returns `Ok(None)` when the bus is closed for good. This is the
    /// loop body for whatever event pump the embedding host runs.
    pub async fn next_applied(
        &mut self,
    ) -> Result<Option<Applied>, SimulcardError> {
        match self.bus.recv().await {
            Ok(Some(msg)) => Ok(Some(self.apply(msg))),
            Ok(None) => Ok(None),
            Err(e) => Err(bus_err(e)),
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn require_authority(
        &self,
        action: &'static str,
    ) -> Result<(), SimulcardError> {
        if self.host.is_authority() {
            Ok(())
        } else {
            Err(SimulcardError::AuthorityRequired(action))
        }
    }

    /// Display name of the local user, for actor fields. Falls back to
    /// the raw id if the user record is gone.
    fn actor_name(&self) -> String {
        let id = self.host.user_id();
        self.host
            .user(&id)
            .map(|u| u.name)
            .unwrap_or_else(|_| id.0)
    }

    /// Posts the chat announcement for a freshly revealed participant.
    fn announce(
        &self,
        participant: &TokenId,
    ) -> Result<(), SimulcardError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let Some(p) = session.participant(participant) else {
            return Ok(());
        };
        let Some(card_id) = &p.card else {
            // Revealed with no card: there is nothing to show.
            return Ok(());
        };

        let token = self.host.token(&p.token)?;
        let user = self.host.user(&p.user)?;
        let card = self.host.card(&p.stack, card_id)?;

        let whisper_to = self.settings.whisper_reveals.then(|| {
            let mut seen = HashSet::new();
            session
                .participants()
                .iter()
                .map(|q| q.user.clone())
                .filter(|u| seen.insert(u.clone()))
                .collect::<Vec<UserId>>()
        });

        self.host.post_reveal(RevealAnnouncement {
            speaker: token.name,
            user: user.name,
            card: card.name,
            card_face: card.face,
            whisper_to,
        });
        Ok(())
    }
}

/// Draws one card uniformly at random from the stack's available cards.
fn draw_card<R: Rng>(
    stack: &StackRecord,
    filter_drawn: bool,
    rng: &mut R,
) -> Option<CardId> {
    let available: Vec<_> = stack.available_cards(filter_drawn).collect();
    available.choose(rng).map(|c| c.id.clone())
}

fn bus_err<E>(e: E) -> SimulcardError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SimulcardError::Bus(Box::new(e))
}
