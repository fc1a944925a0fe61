//! Persisted host settings read by the session core.
//!
//! These are configured by the GM in the host's settings UI and stored by
//! the host; the core only ever reads them.

// ---------------------------------------------------------------------------
// ArtSource
// ---------------------------------------------------------------------------

/// Which artwork represents a participant in views and announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtSource {
    /// The token's own artwork (the image on the scene).
    #[default]
    TokenTexture,

    /// The portrait of the actor behind the token.
    ActorPortrait,
}

// ---------------------------------------------------------------------------
// HostSettings
// ---------------------------------------------------------------------------

/// Module settings as persisted by the host.
#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Post a chat announcement whenever a card is revealed.
    pub announce_reveals: bool,

    /// Whisper reveal announcements to the session's participants only,
    /// instead of posting them publicly.
    pub whisper_reveals: bool,

    /// Which artwork to display for each participant.
    pub art_source: ArtSource,

    /// Exclude already-drawn cards from selection and auto-assign draws.
    pub filter_drawn_cards: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            announce_reveals: true,
            whisper_reveals: false,
            art_source: ArtSource::TokenTexture,
            filter_drawn_cards: true,
        }
    }
}
