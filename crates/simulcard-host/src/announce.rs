//! Outbound reveal announcements posted to the host's chat log.

use simulcard_protocol::UserId;

/// Everything the host needs to render a "card revealed" chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealAnnouncement {
    /// Display name of the token whose card was revealed (the speaker).
    pub speaker: String,
    /// Display name of the user controlling that token.
    pub user: String,
    /// Name of the revealed card.
    pub card: String,
    /// Path to the revealed card's face artwork.
    pub card_face: String,
    /// When present, the message is whispered to exactly these users
    /// instead of being posted publicly.
    pub whisper_to: Option<Vec<UserId>>,
}

/// Posts reveal announcements into the host's chat log.
///
/// Fire-and-forget: a failed or dropped announcement must never roll back
/// the reveal it describes, so the method cannot fail.
pub trait Announcer: Send + Sync + 'static {
    fn post_reveal(&self, announcement: RevealAnnouncement);
}
