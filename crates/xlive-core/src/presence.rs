//! Presence records.

use crate::flags::PresenceState;
use crate::ids::{SessionId, Xuid};

/// A player's presence as known to this console.
///
/// Records either come resolved from the backend, or are offline
/// placeholders for players we know about locally but could not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceRecord {
    /// Player the record describes.
    pub xuid: Xuid,
    /// Online/offline state bits.
    pub state: PresenceState,
    /// Session the player is currently in, if any.
    pub session_id: Option<SessionId>,
    /// Title the player is running (0 when unknown).
    pub title_id: u32,
    /// Rich-presence text.
    pub rich_presence: String,
    /// `true` when the record came from the backend.
    pub resolved: bool,
}

impl PresenceRecord {
    /// Offline placeholder for a locally known player.
    #[must_use]
    pub fn placeholder(xuid: Xuid) -> Self {
        Self {
            xuid,
            state: PresenceState::empty(),
            session_id: None,
            title_id: 0,
            rich_presence: String::new(),
            resolved: false,
        }
    }

    /// Offline, or online but marked away.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.state.contains(PresenceState::ONLINE) || self.state.contains(PresenceState::AWAY)
    }

    /// Advertises a session others can join.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.state.contains(PresenceState::JOINABLE)
            && self.session_id.is_some_and(SessionId::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_idle_and_unjoinable() {
        let record = PresenceRecord::placeholder(Xuid::new(5));
        assert!(record.is_idle());
        assert!(!record.is_joinable());
        assert!(!record.resolved);
    }

    #[test]
    fn away_counts_as_idle() {
        let mut record = PresenceRecord::placeholder(Xuid::new(5));
        record.state = PresenceState::ONLINE | PresenceState::AWAY;
        assert!(record.is_idle());
        record.state = PresenceState::ONLINE;
        assert!(!record.is_idle());
    }

    #[test]
    fn joinable_needs_a_session() {
        let mut record = PresenceRecord::placeholder(Xuid::new(5));
        record.state = PresenceState::ONLINE | PresenceState::JOINABLE;
        assert!(!record.is_joinable());
        record.session_id = Some(SessionId::new(9));
        assert!(record.is_joinable());
    }
}
