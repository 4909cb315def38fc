//! Session capability bits and presence state bits.
//!
//! Values match the ones titles pass on the console so a raw `u32` from a
//! decoded call converts without remapping.

use bitflags::bitflags;

bitflags! {
    /// Capability flags a title requests when creating a session.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SessionFlags: u32 {
        /// This console hosts the session.
        const HOST = 0x0000_0001;
        /// The session is advertised through presence.
        const USES_PRESENCE = 0x0000_0002;
        /// Members write leaderboard statistics.
        const USES_STATS = 0x0000_0004;
        /// The session is registered for matchmaking search.
        const USES_MATCHMAKING = 0x0000_0008;
        /// Ranked play: members register for arbitration before start.
        const USES_ARBITRATION = 0x0000_0010;
        /// Members talk over the peer network.
        const USES_PEER_NETWORK = 0x0000_0020;
        /// Friends of members may find the session through matchmaking.
        const SOCIAL_MATCHMAKING_ALLOWED = 0x0000_0080;
        /// Invitations are refused.
        const INVITES_DISABLED = 0x0000_0100;
        /// Joining through a presence entry is refused.
        const JOIN_VIA_PRESENCE_DISABLED = 0x0000_0200;
        /// Joining after start is refused.
        const JOIN_IN_PROGRESS_DISABLED = 0x0000_0400;
        /// Only friends may join through presence.
        const JOIN_VIA_PRESENCE_FRIENDS_ONLY = 0x0000_0800;

        /// Single player game that still posts statistics.
        const SINGLEPLAYER_WITH_STATS = Self::USES_PRESENCE.bits()
            | Self::USES_STATS.bits()
            | Self::INVITES_DISABLED.bits()
            | Self::JOIN_VIA_PRESENCE_DISABLED.bits()
            | Self::JOIN_IN_PROGRESS_DISABLED.bits();
        /// Standard unranked online game.
        const LIVE_MULTIPLAYER_STANDARD = Self::USES_PRESENCE.bits()
            | Self::USES_STATS.bits()
            | Self::USES_MATCHMAKING.bits()
            | Self::USES_PEER_NETWORK.bits();
        /// Ranked online game.
        const LIVE_MULTIPLAYER_RANKED = Self::LIVE_MULTIPLAYER_STANDARD.bits()
            | Self::USES_ARBITRATION.bits();
        /// LAN play; never touches the backend.
        const SYSTEMLINK = Self::USES_PEER_NETWORK.bits();
        /// Pre-game lobby.
        const GROUP_LOBBY = Self::USES_PRESENCE.bits() | Self::USES_PEER_NETWORK.bits();
        /// In-game portion of a lobby flow.
        const GROUP_GAME = Self::USES_STATS.bits()
            | Self::USES_MATCHMAKING.bits()
            | Self::USES_PEER_NETWORK.bits();
    }
}

impl SessionFlags {
    /// Bits a title may change after creation.
    pub const MODIFIABLE: Self = Self::SOCIAL_MATCHMAKING_ALLOWED
        .union(Self::INVITES_DISABLED)
        .union(Self::JOIN_VIA_PRESENCE_DISABLED)
        .union(Self::JOIN_IN_PROGRESS_DISABLED)
        .union(Self::JOIN_VIA_PRESENCE_FRIENDS_ONLY)
        .union(Self::USES_ARBITRATION);

    /// Bits that require a backend.
    pub const ONLINE_FEATURES: Self = Self::USES_PRESENCE
        .union(Self::USES_STATS)
        .union(Self::USES_MATCHMAKING)
        .union(Self::USES_ARBITRATION);

    /// Check that the combination is internally consistent.
    ///
    /// Returns a description of the first violated rule.
    pub fn check_consistency(self) -> Result<(), &'static str> {
        if self.contains(Self::USES_ARBITRATION)
            && !self.contains(Self::USES_STATS | Self::USES_MATCHMAKING)
        {
            return Err("arbitration requires stats and matchmaking");
        }
        if self.contains(Self::SOCIAL_MATCHMAKING_ALLOWED)
            && !self.contains(Self::USES_MATCHMAKING)
        {
            return Err("social matchmaking requires matchmaking");
        }
        if self.intersects(Self::JOIN_VIA_PRESENCE_DISABLED | Self::JOIN_VIA_PRESENCE_FRIENDS_ONLY)
            && !self.contains(Self::USES_PRESENCE)
        {
            return Err("presence join restrictions require presence");
        }
        if self.contains(Self::JOIN_VIA_PRESENCE_DISABLED | Self::JOIN_VIA_PRESENCE_FRIENDS_ONLY) {
            return Err("presence joins cannot be both disabled and friends-only");
        }
        Ok(())
    }

    /// Peer-only and LAN combinations never contact the backend.
    #[must_use]
    pub fn is_offline_only(self) -> bool {
        !self.intersects(Self::ONLINE_FEATURES)
    }
}

bitflags! {
    /// Presence state bitmask reported for a player.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PresenceState: u32 {
        /// Signed in to the service.
        const ONLINE = 0x0000_0001;
        /// Running a title.
        const PLAYING = 0x0000_0002;
        /// Voice chat available.
        const VOICE = 0x0000_0008;
        /// In a session others can join.
        const JOINABLE = 0x0000_0010;
        /// User set their status to away.
        const AWAY = 0x0001_0000;
        /// User set their status to busy.
        const BUSY = 0x0002_0000;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_consistent() {
        for preset in [
            SessionFlags::SINGLEPLAYER_WITH_STATS,
            SessionFlags::LIVE_MULTIPLAYER_STANDARD,
            SessionFlags::LIVE_MULTIPLAYER_RANKED,
            SessionFlags::SYSTEMLINK,
            SessionFlags::GROUP_LOBBY,
            SessionFlags::GROUP_GAME,
        ] {
            assert!(preset.check_consistency().is_ok(), "{preset:?}");
        }
    }

    #[test]
    fn arbitration_needs_stats_and_matchmaking() {
        let flags = SessionFlags::USES_ARBITRATION | SessionFlags::USES_STATS;
        assert_eq!(
            flags.check_consistency(),
            Err("arbitration requires stats and matchmaking")
        );
    }

    #[test]
    fn presence_restrictions_need_presence() {
        let flags = SessionFlags::JOIN_VIA_PRESENCE_DISABLED;
        assert!(flags.check_consistency().is_err());
    }

    #[test]
    fn systemlink_is_offline_only() {
        assert!(SessionFlags::SYSTEMLINK.is_offline_only());
        assert!(SessionFlags::empty().is_offline_only());
        assert!(!SessionFlags::GROUP_LOBBY.is_offline_only());
        assert!(!SessionFlags::LIVE_MULTIPLAYER_STANDARD.is_offline_only());
    }

    #[test]
    fn hosting_is_not_modifiable() {
        assert!(!SessionFlags::MODIFIABLE.contains(SessionFlags::HOST));
        assert!(!SessionFlags::MODIFIABLE.contains(SessionFlags::USES_PEER_NETWORK));
        assert!(SessionFlags::MODIFIABLE.contains(SessionFlags::USES_ARBITRATION));
    }

    #[test]
    fn raw_values_match_console() {
        assert_eq!(SessionFlags::LIVE_MULTIPLAYER_STANDARD.bits(), 0x2E);
        assert_eq!(SessionFlags::LIVE_MULTIPLAYER_RANKED.bits(), 0x3E);
    }
}
