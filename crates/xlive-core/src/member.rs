//! Session members and host identity.

use std::fmt;
use std::net::Ipv4Addr;

use crate::ids::{MacAddress, MachineId, Xuid};
use crate::presence::PresenceRecord;

/// Which slot pool a member occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotType {
    /// Open to matchmaking.
    Public,
    /// Reserved for invites.
    Private,
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Where a member plays from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberOrigin {
    /// Signed in on this console at the given controller index.
    Local {
        /// Controller / profile index.
        user_index: u32,
    },
    /// Playing on a peer console.
    Remote,
}

/// A player occupying a slot in a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Player id.
    pub xuid: Xuid,
    /// Slot pool the player counts against.
    pub slot: SlotType,
    /// Local or remote.
    pub origin: MemberOrigin,
    /// Console the player is on.
    pub machine_id: MachineId,
    /// Last known presence, if resolved.
    pub presence: Option<PresenceRecord>,
}

impl Member {
    /// A local member on this console.
    #[must_use]
    pub fn local(xuid: Xuid, user_index: u32, slot: SlotType, machine_id: MachineId) -> Self {
        Self {
            xuid,
            slot,
            origin: MemberOrigin::Local { user_index },
            machine_id,
            presence: None,
        }
    }

    /// A member on a peer console.
    #[must_use]
    pub fn remote(xuid: Xuid, slot: SlotType, machine_id: MachineId) -> Self {
        Self {
            xuid,
            slot,
            origin: MemberOrigin::Remote,
            machine_id,
            presence: None,
        }
    }

    /// Whether this member is signed in on this console.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.origin, MemberOrigin::Local { .. })
    }
}

/// Identity of the console hosting a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostInfo {
    /// Player hosting, when known.
    pub xuid: Option<Xuid>,
    /// Host network address.
    pub address: Ipv4Addr,
    /// Host link-layer address.
    pub mac: MacAddress,
    /// Host console identity.
    pub machine_id: MachineId,
}

impl HostInfo {
    /// Placeholder used before a host is known.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            xuid: None,
            address: Ipv4Addr::UNSPECIFIED,
            mac: MacAddress::default(),
            machine_id: MachineId::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_remote_constructors() {
        let local = Member::local(Xuid::new(1), 0, SlotType::Public, MachineId::new(10));
        let remote = Member::remote(Xuid::new(2), SlotType::Private, MachineId::new(11));
        assert!(local.is_local());
        assert!(!remote.is_local());
        assert_eq!(remote.slot.to_string(), "private");
    }

    #[test]
    fn unknown_host_is_unspecified() {
        let host = HostInfo::unknown();
        assert!(host.address.is_unspecified());
        assert!(host.mac.is_zero());
        assert!(host.xuid.is_none());
    }
}
