//! # xlive-core
//!
//! Shared vocabulary for the live session layer.
//!
//! - **Ids**: [`Xuid`], [`SessionId`], [`MachineId`] as `u64` newtypes and
//!   [`MacAddress`] for link-layer ids
//! - **Flags**: [`SessionFlags`] capability bits and [`PresenceState`] bits
//! - **Members & presence**: [`Member`], [`SlotType`], [`PresenceRecord`]
//! - **Errors**: [`XliveError`] with the [`ErrorKind`] taxonomy shared by the
//!   marshaller, the session manager and the backend client
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod errors;
pub mod flags;
pub mod ids;
pub mod logging;
pub mod member;
pub mod presence;

pub use errors::{ErrorKind, Result, XliveError};
pub use flags::{PresenceState, SessionFlags};
pub use ids::{MacAddress, MachineId, SessionId, Xuid};
pub use member::{HostInfo, Member, MemberOrigin, SlotType};
pub use presence::PresenceRecord;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _flags = SessionFlags::LIVE_MULTIPLAYER_STANDARD;
        let _xuid = Xuid::new(0x0009_0000_0000_0001);
        let _kind = ErrorKind::NotFound;
        let _record = PresenceRecord::placeholder(Xuid::new(1));
    }
}
