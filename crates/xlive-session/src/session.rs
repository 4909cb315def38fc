//! One session's state machine.
//!
//! Every method validates first and mutates only once validation passed, so
//! a rejected call leaves the session exactly as it was.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use xlive_core::{
    HostInfo, MachineId, Member, Result, SessionFlags, SessionId, SlotType, XliveError, Xuid,
};

use crate::slots::SlotCounts;
use crate::state::SessionState;

/// Players grouped by console, as arbitration reports them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineGroup {
    /// Console.
    pub machine_id: MachineId,
    /// Players on it, in join order.
    pub members: Vec<Xuid>,
}

/// A multiplayer session.
#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    flags: SessionFlags,
    owner_index: u32,
    nonce: u64,
    host: HostInfo,
    slots: SlotCounts,
    members: Vec<Member>,
    migration_count: u32,
    arbitration_nonce: Option<u64>,
    offline_only: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A freshly created session. Flags must already be validated.
    pub fn new(
        id: SessionId,
        flags: SessionFlags,
        owner_index: u32,
        slots: SlotCounts,
        host: HostInfo,
    ) -> Self {
        Self {
            id,
            state: SessionState::Created,
            flags,
            owner_index,
            nonce: rand::random(),
            host,
            slots,
            members: Vec::new(),
            migration_count: 0,
            arbitration_nonce: None,
            offline_only: flags.is_offline_only(),
            created_at: Utc::now(),
            started_at: None,
        }
    }

    /// Id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capability flags.
    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    /// Local user that created the session.
    pub fn owner_index(&self) -> u32 {
        self.owner_index
    }

    /// Random value fixed at creation.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Current host.
    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Slot accounting.
    pub fn slots(&self) -> &SlotCounts {
        &self.slots
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Whether `xuid` is a member.
    pub fn contains(&self, xuid: Xuid) -> bool {
        self.members.iter().any(|m| m.xuid == xuid)
    }

    /// Host migrations so far.
    pub fn migration_count(&self) -> u32 {
        self.migration_count
    }

    /// Nonce of the last arbitration registration.
    pub fn arbitration_nonce(&self) -> Option<u64> {
        self.arbitration_nonce
    }

    /// Never contacts the backend.
    pub fn is_offline_only(&self) -> bool {
        self.offline_only
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Start of the current or last round.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Occupied slots.
    pub fn filled_slots(&self) -> u32 {
        self.slots.filled_slots()
    }

    /// Open slots.
    pub fn available_slots(&self) -> u32 {
        self.slots.available_slots()
    }

    /// Slots in both pools.
    pub fn max_slots(&self) -> u32 {
        self.slots.max_slots()
    }

    fn refuse(&self, operation: &'static str) -> XliveError {
        XliveError::invalid_state(self.id, self.state.name(), operation)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state == SessionState::Deleted {
            return Err(XliveError::InvalidHandle(self.id));
        }
        Ok(())
    }

    /// Members from `incoming` that would actually be added: existing members
    /// and repeats within the batch are dropped.
    ///
    /// Fails without side effects on a zero xuid, when joins are closed, or
    /// when either pool lacks room.
    pub fn plan_join(&self, incoming: Vec<Member>) -> Result<Vec<Member>> {
        self.ensure_live()?;
        if self.state == SessionState::Started
            && self.flags.contains(SessionFlags::JOIN_IN_PROGRESS_DISABLED)
        {
            return Err(self.refuse("join in progress"));
        }
        let mut fresh: Vec<Member> = Vec::with_capacity(incoming.len());
        for member in incoming {
            if !member.xuid.is_valid() {
                return Err(XliveError::invalid_parameter("member xuid is zero"));
            }
            if !self.contains(member.xuid) && !fresh.iter().any(|m| m.xuid == member.xuid) {
                fresh.push(member);
            }
        }
        let count = |slot: SlotType| {
            u32::try_from(fresh.iter().filter(|m| m.slot == slot).count()).unwrap_or(u32::MAX)
        };
        self.slots
            .check_room(count(SlotType::Public), count(SlotType::Private))?;
        Ok(fresh)
    }

    /// Add members atomically. Returns how many were new.
    pub fn join(&mut self, incoming: Vec<Member>) -> Result<usize> {
        let fresh = self.plan_join(incoming)?;
        for member in &fresh {
            self.slots.fill(member.slot, 1)?;
        }
        let added = fresh.len();
        self.members.extend(fresh);
        Ok(added)
    }

    /// Remove members. Unknown players are ignored. Returns how many left.
    pub fn leave(&mut self, xuids: &[Xuid]) -> Result<usize> {
        self.ensure_live()?;
        let before = self.members.len();
        let slots = &mut self.slots;
        self.members.retain(|m| {
            if xuids.contains(&m.xuid) {
                slots.release(m.slot);
                false
            } else {
                true
            }
        });
        Ok(before - self.members.len())
    }

    /// Validate a modify request without applying it.
    pub fn check_modify(
        &self,
        flags: SessionFlags,
        public_slots: u32,
        private_slots: u32,
    ) -> Result<()> {
        self.ensure_live()?;
        if public_slots != self.slots.max(SlotType::Public)
            || private_slots != self.slots.max(SlotType::Private)
        {
            return Err(XliveError::invalid_parameter(
                "slot counts cannot change after creation",
            ));
        }
        let changed = flags.symmetric_difference(self.flags);
        if !SessionFlags::MODIFIABLE.contains(changed) {
            return Err(XliveError::invalid_parameter(format!(
                "flags {:#x} cannot change after creation",
                changed.difference(SessionFlags::MODIFIABLE).bits()
            )));
        }
        flags.check_consistency().map_err(XliveError::invalid_parameter)
    }

    /// Apply a modify request.
    pub fn modify(
        &mut self,
        flags: SessionFlags,
        public_slots: u32,
        private_slots: u32,
    ) -> Result<()> {
        self.check_modify(flags, public_slots, private_slots)?;
        self.flags = flags;
        Ok(())
    }

    /// Begin a round.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_live()?;
        if !self.state.can_start() {
            return Err(self.refuse("start"));
        }
        if self.slots.is_oversubscribed() {
            return Err(XliveError::CapacityExceeded {
                requested: self.slots.filled_slots(),
                available: self.slots.max_slots(),
            });
        }
        self.state = SessionState::Started;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Finish the round. Ending an ended session is a no-op.
    pub fn end(&mut self) -> Result<()> {
        self.ensure_live()?;
        match self.state {
            SessionState::Started => {
                self.state = SessionState::Ended;
                Ok(())
            }
            SessionState::Ended => Ok(()),
            _ => Err(self.refuse("end")),
        }
    }

    /// Validate a migration without applying it.
    pub fn check_migrate(&self) -> Result<()> {
        self.ensure_live()?;
        if self.state.can_migrate() {
            Ok(())
        } else {
            Err(self.refuse("migrate host"))
        }
    }

    /// Hand hosting to `host`.
    pub fn migrate(&mut self, host: HostInfo) -> Result<()> {
        self.check_migrate()?;
        self.host = host;
        self.migration_count += 1;
        Ok(())
    }

    /// Record an arbitration registration and group members by console.
    pub fn register_arbitration(&mut self, nonce: u64) -> Result<Vec<MachineGroup>> {
        self.ensure_live()?;
        if !self.flags.contains(SessionFlags::USES_ARBITRATION) {
            return Err(self.refuse("register arbitration"));
        }
        self.arbitration_nonce = Some(nonce);
        Ok(self.machine_groups())
    }

    /// Members grouped by console, consoles in first-join order.
    pub fn machine_groups(&self) -> Vec<MachineGroup> {
        let mut order: BTreeMap<MachineId, usize> = BTreeMap::new();
        let mut groups: Vec<MachineGroup> = Vec::new();
        for member in &self.members {
            let at = *order.entry(member.machine_id).or_insert_with(|| {
                groups.push(MachineGroup {
                    machine_id: member.machine_id,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            groups[at].members.push(member.xuid);
        }
        groups
    }

    /// Mark deleted. Allowed from any state; repeat calls fail.
    pub fn delete(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.state = SessionState::Deleted;
        self.members.clear();
        self.slots = SlotCounts::new(
            self.slots.max(SlotType::Public),
            self.slots.max(SlotType::Private),
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    const ID: SessionId = SessionId::new(0xAE00_0000_0000_0001);

    fn session(flags: SessionFlags, public: u32, private: u32) -> Session {
        Session::new(ID, flags, 0, SlotCounts::new(public, private), HostInfo::unknown())
    }

    fn public(xuid: u64) -> Member {
        Member::remote(Xuid::new(xuid), SlotType::Public, MachineId::new(xuid % 3 + 1))
    }

    fn private(xuid: u64) -> Member {
        Member::remote(Xuid::new(xuid), SlotType::Private, MachineId::new(9))
    }

    #[test]
    fn join_and_leave_scenario() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 8, 0);
        assert_eq!(s.join((1..=4).map(public).collect()).unwrap(), 4);
        assert_eq!(s.filled_slots(), 4);
        assert_eq!(s.leave(&[Xuid::new(1), Xuid::new(2)]).unwrap(), 2);
        assert_eq!(s.filled_slots(), 2);
        assert_eq!(s.available_slots(), 6);
    }

    #[test]
    fn join_is_all_or_nothing() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 2, 0);
        s.join(vec![public(1)]).unwrap();
        assert_matches!(
            s.join(vec![public(2), public(3)]),
            Err(XliveError::CapacityExceeded { requested: 2, available: 1 })
        );
        assert_eq!(s.members().len(), 1);
        assert_matches!(
            s.join(vec![public(4), public(0)]),
            Err(XliveError::InvalidParameter(_))
        );
        assert_eq!(s.filled_slots(), 1);
    }

    #[test]
    fn duplicate_joins_take_one_slot() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 0);
        assert_eq!(s.join(vec![public(1), public(1)]).unwrap(), 1);
        assert_eq!(s.join(vec![public(1)]).unwrap(), 0);
        assert_eq!(s.filled_slots(), 1);
    }

    #[test]
    fn private_pool_does_not_overflow_into_public() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 1);
        s.join(vec![private(1)]).unwrap();
        assert_matches!(s.join(vec![private(2)]), Err(XliveError::CapacityExceeded { .. }));
    }

    #[test]
    fn leave_twice_is_same_as_once() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 8, 0);
        s.join((1..=3).map(public).collect()).unwrap();
        assert_eq!(s.leave(&[Xuid::new(2)]).unwrap(), 1);
        let after_once = (s.filled_slots(), s.members().to_vec());
        assert_eq!(s.leave(&[Xuid::new(2)]).unwrap(), 0);
        assert_eq!((s.filled_slots(), s.members().to_vec()), after_once);
    }

    #[test]
    fn join_in_progress_can_be_disabled() {
        let mut s = session(
            SessionFlags::LIVE_MULTIPLAYER_STANDARD | SessionFlags::JOIN_IN_PROGRESS_DISABLED,
            4,
            0,
        );
        s.start().unwrap();
        assert_matches!(s.join(vec![public(1)]), Err(XliveError::InvalidState { .. }));
        s.end().unwrap();
        assert_eq!(s.join(vec![public(1)]).unwrap(), 1);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 0);
        assert_matches!(s.end(), Err(XliveError::InvalidState { operation: "end", .. }));
        s.start().unwrap();
        assert!(s.started_at().is_some());
        assert_matches!(s.start(), Err(XliveError::InvalidState { state: "started", .. }));
        s.end().unwrap();
        s.end().unwrap();
        assert_eq!(s.state(), SessionState::Ended);
        assert_matches!(s.migrate(HostInfo::unknown()), Err(XliveError::InvalidState { .. }));
        s.start().unwrap();
        assert_eq!(s.state(), SessionState::Started);
    }

    #[test]
    fn modify_only_touches_modifiable_bits() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 0);
        let closed =
            SessionFlags::LIVE_MULTIPLAYER_STANDARD | SessionFlags::JOIN_IN_PROGRESS_DISABLED;
        s.modify(closed, 4, 0).unwrap();
        assert_eq!(s.flags(), closed);

        assert_matches!(s.modify(closed, 5, 0), Err(XliveError::InvalidParameter(_)));
        assert_matches!(
            s.modify(closed | SessionFlags::HOST, 4, 0),
            Err(XliveError::InvalidParameter(msg)) if msg.contains("0x1")
        );
        assert_eq!(s.flags(), closed);
    }

    #[test]
    fn modify_rejects_inconsistent_result() {
        let mut s = session(SessionFlags::USES_PEER_NETWORK, 4, 0);
        assert_matches!(
            s.modify(SessionFlags::USES_PEER_NETWORK | SessionFlags::USES_ARBITRATION, 4, 0),
            Err(XliveError::InvalidParameter(msg)) if msg.contains("arbitration")
        );
    }

    #[test]
    fn migration_counts() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 0);
        let mut host = HostInfo::unknown();
        host.machine_id = MachineId::new(77);
        s.migrate(host).unwrap();
        s.start().unwrap();
        s.migrate(HostInfo::unknown()).unwrap();
        assert_eq!(s.migration_count(), 2);
    }

    #[test]
    fn arbitration_groups_by_machine() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_RANKED, 8, 0);
        s.join((1..=5).map(public).collect()).unwrap();
        let groups = s.register_arbitration(42).unwrap();
        assert_eq!(s.arbitration_nonce(), Some(42));
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].machine_id, MachineId::new(2));
        assert_eq!(groups[0].members, vec![Xuid::new(1), Xuid::new(4)]);

        let mut unranked = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 8, 0);
        assert_matches!(
            unranked.register_arbitration(1),
            Err(XliveError::InvalidState { operation: "register arbitration", .. })
        );
        assert_eq!(unranked.arbitration_nonce(), None);
    }

    #[test]
    fn deleted_session_refuses_everything() {
        let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, 4, 0);
        s.join(vec![public(1)]).unwrap();
        s.delete().unwrap();
        assert_eq!(s.state(), SessionState::Deleted);
        assert_eq!(s.filled_slots(), 0);
        assert_matches!(s.delete(), Err(XliveError::InvalidHandle(id)) if id == ID);
        assert_matches!(s.leave(&[Xuid::new(1)]), Err(XliveError::InvalidHandle(_)));
        assert_matches!(s.start(), Err(XliveError::InvalidHandle(_)));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Join(Vec<(u64, bool)>),
        Leave(Vec<u64>),
        Start,
        End,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop::collection::vec((1u64..12, any::<bool>()), 0..5).prop_map(Op::Join),
            prop::collection::vec(1u64..12, 0..4).prop_map(Op::Leave),
            Just(Op::Start),
            Just(Op::End),
        ]
    }

    proptest! {
        #[test]
        fn slot_accounting_holds(
            ops in prop::collection::vec(op(), 0..40),
            public_max in 0u32..6,
            private_max in 0u32..3,
        ) {
            let mut s = session(SessionFlags::LIVE_MULTIPLAYER_STANDARD, public_max, private_max);
            for op in ops {
                let _ = match op {
                    Op::Join(entries) => s
                        .join(
                            entries
                                .into_iter()
                                .map(|(x, p)| if p { private(x) } else { public(x) })
                                .collect(),
                        )
                        .map(drop),
                    Op::Leave(xuids) => s
                        .leave(&xuids.into_iter().map(Xuid::new).collect::<Vec<_>>())
                        .map(drop),
                    Op::Start => s.start(),
                    Op::End => s.end(),
                };
                prop_assert_eq!(s.filled_slots(), s.max_slots() - s.available_slots());
                prop_assert_eq!(s.filled_slots() as usize, s.members().len());
                prop_assert!(s.slots().filled(SlotType::Public) <= public_max);
                prop_assert!(s.slots().filled(SlotType::Private) <= private_max);
            }
        }
    }
}
