//! Session registry and lifecycle operations.
//!
//! The manager owns every live [`Session`] and takes `&mut self` for every
//! mutation. It does no locking of its own: callers must route all
//! operations on one session through a single controlling context.
//!
//! Backend propagation follows one rule per operation:
//!
//! - create, join and modify reach the backend first and commit locally only
//!   once it accepted the change
//! - leave, migrate and delete commit locally first; a backend failure is
//!   logged and does not undo the local change
//! - start and end are local only
//!
//! Offline-only sessions (no presence, stats, matchmaking or arbitration)
//! never reach the backend at all.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use xlive_backend::types::{SessionCreate, SessionJoin, SessionLeave, SessionMigrate, SessionModify};
use xlive_backend::{BackendClient, NetworkIdentity};
use xlive_core::{
    HostInfo, MachineId, Member, Result, SessionFlags, SessionId, SlotType, XliveError, Xuid,
};
use xlive_settings::XliveSettings;

use crate::session::{MachineGroup, Session};
use crate::slots::SlotCounts;

/// Manager limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// How long a deleted id stays out of circulation.
    pub id_grace_period: Duration,
    /// Largest public + private slot total.
    pub max_members: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            id_grace_period: Duration::from_secs(30),
            max_members: 32,
        }
    }
}

impl From<&XliveSettings> for ManagerConfig {
    fn from(settings: &XliveSettings) -> Self {
        Self {
            id_grace_period: Duration::from_millis(settings.session.id_grace_period_ms),
            max_members: settings.session.max_members,
        }
    }
}

/// What a successful create hands back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// New id.
    pub session_id: SessionId,
    /// Session nonce.
    pub nonce: u64,
    /// Host identity.
    pub host: HostInfo,
    /// Capability flags.
    pub flags: SessionFlags,
    /// Public slots.
    pub public_slots: u32,
    /// Private slots.
    pub private_slots: u32,
}

/// Registry of live sessions on this console.
pub struct SessionManager {
    config: ManagerConfig,
    sessions: HashMap<SessionId, Session>,
    retired: HashMap<SessionId, Instant>,
    local_users: BTreeMap<u32, Xuid>,
    identity: Arc<dyn NetworkIdentity>,
    backend: Option<Arc<BackendClient>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("retired", &self.retired.len())
            .field("backend", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Manager without a backend; every session stays local.
    pub fn new(config: ManagerConfig, identity: Arc<dyn NetworkIdentity>) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            retired: HashMap::new(),
            local_users: BTreeMap::new(),
            identity,
            backend: None,
        }
    }

    /// Manager configured from settings.
    pub fn from_settings(
        settings: &XliveSettings,
        identity: Arc<dyn NetworkIdentity>,
        backend: Option<Arc<BackendClient>>,
    ) -> Self {
        let mut manager = Self::new(ManagerConfig::from(settings), identity);
        manager.backend = backend;
        manager
    }

    /// Attach a backend client.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<BackendClient>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Backend client, if any.
    pub fn backend(&self) -> Option<&Arc<BackendClient>> {
        self.backend.as_ref()
    }

    /// Limits.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ── Local users ─────────────────────────────────────────────────────────

    /// Record the player signed in at `user_index`.
    pub fn sign_in(&mut self, user_index: u32, xuid: Xuid) -> Result<()> {
        if !xuid.is_valid() {
            return Err(XliveError::invalid_parameter("cannot sign in a zero xuid"));
        }
        let _ = self.local_users.insert(user_index, xuid);
        debug!(user_index, %xuid, "user signed in");
        Ok(())
    }

    /// Forget the player at `user_index`.
    pub fn sign_out(&mut self, user_index: u32) -> Option<Xuid> {
        self.local_users.remove(&user_index)
    }

    /// Player signed in at `user_index`.
    pub fn local_user(&self, user_index: u32) -> Result<Xuid> {
        self.local_users.get(&user_index).copied().ok_or_else(|| {
            XliveError::invalid_parameter(format!("no user signed in at index {user_index}"))
        })
    }

    /// This console's host identity for the player at `user_index`.
    pub fn local_host(&self, user_index: u32) -> Result<HostInfo> {
        let xuid = self.local_user(user_index)?;
        Ok(HostInfo {
            xuid: Some(xuid),
            address: self.identity.address(),
            mac: self.identity.mac(),
            machine_id: self.identity.machine_id(),
        })
    }

    /// Member record for `xuid`; local when the player is signed in here.
    pub fn member_for(&self, xuid: Xuid, machine_id: MachineId, slot: SlotType) -> Member {
        let local = self
            .local_users
            .iter()
            .find_map(|(index, x)| (*x == xuid).then_some(*index));
        match local {
            Some(user_index) => Member::local(xuid, user_index, slot, self.identity.machine_id()),
            None => Member::remote(xuid, slot, machine_id),
        }
    }

    // ── Registry ────────────────────────────────────────────────────────────

    /// Live session by id.
    pub fn get(&self, id: SessionId) -> Result<&Session> {
        self.sessions.get(&id).ok_or(XliveError::InvalidHandle(id))
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session> {
        self.sessions.get_mut(&id).ok_or(XliveError::InvalidHandle(id))
    }

    /// Ids of live sessions, sorted.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether `id` was deleted less than the grace period ago.
    pub fn is_retired(&self, id: SessionId) -> bool {
        self.retired
            .get(&id)
            .is_some_and(|at| at.elapsed() < self.config.id_grace_period)
    }

    /// Return ids whose grace period ended before `now` to circulation.
    pub fn purge_retired(&mut self, now: Instant) -> usize {
        let grace = self.config.id_grace_period;
        let before = self.retired.len();
        self.retired
            .retain(|_, at| now.saturating_duration_since(*at) < grace);
        before - self.retired.len()
    }

    fn allocate_id(&mut self) -> SessionId {
        let _ = self.purge_retired(Instant::now());
        loop {
            let id = SessionId::generate();
            if !self.sessions.contains_key(&id) && !self.retired.contains_key(&id) {
                return id;
            }
        }
    }

    /// Backend to use for `session`, if it is online-capable and reachable.
    fn online_backend(&self, session: &Session) -> Option<Arc<BackendClient>> {
        if session.is_offline_only() {
            return None;
        }
        self.backend.as_ref().filter(|b| b.is_online()).cloned()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Create a session hosted by the player at `user_index`.
    #[instrument(skip_all, fields(user_index = user_index, flags = flags.bits()))]
    pub fn create(
        &mut self,
        user_index: u32,
        public_slots: u32,
        private_slots: u32,
        flags: SessionFlags,
    ) -> Result<SessionInfo> {
        flags
            .check_consistency()
            .map_err(XliveError::invalid_parameter)?;
        let total = public_slots
            .checked_add(private_slots)
            .filter(|t| (1..=self.config.max_members).contains(t))
            .ok_or_else(|| {
                XliveError::invalid_parameter(format!(
                    "slot total must be 1..={}",
                    self.config.max_members
                ))
            })?;
        let host = self.local_host(user_index)?;
        let host_xuid = host.xuid.unwrap_or_default();
        let id = self.allocate_id();
        let session = Session::new(
            id,
            flags,
            user_index,
            SlotCounts::new(public_slots, private_slots),
            host,
        );

        if session.is_offline_only() {
            debug!(session = %id, "offline-only session, backend not contacted");
        } else if let Some(backend) = self.backend.clone() {
            let _ = backend.register_peer(host_xuid);
            if backend.is_online() {
                backend.create_session(&SessionCreate {
                    session_id: id,
                    flags: flags.bits(),
                    public_slots_count: public_slots,
                    private_slots_count: private_slots,
                    user_index,
                    xuid: host_xuid,
                    host_address: host.address,
                    mac_address: host.mac,
                    machine_id: host.machine_id,
                })?;
            } else {
                warn!(session = %id, "backend offline, session is local only");
            }
        }

        let info = SessionInfo {
            session_id: id,
            nonce: session.nonce(),
            host,
            flags,
            public_slots,
            private_slots,
        };
        let _ = self.sessions.insert(id, session);
        info!(session = %id, total, "session created");
        Ok(info)
    }

    /// Change modifiable flags. Slot counts must match the current ones.
    #[instrument(skip_all, fields(session = %id, flags = flags.bits()))]
    pub fn modify(
        &mut self,
        id: SessionId,
        flags: SessionFlags,
        public_slots: u32,
        private_slots: u32,
    ) -> Result<()> {
        let session = self.get(id)?;
        session.check_modify(flags, public_slots, private_slots)?;
        if let Some(backend) = self.online_backend(session) {
            backend.modify_session(
                id,
                &SessionModify {
                    flags: flags.bits(),
                    public_slots_count: public_slots,
                    private_slots_count: private_slots,
                },
            )?;
        }
        self.session_mut(id)?
            .modify(flags, public_slots, private_slots)
    }

    /// Add members atomically. Returns how many were new.
    #[instrument(skip_all, fields(session = %id, count = members.len()))]
    pub fn join(&mut self, id: SessionId, members: Vec<Member>) -> Result<usize> {
        let session = self.get(id)?;
        let fresh = session.plan_join(members)?;
        if fresh.is_empty() {
            return Ok(0);
        }
        if let Some(backend) = self.online_backend(session) {
            backend.join_session(
                id,
                &SessionJoin {
                    xuids: fresh.iter().map(|m| m.xuid).collect(),
                    private_slots: fresh.iter().map(|m| m.slot == SlotType::Private).collect(),
                },
            )?;
        }
        let added = self.session_mut(id)?.join(fresh)?;
        debug!(added, "members joined");
        Ok(added)
    }

    /// Remove members. Non-members are ignored. Returns how many left.
    #[instrument(skip_all, fields(session = %id, count = xuids.len()))]
    pub fn leave(&mut self, id: SessionId, xuids: &[Xuid]) -> Result<usize> {
        let session = self.session_mut(id)?;
        let leaving: Vec<Xuid> = xuids
            .iter()
            .copied()
            .filter(|x| session.contains(*x))
            .collect();
        let removed = session.leave(&leaving)?;
        if removed == 0 {
            return Ok(0);
        }
        let session = self.get(id)?;
        if let Some(backend) = self.online_backend(session) {
            if let Err(e) = backend.leave_session(id, &SessionLeave { xuids: leaving }) {
                warn!(error = %e, "backend leave failed, local membership already updated");
            }
        }
        debug!(removed, "members left");
        Ok(removed)
    }

    /// Begin a round.
    pub fn start(&mut self, id: SessionId) -> Result<()> {
        self.session_mut(id)?.start()?;
        info!(session = %id, "session started");
        Ok(())
    }

    /// Finish the round. Idempotent once ended.
    pub fn end(&mut self, id: SessionId) -> Result<()> {
        self.session_mut(id)?.end()?;
        info!(session = %id, "session ended");
        Ok(())
    }

    /// Hand hosting to `host`. Address caches are invalidated.
    #[instrument(skip_all, fields(session = %id))]
    pub fn migrate_host(&mut self, id: SessionId, host: HostInfo) -> Result<u32> {
        let session = self.session_mut(id)?;
        session.migrate(host)?;
        let count = session.migration_count();
        let session = self.get(id)?;
        match self.online_backend(session) {
            Some(backend) => {
                let body = SessionMigrate {
                    xuid: host.xuid.unwrap_or_default(),
                    host_address: host.address,
                    mac_address: host.mac,
                    machine_id: host.machine_id,
                };
                if let Err(e) = backend.migrate_session(id, &body) {
                    warn!(error = %e, "backend migrate failed, local host already changed");
                }
            }
            None => {
                if let Some(backend) = &self.backend {
                    backend.cache().invalidate_all("host migrated");
                }
            }
        }
        info!(migrations = count, "host migrated");
        Ok(count)
    }

    /// Register for arbitration and return the roster by console.
    ///
    /// The backend's roster wins when it has one; otherwise the local
    /// membership is reported.
    #[instrument(skip_all, fields(session = %id, nonce = nonce))]
    pub fn register_arbitration(&mut self, id: SessionId, nonce: u64) -> Result<Vec<MachineGroup>> {
        let local = self.session_mut(id)?.register_arbitration(nonce)?;
        let session = self.get(id)?;
        let Some(backend) = self.online_backend(session) else {
            return Ok(local);
        };
        match backend.register_arbitration(id, nonce) {
            Ok(roster) if !roster.is_empty() => Ok(roster
                .into_iter()
                .map(|m| MachineGroup {
                    machine_id: m.machine_id,
                    members: m.xuids,
                })
                .collect()),
            Ok(_) => Ok(local),
            Err(e) => {
                warn!(error = %e, "backend arbitration failed, using local roster");
                Ok(local)
            }
        }
    }

    /// Tear down. Later calls with this id fail with `InvalidHandle`, and the
    /// id is not reissued until the grace period passes.
    #[instrument(skip_all, fields(session = %id))]
    pub fn delete(&mut self, id: SessionId) -> Result<()> {
        let mut session = self.sessions.remove(&id).ok_or(XliveError::InvalidHandle(id))?;
        session.delete()?;
        let _ = self.retired.insert(id, Instant::now());
        match self.online_backend(&session) {
            Some(backend) => {
                if let Err(e) = backend.delete_session(id) {
                    warn!(error = %e, "backend delete failed, session removed locally");
                }
            }
            None => {
                if let Some(backend) = &self.backend {
                    backend.cache().invalidate_all("session deleted");
                }
            }
        }
        info!("session deleted");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
