//! Address, QoS and session-details memoization.
//!
//! Entries are best-effort and never authoritative. Addresses are reused
//! across sessions, so invalidation is always total: a delete or migration
//! clears every map at once and bumps the epoch.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;
use xlive_core::{MacAddress, SessionId};

use crate::types::SessionDetails;

#[derive(Debug, Default)]
struct Maps {
    qos: HashMap<SessionId, Vec<u8>>,
    session_by_addr: HashMap<Ipv4Addr, SessionId>,
    mac_by_addr: HashMap<Ipv4Addr, MacAddress>,
    details: HashMap<SessionId, SessionDetails>,
}

/// Process-wide cache shared by `Arc`.
///
/// Reads take a shared lock; inserts and invalidation take the write lock.
#[derive(Debug, Default)]
pub struct BackendCache {
    maps: RwLock<Maps>,
    epoch: AtomicU64,
}

impl BackendCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` for `session` and report whether it differs from what
    /// was cached.
    pub fn update_qos(&self, session: SessionId, payload: &[u8]) -> bool {
        let mut maps = self.maps.write();
        if maps.qos.get(&session).is_some_and(|cached| cached == payload) {
            return false;
        }
        let _ = maps.qos.insert(session, payload.to_vec());
        true
    }

    /// Cached QoS payload.
    pub fn qos(&self, session: SessionId) -> Option<Vec<u8>> {
        self.maps.read().qos.get(&session).cloned()
    }

    /// Session id last seen at `addr`.
    pub fn session_for(&self, addr: Ipv4Addr) -> Option<SessionId> {
        self.maps.read().session_by_addr.get(&addr).copied()
    }

    /// Link-layer address last seen at `addr`.
    pub fn mac_for(&self, addr: Ipv4Addr) -> Option<MacAddress> {
        self.maps.read().mac_by_addr.get(&addr).copied()
    }

    /// Remember what a peer lookup returned. Zero values are not cached.
    pub fn remember_peer(&self, addr: Ipv4Addr, session: SessionId, mac: MacAddress) {
        let mut maps = self.maps.write();
        if session.is_valid() {
            let _ = maps.session_by_addr.insert(addr, session);
        }
        if !mac.is_zero() {
            let _ = maps.mac_by_addr.insert(addr, mac);
        }
    }

    /// Cached details.
    pub fn details(&self, session: SessionId) -> Option<SessionDetails> {
        self.maps.read().details.get(&session).cloned()
    }

    /// Cache details.
    pub fn put_details(&self, session: SessionId, details: SessionDetails) {
        let _ = self.maps.write().details.insert(session, details);
    }

    /// Clear everything.
    pub fn invalidate_all(&self, reason: &str) {
        let mut maps = self.maps.write();
        let dropped = maps.qos.len()
            + maps.session_by_addr.len()
            + maps.mac_by_addr.len()
            + maps.details.len();
        *maps = Maps::default();
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(reason, dropped, epoch, "cache invalidated");
    }

    /// Number of invalidations so far.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Total entries across all maps.
    pub fn len(&self) -> usize {
        let maps = self.maps.read();
        maps.qos.len() + maps.session_by_addr.len() + maps.mac_by_addr.len() + maps.details.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
