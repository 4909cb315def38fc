//! Friends list persistence and presence aggregation.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};
use xlive_core::{PresenceRecord, PresenceState, Result, XliveError, Xuid};

use crate::client::BackendClient;
use crate::types::{PresenceBody, PresenceQuery};

fn friends_key(user_index: u32) -> String {
    format!("friends/{user_index}")
}

impl From<PresenceBody> for PresenceRecord {
    fn from(body: PresenceBody) -> Self {
        Self {
            xuid: body.xuid,
            state: PresenceState::from_bits_truncate(body.state),
            session_id: body.session_id.is_valid().then_some(body.session_id),
            title_id: body.title_id,
            rich_presence: body.rich_presence,
            resolved: true,
        }
    }
}

impl BackendClient {
    /// Friends of `user_index`, in insertion order.
    pub fn friends(&self, user_index: u32) -> Result<Vec<Xuid>> {
        let stored = self.store.get(&friends_key(user_index))?;
        Ok(stored
            .map(|value| {
                serde_json::from_value(value).unwrap_or_else(|e| {
                    warn!(user_index, error = %e, "stored friends list unreadable, ignoring");
                    Vec::new()
                })
            })
            .unwrap_or_default())
    }

    /// Add a friend. Returns `false` if already present.
    pub fn add_friend(&self, user_index: u32, xuid: Xuid) -> Result<bool> {
        if !xuid.is_valid() {
            return Err(XliveError::invalid_parameter("friend xuid is zero"));
        }
        let mut friends = self.friends(user_index)?;
        if friends.contains(&xuid) {
            return Ok(false);
        }
        friends.push(xuid);
        self.save_friends(user_index, &friends)?;
        Ok(true)
    }

    /// Remove a friend. Returns `false` if absent.
    pub fn remove_friend(&self, user_index: u32, xuid: Xuid) -> Result<bool> {
        let mut friends = self.friends(user_index)?;
        let before = friends.len();
        friends.retain(|f| *f != xuid);
        if friends.len() == before {
            return Ok(false);
        }
        self.save_friends(user_index, &friends)?;
        Ok(true)
    }

    fn save_friends(&self, user_index: u32, friends: &[Xuid]) -> Result<()> {
        let value = serde_json::to_value(friends)
            .map_err(|e| XliveError::invalid_parameter(format!("friends list: {e}")))?;
        self.store.put(&friends_key(user_index), value)?;
        Ok(())
    }

    /// Resolve presence for `xuids` on the backend.
    #[instrument(skip_all, fields(count = xuids.len()))]
    pub fn fetch_presence(&self, xuids: &[Xuid]) -> Result<Vec<PresenceRecord>> {
        if xuids.is_empty() {
            return Ok(Vec::new());
        }
        let query = PresenceQuery {
            xuids: xuids.to_vec(),
        };
        let bodies: Vec<PresenceBody> = self
            .post("players/presence", &query)
            .into_typed("presence")?;
        Ok(bodies
            .into_iter()
            .filter(|b| b.xuid.is_valid())
            .map(PresenceRecord::from)
            .collect())
    }

    /// Presence for every friend of `user_index`.
    ///
    /// Never fails: when offline or when the backend cannot be reached the
    /// list holds offline placeholders only.
    #[instrument(skip_all, fields(user_index = user_index))]
    pub fn get_all_friends_presence(&self, user_index: u32) -> Vec<PresenceRecord> {
        let friends = self.friends(user_index).unwrap_or_else(|e| {
            warn!(error = %e, "could not read friends list");
            Vec::new()
        });
        let placeholders: Vec<_> = friends
            .iter()
            .copied()
            .map(PresenceRecord::placeholder)
            .collect();
        if !self.is_online() {
            debug!("offline, returning placeholders");
            return merge_presence(placeholders, Vec::new());
        }
        let resolved = self.fetch_presence(&friends).unwrap_or_else(|e| {
            warn!(error = %e, "presence fetch failed, returning placeholders");
            Vec::new()
        });
        merge_presence(placeholders, resolved)
    }
}

/// Merge placeholders with resolved records into display order.
///
/// One entry per player, keeping first-seen order. A resolved record
/// replaces an unresolved one; among resolved records an online one replaces
/// an offline one. The result is then stably ordered: non-idle first, then
/// joinable first.
pub fn merge_presence(
    placeholders: Vec<PresenceRecord>,
    resolved: Vec<PresenceRecord>,
) -> Vec<PresenceRecord> {
    let mut merged: Vec<PresenceRecord> = Vec::with_capacity(placeholders.len());
    let mut index: HashMap<Xuid, usize> = HashMap::new();

    for record in placeholders.into_iter().chain(resolved) {
        match index.get(&record.xuid) {
            Some(&at) => {
                if supersedes(&record, &merged[at]) {
                    merged[at] = record;
                }
            }
            None => {
                let _ = index.insert(record.xuid, merged.len());
                merged.push(record);
            }
        }
    }

    merged.sort_by_key(|r| (r.is_idle(), !r.is_joinable()));
    merged
}

fn supersedes(candidate: &PresenceRecord, current: &PresenceRecord) -> bool {
    let online = |r: &PresenceRecord| r.state.contains(PresenceState::ONLINE);
    match (candidate.resolved, current.resolved) {
        (true, false) => true,
        (true, true) => online(candidate) && !online(current),
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
