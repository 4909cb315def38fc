//! Typed results and their region layouts.

use std::net::Ipv4Addr;

use xlive_core::{MacAddress, MachineId, PresenceRecord, SessionId, Xuid};

use crate::errors::MarshalError;
use crate::result::{ResultReader, ResultWriter, WireResult};

/// Gamertag width in UTF-16 units.
pub const GAMERTAG_CHARS: usize = 16;

/// Result of a session create.
///
/// Layout: `session u64 | nonce u64 | host addr [4] | host mac [6] | pad [2]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateSessionResult {
    /// New session.
    pub session_id: SessionId,
    /// Session nonce.
    pub nonce: u64,
    /// Host address.
    pub host_address: Ipv4Addr,
    /// Host link-layer address.
    pub host_mac: MacAddress,
}

impl WireResult for CreateSessionResult {
    const HEADER_LEN: usize = 28;

    fn tail_len(&self) -> usize {
        0
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        w.put_u64(0, self.session_id.get())?;
        w.put_u64(8, self.nonce)?;
        w.put_bytes(16, &self.host_address.octets())?;
        w.put_bytes(20, self.host_mac.as_bytes())
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let addr = r.bytes(16, 4)?;
        let mac = r.bytes(20, 6)?;
        let mut mac_bytes = [0u8; 6];
        mac_bytes.copy_from_slice(mac);
        Ok(Self {
            session_id: SessionId::new(r.u64(0)?),
            nonce: r.u64(8)?,
            host_address: Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]),
            host_mac: MacAddress(mac_bytes),
        })
    }
}

/// One resolved player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundUser {
    /// Player.
    pub xuid: Xuid,
    /// Gamertag, at most [`GAMERTAG_CHARS`] units.
    pub gamertag: String,
}

/// Result of a find-users call.
///
/// Layout: header `(count, offset)`; entries of `xuid u64 | gamertag [16]u16`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindUsersResult {
    /// Resolved players.
    pub users: Vec<FoundUser>,
}

const FOUND_USER_LEN: usize = 8 + GAMERTAG_CHARS * 2;

impl WireResult for FindUsersResult {
    const HEADER_LEN: usize = 8;

    fn tail_len(&self) -> usize {
        self.users.len() * FOUND_USER_LEN
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        let base = w.reserve(self.tail_len())?;
        w.put_array(0, self.users.len(), base)?;
        for (i, user) in self.users.iter().enumerate() {
            let pos = base + i * FOUND_USER_LEN;
            w.put_u64(pos, user.xuid.get())?;
            w.put_fixed_text(pos + 8, &user.gamertag, GAMERTAG_CHARS)?;
        }
        Ok(())
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let (count, base) = r.array(0)?;
        let users = (0..count)
            .map(|i| {
                let pos = base + i * FOUND_USER_LEN;
                Ok(FoundUser {
                    xuid: Xuid::new(r.u64(pos)?),
                    gamertag: r.fixed_text(pos + 8, GAMERTAG_CHARS)?,
                })
            })
            .collect::<Result<_, MarshalError>>()?;
        Ok(Self { users })
    }
}

/// Members on one machine, for arbitration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineEntry {
    /// Console.
    pub machine_id: MachineId,
    /// Players on it.
    pub members: Vec<Xuid>,
}

/// Result of arbitration registration.
///
/// Layout: header `nonce u64 | (count, offset)`; machine entries of
/// `machine u64 | (count, offset)`; then each machine's xuids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArbitrationResult {
    /// Nonce echoed back.
    pub nonce: u64,
    /// Machines in the session.
    pub machines: Vec<MachineEntry>,
}

const MACHINE_ENTRY_LEN: usize = 16;

impl WireResult for ArbitrationResult {
    const HEADER_LEN: usize = 16;

    fn tail_len(&self) -> usize {
        self.machines
            .iter()
            .map(|m| MACHINE_ENTRY_LEN + m.members.len() * 8)
            .sum()
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        w.put_u64(0, self.nonce)?;
        let base = w.reserve(self.machines.len() * MACHINE_ENTRY_LEN)?;
        w.put_array(8, self.machines.len(), base)?;
        for (i, machine) in self.machines.iter().enumerate() {
            let pos = base + i * MACHINE_ENTRY_LEN;
            let members = w.reserve(machine.members.len() * 8)?;
            w.put_u64(pos, machine.machine_id.get())?;
            w.put_array(pos + 8, machine.members.len(), members)?;
            for (j, xuid) in machine.members.iter().enumerate() {
                w.put_u64(members + j * 8, xuid.get())?;
            }
        }
        Ok(())
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let (count, base) = r.array(8)?;
        let machines = (0..count)
            .map(|i| {
                let pos = base + i * MACHINE_ENTRY_LEN;
                let (n, members) = r.array(pos + 8)?;
                Ok(MachineEntry {
                    machine_id: MachineId::new(r.u64(pos)?),
                    members: (0..n)
                        .map(|j| r.u64(members + j * 8).map(Xuid::new))
                        .collect::<Result<_, MarshalError>>()?,
                })
            })
            .collect::<Result<_, MarshalError>>()?;
        Ok(Self {
            nonce: r.u64(0)?,
            machines,
        })
    }
}

/// One presence row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Player.
    pub xuid: Xuid,
    /// Raw presence state bits.
    pub state: u32,
    /// Title being played.
    pub title_id: u32,
    /// Session the player is in, zero when none.
    pub session_id: SessionId,
    /// Rich presence text.
    pub rich_presence: String,
}

impl From<&PresenceRecord> for PresenceEntry {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            xuid: record.xuid,
            state: record.state.bits(),
            title_id: record.title_id,
            session_id: record.session_id.unwrap_or_default(),
            rich_presence: record.rich_presence.clone(),
        }
    }
}

/// Result of a friends-presence query.
///
/// Layout: header `(count, offset)`; entries of
/// `xuid u64 | state u32 | title u32 | session u64 | (chars, offset)`;
/// then the rich presence text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresenceResult {
    /// Rows in display order.
    pub entries: Vec<PresenceEntry>,
}

const PRESENCE_ENTRY_LEN: usize = 32;

impl WireResult for PresenceResult {
    const HEADER_LEN: usize = 8;

    fn tail_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| PRESENCE_ENTRY_LEN + e.rich_presence.encode_utf16().count() * 2)
            .sum()
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        let base = w.reserve(self.entries.len() * PRESENCE_ENTRY_LEN)?;
        w.put_array(0, self.entries.len(), base)?;
        for (i, entry) in self.entries.iter().enumerate() {
            let pos = base + i * PRESENCE_ENTRY_LEN;
            w.put_u64(pos, entry.xuid.get())?;
            w.put_u32(pos + 8, entry.state)?;
            w.put_u32(pos + 12, entry.title_id)?;
            w.put_u64(pos + 16, entry.session_id.get())?;
            let (offset, chars) = w.append_utf16(&entry.rich_presence)?;
            w.put_u32(pos + 24, chars)?;
            w.put_u32(pos + 28, offset)?;
        }
        Ok(())
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let (count, base) = r.array(0)?;
        let entries = (0..count)
            .map(|i| {
                let pos = base + i * PRESENCE_ENTRY_LEN;
                let (chars, offset) = r.array(pos + 24)?;
                Ok(PresenceEntry {
                    xuid: Xuid::new(r.u64(pos)?),
                    state: r.u32(pos + 8)?,
                    title_id: r.u32(pos + 12)?,
                    session_id: SessionId::new(r.u64(pos + 16)?),
                    rich_presence: r.utf16(offset, chars)?,
                })
            })
            .collect::<Result<_, MarshalError>>()?;
        Ok(Self { entries })
    }
}

/// One session search hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchHit {
    /// Session.
    pub session_id: SessionId,
    /// Host player.
    pub host_xuid: Xuid,
    /// Host address.
    pub host_address: Ipv4Addr,
    /// Open public slots.
    pub open_public: u32,
    /// Open private slots.
    pub open_private: u32,
    /// Filled public slots.
    pub filled_public: u32,
    /// Filled private slots.
    pub filled_private: u32,
}

/// Result of a session search.
///
/// Layout: header `(count, offset)`; 36-byte hits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Hits in backend order.
    pub hits: Vec<SearchHit>,
}

const SEARCH_HIT_LEN: usize = 36;

impl WireResult for SearchResult {
    const HEADER_LEN: usize = 8;

    fn tail_len(&self) -> usize {
        self.hits.len() * SEARCH_HIT_LEN
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        let base = w.reserve(self.tail_len())?;
        w.put_array(0, self.hits.len(), base)?;
        for (i, hit) in self.hits.iter().enumerate() {
            let pos = base + i * SEARCH_HIT_LEN;
            w.put_u64(pos, hit.session_id.get())?;
            w.put_u64(pos + 8, hit.host_xuid.get())?;
            w.put_bytes(pos + 16, &hit.host_address.octets())?;
            w.put_u32(pos + 20, hit.open_public)?;
            w.put_u32(pos + 24, hit.open_private)?;
            w.put_u32(pos + 28, hit.filled_public)?;
            w.put_u32(pos + 32, hit.filled_private)?;
        }
        Ok(())
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let (count, base) = r.array(0)?;
        let hits = (0..count)
            .map(|i| {
                let pos = base + i * SEARCH_HIT_LEN;
                let addr = r.bytes(pos + 16, 4)?;
                Ok(SearchHit {
                    session_id: SessionId::new(r.u64(pos)?),
                    host_xuid: Xuid::new(r.u64(pos + 8)?),
                    host_address: Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]),
                    open_public: r.u32(pos + 20)?,
                    open_private: r.u32(pos + 24)?,
                    filled_public: r.u32(pos + 28)?,
                    filled_private: r.u32(pos + 32)?,
                })
            })
            .collect::<Result<_, MarshalError>>()?;
        Ok(Self { hits })
    }
}

/// Result of a storage download.
///
/// Layout: header `(len, offset)`; raw bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageResult {
    /// File contents.
    pub data: Vec<u8>,
}

impl WireResult for StorageResult {
    const HEADER_LEN: usize = 8;

    fn tail_len(&self) -> usize {
        self.data.len()
    }

    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError> {
        let offset = w.append(&self.data)?;
        w.put_array(0, self.data.len(), offset as usize)
    }

    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError> {
        let (len, offset) = r.array(0)?;
        Ok(Self {
            data: r.bytes(offset, len)?.to_vec(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
