//! JSON bodies exchanged with the coordination service.
//!
//! Every response type is `#[serde(default)]` so a missing or partial body
//! degrades to empty values instead of a parse failure.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xlive_core::{MacAddress, MachineId, SessionId, Xuid};

/// Peer registration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRegistration {
    /// Signed-in player.
    pub xuid: Xuid,
    /// Console identity.
    pub machine_id: MachineId,
    /// Address peers reach us at.
    pub host_address: Ipv4Addr,
    /// Link-layer address.
    pub mac_address: MacAddress,
}

/// Peer registration response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrationAck {
    /// Player the backend associated with this machine.
    pub xuid: Option<Xuid>,
}

/// What the backend knows about an address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeerRecord {
    /// Player registered at the address.
    pub xuid: Xuid,
    /// Session the peer hosts or is in.
    pub session_id: SessionId,
    /// Address.
    pub host_address: Option<Ipv4Addr>,
    /// Link-layer address.
    pub mac_address: MacAddress,
    /// Console identity.
    pub machine_id: MachineId,
}

/// A player slot as the backend reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionPlayer {
    /// Player.
    pub xuid: Xuid,
    /// Occupies a private slot.
    pub private: bool,
}

/// Session as the backend reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionDetails {
    /// Session.
    pub session_id: SessionId,
    /// Host player.
    pub host_xuid: Xuid,
    /// Host address.
    pub host_address: Option<Ipv4Addr>,
    /// Host link-layer address.
    pub mac_address: MacAddress,
    /// Raw session flags.
    pub flags: u32,
    /// Public slots.
    pub public_slots_count: u32,
    /// Private slots.
    pub private_slots_count: u32,
    /// Open public slots.
    pub open_public_slots_count: u32,
    /// Open private slots.
    pub open_private_slots_count: u32,
    /// Filled public slots.
    pub filled_public_slots_count: u32,
    /// Filled private slots.
    pub filled_private_slots_count: u32,
    /// Current players.
    pub players: Vec<SessionPlayer>,
}

/// Session creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreate {
    /// Locally allocated id.
    pub session_id: SessionId,
    /// Raw session flags.
    pub flags: u32,
    /// Public slots.
    pub public_slots_count: u32,
    /// Private slots.
    pub private_slots_count: u32,
    /// Hosting user's local slot.
    pub user_index: u32,
    /// Host player.
    pub xuid: Xuid,
    /// Host address.
    pub host_address: Ipv4Addr,
    /// Host link-layer address.
    pub mac_address: MacAddress,
    /// Host console.
    pub machine_id: MachineId,
}

/// Session modification request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionModify {
    /// New raw flags.
    pub flags: u32,
    /// Public slots.
    pub public_slots_count: u32,
    /// Private slots.
    pub private_slots_count: u32,
}

/// Join request: parallel lists of players and slot kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionJoin {
    /// Players.
    pub xuids: Vec<Xuid>,
    /// Whether each player takes a private slot.
    pub private_slots: Vec<bool>,
}

/// Leave request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLeave {
    /// Players.
    pub xuids: Vec<Xuid>,
}

/// Host migration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMigrate {
    /// New host player.
    pub xuid: Xuid,
    /// New host address.
    pub host_address: Ipv4Addr,
    /// New host link-layer address.
    pub mac_address: MacAddress,
    /// New host console.
    pub machine_id: MachineId,
}

/// Arbitration registration request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationRegister {
    /// Caller nonce.
    pub nonce: u64,
}

/// Players on one machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArbitrationMachine {
    /// Console.
    pub machine_id: MachineId,
    /// Players.
    pub xuids: Vec<Xuid>,
}

/// Arbitration roster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArbitrationRoster {
    /// Machines.
    pub machines: Vec<ArbitrationMachine>,
}

/// One search property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    /// Property id.
    pub id: u32,
    /// Value.
    pub value: u64,
}

/// Session search request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSearch {
    /// Matchmaking query id.
    pub search_index: u32,
    /// Result limit.
    pub results_count: u32,
    /// Property filters.
    pub properties: Vec<SearchFilter>,
}

/// QoS blob, base64 on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosBlob {
    /// Base64 payload.
    pub data: String,
}

/// Presence query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PresenceQuery {
    /// Players.
    pub xuids: Vec<Xuid>,
}

/// Presence as the backend reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresenceBody {
    /// Player.
    pub xuid: Xuid,
    /// Raw state bits.
    pub state: u32,
    /// Session the player is in.
    pub session_id: SessionId,
    /// Title.
    pub title_id: u32,
    /// Rich presence.
    pub rich_presence: String,
}

/// One leaderboard column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsColumn {
    /// Column id.
    pub id: u16,
    /// Value.
    pub value: u64,
}

/// Columns written to one view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsView {
    /// Leaderboard view.
    pub view_id: u32,
    /// Columns.
    pub columns: Vec<StatsColumn>,
}

/// Stats write request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsWrite {
    /// Player.
    pub xuid: Xuid,
    /// Views.
    pub views: Vec<StatsView>,
}

/// Stats read request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    /// Players.
    pub players: Vec<Xuid>,
    /// Views.
    pub view_ids: Vec<u32>,
}

/// One leaderboard row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsRow {
    /// Player.
    pub xuid: Xuid,
    /// View.
    pub view_id: u32,
    /// Rank within the view.
    pub rank: u32,
    /// Columns.
    pub columns: Vec<StatsColumn>,
}

/// Storage upload/download body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBlob {
    /// Base64 contents.
    pub data: String,
}

/// Storage enumeration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StorageQuery {
    /// Path prefix.
    pub prefix: String,
}

/// One stored file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageEntry {
    /// Path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification.
    pub modified: Option<DateTime<Utc>>,
}
