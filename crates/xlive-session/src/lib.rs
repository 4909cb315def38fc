//! # xlive-session
//!
//! Session lifecycle for titles that speak the live session API.
//!
//! - [`state`]: the [`SessionState`] machine
//! - [`slots`]: public and private [`SlotCounts`]
//! - [`session`]: one [`Session`] with membership and arbitration grouping
//! - [`manager`]: the [`SessionManager`] registry, mirroring changes to the
//!   backend when a session uses online features
//! - [`calls`]: [`CallHandler`] running decoded calls and writing results
//!
//! Local state is authoritative for offline-only sessions. For the others,
//! create, join and modify commit locally only after the backend accepts
//! them; leave, migrate and delete commit locally first and report backend
//! failures in the log.

#![deny(unsafe_code)]

pub mod calls;
pub mod manager;
pub mod session;
pub mod slots;
pub mod state;

pub use calls::{CallHandler, CallResult};
pub use manager::{ManagerConfig, SessionInfo, SessionManager};
pub use session::{MachineGroup, Session};
pub use slots::SlotCounts;
pub use state::SessionState;
