//! # xlive-backend
//!
//! Client for the coordination service that stands in for the online
//! service.
//!
//! - **Transport**: [`Transport`] capability with a blocking `reqwest`
//!   implementation; every exchange is bounded by a timeout
//! - **Client**: [`BackendClient`] classifies each exchange into an
//!   [`Outcome`] and exposes typed session, QoS, presence, stats and storage
//!   operations
//! - **Cache**: [`BackendCache`], shared by `Arc`, memoizes address, QoS and
//!   session-details lookups and is only ever invalidated in bulk
//! - **Persistence**: [`KeyValueStore`] for the local friends list
//! - **Tasks**: [`BackgroundTask`] runs presence refresh and QoS publication
//!   off the calling thread

#![deny(unsafe_code)]

pub mod cache;
pub mod client;
pub mod errors;
pub mod identity;
pub mod presence;
pub mod qos;
pub mod sessions;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::BackendCache;
pub use client::{BackendClient, ClientConfig, Outcome, Response};
pub use errors::{StoreError, TransportError};
pub use identity::{NetworkIdentity, StaticIdentity};
pub use presence::merge_presence;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tasks::{BackgroundTask, TaskOutcome};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
