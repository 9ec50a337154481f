//! # feedbridge-realtime
//!
//! The push side of the bridge:
//!
//! - [`codec`]: frame decoding and the subscribe/keepalive frames
//! - [`supervisor`]: one reconnecting socket per authorized user
//! - [`registry`]: start/stop of supervisors, at most one per user
//! - [`dedup`]: bounded cache suppressing re-delivered comments
//! - [`router`] and [`projector`]: event filtering and notification text

#![deny(unsafe_code)]

pub mod codec;
pub mod dedup;
pub mod errors;
pub mod events;
pub mod keepalive;
pub mod metrics;
pub mod projector;
pub mod registry;
pub mod router;
pub mod supervisor;

pub use dedup::{DedupCache, DedupKey, EventKind};
pub use errors::{RealtimeError, Result};
pub use events::PushEvent;
pub use registry::SessionRegistry;
pub use router::{EventRouter, RouteOutcome};
pub use supervisor::{
    ConnectionState, PushEventHandler, Supervisor, SupervisorConfig, SupervisorStatus, push_url,
};
