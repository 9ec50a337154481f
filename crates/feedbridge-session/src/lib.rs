//! # feedbridge-session
//!
//! Per-user conversation state:
//!
//! - [`Session`] and [`Mode`]: persisted state and its pure transitions
//! - [`Turn`]: the default-reset rule applied to every inbound message
//! - [`StateStore`]: get/put contract, with [`SqliteStateStore`] and
//!   [`MemoryStateStore`] implementations
//! - [`PushControl`]: start/stop of a user's push connection

#![deny(unsafe_code)]

pub mod control;
pub mod errors;
pub mod sqlite;
pub mod state;
pub mod store;
pub mod turn;

pub use control::PushControl;
pub use errors::{Result, StoreError, TransitionError};
pub use sqlite::SqliteStateStore;
pub use state::{Mode, PendingReply, Session};
pub use store::{MemoryStateStore, StateStore};
pub use turn::{Continuation, Turn};
