//! # feedbridge-core
//!
//! Shared vocabulary for the feedbridge crates:
//!
//! - **Identifiers**: [`UserId`], the chat-transport key every session hangs off
//! - **Domain model**: [`Credential`] (backend token + feed handle) and [`Post`]
//! - **Errors**: [`ErrorCategory`], the failure taxonomy every crate classifies into
//! - **Text**: short-body rendering, addressee lists, shortcodes
//! - **Outbox**: the multi-producer queue of outbound notifications
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod model;
pub mod outbox;
pub mod text;

pub use errors::ErrorCategory;
pub use ids::UserId;
pub use model::{Credential, Post};
pub use outbox::{Notification, Outbox, OutboxReceiver};
