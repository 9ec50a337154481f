//! # feedbridge-bot
//!
//! The conversational side of the bridge. [`CommandHandler`] turns chat
//! messages into session transitions and backend calls; [`telegram`] moves
//! messages between the Bot API and the handler and drains the outbox.

#![deny(unsafe_code)]

pub mod commands;
pub mod errors;
pub mod handler;
pub mod messages;
pub mod telegram;

pub use commands::{Command, Inbound};
pub use errors::{Result, TransportError};
pub use handler::{Action, CommandHandler, classify};
pub use telegram::{TelegramClient, run_delivery, run_polling};
