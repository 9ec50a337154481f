//! Push-protocol framing.
//!
//! A frame is a decimal opcode followed by a payload, usually JSON:
//! `0{"pingInterval":25000}`, `2`, `42["comment:new",{...}]`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::errors::{RealtimeError, Result};

/// Handshake; payload carries the keepalive interval.
pub const OPCODE_OPEN: u64 = 0;

/// Keepalive ping.
pub const OPCODE_PING: u64 = 2;

/// Event; payload is `[name, data]`.
pub const OPCODE_EVENT: u64 = 42;

/// Literal keepalive frame.
pub const KEEPALIVE_FRAME: &str = "2";

/// A decoded frame borrowing from the raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Leading decimal number, 0 if there is none.
    pub opcode: u64,
    /// Everything after the opcode digits.
    pub payload: &'a [u8],
}

/// Split a raw frame into opcode and payload.
///
/// The opcode is the maximal run of leading ASCII digits. Without leading
/// digits the opcode is 0 and the payload is the whole input. A digit run
/// too long for `u64` also yields opcode 0.
pub fn decode(raw: &[u8]) -> Frame<'_> {
    let digits = raw.iter().take_while(|b| b.is_ascii_digit()).count();
    let opcode = std::str::from_utf8(&raw[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    Frame {
        opcode,
        payload: &raw[digits..],
    }
}

/// Subscribe frame for a feed: `42["subscribe",{"timeline":[feed]}]`.
pub fn subscribe_frame(feed_handle: &str) -> String {
    format!(
        "{OPCODE_EVENT}{}",
        json!(["subscribe", {"timeline": [feed_handle]}])
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPayload {
    ping_interval: u64,
}

/// Keepalive interval announced by a handshake payload.
pub fn parse_open(payload: &[u8]) -> Result<Duration> {
    let open: OpenPayload = serde_json::from_slice(payload)
        .map_err(|e| RealtimeError::Decode(format!("handshake payload: {e}")))?;
    Ok(Duration::from_millis(open.ping_interval))
}

/// Event name and data of an event payload.
///
/// Elements past the second are ignored.
pub fn parse_event(payload: &[u8]) -> Result<(String, Value)> {
    let items: Vec<Value> = serde_json::from_slice(payload)
        .map_err(|e| RealtimeError::Decode(format!("event payload: {e}")))?;
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(Value::String(name)), Some(data)) => Ok((name, data)),
        _ => Err(RealtimeError::Decode(
            "event payload is not [name, data]".to_string(),
        )),
    }
}
