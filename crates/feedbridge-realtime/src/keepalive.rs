//! Keepalive ticker for a push connection.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::codec::KEEPALIVE_FRAME;

/// Shortest accepted keepalive interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Why the keepalive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveResult {
    /// The connection-scoped token was cancelled.
    Cancelled,
    /// The socket writer is gone.
    WriterClosed,
}

/// Queue a keepalive frame on `out` every `interval` until cancelled.
///
/// The first frame goes out one interval after start. A full writer queue
/// skips that tick.
pub async fn run_keepalive(
    out: mpsc::Sender<Message>,
    interval: Duration,
    cancel: CancellationToken,
) -> KeepaliveResult {
    let interval = interval.max(MIN_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return KeepaliveResult::Cancelled,
            _ = ticker.tick() => {
                match out.try_send(Message::text(KEEPALIVE_FRAME.to_string())) {
                    Ok(()) => trace!("keepalive queued"),
                    Err(TrySendError::Full(_)) => debug!("writer busy, skipping keepalive"),
                    Err(TrySendError::Closed(_)) => return KeepaliveResult::WriterClosed,
                }
            }
        }
    }
}
