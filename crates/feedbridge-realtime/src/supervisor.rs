//! Per-user push connection supervisor.
//!
//! State machine: `Connecting → Subscribed → Disconnected → Connecting …`,
//! terminal `Closed`. The run loop is the only reader of the socket and the
//! only task that changes state. Writes go through a queue drained by a
//! writer task, shared with the keepalive ticker. Cancellation is observed
//! inside every wait (connect, backoff, read, event handling), so stopping
//! never waits for a network timeout or a slow handler. On cancel the read
//! loop queues a close frame and the writer shuts the socket.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use feedbridge_core::{Credential, ErrorCategory, UserId};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::Mutex;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::codec::{self, OPCODE_EVENT, OPCODE_OPEN};
use crate::keepalive::run_keepalive;
use crate::metrics::{
    PUSH_CONNECT_ATTEMPTS_TOTAL, PUSH_CONNECT_FAILURES_TOTAL, PUSH_DECODE_FAILURES_TOTAL,
    PUSH_DISCONNECTS_TOTAL, PUSH_EVENTS_TOTAL,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default delay between failed connect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(10);

/// Default pause before reconnecting after an established socket drops.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Writer queue depth per connection.
const WRITE_QUEUE: usize = 16;

/// How long the writer may take to flush after the read loop ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Characters left unescaped in the token query parameter.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Receives decoded push events, in socket order per user.
#[async_trait]
pub trait PushEventHandler: Send + Sync {
    /// Handle one `[name, data]` event from `user_id`'s socket.
    async fn handle_event(&self, user_id: UserId, name: &str, data: Value);
}

/// Settings shared by every supervisor.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Push endpoint base, e.g. `wss://freefeed.net`.
    pub push_base_url: String,
    /// Delay after a failed connect attempt.
    pub reconnect_backoff: Duration,
    /// Delay after a connected socket is lost.
    pub reconnect_delay: Duration,
}

impl SupervisorConfig {
    /// Config for `base` with the default delays.
    pub fn new(push_base_url: impl Into<String>) -> Self {
        Self {
            push_base_url: push_base_url.into(),
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Socket URL for a credential.
pub fn push_url(base: &str, access_token: &str) -> String {
    format!(
        "{}/socket.io/?token={}&EIO=3&transport=websocket",
        base.trim_end_matches('/'),
        utf8_percent_encode(access_token, QUERY_VALUE)
    )
}

/// Supervisor lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the socket, or waiting out the backoff before the next try.
    #[default]
    Connecting,
    /// Connected with the subscribe frame sent; reading frames.
    Subscribed,
    /// The connection was lost; about to reconnect.
    Disconnected,
    /// Stopped for good.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        })
    }
}

/// Observable supervisor state, shared with the registry.
#[derive(Debug, Default)]
pub struct SupervisorStatus {
    state: Mutex<ConnectionState>,
    connect_attempts: AtomicU32,
    events: AtomicU64,
}

impl SupervisorStatus {
    /// Fresh status in [`ConnectionState::Connecting`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Connect attempts made so far.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Events dispatched so far.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    fn set(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }
}

/// One user's push connection.
pub struct Supervisor {
    user_id: UserId,
    credential: Credential,
    config: Arc<SupervisorConfig>,
    handler: Arc<dyn PushEventHandler>,
    status: Arc<SupervisorStatus>,
}

enum ConnectionEnd {
    Cancelled,
    Lost,
}

impl Supervisor {
    /// Supervisor for an authorized user. Nothing happens until [`Supervisor::run`].
    pub fn new(
        user_id: UserId,
        credential: Credential,
        config: Arc<SupervisorConfig>,
        handler: Arc<dyn PushEventHandler>,
        status: Arc<SupervisorStatus>,
    ) -> Self {
        Self {
            user_id,
            credential,
            config,
            handler,
            status,
        }
    }

    /// Connect, read and reconnect until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let span = info_span!("push_session", user_id = %self.user_id);
        self.run_loop(cancel).instrument(span).await;
    }

    async fn run_loop(self, cancel: CancellationToken) {
        let url = push_url(&self.config.push_base_url, &self.credential.access_token);
        let backoff = self.config.reconnect_backoff;

        while !cancel.is_cancelled() {
            self.status.set(ConnectionState::Connecting);
            let _ = self.status.connect_attempts.fetch_add(1, Ordering::SeqCst);
            counter!(PUSH_CONNECT_ATTEMPTS_TOTAL).increment(1);

            let connected = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = connect_async(url.as_str()) => result,
            };

            match connected {
                Ok((ws, _)) => {
                    info!(feed = %self.credential.feed_handle, "push socket connected");
                    match self.run_connection(ws, &cancel).await {
                        ConnectionEnd::Cancelled => break,
                        ConnectionEnd::Lost => {
                            counter!(PUSH_DISCONNECTS_TOTAL).increment(1);
                            self.status.set(ConnectionState::Disconnected);
                            // A server that accepts and drops at once would
                            // otherwise be redialed in a tight loop.
                            tokio::select! {
                                biased;
                                () = cancel.cancelled() => break,
                                () = tokio::time::sleep(self.config.reconnect_delay) => {}
                            }
                        }
                    }
                }
                Err(e) => {
                    counter!(PUSH_CONNECT_FAILURES_TOTAL).increment(1);
                    warn!(
                        error = %e,
                        category = %ErrorCategory::TransientNetwork,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "push connect failed"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        self.status.set(ConnectionState::Closed);
        info!("push session closed");
    }

    /// Serve one established socket until it drops or `cancel` fires.
    async fn run_connection(&self, ws: WsStream, cancel: &CancellationToken) -> ConnectionEnd {
        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(WRITE_QUEUE);

        let mut writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    debug!(error = %e, "push socket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Scoped to this socket; cancelled before the writer is drained.
        let conn_cancel = cancel.child_token();
        let mut keepalive: Option<CancellationToken> = None;

        let subscribe = codec::subscribe_frame(&self.credential.feed_handle);
        let end = if out_tx.send(Message::text(subscribe)).await.is_err() {
            ConnectionEnd::Lost
        } else {
            self.status.set(ConnectionState::Subscribed);
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    frame = stream.next() => Some(frame),
                };
                let Some(frame) = next else {
                    break close_on_cancel(&out_tx);
                };
                let data = match frame {
                    Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => msg.into_data(),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "push socket closed by server");
                        break ConnectionEnd::Lost;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(
                            error = %e,
                            category = %ErrorCategory::TransientNetwork,
                            "push socket read failed"
                        );
                        break ConnectionEnd::Lost;
                    }
                    None => {
                        debug!("push socket stream ended");
                        break ConnectionEnd::Lost;
                    }
                };

                // The handler may wait on the backend; a stop must not.
                let cancelled = tokio::select! {
                    biased;
                    () = cancel.cancelled() => true,
                    () = self.on_frame(&data, &out_tx, &conn_cancel, &mut keepalive) => false,
                };
                if cancelled {
                    debug!("stopped while handling a frame");
                    break close_on_cancel(&out_tx);
                }
            }
        };

        conn_cancel.cancel();
        drop(out_tx);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }
        end
    }

    async fn on_frame(
        &self,
        raw: &[u8],
        out: &mpsc::Sender<Message>,
        conn_cancel: &CancellationToken,
        keepalive: &mut Option<CancellationToken>,
    ) {
        let frame = codec::decode(raw);
        match frame.opcode {
            OPCODE_OPEN => match codec::parse_open(frame.payload) {
                Ok(interval) if !interval.is_zero() => {
                    if let Some(previous) = keepalive.take() {
                        previous.cancel();
                    }
                    let token = conn_cancel.child_token();
                    *keepalive = Some(token.clone());
                    debug!(?interval, "starting keepalive");
                    let _ = tokio::spawn(run_keepalive(out.clone(), interval, token));
                }
                Ok(_) => debug!("handshake without keepalive interval"),
                Err(e) => {
                    counter!(PUSH_DECODE_FAILURES_TOTAL).increment(1);
                    warn!(error = %e, category = %e.category(), "ignoring handshake");
                }
            },
            OPCODE_EVENT => match codec::parse_event(frame.payload) {
                Ok((name, data)) => {
                    let _ = self.status.events.fetch_add(1, Ordering::Relaxed);
                    counter!(PUSH_EVENTS_TOTAL, "event" => name.clone()).increment(1);
                    self.handler.handle_event(self.user_id, &name, data).await;
                }
                Err(e) => {
                    counter!(PUSH_DECODE_FAILURES_TOTAL).increment(1);
                    warn!(error = %e, category = %e.category(), "dropping push event");
                }
            },
            other => trace!(opcode = other, "ignoring frame"),
        }
    }
}

/// Queue a close frame for the writer and report cancellation.
fn close_on_cancel(out: &mpsc::Sender<Message>) -> ConnectionEnd {
    let _ = out.try_send(Message::Close(None));
    ConnectionEnd::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_url_escapes_token() {
        assert_eq!(
            push_url("wss://freefeed.net", "a b/c+d"),
            "wss://freefeed.net/socket.io/?token=a%20b%2Fc%2Bd&EIO=3&transport=websocket"
        );
    }

    #[test]
    fn push_url_trims_trailing_slash() {
        assert_eq!(
            push_url("ws://127.0.0.1:9000/", "tok.en-1_~"),
            "ws://127.0.0.1:9000/socket.io/?token=tok.en-1_~&EIO=3&transport=websocket"
        );
    }

    #[test]
    fn status_starts_connecting() {
        let status = SupervisorStatus::new();
        assert_eq!(status.state(), ConnectionState::Connecting);
        assert_eq!(status.connect_attempts(), 0);
        assert_eq!(status.events(), 0);
    }

    #[test]
    fn state_display() {
        assert_eq!(ConnectionState::Subscribed.to_string(), "subscribed");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn config_default_backoff() {
        let config = SupervisorConfig::new("wss://example.org");
        assert_eq!(config.reconnect_backoff, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
    }
}
