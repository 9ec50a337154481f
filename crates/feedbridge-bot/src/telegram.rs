//! Telegram Bot API transport: long polling in, `sendMessage` out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use feedbridge_core::{Notification, OutboxReceiver, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::Inbound;
use crate::errors::{Result, TransportError};
use crate::handler::CommandHandler;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Timeout of ordinary requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added to the long-poll timeout for the HTTP request itself.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Pause after a failed `getUpdates`.
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// `{ok, result, description, error_code}` envelope of every response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

/// One entry of `getUpdates`.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New incoming message, if this update is one.
    #[serde(default)]
    pub message: Option<TgMessage>,
}

/// Sender of a message.
#[derive(Clone, Debug, Deserialize)]
pub struct TgUser {
    /// User id.
    pub id: i64,
}

/// Chat a message belongs to.
#[derive(Clone, Debug, Deserialize)]
pub struct TgChat {
    /// Chat id.
    pub id: i64,
}

/// A chat message.
#[derive(Clone, Debug, Deserialize)]
pub struct TgMessage {
    /// Message id within the chat.
    pub message_id: i64,
    /// Sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<TgUser>,
    /// Chat.
    pub chat: TgChat,
    /// Text, absent for media.
    #[serde(default)]
    pub text: Option<String>,
    /// Message this one replies to.
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

impl TgMessage {
    /// Transport-independent view. `None` for messages without a sender.
    pub fn to_inbound(&self) -> Option<Inbound> {
        let from = self.from.as_ref()?;
        Some(Inbound {
            user_id: UserId::new(from.id),
            text: self.text.clone().filter(|t| !t.is_empty()),
            reply_to_text: self
                .reply_to_message
                .as_ref()
                .and_then(|m| m.text.clone()),
        })
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disable_web_page_preview: bool,
}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Client for `bot_token` at `api_base` (e.g. [`DEFAULT_API_BASE`]).
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: format!("{}/bot{bot_token}", api_base.trim_end_matches('/')),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;
        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                ..
            } => Err(TransportError::Api {
                code: error_code.unwrap_or(status.as_u16()),
                description: description.unwrap_or_else(|| status.to_string()),
            }),
        }
    }

    /// Updates after `offset`, waiting up to `timeout` on the server.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let response = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
            ])
            .timeout(timeout + POLL_GRACE)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Deliver one notification.
    pub async fn send_message(&self, notification: &Notification) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(&SendMessage {
                chat_id: notification.user_id.get(),
                text: &notification.text,
                disable_web_page_preview: notification.disable_preview,
            })
            .send()
            .await?;
        let _sent: serde_json::Value = Self::decode(response).await?;
        Ok(())
    }
}

/// Long-poll for messages and hand each to `handler` on its own task.
pub async fn run_polling(
    client: &TelegramClient,
    handler: Arc<CommandHandler>,
    poll_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut offset = 0;
    info!("polling for messages");
    loop {
        let updates = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = client.get_updates(offset, poll_timeout) => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(inbound) = update.message.as_ref().and_then(TgMessage::to_inbound)
                    else {
                        debug!(update_id = update.update_id, "skipping update");
                        continue;
                    };
                    let handler = handler.clone();
                    let _ = tokio::spawn(async move { handler.handle(inbound).await });
                }
            }
            Err(e) => {
                warn!(error = %e, category = %e.category(), "getUpdates failed");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }
    info!("polling stopped");
}

/// Drain the outbox into `sendMessage` until every producer is gone or
/// `cancel` fires. Notifications already queued when `cancel` fires are still
/// sent. Returns the number of delivered messages.
pub async fn run_delivery(
    client: &TelegramClient,
    mut outbox: OutboxReceiver,
    cancel: CancellationToken,
) -> u64 {
    let mut delivered = 0;
    loop {
        let notification = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = outbox.recv() => match next {
                Some(n) => n,
                None => break,
            },
        };
        delivered += deliver(client, &notification).await;
    }
    while let Some(notification) = outbox.try_recv() {
        delivered += deliver(client, &notification).await;
    }
    debug!(delivered, "delivery stopped");
    delivered
}

async fn deliver(client: &TelegramClient, notification: &Notification) -> u64 {
    match client.send_message(notification).await {
        Ok(()) => 1,
        Err(e) => {
            warn!(
                user_id = %notification.user_id,
                error = %e,
                category = %e.category(),
                "delivery failed"
            );
            0
        }
    }
}
