//! Settings schema.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it overrides.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Social-feed backend.
    pub backend: BackendSettings,
    /// Chat transport.
    pub telegram: TelegramSettings,
    /// Push connections, deduplication and the outbound queue.
    pub realtime: RealtimeSettings,
    /// Persistent session storage.
    pub storage: StorageSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Metrics exporter.
    pub metrics: MetricsSettings,
}

/// Backend REST API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Backend host name, used for API calls, push sockets and permalinks.
    pub host: String,
    /// `User-Agent` sent with API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: "freefeed.net".to_string(),
            user_agent: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl BackendSettings {
    /// Base URL of the REST API.
    pub fn api_base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

/// Telegram Bot API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    /// Bot token issued by `@BotFather`. Required to run the bridge.
    pub bot_token: String,
    /// Bot API base URL.
    pub api_base: String,
    /// Server-side long-poll timeout in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 60,
        }
    }
}

/// Realtime bridge settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// Push endpoint base URL. Derived from the backend host when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_base_url: Option<String>,
    /// Delay between reconnect attempts in milliseconds.
    pub reconnect_backoff_ms: u64,
    /// Total dedup cache entries shared by all users.
    pub dedup_capacity: usize,
    /// Undelivered outbound messages held before new ones are dropped.
    pub outbox_capacity: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            push_base_url: None,
            reconnect_backoff_ms: 10_000,
            dedup_capacity: 1000,
            outbox_capacity: 1024,
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Path to the `SQLite` database. Relative paths resolve against
    /// `~/.feedbridge`.
    pub db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "bridge.db".to_string(),
        }
    }
}

/// Log format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable compact lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Metrics settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSettings {
    /// Socket address for the Prometheus scrape endpoint. Disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}

impl BridgeSettings {
    /// Push endpoint base URL, falling back to `wss://<backend host>`.
    pub fn push_base_url(&self) -> String {
        self.realtime
            .push_base_url
            .clone()
            .unwrap_or_else(|| format!("wss://{}", self.backend.host))
    }
}
