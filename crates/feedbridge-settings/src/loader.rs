//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BridgeSettings::default()`]
//! 2. If `~/.feedbridge/settings.json` exists, deep-merge it over the defaults
//! 3. Apply `FEEDBRIDGE_*` environment overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{BridgeSettings, LogFormat};

/// Directory holding the settings file and, by default, the database.
pub fn settings_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".feedbridge")
}

/// Path of the default settings file.
pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BridgeSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields the defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<BridgeSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Load defaults merged with the file at `path`, without env overrides.
pub fn load_file(path: &Path) -> Result<BridgeSettings> {
    let defaults = serde_json::to_value(BridgeSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Resolve the configured database path.
///
/// Absolute paths are used as-is; relative ones live under [`settings_dir`].
pub fn resolve_db_path(settings: &BridgeSettings) -> PathBuf {
    let configured = PathBuf::from(&settings.storage.db_path);
    if configured.is_absolute() {
        configured
    } else {
        settings_dir().join(configured)
    }
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut BridgeSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Empty values are ignored; values that fail range-checked parsing are
/// logged and ignored.
pub fn apply_overrides(settings: &mut BridgeSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let read_u64 = |name: &str, min: u64, max: u64| {
        let val = read_string(name)?;
        let parsed = parse_u64_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        parsed
    };

    // ── Backend ─────────────────────────────────────────────────────
    if let Some(v) = read_string("FEEDBRIDGE_API_HOST") {
        settings.backend.host = v;
    }
    if let Some(v) = read_string("FEEDBRIDGE_USER_AGENT") {
        settings.backend.user_agent = Some(v);
    }
    if let Some(v) = read_u64("FEEDBRIDGE_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.backend.request_timeout_ms = v;
    }

    // ── Telegram ────────────────────────────────────────────────────
    if let Some(v) = read_string("FEEDBRIDGE_BOT_TOKEN") {
        settings.telegram.bot_token = v;
    }
    if let Some(v) = read_u64("FEEDBRIDGE_POLL_TIMEOUT_SECS", 0, 600) {
        settings.telegram.poll_timeout_secs = v;
    }

    // ── Realtime ────────────────────────────────────────────────────
    if let Some(v) = read_string("FEEDBRIDGE_PUSH_URL") {
        settings.realtime.push_base_url = Some(v);
    }
    if let Some(v) = read_u64("FEEDBRIDGE_RECONNECT_BACKOFF_MS", 10, 3_600_000) {
        settings.realtime.reconnect_backoff_ms = v;
    }
    if let Some(v) = read_u64("FEEDBRIDGE_DEDUP_CAPACITY", 1, 10_000_000) {
        settings.realtime.dedup_capacity = v as usize;
    }

    // ── Storage / logging / metrics ─────────────────────────────────
    if let Some(v) = read_string("FEEDBRIDGE_DB_PATH") {
        settings.storage.db_path = v;
    }
    if let Some(v) = read_string("FEEDBRIDGE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_string("FEEDBRIDGE_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "FEEDBRIDGE_LOG_FORMAT", value = %v, "unknown log format, ignoring"),
        }
    }
    if let Some(v) = read_string("FEEDBRIDGE_METRICS_LISTEN") {
        settings.metrics.listen = Some(v);
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s.backend.host, "freefeed.net");
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"backend":{"host":"example.org"},"telegram":{"botToken":"123:abc"},"logging":null}"#,
        )
        .unwrap();
        let s = load_file(&path).unwrap();
        assert_eq!(s.backend.host, "example.org");
        assert_eq!(s.backend.request_timeout_ms, 30_000);
        assert_eq!(s.telegram.bot_token, "123:abc");
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn deep_merge_rules() {
        let target = serde_json::json!({"a": {"x": 1, "y": 2}, "list": [1, 2], "keep": true});
        let source = serde_json::json!({"a": {"y": 3}, "list": [9], "keep": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"]["x"], 1);
        assert_eq!(merged["a"]["y"], 3);
        assert_eq!(merged["list"], serde_json::json!([9]));
        assert_eq!(merged["keep"], true);
    }

    #[test]
    fn overrides_apply() {
        let mut s = BridgeSettings::default();
        apply_overrides(
            &mut s,
            lookup(&[
                ("FEEDBRIDGE_API_HOST", "candy.freefeed.net"),
                ("FEEDBRIDGE_BOT_TOKEN", "42:xyz"),
                ("FEEDBRIDGE_RECONNECT_BACKOFF_MS", "2500"),
                ("FEEDBRIDGE_DEDUP_CAPACITY", "64"),
                ("FEEDBRIDGE_LOG_FORMAT", "JSON"),
                ("FEEDBRIDGE_METRICS_LISTEN", "127.0.0.1:9100"),
            ]),
        );
        assert_eq!(s.backend.host, "candy.freefeed.net");
        assert_eq!(s.telegram.bot_token, "42:xyz");
        assert_eq!(s.realtime.reconnect_backoff_ms, 2500);
        assert_eq!(s.realtime.dedup_capacity, 64);
        assert_eq!(s.logging.format, LogFormat::Json);
        assert_eq!(s.metrics.listen.as_deref(), Some("127.0.0.1:9100"));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut s = BridgeSettings::default();
        apply_overrides(
            &mut s,
            lookup(&[
                ("FEEDBRIDGE_RECONNECT_BACKOFF_MS", "soon"),
                ("FEEDBRIDGE_DEDUP_CAPACITY", "0"),
                ("FEEDBRIDGE_API_HOST", ""),
                ("FEEDBRIDGE_LOG_FORMAT", "xml"),
            ]),
        );
        assert_eq!(s.realtime.reconnect_backoff_ms, 10_000);
        assert_eq!(s.realtime.dedup_capacity, 1000);
        assert_eq!(s.backend.host, "freefeed.net");
        assert_eq!(s.logging.format, LogFormat::Compact);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("10", 10, 20), Some(10));
        assert_eq!(parse_u64_range(" 20 ", 10, 20), Some(20));
        assert_eq!(parse_u64_range("21", 10, 20), None);
        assert_eq!(parse_u64_range("-1", 0, 20), None);
    }

    #[test]
    fn resolve_db_path_relative_and_absolute() {
        let mut s = BridgeSettings::default();
        assert!(resolve_db_path(&s).ends_with(".feedbridge/bridge.db"));
        s.storage.db_path = "/var/lib/feedbridge/db.sqlite".into();
        assert_eq!(
            resolve_db_path(&s),
            PathBuf::from("/var/lib/feedbridge/db.sqlite")
        );
    }
}
