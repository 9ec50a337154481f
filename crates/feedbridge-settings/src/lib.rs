//! # feedbridge-settings
//!
//! Configuration for the bridge, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`BridgeSettings::default()`]
//! 2. **Settings file**: `~/.feedbridge/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `FEEDBRIDGE_*` overrides (highest priority)
//!
//! Command-line flags of the binary are applied on top by the caller.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, resolve_db_path,
    settings_dir, settings_path,
};
pub use types::*;

impl BridgeSettings {
    /// Check the values the bridge cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "telegram.botToken is empty".to_string(),
            ));
        }
        if self.backend.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "backend.host is empty".to_string(),
            ));
        }
        Ok(())
    }
}
