//! # feedbridge
//!
//! Bridge binary: loads settings, opens the session store, restores push
//! sessions for every authorized user and serves chat commands until Ctrl-C.

#![deny(unsafe_code)]

mod app;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use feedbridge_settings::{BridgeSettings, LogFormat};

/// Realtime notification bridge between a social feed and Telegram.
#[derive(Parser, Debug)]
#[command(name = "feedbridge", about = "Forward direct messages from a social feed to Telegram")]
struct Cli {
    /// Settings file (default: `~/.feedbridge/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Telegram bot token (overrides settings).
    #[arg(long)]
    token: Option<String>,

    /// Backend API host (overrides settings).
    #[arg(long)]
    api_host: Option<String>,

    /// Session database path (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<BridgeSettings> {
        let mut settings = match &self.config {
            Some(path) => feedbridge_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => feedbridge_settings::load_settings().context("Failed to load settings")?,
        };
        self.apply(&mut settings);
        Ok(settings)
    }

    fn apply(&self, settings: &mut BridgeSettings) {
        if let Some(token) = &self.token {
            settings.telegram.bot_token.clone_from(token);
        }
        if let Some(host) = &self.api_host {
            settings.backend.host.clone_from(host);
        }
        if let Some(path) = &self.db_path {
            settings.storage.db_path = path.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    match settings.logging.format {
        LogFormat::Compact => feedbridge_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => feedbridge_core::logging::init_json_subscriber(&settings.logging.level),
    }

    settings.validate().context("Invalid settings")?;
    app::run(settings).await
}
