//! Startup wiring and shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use feedbridge_backend::{Backend, BackendClient, ClientConfig};
use feedbridge_bot::{CommandHandler, TelegramClient, run_delivery, run_polling};
use feedbridge_core::Outbox;
use feedbridge_realtime::{DedupCache, EventRouter, SessionRegistry, SupervisorConfig};
use feedbridge_session::sqlite::ConnectionConfig;
use feedbridge_session::{SqliteStateStore, StateStore};
use feedbridge_settings::BridgeSettings;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long supervisors and the delivery loop get to stop.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn install_metrics(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid metrics listen address: {listen}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install metrics exporter")?;
    info!(%addr, "prometheus exporter listening");
    Ok(())
}

/// Run the bridge until Ctrl-C.
pub async fn run(settings: BridgeSettings) -> Result<()> {
    if let Some(listen) = &settings.metrics.listen {
        install_metrics(listen)?;
    }

    let db_path = feedbridge_settings::resolve_db_path(&settings);
    let store: Arc<dyn StateStore> = Arc::new(
        SqliteStateStore::open(&db_path, &ConnectionConfig::default())
            .context("Failed to open session store")?,
    );

    let backend: Arc<dyn Backend> = Arc::new(
        BackendClient::new(&ClientConfig {
            base_url: settings.backend.api_base_url(),
            user_agent: settings.backend.user_agent.clone(),
            timeout: Duration::from_millis(settings.backend.request_timeout_ms),
        })
        .context("Failed to build backend client")?,
    );

    let host = settings.backend.host.clone();
    let (outbox, outbox_rx) = Outbox::channel(settings.realtime.outbox_capacity);

    let router = Arc::new(EventRouter::new(
        store.clone(),
        backend.clone(),
        Arc::new(DedupCache::new(settings.realtime.dedup_capacity)),
        outbox.clone(),
        host.clone(),
    ));
    let mut supervisor_config = SupervisorConfig::new(settings.push_base_url());
    supervisor_config.reconnect_backoff =
        Duration::from_millis(settings.realtime.reconnect_backoff_ms);
    let registry = Arc::new(SessionRegistry::new(supervisor_config, router));
    let restored = registry
        .start_all(store.as_ref())
        .context("Failed to load authorized sessions")?;

    let handler = Arc::new(CommandHandler::new(
        store,
        backend,
        registry.clone(),
        outbox.clone(),
        host,
    ));

    let telegram = TelegramClient::new(&settings.telegram.api_base, &settings.telegram.bot_token)
        .context("Failed to build Telegram client")?;
    let shutdown = CancellationToken::new();
    // Stopped after every producer, so late notifications are still drained.
    let stop_delivery = CancellationToken::new();

    let delivery = tokio::spawn({
        let telegram = telegram.clone();
        let cancel = stop_delivery.clone();
        async move { run_delivery(&telegram, outbox_rx, cancel).await }
    });
    let poll_timeout = Duration::from_secs(settings.telegram.poll_timeout_secs);
    let polling = tokio::spawn({
        let cancel = shutdown.clone();
        async move { run_polling(&telegram, handler, poll_timeout, cancel).await }
    });

    info!(
        backend = %settings.backend.host,
        db = %db_path.display(),
        restored,
        "feedbridge running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("shutting down");
    shutdown.cancel();
    let _ = polling.await;
    if !registry.shutdown(SHUTDOWN_TIMEOUT).await {
        warn!("some push sessions were aborted");
    }
    stop_delivery.cancel();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, delivery).await {
        Ok(Ok(delivered)) => info!(delivered, dropped = outbox.dropped(), "delivery stopped"),
        Ok(Err(e)) => warn!(error = %e, "delivery task failed"),
        Err(_) => warn!("delivery did not stop in time"),
    }

    info!("shutdown complete");
    Ok(())
}
