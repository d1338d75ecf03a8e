//! Notify Relay server binary.

use std::sync::Arc;

use notify_relay::adapters::{create_router, local_hostname, AppState, PgListenBridge};
use notify_relay::application::{ConnectionRegistry, EventBroadcaster, SubscriptionManager};
use notify_relay::config::{AppConfig, LogFormat, ServerConfig};
use notify_relay::ports::UpstreamBridge;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    config.apply_port_argument(std::env::args().nth(1).as_deref());
    config.validate()?;

    init_tracing(&config.server);

    let registry = Arc::new(ConnectionRegistry::new(config.relay.outbox_capacity));
    let broadcaster = EventBroadcaster::new_shared(registry.clone());

    let bridge: Option<Arc<dyn UpstreamBridge>> = match config.upstream.url() {
        Some(url) => Some(Arc::new(PgListenBridge::new(
            url.clone(),
            config.upstream.connect_timeout(),
        )) as Arc<dyn UpstreamBridge>),
        None => {
            tracing::warn!("No upstream database configured; LISTEN/NOTIFY bridging disabled");
            None
        }
    };

    let manager = Arc::new(SubscriptionManager::new(
        registry,
        bridge,
        broadcaster.clone(),
    ));

    let host = local_hostname();
    let app = create_router(
        AppState {
            manager: manager.clone(),
            broadcaster,
            host,
        },
        &config.server,
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        bridging = config.bridging_enabled(),
        outbox_capacity = config.relay.outbox_capacity,
        "Notify relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    tracing::info!("Notify relay stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT - initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM - initiating graceful shutdown"),
    }
}
