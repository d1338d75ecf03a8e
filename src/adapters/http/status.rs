//! Status and health endpoints.

use std::ffi::OsString;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::application::SubscriptionManager;
use crate::domain::foundation::ChannelName;

#[derive(Clone)]
pub struct StatusState {
    pub manager: Arc<SubscriptionManager>,
    pub host: String,
    pub port: u16,
}

impl StatusState {
    pub fn new(manager: Arc<SubscriptionManager>, host: impl Into<String>, port: u16) -> Self {
        Self {
            manager,
            host: host.into(),
            port,
        }
    }
}

/// Relay status document.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub host: String,
    pub port: u16,
    pub bridging: bool,
    pub connections: usize,
    pub channels: Vec<ChannelName>,
}

/// GET / - Relay status
pub async fn index(State(state): State<StatusState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        host: state.host.clone(),
        port: state.port,
        bridging: state.manager.bridging_enabled(),
        connections: state.manager.registry().connection_count().await,
        channels: state.manager.active_channels().await,
    })
}

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

/// Host name for the status page: the OS hostname, or `localhost` when it is
/// empty or not valid UTF-8.
pub fn local_hostname() -> String {
    hostname_or_default(gethostname::gethostname())
}

fn hostname_or_default(name: OsString) -> String {
    match name.into_string() {
        Ok(name) if !name.trim().is_empty() => name,
        _ => DEFAULT_HOST.to_string(),
    }
}

const DEFAULT_HOST: &str = "localhost";

pub fn status_routes(state: StatusState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}
