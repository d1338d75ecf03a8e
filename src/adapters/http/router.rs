//! Assembles the complete HTTP surface of the relay.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use http::HeaderValue;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::application::{EventBroadcaster, SubscriptionManager};
use crate::config::ServerConfig;

use super::publish::{publish_routes, PublishState};
use super::status::{status_routes, StatusState};

/// Static asset directories served below `server.static_dir`.
const STATIC_MOUNTS: &[&str] = &["js", "css", "images"];

/// Shared handles the router is built from.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SubscriptionManager>,
    pub broadcaster: Arc<EventBroadcaster>,
    /// Host name reported by the status page.
    pub host: String,
}

/// Create the router: WebSocket, publish, status and optional static assets.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .merge(websocket_router().with_state(WebSocketState::new(state.manager.clone())))
        .merge(publish_routes(
            PublishState::new(state.broadcaster.clone()),
            config.request_timeout(),
        ))
        .merge(status_routes(StatusState::new(
            state.manager.clone(),
            state.host.clone(),
            config.port,
        )));

    if let Some(dir) = &config.static_dir {
        router = mount_static(router, dir);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins_list()))
}

fn mount_static(mut router: Router, dir: &Path) -> Router {
    for mount in STATIC_MOUNTS {
        router = router.nest_service(&format!("/{}", mount), ServeDir::new(dir.join(mount)));
    }
    tracing::debug!(dir = %dir.display(), "Serving static assets");
    router
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
