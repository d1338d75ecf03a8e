//! HTTP routes for the publish endpoint.

use std::time::Duration;

use axum::{routing::post, Router};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{publish_event, PublishState};

/// Creates the publish router, bounding each request by `timeout`.
pub fn publish_routes(state: PublishState, timeout: Duration) -> Router {
    Router::new()
        .route("/pub/:channel/:event_name", post(publish_event))
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}
