//! HTTP handlers for publishing events.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use http::{header, HeaderMap, StatusCode};

use crate::application::EventBroadcaster;
use crate::domain::foundation::{ChannelName, ErrorCode, EventName, ValidationError};
use crate::domain::relay::Payload;

use super::dto::{ErrorResponse, PublishResponse};

#[derive(Clone)]
pub struct PublishState {
    pub broadcaster: Arc<EventBroadcaster>,
}

impl PublishState {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

/// Reasons a publish request is rejected. Nothing is delivered in any case.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Invalid channel: {0}")]
    InvalidChannel(ValidationError),

    #[error("Invalid event name: {0}")]
    InvalidEventName(ValidationError),

    #[error("Malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

impl IntoResponse for PublishError {
    fn into_response(self) -> Response {
        let body = match &self {
            PublishError::InvalidChannel(e) => {
                ErrorResponse::new(ErrorCode::InvalidChannel, e.to_string())
            }
            PublishError::InvalidEventName(e) => {
                ErrorResponse::new(ErrorCode::InvalidEventName, e.to_string())
            }
            PublishError::MalformedJson(_) => ErrorResponse::malformed_json(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// POST /pub/:channel/:event_name - Publish the request body as an event
pub async fn publish_event(
    State(state): State<PublishState>,
    Path((channel, event_name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PublishResponse>, PublishError> {
    let channel = ChannelName::new(channel).map_err(PublishError::InvalidChannel)?;
    let event_name = EventName::new(event_name).map_err(PublishError::InvalidEventName)?;

    let payload = if is_json_content_type(&headers) {
        Payload::from_json_bytes(&body).map_err(|e| {
            tracing::warn!(channel = %channel, event = %event_name, error = %e, "Rejected publish with malformed JSON");
            PublishError::MalformedJson(e)
        })?
    } else {
        Payload::from_text_bytes(&body)
    };

    let report = state
        .broadcaster
        .publish(channel.clone(), event_name.clone(), payload)
        .await;

    tracing::info!(
        channel = %channel,
        event = %event_name,
        delivered = report.channel_deliveries,
        wildcard = report.wildcard_deliveries,
        "Published event"
    );

    Ok(Json(PublishResponse::new(channel, event_name, report)))
}

/// True for `application/json` and structured-syntax `+json` media types.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
