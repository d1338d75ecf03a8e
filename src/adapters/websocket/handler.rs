//! WebSocket upgrade handler for relay connections.
//!
//! Manages the connection lifecycle:
//! 1. Upgrade to WebSocket and register a fresh [`ConnectionId`]
//! 2. Greet with `connected` when no upstream source is configured
//! 3. Forward outbox deliveries and control replies to the client
//! 4. Apply `subscribe` / `unsubscribe` / `ping` frames from the client
//! 5. Disconnect: leave every joined channel

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::SubscriptionManager;
use crate::domain::foundation::{ConnectionId, ErrorCode, Timestamp};

use super::messages::{ClientMessage, ServerMessage};

/// Queue depth for replies to client frames.
const REPLY_CAPACITY: usize = 32;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub manager: Arc<SubscriptionManager>,
}

impl WebSocketState {
    pub fn new(manager: Arc<SubscriptionManager>) -> Self {
        Self { manager }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let manager = state.manager;

    let connection = ConnectionId::new();
    let mut outbox = manager.registry().register(connection).await;
    tracing::info!(connection_id = %connection, "Client connected");

    if !manager.bridging_enabled() {
        let connected = ServerMessage::connected(&connection, Timestamp::now());
        if let Err(e) = send_message(&mut sender, &connected).await {
            tracing::debug!(connection_id = %connection, "Failed to send connected message: {}", e);
            manager.disconnect(&connection).await;
            return;
        }
    }

    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_CAPACITY);

    // Outbox deliveries and replies share the single socket sink.
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                delivery = outbox.recv() => match delivery {
                    Some(delivery) => ServerMessage::from(&delivery),
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(connection_id = %connection, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    let recv_manager = manager.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let reply = handle_client_text(&recv_manager, &connection, &text).await;
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(connection_id = %connection, "Ignoring binary frame");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level keepalive, answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    manager.disconnect(&connection).await;
    tracing::info!(connection_id = %connection, "Client disconnected");
}

/// Apply one client text frame and build the reply.
pub(crate) async fn handle_client_text(
    manager: &SubscriptionManager,
    connection: &ConnectionId,
    text: &str,
) -> ServerMessage {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(connection_id = %connection, error = %e, "Rejected client frame");
            return ServerMessage::error(ErrorCode::InvalidMessage, e.to_string());
        }
    };

    match msg {
        ClientMessage::Subscribe(channel) => match manager.subscribe(connection, &channel).await {
            Ok(_) => ServerMessage::subscribed(channel),
            Err(e) => ServerMessage::error(e.code(), e.to_string()),
        },
        ClientMessage::Unsubscribe(channel) => {
            manager.unsubscribe(connection, &channel).await;
            ServerMessage::unsubscribed(channel)
        }
        ClientMessage::Ping => ServerMessage::pong(),
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ConnectionRegistry, Delivery, EventBroadcaster};
    use crate::domain::foundation::{ChannelName, EventName};
    use crate::domain::relay::Payload;

    fn drain(rx: &mut mpsc::Receiver<Delivery>) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            out.push(delivery);
        }
        out
    }

    fn setup() -> (Arc<SubscriptionManager>, Arc<EventBroadcaster>) {
        let registry = Arc::new(ConnectionRegistry::default());
        let broadcaster = EventBroadcaster::new_shared(registry.clone());
        let manager = Arc::new(SubscriptionManager::new(registry, None, broadcaster.clone()));
        (manager, broadcaster)
    }

    fn event_of(reply: &ServerMessage) -> &str {
        &reply.event
    }

    #[tokio::test]
    async fn subscribe_frame_joins_channel() {
        let (manager, broadcaster) = setup();
        let conn = ConnectionId::new();
        let mut rx = manager.registry().register(conn).await;

        let reply =
            handle_client_text(&manager, &conn, r#"{"event":"subscribe","data":"orders"}"#).await;
        assert_eq!(event_of(&reply), "subscribed");

        broadcaster
            .publish(
                ChannelName::new("orders").unwrap(),
                EventName::new("created").unwrap(),
                Payload::Text("x".into()),
            )
            .await;
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_frame_is_acknowledged_even_without_membership() {
        let (manager, _) = setup();
        let conn = ConnectionId::new();
        let _rx = manager.registry().register(conn).await;

        let reply =
            handle_client_text(&manager, &conn, r#"{"event":"unsubscribe","data":"orders"}"#)
                .await;
        assert_eq!(event_of(&reply), "unsubscribed");
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let (manager, _) = setup();
        let reply = handle_client_text(&manager, &ConnectionId::new(), r#"{"event":"ping"}"#).await;
        assert_eq!(event_of(&reply), "pong");
    }

    #[tokio::test]
    async fn malformed_frame_yields_error() {
        let (manager, _) = setup();
        let reply = handle_client_text(&manager, &ConnectionId::new(), "not json").await;
        assert_eq!(event_of(&reply), "error");

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["data"]["code"], "INVALID_MESSAGE");
    }

    #[tokio::test]
    async fn subscribe_from_unregistered_connection_is_refused() {
        let (manager, _) = setup();
        let reply = handle_client_text(
            &manager,
            &ConnectionId::new(),
            r#"{"event":"subscribe","data":"orders"}"#,
        )
        .await;

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["code"], "NOT_CONNECTED");
        assert!(manager.active_channels().await.is_empty());
    }

    #[tokio::test]
    async fn subscribe_after_shutdown_is_refused() {
        let (manager, _) = setup();
        let conn = ConnectionId::new();
        let _rx = manager.registry().register(conn).await;
        manager.shutdown().await;

        let reply =
            handle_client_text(&manager, &conn, r#"{"event":"subscribe","data":"orders"}"#).await;
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["data"]["code"], "SHUTTING_DOWN");
    }
}
