//! WebSocket upgrade handler and per-connection loops.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::stream::StreamExt;
use futures::{SinkExt, Stream};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use storegate_auth::Principal;

use crate::engine::GatewayEngine;
use crate::message::{builder, catalog};
use crate::session::{Identity, Session};
use super::frame::ClientFrame;

/// Builds the gateway router: the WebSocket endpoint and a health probe.
pub fn router(engine: Arc<GatewayEngine>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health))
        .with_state(engine)
}

/// GET /api/health — liveness and session count.
async fn health(State(engine): State<Arc<GatewayEngine>>) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "UP",
        "activeSessions": engine.registry().count(),
    }))
}

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// The credential is checked before the upgrade completes; a bad token
/// never becomes a session.
pub async fn ws_handler(
    State(engine): State<Arc<GatewayEngine>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Credential check comes before the upgrade outcome so a bad token
    // is always refused as unauthorized.
    let principal = match engine.gatekeeper().authenticate(&query.token) {
        Ok(principal) => principal,
        Err(err) => {
            warn!(error = %err, "handshake refused");
            return (StatusCode::UNAUTHORIZED, err.message).into_response();
        }
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let cfg = engine.config();
    ws.max_message_size(cfg.max_frame_bytes)
        .max_write_buffer_size(cfg.max_outbound_bytes)
        .on_upgrade(move |socket| handle_connection(engine, principal, socket))
}

/// Runs one established connection to completion.
async fn handle_connection(engine: Arc<GatewayEngine>, principal: Principal, socket: WebSocket) {
    let (mut ws_tx, ws_rx) = socket.split();
    let cfg = engine.config();
    let send_timeout = Duration::from_secs(cfg.send_timeout_seconds);

    let (tx, mut outbound_rx) = tokio::sync::mpsc::channel(cfg.outbound_buffer_frames);
    let session = Arc::new(Session::new(
        Uuid::new_v4(),
        Identity::from(principal.clone()),
        tx,
    ));
    let session_id = session.id;

    if let Err(err) = engine.bridge().on_connect(Arc::clone(&session)) {
        warn!(session_id = %session_id, error = %err, "session registration failed");
        return;
    }
    info!(session_id = %session_id, username = %session.identity.username,
        "connection established");

    // Outbound writer: drains the session's frame queue onto the socket.
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            match tokio::time::timeout(send_timeout, ws_tx.send(Message::Text(frame.into()))).await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break,
                Err(_) => {
                    warn!(session_id = %session_id, "outbound send timed out");
                    break;
                }
            }
        }
    });

    // Inbound frames are handled sequentially so one session's messages
    // are dispatched in arrival order.
    read_loop(&engine, &session, &principal, ws_rx).await;

    outbound_task.abort();
    engine.bridge().on_disconnect(session_id);
    info!(session_id = %session_id, "connection closed");
}

async fn read_loop<S>(
    engine: &Arc<GatewayEngine>,
    session: &Arc<Session>,
    principal: &Principal,
    mut ws_rx: S,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let cfg = engine.config();
    let handshake = Duration::from_secs(cfg.handshake_timeout_seconds);
    let cancel = session.cancellation_token().clone();

    // The first frame must arrive within the handshake window.
    let mut awaiting_first = true;

    loop {
        // Reading races the cancellation token so an evicted session's
        // socket closes without waiting for the client to hang up.
        let next = if awaiting_first {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(session_id = %session.id, "session expired, closing socket");
                    return;
                }
                timed = tokio::time::timeout(handshake, ws_rx.next()) => match timed {
                    Ok(next) => next,
                    Err(_) => {
                        info!(session_id = %session.id, "no frame within handshake window");
                        return;
                    }
                },
            }
        } else {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(session_id = %session.id, "session expired, closing socket");
                    return;
                }
                next = ws_rx.next() => next,
            }
        };
        awaiting_first = false;

        let Some(result) = next else { return };
        match result {
            Ok(Message::Text(text)) => {
                if handle_text(engine, session, principal, text.as_str())
                    .await
                    .is_break()
                {
                    return;
                }
            }
            Ok(Message::Close(_)) => return,
            // Ping/pong handled by the transport.
            Ok(_) => {}
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "socket error");
                return;
            }
        }
    }
}

/// Handles one text frame. `Break` ends the connection.
async fn handle_text(
    engine: &Arc<GatewayEngine>,
    session: &Arc<Session>,
    principal: &Principal,
    text: &str,
) -> std::ops::ControlFlow<()> {
    use std::ops::ControlFlow;

    engine.registry().touch(session.id);

    if text.len() > engine.config().max_frame_bytes {
        respond_error(engine, session, "Frame too large", "Frame exceeds size limit");
        return ControlFlow::Continue(());
    }

    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            respond_error(engine, session, "Invalid frame", &err.to_string());
            return ControlFlow::Continue(());
        }
    };

    let kind = frame.kind();
    let destination = frame.destination().unwrap_or_default();
    if let Err(err) = engine.gatekeeper().authorize(principal, kind, destination) {
        warn!(session_id = %session.id, destination, "frame denied");
        respond_error(engine, session, "Access denied", &err.message);
        return ControlFlow::Continue(());
    }

    match frame {
        ClientFrame::Subscribe { destination } => {
            if let Err(err) = engine.bridge().on_subscribe(session.id, &destination) {
                respond_error(engine, session, "Subscribe failed", &err.message);
            }
        }
        ClientFrame::Unsubscribe { destination } => {
            engine.bridge().on_unsubscribe(session.id, &destination);
        }
        ClientFrame::Send { message } => {
            if let Err(err) = engine
                .dispatcher()
                .dispatch(Arc::clone(session), message)
                .await
            {
                warn!(session_id = %session.id, error = %err, "dispatch failed");
            }
        }
        // The touch above is the heartbeat's whole effect.
        ClientFrame::Heartbeat => {}
        ClientFrame::Disconnect => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

fn respond_error(engine: &Arc<GatewayEngine>, session: &Arc<Session>, error: &str, details: &str) {
    let response = builder::error("", error, details);
    if let Err(err) =
        engine
            .delivery()
            .send_to_session(session.id, catalog::QUEUE_ERRORS, &response)
    {
        warn!(session_id = %session.id, error = %err, "error response not delivered");
    }
}
