// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser WebSocket endpoint: one connection, one session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::app::Application;
use crate::hub::Hub;

/// `GET {ws_path}` — WebSocket upgrade for a browser session.
pub async fn ws_handler<A: Application>(
    State(hub): State<Arc<Hub<A>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Per-connection loop: inbound text goes to the session queue, flushed
/// frames go back to the browser. Ends on close, stream end, or any
/// transport error, then closes the session.
async fn handle_ws<A: Application>(socket: WebSocket, hub: Arc<Hub<A>>) {
    let (session, mut frames) = hub.open().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    tracing::debug!(session_id = %session.id(), err = %e, "websocket write failed");
                    break;
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = session.deliver(text.as_str()) {
                            tracing::warn!(session_id = %session.id(), err = %e, "dropping connection");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session.id(), err = %e, "websocket read failed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Nobody drains frames past this point.
    drop(frames);
    session.close().await;
}
