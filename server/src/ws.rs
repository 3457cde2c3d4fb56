//! WebSocket lifecycle: upgrade, read loop, writer task, disconnect.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parlor_types::protocol::ClientCommand;
use parlor_types::ConnectionId;

use crate::dispatch::{fan_out, handle_command, AppState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::random();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.connections.register(connection, tx);
    info!(%connection, "connection opened");

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => command,
                    Err(err) => {
                        // Malformed frames are protocol violations: no
                        // reply, no state change.
                        warn!(%connection, %err, "invalid inbound message");
                        continue;
                    }
                };
                if !state.limiter.allow(connection) {
                    debug!(%connection, "rate limited");
                    continue;
                }
                handle_command(&state, connection, command).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Socket gone: forfeit whatever room the connection occupied.
    info!(%connection, "connection closed");
    state.connections.unregister(connection);
    let events = state.lobby.leave(connection).await;
    fan_out(&state, events);
    state.limiter.forget_stale();
    write_task.abort();
}
