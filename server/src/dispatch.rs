//! Command dispatch: one match from inbound command to lobby operation.
//!
//! Centralizing the dispatch keeps the failure policy in one place:
//! membership and economic failures are answered with an `error` event, and
//! everything the engine rejected silently stays silent here too.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use parlor_engine::{Audience, Dispatch, Lobby};
use parlor_types::protocol::{ClientCommand, ServerEvent};
use parlor_types::{ConnectionId, PlayerProfile};

use crate::connection::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub lobby: Arc<Lobby>,
    pub connections: Arc<ConnectionRegistry>,
    pub limiter: Arc<crate::rate_limit::CommandRateLimiter>,
    pub reveal_delay: Duration,
}

pub async fn handle_command(state: &AppState, connection: ConnectionId, command: ClientCommand) {
    let outcome = match command {
        ClientCommand::CreateRoom { game, name, avatar } => state
            .lobby
            .create_room(connection, game, PlayerProfile::sanitized(&name, &avatar))
            .map_err(|err| (err.code(), err.to_string())),
        ClientCommand::JoinRoom { code, name, avatar } => state
            .lobby
            .join_room(connection, &code, PlayerProfile::sanitized(&name, &avatar))
            .map_err(|err| (err.code(), err.to_string())),
        ClientCommand::LeaveRoom => Ok(state.lobby.leave(connection).await),
        ClientCommand::ListGames => Ok(state.lobby.list_games(connection)),
        ClientCommand::PlaceBet { amount } => state
            .lobby
            .place_bet(connection, amount)
            .await
            .map_err(|err| (err.code(), err.to_string())),
        ClientCommand::StartGame => state
            .lobby
            .start_round(connection)
            .map_err(|err| (err.code(), err.to_string())),
        ClientCommand::Roll => Ok(state.lobby.roll(connection)),
        ClientCommand::Announce { value } => Ok(state.lobby.announce(connection, value)),
        ClientCommand::Challenge => Ok(state.lobby.challenge(connection).await),
        ClientCommand::BelieveMaexchen => Ok(state.lobby.believe(connection).await),
    };

    match outcome {
        Ok(events) => fan_out(state, events),
        Err((code, message)) => {
            debug!(%connection, code, "rejected command");
            state.connections.send_to(
                connection,
                &ServerEvent::Error {
                    code: code.to_string(),
                    message,
                },
            );
        }
    }
}

/// Route events to their audiences. Delayed events re-resolve room
/// membership at send time, so reconnect-churn between the reveal and the
/// turn announcement is harmless.
pub fn fan_out(state: &AppState, events: Vec<Dispatch>) {
    for dispatch in events {
        if dispatch.delayed {
            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(state.reveal_delay).await;
                deliver(&state, &dispatch);
            });
        } else {
            deliver(state, &dispatch);
        }
    }
}

fn deliver(state: &AppState, dispatch: &Dispatch) {
    match dispatch.audience {
        Audience::Room(code) => {
            let members = state.lobby.connections_in_room(code);
            state.connections.send_to_all(&members, &dispatch.event);
        }
        Audience::Player(connection) => {
            state.connections.send_to(connection, &dispatch.event);
        }
    }
}
