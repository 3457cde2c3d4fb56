//! Connection registry: resolves a live connection to its outbound queue.
//!
//! Each socket gets an unbounded channel drained by its writer task, so a
//! slow client never blocks a room broadcast. Events are serialized once per
//! recipient; a closed channel just means the reader is mid-teardown.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;

use parlor_types::protocol::ServerEvent;
use parlor_types::ConnectionId;

pub type OutboundSender = mpsc::UnboundedSender<Message>;

#[derive(Default)]
pub struct ConnectionRegistry {
    senders: Mutex<HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionRegistry {
    pub fn register(&self, connection: ConnectionId, sender: OutboundSender) {
        self.senders.lock().unwrap().insert(connection, sender);
    }

    pub fn unregister(&self, connection: ConnectionId) {
        self.senders.lock().unwrap().remove(&connection);
    }

    pub fn send_to(&self, connection: ConnectionId, event: &ServerEvent) {
        let sender = self.senders.lock().unwrap().get(&connection).cloned();
        let Some(sender) = sender else { return };
        match serde_json::to_string(event) {
            Ok(payload) => {
                let _ = sender.send(Message::Text(payload));
            }
            Err(err) => warn!(%connection, %err, "failed to serialize event"),
        }
    }

    pub fn send_to_all(&self, connections: &[ConnectionId], event: &ServerEvent) {
        for connection in connections {
            self.send_to(*connection, event);
        }
    }
}
