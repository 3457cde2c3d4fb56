//! Common types used throughout parlor.
//!
//! Defines room/player/game identifiers, lobby constants, the wire protocol
//! spoken over the WebSocket endpoint, and the shared error taxonomy. This
//! crate is I/O-free; the engine and server build on it.

mod constants;
mod error;
mod game;
mod ids;
mod player;
pub mod protocol;

pub use constants::*;
pub use error::{BetError, LedgerError, LobbyError};
pub use game::GameKind;
pub use ids::{ConnectionId, RoomCode, RoomCodeError};
pub use player::PlayerProfile;
