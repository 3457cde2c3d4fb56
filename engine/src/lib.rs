//! Parlor engine.
//!
//! This crate contains the room directory, the Mäxchen turn engine, and the
//! currency ledger seam shared by all games.
//!
//! ## Determinism requirements
//! - Game state transitions are pure given their inputs; dice are rolled by
//!   the caller (the room manager) and handed to the engine, never generated
//!   inside a transition.
//! - Randomness (room codes, dice) flows through a single rng owned by the
//!   room manager so tests can seed it.
//!
//! ## Concurrency model
//! All room state lives behind one lock and every operation runs to
//! completion while holding it. The only awaits are ledger calls, which
//! happen with the lock released; afterwards the operation re-validates the
//! room before committing (see [`Lobby`]).

pub mod dice;
pub mod ledger;
pub mod lobby;
pub mod maexchen;
pub mod registry;
pub mod room;

#[cfg(test)]
mod round_tests;

pub use ledger::{InMemoryLedger, Ledger};
pub use lobby::{Audience, Dispatch, Lobby};
pub use maexchen::{
    Announcement, BelieveResolution, ChallengeResolution, ForfeitOutcome, GameError, GamePlayer,
    MaexchenGame, RoundStatus, TurnHandoff, TurnPhase,
};
pub use registry::{GameInfo, GameRegistry};
pub use room::{Departure, Room, RoomManager, RoomPlayer};
