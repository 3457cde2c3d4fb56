//! Room directory and membership.
//!
//! Rooms are keyed by short codes and owned by one [`RoomManager`], an
//! explicitly constructed value passed to the transport layer rather than a
//! module-level global. Membership operations are all-or-nothing: a caller
//! is told which precondition failed and the room is untouched.
//!
//! The manager also fronts the per-room turn engine: dice come from the
//! manager's rng and are handed into the engine, which keeps transitions
//! deterministic under test seeds.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use parlor_types::protocol::{BetEntry, LivesEntry, PlayerEntry, ServerEvent};
use parlor_types::{
    ConnectionId, GameKind, LobbyError, PlayerProfile, RoomCode, MIN_PLAYERS_TO_START,
};

use crate::dice::{self, DiceRoll};
use crate::maexchen::{
    BelieveResolution, ChallengeResolution, ForfeitOutcome, GameError, MaexchenGame, TurnHandoff,
};
use crate::registry::GameRegistry;

/// Attempts at an unused code before giving up. The code space holds 36^4
/// entries, so this bound is only reachable if the directory is effectively
/// full.
const MAX_CODE_ATTEMPTS: usize = 1_024;

/// One member of a room's live roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomPlayer {
    pub connection_id: ConnectionId,
    pub profile: PlayerProfile,
}

#[derive(Debug, PartialEq)]
pub struct Room {
    pub code: RoomCode,
    pub host: ConnectionId,
    pub kind: GameKind,
    /// Insertion order defines turn order.
    pub players: Vec<RoomPlayer>,
    /// Pre-round stakes, keyed by member. Cleared into the pot at start.
    pub bets: HashMap<ConnectionId, u64>,
    /// The uniform stake every non-zero bet must match.
    pub required_bet: Option<u64>,
    /// Present only while a round is in progress.
    pub game: Option<MaexchenGame>,
}

impl Room {
    fn new(code: RoomCode, kind: GameKind, host: ConnectionId, profile: PlayerProfile) -> Self {
        Self {
            code,
            host,
            kind,
            players: vec![RoomPlayer {
                connection_id: host,
                profile,
            }],
            bets: HashMap::new(),
            required_bet: None,
            game: None,
        }
    }

    pub fn is_member(&self, connection: ConnectionId) -> bool {
        self.players.iter().any(|p| p.connection_id == connection)
    }

    pub fn player_name(&self, connection: ConnectionId) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection)
            .map(|p| p.profile.name.as_str())
    }

    /// Placed stakes in seat order.
    pub fn bet_entries(&self) -> Vec<BetEntry> {
        self.players
            .iter()
            .filter_map(|p| {
                self.bets.get(&p.connection_id).map(|amount| BetEntry {
                    name: p.profile.name.clone(),
                    bet: *amount,
                })
            })
            .collect()
    }

    pub(crate) fn recompute_required_bet(&mut self) {
        self.required_bet = self.bets.values().find(|amount| **amount > 0).copied();
    }

    /// Full snapshot pushed to members on membership or bet changes.
    pub fn state_event(&self) -> ServerEvent {
        let host_name = self
            .player_name(self.host)
            .unwrap_or_default()
            .to_string();
        ServerEvent::RoomState {
            code: self.code,
            game: self.kind,
            host: host_name,
            players: self
                .players
                .iter()
                .map(|p| PlayerEntry {
                    name: p.profile.name.clone(),
                    avatar: p.profile.avatar.clone(),
                    is_host: p.connection_id == self.host,
                })
                .collect(),
            bets: self.bet_entries(),
            required_bet: self.required_bet,
            in_progress: self.game.is_some(),
        }
    }
}

/// Result of a membership removal.
#[derive(Clone, Debug)]
pub struct Departure {
    pub code: RoomCode,
    pub player_name: String,
    /// Pre-round stake to return to the leaver.
    pub refund: u64,
    pub room_destroyed: bool,
    pub new_host_name: Option<String>,
}

/// Snapshot handed back by [`RoomManager::start_round`].
#[derive(Clone, Debug)]
pub struct StartedRound {
    pub code: RoomCode,
    pub players: Vec<LivesEntry>,
    pub pot: u64,
    pub first: TurnHandoff,
}

/// First half of a bet change, taken before the ledger is consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetStaging {
    pub code: RoomCode,
    /// The stake currently held for this member (0 when none).
    pub current: u64,
}

/// Second half of a bet change, after the ledger calls resolved.
#[derive(Clone, Debug)]
pub enum BetCommit {
    Committed {
        bets: Vec<BetEntry>,
        required_bet: Option<u64>,
    },
    /// The room changed underneath the ledger await; the caller must undo
    /// its ledger movements.
    Stale,
}

#[derive(Clone, Debug)]
pub struct RollOutcome {
    pub code: RoomCode,
    pub player_name: String,
    pub roll: DiceRoll,
}

#[derive(Clone, Debug)]
pub struct AnnounceOutcome {
    pub code: RoomCode,
    pub player_index: usize,
    pub player_name: String,
    pub value: u8,
    pub next: TurnHandoff,
}

#[derive(Debug)]
pub struct RoomManager {
    rooms: HashMap<RoomCode, Room>,
    membership: HashMap<ConnectionId, RoomCode>,
    registry: GameRegistry,
    rng: StdRng,
}

impl RoomManager {
    pub fn new(registry: GameRegistry) -> Self {
        Self::with_rng(registry, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_seed(registry: GameRegistry, seed: u64) -> Self {
        Self::with_rng(registry, StdRng::seed_from_u64(seed))
    }

    fn with_rng(registry: GameRegistry, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            membership: HashMap::new(),
            registry,
            rng,
        }
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    pub fn room(&self, code: RoomCode) -> Option<&Room> {
        self.rooms.get(&code)
    }

    #[cfg(test)]
    pub(crate) fn room_mut(&mut self, code: RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(&code)
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<&Room> {
        self.membership
            .get(&connection)
            .and_then(|code| self.rooms.get(code))
    }

    /// Create a room for `connection` with a code not currently in use.
    pub fn create_room(
        &mut self,
        connection: ConnectionId,
        kind: GameKind,
        profile: PlayerProfile,
    ) -> Result<RoomCode, LobbyError> {
        if self.membership.contains_key(&connection) {
            return Err(LobbyError::AlreadyJoined);
        }
        let code = self.unused_code()?;
        self.rooms
            .insert(code, Room::new(code, kind, connection, profile));
        self.membership.insert(connection, code);
        Ok(code)
    }

    fn unused_code(&mut self) -> Result<RoomCode, LobbyError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = RoomCode::generate(&mut self.rng);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(LobbyError::CodeSpaceExhausted)
    }

    pub fn join_room(
        &mut self,
        connection: ConnectionId,
        code: RoomCode,
        profile: PlayerProfile,
    ) -> Result<&Room, LobbyError> {
        if self.membership.contains_key(&connection) {
            return Err(LobbyError::AlreadyJoined);
        }
        let max_players = {
            let room = self.rooms.get(&code).ok_or(LobbyError::RoomNotFound)?;
            if room.game.is_some() {
                return Err(LobbyError::GameInProgress);
            }
            self.registry.max_players(room.kind)
        };
        let room = self.rooms.get_mut(&code).ok_or(LobbyError::RoomNotFound)?;
        if room.players.len() >= max_players {
            return Err(LobbyError::RoomFull);
        }
        room.players.push(RoomPlayer {
            connection_id: connection,
            profile,
        });
        self.membership.insert(connection, code);
        Ok(&self.rooms[&code])
    }

    /// Remove a member from whatever room it occupies. Destroys emptied
    /// rooms and reassigns the host to the first remaining player. Any
    /// in-round forfeit must be applied by the caller beforehand.
    pub fn remove_member(&mut self, connection: ConnectionId) -> Result<Departure, LobbyError> {
        let code = self
            .membership
            .remove(&connection)
            .ok_or(LobbyError::NotInRoom)?;
        let room = self.rooms.get_mut(&code).ok_or(LobbyError::NotInRoom)?;
        let index = room
            .players
            .iter()
            .position(|p| p.connection_id == connection)
            .ok_or(LobbyError::NotInRoom)?;
        let removed = room.players.remove(index);
        let refund = room.bets.remove(&connection).unwrap_or(0);
        room.recompute_required_bet();

        if room.players.is_empty() {
            self.rooms.remove(&code);
            return Ok(Departure {
                code,
                player_name: removed.profile.name,
                refund,
                room_destroyed: true,
                new_host_name: None,
            });
        }

        let mut new_host_name = None;
        if room.host == connection {
            let next_host = &room.players[0];
            room.host = next_host.connection_id;
            new_host_name = Some(next_host.profile.name.clone());
        }
        Ok(Departure {
            code,
            player_name: removed.profile.name,
            refund,
            room_destroyed: false,
            new_host_name,
        })
    }

    /// Stage a bet change: all validation that does not need the ledger.
    pub fn stage_bet(
        &self,
        connection: ConnectionId,
        amount: u64,
    ) -> Result<BetStaging, parlor_types::BetError> {
        use parlor_types::BetError;

        let room = self.room_of(connection).ok_or(BetError::NotInRoom)?;
        if room.game.is_some() {
            return Err(BetError::BettingClosed);
        }
        if amount > parlor_types::MAX_BET {
            return Err(BetError::OverCap {
                cap: parlor_types::MAX_BET,
            });
        }
        let current = room.bets.get(&connection).copied().unwrap_or(0);
        if amount > 0 {
            let others_staked = room
                .bets
                .iter()
                .any(|(member, staked)| *member != connection && *staked > 0);
            if others_staked {
                if let Some(required) = room.required_bet {
                    if amount != required {
                        return Err(BetError::BetMismatch { required });
                    }
                }
            }
        }
        Ok(BetStaging {
            code: room.code,
            current,
        })
    }

    /// Commit a staged bet change after the ledger movements succeeded. The
    /// staging snapshot must still hold; otherwise the commit reports
    /// [`BetCommit::Stale`] and changes nothing.
    pub fn commit_bet(
        &mut self,
        connection: ConnectionId,
        staging: BetStaging,
        amount: u64,
    ) -> BetCommit {
        let Some(room) = self.rooms.get_mut(&staging.code) else {
            return BetCommit::Stale;
        };
        if !room.is_member(connection) || room.game.is_some() {
            return BetCommit::Stale;
        }
        let current = room.bets.get(&connection).copied().unwrap_or(0);
        if current != staging.current {
            return BetCommit::Stale;
        }
        if amount == 0 {
            room.bets.remove(&connection);
        } else {
            room.bets.insert(connection, amount);
        }
        room.recompute_required_bet();
        BetCommit::Committed {
            bets: room.bet_entries(),
            required_bet: room.required_bet,
        }
    }

    /// Start a round: host-only, betting phase only, two-plus players.
    /// Stakes were debited when placed; they are folded into the pot here.
    pub fn start_round(&mut self, connection: ConnectionId) -> Result<StartedRound, LobbyError> {
        let code = *self
            .membership
            .get(&connection)
            .ok_or(LobbyError::NotInRoom)?;
        let room = self.rooms.get_mut(&code).ok_or(LobbyError::NotInRoom)?;
        if room.host != connection {
            return Err(LobbyError::NotHost);
        }
        if room.game.is_some() {
            return Err(LobbyError::GameInProgress);
        }
        if room.players.len() < MIN_PLAYERS_TO_START {
            return Err(LobbyError::NotEnoughPlayers(MIN_PLAYERS_TO_START));
        }

        let pot: u64 = room.bets.values().sum();
        let roster = room
            .players
            .iter()
            .map(|p| (p.connection_id, &p.profile));
        let game = MaexchenGame::start(roster, pot);
        let players = game
            .players()
            .iter()
            .map(|p| LivesEntry {
                name: p.name.clone(),
                lives: p.lives,
            })
            .collect();
        let first = TurnHandoff {
            player_index: 0,
            player_name: game.players()[0].name.clone(),
            forced: false,
        };
        room.game = Some(game);
        room.bets.clear();
        room.required_bet = None;
        Ok(StartedRound {
            code,
            players,
            pot,
            first,
        })
    }

    /// Clear a settled round so the room can bet again. No-op if the room
    /// disappeared while the payout was in flight.
    pub fn clear_game(&mut self, code: RoomCode) {
        if let Some(room) = self.rooms.get_mut(&code) {
            room.game = None;
        }
    }

    /// Roll for the current player. The dice come from the manager's rng;
    /// the engine only validates and records them.
    pub fn game_roll(&mut self, connection: ConnectionId) -> Result<RollOutcome, GameError> {
        let code = *self
            .membership
            .get(&connection)
            .ok_or(GameError::WrongPhase)?;
        let room = self.rooms.get_mut(&code).ok_or(GameError::WrongPhase)?;
        let game = room.game.as_mut().ok_or(GameError::WrongPhase)?;
        let roll = dice::roll_dice(&mut self.rng);
        let roll = game.roll(connection, roll)?;
        Ok(RollOutcome {
            code,
            player_name: game.current_player().name.clone(),
            roll,
        })
    }

    pub fn game_announce(
        &mut self,
        connection: ConnectionId,
        value: u8,
    ) -> Result<AnnounceOutcome, GameError> {
        let code = *self
            .membership
            .get(&connection)
            .ok_or(GameError::WrongPhase)?;
        let room = self.rooms.get_mut(&code).ok_or(GameError::WrongPhase)?;
        let game = room.game.as_mut().ok_or(GameError::WrongPhase)?;
        let player_index = game.current_index();
        let player_name = game.current_player().name.clone();
        let next = game.announce(connection, value)?;
        Ok(AnnounceOutcome {
            code,
            player_index,
            player_name,
            value,
            next,
        })
    }

    pub fn game_challenge(
        &mut self,
        connection: ConnectionId,
    ) -> Result<(RoomCode, ChallengeResolution), GameError> {
        let code = *self
            .membership
            .get(&connection)
            .ok_or(GameError::WrongPhase)?;
        let room = self.rooms.get_mut(&code).ok_or(GameError::WrongPhase)?;
        let game = room.game.as_mut().ok_or(GameError::WrongPhase)?;
        let resolution = game.challenge(connection)?;
        Ok((code, resolution))
    }

    pub fn game_believe(
        &mut self,
        connection: ConnectionId,
    ) -> Result<(RoomCode, BelieveResolution), GameError> {
        let code = *self
            .membership
            .get(&connection)
            .ok_or(GameError::WrongPhase)?;
        let room = self.rooms.get_mut(&code).ok_or(GameError::WrongPhase)?;
        let game = room.game.as_mut().ok_or(GameError::WrongPhase)?;
        let resolution = game.believe(connection)?;
        Ok((code, resolution))
    }

    /// Apply the forfeit half of a disconnect, if a round is in progress.
    pub fn game_forfeit(&mut self, connection: ConnectionId) -> Option<(RoomCode, ForfeitOutcome)> {
        let code = *self.membership.get(&connection)?;
        let room = self.rooms.get_mut(&code)?;
        let game = room.game.as_mut()?;
        let outcome = game.remove_player(connection)?;
        Some((code, outcome))
    }

    /// In-round lives roster for resolution broadcasts.
    pub fn lives_entries(&self, code: RoomCode) -> Vec<LivesEntry> {
        self.rooms
            .get(&code)
            .and_then(|room| room.game.as_ref())
            .map(|game| {
                game.players()
                    .iter()
                    .map(|p| LivesEntry {
                        name: p.name.clone(),
                        lives: p.lives,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Connection ids of a room's live roster, for broadcast fan-out.
    pub fn member_connections(&self, code: RoomCode) -> Vec<ConnectionId> {
        self.rooms
            .get(&code)
            .map(|room| room.players.iter().map(|p| p.connection_id).collect())
            .unwrap_or_default()
    }
}
