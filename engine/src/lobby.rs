//! Lobby service: room operations plus the ledger choreography around them.
//!
//! The [`Lobby`] owns the room manager behind one lock and runs every
//! operation to completion while holding it. The exceptions are the ledger
//! calls (bet movements, pot payouts), which are awaited with the lock
//! released; afterwards the operation re-validates the room before
//! committing, so a teardown or round start that raced the call cannot
//! corrupt state. An operation that loses that race undoes its own ledger
//! movements exactly.
//!
//! Methods return [`Dispatch`] values — events plus their audience — for the
//! transport layer to fan out. Protocol violations (wrong turn, wrong phase,
//! out-of-range values) produce no dispatches and no state change; economic
//! failures are returned as errors for the transport to surface.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use parlor_types::protocol::{RollView, ServerEvent};
use parlor_types::{
    BetError, ConnectionId, GameKind, LobbyError, PlayerProfile, RoomCode,
};

use crate::dice;
use crate::ledger::Ledger;
use crate::maexchen::{ForfeitOutcome, RoundStatus, TurnHandoff};
use crate::registry::GameRegistry;
use crate::room::{BetCommit, RoomManager};

/// Who an event goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Room(RoomCode),
    Player(ConnectionId),
}

/// An outbound event with routing. `delayed` marks post-resolution turn
/// announcements that should go out after the reveal delay.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub audience: Audience,
    pub event: ServerEvent,
    pub delayed: bool,
}

impl Dispatch {
    fn room(code: RoomCode, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Room(code),
            event,
            delayed: false,
        }
    }

    fn player(connection: ConnectionId, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Player(connection),
            event,
            delayed: false,
        }
    }

    fn delayed_room(code: RoomCode, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Room(code),
            event,
            delayed: true,
        }
    }
}

fn next_turn_event(handoff: &TurnHandoff) -> ServerEvent {
    ServerEvent::NextTurn {
        player_index: handoff.player_index,
        player_name: handoff.player_name.clone(),
        must_respond_to_maexchen: handoff.forced,
    }
}

pub struct Lobby {
    manager: Mutex<RoomManager>,
    ledger: Arc<dyn Ledger>,
}

impl Lobby {
    pub fn new(registry: GameRegistry, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            manager: Mutex::new(RoomManager::new(registry)),
            ledger,
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(registry: GameRegistry, ledger: Arc<dyn Ledger>, seed: u64) -> Self {
        Self {
            manager: Mutex::new(RoomManager::with_seed(registry, seed)),
            ledger,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RoomManager> {
        self.manager.lock().unwrap()
    }

    /// Resolve a room broadcast group to its live connections.
    pub fn connections_in_room(&self, code: RoomCode) -> Vec<ConnectionId> {
        self.lock().member_connections(code)
    }

    pub fn create_room(
        &self,
        connection: ConnectionId,
        kind: GameKind,
        profile: PlayerProfile,
    ) -> Result<Vec<Dispatch>, LobbyError> {
        let mut mgr = self.lock();
        let code = mgr.create_room(connection, kind, profile)?;
        let mut events = vec![Dispatch::player(
            connection,
            ServerEvent::RoomCreated { code, game: kind },
        )];
        if let Some(room) = mgr.room(code) {
            events.push(Dispatch::room(code, room.state_event()));
        }
        Ok(events)
    }

    pub fn join_room(
        &self,
        connection: ConnectionId,
        code: &str,
        profile: PlayerProfile,
    ) -> Result<Vec<Dispatch>, LobbyError> {
        let code: RoomCode = code.parse().map_err(|_| LobbyError::RoomNotFound)?;
        let mut mgr = self.lock();
        let room = mgr.join_room(connection, code, profile)?;
        Ok(vec![Dispatch::room(code, room.state_event())])
    }

    pub fn list_games(&self, connection: ConnectionId) -> Vec<Dispatch> {
        let listings = self.lock().registry().listings();
        vec![Dispatch::player(
            connection,
            ServerEvent::GameList { games: listings },
        )]
    }

    /// Place, change, or withdraw a stake. Re-betting the current amount is
    /// a no-op with no ledger call and no broadcast. A change refunds the
    /// old stake and debits the new one; if the debit fails the old stake is
    /// restored, so the requester is never left worse off.
    pub async fn place_bet(
        &self,
        connection: ConnectionId,
        amount: u64,
    ) -> Result<Vec<Dispatch>, BetError> {
        let staging = self.lock().stage_bet(connection, amount)?;
        if staging.current == amount {
            return Ok(Vec::new());
        }

        let mut refunded = 0u64;
        let mut balance = 0u64;
        if staging.current > 0 {
            match self.ledger.credit(connection, staging.current).await {
                Ok(new_balance) => {
                    refunded = staging.current;
                    balance = new_balance;
                }
                Err(err) => {
                    warn!(%connection, %err, "stake refund failed");
                    return Err(BetError::LedgerUnavailable);
                }
            }
        }
        if amount > 0 {
            match self.ledger.debit(connection, amount).await {
                Ok(new_balance) => balance = new_balance,
                Err(_) => {
                    self.restore_stake(connection, refunded).await;
                    return Err(BetError::InsufficientBalance);
                }
            }
        }

        // The ledger call suspended us; the room may have started a round or
        // vanished in the meantime.
        let commit = self.lock().commit_bet(connection, staging, amount);
        match commit {
            BetCommit::Committed { bets, required_bet } => Ok(vec![
                Dispatch::room(
                    staging.code,
                    ServerEvent::BetsUpdate { bets, required_bet },
                ),
                Dispatch::player(connection, ServerEvent::BalanceUpdate { balance }),
            ]),
            BetCommit::Stale => {
                self.unwind_bet(connection, refunded, amount).await;
                Err(BetError::BettingClosed)
            }
        }
    }

    /// Re-debit a stake whose replacement could not be funded.
    async fn restore_stake(&self, connection: ConnectionId, refunded: u64) {
        if refunded == 0 {
            return;
        }
        if self.ledger.debit(connection, refunded).await.is_err() {
            // The refund was spent from under us; drop the stake entry so
            // the books stay consistent. The player keeps the money.
            warn!(%connection, refunded, "stake could not be restored, dropping bet");
            if let Ok(staging) = self.lock().stage_bet(connection, 0) {
                self.lock().commit_bet(connection, staging, 0);
            }
        }
    }

    /// Reverse this operation's own ledger movements after a stale commit.
    async fn unwind_bet(&self, connection: ConnectionId, refunded: u64, debited: u64) {
        if refunded > 0 {
            if let Err(err) = self.ledger.debit(connection, refunded).await {
                warn!(%connection, refunded, %err, "could not reverse stake refund");
            }
        }
        if debited > 0 {
            if let Err(err) = self.ledger.credit(connection, debited).await {
                warn!(%connection, debited, %err, "could not reverse stake debit");
            }
        }
    }

    pub fn start_round(&self, connection: ConnectionId) -> Result<Vec<Dispatch>, LobbyError> {
        let started = self.lock().start_round(connection)?;
        Ok(vec![
            Dispatch::room(
                started.code,
                ServerEvent::GameStarted {
                    players: started.players,
                    pot: started.pot,
                },
            ),
            Dispatch::room(started.code, next_turn_event(&started.first)),
        ])
    }

    /// Roll for the current player. The faces go only to the roller;
    /// everyone else learns that a roll happened.
    pub fn roll(&self, connection: ConnectionId) -> Vec<Dispatch> {
        let outcome = {
            let mut mgr = self.lock();
            mgr.game_roll(connection)
        };
        match outcome {
            Ok(outcome) => {
                let value = outcome.roll.value();
                vec![
                    Dispatch::room(
                        outcome.code,
                        ServerEvent::DiceRolled {
                            player_name: outcome.player_name,
                        },
                    ),
                    Dispatch::player(
                        connection,
                        ServerEvent::RollResult {
                            d1: outcome.roll.d1,
                            d2: outcome.roll.d2,
                            value,
                            name: dice::outcome_name(value),
                        },
                    ),
                ]
            }
            Err(err) => {
                debug!(%connection, %err, "ignoring roll");
                Vec::new()
            }
        }
    }

    pub fn announce(&self, connection: ConnectionId, value: u8) -> Vec<Dispatch> {
        let outcome = {
            let mut mgr = self.lock();
            mgr.game_announce(connection, value)
        };
        match outcome {
            Ok(outcome) => vec![
                Dispatch::room(
                    outcome.code,
                    ServerEvent::PlayerAnnounced {
                        player_index: outcome.player_index,
                        player_name: outcome.player_name,
                        value: outcome.value,
                        value_name: dice::outcome_name(outcome.value),
                    },
                ),
                Dispatch::room(outcome.code, next_turn_event(&outcome.next)),
            ],
            Err(err) => {
                debug!(%connection, %err, "ignoring announcement");
                Vec::new()
            }
        }
    }

    pub async fn challenge(&self, connection: ConnectionId) -> Vec<Dispatch> {
        let (code, resolution, players) = {
            let mut mgr = self.lock();
            match mgr.game_challenge(connection) {
                Ok((code, resolution)) => {
                    let players = mgr.lives_entries(code);
                    (code, resolution, players)
                }
                Err(err) => {
                    debug!(%connection, %err, "ignoring challenge");
                    return Vec::new();
                }
            }
        };

        let actual_value = resolution.actual_roll.value();
        let mut events = vec![Dispatch::room(
            code,
            ServerEvent::ChallengeResult {
                challenger_name: resolution.challenger_name,
                announcer_name: resolution.announcer_name,
                claimed_value: resolution.claimed_value,
                claimed_name: dice::outcome_name(resolution.claimed_value),
                actual_roll: roll_view(resolution.actual_roll),
                actual_name: dice::outcome_name(actual_value),
                was_lying: resolution.was_lying,
                loser_name: resolution.loser_name,
                lives_lost: resolution.lives_lost,
                players,
            },
        )];
        self.finish_resolution(code, resolution.status, &mut events)
            .await;
        events
    }

    pub async fn believe(&self, connection: ConnectionId) -> Vec<Dispatch> {
        let (code, resolution, players) = {
            let mut mgr = self.lock();
            match mgr.game_believe(connection) {
                Ok((code, resolution)) => {
                    let players = mgr.lives_entries(code);
                    (code, resolution, players)
                }
                Err(err) => {
                    debug!(%connection, %err, "ignoring believe");
                    return Vec::new();
                }
            }
        };

        let actual_value = resolution.actual_roll.value();
        let mut events = vec![Dispatch::room(
            code,
            ServerEvent::MaexchenBelieved {
                believer_name: resolution.believer_name,
                announcer_name: resolution.announcer_name,
                was_maexchen: resolution.was_maexchen,
                actual_roll: roll_view(resolution.actual_roll),
                actual_name: dice::outcome_name(actual_value),
                loser_name: resolution.loser_name,
                lives_lost: resolution.lives_lost,
                players,
            },
        )];
        self.finish_resolution(code, resolution.status, &mut events)
            .await;
        events
    }

    /// Remove a connection from its room: explicit leave and socket drop
    /// share this path. A mid-round departure forfeits first.
    pub async fn leave(&self, connection: ConnectionId) -> Vec<Dispatch> {
        let forfeit = self.lock().game_forfeit(connection);
        let mut events = Vec::new();
        let mut settlement = None;
        if let Some((code, outcome)) = forfeit {
            match outcome {
                ForfeitOutcome::Continues { removed_name } => {
                    debug!(room = %code, %removed_name, "player forfeited mid-round");
                }
                ForfeitOutcome::TurnPassed { removed_name, next } => {
                    debug!(room = %code, %removed_name, "turn holder forfeited");
                    events.push(Dispatch::room(code, next_turn_event(&next)));
                }
                ForfeitOutcome::Over {
                    winner_connection,
                    winner_name,
                    pot,
                    ..
                } => settlement = Some((code, winner_connection, winner_name, pot)),
            }
        }

        let departure = self.lock().remove_member(connection);
        if let Ok(departure) = departure {
            if departure.refund > 0 {
                match self.ledger.credit(connection, departure.refund).await {
                    Ok(balance) => {
                        events.push(Dispatch::player(
                            connection,
                            ServerEvent::BalanceUpdate { balance },
                        ));
                    }
                    Err(err) => warn!(%connection, %err, "stake refund on leave failed"),
                }
            }
            if !departure.room_destroyed {
                if let Some(name) = departure.new_host_name {
                    events.push(Dispatch::room(
                        departure.code,
                        ServerEvent::HostChanged { name },
                    ));
                }
                let state = self.lock().room(departure.code).map(|r| r.state_event());
                if let Some(state) = state {
                    events.push(Dispatch::room(departure.code, state));
                }
            }
        }

        if let Some((code, winner_connection, winner_name, pot)) = settlement {
            self.settle_round(code, winner_connection, winner_name, pot, &mut events)
                .await;
        }
        events
    }

    async fn finish_resolution(
        &self,
        code: RoomCode,
        status: RoundStatus,
        events: &mut Vec<Dispatch>,
    ) {
        match status {
            RoundStatus::Continues(handoff) => {
                events.push(Dispatch::delayed_room(code, next_turn_event(&handoff)));
            }
            RoundStatus::Over {
                winner_connection,
                winner_name,
                pot,
            } => {
                self.settle_round(code, winner_connection, winner_name, pot, events)
                    .await;
            }
        }
    }

    /// Pay the pot to the survivor and reopen betting. The round stays "in
    /// progress" until the payout lands, which keeps start-round rejections
    /// correct while the credit is in flight.
    async fn settle_round(
        &self,
        code: RoomCode,
        winner_connection: ConnectionId,
        winner_name: String,
        pot: u64,
        events: &mut Vec<Dispatch>,
    ) {
        if pot > 0 {
            match self.ledger.credit(winner_connection, pot).await {
                Ok(balance) => {
                    events.push(Dispatch::player(
                        winner_connection,
                        ServerEvent::BalanceUpdate { balance },
                    ));
                }
                Err(err) => warn!(%winner_connection, pot, %err, "pot payout failed"),
            }
        }
        self.lock().clear_game(code);
        events.push(Dispatch::room(
            code,
            ServerEvent::RoundOver { winner_name, pot },
        ));
    }
}

fn roll_view(roll: dice::DiceRoll) -> RollView {
    RollView {
        d1: roll.d1,
        d2: roll.d2,
        value: roll.value(),
    }
}
