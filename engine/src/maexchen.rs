//! The Mäxchen turn engine.
//!
//! One value of [`MaexchenGame`] is the whole state of a round: a roster
//! snapshot taken at start time, whose turn it is, the standing announcement
//! (with the concealed roll behind it), and the pot. Transitions are pure;
//! dice are rolled by the caller and handed in, and ledger movements happen
//! outside this module. Illegal calls return a [`GameError`] that the
//! transport layer drops without a reply.
//!
//! A turn works through three phases:
//! - `AwaitingRoll`: the current player may roll, or — when a claim is
//!   standing — challenge it instead.
//! - `AwaitingAnnouncement`: the current player has rolled and must claim an
//!   outcome (truthfully or not).
//! - `ForcedResponse`: the standing claim is Mäxchen; rolling is off the
//!   table and the current player must challenge or believe.

use parlor_types::{
    ConnectionId, PlayerProfile, DEFAULT_LIFE_PENALTY, MAEXCHEN_LIFE_PENALTY, STARTING_LIVES,
};

use crate::dice::{self, DiceRoll, MAEXCHEN};

/// One seat in the round snapshot. Independent of the room's live player
/// list so later joins and leaves cannot corrupt an in-progress round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamePlayer {
    pub connection_id: ConnectionId,
    pub name: String,
    pub avatar: String,
    pub lives: u8,
}

/// The most recent public claim and the concealed roll backing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub player_index: usize,
    pub player_name: String,
    pub claimed_value: u8,
    pub actual_roll: DiceRoll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingRoll,
    AwaitingAnnouncement,
    ForcedResponse,
}

/// Rejected transitions. These indicate a desynchronized or malicious
/// client; callers drop them silently rather than answering over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("not this connection's turn")]
    NotYourTurn,
    #[error("operation not valid in the current phase")]
    WrongPhase,
    #[error("claimed value is not a rankable outcome")]
    UnknownOutcome,
    #[error("claimed value does not outrank the standing claim")]
    ClaimTooLow,
    #[error("no standing claim to respond to")]
    NoStandingClaim,
    #[error("standing claim is not Mäxchen")]
    ClaimNotMaexchen,
}

/// Where the turn goes after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnHandoff {
    pub player_index: usize,
    pub player_name: String,
    /// The new current player faces a standing Mäxchen claim and may only
    /// challenge or believe.
    pub forced: bool,
}

/// Whether a resolution ended the round.
#[derive(Clone, Debug)]
pub enum RoundStatus {
    Continues(TurnHandoff),
    Over {
        winner_connection: ConnectionId,
        winner_name: String,
        pot: u64,
    },
}

/// Everything a challenge reveals.
#[derive(Clone, Debug)]
pub struct ChallengeResolution {
    pub challenger_name: String,
    pub announcer_name: String,
    pub claimed_value: u8,
    pub actual_roll: DiceRoll,
    pub was_lying: bool,
    pub loser_name: String,
    pub lives_lost: u8,
    pub status: RoundStatus,
}

/// Outcome of believing a standing Mäxchen claim. A false claim punishes the
/// believer, not the announcer: by believing instead of challenging, the
/// believer accepted the claim at face value.
#[derive(Clone, Debug)]
pub struct BelieveResolution {
    pub believer_name: String,
    pub announcer_name: String,
    pub was_maexchen: bool,
    pub actual_roll: DiceRoll,
    pub loser_name: Option<String>,
    pub lives_lost: u8,
    pub status: RoundStatus,
}

/// Result of removing a disconnected player from the rotation.
#[derive(Clone, Debug)]
pub enum ForfeitOutcome {
    /// The player was not current; the round continues unchanged.
    Continues { removed_name: String },
    /// The player held the turn; the chain reset and the turn moved on.
    TurnPassed {
        removed_name: String,
        next: TurnHandoff,
    },
    /// Only one player is left alive; the round is over.
    Over {
        removed_name: String,
        winner_connection: ConnectionId,
        winner_name: String,
        pot: u64,
    },
}

/// Index of the next player after `from` (wrapping) with lives remaining.
/// Returns `from` itself when nobody else is alive. Must not be called with
/// an all-dead roster.
pub fn next_alive_index(players: &[GamePlayer], from: usize) -> usize {
    debug_assert!(players.iter().any(|p| p.lives > 0));
    let len = players.len();
    for step in 1..=len {
        let idx = (from + step) % len;
        if players[idx].lives > 0 {
            return idx;
        }
    }
    from
}

/// Players still in the rotation, in seat order.
pub fn alive_players(players: &[GamePlayer]) -> Vec<&GamePlayer> {
    players.iter().filter(|p| p.lives > 0).collect()
}

#[derive(Debug, PartialEq, Eq)]
pub struct MaexchenGame {
    pub(crate) players: Vec<GamePlayer>,
    pub(crate) current_index: usize,
    pub(crate) phase: TurnPhase,
    pub(crate) previous_announcement: Option<Announcement>,
    pub(crate) current_roll: Option<DiceRoll>,
    pub(crate) pot: u64,
}

impl MaexchenGame {
    /// Snapshot a roster into a fresh round. The first seat opens.
    pub fn start<'a, I>(roster: I, pot: u64) -> Self
    where
        I: IntoIterator<Item = (ConnectionId, &'a PlayerProfile)>,
    {
        let players = roster
            .into_iter()
            .map(|(connection_id, profile)| GamePlayer {
                connection_id,
                name: profile.name.clone(),
                avatar: profile.avatar.clone(),
                lives: STARTING_LIVES,
            })
            .collect();
        Self {
            players,
            current_index: 0,
            phase: TurnPhase::AwaitingRoll,
            previous_announcement: None,
            current_roll: None,
            pot,
        }
    }

    pub fn players(&self) -> &[GamePlayer] {
        &self.players
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_player(&self) -> &GamePlayer {
        &self.players[self.current_index]
    }

    pub fn previous_announcement(&self) -> Option<&Announcement> {
        self.previous_announcement.as_ref()
    }

    fn ensure_current(&self, connection: ConnectionId) -> Result<(), GameError> {
        if self.current_player().connection_id == connection {
            Ok(())
        } else {
            Err(GameError::NotYourTurn)
        }
    }

    /// Accept a roll for the current player. The outcome stays concealed;
    /// only the roller learns the faces.
    pub fn roll(&mut self, connection: ConnectionId, roll: DiceRoll) -> Result<DiceRoll, GameError> {
        self.ensure_current(connection)?;
        match self.phase {
            TurnPhase::AwaitingRoll => {}
            // A standing Mäxchen claim forces challenge-or-believe.
            TurnPhase::ForcedResponse | TurnPhase::AwaitingAnnouncement => {
                return Err(GameError::WrongPhase)
            }
        }
        self.current_roll = Some(roll);
        self.phase = TurnPhase::AwaitingAnnouncement;
        Ok(roll)
    }

    /// Publicly claim an outcome for the concealed roll. The claim need not
    /// be true, but it must outrank the standing claim (if any) and come
    /// from the rankable outcome set.
    pub fn announce(
        &mut self,
        connection: ConnectionId,
        claimed_value: u8,
    ) -> Result<TurnHandoff, GameError> {
        self.ensure_current(connection)?;
        if self.phase != TurnPhase::AwaitingAnnouncement {
            return Err(GameError::WrongPhase);
        }
        if dice::rank(claimed_value).is_none() {
            return Err(GameError::UnknownOutcome);
        }
        if let Some(previous) = &self.previous_announcement {
            if !dice::outranks(claimed_value, previous.claimed_value) {
                return Err(GameError::ClaimTooLow);
            }
        }
        let actual_roll = self.current_roll.take().ok_or(GameError::WrongPhase)?;
        let announcer_name = self.current_player().name.clone();
        self.previous_announcement = Some(Announcement {
            player_index: self.current_index,
            player_name: announcer_name,
            claimed_value,
            actual_roll,
        });

        let next_index = next_alive_index(&self.players, self.current_index);
        self.current_index = next_index;
        let forced = claimed_value == MAEXCHEN;
        self.phase = if forced {
            TurnPhase::ForcedResponse
        } else {
            TurnPhase::AwaitingRoll
        };
        Ok(TurnHandoff {
            player_index: next_index,
            player_name: self.players[next_index].name.clone(),
            forced,
        })
    }

    /// Dispute the standing claim, revealing the concealed roll. A lying
    /// announcer loses lives; a truthful one costs the challenger instead.
    pub fn challenge(&mut self, connection: ConnectionId) -> Result<ChallengeResolution, GameError> {
        self.ensure_current(connection)?;
        if self.phase == TurnPhase::AwaitingAnnouncement {
            // Rolling commits the player to announcing.
            return Err(GameError::WrongPhase);
        }
        let previous = self
            .previous_announcement
            .as_ref()
            .ok_or(GameError::NoStandingClaim)?;

        let claimed_value = previous.claimed_value;
        let actual_roll = previous.actual_roll;
        let announcer_index = previous.player_index;
        let announcer_name = previous.player_name.clone();
        let challenger_index = self.current_index;
        let challenger_name = self.current_player().name.clone();

        let was_lying = dice::outranks(claimed_value, actual_roll.value());
        let loser_index = if was_lying {
            announcer_index
        } else {
            challenger_index
        };
        let lives_lost = if claimed_value == MAEXCHEN {
            MAEXCHEN_LIFE_PENALTY
        } else {
            DEFAULT_LIFE_PENALTY
        };
        let loser_name = self.players[loser_index].name.clone();
        let status = self.resolve(loser_index, lives_lost);

        Ok(ChallengeResolution {
            challenger_name,
            announcer_name,
            claimed_value,
            actual_roll,
            was_lying,
            loser_name,
            lives_lost,
            status,
        })
    }

    /// Accept a standing Mäxchen claim without rolling. A true claim costs
    /// nobody; a false one costs the believer the Mäxchen penalty.
    pub fn believe(&mut self, connection: ConnectionId) -> Result<BelieveResolution, GameError> {
        self.ensure_current(connection)?;
        if self.phase == TurnPhase::AwaitingAnnouncement {
            return Err(GameError::WrongPhase);
        }
        let previous = self
            .previous_announcement
            .as_ref()
            .ok_or(GameError::NoStandingClaim)?;
        if previous.claimed_value != MAEXCHEN {
            return Err(GameError::ClaimNotMaexchen);
        }

        let announcer_name = previous.player_name.clone();
        let actual_roll = previous.actual_roll;
        let believer_index = self.current_index;
        let believer_name = self.current_player().name.clone();

        let was_maexchen = actual_roll.value() == MAEXCHEN;
        let (loser_name, lives_lost) = if was_maexchen {
            (None, 0)
        } else {
            (Some(believer_name.clone()), MAEXCHEN_LIFE_PENALTY)
        };
        let status = self.resolve(believer_index, lives_lost);

        Ok(BelieveResolution {
            believer_name,
            announcer_name,
            was_maexchen,
            actual_roll,
            loser_name,
            lives_lost,
            status,
        })
    }

    /// Drop a disconnected player from the rotation. Reconnection is not
    /// supported mid-round; the seat stays dead for the rest of the round.
    pub fn remove_player(&mut self, connection: ConnectionId) -> Option<ForfeitOutcome> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection_id == connection)?;
        if self.players[index].lives == 0 {
            return None;
        }
        if alive_players(&self.players).len() == 1 {
            // Sole survivor leaving a round that is already being settled.
            return None;
        }
        let removed_name = self.players[index].name.clone();
        self.players[index].lives = 0;

        let alive = alive_players(&self.players);
        if alive.len() <= 1 {
            let winner = alive.first().expect("at least one live player remains");
            return Some(ForfeitOutcome::Over {
                removed_name,
                winner_connection: winner.connection_id,
                winner_name: winner.name.clone(),
                pot: self.pot,
            });
        }

        if index == self.current_index {
            // Same recovery as a challenge resolution: fresh chain, next
            // alive player opens.
            self.previous_announcement = None;
            self.current_roll = None;
            let next_index = next_alive_index(&self.players, index);
            self.current_index = next_index;
            self.phase = TurnPhase::AwaitingRoll;
            return Some(ForfeitOutcome::TurnPassed {
                removed_name,
                next: TurnHandoff {
                    player_index: next_index,
                    player_name: self.players[next_index].name.clone(),
                    forced: false,
                },
            });
        }

        Some(ForfeitOutcome::Continues { removed_name })
    }

    /// Apply a life penalty and restart or finish the round. The chain
    /// resets either way; a surviving loser opens the next chain.
    fn resolve(&mut self, loser_index: usize, lives_lost: u8) -> RoundStatus {
        self.players[loser_index].lives =
            self.players[loser_index].lives.saturating_sub(lives_lost);
        self.previous_announcement = None;
        self.current_roll = None;

        let alive = alive_players(&self.players);
        if alive.len() <= 1 {
            let winner = alive.first().expect("loser cannot be the last one alive");
            return RoundStatus::Over {
                winner_connection: winner.connection_id,
                winner_name: winner.name.clone(),
                pot: self.pot,
            };
        }

        let next_index = if self.players[loser_index].lives > 0 {
            loser_index
        } else {
            next_alive_index(&self.players, loser_index)
        };
        self.current_index = next_index;
        self.phase = TurnPhase::AwaitingRoll;
        RoundStatus::Continues(TurnHandoff {
            player_index: next_index,
            player_name: self.players[next_index].name.clone(),
            forced: false,
        })
    }
}
