use thiserror::Error;

/// Membership failures. Every variant maps 1:1 to a wire error code so the
/// requester learns exactly which precondition failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("no room with that code")]
    RoomNotFound,
    #[error("a round is already in progress")]
    GameInProgress,
    #[error("room is full")]
    RoomFull,
    #[error("already a member of this room")]
    AlreadyJoined,
    #[error("not a member of any room")]
    NotInRoom,
    #[error("only the host may do that")]
    NotHost,
    #[error("at least {0} players are required to start")]
    NotEnoughPlayers(usize),
    #[error("could not allocate an unused room code")]
    CodeSpaceExhausted,
}

impl LobbyError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::RoomNotFound => "ROOM_NOT_FOUND",
            LobbyError::GameInProgress => "GAME_IN_PROGRESS",
            LobbyError::RoomFull => "ROOM_FULL",
            LobbyError::AlreadyJoined => "ALREADY_JOINED",
            LobbyError::NotInRoom => "NOT_IN_ROOM",
            LobbyError::NotHost => "NOT_HOST",
            LobbyError::NotEnoughPlayers(_) => "NOT_ENOUGH_PLAYERS",
            LobbyError::CodeSpaceExhausted => "CODE_SPACE_EXHAUSTED",
        }
    }
}

/// Economic failures during the betting phase. Unlike protocol violations,
/// these are always surfaced to the requester.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BetError {
    #[error("bets are closed while a round is in progress")]
    BettingClosed,
    #[error("all stakes in a room must match {required}")]
    BetMismatch { required: u64 },
    #[error("stake exceeds the per-round cap of {cap}")]
    OverCap { cap: u64 },
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("not a member of any room")]
    NotInRoom,
    #[error("ledger unavailable, try again")]
    LedgerUnavailable,
}

impl BetError {
    pub fn code(&self) -> &'static str {
        match self {
            BetError::BettingClosed => "BETTING_CLOSED",
            BetError::BetMismatch { .. } => "BET_MISMATCH",
            BetError::OverCap { .. } => "BET_OVER_CAP",
            BetError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            BetError::NotInRoom => "NOT_IN_ROOM",
            BetError::LedgerUnavailable => "LEDGER_ERROR",
        }
    }
}

/// Failures reported by the currency ledger. Every call is atomic; a debit
/// that would overdraw fails closed without touching the balance.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("balance overflow")]
    BalanceOverflow,
}
