/// Maximum display-name length accepted at registration.
pub const MAX_NAME_LENGTH: usize = 32;

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// Lives each player starts a round with.
pub const STARTING_LIVES: u8 = 3;

/// Minimum players required before the host may start a round.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Per-round cap on a single player's stake.
pub const MAX_BET: u64 = 1_000;

/// Chips granted to an account the first time the ledger sees it.
pub const INITIAL_CHIPS: u64 = 1_000;

/// Lives lost when a disputed or believed claim involves Mäxchen.
pub const MAEXCHEN_LIFE_PENALTY: u8 = 2;

/// Lives lost on an ordinary challenge resolution.
pub const DEFAULT_LIFE_PENALTY: u8 = 1;

/// Delay before the post-resolution turn announcement goes out, giving
/// clients time to render the reveal.
pub const DEFAULT_REVEAL_DELAY_MS: u64 = 3_000;
