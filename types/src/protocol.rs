//! Wire protocol for the lobby WebSocket endpoint.
//!
//! Every frame is a JSON object with a `type` tag. Inbound frames are
//! commands from one connection; outbound frames are either room-wide
//! broadcasts or replies targeted at a single connection. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::{GameKind, RoomCode};

/// Commands a client may send.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    CreateRoom {
        game: GameKind,
        name: String,
        #[serde(default)]
        avatar: String,
    },
    JoinRoom {
        code: String,
        name: String,
        #[serde(default)]
        avatar: String,
    },
    LeaveRoom,
    ListGames,
    PlaceBet {
        amount: u64,
    },
    StartGame,
    Roll,
    Announce {
        value: u8,
    },
    Challenge,
    BelieveMaexchen,
}

/// One row of the room-wide bet table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BetEntry {
    pub name: String,
    pub bet: u64,
}

/// One row of the in-round roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LivesEntry {
    pub name: String,
    pub lives: u8,
}

/// One row of the pre-round roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    pub name: String,
    pub avatar: String,
    #[serde(rename = "isHost")]
    pub is_host: bool,
}

/// A revealed pair of dice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RollView {
    pub d1: u8,
    pub d2: u8,
    pub value: u8,
}

/// Registry metadata for one game, as shown in the lobby browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameListing {
    pub id: GameKind,
    pub name: String,
    pub description: String,
    #[serde(rename = "minPlayers")]
    pub min_players: usize,
    #[serde(rename = "maxPlayers")]
    pub max_players: usize,
}

/// Events the server may send.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    RoomCreated {
        code: RoomCode,
        game: GameKind,
    },
    RoomState {
        code: RoomCode,
        game: GameKind,
        host: String,
        players: Vec<PlayerEntry>,
        bets: Vec<BetEntry>,
        #[serde(rename = "requiredBet")]
        required_bet: Option<u64>,
        #[serde(rename = "inProgress")]
        in_progress: bool,
    },
    HostChanged {
        name: String,
    },
    GameList {
        games: Vec<GameListing>,
    },
    BetsUpdate {
        bets: Vec<BetEntry>,
        #[serde(rename = "requiredBet")]
        required_bet: Option<u64>,
    },
    GameStarted {
        players: Vec<LivesEntry>,
        pot: u64,
    },
    DiceRolled {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    RollResult {
        d1: u8,
        d2: u8,
        value: u8,
        name: String,
    },
    PlayerAnnounced {
        #[serde(rename = "playerIndex")]
        player_index: usize,
        #[serde(rename = "playerName")]
        player_name: String,
        value: u8,
        #[serde(rename = "valueName")]
        value_name: String,
    },
    NextTurn {
        #[serde(rename = "playerIndex")]
        player_index: usize,
        #[serde(rename = "playerName")]
        player_name: String,
        #[serde(rename = "mustRespondToMaexchen")]
        must_respond_to_maexchen: bool,
    },
    ChallengeResult {
        #[serde(rename = "challengerName")]
        challenger_name: String,
        #[serde(rename = "announcerName")]
        announcer_name: String,
        #[serde(rename = "claimedValue")]
        claimed_value: u8,
        #[serde(rename = "claimedName")]
        claimed_name: String,
        #[serde(rename = "actualRoll")]
        actual_roll: RollView,
        #[serde(rename = "actualName")]
        actual_name: String,
        #[serde(rename = "wasLying")]
        was_lying: bool,
        #[serde(rename = "loserName")]
        loser_name: String,
        #[serde(rename = "livesLost")]
        lives_lost: u8,
        players: Vec<LivesEntry>,
    },
    MaexchenBelieved {
        #[serde(rename = "believerName")]
        believer_name: String,
        #[serde(rename = "announcerName")]
        announcer_name: String,
        #[serde(rename = "wasMaexchen")]
        was_maexchen: bool,
        #[serde(rename = "actualRoll")]
        actual_roll: RollView,
        #[serde(rename = "actualName")]
        actual_name: String,
        #[serde(rename = "loserName")]
        loser_name: Option<String>,
        #[serde(rename = "livesLost")]
        lives_lost: u8,
        players: Vec<LivesEntry>,
    },
    RoundOver {
        #[serde(rename = "winnerName")]
        winner_name: String,
        pot: u64,
    },
    BalanceUpdate {
        balance: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_tags_are_kebab_case() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"place-bet","amount":100}"#).expect("parse");
        assert_eq!(cmd, ClientCommand::PlaceBet { amount: 100 });

        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"believe-maexchen"}"#).expect("parse");
        assert_eq!(cmd, ClientCommand::BelieveMaexchen);

        let cmd: ClientCommand = serde_json::from_str(
            r#"{"type":"join-room","code":"AB12","name":"Alice","avatar":"🎲"}"#,
        )
        .expect("parse");
        assert!(matches!(cmd, ClientCommand::JoinRoom { .. }));
    }

    #[test]
    fn malformed_inbound_is_an_error() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"warp-ten"}"#).is_err());
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"announce"}"#).is_err());
    }

    #[test]
    fn outbound_uses_camel_case_fields() {
        let event = ServerEvent::DiceRolled {
            player_name: "Bob".to_string(),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert_eq!(json, r#"{"type":"dice-rolled","playerName":"Bob"}"#);

        let event = ServerEvent::BetsUpdate {
            bets: vec![BetEntry {
                name: "Bob".to_string(),
                bet: 50,
            }],
            required_bet: Some(50),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""requiredBet":50"#));
    }
}
