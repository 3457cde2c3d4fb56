//! Game registry.
//!
//! Static metadata for every game the lobby fronts: display strings for the
//! lobby browser and the membership limits the room manager enforces. Only
//! Mäxchen runs a server-side turn engine; the other entries are relay rooms.

use std::collections::HashMap;

use parlor_types::protocol::GameListing;
use parlor_types::GameKind;

/// Metadata for one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameInfo {
    pub kind: GameKind,
    pub name: &'static str,
    pub description: &'static str,
    pub min_players: usize,
    pub max_players: usize,
    /// Whether this lobby runs the game's turn engine itself.
    pub has_turn_engine: bool,
}

fn builtin_info(kind: GameKind) -> GameInfo {
    match kind {
        GameKind::Maexchen => GameInfo {
            kind,
            name: "Mäxchen",
            description: "Bluffing dice. Out-announce the last claim or call the bluff.",
            min_players: 2,
            max_players: 12,
            has_turn_engine: true,
        },
        GameKind::Stocks => GameInfo {
            kind,
            name: "Stocks",
            description: "Trade a shared simulated market.",
            min_players: 1,
            max_players: 32,
            has_turn_engine: false,
        },
        GameKind::Slots => GameInfo {
            kind,
            name: "Slots",
            description: "Spin for chips.",
            min_players: 1,
            max_players: 16,
            has_turn_engine: false,
        },
        GameKind::Canvas => GameInfo {
            kind,
            name: "Canvas",
            description: "Shared drawing board with chat.",
            min_players: 1,
            max_players: 32,
            has_turn_engine: false,
        },
        GameKind::Sequencer => GameInfo {
            kind,
            name: "Sequencer",
            description: "Build a beat together.",
            min_players: 1,
            max_players: 16,
            has_turn_engine: false,
        },
        GameKind::TierList => GameInfo {
            kind,
            name: "Tier List",
            description: "Vote items into tiers.",
            min_players: 2,
            max_players: 32,
            has_turn_engine: false,
        },
        GameKind::WatchParty => GameInfo {
            kind,
            name: "Watch Party",
            description: "Watch videos in sync.",
            min_players: 1,
            max_players: 32,
            has_turn_engine: false,
        },
        GameKind::Duel => GameInfo {
            kind,
            name: "Duel",
            description: "1v1 brain-training match.",
            min_players: 2,
            max_players: 2,
            has_turn_engine: false,
        },
    }
}

/// Registry of available games with an active flag per entry.
#[derive(Clone, Debug)]
pub struct GameRegistry {
    games: HashMap<GameKind, GameInfo>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        let games = GameKind::ALL
            .iter()
            .map(|&kind| (kind, builtin_info(kind)))
            .collect();
        Self { games }
    }
}

impl GameRegistry {
    pub fn info(&self, kind: GameKind) -> Option<&GameInfo> {
        self.games.get(&kind)
    }

    /// Room capacity for a game. Unknown kinds get a conservative floor.
    pub fn max_players(&self, kind: GameKind) -> usize {
        self.info(kind).map(|info| info.max_players).unwrap_or(2)
    }

    /// Listings for the lobby browser, in declaration order.
    pub fn listings(&self) -> Vec<GameListing> {
        GameKind::ALL
            .iter()
            .filter_map(|kind| self.info(*kind))
            .map(|info| GameListing {
                id: info.kind,
                name: info.name.to_string(),
                description: info.description.to_string(),
                min_players: info.min_players,
                max_players: info.max_players,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_registered() {
        let registry = GameRegistry::default();
        for kind in GameKind::ALL {
            let info = registry.info(kind).expect("registered");
            assert!(info.min_players >= 1);
            assert!(info.max_players >= info.min_players);
        }
        assert_eq!(registry.listings().len(), GameKind::ALL.len());
    }

    #[test]
    fn maexchen_needs_contestants() {
        let registry = GameRegistry::default();
        let info = registry.info(GameKind::Maexchen).expect("registered");
        assert_eq!(info.min_players, 2);
        assert!(info.has_turn_engine);
    }
}
