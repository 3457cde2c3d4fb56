use serde::{Deserialize, Serialize};

/// Every game the lobby can front. Only Mäxchen carries a turn engine on the
/// server; the rest are broadcast-relay rooms handled by their own services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    Maexchen,
    Stocks,
    Slots,
    Canvas,
    Sequencer,
    TierList,
    WatchParty,
    Duel,
}

impl GameKind {
    pub const ALL: [GameKind; 8] = [
        GameKind::Maexchen,
        GameKind::Stocks,
        GameKind::Slots,
        GameKind::Canvas,
        GameKind::Sequencer,
        GameKind::TierList,
        GameKind::WatchParty,
        GameKind::Duel,
    ];
}
