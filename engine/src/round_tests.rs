//! Full-round tests over the lobby service: betting economics, payouts, and
//! disconnect recovery, with a seeded rng and the in-memory ledger.

use std::sync::Arc;

use parlor_types::protocol::ServerEvent;
use parlor_types::{BetError, ConnectionId, GameKind, PlayerProfile};

use crate::dice::MAEXCHEN;
use crate::ledger::{InMemoryLedger, Ledger};
use crate::lobby::{Dispatch, Lobby};
use crate::registry::GameRegistry;

const BANKROLL: u64 = 1_000;

fn profile(name: &str) -> PlayerProfile {
    PlayerProfile {
        name: name.to_string(),
        avatar: "🎲".to_string(),
    }
}

struct Table {
    lobby: Lobby,
    ledger: Arc<InMemoryLedger>,
    connections: Vec<ConnectionId>,
}

/// Spin up a lobby with one Mäxchen room holding `names` players.
fn table(names: &[&str]) -> Table {
    let ledger = Arc::new(InMemoryLedger::new(BANKROLL));
    let lobby = Lobby::with_seed(GameRegistry::default(), ledger.clone(), 7);
    let connections: Vec<ConnectionId> = names.iter().map(|_| ConnectionId::random()).collect();

    let events = lobby
        .create_room(connections[0], GameKind::Maexchen, profile(names[0]))
        .expect("create room");
    let code = events
        .iter()
        .find_map(|d| match &d.event {
            ServerEvent::RoomCreated { code, .. } => Some(*code),
            _ => None,
        })
        .expect("room code");
    for (connection, name) in connections.iter().zip(names.iter()).skip(1) {
        lobby
            .join_room(*connection, code.as_str(), profile(name))
            .expect("join room");
    }
    Table {
        lobby,
        ledger,
        connections,
    }
}

fn find_event<'a, F, T>(events: &'a [Dispatch], pick: F) -> Option<T>
where
    F: Fn(&'a ServerEvent) -> Option<T>,
{
    events.iter().find_map(|d| pick(&d.event))
}

impl Table {
    async fn bet(&self, seat: usize, amount: u64) -> Vec<Dispatch> {
        self.lobby
            .place_bet(self.connections[seat], amount)
            .await
            .expect("bet accepted")
    }

    fn start(&self) -> Vec<Dispatch> {
        self.lobby
            .start_round(self.connections[0])
            .expect("round starts")
    }

    /// Roll and return the private result value.
    fn roll_value(&self, seat: usize) -> u8 {
        let events = self.lobby.roll(self.connections[seat]);
        find_event(&events, |e| match e {
            ServerEvent::RollResult { value, .. } => Some(*value),
            _ => None,
        })
        .expect("roll result")
    }

    fn set_lives(&self, lives: &[u8]) {
        let mut mgr = self.lobby.lock();
        let code = mgr.room_of(self.connections[0]).expect("room").code;
        let game = mgr
            .room_mut(code)
            .and_then(|room| room.game.as_mut())
            .expect("game in progress");
        for (player, lives) in game.players.iter_mut().zip(lives) {
            player.lives = *lives;
        }
    }
}

#[tokio::test]
async fn bets_are_debited_and_the_pot_is_conserved() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 100).await;
    t.bet(1, 100).await;
    assert_eq!(t.ledger.balance(t.connections[0]).await, BANKROLL - 100);
    assert_eq!(t.ledger.balance(t.connections[1]).await, BANKROLL - 100);

    let events = t.start();
    let pot = find_event(&events, |e| match e {
        ServerEvent::GameStarted { pot, players } => {
            assert_eq!(players.len(), 2);
            assert!(players.iter().all(|p| p.lives == 3));
            Some(*pot)
        }
        _ => None,
    })
    .expect("game started");
    assert_eq!(pot, 200);
}

#[tokio::test]
async fn rebetting_the_same_amount_is_a_no_op() {
    let t = table(&["Alice", "Bob"]);
    let events = t.bet(0, 100).await;
    assert!(!events.is_empty());
    let balance_after_first = t.ledger.balance(t.connections[0]).await;

    let events = t.bet(0, 100).await;
    assert!(events.is_empty(), "no ledger call, no broadcast");
    assert_eq!(t.ledger.balance(t.connections[0]).await, balance_after_first);
}

#[tokio::test]
async fn changing_a_bet_refunds_before_it_debits() {
    let ledger = Arc::new(InMemoryLedger::new(100));
    let lobby = Lobby::with_seed(GameRegistry::default(), ledger.clone(), 7);
    let alice = ConnectionId::random();
    let bob = ConnectionId::random();
    let events = lobby
        .create_room(alice, GameKind::Maexchen, profile("Alice"))
        .expect("create");
    let code = find_event(&events, |e| match e {
        ServerEvent::RoomCreated { code, .. } => Some(*code),
        _ => None,
    })
    .expect("code");
    lobby
        .join_room(bob, code.as_str(), profile("Bob"))
        .expect("join");

    // The whole bankroll goes onto the table, then the stake moves down to
    // 60. Refund-first ordering makes this affordable.
    lobby.place_bet(alice, 100).await.expect("bet");
    assert_eq!(ledger.balance(alice).await, 0);
    lobby.place_bet(alice, 60).await.expect("rebet");
    assert_eq!(ledger.balance(alice).await, 40);
}

#[tokio::test]
async fn unaffordable_change_restores_the_old_stake() {
    let ledger = Arc::new(InMemoryLedger::new(120));
    let lobby = Lobby::with_seed(GameRegistry::default(), ledger.clone(), 7);
    let alice = ConnectionId::random();
    let bob = ConnectionId::random();
    let events = lobby
        .create_room(alice, GameKind::Maexchen, profile("Alice"))
        .expect("create");
    let code = find_event(&events, |e| match e {
        ServerEvent::RoomCreated { code, .. } => Some(*code),
        _ => None,
    })
    .expect("code");
    lobby
        .join_room(bob, code.as_str(), profile("Bob"))
        .expect("join");

    lobby.place_bet(alice, 100).await.expect("bet");
    assert_eq!(ledger.balance(alice).await, 20);

    // 150 cannot be funded even after the refund: the old stake must be
    // re-held and the balance must end exactly where it started.
    let err = lobby.place_bet(alice, 150).await.expect_err("rejected");
    assert_eq!(err, BetError::InsufficientBalance);
    assert_eq!(ledger.balance(alice).await, 20);
    let mgr = lobby.lock();
    let room = mgr.room_of(alice).expect("room");
    assert_eq!(room.bets.get(&alice), Some(&100));
}

#[tokio::test]
async fn withdrawing_the_only_stake_releases_the_required_bet() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 100).await;
    let events = t.bet(0, 0).await;
    let required = find_event(&events, |e| match e {
        ServerEvent::BetsUpdate { required_bet, bets } => {
            assert!(bets.is_empty());
            Some(*required_bet)
        }
        _ => None,
    })
    .expect("bets update");
    assert_eq!(required, None);
    assert_eq!(t.ledger.balance(t.connections[0]).await, BANKROLL);
}

#[tokio::test]
async fn mismatched_stake_is_surfaced_with_a_reason() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 100).await;
    let err = t
        .lobby
        .place_bet(t.connections[1], 60)
        .await
        .expect_err("mismatch");
    assert_eq!(err, BetError::BetMismatch { required: 100 });
    assert_eq!(t.ledger.balance(t.connections[1]).await, BANKROLL);
}

#[tokio::test]
async fn off_turn_calls_produce_nothing() {
    let t = table(&["Alice", "Bob"]);
    t.start();

    // Bob is not the current player; every game call is a silent no-op.
    assert!(t.lobby.roll(t.connections[1]).is_empty());
    assert!(t.lobby.announce(t.connections[1], 55).is_empty());
    assert!(t.lobby.challenge(t.connections[1]).await.is_empty());
    assert!(t.lobby.believe(t.connections[1]).await.is_empty());

    // Alice's turn is intact.
    let events = t.lobby.roll(t.connections[0]);
    assert!(find_event(&events, |e| match e {
        ServerEvent::DiceRolled { player_name } => Some(player_name.clone()),
        _ => None,
    })
    .is_some());
}

#[tokio::test]
async fn a_standing_maexchen_claim_blocks_rolling() {
    let t = table(&["Alice", "Bob"]);
    t.start();
    t.roll_value(0);
    let events = t.lobby.announce(t.connections[0], MAEXCHEN);
    let forced = find_event(&events, |e| match e {
        ServerEvent::NextTurn {
            must_respond_to_maexchen,
            ..
        } => Some(*must_respond_to_maexchen),
        _ => None,
    })
    .expect("turn handoff");
    assert!(forced);

    assert!(t.lobby.roll(t.connections[1]).is_empty());
}

#[tokio::test]
async fn disputed_maexchen_resolves_with_a_double_penalty() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 50).await;
    t.bet(1, 50).await;
    t.start();
    t.roll_value(0);
    t.lobby.announce(t.connections[0], MAEXCHEN);

    let events = t.lobby.challenge(t.connections[1]).await;
    let (was_lying, loser, lives_lost) = find_event(&events, |e| match e {
        ServerEvent::ChallengeResult {
            was_lying,
            loser_name,
            lives_lost,
            ..
        } => Some((*was_lying, loser_name.clone(), *lives_lost)),
        _ => None,
    })
    .expect("challenge result");

    // Whichever way the dice fell, the Mäxchen penalty applies, and the
    // loser is determined by the truth of the claim.
    assert_eq!(lives_lost, 2);
    if was_lying {
        assert_eq!(loser, "Alice");
    } else {
        assert_eq!(loser, "Bob");
    }
    // The chain reset for the next leg.
    let mgr = t.lobby.lock();
    let room = mgr.room_of(t.connections[0]).expect("room");
    let game = room.game.as_ref().expect("round continues");
    assert!(game.previous_announcement().is_none());
}

#[tokio::test]
async fn elimination_pays_the_pot_and_reopens_betting() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 100).await;
    t.bet(1, 100).await;
    t.start();
    t.set_lives(&[1, 1]);

    t.roll_value(0);
    t.lobby.announce(t.connections[0], MAEXCHEN);
    let events = t.lobby.challenge(t.connections[1]).await;

    let (winner, pot) = find_event(&events, |e| match e {
        ServerEvent::RoundOver { winner_name, pot } => Some((winner_name.clone(), *pot)),
        _ => None,
    })
    .expect("round over");
    assert_eq!(pot, 200);

    let (winner_seat, loser_seat) = if winner == "Alice" { (0, 1) } else { (1, 0) };
    assert_eq!(
        t.ledger.balance(t.connections[winner_seat]).await,
        BANKROLL - 100 + 200
    );
    assert_eq!(
        t.ledger.balance(t.connections[loser_seat]).await,
        BANKROLL - 100
    );

    // The room survives for a replay and betting is open again.
    let mgr = t.lobby.lock();
    let room = mgr.room_of(t.connections[0]).expect("room persists");
    assert!(room.game.is_none());
    drop(mgr);
}

#[tokio::test]
async fn disconnect_of_the_turn_holder_passes_play_on() {
    let t = table(&["Alice", "Bob", "Carol"]);
    t.start();
    t.roll_value(0);
    t.lobby.announce(t.connections[0], 54);

    // Bob holds the turn and drops. Play passes to Carol with a fresh chain.
    let events = t.lobby.leave(t.connections[1]).await;
    let next = find_event(&events, |e| match e {
        ServerEvent::NextTurn { player_name, .. } => Some(player_name.clone()),
        _ => None,
    })
    .expect("turn passes");
    assert_eq!(next, "Carol");

    let mgr = t.lobby.lock();
    let room = mgr.room_of(t.connections[0]).expect("room");
    let game = room.game.as_ref().expect("round continues");
    assert!(game.previous_announcement().is_none());
    assert_eq!(game.current_player().name, "Carol");
    assert_eq!(room.players.len(), 2, "bob left the roster");
}

#[tokio::test]
async fn disconnect_down_to_one_survivor_settles_the_round() {
    let t = table(&["Alice", "Bob"]);
    t.bet(0, 80).await;
    t.bet(1, 80).await;
    t.start();

    let events = t.lobby.leave(t.connections[1]).await;
    let (winner, pot) = find_event(&events, |e| match e {
        ServerEvent::RoundOver { winner_name, pot } => Some((winner_name.clone(), *pot)),
        _ => None,
    })
    .expect("round over");
    assert_eq!(winner, "Alice");
    assert_eq!(pot, 160);
    assert_eq!(
        t.ledger.balance(t.connections[0]).await,
        BANKROLL - 80 + 160
    );
    // The forfeiting player's stake stays in the pot.
    assert_eq!(t.ledger.balance(t.connections[1]).await, BANKROLL - 80);
}

#[tokio::test]
async fn leaving_before_the_round_refunds_the_stake() {
    let t = table(&["Alice", "Bob", "Carol"]);
    t.bet(1, 40).await;
    let events = t.lobby.leave(t.connections[1]).await;
    assert!(find_event(&events, |e| match e {
        ServerEvent::BalanceUpdate { balance } => Some(*balance),
        _ => None,
    })
    .is_some());
    assert_eq!(t.ledger.balance(t.connections[1]).await, BANKROLL);
}

#[tokio::test]
async fn host_departure_promotes_the_next_player() {
    let t = table(&["Alice", "Bob", "Carol"]);
    let events = t.lobby.leave(t.connections[0]).await;
    let new_host = find_event(&events, |e| match e {
        ServerEvent::HostChanged { name } => Some(name.clone()),
        _ => None,
    })
    .expect("host changed");
    assert_eq!(new_host, "Bob");

    // Bob can now start a round.
    assert!(t.lobby.start_round(t.connections[1]).is_ok());
}
