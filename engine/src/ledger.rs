//! Currency ledger seam.
//!
//! Balances are shared across every game a player touches, so each call is
//! atomic on its own: a debit checks and subtracts under one lock and fails
//! closed on insufficient funds. The engine never reconstructs a balance
//! from separate read and write steps.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use parlor_types::{ConnectionId, LedgerError, INITIAL_CHIPS};

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance of an account, creating it at the starting balance if
    /// it has never been seen.
    async fn balance(&self, account: ConnectionId) -> u64;

    /// Atomically subtract `amount`. Returns the new balance, or fails
    /// closed without touching the account.
    async fn debit(&self, account: ConnectionId, amount: u64) -> Result<u64, LedgerError>;

    /// Atomically add `amount`. Returns the new balance.
    async fn credit(&self, account: ConnectionId, amount: u64) -> Result<u64, LedgerError>;
}

/// Process-local ledger. A persistent backend slots in behind the same
/// trait.
pub struct InMemoryLedger {
    starting_balance: u64,
    balances: RwLock<HashMap<ConnectionId, u64>>,
}

impl InMemoryLedger {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            starting_balance,
            balances: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(INITIAL_CHIPS)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance(&self, account: ConnectionId) -> u64 {
        let mut balances = self.balances.write().await;
        *balances.entry(account).or_insert(self.starting_balance)
    }

    async fn debit(&self, account: ConnectionId, amount: u64) -> Result<u64, LedgerError> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(account).or_insert(self.starting_balance);
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        *balance -= amount;
        Ok(*balance)
    }

    async fn credit(&self, account: ConnectionId, amount: u64) -> Result<u64, LedgerError> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(account).or_insert(self.starting_balance);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(*balance)
    }
}
