//! Currency balances owned by the network, not by the arena.

use crate::error::{ArenaError, ArenaResult};
use crate::item::{Currency, Price};
use arena_event_system::PlayerId;
use dashmap::DashMap;

pub trait CurrencyLedger: Send + Sync {
    fn balance(&self, player: PlayerId, currency: Currency) -> u64;

    /// Takes `amount` from the player's balance or fails without change.
    fn withdraw(&self, player: PlayerId, currency: Currency, amount: u64) -> ArenaResult<()>;

    fn can_afford(&self, player: PlayerId, price: Price) -> bool {
        self.balance(player, price.currency) >= price.amount
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: DashMap<(PlayerId, Currency), u64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&self, player: PlayerId, currency: Currency, amount: u64) {
        let mut balance = self.balances.entry((player, currency)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}

impl CurrencyLedger for InMemoryLedger {
    fn balance(&self, player: PlayerId, currency: Currency) -> u64 {
        self.balances
            .get(&(player, currency))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    fn withdraw(&self, player: PlayerId, currency: Currency, amount: u64) -> ArenaResult<()> {
        let mut balance = self.balances.entry((player, currency)).or_insert(0);
        if *balance < amount {
            return Err(ArenaError::Ledger(format!(
                "{} has {} {}, needs {}",
                player, *balance, currency, amount
            )));
        }
        *balance -= amount;
        Ok(())
    }
}
