use roulette_types::{INITIAL_BALANCE, MAX_STAKE_PER_BET};
use rust_decimal::Decimal;
use serde::Serialize;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 1_000;

#[derive(Clone, Debug, Serialize)]
pub struct SimulatorConfig {
    /// Balance credited to every new account.
    pub initial_balance: Decimal,
    /// Largest stake accepted on a single bet.
    pub max_stake_per_bet: Decimal,
    /// Seed for the wheel. Unset draws from OS entropy.
    pub rng_seed: Option<u64>,
    /// Records returned by `/api/history` when no limit is given.
    pub history_limit: usize,
    /// Browser origins allowed by CORS. `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::from(INITIAL_BALANCE),
            max_stake_per_bet: Decimal::from(MAX_STAKE_PER_BET),
            rng_seed: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_balance < Decimal::ZERO {
            return Err("initial_balance must not be negative");
        }
        if self.max_stake_per_bet <= Decimal::ZERO {
            return Err("max_stake_per_bet must be greater than zero");
        }
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            return Err("history_limit must be between 1 and 1000");
        }
        Ok(())
    }

    /// Clamp a requested history page size to `1..=MAX_HISTORY_LIMIT`.
    pub fn history_page(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.history_limit)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}
