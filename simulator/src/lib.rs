//! Local spin service for the roulette table.
//!
//! The simulator is the authoritative side of a round: it owns accounts and balances,
//! draws the winning number and settles bets with the same resolver the client uses.
//! Everything lives in memory.

mod api;
pub use api::Api;

pub mod accounts;
pub use accounts::{AccountError, AccountStore};

mod state;
pub use state::{SimulatorConfig, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

mod table;
pub use table::{win_rate, Simulator, SimulatorError};
