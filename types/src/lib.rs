//! Common types shared by the roulette execution engine, client SDK and spin service.
//!
//! Money is carried as [`rust_decimal::Decimal`] and serialized as a JSON number.
//! Every payout figure in this crate follows the gross-return convention: a winning
//! bet returns `amount * multiplier`, stake included.

pub mod api;
pub mod bet;
pub mod outcome;
pub mod roulette;

pub use bet::{Bet, BetId};
pub use outcome::{BetResult, SpinOutcome};
pub use roulette::{
    BetType, Color, ParseBetTypeError, Parity, Pocket, PocketError, Range, WinningNumber,
    POCKET_COUNT, RED_NUMBERS,
};

/// Balance granted on registration.
pub const INITIAL_BALANCE: u64 = 100;

/// Largest stake the spin service accepts on a single bet.
pub const MAX_STAKE_PER_BET: u64 = 1_000;

/// Minimum password length for registration and password changes.
pub const MIN_PASSWORD_LENGTH: usize = 6;
