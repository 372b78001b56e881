//! Roulette execution layer.
//!
//! Pure bet-to-payout logic shared by the client SDK (display and verification) and
//! the spin service (authoritative settlement):
//! - [`odds`]: win predicates and total-return multipliers
//! - [`ledger`]: the pending bets of one round
//! - [`resolver`]: per-bet settlement and client/server reconciliation
//! - [`rng`]: the authoritative wheel draw and the cosmetic display hint
//!
//! ## Determinism requirements
//! Everything except [`rng::SpinRng::from_entropy`] is deterministic in its inputs.
//! The resolver must produce identical output on the client and the service.
//!
//! ```rust
//! use roulette_execution::{ledger::Ledger, resolver::resolve};
//! use roulette_types::{Bet, BetType, Pocket};
//! use rust_decimal::Decimal;
//!
//! let mut ledger = Ledger::new();
//! ledger
//!     .add(Bet::new(BetType::Number(Pocket::new(7).unwrap()), Decimal::from(10)))
//!     .unwrap();
//! let outcome = resolve(&ledger, Pocket::new(7).unwrap());
//! assert_eq!(outcome.total_winnings, Decimal::from(360));
//! ```

pub mod ledger;
pub mod odds;
pub mod resolver;
pub mod rng;

pub use ledger::{parse_amount, validate_amount, Ledger, LedgerError, MAX_AMOUNT};
pub use odds::{multiplier_for, payout, wins, EVEN_MONEY_MULTIPLIER, STRAIGHT_MULTIPLIER};
pub use resolver::{reconcile, resolve, resolve_bets, Discrepancy};
pub use rng::{display_hint, pocket_for_rotation, DisplayHint, SpinRng};
