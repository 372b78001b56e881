//! Fixed odds for single-zero roulette.
//!
//! Multipliers are total-return factors: a winning bet pays `amount * multiplier`,
//! stake included. A losing bet pays nothing.
//!
//! | Bet        | Wins when                     | Multiplier |
//! |------------|-------------------------------|------------|
//! | Number(n)  | result == n                   | 36         |
//! | Red/Black  | result has that color         | 2          |
//! | Odd/Even   | result has that parity        | 2          |
//! | Low/High   | result in 1-18 / 19-36        | 2          |
//!
//! Zero is green: it wins a straight-up bet on 0 and nothing else.

use roulette_types::{Bet, BetType, Parity, Pocket, Range};
use rust_decimal::Decimal;

/// Total return factor of a straight-up bet.
pub const STRAIGHT_MULTIPLIER: u32 = 36;

/// Total return factor of every outside bet.
pub const EVEN_MONEY_MULTIPLIER: u32 = 2;

/// Get the total-return multiplier for a bet type.
pub fn multiplier_for(bet_type: BetType) -> u32 {
    match bet_type {
        BetType::Number(_) => STRAIGHT_MULTIPLIER,
        BetType::Color(_) | BetType::Parity(_) | BetType::Range(_) => EVEN_MONEY_MULTIPLIER,
    }
}

/// Check if a bet type wins for a given result.
pub fn wins(bet_type: BetType, result: Pocket) -> bool {
    let value = result.value();
    match bet_type {
        BetType::Number(number) => number == result,
        // Zero loses every outside bet
        _ if result.is_zero() => false,
        BetType::Color(color) => result.color() == Some(color),
        BetType::Parity(Parity::Odd) => value % 2 == 1,
        BetType::Parity(Parity::Even) => value % 2 == 0,
        BetType::Range(Range::Low) => (1..=18).contains(&value),
        BetType::Range(Range::High) => (19..=36).contains(&value),
    }
}

/// Gross return of a bet for a given result.
pub fn payout(bet: &Bet, result: Pocket) -> Decimal {
    if wins(bet.bet_type(), result) {
        bet.amount() * Decimal::from(multiplier_for(bet.bet_type()))
    } else {
        Decimal::ZERO
    }
}
