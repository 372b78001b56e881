use crate::bet::Bet;
use crate::roulette::Pocket;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement of one bet. `payout` is the gross return (zero on a loss).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetResult {
    pub bet: Bet,
    pub won: bool,
    pub payout: Decimal,
}

/// Resolution of a round against a winning number.
///
/// `results` preserves the order the bets were placed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub winning_number: Pocket,
    pub results: Vec<BetResult>,
    pub total_winnings: Decimal,
    pub total_losses: Decimal,
}

impl SpinOutcome {
    pub fn total_stake(&self) -> Decimal {
        self.results.iter().map(|result| result.bet.amount()).sum()
    }

    /// Balance change implied by the outcome: gross winnings minus every stake.
    pub fn net(&self) -> Decimal {
        self.total_winnings - self.total_stake()
    }

    pub fn is_win(&self) -> bool {
        self.total_winnings > Decimal::ZERO
    }
}
