//! Payout resolution.
//!
//! [`resolve`] is pure: the client runs it to display and verify a round, the spin
//! service runs it to settle. When the two disagree the service wins; [`reconcile`]
//! only reports the differences.

use crate::ledger::Ledger;
use crate::odds::payout;
use roulette_types::{Bet, BetId, BetResult, Pocket, SpinOutcome};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Resolve every bet in the ledger against a winning number.
pub fn resolve(ledger: &Ledger, winning_number: Pocket) -> SpinOutcome {
    resolve_bets(ledger.list(), winning_number)
}

/// Resolve a bet list against a winning number. Result order follows `bets`.
///
/// Amounts are expected to pass [`crate::validate_amount`], as ledger bets do.
pub fn resolve_bets(bets: &[Bet], winning_number: Pocket) -> SpinOutcome {
    let mut total_winnings = Decimal::ZERO;
    let mut total_losses = Decimal::ZERO;
    let results = bets
        .iter()
        .map(|bet| {
            let amount = payout(bet, winning_number);
            let won = amount > Decimal::ZERO;
            if won {
                total_winnings += amount;
            } else {
                total_losses += bet.amount();
            }
            BetResult {
                bet: bet.clone(),
                won,
                payout: amount,
            }
        })
        .collect();

    SpinOutcome {
        winning_number,
        results,
        total_winnings,
        total_losses,
    }
}

/// A difference between a locally computed outcome and the one a service reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discrepancy {
    WinningNumber { local: Pocket, reported: Pocket },
    BetPayout { id: BetId, local: Decimal, reported: Decimal },
    MissingBet(BetId),
    UnexpectedBet(BetId),
    TotalWinnings { local: Decimal, reported: Decimal },
    TotalLosses { local: Decimal, reported: Decimal },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::WinningNumber { local, reported } => {
                write!(f, "winning number: local={local} reported={reported}")
            }
            Discrepancy::BetPayout { id, local, reported } => {
                write!(f, "payout of bet {id}: local={local} reported={reported}")
            }
            Discrepancy::MissingBet(id) => write!(f, "bet {id} missing from reported outcome"),
            Discrepancy::UnexpectedBet(id) => write!(f, "reported outcome contains unknown bet {id}"),
            Discrepancy::TotalWinnings { local, reported } => {
                write!(f, "total winnings: local={local} reported={reported}")
            }
            Discrepancy::TotalLosses { local, reported } => {
                write!(f, "total losses: local={local} reported={reported}")
            }
        }
    }
}

/// Compare a local outcome with a reported one. An empty result means they agree.
pub fn reconcile(local: &SpinOutcome, reported: &SpinOutcome) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    if local.winning_number != reported.winning_number {
        discrepancies.push(Discrepancy::WinningNumber {
            local: local.winning_number,
            reported: reported.winning_number,
        });
    }

    let reported_payouts: HashMap<BetId, Decimal> = reported
        .results
        .iter()
        .map(|result| (result.bet.id(), result.payout))
        .collect();
    for result in &local.results {
        let id = result.bet.id();
        match reported_payouts.get(&id) {
            None => discrepancies.push(Discrepancy::MissingBet(id)),
            Some(payout) if *payout != result.payout => {
                discrepancies.push(Discrepancy::BetPayout {
                    id,
                    local: result.payout,
                    reported: *payout,
                });
            }
            Some(_) => {}
        }
    }
    for result in &reported.results {
        let id = result.bet.id();
        if !local.results.iter().any(|local| local.bet.id() == id) {
            discrepancies.push(Discrepancy::UnexpectedBet(id));
        }
    }

    if local.total_winnings != reported.total_winnings {
        discrepancies.push(Discrepancy::TotalWinnings {
            local: local.total_winnings,
            reported: reported.total_winnings,
        });
    }
    if local.total_losses != reported.total_losses {
        discrepancies.push(Discrepancy::TotalLosses {
            local: local.total_losses,
            reported: reported.total_losses,
        });
    }

    discrepancies
}
