//! JSON bodies exchanged between the client SDK and the spin service.

use crate::bet::Bet;
use crate::outcome::{BetResult, SpinOutcome};
use crate::roulette::{BetType, Pocket};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bets for one round, submitted for an authoritative spin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinRequest {
    pub bets: Vec<Bet>,
    /// Pocket the client animated towards. Advisory only; never used for settlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_winning_number_hint: Option<Pocket>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResponse {
    pub winning_number: Pocket,
    pub per_bet_payout: Vec<BetResult>,
    pub total_winnings: Decimal,
    pub total_losses: Decimal,
    pub new_balance: Decimal,
    pub message: String,
}

impl SpinResponse {
    pub fn outcome(&self) -> SpinOutcome {
        SpinOutcome {
            winning_number: self.winning_number,
            results: self.per_bet_payout.clone(),
            total_winnings: self.total_winnings,
            total_losses: self.total_losses,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub username: String,
    pub balance: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Error payload returned with every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    Win,
    Lose,
}

/// One settled bet in a player's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(flatten)]
    pub bet_type: BetType,
    pub amount: Decimal,
    pub winning_number: Pocket,
    pub result: RoundResult,
    pub payout: Decimal,
    pub created_at: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub games: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    /// Percentage of winning bets, two decimals.
    pub win_rate: f64,
}
