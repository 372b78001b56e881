use crate::roulette::BetType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique token identifying a bet within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetId(Uuid);

impl BetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for BetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single chip placement. Immutable once created; a changed bet is a new bet.
///
/// Serialized flat: `{"id":"…","type":"color","value":"red","amount":5}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    id: BetId,
    #[serde(flatten)]
    bet_type: BetType,
    amount: Decimal,
}

impl Bet {
    /// Create a bet with a fresh id. The amount is validated when the bet enters a ledger.
    pub fn new(bet_type: BetType, amount: Decimal) -> Self {
        Self::with_id(BetId::new(), bet_type, amount)
    }

    pub fn with_id(id: BetId, bet_type: BetType, amount: Decimal) -> Self {
        Self {
            id,
            bet_type,
            amount,
        }
    }

    pub fn id(&self) -> BetId {
        self.id
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}
