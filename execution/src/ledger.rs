//! Pending bets for a single round.
//!
//! The ledger only checks what it can check locally: amounts within `(0, MAX_AMOUNT]`
//! and unique ids.
//! Whether the total stake fits the player's balance is the caller's concern, since
//! the balance is owned by the spin service.

use roulette_types::{Bet, BetId};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("duplicate bet id: {0}")]
    DuplicateBet(BetId),
}

/// Largest stake a single bet may carry.
///
/// Keeps `amount * STRAIGHT_MULTIPLIER` and any realistic sum of stakes far from
/// the `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Reject stakes that are zero, negative or above [`MAX_AMOUNT`].
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    Ok(())
}

/// Convert a stake typed into the UI into a decimal amount.
///
/// Fails on NaN, infinities and non-positive values.
pub fn parse_amount(raw: f64) -> Result<Decimal, LedgerError> {
    if !raw.is_finite() {
        return Err(LedgerError::InvalidAmount(raw.to_string()));
    }
    let amount = Decimal::from_f64(raw).ok_or_else(|| LedgerError::InvalidAmount(raw.to_string()))?;
    validate_amount(amount)?;
    Ok(amount)
}

/// Ordered bets of the current, unresolved round.
///
/// Order is placement order; it matters for display only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    bets: Vec<Bet>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `bet` could be added, without adding it.
    pub fn check(&self, bet: &Bet) -> Result<(), LedgerError> {
        validate_amount(bet.amount())?;
        if self.get(bet.id()).is_some() {
            return Err(LedgerError::DuplicateBet(bet.id()));
        }
        Ok(())
    }

    /// Append a bet. On error the ledger is left untouched.
    pub fn add(&mut self, bet: Bet) -> Result<(), LedgerError> {
        self.check(&bet)?;
        self.bets.push(bet);
        Ok(())
    }

    /// Remove a bet by id. Absent ids are ignored.
    pub fn remove(&mut self, id: BetId) -> Option<Bet> {
        let index = self.bets.iter().position(|bet| bet.id() == id)?;
        Some(self.bets.remove(index))
    }

    pub fn clear(&mut self) {
        self.bets.clear();
    }

    pub fn list(&self) -> &[Bet] {
        &self.bets
    }

    pub fn get(&self, id: BetId) -> Option<&Bet> {
        self.bets.iter().find(|bet| bet.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// Sum of every stake currently on the table.
    pub fn total_stake(&self) -> Decimal {
        self.bets.iter().map(Bet::amount).sum()
    }

    /// Build a ledger from an existing bet list, enforcing the same rules as [`Ledger::add`].
    pub fn from_bets(bets: impl IntoIterator<Item = Bet>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for bet in bets {
            ledger.add(bet)?;
        }
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roulette_types::{BetType, Color, Parity, Pocket, Range};

    fn bet(id: u128, bet_type: BetType, amount: i64) -> Bet {
        Bet::with_id(BetId::from_u128(id), bet_type, Decimal::from(amount))
    }

    #[test]
    fn test_add_and_list_preserve_order() {
        let mut ledger = Ledger::new();
        assert!(ledger.is_empty());
        ledger.add(bet(1, BetType::Color(Color::Red), 5)).unwrap();
        ledger.add(bet(2, BetType::Range(Range::Low), 20)).unwrap();
        ledger.add(bet(3, BetType::Number(Pocket::ZERO), 1)).unwrap();

        let ids: Vec<_> = ledger.list().iter().map(Bet::id).collect();
        assert_eq!(
            ids,
            vec![BetId::from_u128(1), BetId::from_u128(2), BetId::from_u128(3)]
        );
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.total_stake(), Decimal::from(26));
    }

    #[test]
    fn test_add_rejects_non_positive_amounts() {
        let mut ledger = Ledger::new();
        let zero = bet(1, BetType::Color(Color::Red), 0);
        let negative = bet(2, BetType::Color(Color::Red), -5);
        assert!(matches!(ledger.add(zero), Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(ledger.add(negative), Err(LedgerError::InvalidAmount(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_add_rejects_amounts_above_cap() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000i64));

        let mut ledger = Ledger::new();
        let huge = Bet::new(BetType::Number(Pocket::ZERO), Decimal::MAX);
        assert!(matches!(ledger.add(huge), Err(LedgerError::InvalidAmount(_))));
        let over = Bet::new(BetType::Color(Color::Red), MAX_AMOUNT + Decimal::new(1, 2));
        assert!(matches!(ledger.add(over), Err(LedgerError::InvalidAmount(_))));
        assert!(ledger.is_empty());

        ledger
            .add(Bet::new(BetType::Color(Color::Red), MAX_AMOUNT))
            .unwrap();
        ledger
            .add(Bet::new(BetType::Color(Color::Black), MAX_AMOUNT))
            .unwrap();
        assert_eq!(ledger.total_stake(), MAX_AMOUNT * Decimal::from(2));
        assert!(parse_amount(f64::MAX).is_err());
    }

    #[test]
    fn test_add_rejects_duplicate_ids() {
        let mut ledger = Ledger::new();
        ledger.add(bet(1, BetType::Color(Color::Red), 5)).unwrap();
        let result = ledger.add(bet(1, BetType::Parity(Parity::Odd), 10));
        assert_eq!(result, Err(LedgerError::DuplicateBet(BetId::from_u128(1))));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.total_stake(), Decimal::from(5));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut ledger = Ledger::new();
        ledger.add(bet(1, BetType::Color(Color::Red), 5)).unwrap();
        let before = ledger.clone();
        assert!(ledger.remove(BetId::from_u128(99)).is_none());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_clear() {
        let mut ledger = Ledger::new();
        ledger.add(bet(1, BetType::Color(Color::Red), 5)).unwrap();
        ledger.add(bet(2, BetType::Color(Color::Black), 5)).unwrap();
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_stake(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(10.0), Ok(Decimal::from(10)));
        assert_eq!(parse_amount(2.5), Ok(Decimal::new(25, 1)));
        assert!(parse_amount(0.0).is_err());
        assert!(parse_amount(-1.0).is_err());
        assert!(parse_amount(f64::NAN).is_err());
        assert!(parse_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_bets_enforces_rules() {
        let ok = Ledger::from_bets(vec![
            bet(1, BetType::Color(Color::Red), 5),
            bet(2, BetType::Color(Color::Black), 5),
        ]);
        assert_eq!(ok.map(|ledger| ledger.len()), Ok(2));

        let dup = Ledger::from_bets(vec![
            bet(1, BetType::Color(Color::Red), 5),
            bet(1, BetType::Color(Color::Black), 5),
        ]);
        assert!(matches!(dup, Err(LedgerError::DuplicateBet(_))));
    }

    fn arb_bet_type() -> impl Strategy<Value = BetType> {
        prop_oneof![
            (0u8..37).prop_map(|n| BetType::Number(Pocket::wrap(n as u32))),
            Just(BetType::Color(Color::Red)),
            Just(BetType::Color(Color::Black)),
            Just(BetType::Parity(Parity::Odd)),
            Just(BetType::Parity(Parity::Even)),
            Just(BetType::Range(Range::Low)),
            Just(BetType::Range(Range::High)),
        ]
    }

    proptest! {
        #[test]
        fn prop_add_then_remove_restores_ledger(
            existing in prop::collection::vec((arb_bet_type(), 1i64..1_000), 0..8),
            extra_type in arb_bet_type(),
            extra_amount in 1i64..1_000,
        ) {
            let mut ledger = Ledger::new();
            for (index, (bet_type, amount)) in existing.into_iter().enumerate() {
                ledger.add(bet(index as u128, bet_type, amount)).unwrap();
            }
            let before = ledger.clone();

            let extra = bet(u128::MAX, extra_type, extra_amount);
            ledger.add(extra.clone()).unwrap();
            prop_assert_eq!(ledger.remove(extra.id()), Some(extra));
            prop_assert_eq!(ledger, before);
        }
    }
}
