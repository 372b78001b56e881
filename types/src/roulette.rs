//! Wheel layout and bet kinds for single-zero roulette.
//!
//! Wire format of a bet kind (adjacently tagged):
//! `{"type":"number","value":7}`, `{"type":"color","value":"red"}`,
//! `{"type":"parity","value":"odd"}`, `{"type":"range","value":"low"}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Red numbers on a roulette wheel.
pub const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

/// Number of pockets on a single-zero wheel (0 through 36).
pub const POCKET_COUNT: u8 = 37;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PocketError {
    #[error("pocket out of range (got={0}, max=36)")]
    OutOfRange(u8),
}

/// A pocket on the wheel, always in `0..=36`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pocket(u8);

/// The pocket the ball lands on. Authoritative only when reported by the spin service.
pub type WinningNumber = Pocket;

impl Pocket {
    pub const ZERO: Pocket = Pocket(0);

    pub fn new(value: u8) -> Result<Self, PocketError> {
        if value >= POCKET_COUNT {
            return Err(PocketError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Map any draw onto the wheel by reducing it modulo the pocket count.
    pub fn wrap(value: u32) -> Self {
        Self((value % POCKET_COUNT as u32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Color of the pocket; `None` for the green zero.
    pub fn color(self) -> Option<Color> {
        if self.is_zero() {
            None
        } else if RED_NUMBERS.contains(&self.0) {
            Some(Color::Red)
        } else {
            Some(Color::Black)
        }
    }

    /// Every pocket on the wheel in numeric order.
    pub fn all() -> impl Iterator<Item = Pocket> {
        (0..POCKET_COUNT).map(Pocket)
    }
}

impl TryFrom<u8> for Pocket {
    type Error = PocketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pocket> for u8 {
    fn from(pocket: Pocket) -> Self {
        pocket.0
    }
}

impl fmt::Display for Pocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    /// 1-18
    Low,
    /// 19-36
    High,
}

/// What a chip on the table is riding on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BetType {
    /// Straight-up bet on a single pocket.
    Number(Pocket),
    Color(Color),
    Parity(Parity),
    Range(Range),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseBetTypeError {
    #[error("unknown bet type: {0}")]
    UnknownType(String),
    #[error("invalid value {value:?} for bet type {kind}")]
    InvalidValue { kind: String, value: String },
}

impl BetType {
    /// Outside bets cover a category rather than a single pocket.
    pub fn is_outside(&self) -> bool {
        !matches!(self, BetType::Number(_))
    }

    /// Wire tag of the bet kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BetType::Number(_) => "number",
            BetType::Color(_) => "color",
            BetType::Parity(_) => "parity",
            BetType::Range(_) => "range",
        }
    }

    /// Wire value of the bet kind, as a string.
    pub fn value_label(&self) -> String {
        match self {
            BetType::Number(pocket) => pocket.to_string(),
            BetType::Color(Color::Red) => "red".to_string(),
            BetType::Color(Color::Black) => "black".to_string(),
            BetType::Parity(Parity::Odd) => "odd".to_string(),
            BetType::Parity(Parity::Even) => "even".to_string(),
            BetType::Range(Range::Low) => "low".to_string(),
            BetType::Range(Range::High) => "high".to_string(),
        }
    }

    /// Parse a table cell's `(type, value)` pair.
    ///
    /// Accepts both the grouped form (`color`/`red`) and the shorthand where the
    /// category itself is the type (`red`, `odd`, `high`, ...), in which case the
    /// value is ignored.
    pub fn parse(kind: &str, value: &str) -> Result<Self, ParseBetTypeError> {
        let kind = kind.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        let invalid = || ParseBetTypeError::InvalidValue {
            kind: kind.clone(),
            value: value.clone(),
        };
        match kind.as_str() {
            "number" => {
                let number = value.parse::<u8>().map_err(|_| invalid())?;
                Pocket::new(number).map(BetType::Number).map_err(|_| invalid())
            }
            "color" | "parity" | "range" => {
                let parsed = Self::parse_shorthand(&value).ok_or_else(invalid)?;
                if parsed.kind() != kind {
                    return Err(invalid());
                }
                Ok(parsed)
            }
            other => {
                Self::parse_shorthand(other).ok_or_else(|| ParseBetTypeError::UnknownType(other.to_string()))
            }
        }
    }

    fn parse_shorthand(value: &str) -> Option<Self> {
        match value {
            "red" => Some(BetType::Color(Color::Red)),
            "black" => Some(BetType::Color(Color::Black)),
            "odd" => Some(BetType::Parity(Parity::Odd)),
            "even" => Some(BetType::Parity(Parity::Even)),
            "low" => Some(BetType::Range(Range::Low)),
            "high" => Some(BetType::Range(Range::High)),
            _ => None,
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Number(pocket) => write!(f, "number {pocket}"),
            BetType::Color(Color::Red) => f.write_str("red"),
            BetType::Color(Color::Black) => f.write_str("black"),
            BetType::Parity(Parity::Odd) => f.write_str("odd"),
            BetType::Parity(Parity::Even) => f.write_str("even"),
            BetType::Range(Range::Low) => f.write_str("1-18 (low)"),
            BetType::Range(Range::High) => f.write_str("19-36 (high)"),
        }
    }
}
