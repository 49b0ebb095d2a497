//! Side (Buy / Sell) for orders.

use std::fmt;

/// Order side: Buy or Sell.
///
/// `Ord` is derived (Buy < Sell) so the side can participate in the
/// composite keys of the order book indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an order trades against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire representation: `0` = Buy, `1` = Sell.
    pub fn as_i32(self) -> i32 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    /// Try to parse from the wire representation. Anything other than
    /// `0` or `1` is invalid.
    pub fn from_i32(v: i32) -> Option<Side> {
        match v {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}
