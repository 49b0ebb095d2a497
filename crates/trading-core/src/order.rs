//! Order representation used inside the order book.
//!
//! An order carries its trade fields plus an opaque [`ConnId`] naming the
//! connection it arrived on. The book never interprets the id; the server
//! resolves it back to a live socket (or nothing, if the client has since
//! disconnected) when a fill notification is due.

use std::fmt;

use crate::side::Side;

/// Opaque identifier for the connection an order originated from.
///
/// Uniqueness over the process lifetime is guaranteed by whoever mints
/// these; the core crate only stores and compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// A single trade order, resting or in flight.
///
/// Invariant: `0 <= balance <= quantity`. The order is open while
/// `balance > 0`; a fully filled order never re-enters the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Instrument symbol, short ASCII (e.g. `"IBM"`).
    pub stock: String,

    /// Trader display name.
    pub trader: String,

    /// Numeric trader identity from the connection handshake.
    pub trader_id: i32,

    /// Original order amount.
    pub quantity: i32,

    /// Amount remaining unfilled.
    pub balance: i32,

    /// Buy or Sell.
    pub side: Side,

    /// Originating connection.
    pub conn: ConnId,
}

impl Order {
    /// Build a fresh order; the balance starts equal to the quantity.
    pub fn new(
        stock: impl Into<String>,
        trader: impl Into<String>,
        trader_id: i32,
        quantity: i32,
        side: Side,
        conn: ConnId,
    ) -> Self {
        Order {
            stock: stock.into(),
            trader: trader.into(),
            trader_id,
            quantity,
            balance: quantity,
            side,
            conn,
        }
    }

    /// An order is open while it still has balance to trade.
    pub fn is_open(&self) -> bool {
        self.balance > 0
    }

    /// Fully filled, nothing left to trade.
    pub fn is_filled(&self) -> bool {
        self.balance == 0
    }
}

impl fmt::Display for Order {
    /// One diagnostic line: stock, quantity, balance, side, trader.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.stock, self.quantity, self.balance, self.side, self.trader
        )
    }
}
