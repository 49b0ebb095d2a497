//! trading-core
//!
//! Pure matching logic, no transport:
//! - order side and order representation
//! - the central multi-indexed order book and its crossing loop

pub mod book;
pub mod order;
pub mod side;

pub use book::OrderBook;
pub use order::{ConnId, Order};
pub use side::Side;
