//! Multi-indexed order book and the crossing loop.
//!
//! The book owns every resting order in a single map keyed by a
//! monotonically assigned order id, with three ordered non-unique
//! indices layered on top as composite-key sets:
//!
//! - `(stock, side, id)`: primary match lookup; equal-range over a
//!   `(stock, side)` prefix yields every resting order eligible to cross.
//! - `(stock, id)`: full-book enumeration for diagnostics.
//! - `(trader, id)`: enumeration by trader name.
//!
//! Because ids grow monotonically, iteration within an equal key prefix is
//! insertion order. That ordering decides which resting orders are consumed
//! first; there are no prices, so matching is quantity-only.
//!
//! All three indices observe the same order set. Insert and erase go through
//! a single pair of internal helpers so the indices can never drift.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::order::Order;
use crate::side::Side;

/// Stable handle for an order while it rests in the book.
type OrderId = u64;

/// The central order book for all stocks.
#[derive(Debug, Default)]
pub struct OrderBook {
    next_id: OrderId,

    /// Owning container; the indices hold ids into this map.
    orders: HashMap<OrderId, Order>,

    /// (stock, side, id) index used by the match loop.
    by_stock_side: BTreeSet<(String, Side, OrderId)>,

    /// (stock, id) index for full-book enumeration.
    by_stock: BTreeSet<(String, OrderId)>,

    /// (trader, id) index for per-trader enumeration.
    by_trader: BTreeSet<(String, OrderId)>,
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        OrderBook::default()
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Attempt to cross `order` against resting orders of the opposite side.
    ///
    /// Fully filled orders, resting or incoming, are appended to `filled` in
    /// the order they completed; each order appears there at most once, at
    /// the moment its balance reaches zero. Resting orders that are only
    /// partially consumed stay in the book with a reduced balance and are
    /// not reported. Likewise an incoming order that comes to rest with a
    /// residual balance is inserted silently, even if it consumed resting
    /// orders along the way; it is only reported when some later order
    /// finishes it off.
    ///
    /// An order arriving with no balance to trade is reported as filled
    /// immediately and never inserted, so every resting order satisfies
    /// `0 < balance <= quantity`.
    pub fn process(&mut self, mut order: Order, filled: &mut Vec<Order>) {
        if !order.is_open() {
            order.balance = 0;
            filled.push(order);
            return;
        }

        let opposing = order.side.opposite();
        let resting: Vec<OrderId> = self.equal_range(&order.stock, opposing);

        if resting.is_empty() {
            self.attach(order);
            return;
        }

        for id in resting {
            let Some(rest) = self.orders.get_mut(&id) else {
                continue;
            };

            // Widened; only the sign of the result matters.
            let rest_left = i64::from(rest.balance) - i64::from(order.balance);
            let incoming_left = i64::from(order.balance) - i64::from(rest.balance);

            if rest_left <= 0 {
                rest.balance = 0;
                if let Some(done) = self.detach(id) {
                    filled.push(done);
                }
            } else {
                rest.balance = rest_left as i32;
            }

            if incoming_left <= 0 {
                order.balance = 0;
                filled.push(order);
                return;
            }
            order.balance = incoming_left as i32;
        }

        // Residual balance left after consuming the whole opposing range.
        self.attach(order);
    }

    /// Resting orders for one `(stock, side)` key, in match-consumption
    /// order.
    pub fn orders_for_stock_side(&self, stock: &str, side: Side) -> Vec<&Order> {
        self.equal_range(stock, side)
            .into_iter()
            .filter_map(|id| self.orders.get(&id))
            .collect()
    }

    /// All resting orders for a stock, both sides, in stock-index order.
    pub fn orders_for_stock(&self, stock: &str) -> Vec<&Order> {
        let lo = (stock.to_string(), OrderId::MIN);
        let hi = (stock.to_string(), OrderId::MAX);
        self.by_stock
            .range(lo..=hi)
            .filter_map(|entry| self.orders.get(&entry.1))
            .collect()
    }

    /// All resting orders placed under a trader name.
    pub fn orders_by_trader(&self, trader: &str) -> Vec<&Order> {
        let lo = (trader.to_string(), OrderId::MIN);
        let hi = (trader.to_string(), OrderId::MAX);
        self.by_trader
            .range(lo..=hi)
            .filter_map(|entry| self.orders.get(&entry.1))
            .collect()
    }

    /// Every resting order, grouped by stock.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.by_stock
            .iter()
            .filter_map(|entry| self.orders.get(&entry.1))
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Ids of all resting orders under `(stock, side)`, ascending, which is
    /// insertion order.
    fn equal_range(&self, stock: &str, side: Side) -> Vec<OrderId> {
        let lo = (stock.to_string(), side, OrderId::MIN);
        let hi = (stock.to_string(), side, OrderId::MAX);
        self.by_stock_side
            .range(lo..=hi)
            .map(|entry| entry.2)
            .collect()
    }

    /// Insert an order under a fresh id and register it with all indices.
    fn attach(&mut self, order: Order) {
        let id = self.next_id;
        self.next_id += 1;
        self.by_stock_side
            .insert((order.stock.clone(), order.side, id));
        self.by_stock.insert((order.stock.clone(), id));
        self.by_trader.insert((order.trader.clone(), id));
        self.orders.insert(id, order);
    }

    /// Remove an order from the owning map and every index.
    fn detach(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        self.by_stock_side
            .remove(&(order.stock.clone(), order.side, id));
        self.by_stock.remove(&(order.stock.clone(), id));
        self.by_trader.remove(&(order.trader.clone(), id));
        Some(order)
    }
}

impl fmt::Display for OrderBook {
    /// Diagnostic table of all resting orders, one per line, grouped by
    /// stock.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Order Table:")?;
        for order in self.iter() {
            writeln!(f, "{}", order)?;
        }
        Ok(())
    }
}
