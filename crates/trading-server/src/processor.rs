//! Processor role: crossing and fill fan-out.
//!
//! Processor workers pop orders off the shared work queue, run each one
//! through the book under the single book mutex, and then deliver a fill
//! frame to the originating connection of every order that completed.
//! Delivery failures stay local to the one notification: a vanished
//! connection is skipped, a failed write is logged and the frame dropped
//! (the reader on that socket will notice the dead peer shortly).

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, warn};

use trading_core::{Order, OrderBook};
use trading_protocol::{encode_frame, OrderFrame};

use crate::registry::Registry;

/// Processor worker loop. Returns when the work queue closes.
pub fn run_processor(work: Receiver<Order>, book: Arc<Mutex<OrderBook>>, registry: Arc<Registry>) {
    let mut filled = Vec::new();
    while let Ok(order) = work.recv() {
        filled.clear();
        {
            let mut book = book.lock();
            book.process(order, &mut filled);
        }
        for done in filled.drain(..) {
            notify(&done, &registry);
        }
    }
    debug!("work queue closed, processor exiting");
}

/// Send one filled order back to the connection it came from.
fn notify(order: &Order, registry: &Registry) {
    let Some(conn) = registry.lookup(order.conn) else {
        debug!(
            trader_id = order.trader_id,
            stock = %order.stock,
            "client gone, dropping fill notification"
        );
        return;
    };

    let frame = match encode_frame(&OrderFrame::from(order)) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(trader_id = order.trader_id, error = %err, "fill frame failed to encode");
            return;
        }
    };
    if let Err(err) = conn.write_frame(&frame) {
        warn!(trader_id = order.trader_id, error = %err, "fill write failed, dropping");
    } else {
        debug!(
            trader_id = order.trader_id,
            stock = %order.stock,
            quantity = order.quantity,
            "fill delivered"
        );
    }
}
