//! Load-generating client for the trading server.
//!
//! Spawns `nsenders` sender workers, each with its own connection and a
//! paired receiver worker on the same socket. A sender handshakes with its
//! own trader id, streams its share of the synthetic order batch, then
//! shuts down its write half; the server answers the resulting EOF by
//! closing the socket, which in turn ends the receiver. The receiver just
//! reads fill frames and logs them.
//!
//! Orders cycle through fixed stock and trader tables and alternate sides,
//! with a bounded quantity ramp, so a balanced run tends to cross heavily.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use trading_core::Side;
use trading_protocol::{decode_frame, encode_frame, encode_handshake, OrderFrame, FRAME_LEN};
use trading_server::pool::WorkerPool;

/// Stocks the generator trades.
const STOCKS: [&str; 5] = ["IBM", "DEL", "SNY", "BBG", "MSN"];

/// Trader names and ids stamped onto generated orders.
const TRADERS: [(&str, i32); 10] = [
    ("John", 100),
    ("James", 101),
    ("Fred", 102),
    ("Tony", 103),
    ("Mike", 104),
    ("Jim", 105),
    ("Dave", 106),
    ("Andy", 107),
    ("Dan", 108),
    ("Luke", 109),
];

/// Base trader id for the per-connection handshake; sender `i` connects
/// as trader `HANDSHAKE_ID_BASE + i`.
const HANDSHAKE_ID_BASE: i32 = 100;

/// Load generator for the order-matching server.
#[derive(Parser, Debug)]
#[command(name = "client")]
struct Args {
    /// Server host name or address.
    host: String,

    /// Server TCP port.
    port: u16,

    /// Number of sender connections.
    nsenders: usize,

    /// Total number of orders across all senders.
    total_orders: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    anyhow::ensure!(args.nsenders > 0, "nsenders must be at least 1");

    let batch = args.total_orders / args.nsenders;
    let remainder = args.total_orders % args.nsenders;

    let pool = WorkerPool::new();
    pool.grow(args.nsenders * 2);

    // Senders report in here once their batch is out, so main knows when
    // to stop the pool; join then waits for the receivers to drain.
    let (done_tx, done_rx) = unbounded::<()>();

    for i in 0..args.nsenders {
        // The truncated division would silently drop the remainder; the
        // last sender picks it up instead.
        let norders = if i == args.nsenders - 1 {
            batch + remainder
        } else {
            batch
        };
        let host = args.host.clone();
        let port = args.port;
        let trader_id = HANDSHAKE_ID_BASE + i as i32;
        let pool_handle = pool.clone();
        let done = done_tx.clone();
        pool.post(move || {
            run_sender(&host, port, trader_id, norders, &pool_handle);
            let _ = done.send(());
        });
    }
    drop(done_tx);

    // The channel closes once every sender has reported and dropped its
    // clone.
    while done_rx.recv().is_ok() {}

    pool.stop();
    pool.join();
    info!("load run complete");
    Ok(())
}

/// Connect, handshake, launch the paired receiver, and stream the batch.
/// All failures are logged and end this sender only.
fn run_sender(host: &str, port: u16, trader_id: i32, norders: usize, pool: &WorkerPool) {
    let mut stream = match connect(host, port, trader_id) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(trader_id, error = %err, "sender could not connect");
            return;
        }
    };

    match stream.try_clone() {
        Ok(receiver_stream) => {
            pool.post(move || run_receiver(receiver_stream, trader_id));
        }
        Err(err) => {
            warn!(trader_id, error = %err, "could not clone stream, skipping receiver");
        }
    }

    if let Err(err) = send_batch(&mut stream, trader_id, norders) {
        warn!(trader_id, error = %err, "sender failed mid-batch");
    }
}

/// Open the connection and perform the trader-id handshake.
fn connect(host: &str, port: u16, trader_id: i32) -> Result<TcpStream> {
    let mut stream =
        TcpStream::connect((host, port)).with_context(|| format!("connect to {host}:{port}"))?;
    let handshake = encode_handshake(trader_id)?;
    stream.write_all(&handshake).context("send handshake")?;
    info!(trader_id, "connected");
    Ok(stream)
}

/// Stream `norders` synthetic orders, then shut down the write half so the
/// server sees EOF and closes the socket once its fills are out.
fn send_batch(stream: &mut TcpStream, trader_id: i32, norders: usize) -> Result<()> {
    let mut stock_ndx = 0;
    let mut trader_ndx = 0;
    let mut side = Side::Buy;
    let mut quantity: i32 = 100;

    for _ in 0..norders {
        let (trader, table_id) = TRADERS[trader_ndx];
        let frame = OrderFrame {
            stock: STOCKS[stock_ndx].to_string(),
            trader: trader.to_string(),
            trader_id: table_id,
            quantity,
            balance: quantity,
            side,
        };
        let bytes = encode_frame(&frame)?;
        stream.write_all(&bytes).context("send order")?;
        debug!(trader_id, stock = %frame.stock, quantity, side = %side, "order sent");

        stock_ndx = (stock_ndx + 1) % STOCKS.len();
        trader_ndx = (trader_ndx + 1) % TRADERS.len();
        side = side.opposite();
        quantity = 100 + (quantity + 1) % 100;
    }

    stream
        .shutdown(Shutdown::Write)
        .context("shutdown write half")?;
    info!(trader_id, norders, "batch sent");
    Ok(())
}

/// Read fill frames until the server closes the connection.
fn run_receiver(mut stream: TcpStream, trader_id: i32) {
    let mut buf = [0u8; FRAME_LEN];
    let mut fills = 0usize;
    loop {
        if let Err(err) = stream.read_exact(&mut buf) {
            debug!(trader_id, error = %err, "server closed connection");
            break;
        }
        match decode_frame(&buf) {
            Ok(frame) => {
                fills += 1;
                debug!(
                    trader_id,
                    stock = %frame.stock,
                    trader = %frame.trader,
                    quantity = frame.quantity,
                    side = %frame.side,
                    "fill received"
                );
            }
            Err(err) => {
                warn!(trader_id, error = %err, "bad fill frame");
                break;
            }
        }
    }
    info!(trader_id, fills, "receiver done");
}
