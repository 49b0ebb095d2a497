//! Reader role: per-socket handshake and frame-read loop.
//!
//! Each reader worker drains the accepted-socket queue, handling one
//! connection to completion before picking up the next. For a connection:
//!
//! 1. Read the 8-byte trader-id handshake; a short read or parse failure
//!    closes the socket.
//! 2. Register the connection; a duplicate trader id closes the socket.
//! 3. Read fixed-size order frames until EOF, forwarding each decoded
//!    order to the work queue tagged with this connection's id.
//!
//! EOF on a frame boundary is a clean disconnect. A partial frame or a
//! frame that fails to decode is a protocol violation; either way the
//! registry entry is removed and the socket dropped, and nothing outside
//! this connection is affected.

use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use trading_core::Order;
use trading_protocol::{decode_frame, decode_handshake, FRAME_LEN, HANDSHAKE_LEN};

use crate::registry::{next_conn_id, Conn, Registry};

/// Reader worker loop. Returns when the socket queue closes.
pub fn run_reader(sockets: Receiver<TcpStream>, work: Sender<Order>, registry: Arc<Registry>) {
    while let Ok(stream) = sockets.recv() {
        handle_connection(stream, &work, &registry);
    }
    debug!("socket queue closed, reader exiting");
}

/// Serve one connection until it disconnects or misbehaves.
fn handle_connection(mut stream: TcpStream, work: &Sender<Order>, registry: &Registry) {
    let mut handshake = [0u8; HANDSHAKE_LEN];
    if let Err(err) = stream.read_exact(&mut handshake) {
        warn!(error = %err, "connection closed before completing handshake");
        return;
    }
    let trader_id = match decode_handshake(&handshake) {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "rejecting connection with bad handshake");
            return;
        }
    };

    let write_half = match stream.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            warn!(trader_id, error = %err, "could not clone stream for writes");
            return;
        }
    };
    let conn = Arc::new(Conn::new(next_conn_id(), trader_id, write_half));
    let conn_id = conn.id();
    if !registry.insert(conn) {
        warn!(trader_id, "trader already connected, rejecting");
        return;
    }
    info!(trader_id, "trader connected");

    let mut buf = [0u8; FRAME_LEN];
    loop {
        match read_frame(&mut stream, &mut buf) {
            Ok(true) => {}
            Ok(false) => {
                info!(trader_id, "client closed connection");
                registry.remove(conn_id);
                return;
            }
            Err(err) => {
                warn!(trader_id, error = %err, "frame read failed");
                registry.remove(conn_id);
                return;
            }
        }

        let frame = match decode_frame(&buf) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(trader_id, error = %err, "bad order frame, dropping connection");
                registry.remove(conn_id);
                return;
            }
        };
        debug!(
            trader_id,
            stock = %frame.stock,
            quantity = frame.quantity,
            side = %frame.side,
            "order received"
        );

        // The balance field on inbound frames is ignored; a new order
        // always starts with its full quantity open.
        let order = Order::new(
            frame.stock,
            frame.trader,
            frame.trader_id,
            frame.quantity,
            frame.side,
            conn_id,
        );
        if work.send(order).is_err() {
            // Work queue closed: the server is going down.
            registry.remove(conn_id);
            return;
        }
    }
}

/// Read one full frame into `buf`.
///
/// Returns `Ok(false)` on EOF at a frame boundary (clean disconnect) and
/// an error when the stream ends partway through a frame.
fn read_frame(stream: &mut TcpStream, buf: &mut [u8; FRAME_LEN]) -> io::Result<bool> {
    let n = stream.read(buf)?;
    if n == 0 {
        return Ok(false);
    }
    stream.read_exact(&mut buf[n..])?;
    Ok(true)
}
