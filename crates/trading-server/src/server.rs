//! TCP listener and top-level server wiring.
//!
//! [`Server::bind`] claims the listening socket; [`Server::run`] builds the
//! rest of the plant and then accepts forever:
//!
//! ```text
//! listener -> socket queue -> reader workers -> work queue
//!          -> processor workers -> order book -> fills back out
//! ```
//!
//! Readers and processors run as tasks on one worker pool sized
//! `nreaders + nprocessors`. The queues are the only coupling between the
//! stages; a slow client stalls at most its own reader.
//!
//! Lock discipline: the book mutex is held only inside the match call, the
//! registry mutex only during insert/remove/lookup, and each connection's
//! write mutex only while a frame is written. No lock is acquired while
//! another is held: the book is unlocked before fills fan out and the
//! registry guard is released before a connection's write lock is taken.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use trading_core::OrderBook;

use crate::config::Config;
use crate::pool::WorkerPool;
use crate::processor::run_processor;
use crate::reader::run_reader;
use crate::registry::Registry;

/// The assembled trading server.
pub struct Server {
    config: Config,
    listener: TcpListener,
}

impl Server {
    /// Create, bind, and listen. Failures here are setup-fatal and
    /// propagate to the caller.
    pub fn bind(config: Config) -> io::Result<Server> {
        let listener = TcpListener::bind(config.socket_addr_string())?;
        Ok(Server { config, listener })
    }

    /// The address actually bound, useful when the port was `0`.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Launch the workers and accept connections until an accept fails.
    ///
    /// Accept errors are fatal to the listener and returned; connection
    /// level errors are contained inside the reader workers and never
    /// reach here.
    pub fn run(&self) -> io::Result<()> {
        let registry = Arc::new(Registry::new());
        let book = Arc::new(Mutex::new(OrderBook::new()));

        let (socket_tx, socket_rx) = unbounded();
        let (work_tx, work_rx) = unbounded();

        let pool = WorkerPool::new();
        pool.grow(self.config.nreaders + self.config.nprocessors);

        for _ in 0..self.config.nreaders {
            let sockets = socket_rx.clone();
            let work = work_tx.clone();
            let registry = registry.clone();
            pool.post(move || run_reader(sockets, work, registry));
        }
        for _ in 0..self.config.nprocessors {
            let work = work_rx.clone();
            let book = book.clone();
            let registry = registry.clone();
            pool.post(move || run_processor(work, book, registry));
        }
        // The readers now hold the only work senders; when they exit, the
        // processors observe the closed work queue and follow.
        drop(work_tx);
        drop(work_rx);
        drop(socket_rx);

        let addr = self.local_addr()?;
        info!(
            %addr,
            nreaders = self.config.nreaders,
            nprocessors = self.config.nprocessors,
            "listening for traders"
        );

        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "client connected");
                    if socket_tx.send(stream).is_err() {
                        // All readers are gone; nothing can serve sockets.
                        error!("socket queue closed, stopping listener");
                        return Err(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "socket queue closed",
                        ));
                    }
                }
                Err(err) => {
                    error!(error = %err, "accept failed, stopping listener");
                    return Err(err);
                }
            }
        }
    }
}
