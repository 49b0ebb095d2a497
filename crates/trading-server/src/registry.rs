//! Connection registry: trader identity bound to a live socket.
//!
//! Orders do not hold sockets. They carry a [`ConnId`]; when a fill must be
//! delivered, the processor asks the registry for the connection behind the
//! id. A `None` answer means the client disconnected after submitting the
//! order, and the notification is dropped. This keeps order and connection
//! lifetimes fully decoupled even though they are managed from different
//! threads.
//!
//! Both registry keys are unique: one trader id maps to at most one live
//! connection, and each connection id is minted once per process.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub use trading_core::ConnId;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique connection id.
pub fn next_conn_id() -> ConnId {
    ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

/// One registered connection.
///
/// Holds the write half of the socket behind its own mutex, so responses
/// to one client serialize against each other without blocking writes to
/// anyone else. Reads never go through here; the connection's reader owns
/// its own handle to the stream.
pub struct Conn {
    id: ConnId,
    trader_id: i32,
    writer: Mutex<TcpStream>,
}

impl Conn {
    pub fn new(id: ConnId, trader_id: i32, stream: TcpStream) -> Self {
        Conn {
            id,
            trader_id,
            writer: Mutex::new(stream),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn trader_id(&self) -> i32 {
        self.trader_id
    }

    /// Write one wire frame under this connection's write lock.
    pub fn write_frame(&self, frame: &[u8]) -> io::Result<()> {
        let mut stream = self.writer.lock();
        stream.write_all(frame)
    }
}

/// The connection table, guarded by a single mutex.
#[derive(Default)]
pub struct Registry {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<ConnId, Arc<Conn>>,
    by_trader: HashMap<i32, ConnId>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a connection. Returns `false` without inserting when the
    /// trader id or connection id is already present.
    pub fn insert(&self, conn: Arc<Conn>) -> bool {
        let mut tables = self.tables.lock();
        if tables.by_id.contains_key(&conn.id()) || tables.by_trader.contains_key(&conn.trader_id())
        {
            return false;
        }
        tables.by_trader.insert(conn.trader_id(), conn.id());
        tables.by_id.insert(conn.id(), conn);
        true
    }

    /// Drop a connection from both tables. Missing ids are a no-op.
    pub fn remove(&self, id: ConnId) {
        let mut tables = self.tables.lock();
        if let Some(conn) = tables.by_id.remove(&id) {
            tables.by_trader.remove(&conn.trader_id());
        }
    }

    /// The connection behind an id, if the client is still with us.
    ///
    /// The `Arc` is cloned out so the caller writes under the connection's
    /// own lock, not while holding the registry lock.
    pub fn lookup(&self, id: ConnId) -> Option<Arc<Conn>> {
        self.tables.lock().by_id.get(&id).cloned()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.tables.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
