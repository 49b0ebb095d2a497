//! Worker pool of long-lived OS threads.
//!
//! Workers drain a shared task channel; a task is any `FnOnce` closure,
//! including the server's reader and processor loops, which occupy their
//! worker until their input queue closes. [`WorkerPool::stop`] closes the
//! task channel, so idle workers observe the closed signal and exit;
//! [`WorkerPool::join`] then waits for them.
//!
//! The pool is an explicit value owned by whoever assembles it; handles
//! are cheap clones sharing the same workers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A bounded set of long-lived workers executing posted tasks.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

struct Inner {
    /// `None` once the pool has been stopped.
    tx: Mutex<Option<Sender<Task>>>,
    rx: Receiver<Task>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool with no workers yet; call [`grow`](Self::grow).
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        WorkerPool {
            inner: Arc::new(Inner {
                tx: Mutex::new(Some(tx)),
                rx,
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Add `n` workers. Additive: growing twice by 2 yields 4 workers.
    pub fn grow(&self, n: usize) {
        let mut workers = self.inner.workers.lock();
        for _ in 0..n {
            let rx = self.inner.rx.clone();
            workers.push(thread::spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
                debug!("task channel closed, worker exiting");
            }));
        }
    }

    /// Post a task for some worker to execute. Ignored after `stop`.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(tx) = self.inner.tx.lock().as_ref() {
            let _ = tx.send(Box::new(task));
        }
    }

    /// Close the task channel. Workers finish their current task, drain
    /// what was already posted, and exit.
    pub fn stop(&self) {
        self.inner.tx.lock().take();
    }

    /// Wait for every worker to exit. Meaningful only after `stop`, or
    /// once every posted task has returned on its own.
    pub fn join(&self) {
        let handles: Vec<_> = self.inner.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Number of workers spawned so far.
    pub fn size(&self) -> usize {
        self.inner.workers.lock().len()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        WorkerPool::new()
    }
}
