//! trading-server
//!
//! Multi-threaded TCP front end for the matching core:
//! - worker pool and queues
//! - connection registry
//! - reader and processor roles
//! - listener and assembly

pub mod config;
pub mod pool;
pub mod processor;
pub mod reader;
pub mod registry;
pub mod server;
