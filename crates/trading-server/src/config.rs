//! Configuration for the trading TCP server.

/// Server configuration, populated from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind to.
    pub bind_addr: String,

    /// TCP port to listen on. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Number of reader workers; also the number of connections served
    /// concurrently, since a reader stays on its socket until EOF.
    pub nreaders: usize,

    /// Number of processor workers draining the work queue. One processor
    /// gives strictly ordered matching; more trade ordering for throughput.
    pub nprocessors: usize,
}

impl Config {
    /// Configuration listening on all interfaces.
    pub fn new(port: u16, nreaders: usize, nprocessors: usize) -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port,
            nreaders,
            nprocessors,
        }
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
