//! Binary TCP matching server.

use anyhow::Context;
use clap::Parser;

use trading_server::config::Config;
use trading_server::server::Server;

/// Central order-matching server.
#[derive(Parser, Debug)]
#[command(name = "server")]
struct Args {
    /// TCP port to listen on.
    port: u16,

    /// Number of reader threads.
    nreaders: usize,

    /// Number of processor threads.
    nprocessors: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    anyhow::ensure!(args.nreaders > 0, "nreaders must be at least 1");
    anyhow::ensure!(args.nprocessors > 0, "nprocessors must be at least 1");

    let config = Config::new(args.port, args.nreaders, args.nprocessors);
    let server = Server::bind(config).context("failed to bind server socket")?;
    server.run().context("server terminated")?;
    Ok(())
}
