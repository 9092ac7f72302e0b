//! Command-line arguments for the feed simulator.
use clap::Parser;
use price_common::net::SIMULATOR_PORT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// TCP port to accept WebSocket clients on.
    #[clap(long, default_value_t = SIMULATOR_PORT)]
    pub port: u16,

    /// Milliseconds between generated quotes.
    #[clap(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Seconds between heartbeats sent to each client.
    #[clap(long, default_value_t = 10)]
    pub heartbeat_secs: u64,

    /// Seconds a client may leave a heartbeat unanswered before it is dropped.
    #[clap(long, default_value_t = 30)]
    pub heartbeat_timeout_secs: u64,
}
