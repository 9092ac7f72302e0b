//! Command-line arguments for the Price Watcher.
//!
//! This module defines the CLI interface using `clap`. Secrets and the poll
//! interval fall back to environment variables (also read from a `.env` file).
use clap::Parser;
use price_common::net::{DEFAULT_EXCHANGE, FEED_ORIGIN, FEED_URL, NOTIFY_URL};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON watchlist: `[{"symbol", "alert_low", "alert_high"}, ...]`.
    #[clap(long, default_value = "datasaham.json")]
    pub watchlist: String,

    /// Recipient identifier for alert messages.
    #[clap(long, env = "WHATSAPP_TARGET")]
    pub target: Option<String>,

    /// Authorization key for the messaging API.
    #[clap(long, env = "FONNTE_AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// Seconds to sleep between price checks.
    #[clap(long, env = "CHECK_INTERVAL", default_value_t = 60)]
    pub interval: u64,

    /// Seconds to wait for every symbol to be quoted before giving up on a cycle.
    #[clap(long, default_value_t = 30)]
    pub collect_timeout: u64,

    /// Exchange prefix applied to watchlist symbols.
    #[clap(long, default_value = DEFAULT_EXCHANGE)]
    pub exchange: String,

    /// Market-data WebSocket endpoint.
    #[clap(long, default_value = FEED_URL)]
    pub feed_url: String,

    /// `Origin` header sent during the WebSocket handshake.
    #[clap(long, default_value = FEED_ORIGIN)]
    pub origin: String,

    /// Messaging API endpoint.
    #[clap(long, default_value = NOTIFY_URL)]
    pub notify_url: String,

    /// Currency label used in alert messages.
    #[clap(long, default_value = "IDR")]
    pub currency: String,

    /// Log alert messages instead of sending them.
    #[clap(long)]
    pub dry_run: bool,
}
