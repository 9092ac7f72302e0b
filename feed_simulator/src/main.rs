//! Quote feed simulator.
//!
//! A local stand-in for the real-time quote stream the watcher consumes. It
//! accepts WebSocket clients on `ws://0.0.0.0:<port>` and speaks the same
//! framed `{"m", "p"}` protocol:
//!
//! - `QuoteGenerator` advances a random-walk price for every subscribed symbol
//!   and broadcasts quotes to subscribers via `crossbeam_channel` senders.
//! - Per-client stream thread: handles the quote session commands, forwards the
//!   client's quotes as `qsd` frames and sends `~h~<n>` heartbeats.
//! - `HeartbeatMonitor` drops a client that stops echoing heartbeats.
//!
//! Any handshake, I/O or channel error is surfaced as `FeedError` and logged;
//! the affected client stream exits without impacting other clients.
//!
//! Usage example:
//! ```bash
//! feed_simulator --port 8765 --tick-ms 500
//! price_watcher --feed-url ws://127.0.0.1:8765 --dry-run
//! ```
#![warn(missing_docs)]
use crate::args::Args;
use crate::client::{ClientSettings, handle_client};
use crate::model::quote_generator::QuoteGenerator;
use clap::Parser;
use log::{error, info};
use price_common::net::addr;
use price_common::{FeedError, Result};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

mod args;
mod client;
pub mod model;

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();
    if args.tick_ms == 0 || args.heartbeat_secs == 0 {
        return Err(FeedError::Config(String::from(
            "tick and heartbeat intervals must be positive",
        )));
    }

    let listener = TcpListener::bind(addr("0.0.0.0", args.port))?;
    info!("Feed simulator listening on ws://{}", listener.local_addr()?);

    let subscribe_tx = QuoteGenerator::start(Duration::from_millis(args.tick_ms));
    let settings = ClientSettings {
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
    };

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let subscribe_tx = subscribe_tx.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, subscribe_tx, settings) {
                        error!("Client stream error: {}", e);
                    }
                });
            }
            Err(e) => error!("TCP connection error: {}", e),
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
