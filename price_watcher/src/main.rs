//! Price Watcher: polls a real-time quote stream for the symbols in a JSON
//! watchlist and sends a message when a price crosses its alert bounds.
//!
//! Every cycle opens a fresh WebSocket connection, creates a quote session,
//! subscribes all symbols, and waits until each one has been quoted once. The
//! resulting snapshot is checked against the watchlist; a symbol is only
//! re-notified when its price changes. The process then sleeps and repeats
//! until interrupted with Ctrl+C.
//!
//! Usage example (CLI):
//! ```bash
//! WHATSAPP_TARGET=0812xxxx FONNTE_AUTH_KEY=... price_watcher --watchlist ./datasaham.json --interval 300
//! ```
//!
//! A failed cycle (connection refused, stream closed, timeout) is logged and the
//! next cycle starts on schedule.
#![warn(missing_docs)]
mod alert;
mod args;
mod collector;
mod config;
mod connection;
mod cycle;
mod notifier;
mod session;
#[cfg(test)]
mod testing;

use crate::alert::AlertEvaluator;
use crate::args::Args;
use crate::config::Config;
use crate::cycle::{collect_snapshot, sleep_until_next_cycle};
use chrono::Local;
use clap::Parser;
use log::{debug, error, info, warn};
use price_common::{FeedError, Result, Watchlist};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

fn main() -> Result<(), FeedError> {
    dotenv::dotenv().ok();
    init_logger();
    let args = Args::parse();
    let config = Config::try_from(args)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down watcher...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| FeedError::Config(format!("cannot install Ctrl+C handler: {}", e)))?;
    }

    let watchlist = Watchlist::load(&config.watchlist_path)?;
    if watchlist.is_empty() {
        warn!("Watchlist {} is empty", config.watchlist_path.display());
    }
    let symbols = watchlist.qualified_symbols(&config.exchange);
    info!("Watching {} symbols: {:?}", symbols.len(), symbols);

    let notifier = notifier::from_config(&config.delivery)?;
    let mut evaluator = AlertEvaluator::new(&config.exchange, &config.currency);

    loop {
        info!(
            "=== Checking stock prices at {} ===",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        match collect_snapshot(&config.feed, &symbols, &shutdown) {
            Ok(snapshot) => {
                let evaluations = evaluator.evaluate(&snapshot, watchlist.entries());
                let sent = notifier::dispatch(notifier.as_ref(), &evaluations, &config.currency);
                debug!(
                    "{} alerts sent this cycle, {} symbols alerted so far",
                    sent,
                    evaluator.state().tracked()
                );
            }
            Err(e) if e.is_interrupted() => break,
            Err(e) => error!("Price check failed: {}", e),
        }

        info!(
            "=== End of check, sleeping for {} seconds ===",
            config.poll_interval.as_secs()
        );
        if sleep_until_next_cycle(config.poll_interval, &shutdown) {
            break;
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
