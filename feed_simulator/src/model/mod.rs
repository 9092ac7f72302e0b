//! Domain models and utilities for the feed simulator.
//!
//! This module groups the data types and helpers used by the per-client streams
//! and the background quote generator:
//! - `price`: synthetic price path for one symbol.
//! - `heartbeat_monitor`: keep-alive tracker that detects unresponsive clients.
//! - `quote_generator`: background generator broadcasting quotes to subscribers.

pub mod heartbeat_monitor;
pub mod price;
pub mod quote_generator;
