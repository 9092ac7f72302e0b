//!
//! Common types and utilities shared by the price watcher and the feed simulator.
//!
//! This crate aggregates:
//! - `error`: unified error type `FeedError` used across the workspace.
//! - `result`: handy `Result<T, FeedError>` alias.
//! - `frame`: the `~m~<len>~m~` text framing spoken on the quote stream.
//! - `protocol`: the `{"m": .., "p": [..]}` message envelope carried inside frames.
//! - `quote`: quote updates and the per-cycle price snapshot.
//! - `watchlist`: watchlist entries and parsing helpers.
//! - `net`: endpoint constants and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod frame;
pub mod net;
pub mod protocol;
pub mod quote;
pub mod result;
pub mod watchlist;

pub use error::FeedError;
pub use protocol::ProtocolMessage;
pub use quote::{PriceSnapshot, QuoteUpdate};
pub use result::Result;
pub use watchlist::{Watchlist, WatchlistEntry};
