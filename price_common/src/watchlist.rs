//! Watchlist entries and helpers for loading them from JSON files.
//!
//! The watchlist file is a JSON array of `{symbol, alert_low, alert_high}`
//! objects. Symbols are stored as written; the exchange prefix is applied when
//! they are registered on the stream.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::net::qualify_symbol;

/// One watched symbol with its alert bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Symbol without exchange prefix (e.g., `BBCA`).
    pub symbol: String,
    /// Notify when the price is at or below this value.
    pub alert_low: f64,
    /// Notify when the price is at or above this value.
    pub alert_high: f64,
}

impl WatchlistEntry {
    /// Symbol as registered on the stream (`EXCHANGE:SYMBOL`).
    pub fn qualified_symbol(&self, exchange: &str) -> String {
        qualify_symbol(exchange, &self.symbol)
    }

    fn validate(&self, index: usize) -> Result<(), FeedError> {
        if self.symbol.trim().is_empty() {
            return Err(FeedError::ParseWatchlist(format!(
                "entry {}: symbol is empty",
                index
            )));
        }
        if !self.alert_low.is_finite() || !self.alert_high.is_finite() {
            return Err(FeedError::ParseWatchlist(format!(
                "entry {} ({}): alert bounds must be finite numbers",
                index, self.symbol
            )));
        }
        Ok(())
    }
}

/// Trait providing watchlist parsing from any reader.
pub trait WatchlistParser: Sized {
    /// Parses a JSON array of entries from `reader`.
    ///
    /// Returns an error if the document is not valid JSON, does not have the
    /// expected shape, or contains an entry that fails validation.
    fn parse_from_reader<R: Read>(reader: R) -> Result<Self, FeedError>;
}

/// Immutable list of watched symbols, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
}

impl WatchlistParser for Watchlist {
    fn parse_from_reader<R: Read>(reader: R) -> Result<Self, FeedError> {
        let entries: Vec<WatchlistEntry> = serde_json::from_reader(reader)
            .map_err(|e| FeedError::ParseWatchlist(e.to_string()))?;
        for (index, entry) in entries.iter().enumerate() {
            entry.validate(index)?;
        }
        Ok(Watchlist { entries })
    }
}

impl Watchlist {
    /// Load and validate the watchlist stored at `path`.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|e| {
            FeedError::ParseWatchlist(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::parse_from_reader(BufReader::new(file))
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the file listed no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exchange-qualified symbols in file order, duplicates removed.
    pub fn qualified_symbols(&self, exchange: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| entry.qualified_symbol(exchange))
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect()
    }
}

impl From<Vec<WatchlistEntry>> for Watchlist {
    fn from(entries: Vec<WatchlistEntry>) -> Self {
        Watchlist { entries }
    }
}
