//! Quote data model.
//!
//! A `QuoteUpdate` is one push update for a symbol as reported by the stream. The
//! `PriceSnapshot` is the table of latest updates gathered during a single
//! collection cycle. Updates replace the stored record for their symbol
//! wholesale; fields missing from a later update are not carried over.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Latest values reported for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    /// Exchange-qualified symbol (e.g., `IDX:BBCA`).
    pub symbol: String,
    /// Last traded price.
    pub last_price: Option<f64>,
    /// Traded volume for the session.
    pub volume: Option<f64>,
    /// Absolute change against the previous close.
    pub change: Option<f64>,
    /// Change against the previous close, in percent.
    pub change_percent: Option<f64>,
}

impl QuoteUpdate {
    /// Creates an update carrying only a last price.
    pub fn with_price(symbol: &str, last_price: f64) -> Self {
        QuoteUpdate {
            symbol: String::from(symbol),
            last_price: Some(last_price),
            ..Default::default()
        }
    }
}

/// Per-symbol quotes collected during one cycle. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    quotes: HashMap<String, QuoteUpdate>,
}

impl PriceSnapshot {
    /// Quote stored for `symbol`, if it was observed.
    pub fn get(&self, symbol: &str) -> Option<&QuoteUpdate> {
        self.quotes.get(symbol)
    }

    /// Last price for `symbol`, if observed and reported.
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).and_then(|quote| quote.last_price)
    }

    /// Returns `true` if `symbol` received at least one update.
    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    /// Number of symbols in the snapshot.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Returns `true` if no symbol was observed.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl From<HashMap<String, QuoteUpdate>> for PriceSnapshot {
    fn from(quotes: HashMap<String, QuoteUpdate>) -> Self {
        PriceSnapshot { quotes }
    }
}

impl FromIterator<QuoteUpdate> for PriceSnapshot {
    /// Later updates for the same symbol replace earlier ones.
    fn from_iter<I: IntoIterator<Item = QuoteUpdate>>(iter: I) -> Self {
        let quotes = iter
            .into_iter()
            .map(|quote| (quote.symbol.clone(), quote))
            .collect();
        PriceSnapshot { quotes }
    }
}
