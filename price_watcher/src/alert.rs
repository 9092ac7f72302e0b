//! Threshold alerts with de-duplication.
//!
//! For each watchlist entry the fresh price is compared against its bounds. A
//! notification is due when the price is at or below the low bound, or at or
//! above the high bound, and differs from the price of the last notification for
//! that symbol. The low bound is checked first, so a degenerate entry with
//! `alert_low >= alert_high` always reports the low breach.
//!
//! The last-notified prices live for the whole process and are only updated
//! when a notification is emitted.
use std::collections::HashMap;

use price_common::{PriceSnapshot, WatchlistEntry};
use strum::Display;

/// Which bound a price crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Breach {
    /// Price is at or below `alert_low`.
    #[strum(serialize = "below alert low")]
    BelowLow,
    /// Price is at or above `alert_high`.
    #[strum(serialize = "above alert high")]
    AboveHigh,
}

/// A message that should be delivered to the recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Exchange-qualified symbol.
    pub symbol: String,
    /// Price that triggered the alert.
    pub price: f64,
    /// Bound that was crossed.
    pub breach: Breach,
    /// Human-readable text.
    pub message: String,
}

/// Outcome of checking one watchlist entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// A bound was crossed at a new price.
    Notify(Notification),
    /// Price observed; nothing to report.
    Quiet {
        /// Exchange-qualified symbol.
        symbol: String,
        /// Current price.
        price: f64,
    },
    /// The symbol never showed up in the snapshot.
    InvalidSymbol(String),
    /// The symbol was quoted without a last price.
    NoPrice(String),
}

/// Last notified price per symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    last_alert: HashMap<String, f64>,
}

impl AlertState {
    /// Price of the last notification for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.last_alert.get(symbol).copied()
    }

    fn record(&mut self, symbol: &str, price: f64) {
        self.last_alert.insert(String::from(symbol), price);
    }

    /// Number of symbols that have been notified at least once.
    pub fn tracked(&self) -> usize {
        self.last_alert.len()
    }
}

/// Compares snapshots against the watchlist and owns the de-dup state.
#[derive(Debug)]
pub struct AlertEvaluator {
    exchange: String,
    currency: String,
    state: AlertState,
}

impl AlertEvaluator {
    /// Creates an evaluator with empty alert state.
    pub fn new(exchange: &str, currency: &str) -> Self {
        AlertEvaluator {
            exchange: String::from(exchange),
            currency: String::from(currency),
            state: AlertState::default(),
        }
    }

    /// Current de-dup state.
    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Check every entry against `snapshot`, in watchlist order.
    pub fn evaluate(
        &mut self,
        snapshot: &PriceSnapshot,
        watchlist: &[WatchlistEntry],
    ) -> Vec<Evaluation> {
        watchlist
            .iter()
            .map(|entry| self.evaluate_entry(snapshot, entry))
            .collect()
    }

    fn evaluate_entry(&mut self, snapshot: &PriceSnapshot, entry: &WatchlistEntry) -> Evaluation {
        let symbol = entry.qualified_symbol(&self.exchange);
        let Some(quote) = snapshot.get(&symbol) else {
            return Evaluation::InvalidSymbol(symbol);
        };
        let Some(price) = quote.last_price else {
            return Evaluation::NoPrice(symbol);
        };

        if self.state.get(&symbol) == Some(price) {
            return Evaluation::Quiet { symbol, price };
        }
        let (breach, bound) = if price <= entry.alert_low {
            (Breach::BelowLow, entry.alert_low)
        } else if price >= entry.alert_high {
            (Breach::AboveHigh, entry.alert_high)
        } else {
            return Evaluation::Quiet { symbol, price };
        };

        self.state.record(&symbol, price);
        let message = format!(
            "Hello, {symbol} is now at {currency} {price}, {breach} {bound} {currency}",
            currency = self.currency,
            price = format_amount(price),
            bound = format_amount(bound),
        );
        Evaluation::Notify(Notification {
            symbol,
            price,
            breach,
            message,
        })
    }
}

/// Format `value` with `.` between thousands and `,` before the decimals.
///
/// Whole numbers print without decimals; otherwise up to two decimals are kept.
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && rounded.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_common::QuoteUpdate;

    fn entry(symbol: &str, low: f64, high: f64) -> WatchlistEntry {
        WatchlistEntry {
            symbol: symbol.into(),
            alert_low: low,
            alert_high: high,
        }
    }

    fn snapshot(quotes: &[(&str, f64)]) -> PriceSnapshot {
        quotes
            .iter()
            .map(|(symbol, price)| QuoteUpdate::with_price(symbol, *price))
            .collect()
    }

    fn notifications(evaluations: &[Evaluation]) -> Vec<&Notification> {
        evaluations
            .iter()
            .filter_map(|e| match e {
                Evaluation::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn repeat_price_is_not_notified_twice() {
        let watchlist = vec![entry("BBCA", 100.0, 200.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");

        let first = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 90.0)]), &watchlist);
        let sent = notifications(&first);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].breach, Breach::BelowLow);
        assert_eq!(evaluator.state().get("IDX:BBCA"), Some(90.0));

        let second = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 90.0)]), &watchlist);
        assert!(notifications(&second).is_empty());
        assert_eq!(
            second,
            vec![Evaluation::Quiet {
                symbol: "IDX:BBCA".into(),
                price: 90.0,
            }]
        );

        let third = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 95.0)]), &watchlist);
        assert_eq!(notifications(&third).len(), 1);
        assert_eq!(evaluator.state().get("IDX:BBCA"), Some(95.0));
    }

    #[test]
    fn bounds_are_inclusive() {
        let watchlist = vec![entry("LOW", 100.0, 200.0), entry("HIGH", 100.0, 200.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let evaluations = evaluator.evaluate(
            &snapshot(&[("IDX:LOW", 100.0), ("IDX:HIGH", 200.0)]),
            &watchlist,
        );
        let sent = notifications(&evaluations);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].breach, Breach::BelowLow);
        assert_eq!(sent[1].breach, Breach::AboveHigh);
    }

    #[test]
    fn price_inside_band_is_quiet_and_not_recorded() {
        let watchlist = vec![entry("BBCA", 100.0, 200.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let evaluations = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 150.0)]), &watchlist);
        assert!(notifications(&evaluations).is_empty());
        assert_eq!(evaluator.state().tracked(), 0);
    }

    #[test]
    fn low_bound_wins_on_degenerate_config() {
        let watchlist = vec![entry("BBCA", 300.0, 100.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let evaluations = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 200.0)]), &watchlist);
        assert_eq!(notifications(&evaluations)[0].breach, Breach::BelowLow);
    }

    #[test]
    fn missing_symbol_is_reported_and_state_untouched() {
        let watchlist = vec![entry("GOTO", 50.0, 100.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let evaluations = evaluator.evaluate(&snapshot(&[("IDX:BBCA", 1.0)]), &watchlist);
        assert_eq!(evaluations, vec![Evaluation::InvalidSymbol("IDX:GOTO".into())]);
        assert_eq!(evaluator.state().tracked(), 0);
    }

    #[test]
    fn quote_without_price_is_reported() {
        let watchlist = vec![entry("BBCA", 50.0, 100.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let quotes: PriceSnapshot = vec![QuoteUpdate {
            symbol: "IDX:BBCA".into(),
            volume: Some(10.0),
            ..Default::default()
        }]
        .into_iter()
        .collect();
        let evaluations = evaluator.evaluate(&quotes, &watchlist);
        assert_eq!(evaluations, vec![Evaluation::NoPrice("IDX:BBCA".into())]);
    }

    #[test]
    fn message_names_symbol_price_and_bound() {
        let watchlist = vec![entry("BBCA", 9100.0, 10500.0), entry("TLKM", 2000.0, 3000.0)];
        let mut evaluator = AlertEvaluator::new("IDX", "IDR");
        let evaluations = evaluator.evaluate(
            &snapshot(&[("IDX:BBCA", 9025.0), ("IDX:TLKM", 3150.0)]),
            &watchlist,
        );
        let sent = notifications(&evaluations);
        assert_eq!(
            sent[0].message,
            "Hello, IDX:BBCA is now at IDR 9.025, below alert low 9.100 IDR"
        );
        assert_eq!(
            sent[1].message,
            "Hello, IDX:TLKM is now at IDR 3.150, above alert high 3.000 IDR"
        );
    }

    #[test]
    fn amounts_use_dot_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(950.0), "950");
        assert_eq!(format_amount(9025.0), "9.025");
        assert_eq!(format_amount(1234567.0), "1.234.567");
        assert_eq!(format_amount(1234.5), "1.234,5");
        assert_eq!(format_amount(99.999), "100");
        assert_eq!(format_amount(-1500.25), "-1.500,25");
        assert_eq!(format_amount(-0.001), "0");
    }
}
