//! Quote collection for one cycle.
//!
//! The collector is a two-state machine, collecting until every requested symbol
//! has been quoted at least once, then complete. Each raw chunk from the stream
//! may hold any number of frames. Frames that are not quote deltas, or that do
//! not have the expected shape, are skipped one by one; they never fail the
//! cycle. Keep-alive frames are echoed back so the remote keeps the connection
//! open.
//!
//! Transport failures are not swallowed: they end the cycle and surface to the
//! caller, which reconnects on the next cycle. Collection is also bounded by a
//! timeout and stops early when a shutdown is requested.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};
use price_common::protocol::{self, QUOTE_DELTA};
use price_common::{FeedError, PriceSnapshot, QuoteUpdate, Result, frame};

use crate::connection::Transport;

/// Result of feeding one raw chunk to the collector.
#[derive(Debug, Default, PartialEq)]
pub struct StepOutcome {
    /// Every requested symbol has been observed.
    pub done: bool,
    /// Framed keep-alive replies that must be sent back, in order.
    pub heartbeats: Vec<String>,
}

/// Accumulates quote updates until all requested symbols are observed.
#[derive(Debug)]
pub struct QuoteCollector {
    requested: HashSet<String>,
    quotes: HashMap<String, QuoteUpdate>,
}

impl QuoteCollector {
    /// Start collecting for `symbols`. Duplicates collapse.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QuoteCollector {
            requested: symbols.into_iter().map(Into::into).collect(),
            quotes: HashMap::new(),
        }
    }

    /// Decode `raw_chunk` and apply every quote delta it carries.
    pub fn step(&mut self, raw_chunk: &str) -> StepOutcome {
        let mut heartbeats = Vec::new();

        for payload in frame::decode_stream(raw_chunk) {
            if frame::is_heartbeat(payload) {
                heartbeats.push(frame::encode(payload));
                continue;
            }
            let message = match protocol::parse(payload) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Skipping payload ({}): {}", e, payload);
                    continue;
                }
            };
            if message.function != QUOTE_DELTA {
                debug!("Ignoring {} message", message.function);
                continue;
            }
            match message.quote_update() {
                Some(update) => self.record(update),
                None => debug!("Skipping malformed quote delta: {}", payload),
            }
        }

        StepOutcome {
            done: self.is_complete(),
            heartbeats,
        }
    }

    fn record(&mut self, update: QuoteUpdate) {
        if !self.requested.contains(&update.symbol) {
            debug!("Ignoring quote for unrequested symbol {}", update.symbol);
            return;
        }
        debug!("Quote {}: {:?}", update.symbol, update.last_price);
        self.quotes.insert(update.symbol.clone(), update);
    }

    /// Returns `true` once every requested symbol has been observed.
    pub fn is_complete(&self) -> bool {
        self.quotes.len() == self.requested.len()
    }

    /// Requested symbols not yet observed, sorted.
    pub fn missing(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .requested
            .iter()
            .filter(|symbol| !self.quotes.contains_key(*symbol))
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    /// Copy of what has been collected so far.
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot::from(self.quotes.clone())
    }

    /// Read from `transport` until complete.
    ///
    /// Fails with `Timeout` once `timeout` has elapsed, with `Interrupted` when
    /// `shutdown` is set, and with the transport's error if a read or a
    /// keep-alive reply fails.
    pub fn run<T: Transport + ?Sized>(
        mut self,
        transport: &mut T,
        timeout: Duration,
        shutdown: &AtomicBool,
    ) -> Result<PriceSnapshot> {
        let started = Instant::now();

        while !self.is_complete() {
            if shutdown.load(Ordering::Relaxed) {
                return Err(FeedError::Interrupted);
            }
            if started.elapsed() >= timeout {
                debug!("Collected before timeout: {:?}", self.snapshot());
                return Err(FeedError::Timeout {
                    elapsed_secs: started.elapsed().as_secs(),
                    missing: self.missing(),
                });
            }
            let Some(chunk) = transport.receive()? else {
                continue;
            };
            debug!("<- {}", chunk);

            let outcome = self.step(&chunk);
            for reply in &outcome.heartbeats {
                debug!("Answering heartbeat {}", reply);
                transport.send(reply)?;
            }
        }

        info!(
            "Collected quotes for {} symbols in {:.1}s",
            self.quotes.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(PriceSnapshot::from(self.quotes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use price_common::ProtocolMessage;

    fn delta(symbol: &str, price: f64) -> String {
        ProtocolMessage::quote_delta("qs_test", &QuoteUpdate::with_price(symbol, price))
            .to_frame()
            .unwrap()
    }

    fn never() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn completes_once_all_symbols_seen_in_any_order() {
        let mut collector = QuoteCollector::new(["A", "B", "C"]);
        assert!(!collector.step(&delta("B", 2.0)).done);
        assert!(!collector.step(&delta("A", 1.0)).done);
        assert!(!collector.step(&delta("B", 2.5)).done);
        assert!(collector.step(&delta("C", 3.0)).done);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.last_price("B"), Some(2.5));
    }

    #[test]
    fn never_completes_prematurely() {
        let mut collector = QuoteCollector::new(["A", "B", "C"]);
        let chunk = format!("{}{}{}", delta("A", 1.0), delta("B", 2.0), delta("A", 1.5));
        let outcome = collector.step(&chunk);
        assert!(!outcome.done);
        assert_eq!(collector.missing(), vec!["C".to_string()]);
    }

    #[test]
    fn duplicate_requested_symbols_collapse() {
        let mut collector = QuoteCollector::new(["A", "A"]);
        assert!(collector.step(&delta("A", 1.0)).done);
    }

    #[test]
    fn unrequested_symbols_are_ignored() {
        let mut collector = QuoteCollector::new(["A"]);
        let outcome = collector.step(&format!("{}{}", delta("Z", 9.0), delta("A", 1.0)));
        assert!(outcome.done);
        assert!(!collector.snapshot().contains("Z"));
    }

    #[test]
    fn later_update_replaces_whole_record() {
        let mut collector = QuoteCollector::new(["A"]);
        collector.step(
            r#"~m~82~m~{"m":"qsd","p":["qs_test",{"n":"A","s":"ok","v":{"lp":10,"volume":500,"ch":1}}]}"#,
        );
        collector.step(r#"~m~63~m~{"m":"qsd","p":["qs_test",{"n":"A","s":"ok","v":{"ch":2}}]}"#);

        let quote = collector.snapshot().get("A").cloned().unwrap();
        assert_eq!(quote.last_price, None);
        assert_eq!(quote.volume, None);
        assert_eq!(quote.change, Some(2.0));
    }

    #[test]
    fn malformed_segments_are_skipped() {
        let mut collector = QuoteCollector::new(["A", "B"]);
        let chunk = format!(
            "{}~m~40~m~{{\"m\":\"qsd\",\"p\":[\"qs_test\",{{\"n\":~m~5~m~junk!{}{}",
            delta("A", 1.0),
            r#"~m~37~m~{"m":"qsd","p":["qs_test",{"n":"B"}]}"#,
            r#"~m~33~m~{"session_id":"<0.1.2>","x":1}"#,
        );
        let outcome = collector.step(&chunk);

        assert!(!outcome.done);
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.last_price("A"), Some(1.0));
    }

    #[test]
    fn heartbeats_are_echoed_framed() {
        let mut collector = QuoteCollector::new(["A"]);
        let outcome = collector.step(&format!("~m~4~m~~h~7{}", delta("A", 1.0)));
        assert!(outcome.done);
        assert_eq!(outcome.heartbeats, vec!["~m~4~m~~h~7".to_string()]);
    }

    #[test]
    fn run_returns_snapshot_and_answers_heartbeats() {
        let mut transport = ScriptedTransport::new([
            r#"~m~52~m~{"session_id":"<0.123.456>","timestamp":1700000000}"#.to_string(),
            "~m~4~m~~h~1".to_string(),
            format!("{}{}", delta("IDX:BBCA", 9025.0), delta("IDX:TLKM", 3100.0)),
            delta("IDX:ASII", 5100.0),
            delta("IDX:BBCA", 9050.0),
        ]);
        let collector = QuoteCollector::new(["IDX:BBCA", "IDX:TLKM", "IDX:ASII"]);

        let snapshot = collector
            .run(&mut transport, Duration::from_secs(5), &never())
            .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.last_price("IDX:BBCA"), Some(9025.0));
        assert_eq!(transport.sent, vec!["~m~4~m~~h~1".to_string()]);
    }

    #[test]
    fn run_with_no_symbols_returns_immediately() {
        let mut transport = ScriptedTransport::new(Vec::<String>::new()).closing_when_exhausted();
        let snapshot = QuoteCollector::new(Vec::<String>::new())
            .run(&mut transport, Duration::from_secs(1), &never())
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn run_times_out_with_missing_symbols() {
        let mut transport = ScriptedTransport::new([delta("A", 1.0)]);
        let err = QuoteCollector::new(["A", "C", "B"])
            .run(&mut transport, Duration::from_millis(50), &never())
            .unwrap_err();
        match err {
            FeedError::Timeout { missing, .. } => {
                assert_eq!(missing, vec!["B".to_string(), "C".to_string()])
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn run_stops_on_shutdown() {
        let mut transport = ScriptedTransport::new([delta("A", 1.0)]);
        let shutdown = AtomicBool::new(true);
        let err = QuoteCollector::new(["A"])
            .run(&mut transport, Duration::from_secs(5), &shutdown)
            .unwrap_err();
        assert!(err.is_interrupted());
    }

    #[test]
    fn run_propagates_connection_loss() {
        let mut transport = ScriptedTransport::new([delta("A", 1.0)]).closing_when_exhausted();
        let err = QuoteCollector::new(["A", "B"])
            .run(&mut transport, Duration::from_secs(5), &never())
            .unwrap_err();
        assert!(matches!(err, FeedError::ConnectionClosed(_)));
    }

    #[test]
    fn run_propagates_failed_heartbeat_reply() {
        let mut transport = ScriptedTransport::new(["~m~4~m~~h~2"]).failing_sends_after(0);
        let err = QuoteCollector::new(["A"])
            .run(&mut transport, Duration::from_secs(5), &never())
            .unwrap_err();
        assert!(matches!(err, FeedError::ConnectionClosed(_)));
    }
}
