//! Quote stream generator and subscriber broadcasting.
//!
//! The `QuoteGenerator` runs a background thread that advances a synthetic price
//! path for every symbol any client has subscribed to, and pushes a fresh
//! `QuoteUpdate` to each subscriber of that symbol on every tick. Client streams
//! register through the channel returned by `QuoteGenerator::start`.
//!
//! Design notes:
//! - Prices are kept per symbol, so all clients observe the same price path.
//! - Broadcast is best-effort: if sending to a subscriber fails, it is removed.
//!   A symbol's price path goes away with its last subscriber.
//! - The thread exits once the registration channel is closed and no
//!   subscriber is left.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, TryRecvError, unbounded};
use log::{debug, info};
use price_common::QuoteUpdate;

use crate::model::price::PriceState;

/// Request to receive quotes for one symbol.
pub struct Subscription {
    /// Exchange-qualified symbol.
    pub symbol: String,
    /// Where quotes for `symbol` are delivered.
    pub tx: Sender<QuoteUpdate>,
}

/// Subscribers and the price path of every symbol at least one of them wants.
#[derive(Default)]
struct Market {
    subscribers: Vec<Subscription>,
    prices: HashMap<String, PriceState>,
}

impl Market {
    fn subscribe(&mut self, subscription: Subscription) {
        self.prices
            .entry(subscription.symbol.clone())
            .or_insert_with(PriceState::open);
        self.subscribers.push(subscription);
        debug!("Generator: {} subscriptions", self.subscribers.len());
    }

    /// Advance every price one step and deliver the new quotes.
    ///
    /// Subscribers whose receiver is gone are removed, and so are the prices
    /// nobody subscribes to any more.
    fn tick(&mut self) {
        for state in self.prices.values_mut() {
            state.advance();
        }
        let prices = &self.prices;
        self.subscribers
            .retain(|subscription| match prices.get(&subscription.symbol) {
                Some(state) => subscription
                    .tx
                    .send(state.quote(&subscription.symbol))
                    .is_ok(),
                None => false,
            });
        let subscribers = &self.subscribers;
        self.prices
            .retain(|symbol, _| subscribers.iter().any(|s| &s.symbol == symbol));
    }

    fn is_idle(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Background market data generator that broadcasts to subscribers.
pub struct QuoteGenerator;

impl QuoteGenerator {
    /// Start the generator thread ticking every `tick` and return the registration channel.
    pub fn start(tick: Duration) -> Sender<Subscription> {
        let (subscribe_tx, subscribe_rx) = unbounded::<Subscription>();

        thread::spawn(move || {
            let mut market = Market::default();
            let mut registrations_open = true;

            info!("Quote generator started (Thread ID: {:?})", thread::current().id());

            loop {
                while registrations_open {
                    match subscribe_rx.try_recv() {
                        Ok(subscription) => market.subscribe(subscription),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => registrations_open = false,
                    }
                }
                if !registrations_open && market.is_idle() {
                    break;
                }

                market.tick();
                thread::sleep(tick);
            }
            info!("Quote generator stopped");
        });
        subscribe_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(symbol: &str) -> (Subscription, crossbeam_channel::Receiver<QuoteUpdate>) {
        let (tx, rx) = unbounded();
        let subscription = Subscription {
            symbol: symbol.into(),
            tx,
        };
        (subscription, rx)
    }

    #[test]
    fn subscribers_receive_quotes_for_their_symbol() {
        let subscribe_tx = QuoteGenerator::start(Duration::from_millis(5));
        let (sub, rx) = subscription("IDX:BBCA");
        subscribe_tx.send(sub).unwrap();

        let quote = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(quote.symbol, "IDX:BBCA");
        assert!(quote.last_price.is_some_and(|p| p >= 1.0));
    }

    #[test]
    fn clients_share_one_price_path() {
        let subscribe_tx = QuoteGenerator::start(Duration::from_millis(5));
        let (first, rx_a) = subscription("IDX:TLKM");
        let (second, rx_b) = subscription("IDX:TLKM");
        subscribe_tx.send(first).unwrap();
        subscribe_tx.send(second).unwrap();

        // The earlier subscriber sees every tick the later one sees.
        let b = rx_b.recv_timeout(Duration::from_secs(5)).unwrap();
        let shared = (0..1_000)
            .map_while(|_| rx_a.recv_timeout(Duration::from_secs(5)).ok())
            .any(|a| a == b);
        assert!(shared);
    }

    #[test]
    fn tick_delivers_one_quote_per_subscriber() {
        let mut market = Market::default();
        let (bbca, rx_bbca) = subscription("IDX:BBCA");
        let (tlkm, rx_tlkm) = subscription("IDX:TLKM");
        market.subscribe(bbca);
        market.subscribe(tlkm);

        market.tick();

        assert_eq!(rx_bbca.try_recv().unwrap().symbol, "IDX:BBCA");
        assert_eq!(rx_tlkm.try_recv().unwrap().symbol, "IDX:TLKM");
        assert!(rx_bbca.try_recv().is_err());
    }

    #[test]
    fn prices_without_subscribers_are_dropped() {
        let mut market = Market::default();
        let (bbca, rx_bbca) = subscription("IDX:BBCA");
        let (tlkm, rx_tlkm) = subscription("IDX:TLKM");
        market.subscribe(bbca);
        market.subscribe(tlkm);
        assert_eq!(market.prices.len(), 2);

        drop(rx_tlkm);
        market.tick();
        assert_eq!(market.subscribers.len(), 1);
        assert!(market.prices.contains_key("IDX:BBCA"));
        assert!(!market.prices.contains_key("IDX:TLKM"));

        drop(rx_bbca);
        market.tick();
        assert!(market.is_idle());
        assert!(market.prices.is_empty());
    }
}
