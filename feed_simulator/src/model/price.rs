//! Synthetic price path for one symbol.
//!
//! Each symbol opens at a random price and then follows a small random walk.
//! Prices are whole numbers, like IDX quotes. Every tick also adds some volume.
//! Change and change-percent are measured against the opening price.
use price_common::QuoteUpdate;
use rand::Rng;

/// Evolving market state for a single symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceState {
    open: f64,
    last: f64,
    volume: f64,
}

impl PriceState {
    /// Open at a random price between 50 and 10 000.
    pub fn open() -> Self {
        let mut rng = rand::rng();
        Self::open_at(rng.random_range(50..10_000) as f64)
    }

    /// Open at `price`.
    pub fn open_at(price: f64) -> Self {
        PriceState {
            open: price,
            last: price,
            volume: 0.0,
        }
    }

    /// Calculate the next synthetic price using a small random walk around `current_price`.
    ///
    /// The change is sampled uniformly from `[-1%, +1%]`, rounded to a whole
    /// price and clamped to at least 1.
    pub fn next_price(current_price: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        (current_price * (1.0 + change)).round().max(1.0)
    }

    /// Move one tick forward.
    pub fn advance(&mut self) {
        let mut rng = rand::rng();
        self.last = Self::next_price(self.last);
        self.volume += f64::from(rng.random_range(100..5_000u32));
    }

    /// Quote reflecting the current state.
    pub fn quote(&self, symbol: &str) -> QuoteUpdate {
        let change = self.last - self.open;
        let change_percent = (change / self.open * 10_000.0).round() / 100.0;
        QuoteUpdate {
            symbol: String::from(symbol),
            last_price: Some(self.last),
            volume: Some(self.volume),
            change: Some(change),
            change_percent: Some(change_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_price_stays_near_current() {
        for _ in 0..1_000 {
            let next = PriceState::next_price(5_000.0);
            assert!((4_950.0..=5_050.0).contains(&next), "{}", next);
            assert_eq!(next.fract(), 0.0);
        }
        assert!(PriceState::next_price(0.2) >= 1.0);
    }

    #[test]
    fn quote_reports_change_against_open() {
        let mut state = PriceState::open_at(1_000.0);
        assert_eq!(state.quote("IDX:BBCA").change, Some(0.0));

        state.last = 1_025.0;
        state.volume = 300.0;
        let quote = state.quote("IDX:BBCA");
        assert_eq!(quote.symbol, "IDX:BBCA");
        assert_eq!(quote.last_price, Some(1_025.0));
        assert_eq!(quote.volume, Some(300.0));
        assert_eq!(quote.change, Some(25.0));
        assert_eq!(quote.change_percent, Some(2.5));
    }

    #[test]
    fn advance_accumulates_volume() {
        let mut state = PriceState::open();
        state.advance();
        state.advance();
        assert!(state.volume >= 200.0);
    }
}
