//! Validated runtime configuration.
//!
//! `Args` is converted once at startup into a `Config` that is passed explicitly
//! to the parts that need it. Nothing reads process-wide settings after that.
use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use price_common::FeedError;

use crate::args::Args;

/// Everything needed to open the stream and collect one snapshot.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// `Origin` header value.
    pub origin: String,
    /// Upper bound on one collection cycle.
    pub collect_timeout: Duration,
}

/// How alert messages are delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryConfig {
    /// POST to the messaging API.
    Http {
        /// API endpoint.
        url: String,
        /// Recipient identifier.
        target: String,
        /// Value of the `Authorization` header.
        auth_key: String,
    },
    /// Only log the messages.
    DryRun,
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Watchlist file location.
    pub watchlist_path: PathBuf,
    /// Exchange prefix for watchlist symbols.
    pub exchange: String,
    /// Currency label for alert messages.
    pub currency: String,
    /// Sleep between cycles.
    pub poll_interval: Duration,
    /// Stream settings.
    pub feed: FeedConfig,
    /// Alert delivery settings.
    pub delivery: DeliveryConfig,
}

impl TryFrom<Args> for Config {
    type Error = FeedError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.interval == 0 {
            return Err(FeedError::Config("--interval must be at least 1 second".into()));
        }
        if args.collect_timeout == 0 {
            return Err(FeedError::Config(
                "--collect-timeout must be at least 1 second".into(),
            ));
        }
        let exchange = args.exchange.trim().to_string();
        if exchange.is_empty() || exchange.contains(':') {
            return Err(FeedError::Config(format!(
                "invalid exchange prefix: {:?}",
                args.exchange
            )));
        }

        let delivery = match (args.dry_run, non_blank(args.target), non_blank(args.auth_key)) {
            (true, _, _) => DeliveryConfig::DryRun,
            (false, Some(target), Some(auth_key)) => DeliveryConfig::Http {
                url: args.notify_url,
                target,
                auth_key,
            },
            (false, _, _) => {
                warn!("WHATSAPP_TARGET or FONNTE_AUTH_KEY not set; alerts will only be logged");
                DeliveryConfig::DryRun
            }
        };

        Ok(Config {
            watchlist_path: normalize_path(&args.watchlist),
            exchange,
            currency: args.currency.trim().to_string(),
            poll_interval: Duration::from_secs(args.interval),
            feed: FeedConfig {
                url: args.feed_url,
                origin: args.origin,
                collect_timeout: Duration::from_secs(args.collect_timeout),
            },
            delivery,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["price_watcher"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn full_credentials_select_http_delivery() {
        let config = Config::try_from(parse(&[
            "--target",
            "08123",
            "--auth-key",
            "secret",
            "--interval",
            "15",
            "--watchlist",
            "\"stocks.json\"",
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.watchlist_path, PathBuf::from("stocks.json"));
        assert_eq!(config.exchange, "IDX");
        assert_eq!(config.feed.collect_timeout, Duration::from_secs(30));
        match config.delivery {
            DeliveryConfig::Http { target, auth_key, url } => {
                assert_eq!(target, "08123");
                assert_eq!(auth_key, "secret");
                assert_eq!(url, price_common::net::NOTIFY_URL);
            }
            other => panic!("unexpected delivery {:?}", other),
        }
    }

    #[test]
    fn dry_run_wins_over_credentials() {
        let config = Config::try_from(parse(&[
            "--target", "08123", "--auth-key", "secret", "--dry-run",
        ]))
        .unwrap();
        assert_eq!(config.delivery, DeliveryConfig::DryRun);
    }

    #[test]
    fn blank_credentials_fall_back_to_dry_run() {
        let config = Config::try_from(parse(&["--target", " ", "--auth-key", "secret"])).unwrap();
        assert_eq!(config.delivery, DeliveryConfig::DryRun);
    }

    #[test]
    fn rejects_zero_durations_and_bad_exchange() {
        assert!(Config::try_from(parse(&["--interval", "0"])).is_err());
        assert!(Config::try_from(parse(&["--collect-timeout", "0"])).is_err());
        assert!(Config::try_from(parse(&["--exchange", "IDX:"])).is_err());
    }
}
