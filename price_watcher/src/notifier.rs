//! Alert delivery.
//!
//! Delivery is best-effort: a rejected or failed request is logged with whatever
//! the API returned and the cycle carries on. Nothing is retried.
use std::time::Duration;

use log::{error, info, warn};
use price_common::{FeedError, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;

use crate::alert::{Evaluation, Notification, format_amount};
use crate::config::DeliveryConfig;

/// Timeout for one delivery request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed delivery options sent with every message.
const SCHEDULE: &str = "0";
const TYPING: &str = "false";
const DELAY_SECS: &str = "2";
const COUNTRY_CODE: &str = "62";

/// What happened to one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The API accepted the message.
    Delivered,
    /// The API answered with a non-200 status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },
    /// The message was only logged.
    Logged,
}

/// Sends alert messages to the recipient.
pub trait Notifier {
    /// Deliver `message`. Errors mean the request could not be made at all.
    fn send(&self, message: &str) -> Result<Delivery>;
}

/// Posts messages to the HTTP messaging API as form data.
pub struct FonnteNotifier {
    client: Client,
    url: String,
    target: String,
    auth_key: String,
}

impl FonnteNotifier {
    /// Creates a notifier posting to `url` on behalf of `target`.
    pub fn new(url: &str, target: &str, auth_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Notification(format!("cannot build HTTP client: {}", e)))?;
        Ok(FonnteNotifier {
            client,
            url: String::from(url),
            target: String::from(target),
            auth_key: String::from(auth_key),
        })
    }
}

impl Notifier for FonnteNotifier {
    fn send(&self, message: &str) -> Result<Delivery> {
        let form = [
            ("target", self.target.as_str()),
            ("message", message),
            ("schedule", SCHEDULE),
            ("typing", TYPING),
            ("delay", DELAY_SECS),
            ("countryCode", COUNTRY_CODE),
        ];
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, self.auth_key.as_str())
            .form(&form)
            .send()
            .map_err(|e| FeedError::Notification(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(Delivery::Delivered);
        }
        let body = response
            .text()
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        Ok(Delivery::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Logs messages instead of sending them.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &str) -> Result<Delivery> {
        info!("[dry-run] {}", message);
        Ok(Delivery::Logged)
    }
}

/// Build the notifier selected by `config`.
pub fn from_config(config: &DeliveryConfig) -> Result<Box<dyn Notifier>> {
    match config {
        DeliveryConfig::Http {
            url,
            target,
            auth_key,
        } => Ok(Box::new(FonnteNotifier::new(url, target, auth_key)?)),
        DeliveryConfig::DryRun => Ok(Box::new(LogNotifier)),
    }
}

/// Log every evaluation and deliver the notifications. Never fails.
///
/// Prices are logged with the `currency` label. Returns the number of messages
/// the API accepted or logged.
pub fn dispatch(notifier: &dyn Notifier, evaluations: &[Evaluation], currency: &str) -> usize {
    let mut delivered = 0;
    for evaluation in evaluations {
        match evaluation {
            Evaluation::Notify(notification) => {
                info!(
                    "{} ({})",
                    price_line(&notification.symbol, currency, notification.price),
                    notification.breach
                );
                if deliver(notifier, notification) {
                    delivered += 1;
                }
            }
            Evaluation::Quiet { symbol, price } => {
                info!("{}", price_line(symbol, currency, *price))
            }
            Evaluation::InvalidSymbol(symbol) => warn!("Invalid stock symbol: {}", symbol),
            Evaluation::NoPrice(symbol) => warn!("No last price reported for {}", symbol),
        }
    }
    delivered
}

fn price_line(symbol: &str, currency: &str, price: f64) -> String {
    format!(
        "Checking {} - Current Price: {} {}",
        symbol,
        currency,
        format_amount(price)
    )
}

fn deliver(notifier: &dyn Notifier, notification: &Notification) -> bool {
    match notifier.send(&notification.message) {
        Ok(Delivery::Delivered) => {
            info!("Alert for {} delivered", notification.symbol);
            true
        }
        Ok(Delivery::Logged) => true,
        Ok(Delivery::Rejected { status, body }) => {
            warn!(
                "Alert for {} rejected with status {}: {}",
                notification.symbol, status, body
            );
            false
        }
        Err(e) => {
            error!("Alert for {} not sent: {}", notification.symbol, e);
            false
        }
    }
}
