//! Protocol message envelope carried inside frames.
//!
//! Every command and push update is a compact JSON object with two keys: `m`,
//! the remote function name, and `p`, its positional parameters. Payloads that
//! do not fit the envelope (session greetings, keep-alives, garbage) are reported
//! as [`NotAMessage`], which callers skip instead of failing.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::error::FeedError;
use crate::frame;
use crate::quote::QuoteUpdate;

/// Opens a quote session.
pub const CREATE_SESSION: &str = "quote_create_session";
/// Declares which fields the session wants pushed.
pub const SET_FIELDS: &str = "quote_set_fields";
/// Subscribes a symbol to the session.
pub const ADD_SYMBOLS: &str = "quote_add_symbols";
/// Push update with new field values for one symbol.
pub const QUOTE_DELTA: &str = "qsd";

/// Last price field name.
pub const FIELD_LAST_PRICE: &str = "lp";
/// Volume field name.
pub const FIELD_VOLUME: &str = "volume";
/// Change field name.
pub const FIELD_CHANGE: &str = "ch";
/// Change-percent field name.
pub const FIELD_CHANGE_PERCENT: &str = "chp";
/// The fields requested for every session, in declaration order.
pub const QUOTE_FIELDS: [&str; 4] = [
    FIELD_LAST_PRICE,
    FIELD_VOLUME,
    FIELD_CHANGE,
    FIELD_CHANGE_PERCENT,
];

/// Decoded `{"m": function, "p": params}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Remote function name.
    #[serde(rename = "m")]
    pub function: String,
    /// Positional arguments; order is significant.
    #[serde(rename = "p", default)]
    pub params: Vec<Value>,
}

/// A payload that is not a protocol message. Recoverable: skip and move on.
#[derive(Debug, Error)]
#[error("not a protocol message: {reason}")]
pub struct NotAMessage {
    /// Why decoding failed.
    pub reason: String,
}

impl ProtocolMessage {
    /// Creates a message for `function` with positional `params`.
    pub fn new(function: &str, params: Vec<Value>) -> Self {
        ProtocolMessage {
            function: String::from(function),
            params,
        }
    }

    /// Build a `qsd` push update for `session` from `quote`. Absent fields are left out.
    pub fn quote_delta(session: &str, quote: &QuoteUpdate) -> Self {
        let mut values = Map::new();
        let fields = [
            (FIELD_LAST_PRICE, quote.last_price),
            (FIELD_VOLUME, quote.volume),
            (FIELD_CHANGE, quote.change),
            (FIELD_CHANGE_PERCENT, quote.change_percent),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                values.insert(String::from(name), json!(value));
            }
        }
        ProtocolMessage::new(
            QUOTE_DELTA,
            vec![
                json!(session),
                json!({ "n": quote.symbol, "s": "ok", "v": values }),
            ],
        )
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, FeedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize and wrap in a frame header, ready for the wire.
    pub fn to_frame(&self) -> Result<String, FeedError> {
        Ok(frame::encode(&self.to_json()?))
    }

    /// Extract the quote update from a `qsd` message.
    ///
    /// The second parameter must be an object with a string `n` (symbol) and an
    /// object `v` (field values). Missing or non-numeric fields become `None`.
    /// Returns `None` for any other function or shape.
    pub fn quote_update(&self) -> Option<QuoteUpdate> {
        if self.function != QUOTE_DELTA {
            return None;
        }
        let record = self.params.get(1)?;
        let symbol = record.get("n")?.as_str()?;
        let values = record.get("v")?.as_object()?;
        let field = |name: &str| values.get(name).and_then(Value::as_f64);

        Some(QuoteUpdate {
            symbol: String::from(symbol),
            last_price: field(FIELD_LAST_PRICE),
            volume: field(FIELD_VOLUME),
            change: field(FIELD_CHANGE),
            change_percent: field(FIELD_CHANGE_PERCENT),
        })
    }

    /// String parameter at `index`, if present.
    pub fn str_param(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(Value::as_str)
    }
}

/// Serialize `{"m": function, "p": params}` without extraneous whitespace.
pub fn build(function: &str, params: Vec<Value>) -> Result<String, FeedError> {
    ProtocolMessage::new(function, params).to_json()
}

/// [`build`] and frame the result.
pub fn build_frame(function: &str, params: Vec<Value>) -> Result<String, FeedError> {
    ProtocolMessage::new(function, params).to_frame()
}

/// Decode a frame payload into a protocol message.
pub fn parse(payload: &str) -> Result<ProtocolMessage, NotAMessage> {
    serde_json::from_str(payload).map_err(|e| NotAMessage {
        reason: e.to_string(),
    })
}
