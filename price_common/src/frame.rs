//! Length-prefixed text framing used on the quote stream.
//!
//! Every unit on the wire looks like `~m~<len>~m~<payload>`. A single WebSocket
//! message may carry several frames back to back, so decoding splits on the
//! delimiter pattern instead of trusting the length markers. Keep-alive frames
//! carry a `~h~<n>` payload that the receiver has to echo back.
use std::sync::LazyLock;

use regex::Regex;

/// Marker surrounding the decimal length of every frame.
pub const FRAME_MARKER: &str = "~m~";
/// Prefix of keep-alive payloads.
pub const HEARTBEAT_MARKER: &str = "~h~";

static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~m~\d+~m~").expect("frame delimiter pattern is valid"));

/// Wrap `payload` in a frame header. The length is the payload's character count.
pub fn encode(payload: &str) -> String {
    format!(
        "{marker}{len}{marker}{payload}",
        marker = FRAME_MARKER,
        len = payload.chars().count()
    )
}

/// Split a raw chunk into its frame payloads, in order.
///
/// Delimiters are discarded and empty or whitespace-only segments are dropped.
/// Length markers are not validated: a truncated or garbled frame simply
/// shows up as a payload that later fails to parse.
pub fn decode_stream(raw: &str) -> Vec<&str> {
    DELIMITER
        .split(raw)
        .filter(|segment| !segment.trim().is_empty())
        .collect()
}

/// Returns `true` for `~h~<n>` keep-alive payloads.
pub fn is_heartbeat(payload: &str) -> bool {
    payload
        .strip_prefix(HEARTBEAT_MARKER)
        .is_some_and(|counter| !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()))
}

/// Build the keep-alive payload for `counter`.
pub fn heartbeat(counter: u64) -> String {
    format!("{}{}", HEARTBEAT_MARKER, counter)
}
