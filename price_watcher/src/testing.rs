//! In-memory transport for unit tests.
use std::collections::VecDeque;

use price_common::{FeedError, Result};

use crate::connection::Transport;

/// Replays scripted chunks and records everything sent.
///
/// Once the script is exhausted `receive` keeps returning `Ok(None)`, like a
/// silent remote, unless `close_when_exhausted` was requested.
pub struct ScriptedTransport {
    chunks: VecDeque<String>,
    pub sent: Vec<String>,
    pub closed: bool,
    fail_sends_after: Option<usize>,
    close_when_exhausted: bool,
}

impl ScriptedTransport {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedTransport {
            chunks: chunks.into_iter().map(Into::into).collect(),
            sent: Vec::new(),
            closed: false,
            fail_sends_after: None,
            close_when_exhausted: false,
        }
    }

    pub fn failing_sends_after(mut self, count: usize) -> Self {
        self.fail_sends_after = Some(count);
        self
    }

    pub fn closing_when_exhausted(mut self) -> Self {
        self.close_when_exhausted = true;
        self
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, text: &str) -> Result<()> {
        if self.fail_sends_after.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(FeedError::ConnectionClosed(String::from("scripted send failure")));
        }
        self.sent.push(text.to_string());
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<String>> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.close_when_exhausted => {
                Err(FeedError::ConnectionClosed(String::from("script exhausted")))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
