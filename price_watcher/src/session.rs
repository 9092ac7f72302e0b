//! Quote session setup.
//!
//! Each connection gets a fresh random session id. The setup sequence creates
//! the session, declares the pushed fields, then subscribes the symbols one by
//! one. The order matters: fields and symbols can only be attached to a session
//! that already exists.
use std::fmt;

use log::{debug, info};
use price_common::Result;
use price_common::protocol::{self, ADD_SYMBOLS, CREATE_SESSION, QUOTE_FIELDS, SET_FIELDS};
use rand::Rng;
use serde_json::{Value, json};

use crate::connection::Transport;

/// Prefix of every quote session id.
pub const SESSION_PREFIX: &str = "qs_";
/// Number of random letters after the prefix.
const SUFFIX_LEN: usize = 12;

/// Opaque id scoping protocol commands to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates `qs_` followed by 12 random lowercase letters.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect();
        SessionId(format!("{}{}", SESSION_PREFIX, suffix))
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues the session setup commands over a transport.
pub struct SessionManager;

impl SessionManager {
    /// Create `session`, request the quote fields, and subscribe every symbol.
    ///
    /// Stops at the first failed send; the caller treats that as a failed cycle.
    pub fn setup<T: Transport + ?Sized>(
        transport: &mut T,
        session: &SessionId,
        symbols: &[String],
    ) -> Result<()> {
        let id = json!(session.as_str());

        Self::send_command(transport, CREATE_SESSION, vec![id.clone()])?;

        let mut fields = vec![id.clone()];
        fields.extend(QUOTE_FIELDS.iter().map(|field| json!(field)));
        Self::send_command(transport, SET_FIELDS, fields)?;

        for symbol in symbols {
            Self::send_command(transport, ADD_SYMBOLS, vec![id.clone(), json!(symbol)])?;
        }
        info!("Session {} subscribed to {} symbols", session, symbols.len());
        Ok(())
    }

    fn send_command<T: Transport + ?Sized>(
        transport: &mut T,
        function: &str,
        params: Vec<Value>,
    ) -> Result<()> {
        let frame = protocol::build_frame(function, params)?;
        debug!("Sending command: {}", frame);
        transport.send(&frame)
    }
}
