//! Per-client WebSocket stream.
//!
//! A client connects, receives a greeting frame, then drives its quote session
//! with `quote_create_session`, `quote_set_fields` and `quote_add_symbols`.
//! Every added symbol is subscribed with the generator; its quotes are pushed
//! back as `qsd` frames. Heartbeats go out on a fixed interval and a client that
//! stops echoing them is dropped.
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{Sender, unbounded};
use log::{debug, info, warn};
use price_common::protocol::{self, ADD_SYMBOLS, CREATE_SESSION, ProtocolMessage, SET_FIELDS};
use price_common::{FeedError, QuoteUpdate, Result, frame};
use serde_json::json;
use tungstenite::{Message, WebSocket};

use crate::model::heartbeat_monitor::HeartbeatMonitor;
use crate::model::quote_generator::Subscription;

/// How long a single socket read may block.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Keep-alive settings shared by all client streams.
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Time between heartbeats.
    pub heartbeat_interval: Duration,
    /// How long an unanswered heartbeat is tolerated.
    pub heartbeat_timeout: Duration,
}

/// Quote session state of one client.
struct ClientSession {
    session: Option<String>,
    symbols: Vec<String>,
    data_tx: Sender<QuoteUpdate>,
    subscribe_tx: Sender<Subscription>,
}

impl ClientSession {
    /// Apply every framed payload in `raw`.
    fn handle_text(&mut self, raw: &str, monitor: &mut HeartbeatMonitor) -> Result<()> {
        for payload in frame::decode_stream(raw) {
            if frame::is_heartbeat(payload) {
                if !monitor.acknowledge(payload) {
                    debug!("Unexpected heartbeat echo {}", payload);
                }
                continue;
            }
            match protocol::parse(payload) {
                Ok(message) => self.handle_message(&message)?,
                Err(e) => warn!("Skipping payload {:?}: {}", payload, e),
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, message: &ProtocolMessage) -> Result<()> {
        match message.function.as_str() {
            CREATE_SESSION => {
                let session = message
                    .str_param(0)
                    .ok_or_else(|| FeedError::Format(String::from("session id missing")))?;
                info!("Session {} created", session);
                self.session = Some(String::from(session));
            }
            SET_FIELDS => debug!("Fields requested: {:?}", message.params.get(1..)),
            ADD_SYMBOLS => {
                if message.str_param(0) != self.session.as_deref() {
                    warn!("Symbols added to unknown session {:?}", message.str_param(0));
                    return Ok(());
                }
                let Some(symbol) = message.str_param(1) else {
                    warn!("Symbol missing in {:?}", message);
                    return Ok(());
                };
                if self.symbols.iter().any(|s| s == symbol) {
                    return Ok(());
                }
                self.subscribe_tx
                    .send(Subscription {
                        symbol: String::from(symbol),
                        tx: self.data_tx.clone(),
                    })
                    .map_err(|e| FeedError::ChannelSend(e.to_string()))?;
                self.symbols.push(String::from(symbol));
                debug!("Subscribed {}", symbol);
            }
            other => debug!("Ignoring {}", other),
        }
        Ok(())
    }
}

/// Serve one client until it disconnects or stops answering heartbeats.
///
/// Errors are returned so the caller can log them; other clients are unaffected.
pub fn handle_client(
    stream: TcpStream,
    subscribe_tx: Sender<Subscription>,
    settings: ClientSettings,
) -> Result<()> {
    let peer = stream.peer_addr()?;
    let mut socket = tungstenite::accept(stream)
        .map_err(|e| FeedError::Format(format!("handshake with {} failed: {}", peer, e)))?;
    socket.get_ref().set_read_timeout(Some(POLL_INTERVAL))?;
    info!("Client {} connected", peer);

    let greeting = json!({
        "session_id": format!("sim_{}", Utc::now().timestamp_millis()),
        "timestamp": Utc::now().timestamp(),
    });
    send_text(&mut socket, frame::encode(&greeting.to_string()))?;

    let (data_tx, data_rx) = unbounded::<QuoteUpdate>();
    let mut client = ClientSession {
        session: None,
        symbols: Vec::new(),
        data_tx,
        subscribe_tx,
    };
    let mut monitor = HeartbeatMonitor::new(
        settings.heartbeat_interval,
        settings.heartbeat_timeout,
        Instant::now(),
    );

    loop {
        match socket.read() {
            Ok(Message::Text(text)) => client.handle_text(&text, &mut monitor)?,
            Ok(Message::Close(_)) => {
                info!("Client {} closed the stream", peer);
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                info!("Client {} disconnected", peer);
                break;
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(session) = client.session.as_deref() {
            for quote in data_rx.try_iter() {
                let delta = ProtocolMessage::quote_delta(session, &quote);
                send_text(&mut socket, delta.to_frame()?)?;
            }
        }

        let now = Instant::now();
        if monitor.is_timed_out(now) {
            warn!("Client {} missed its heartbeat, dropping", peer);
            let _ = socket.close(None);
            let _ = socket.flush();
            break;
        }
        if monitor.is_due(now) {
            let payload = monitor.next(now);
            send_text(&mut socket, frame::encode(&payload))?;
        }
    }
    Ok(())
}

fn send_text(socket: &mut WebSocket<TcpStream>, text: String) -> Result<()> {
    socket.send(Message::text(text))?;
    Ok(())
}
