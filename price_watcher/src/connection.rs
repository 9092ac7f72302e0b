//! WebSocket connection to the market-data stream.
//!
//! `Transport` is the seam the session and collector talk through: plain text in,
//! plain text out. `Connection` implements it on top of a blocking `tungstenite`
//! socket whose TCP stream carries a short read timeout, so `receive` returns
//! regularly even when the remote is silent. The connection is closed when it
//! is dropped.
use std::io::{self, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};
use price_common::{FeedError, Result};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{HeaderValue, Uri};
use tungstenite::http::header::ORIGIN;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{HandshakeError, Message, WebSocket};

/// How long a single `receive` call may block before returning `None`.
pub const READ_SLICE: Duration = Duration::from_millis(500);

/// Duplex text transport used for one collection cycle.
pub trait Transport {
    /// Send one text message.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Wait up to one read slice for the next text message.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. A closed or broken
    /// connection is an error.
    fn receive(&mut self) -> Result<Option<String>>;

    /// Release the transport. Calling it more than once is harmless.
    fn close(&mut self);
}

/// Live WebSocket connection to the quote stream.
pub struct Connection {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl Connection {
    /// Perform the WebSocket handshake against `url`, sending `origin` as the `Origin` header.
    ///
    /// The TCP connect and the handshake are each bounded by `timeout`; a
    /// remote that accepts but never answers fails with `Handshake`.
    pub fn open(url: &str, origin: &str, timeout: Duration) -> Result<Self> {
        let mut request = url.into_client_request()?;
        let origin = HeaderValue::from_str(origin)
            .map_err(|e| FeedError::Config(format!("invalid Origin header {:?}: {}", origin, e)))?;
        request.headers_mut().insert(ORIGIN, origin);

        info!("Connecting to {}", url);
        let stream = connect_tcp(request.uri(), timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let (socket, response) = tungstenite::client_tls(request, stream).map_err(|e| match e {
            HandshakeError::Interrupted(_) => handshake_timeout(url, timeout),
            HandshakeError::Failure(tungstenite::Error::Io(e)) if is_timeout(&e) => {
                handshake_timeout(url, timeout)
            }
            HandshakeError::Failure(e) => e.into(),
        })?;
        info!("Connected to {} (status {})", url, response.status());

        set_read_timeout(socket.get_ref(), Some(READ_SLICE))?;
        Ok(Connection {
            socket,
            closed: false,
        })
    }
}

fn connect_tcp(uri: &Uri, timeout: Duration) -> Result<TcpStream> {
    let host = uri
        .host()
        .ok_or_else(|| FeedError::Config(format!("no host in {}", uri)))?
        .trim_start_matches('[')
        .trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") => 443,
        _ => 80,
    });

    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error
        .map(FeedError::Io)
        .unwrap_or_else(|| FeedError::Config(format!("{} resolved to no address", host))))
}

fn handshake_timeout(url: &str, timeout: Duration) -> FeedError {
    FeedError::Handshake(format!("no answer from {} within {:?}", url, timeout))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn set_read_timeout(stream: &MaybeTlsStream<TcpStream>, timeout: Option<Duration>) -> Result<()> {
    match stream {
        MaybeTlsStream::Plain(tcp) => tcp.set_read_timeout(timeout)?,
        MaybeTlsStream::NativeTls(tls) => tls.get_ref().set_read_timeout(timeout)?,
        _ => warn!("Unknown stream type; reads will block without a timeout"),
    }
    Ok(())
}

impl Transport for Connection {
    fn send(&mut self, text: &str) -> Result<()> {
        debug!("-> {}", text);
        self.socket.send(Message::text(text))?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<String>> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(text)),
            Ok(Message::Binary(data)) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => Ok(None),
            Ok(Message::Close(frame)) => {
                self.closed = true;
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| String::from("no close frame"));
                Err(FeedError::ConnectionClosed(reason))
            }
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => Ok(None),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                self.closed = true;
                Err(FeedError::ConnectionClosed(String::from("socket closed")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.socket.close(None).and_then(|_| self.socket.flush()) {
            debug!("Close handshake not completed: {}", e);
        }
        debug!("Connection released");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
