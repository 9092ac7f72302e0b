//! Shared endpoint constants and helpers used by the watcher and the simulator.

/// Market-data WebSocket endpoint.
pub const FEED_URL: &str = "wss://data.tradingview.com/socket.io/websocket";
/// `Origin` header the feed expects during the handshake.
pub const FEED_ORIGIN: &str = "https://data.tradingview.com";
/// Messaging API endpoint used for alert delivery.
pub const NOTIFY_URL: &str = "https://api.fonnte.com/send";
/// Exchange prefix applied to watchlist symbols (`IDX:BBCA`).
pub const DEFAULT_EXCHANGE: &str = "IDX";
/// Port the local feed simulator listens on.
pub const SIMULATOR_PORT: u16 = 8765;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Qualify `symbol` with an exchange prefix unless it already carries one.
pub fn qualify_symbol(exchange: &str, symbol: &str) -> String {
    let symbol = symbol.trim();
    if symbol.contains(':') {
        symbol.to_string()
    } else {
        format!("{}:{}", exchange, symbol)
    }
}
