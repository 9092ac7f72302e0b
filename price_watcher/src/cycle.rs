//! One price check: connect, subscribe, collect, release.
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use price_common::{FeedError, PriceSnapshot, Result};

use crate::collector::QuoteCollector;
use crate::config::FeedConfig;
use crate::connection::{Connection, Transport};
use crate::session::{SessionId, SessionManager};

/// Granularity of the interruptible sleep between cycles.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Open a fresh connection and collect a snapshot for `symbols`.
///
/// The handshake is bounded by the collection timeout. The connection is
/// released before returning, whether collection succeeded or not.
pub fn collect_snapshot(
    feed: &FeedConfig,
    symbols: &[String],
    shutdown: &AtomicBool,
) -> Result<PriceSnapshot> {
    if shutdown.load(Ordering::Relaxed) {
        return Err(FeedError::Interrupted);
    }
    let mut connection = Connection::open(&feed.url, &feed.origin, feed.collect_timeout)?;
    collect_and_release(&mut connection, feed.collect_timeout, symbols, shutdown)
}

/// Run session setup and collection over an already open transport, then close it.
pub fn collect_and_release<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
    symbols: &[String],
    shutdown: &AtomicBool,
) -> Result<PriceSnapshot> {
    let result = collect_over(transport, timeout, symbols, shutdown);
    if let Err(e) = &result {
        debug!("Releasing connection after failed cycle: {}", e);
    }
    transport.close();
    result
}

fn collect_over<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
    symbols: &[String],
    shutdown: &AtomicBool,
) -> Result<PriceSnapshot> {
    let session = SessionId::generate();
    info!("Opening quote session {}", session);
    SessionManager::setup(transport, &session, symbols)?;
    QuoteCollector::new(symbols.iter().cloned()).run(transport, timeout, shutdown)
}

/// Sleep for `interval` unless `shutdown` is raised first.
///
/// Returns `true` if the sleep was cut short by a shutdown request.
pub fn sleep_until_next_cycle(interval: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
