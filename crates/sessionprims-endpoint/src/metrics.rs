use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use sessionprims_codec::Ticks;

/// Point-in-time copy of an endpoint's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Wire messages written, chunk control messages included.
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Keepalive frames or pings received.
    pub pings_received: u64,
    /// Messages dropped as recoverable dispatch failures.
    pub dispatch_failures: u64,
    pub chunked_sent: u64,
    pub chunked_received: u64,
    /// Partial chunked messages dropped for inactivity.
    pub reassembly_evictions: u64,
    pub last_sent: Option<Ticks>,
    pub last_received: Option<Ticks>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    pings_received: AtomicU64,
    dispatch_failures: AtomicU64,
    chunked_sent: AtomicU64,
    chunked_received: AtomicU64,
    reassembly_evictions: AtomicU64,
    last_sent: AtomicI64,
    last_received: AtomicI64,
}

impl Counters {
    pub(crate) fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_sent.store(Ticks::now().0, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_received.store(Ticks::now().0, Ordering::Relaxed);
    }

    pub(crate) fn record_ping(&self) {
        self.pings_received.fetch_add(1, Ordering::Relaxed);
        self.last_received.store(Ticks::now().0, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_chunked_sent(&self) {
        self.chunked_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_chunked_received(&self) {
        self.chunked_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.reassembly_evictions
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EndpointStats {
        let ticks = |cell: &AtomicI64| match cell.load(Ordering::Relaxed) {
            0 => None,
            raw => Some(Ticks(raw)),
        };
        EndpointStats {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            pings_received: self.pings_received.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            chunked_sent: self.chunked_sent.load(Ordering::Relaxed),
            chunked_received: self.chunked_received.load(Ordering::Relaxed),
            reassembly_evictions: self.reassembly_evictions.load(Ordering::Relaxed),
            last_sent: ticks(&self.last_sent),
            last_received: ticks(&self.last_received),
        }
    }
}
