//! Statistics and metrics for the chat hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live hub counters, shared by every session task
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    requests: AtomicU64,
    unrecognized_requests: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    routing_misses: AtomicU64,
}

impl HubStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            unrecognized_requests: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            routing_misses: AtomicU64::new(0),
        }
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrecognized_request(&self) {
        self.unrecognized_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn routing_miss(&self) {
        self.routing_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one fan-out
    pub fn fanout(&self, delivered: usize, failed: usize) {
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> ServerStats {
        let opened = self.sessions_opened.load(Ordering::Relaxed);
        let closed = self.sessions_closed.load(Ordering::Relaxed);

        ServerStats {
            total_sessions: opened,
            active_sessions: opened.saturating_sub(closed),
            requests: self.requests.load(Ordering::Relaxed),
            unrecognized_requests: self.unrecognized_requests.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            routing_misses: self.routing_misses.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total sessions ever admitted
    pub total_sessions: u64,
    /// Sessions currently connected
    pub active_sessions: u64,
    /// Requests processed
    pub requests: u64,
    /// Requests with an unknown variant
    pub unrecognized_requests: u64,
    /// Responses handed to sinks successfully
    pub deliveries: u64,
    /// Responses that failed to reach a sink
    pub delivery_failures: u64,
    /// Direct messages to a name nobody claimed
    pub routing_misses: u64,
    /// Uptime
    pub uptime: Duration,
}
