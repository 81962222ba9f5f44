//! Counters tracking what the reporter accepted, sent and dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters a [`Reporter`] keeps over its lifetime.
///
/// `report` is fire-and-forget: capacity and size problems never reach the
/// caller, so these counters are the observable record of every dropped
/// span. All counters are monotonic and safe to read from any thread.
///
/// [`Reporter`]: crate::Reporter
#[derive(Debug, Default)]
pub struct ReporterMetrics {
    spans_reported: AtomicU64,
    spans_dropped: AtomicU64,
    spans_dropped_oversized: AtomicU64,
    messages_sent: AtomicU64,
    message_bytes_sent: AtomicU64,
    send_failures: AtomicU64,
}

impl ReporterMetrics {
    /// Spans accepted into the queue.
    pub fn spans_reported(&self) -> u64 {
        self.spans_reported.load(Ordering::Relaxed)
    }

    /// Spans dropped for any reason: queue at capacity, reporter closed,
    /// or their batch failed to send.
    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }

    /// Spans whose single-span message alone would exceed the sender's
    /// size ceiling. Also included in [`spans_dropped`](Self::spans_dropped).
    pub fn spans_dropped_oversized(&self) -> u64 {
        self.spans_dropped_oversized.load(Ordering::Relaxed)
    }

    /// Batch messages delivered by the sender.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Total wire bytes of delivered messages.
    pub fn message_bytes_sent(&self) -> u64 {
        self.message_bytes_sent.load(Ordering::Relaxed)
    }

    /// Batch messages the sender failed to deliver.
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn record_reported(&self) {
        self.spans_reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the previous total so callers can warn on the first drop
    /// only.
    pub(crate) fn record_dropped(&self, count: u64) -> u64 {
        self.spans_dropped.fetch_add(count, Ordering::Relaxed)
    }

    pub(crate) fn record_dropped_oversized(&self) {
        self.spans_dropped_oversized.fetch_add(1, Ordering::Relaxed);
        self.spans_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_sent(&self, bytes: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.message_bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }
}
