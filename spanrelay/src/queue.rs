//! In-memory holding area for encoded spans awaiting a flush.

use crate::encode::{EncodedSpan, Encoding};
use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO queue of encoded spans, bounded by span count and by summed
/// encoded bytes.
///
/// On overflow the incoming span is the one rejected; spans already
/// accepted keep their order and their place. `offer` never blocks and
/// never panics the caller.
#[derive(Debug)]
pub struct ByteBoundedQueue {
    inner: Mutex<Inner>,
    max_spans: usize,
    max_bytes: usize,
    encoding: Encoding,
}

#[derive(Debug)]
struct Inner {
    items: VecDeque<EncodedSpan>,
    bytes: usize,
}

impl ByteBoundedQueue {
    /// A queue holding at most `max_spans` spans and `max_bytes` summed
    /// encoded bytes, draining batches wrapped in `encoding`.
    pub fn new(max_spans: usize, max_bytes: usize, encoding: Encoding) -> Self {
        ByteBoundedQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                bytes: 0,
            }),
            max_spans,
            max_bytes,
            encoding,
        }
    }

    /// Accepts the span unless either capacity bound would be exceeded.
    /// Returns false when the span was rejected; the caller owns the drop
    /// accounting.
    pub fn offer(&self, span: EncodedSpan) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if inner.items.len() >= self.max_spans || inner.bytes + span.size() > self.max_bytes {
            return false;
        }
        inner.bytes += span.size();
        inner.items.push_back(span);
        true
    }

    /// Removes and returns the longest FIFO prefix whose wrapped batch
    /// size stays within `max_bytes`. Empty when the queue is empty or the
    /// first span alone does not fit.
    pub fn drain_to(&self, max_bytes: usize) -> Vec<EncodedSpan> {
        let Ok(mut inner) = self.inner.lock() else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        let mut batch_size = 0;
        loop {
            let cost = match inner.items.front() {
                Some(front) => self.encoding.cost_of_next(front.size(), batch.len()),
                None => break,
            };
            if batch_size + cost > max_bytes {
                break;
            }
            if let Some(span) = inner.items.pop_front() {
                batch_size += cost;
                inner.bytes -= span.size();
                batch.push(span);
            }
        }
        batch
    }

    /// Number of queued spans.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.items.len()).unwrap_or(0)
    }

    /// Summed encoded bytes of queued spans, excluding batch wrapping.
    pub fn bytes(&self) -> usize {
        self.inner.lock().map(|inner| inner.bytes).unwrap_or(0)
    }

    /// True when no spans are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
