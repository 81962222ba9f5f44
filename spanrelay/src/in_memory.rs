//! A sender that stores batch messages in memory.
//!
//! Useful for testing and debugging. Clones share storage, so a test can
//! keep one handle and give another to the reporter, then inspect what was
//! sent with [`InMemorySender::get_messages`].

use crate::error::SendError;
use crate::sender::Sender;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An in-memory [`Sender`] that records every delivered batch.
#[derive(Clone, Debug)]
pub struct InMemorySender {
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
    message_max_bytes: usize,
    closed: Arc<AtomicBool>,
    close_calls: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
}

impl Default for InMemorySender {
    fn default() -> Self {
        InMemorySenderBuilder::new().build()
    }
}

/// Builder for [`InMemorySender`].
#[derive(Clone, Debug)]
pub struct InMemorySenderBuilder {
    message_max_bytes: usize,
}

impl Default for InMemorySenderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySenderBuilder {
    /// Creates a new builder with a 500 000-byte message ceiling.
    pub fn new() -> Self {
        InMemorySenderBuilder {
            message_max_bytes: 500_000,
        }
    }

    /// Overrides the ceiling reported by
    /// [`Sender::message_max_bytes`].
    pub fn with_message_max_bytes(mut self, message_max_bytes: usize) -> Self {
        self.message_max_bytes = message_max_bytes;
        self
    }

    /// Creates the sender.
    pub fn build(&self) -> InMemorySender {
        InMemorySender {
            messages: Arc::new(Mutex::new(Vec::new())),
            message_max_bytes: self.message_max_bytes,
            closed: Arc::new(AtomicBool::new(false)),
            close_calls: Arc::new(AtomicUsize::new(0)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl InMemorySender {
    /// Returns a builder.
    pub fn builder() -> InMemorySenderBuilder {
        InMemorySenderBuilder::new()
    }

    /// Every batch message delivered so far, in send order.
    pub fn get_messages(&self) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Clears the recorded messages.
    pub fn reset(&self) {
        let _ = self.messages.lock().map(|mut messages| messages.clear());
    }

    /// Number of times [`Sender::close`] was invoked.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Relaxed)
    }

    /// True once [`Sender::close`] ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// When set, every `send` fails without recording the batch.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }
}

impl Sender for InMemorySender {
    fn message_max_bytes(&self) -> usize {
        self.message_max_bytes
    }

    fn send(&self, batch: Vec<u8>) -> Result<(), SendError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SendError::Closed);
        }
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(SendError::Other("induced send failure".to_owned()));
        }
        self.messages
            .lock()
            .map(|mut messages| messages.push(batch))
            .map_err(|_| SendError::Other("message store lock poisoned".to_owned()))
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::Relaxed);
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::InMemorySender;
    use crate::error::SendError;
    use crate::sender::Sender;

    #[test]
    fn records_batches_in_order() {
        let sender = InMemorySender::builder().build();
        sender.send(b"first".to_vec()).unwrap();
        sender.send(b"second".to_vec()).unwrap();
        assert_eq!(sender.get_messages(), vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn clones_share_storage() {
        let sender = InMemorySender::builder().build();
        let clone = sender.clone();
        sender.send(b"batch".to_vec()).unwrap();
        assert_eq!(clone.get_messages().len(), 1);
        clone.close();
        assert!(sender.is_closed());
    }

    #[test]
    fn send_after_close_fails_fast() {
        let sender = InMemorySender::builder().build();
        sender.close();
        assert!(matches!(sender.send(b"{}".to_vec()), Err(SendError::Closed)));
        assert!(sender.get_messages().is_empty());
    }
}
