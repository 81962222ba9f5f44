//! The transport seam between the reporter and the wire.

use crate::error::SendError;

/// Capability that delivers one encoded batch to a collector over some
/// transport.
///
/// A sender owns its configured endpoint and is exclusively owned by the
/// reporter, which closes it exactly once at [`Reporter::close`] time.
/// `send` may block on I/O; it is only ever invoked from the flush path,
/// never from [`Reporter::report`].
///
/// [`Reporter::close`]: crate::Reporter::close
/// [`Reporter::report`]: crate::Reporter::report
pub trait Sender: Send + Sync + std::fmt::Debug {
    /// Hard ceiling on the size of one batch message this sender accepts,
    /// fixed at construction.
    fn message_max_bytes(&self) -> usize;

    /// Durably attempt delivery of one encoded batch.
    fn send(&self, batch: Vec<u8>) -> Result<(), SendError>;

    /// Release the underlying transport resources. Idempotent; after the
    /// first call every `send` fails fast with [`SendError::Closed`]
    /// without attempting I/O.
    fn close(&self);
}
