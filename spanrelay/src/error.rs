//! Error types shared by the reporter and sender implementations.

use std::time::Duration;

/// Failure delivering one encoded batch through a [`Sender`].
///
/// A send failure is scoped to the batch that triggered it: the reporter
/// logs and counts it, discards the batch, and keeps draining. It never
/// poisons the reporter or subsequent batches.
///
/// [`Sender`]: crate::Sender
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SendError {
    /// The sender was closed before this send was attempted. Senders fail
    /// fast with this variant without performing any I/O.
    #[error("sender is closed")]
    Closed,

    /// The underlying transport failed.
    #[error("transport failed: {0}")]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Other types of failures not covered by the variants above.
    #[error("{0}")]
    Other(String),
}

/// Failure of an explicit [`Reporter::flush`] or [`Reporter::close`] call.
///
/// [`Reporter::flush`]: crate::Reporter::flush
/// [`Reporter::close`]: crate::Reporter::close
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ReporterError {
    /// The reporter was already closed.
    #[error("reporter is closed")]
    Closed,

    /// The flush thread did not respond within the configured wait.
    #[error("flush timed out after {0:?}")]
    FlushTimedOut(Duration),

    /// Other types of failures not covered by the variants above.
    #[error("{0}")]
    Other(String),
}
