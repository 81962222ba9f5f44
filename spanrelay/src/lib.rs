//! # Spanrelay
//!
//! Collects trace spans one at a time, encodes them into a wire format, and
//! ships them to a collector in size-bounded batches. Spans are buffered in a
//! queue bounded by both span count and encoded bytes; a dedicated background
//! thread drains the queue on a fixed cadence, when the buffered data would
//! fill one message, or on an explicit [`Reporter::flush`].
//!
//! Delivery is fire-and-forget: a span that cannot be buffered or sent is
//! dropped and counted in [`ReporterMetrics`], never surfaced to the caller
//! of [`Reporter::report`]. Transports are pluggable behind the [`Sender`]
//! trait; the `spanrelay-http` crate ships an HTTP implementation.
//!
//! ## Quickstart
//!
//! ```
//! use spanrelay::{JsonV2Encoder, Reporter, SendError, Sender, Span};
//!
//! // Any transport works; `spanrelay-http` ships an HTTP one.
//! #[derive(Debug)]
//! struct StdoutSender;
//!
//! impl Sender for StdoutSender {
//!     fn message_max_bytes(&self) -> usize {
//!         500_000
//!     }
//!
//!     fn send(&self, batch: Vec<u8>) -> Result<(), SendError> {
//!         println!("{}", String::from_utf8_lossy(&batch));
//!         Ok(())
//!     }
//!
//!     fn close(&self) {}
//! }
//!
//! let reporter = Reporter::builder(StdoutSender, JsonV2Encoder).build();
//!
//! reporter.report(Span::builder().id("efdc9cd9a1849df3".to_owned()).build());
//! reporter.flush().unwrap();
//! reporter.close().unwrap();
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(test, deny(warnings))]

mod encode;
mod error;
#[cfg(any(test, feature = "testing"))]
mod in_memory;
mod internal_logging;
mod metrics;
mod queue;
mod reporter;
mod sender;
mod span;

pub use encode::{
    EncodedSpan, Encoding, JsonV1Encoder, JsonV2Encoder, Proto3Encoder, SpanEncoder,
};
pub use error::{ReporterError, SendError};
#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub use in_memory::{InMemorySender, InMemorySenderBuilder};
pub use metrics::ReporterMetrics;
pub use queue::ByteBoundedQueue;
pub use reporter::{Reporter, ReporterBuilder, ReporterConfig, ReporterConfigBuilder};
pub use sender::Sender;
pub use span::{Annotation, Endpoint, Span, SpanKind};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, warn};
}
