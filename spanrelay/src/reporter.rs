//! The public-facing accumulator: encodes spans, buffers them, and drains
//! them to a [`Sender`] in size-bounded batches from a dedicated flush
//! thread.

use crate::encode::{Encoding, SpanEncoder};
use crate::error::ReporterError;
use crate::metrics::ReporterMetrics;
use crate::queue::ByteBoundedQueue;
use crate::sender::Sender;
use crate::{relay_debug, relay_warn};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Maximum number of spans held in the queue.
pub(crate) const SPANRELAY_QUEUE_MAX_SPANS: &str = "SPANRELAY_QUEUE_MAX_SPANS";
/// Default maximum number of queued spans.
pub(crate) const SPANRELAY_QUEUE_MAX_SPANS_DEFAULT: usize = 2_048;
/// Maximum summed encoded bytes held in the queue.
pub(crate) const SPANRELAY_QUEUE_MAX_BYTES: &str = "SPANRELAY_QUEUE_MAX_BYTES";
/// Default maximum queued bytes.
pub(crate) const SPANRELAY_QUEUE_MAX_BYTES_DEFAULT: usize = 1024 * 1024;
/// Delay interval between two consecutive background flushes, milliseconds.
pub(crate) const SPANRELAY_FLUSH_INTERVAL: &str = "SPANRELAY_FLUSH_INTERVAL";
/// Default delay interval between two consecutive background flushes.
pub(crate) const SPANRELAY_FLUSH_INTERVAL_DEFAULT: u64 = 1_000;

const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Reporter configuration.
/// Use [`ReporterConfigBuilder`] to configure your own instance.
#[derive(Clone, Debug)]
pub struct ReporterConfig {
    pub(crate) queue_max_spans: usize,
    pub(crate) queue_max_bytes: usize,
    pub(crate) flush_interval: Duration,
    pub(crate) flush_timeout: Duration,
    pub(crate) close_timeout: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfigBuilder::default().build()
    }
}

impl ReporterConfig {
    /// Returns a builder initialized with the defaults.
    pub fn builder() -> ReporterConfigBuilder {
        ReporterConfigBuilder::default()
    }
}

/// A builder for creating [`ReporterConfig`] instances.
#[derive(Clone, Debug)]
pub struct ReporterConfigBuilder {
    queue_max_spans: usize,
    queue_max_bytes: usize,
    flush_interval: Duration,
    flush_timeout: Duration,
    close_timeout: Duration,
}

impl Default for ReporterConfigBuilder {
    /// Create a new [`ReporterConfigBuilder`] initialized with the default
    /// values, overridden by environment variables if set. The supported
    /// environment variables are:
    /// * `SPANRELAY_QUEUE_MAX_SPANS`
    /// * `SPANRELAY_QUEUE_MAX_BYTES`
    /// * `SPANRELAY_FLUSH_INTERVAL` (milliseconds)
    fn default() -> Self {
        ReporterConfigBuilder {
            queue_max_spans: SPANRELAY_QUEUE_MAX_SPANS_DEFAULT,
            queue_max_bytes: SPANRELAY_QUEUE_MAX_BYTES_DEFAULT,
            flush_interval: Duration::from_millis(SPANRELAY_FLUSH_INTERVAL_DEFAULT),
            flush_timeout: DEFAULT_WAIT_TIMEOUT,
            close_timeout: DEFAULT_WAIT_TIMEOUT,
        }
        .init_from_env_vars()
    }
}

impl ReporterConfigBuilder {
    /// Set the maximum number of spans buffered for delayed processing.
    /// When the queue is full further spans are dropped and counted.
    /// The default value is 2048.
    pub fn with_queue_max_spans(mut self, queue_max_spans: usize) -> Self {
        self.queue_max_spans = queue_max_spans;
        self
    }

    /// Set the maximum summed encoded bytes buffered for delayed
    /// processing. The default value is 1 MiB.
    pub fn with_queue_max_bytes(mut self, queue_max_bytes: usize) -> Self {
        self.queue_max_bytes = queue_max_bytes;
        self
    }

    /// Set the delay interval between two consecutive background flushes.
    /// The default value is 1 second.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Set how long an explicit [`Reporter::flush`] waits for the flush
    /// thread. The default value is 5 seconds.
    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = flush_timeout;
        self
    }

    /// Set how long [`Reporter::close`] waits for the final drain.
    /// The default value is 5 seconds.
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Builds a [`ReporterConfig`].
    pub fn build(self) -> ReporterConfig {
        ReporterConfig {
            queue_max_spans: self.queue_max_spans,
            queue_max_bytes: self.queue_max_bytes,
            flush_interval: self.flush_interval,
            flush_timeout: self.flush_timeout,
            close_timeout: self.close_timeout,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(queue_max_spans) = env::var(SPANRELAY_QUEUE_MAX_SPANS)
            .ok()
            .and_then(|queue_size| usize::from_str(&queue_size).ok())
        {
            self.queue_max_spans = queue_max_spans;
        }

        if let Some(queue_max_bytes) = env::var(SPANRELAY_QUEUE_MAX_BYTES)
            .ok()
            .and_then(|queue_bytes| usize::from_str(&queue_bytes).ok())
        {
            self.queue_max_bytes = queue_max_bytes;
        }

        if let Some(flush_interval) = env::var(SPANRELAY_FLUSH_INTERVAL)
            .ok()
            .and_then(|interval| u64::from_str(&interval).ok())
        {
            self.flush_interval = Duration::from_millis(flush_interval);
        }

        self
    }
}

/// Messages exchanged between callers and the flush thread.
enum ControlMessage {
    Wake,
    Flush(SyncSender<Result<(), ReporterError>>),
    Shutdown(SyncSender<Result<(), ReporterError>>),
}

const CONTROL_CHANNEL_BOUND: usize = 4;

struct Shared {
    queue: ByteBoundedQueue,
    sender: Box<dyn Sender>,
    metrics: ReporterMetrics,
    state: AtomicU8,
    encoding: Encoding,
    message_max_bytes: usize,
    queue_max_spans: usize,
}

impl Shared {
    /// Drains the queue into successive batches no larger than the
    /// sender's ceiling and sends each one. A failed batch is discarded
    /// and draining continues.
    fn drain_and_send(&self) {
        loop {
            let batch = self.queue.drain_to(self.message_max_bytes);
            if batch.is_empty() {
                break;
            }
            let message = self.encoding.encode_batch(&batch);
            let message_bytes = message.len() as u64;
            match self.sender.send(message) {
                Ok(()) => {
                    self.metrics.record_message_sent(message_bytes);
                    relay_debug!(
                        name: "Reporter.MessageSent",
                        spans = batch.len(),
                        bytes = message_bytes
                    );
                }
                Err(error) => {
                    self.metrics.record_send_failure();
                    self.metrics.record_dropped(batch.len() as u64);
                    relay_warn!(
                        name: "Reporter.SendFailed",
                        spans = batch.len(),
                        reason = format!("{error:?}")
                    );
                }
            }
        }
    }
}

/// A batching span reporter with a dedicated flush thread.
///
/// Spans handed to [`report`](Reporter::report) are encoded immediately
/// and buffered in a queue bounded by span count and bytes. The flush
/// thread drains the queue on the configured interval, when buffered data
/// would fill one message, and on explicit [`flush`](Reporter::flush) or
/// [`close`](Reporter::close) calls.
pub struct Reporter<S: 'static> {
    encoder: Box<dyn SpanEncoder<S>>,
    shared: Arc<Shared>,
    control: SyncSender<ControlMessage>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    flush_timeout: Duration,
    close_timeout: Duration,
}

impl<S: 'static> fmt::Debug for Reporter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("encoding", &self.shared.encoding)
            .field("message_max_bytes", &self.shared.message_max_bytes)
            .field("queued_spans", &self.shared.queue.len())
            .finish_non_exhaustive()
    }
}

impl<S: 'static> Reporter<S> {
    /// Returns a builder for a reporter shipping to `sender` in the wire
    /// format of `encoder`.
    pub fn builder<T, E>(sender: T, encoder: E) -> ReporterBuilder<S>
    where
        T: Sender + 'static,
        E: SpanEncoder<S> + 'static,
    {
        ReporterBuilder {
            sender: Box::new(sender),
            encoder: Box::new(encoder),
            config: ReporterConfig::default(),
        }
    }

    /// Encodes and enqueues one span.
    ///
    /// Fire-and-forget: a span that cannot be accepted (the reporter is
    /// closed, the span alone exceeds the sender's message ceiling, or the
    /// queue is at capacity) is dropped and counted in
    /// [`metrics`](Reporter::metrics), never surfaced as an error.
    pub fn report(&self, span: S) {
        if self.shared.state.load(Ordering::Acquire) != STATE_OPEN {
            if self.shared.metrics.record_dropped(1) == 0 {
                relay_warn!(
                    name: "Reporter.ReportAfterClose",
                    message = "span reported after close was dropped. No further log will be emitted for subsequent drops."
                );
            }
            return;
        }

        let encoded = self.encoder.encode(&span);
        if self.shared.encoding.single_message_size(encoded.size()) > self.shared.message_max_bytes
        {
            self.shared.metrics.record_dropped_oversized();
            relay_warn!(
                name: "Reporter.SpanTooLarge",
                encoded_bytes = encoded.size(),
                message_max_bytes = self.shared.message_max_bytes
            );
            return;
        }

        if !self.shared.queue.offer(encoded) {
            if self.shared.metrics.record_dropped(1) == 0 {
                relay_warn!(
                    name: "Reporter.SpanDroppingStarted",
                    message = "span dropped due to a full queue. No further log will be emitted for subsequent drops; the total is available in the reporter metrics."
                );
            }
            return;
        }
        self.shared.metrics.record_reported();

        if self.shared.queue.bytes() >= self.shared.message_max_bytes
            || self.shared.queue.len() >= self.shared.queue_max_spans
        {
            // A full control channel means a wake is already pending, so
            // the flush trigger is not lost.
            let _ = self.control.try_send(ControlMessage::Wake);
        }
    }

    /// Drains everything currently queued, emitting as many batch messages
    /// as it takes, and waits for the drain to finish.
    pub fn flush(&self) -> Result<(), ReporterError> {
        if self.shared.state.load(Ordering::Acquire) != STATE_OPEN {
            return Err(ReporterError::Closed);
        }
        let (reply, receiver) = sync_channel(1);
        self.control
            .send(ControlMessage::Flush(reply))
            .map_err(|_| ReporterError::Other("flush thread terminated".to_owned()))?;
        receiver
            .recv_timeout(self.flush_timeout)
            .map_err(|_| ReporterError::FlushTimedOut(self.flush_timeout))?
    }

    /// Performs a final drain of the queue, stops the flush thread, and
    /// closes the sender.
    ///
    /// Idempotent: the first caller performs the shutdown and later calls
    /// are no-ops. The sender is closed exactly once, after the final
    /// drain, regardless of how many flushes raced beforehand.
    pub fn close(&self) -> Result<(), ReporterError> {
        if self
            .shared
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let (reply, receiver) = sync_channel(1);
        let drained = match self.control.send(ControlMessage::Shutdown(reply)) {
            Ok(()) => match receiver.recv_timeout(self.close_timeout) {
                Ok(result) => {
                    if let Ok(mut worker) = self.worker.lock() {
                        if let Some(handle) = worker.take() {
                            let _ = handle.join();
                        }
                    }
                    result
                }
                // The flush thread is wedged, likely in a slow send; the
                // sender is still closed below so no further I/O starts.
                Err(_) => Err(ReporterError::FlushTimedOut(self.close_timeout)),
            },
            Err(_) => Err(ReporterError::Other(
                "flush thread terminated before close".to_owned(),
            )),
        };

        self.shared.state.store(STATE_CLOSED, Ordering::Release);
        self.shared.sender.close();
        relay_debug!(name: "Reporter.Closed");
        drained
    }

    /// Lifetime counters for this reporter.
    pub fn metrics(&self) -> &ReporterMetrics {
        &self.shared.metrics
    }
}

impl<S: 'static> Drop for Reporter<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Builder for [`Reporter`].
pub struct ReporterBuilder<S: 'static> {
    sender: Box<dyn Sender>,
    encoder: Box<dyn SpanEncoder<S>>,
    config: ReporterConfig,
}

impl<S: 'static> fmt::Debug for ReporterBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterBuilder")
            .field("sender", &self.sender)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> ReporterBuilder<S> {
    /// Set the [`ReporterConfig`] for the reporter.
    pub fn with_config(mut self, config: ReporterConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the reporter and starts its flush thread.
    pub fn build(self) -> Reporter<S> {
        let encoding = self.encoder.encoding();
        let message_max_bytes = self.sender.message_max_bytes();
        let shared = Arc::new(Shared {
            queue: ByteBoundedQueue::new(
                self.config.queue_max_spans,
                self.config.queue_max_bytes,
                encoding,
            ),
            sender: self.sender,
            metrics: ReporterMetrics::default(),
            state: AtomicU8::new(STATE_OPEN),
            encoding,
            message_max_bytes,
            queue_max_spans: self.config.queue_max_spans,
        });

        let (control, receiver) = sync_channel(CONTROL_CHANNEL_BOUND);
        let worker_shared = Arc::clone(&shared);
        let flush_interval = self.config.flush_interval;
        let handle = thread::Builder::new()
            .name("spanrelay-flush".to_string())
            .spawn(move || worker_loop(worker_shared, receiver, flush_interval))
            .expect("failed to spawn flush thread");

        Reporter {
            encoder: self.encoder,
            shared,
            control,
            worker: Mutex::new(Some(handle)),
            flush_timeout: self.config.flush_timeout,
            close_timeout: self.config.close_timeout,
        }
    }
}

fn worker_loop(
    shared: Arc<Shared>,
    receiver: Receiver<ControlMessage>,
    flush_interval: Duration,
) {
    let mut last_flush = Instant::now();
    loop {
        let timeout = flush_interval.saturating_sub(last_flush.elapsed());
        match receiver.recv_timeout(timeout) {
            Ok(ControlMessage::Wake) => {
                shared.drain_and_send();
                last_flush = Instant::now();
            }
            Ok(ControlMessage::Flush(reply)) => {
                shared.drain_and_send();
                last_flush = Instant::now();
                let _ = reply.send(Ok(()));
            }
            Ok(ControlMessage::Shutdown(reply)) => {
                shared.drain_and_send();
                let _ = reply.send(Ok(()));
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !shared.queue.is_empty() {
                    shared.drain_and_send();
                }
                last_flush = Instant::now();
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
