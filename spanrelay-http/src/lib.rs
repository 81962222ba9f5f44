//! # Spanrelay HTTP Sender
//!
//! Delivers encoded span batches to a collector endpoint over HTTP POST,
//! using a blocking [`reqwest`] client. The body is gzip-compressed by
//! default and the `Content-Type` header follows the configured
//! [`Encoding`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use spanrelay::{JsonV2Encoder, Reporter, Span};
//! use spanrelay_http::HttpSender;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sender = HttpSender::builder()
//!         .with_endpoint("http://localhost:9411/api/v2/spans")
//!         .build()?;
//!     let reporter = Reporter::builder(sender, JsonV2Encoder).build();
//!
//!     reporter.report(Span::builder().name("checkout".to_owned()).build());
//!     reporter.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Unset builder options fall back to the `SPANRELAY_ENDPOINT` and
//! `SPANRELAY_HTTP_TIMEOUT` environment variables, then to
//! `http://127.0.0.1:9411/api/v2/spans` and 60 seconds. A zero duration
//! disables the corresponding timeout.
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(test, deny(warnings))]

mod env;

use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::Uri;
use spanrelay::{relay_debug, Encoding, SendError, Sender};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Errors building an [`HttpSender`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The endpoint is not a valid URI.
    #[error("invalid endpoint uri")]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A [`Sender`] that POSTs one encoded batch per request.
#[derive(Debug)]
pub struct HttpSender {
    endpoint: Uri,
    client: reqwest::blocking::Client,
    encoding: Encoding,
    compression_enabled: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
    message_max_bytes: usize,
    closed: AtomicBool,
}

impl HttpSender {
    /// Returns a builder with the default configuration.
    pub fn builder() -> HttpSenderBuilder {
        HttpSenderBuilder::default()
    }

    /// The collector endpoint batches are posted to.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// The wire format this sender declares in `Content-Type`.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether batch bodies are gzip-compressed.
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    /// The configured connect timeout; zero means none.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// The configured read timeout; zero means none.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

impl Sender for HttpSender {
    fn message_max_bytes(&self) -> usize {
        self.message_max_bytes
    }

    fn send(&self, batch: Vec<u8>) -> Result<(), SendError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SendError::Closed);
        }

        let mut request = self
            .client
            .post(self.endpoint.to_string())
            .header(CONTENT_TYPE, self.encoding.media_type());
        let body = if self.compression_enabled {
            request = request.header(CONTENT_ENCODING, "gzip");
            gzip(&batch).map_err(|error| SendError::Transport(Box::new(error)))?
        } else {
            batch
        };

        let response = request
            .body(body)
            .send()
            .map_err(|error| SendError::Transport(Box::new(error)))?;
        response
            .error_for_status()
            .map_err(|error| SendError::Transport(Box::new(error)))?;
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            relay_debug!(name: "HttpSender.Closed");
        }
    }
}

/// Builder for [`HttpSender`].
#[derive(Clone, Debug)]
pub struct HttpSenderBuilder {
    endpoint: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    compression_enabled: bool,
    message_max_bytes: usize,
    encoding: Encoding,
}

impl Default for HttpSenderBuilder {
    fn default() -> Self {
        HttpSenderBuilder {
            endpoint: env::get_endpoint(),
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: env::get_timeout(),
            compression_enabled: true,
            message_max_bytes: 500_000,
            encoding: Encoding::default(),
        }
    }
}

impl HttpSenderBuilder {
    /// Assign the collector endpoint.
    pub fn with_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Assign the connect timeout. Zero disables it.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Assign the read timeout covering one batch POST. Zero disables it.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Enable or disable gzip compression of batch bodies.
    pub fn with_compression_enabled(mut self, compression_enabled: bool) -> Self {
        self.compression_enabled = compression_enabled;
        self
    }

    /// Assign the hard ceiling on one batch message's size.
    pub fn with_message_max_bytes(mut self, message_max_bytes: usize) -> Self {
        self.message_max_bytes = message_max_bytes;
        self
    }

    /// Assign the wire format the reporter will hand this sender.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Validates the endpoint and constructs the HTTP client.
    pub fn build(self) -> Result<HttpSender, Error> {
        let endpoint: Uri = self.endpoint.parse()?;

        let read_timeout = if self.read_timeout.is_zero() {
            None
        } else {
            Some(self.read_timeout)
        };
        let mut client = reqwest::blocking::Client::builder().timeout(read_timeout);
        if !self.connect_timeout.is_zero() {
            client = client.connect_timeout(self.connect_timeout);
        }

        Ok(HttpSender {
            endpoint,
            client: client.build()?,
            encoding: self.encoding,
            compression_enabled: self.compression_enabled,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            message_max_bytes: self.message_max_bytes,
            closed: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn endpoint() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .build()
            .unwrap();
        assert_eq!(
            sender.endpoint(),
            &"http://localhost:9411/api/v2/spans".parse::<Uri>().unwrap()
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected_at_build_time() {
        let result = HttpSender::builder().with_endpoint("not a uri").build();
        assert!(matches!(result, Err(Error::InvalidUri(_))));
    }

    #[test]
    fn connect_timeout() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .with_connect_timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(sender.connect_timeout(), Duration::ZERO);
    }

    #[test]
    fn read_timeout() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .with_read_timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(sender.read_timeout(), Duration::ZERO);
    }

    #[test]
    fn compression_enabled() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .with_compression_enabled(false)
            .build()
            .unwrap();
        assert!(!sender.compression_enabled());
    }

    #[test]
    fn message_max_bytes() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .with_message_max_bytes(1024)
            .build()
            .unwrap();
        assert_eq!(sender.message_max_bytes(), 1024);
    }

    #[test]
    fn encoding() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .with_encoding(Encoding::Proto3)
            .build()
            .unwrap();
        assert_eq!(sender.encoding(), Encoding::Proto3);
        assert_eq!(sender.encoding().media_type(), "application/x-protobuf");
    }

    #[test]
    fn defaults() {
        temp_env::with_vars_unset(vec!["SPANRELAY_ENDPOINT", "SPANRELAY_HTTP_TIMEOUT"], || {
            let sender = HttpSender::builder().build().unwrap();
            assert_eq!(
                sender.endpoint(),
                &"http://127.0.0.1:9411/api/v2/spans".parse::<Uri>().unwrap()
            );
            assert!(sender.compression_enabled());
            assert_eq!(sender.message_max_bytes(), 500_000);
            assert_eq!(sender.encoding(), Encoding::JsonV2);
            assert_eq!(sender.connect_timeout(), Duration::from_millis(10_000));
            assert_eq!(sender.read_timeout(), Duration::from_millis(60_000));
        });
    }

    #[test]
    fn endpoint_env_var_is_the_fallback() {
        temp_env::with_var(
            "SPANRELAY_ENDPOINT",
            Some("http://collector:9411/api/v2/spans"),
            || {
                let sender = HttpSender::builder().build().unwrap();
                assert_eq!(
                    sender.endpoint(),
                    &"http://collector:9411/api/v2/spans".parse::<Uri>().unwrap()
                );
            },
        );
    }

    #[test]
    fn close_closes_sender() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .build()
            .unwrap();
        sender.close();
        // Fails fast without any I/O.
        assert!(matches!(sender.send(b"[{}]".to_vec()), Err(SendError::Closed)));
    }

    #[test]
    fn close_is_idempotent() {
        let sender = HttpSender::builder()
            .with_endpoint("http://localhost:9411/api/v2/spans")
            .build()
            .unwrap();
        sender.close();
        sender.close();
        assert!(matches!(sender.send(b"[]".to_vec()), Err(SendError::Closed)));
    }

    #[test]
    fn gzip_round_trips() {
        let compressed = gzip(b"a batch of spans").unwrap();
        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, b"a batch of spans");
    }
}
