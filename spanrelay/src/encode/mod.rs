//! Wire encodings for spans and batches.
//!
//! A [`SpanEncoder`] turns one span into an [`EncodedSpan`]; the selected
//! [`Encoding`] knows how much overhead wrapping adds and concatenates
//! encoded spans into one wire-ready message. Encoders are pure functions
//! over the span, no I/O.

mod json_v1;
mod proto;

pub use json_v1::JsonV1Encoder;
pub use proto::Proto3Encoder;

use crate::span::Span;
use prost::encoding::{encode_varint, encoded_len_varint};

/// One span serialized by a [`SpanEncoder`], owned by the queue until it is
/// drained into a batch.
#[derive(Clone, Debug)]
pub struct EncodedSpan {
    bytes: Vec<u8>,
}

impl EncodedSpan {
    /// Encoded size in bytes, excluding batch wrapping overhead.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for EncodedSpan {
    fn from(bytes: Vec<u8>) -> Self {
        EncodedSpan { bytes }
    }
}

/// The wire formats a batch message can be encoded in.
///
/// Variants are mutually exclusive and selected once, at reporter
/// construction; the chosen encoding must match what the collector endpoint
/// accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Encoding {
    /// Legacy JSON dialect: tags flattened into `binaryAnnotations`.
    JsonV1,
    /// Current JSON dialect, one object per span.
    #[default]
    JsonV2,
    /// Length-delimited protobuf frames.
    Proto3,
}

impl Encoding {
    /// HTTP content type for a batch in this encoding.
    pub fn media_type(&self) -> &'static str {
        match self {
            Encoding::JsonV1 | Encoding::JsonV2 => "application/json",
            Encoding::Proto3 => "application/x-protobuf",
        }
    }

    /// Message bytes added by appending one more encoded span of
    /// `next_len` bytes to a batch already holding `count_in_batch` spans.
    ///
    /// JSON batches are arrays: the first span pays for both brackets,
    /// later spans pay one comma. Proto3 batches are a sequence of
    /// length-delimited frames: every span pays its field tag and length
    /// varint.
    pub fn cost_of_next(&self, next_len: usize, count_in_batch: usize) -> usize {
        match self {
            Encoding::JsonV1 | Encoding::JsonV2 => {
                if count_in_batch == 0 {
                    next_len + 2
                } else {
                    next_len + 1
                }
            }
            Encoding::Proto3 => 1 + encoded_len_varint(next_len as u64) + next_len,
        }
    }

    /// Size of a message carrying exactly one encoded span of `len` bytes.
    /// Spans for which this exceeds the sender ceiling can never be sent
    /// and are rejected before queuing.
    pub fn single_message_size(&self, len: usize) -> usize {
        self.cost_of_next(len, 0)
    }

    /// Wraps already-encoded spans into one wire-ready message.
    pub fn encode_batch(&self, spans: &[EncodedSpan]) -> Vec<u8> {
        let size: usize = spans
            .iter()
            .enumerate()
            .map(|(i, s)| self.cost_of_next(s.size(), i))
            .sum();
        match self {
            Encoding::JsonV1 | Encoding::JsonV2 => {
                let mut message = Vec::with_capacity(size.max(2));
                message.push(b'[');
                for (i, span) in spans.iter().enumerate() {
                    if i > 0 {
                        message.push(b',');
                    }
                    message.extend_from_slice(span.as_bytes());
                }
                message.push(b']');
                message
            }
            Encoding::Proto3 => {
                let mut message = Vec::with_capacity(size);
                for span in spans {
                    // Field 1 of the list message, wire type 2.
                    message.push(0x0a);
                    encode_varint(span.size() as u64, &mut message);
                    message.extend_from_slice(span.as_bytes());
                }
                message
            }
        }
    }
}

/// Serializes one span into the bytes a batch will carry.
///
/// Implementations must agree with their declared [`Encoding`]: the batch
/// wrapping math assumes every encoded span came from the same dialect.
pub trait SpanEncoder<S>: Send + Sync {
    /// The wire format this encoder produces.
    fn encoding(&self) -> Encoding;

    /// Serialize a single span. Pure, infallible, no I/O.
    fn encode(&self, span: &S) -> EncodedSpan;
}

/// Encodes spans in the current JSON dialect.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonV2Encoder;

impl SpanEncoder<Span> for JsonV2Encoder {
    fn encoding(&self) -> Encoding {
        Encoding::JsonV2
    }

    fn encode(&self, span: &Span) -> EncodedSpan {
        serde_json::to_vec(span).unwrap_or_default().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(bytes: &[u8]) -> EncodedSpan {
        bytes.to_vec().into()
    }

    #[test]
    fn json_batch_wraps_spans_in_an_array() {
        let batch = Encoding::JsonV2.encode_batch(&[encoded(b"{\"id\":\"a\"}"), encoded(b"{}")]);
        assert_eq!(batch, b"[{\"id\":\"a\"},{}]");
    }

    #[test]
    fn json_cost_charges_brackets_then_commas() {
        assert_eq!(Encoding::JsonV2.cost_of_next(10, 0), 12);
        assert_eq!(Encoding::JsonV2.cost_of_next(10, 1), 11);
        assert_eq!(Encoding::JsonV2.cost_of_next(10, 7), 11);
    }

    #[test]
    fn json_cost_matches_encoded_batch_size() {
        let spans = vec![encoded(b"{}"), encoded(b"{\"id\":\"b\"}"), encoded(b"{}")];
        let expected: usize = spans
            .iter()
            .enumerate()
            .map(|(i, s)| Encoding::JsonV2.cost_of_next(s.size(), i))
            .sum();
        assert_eq!(Encoding::JsonV2.encode_batch(&spans).len(), expected);
    }

    #[test]
    fn proto_batch_frames_each_span() {
        let batch = Encoding::Proto3.encode_batch(&[encoded(b"ab"), encoded(b"c")]);
        assert_eq!(batch, &[0x0a, 2, b'a', b'b', 0x0a, 1, b'c']);
    }

    #[test]
    fn proto_cost_includes_tag_and_length_varint() {
        // One tag byte plus a one-byte varint below 128 bytes of payload.
        assert_eq!(Encoding::Proto3.cost_of_next(5, 0), 7);
        assert_eq!(Encoding::Proto3.cost_of_next(5, 3), 7);
        // Two-byte varint from 128 onward.
        assert_eq!(Encoding::Proto3.cost_of_next(200, 0), 203);
    }

    #[test]
    fn media_types() {
        assert_eq!(Encoding::JsonV1.media_type(), "application/json");
        assert_eq!(Encoding::JsonV2.media_type(), "application/json");
        assert_eq!(Encoding::Proto3.media_type(), "application/x-protobuf");
    }

    #[test]
    fn json_v2_encoder_round_trips_through_serde() {
        let span = crate::Span::builder().id("efdc9cd9a1849df3".to_owned()).build();
        let bytes = JsonV2Encoder.encode(&span);
        assert_eq!(
            std::str::from_utf8(bytes.as_bytes()).unwrap(),
            "{\"id\":\"efdc9cd9a1849df3\",\"debug\":false,\"shared\":false}"
        );
    }
}
