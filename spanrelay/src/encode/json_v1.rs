//! The legacy JSON dialect.
//!
//! V1 has no `kind`, `localEndpoint` or `tags` fields: the span's kind
//! becomes begin/end core annotations ("cs"/"cr" for clients, "sr"/"ss"
//! for servers, "ms"/"ws" and "wr"/"mr" for messaging), tags flatten into
//! `binaryAnnotations`, and the local endpoint rides along on each
//! annotation. A span that would otherwise carry no endpoint gets the
//! "lc" (local component) binary annotation.

use super::{EncodedSpan, Encoding, SpanEncoder};
use crate::span::{Endpoint, Span, SpanKind};
use serde::Serialize;

/// Encodes spans in the legacy JSON dialect.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonV1Encoder;

impl SpanEncoder<Span> for JsonV1Encoder {
    fn encoding(&self) -> Encoding {
        Encoding::JsonV1
    }

    fn encode(&self, span: &Span) -> EncodedSpan {
        serde_json::to_vec(&V1Span::from(span)).unwrap_or_default().into()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct V1Span<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<V1Annotation<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    binary_annotations: Vec<V1BinaryAnnotation<'a>>,
    #[serde(skip_serializing_if = "is_false")]
    debug: bool,
}

#[derive(Serialize)]
struct V1Annotation<'a> {
    timestamp: u64,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<&'a Endpoint>,
}

#[derive(Serialize)]
struct V1BinaryAnnotation<'a> {
    key: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<&'a Endpoint>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<'a> From<&'a Span> for V1Span<'a> {
    fn from(span: &'a Span) -> Self {
        let endpoint = span.local_endpoint.as_ref();
        let mut annotations = Vec::new();

        if let (Some(kind), Some(timestamp)) = (span.kind, span.timestamp) {
            let (begin, end) = match kind {
                SpanKind::Client => ("cs", "cr"),
                SpanKind::Server => ("sr", "ss"),
                SpanKind::Producer => ("ms", "ws"),
                SpanKind::Consumer => ("wr", "mr"),
            };
            annotations.push(V1Annotation { timestamp, value: begin, endpoint });
            if let Some(duration) = span.duration {
                annotations.push(V1Annotation {
                    timestamp: timestamp + duration,
                    value: end,
                    endpoint,
                });
            }
        }

        for annotation in span.annotations.iter().flatten() {
            annotations.push(V1Annotation {
                timestamp: annotation.timestamp.unwrap_or_default(),
                value: annotation.value.as_deref().unwrap_or_default(),
                endpoint,
            });
        }

        let mut binary_annotations: Vec<V1BinaryAnnotation<'a>> = span
            .tags
            .iter()
            .flatten()
            .map(|(key, value)| V1BinaryAnnotation { key, value, endpoint })
            .collect();
        // HashMap iteration order is arbitrary; emit tags sorted by key.
        binary_annotations.sort_by_key(|b| b.key);

        if annotations.is_empty() && binary_annotations.is_empty() {
            if let Some(endpoint) = endpoint {
                binary_annotations.push(V1BinaryAnnotation {
                    key: "lc",
                    value: "",
                    endpoint: Some(endpoint),
                });
            }
        }

        V1Span {
            trace_id: span.trace_id.as_deref(),
            parent_id: span.parent_id.as_deref(),
            id: span.id.as_deref(),
            name: span.name.as_deref(),
            timestamp: span.timestamp,
            duration: span.duration,
            annotations,
            binary_annotations,
            debug: span.debug,
        }
    }
}
