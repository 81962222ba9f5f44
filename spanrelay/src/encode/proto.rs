//! The binary dialect: length-delimited protobuf frames.
//!
//! Message shapes mirror the collector's list schema: a batch is a
//! `ListOfSpans` whose `spans` field repeats, so the wire form is one
//! field-1 length-delimited frame per span and batch wrapping needs no
//! outer message. Hex ids from the model decode to raw bytes here; an id
//! that is not valid hex encodes as absent.

use super::{EncodedSpan, Encoding, SpanEncoder};
use crate::span;
use prost::Message;
use std::collections::HashMap;

/// Encodes spans as length-delimited protobuf frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct Proto3Encoder;

impl SpanEncoder<span::Span> for Proto3Encoder {
    fn encoding(&self) -> Encoding {
        Encoding::Proto3
    }

    fn encode(&self, span: &span::Span) -> EncodedSpan {
        Span::from(span).encode_to_vec().into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub(crate) enum Kind {
    SpanKindUnspecified = 0,
    Client = 1,
    Server = 2,
    Producer = 3,
    Consumer = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Span {
    #[prost(bytes = "vec", tag = "1")]
    pub(crate) trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) parent_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) id: Vec<u8>,
    #[prost(enumeration = "Kind", tag = "4")]
    pub(crate) kind: i32,
    #[prost(string, tag = "5")]
    pub(crate) name: String,
    #[prost(fixed64, tag = "6")]
    pub(crate) timestamp: u64,
    #[prost(uint64, tag = "7")]
    pub(crate) duration: u64,
    #[prost(message, optional, tag = "8")]
    pub(crate) local_endpoint: Option<Endpoint>,
    #[prost(message, optional, tag = "9")]
    pub(crate) remote_endpoint: Option<Endpoint>,
    #[prost(message, repeated, tag = "10")]
    pub(crate) annotations: Vec<Annotation>,
    #[prost(map = "string, string", tag = "11")]
    pub(crate) tags: HashMap<String, String>,
    #[prost(bool, tag = "12")]
    pub(crate) debug: bool,
    #[prost(bool, tag = "13")]
    pub(crate) shared: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Endpoint {
    #[prost(string, tag = "1")]
    pub(crate) service_name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) ipv4: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) ipv6: Vec<u8>,
    #[prost(int32, tag = "4")]
    pub(crate) port: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Annotation {
    #[prost(fixed64, tag = "1")]
    pub(crate) timestamp: u64,
    #[prost(string, tag = "2")]
    pub(crate) value: String,
}

fn id_bytes(id: Option<&str>) -> Vec<u8> {
    id.and_then(|hex| const_hex::decode(hex).ok()).unwrap_or_default()
}

impl From<&span::Span> for Span {
    fn from(span: &span::Span) -> Self {
        Span {
            trace_id: id_bytes(span.trace_id.as_deref()),
            parent_id: id_bytes(span.parent_id.as_deref()),
            id: id_bytes(span.id.as_deref()),
            kind: span
                .kind
                .map(|kind| match kind {
                    span::SpanKind::Client => Kind::Client,
                    span::SpanKind::Server => Kind::Server,
                    span::SpanKind::Producer => Kind::Producer,
                    span::SpanKind::Consumer => Kind::Consumer,
                })
                .unwrap_or(Kind::SpanKindUnspecified) as i32,
            name: span.name.clone().unwrap_or_default(),
            timestamp: span.timestamp.unwrap_or_default(),
            duration: span.duration.unwrap_or_default(),
            local_endpoint: span.local_endpoint.as_ref().map(Endpoint::from),
            remote_endpoint: span.remote_endpoint.as_ref().map(Endpoint::from),
            annotations: span
                .annotations
                .iter()
                .flatten()
                .map(|annotation| Annotation {
                    timestamp: annotation.timestamp.unwrap_or_default(),
                    value: annotation.value.clone().unwrap_or_default(),
                })
                .collect(),
            tags: span.tags.clone().unwrap_or_default(),
            debug: span.debug,
            shared: span.shared,
        }
    }
}

impl From<&span::Endpoint> for Endpoint {
    fn from(endpoint: &span::Endpoint) -> Self {
        Endpoint {
            service_name: endpoint.service_name.clone().unwrap_or_default(),
            ipv4: endpoint.ipv4.map(|ip| ip.octets().to_vec()).unwrap_or_default(),
            ipv6: endpoint.ipv6.map(|ip| ip.octets().to_vec()).unwrap_or_default(),
            port: endpoint.port.map(i32::from).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span;
    use prost::Message;
    use std::net::Ipv4Addr;

    #[test]
    fn encodes_ids_as_bytes() {
        let model = span::Span::builder()
            .trace_id("4e441824ec2b6a44ffdc9bb9a6453df3".to_owned())
            .id("efdc9cd9a1849df3".to_owned())
            .build();
        let decoded = Span::decode(Proto3Encoder.encode(&model).as_bytes()).unwrap();
        assert_eq!(
            decoded.trace_id,
            const_hex::decode("4e441824ec2b6a44ffdc9bb9a6453df3").unwrap()
        );
        assert_eq!(decoded.id, const_hex::decode("efdc9cd9a1849df3").unwrap());
        assert!(decoded.parent_id.is_empty());
    }

    #[test]
    fn invalid_hex_id_encodes_as_absent() {
        let model = span::Span::builder().id("not-hex".to_owned()).build();
        let decoded = Span::decode(Proto3Encoder.encode(&model).as_bytes()).unwrap();
        assert!(decoded.id.is_empty());
    }

    #[test]
    fn carries_endpoints_and_kind() {
        let model = span::Span::builder()
            .id("efdc9cd9a1849df3".to_owned())
            .kind(Some(span::SpanKind::Server))
            .name("main".to_owned())
            .timestamp(1_502_787_600_000_000)
            .duration(150_000)
            .local_endpoint(
                span::Endpoint::builder()
                    .service_name("frontend".to_owned())
                    .ipv4(Ipv4Addr::new(192, 168, 0, 1))
                    .port(8080)
                    .build(),
            )
            .build();
        let decoded = Span::decode(Proto3Encoder.encode(&model).as_bytes()).unwrap();
        assert_eq!(decoded.kind(), Kind::Server);
        assert_eq!(decoded.name, "main");
        assert_eq!(decoded.timestamp, 1_502_787_600_000_000);
        assert_eq!(decoded.duration, 150_000);
        let endpoint = decoded.local_endpoint.unwrap();
        assert_eq!(endpoint.service_name, "frontend");
        assert_eq!(endpoint.ipv4, vec![192, 168, 0, 1]);
        assert_eq!(endpoint.port, 8080);
    }

    #[test]
    fn batch_frames_decode_as_a_list() {
        #[derive(Clone, PartialEq, ::prost::Message)]
        struct ListOfSpans {
            #[prost(message, repeated, tag = "1")]
            spans: Vec<Span>,
        }

        let first = Proto3Encoder.encode(&span::Span::builder().name("a".to_owned()).build());
        let second = Proto3Encoder.encode(&span::Span::builder().name("b".to_owned()).build());
        let batch = Encoding::Proto3.encode_batch(&[first, second]);
        let list = ListOfSpans::decode(batch.as_slice()).unwrap();
        assert_eq!(list.spans.len(), 2);
        assert_eq!(list.spans[0].name, "a");
        assert_eq!(list.spans[1].name, "b");
    }
}
