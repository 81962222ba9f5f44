//! The span data model shipped with this crate.
//!
//! [`Reporter`] itself is generic over any type a [`SpanEncoder`] can
//! serialize; this module is the concrete model the bundled encoders work
//! on. Spans are immutable once handed to [`Reporter::report`].
//!
//! [`Reporter`]: crate::Reporter
//! [`Reporter::report`]: crate::Reporter::report
//! [`SpanEncoder`]: crate::SpanEncoder

mod annotation;
mod endpoint;

pub use annotation::Annotation;
pub use endpoint::Endpoint;

use serde::Serialize;
use std::collections::HashMap;
use typed_builder::TypedBuilder;

/// The role a span played in an interaction between services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    /// Initiator of an outgoing request.
    Client,
    /// Handler of an incoming request.
    Server,
    /// Origin of a message sent to a broker.
    Producer,
    /// Consumer of a message received from a broker.
    Consumer,
}

/// One unit of trace telemetry data.
///
/// Identifiers are lowercase hex strings: 16 or 32 characters for
/// `trace_id`, 16 for `id` and `parent_id`. Timestamps and durations are
/// epoch microseconds.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) trace_id: Option<String>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) parent_id: Option<String>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) kind: Option<SpanKind>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timestamp: Option<u64>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) duration: Option<u64>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) local_endpoint: Option<Endpoint>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) remote_endpoint: Option<Endpoint>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) annotations: Option<Vec<Annotation>>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tags: Option<HashMap<String, String>>,
    #[builder(default = false)]
    pub(crate) debug: bool,
    #[builder(default = false)]
    pub(crate) shared: bool,
}

#[cfg(test)]
mod tests {
    use crate::span::{Annotation, Endpoint, Span, SpanKind};
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    #[test]
    fn test_empty() {
        test_json_serialization(
            Span::builder().build(),
            "{\"debug\":false,\"shared\":false}",
        );
    }

    #[test]
    fn test_full_span() {
        let mut tags = HashMap::new();
        tags.insert("a".to_owned(), "b".to_owned());
        test_json_serialization(
            Span::builder()
                .trace_id("4e441824ec2b6a44ffdc9bb9a6453df3".to_owned())
                .parent_id("ffdc9bb9a6453df3".to_owned())
                .id("efdc9cd9a1849df3".to_owned())
                .kind(Some(SpanKind::Server))
                .name("main".to_owned())
                .timestamp(1_502_787_600_000_000)
                .duration(150_000)
                .local_endpoint(
                    Endpoint::builder()
                        .service_name("frontend".to_owned())
                        .ipv4(Ipv4Addr::new(192, 168, 0, 1))
                        .port(8080)
                        .build(),
                )
                .remote_endpoint(
                    Endpoint::builder()
                        .service_name("backend".to_owned())
                        .ipv4(Ipv4Addr::new(127, 0, 0, 1))
                        .port(8080)
                        .build(),
                )
                .annotations(vec![Annotation::builder()
                    .timestamp(1_502_780_000_000_000)
                    .value("interesting event".to_string())
                    .build()])
                .tags(tags)
                .build(),
            "{\"traceId\":\"4e441824ec2b6a44ffdc9bb9a6453df3\",\"parentId\":\"ffdc9bb9a6453df3\",\"id\":\"efdc9cd9a1849df3\",\"kind\":\"SERVER\",\"name\":\"main\",\"timestamp\":1502787600000000,\"duration\":150000,\"localEndpoint\":{\"serviceName\":\"frontend\",\"ipv4\":\"192.168.0.1\",\"port\":8080},\"remoteEndpoint\":{\"serviceName\":\"backend\",\"ipv4\":\"127.0.0.1\",\"port\":8080},\"annotations\":[{\"timestamp\":1502780000000000,\"value\":\"interesting event\"}],\"tags\":{\"a\":\"b\"},\"debug\":false,\"shared\":false}",
        );
    }

    fn test_json_serialization(span: Span, desired: &str) {
        let result = serde_json::to_string(&span).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
