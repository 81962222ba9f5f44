use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use typed_builder::TypedBuilder;

/// Network context of a span: the service that recorded it or the remote
/// party it talked to.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) service_name: Option<String>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ipv4: Option<Ipv4Addr>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ipv6: Option<Ipv6Addr>,
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) port: Option<u16>,
}

impl Endpoint {
    /// Endpoint for a named service, taking the address family from the
    /// socket address when one is known.
    pub fn new(service_name: String, socket_addr: Option<SocketAddr>) -> Self {
        match socket_addr {
            Some(SocketAddr::V4(v4)) => Endpoint::builder()
                .service_name(service_name)
                .ipv4(*v4.ip())
                .port(v4.port())
                .build(),
            Some(SocketAddr::V6(v6)) => Endpoint::builder()
                .service_name(service_name)
                .ipv6(*v6.ip())
                .port(v6.port())
                .build(),
            None => Endpoint::builder().service_name(service_name).build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::span::endpoint::Endpoint;
    use std::net::Ipv4Addr;

    #[test]
    fn test_empty() {
        test_json_serialization(Endpoint::builder().build(), "{}");
    }

    #[test]
    fn test_ipv4() {
        test_json_serialization(
            Endpoint::builder()
                .service_name("frontend".to_owned())
                .ipv4(Ipv4Addr::new(127, 0, 0, 1))
                .port(8080)
                .build(),
            "{\"serviceName\":\"frontend\",\"ipv4\":\"127.0.0.1\",\"port\":8080}",
        );
    }

    #[test]
    fn test_from_socket_addr() {
        test_json_serialization(
            Endpoint::new("backend".to_owned(), Some("192.168.0.1:9000".parse().unwrap())),
            "{\"serviceName\":\"backend\",\"ipv4\":\"192.168.0.1\",\"port\":9000}",
        );
    }

    fn test_json_serialization(endpoint: Endpoint, desired: &str) {
        let result = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
