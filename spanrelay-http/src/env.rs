use spanrelay::relay_warn;
use std::env;
use std::time::Duration;

/// Default span collector endpoint
pub(crate) const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9411/api/v2/spans";

/// HTTP endpoint for the span collector.
/// e.g. "http://localhost:9411/api/v2/spans"
pub(crate) const ENV_ENDPOINT: &str = "SPANRELAY_ENDPOINT";

/// Maximum time the sender will wait for one batch POST, milliseconds.
pub(crate) const ENV_TIMEOUT: &str = "SPANRELAY_HTTP_TIMEOUT";

/// Default read timeout for one batch POST
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(60_000);

pub(crate) fn get_timeout() -> Duration {
    match env::var(ENV_TIMEOUT).ok().filter(|var| !var.is_empty()) {
        Some(timeout) => match timeout.parse() {
            Ok(timeout) => Duration::from_millis(timeout),
            Err(error) => {
                relay_warn!(
                    name: "HttpSender.MalformedTimeoutEnvVar",
                    value = timeout.as_str(),
                    reason = format!("{error}")
                );
                DEFAULT_READ_TIMEOUT
            }
        },
        None => DEFAULT_READ_TIMEOUT,
    }
}

pub(crate) fn get_endpoint() -> String {
    match env::var(ENV_ENDPOINT).ok().filter(|var| !var.is_empty()) {
        Some(endpoint) => endpoint,
        None => DEFAULT_ENDPOINT.to_string(),
    }
}
