use serde::Serialize;
use typed_builder::TypedBuilder;

/// A timestamped event that happened during a span.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Epoch microseconds at which the event occurred.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timestamp: Option<u64>,
    /// Short description of the event.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) value: Option<String>,
}

#[cfg(test)]
mod tests {
    use crate::span::annotation::Annotation;

    #[test]
    fn test_empty() {
        test_json_serialization(Annotation::builder().build(), "{}");
    }

    #[test]
    fn test_full_annotation() {
        test_json_serialization(
            Annotation::builder()
                .timestamp(1_502_787_600_000_000)
                .value("cache miss".to_owned())
                .build(),
            "{\"timestamp\":1502787600000000,\"value\":\"cache miss\"}",
        );
    }

    fn test_json_serialization(annotation: Annotation, desired: &str) {
        let result = serde_json::to_string(&annotation).unwrap();
        assert_eq!(result, desired.to_owned());
    }
}
