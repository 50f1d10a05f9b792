//! W3C trace-context propagation from message headers.

use std::collections::HashMap;

use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header carrying `version-traceid-parentid-flags`.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header carrying vendor-specific trace state.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Delivery headers as a propagation carrier. Names match
/// case-insensitively, since publishers disagree on casing.
pub struct HeaderExtractor<'a>(pub &'a HashMap<String, String>);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Extracts the publisher's span context from message headers.
///
/// A missing or malformed `traceparent` yields a context with no span, so
/// whatever is parented on it starts a new trace.
pub fn extract_context(headers: &HashMap<String, String>) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Creates the consumer span the handler runs in, parented on the trace
/// carried by `headers`.
pub fn consumer_span(destination: &str, headers: &HashMap<String, String>) -> tracing::Span {
    let span = tracing::info_span!(
        "message_receive",
        otel.name = %format!("{destination} receive"),
        otel.kind = "consumer",
        messaging.system = "rabbitmq",
        messaging.destination.name = %destination,
    );
    // Without an OpenTelemetry layer installed there is nothing to parent.
    let _ = span.set_parent(extract_context(headers));
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};

    const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn continues_incoming_trace() {
        let cx = extract_context(&headers(&[(TRACEPARENT_HEADER, PARENT)]));
        let span = cx.span();
        let parent = span.span_context();

        assert!(parent.is_valid());
        assert!(parent.is_remote());
        assert!(parent.is_sampled());
        assert_eq!(
            parent.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let cx = extract_context(&headers(&[("TraceParent", PARENT)]));
        assert!(cx.span().span_context().is_valid());
    }

    #[test]
    fn carries_trace_state() {
        let cx = extract_context(&headers(&[
            (TRACEPARENT_HEADER, PARENT),
            (TRACESTATE_HEADER, "vendor=abc"),
        ]));
        assert_eq!(cx.span().span_context().trace_state().header(), "vendor=abc");
    }

    #[test]
    fn unsampled_flag_respected() {
        let cx = extract_context(&headers(&[(
            TRACEPARENT_HEADER,
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00",
        )]));
        assert!(cx.span().span_context().is_valid());
        assert!(!cx.span().span_context().is_sampled());
    }

    #[test]
    fn missing_header_has_no_parent() {
        let cx = extract_context(&HashMap::new());
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn malformed_headers_have_no_parent() {
        for bad in [
            "garbage",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ] {
            let cx = extract_context(&headers(&[(TRACEPARENT_HEADER, bad)]));
            assert!(!cx.span().span_context().is_valid(), "expected no parent for {bad}");
        }
    }
}
