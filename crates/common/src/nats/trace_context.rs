use async_nats::HeaderMap;
use opentelemetry::{global, propagation::Injector};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header carrying the operation id of the emission that produced a message
pub const OPERATION_ID_HEADER: &str = "Operation-Id";

/// Injector implementation for NATS HeaderMap
struct NatsHeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for NatsHeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key, value.as_str());
    }
}

/// Inject the current span's W3C trace context (`traceparent`, `tracestate`)
/// into outgoing hub headers.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    global::get_text_map_propagator(|propagator| {
        let ctx = tracing::Span::current().context();
        propagator.inject_context(&ctx, &mut NatsHeaderInjector(headers));
    });
}

/// Read the operation id stamped on a hub message, if any
pub fn operation_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(OPERATION_ID_HEADER)
        .map(|value| value.as_str())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_without_propagator_does_not_panic() {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);
    }

    #[test]
    fn test_operation_id_round_trips_through_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(OPERATION_ID_HEADER, "b6d3c1f0-op");

        assert_eq!(operation_id_from_headers(&headers), Some("b6d3c1f0-op"));
    }

    #[test]
    fn test_missing_operation_id_header() {
        let headers = HeaderMap::new();
        assert_eq!(operation_id_from_headers(&headers), None);
    }
}
