use crate::domain::telemetry_sink::{DependencyRecord, Properties, Severity, TelemetrySink};
use std::fmt;
use std::sync::Arc;

/// Correlation carrier for one emission or one control request.
///
/// Passed explicitly to every publish call; never mutated after creation.
#[derive(Clone)]
pub struct OperationContext {
    operation_id: String,
    telemetry: Arc<dyn TelemetrySink>,
}

impl OperationContext {
    /// Start a new operation with a freshly generated id
    pub fn new(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            operation_id: uuid::Uuid::new_v4().to_string(),
            telemetry,
        }
    }

    pub fn with_operation_id(
        operation_id: impl Into<String>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            telemetry,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn trace(&self, message: &str, severity: Severity) {
        self.telemetry
            .track_trace(&self.operation_id, message, severity, &Properties::new());
    }

    pub fn trace_with(&self, message: &str, severity: Severity, properties: &Properties) {
        self.telemetry
            .track_trace(&self.operation_id, message, severity, properties);
    }

    pub fn exception(
        &self,
        message: &str,
        error: &(dyn std::error::Error + 'static),
        severity: Severity,
    ) {
        self.telemetry.track_exception(
            &self.operation_id,
            message,
            error,
            severity,
            &Properties::new(),
        );
    }

    pub fn dependency(&self, record: &DependencyRecord) {
        self.telemetry.track_dependency(&self.operation_id, record);
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("operation_id", &self.operation_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry_sink::NoopTelemetry;
    use std::collections::HashSet;

    #[test]
    fn test_new_contexts_get_distinct_ids() {
        let telemetry: Arc<dyn TelemetrySink> = Arc::new(NoopTelemetry);
        let ids: HashSet<String> = (0..100)
            .map(|_| OperationContext::new(telemetry.clone()).operation_id().to_string())
            .collect();

        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn test_with_operation_id_keeps_given_id() {
        let ctx = OperationContext::with_operation_id("op-42", Arc::new(NoopTelemetry));
        assert_eq!(ctx.operation_id(), "op-42");
    }
}
