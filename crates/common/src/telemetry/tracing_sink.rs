use crate::domain::{DependencyRecord, Properties, Severity, TelemetrySink};
use tracing::{debug, error, info, warn};

/// TelemetrySink that turns records into structured `tracing` events.
///
/// Exporting to a collector is left to the subscriber configured by
/// [`init_telemetry`](super::init_telemetry); this type only decides level and
/// field layout. Messages are prefixed with the service role so console
/// output reads `Producer::<message>`.
#[derive(Debug, Clone)]
pub struct TracingTelemetry {
    role: String,
}

impl TracingTelemetry {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl TelemetrySink for TracingTelemetry {
    fn track_trace(
        &self,
        operation_id: &str,
        message: &str,
        severity: Severity,
        properties: &Properties,
    ) {
        let role = &self.role;
        match severity {
            Severity::Verbose => {
                debug!(operation_id, ?properties, "{role}::{message}")
            }
            Severity::Information => {
                info!(operation_id, ?properties, "{role}::{message}")
            }
            Severity::Warning => {
                warn!(operation_id, ?properties, "{role}::{message}")
            }
            Severity::Error | Severity::Critical => {
                error!(operation_id, %severity, ?properties, "{role}::{message}")
            }
        }
    }

    fn track_exception(
        &self,
        operation_id: &str,
        message: &str,
        error: &(dyn std::error::Error + 'static),
        severity: Severity,
        properties: &Properties,
    ) {
        let role = &self.role;
        if severity >= Severity::Error {
            error!(
                operation_id,
                %severity,
                error = %error,
                error.source = ?error.source().map(ToString::to_string),
                ?properties,
                "{role}::{message}"
            );
        } else {
            warn!(
                operation_id,
                %severity,
                error = %error,
                ?properties,
                "{role}::{message}"
            );
        }
    }

    fn track_dependency(&self, operation_id: &str, record: &DependencyRecord) {
        let role = &self.role;
        let duration_ms = record.duration_ms();
        if record.success {
            info!(
                operation_id,
                dependency.name = %record.name,
                dependency.kind = %record.dependency_type,
                dependency.target = %record.target,
                success = true,
                started_at = %record.started_at.to_rfc3339(),
                finished_at = %record.finished_at.to_rfc3339(),
                duration_ms,
                properties = ?record.properties,
                "{role}::{}::{}",
                record.dependency_type,
                record.name
            );
        } else {
            warn!(
                operation_id,
                dependency.name = %record.name,
                dependency.kind = %record.dependency_type,
                dependency.target = %record.target,
                success = false,
                started_at = %record.started_at.to_rfc3339(),
                finished_at = %record.finished_at.to_rfc3339(),
                duration_ms,
                properties = ?record.properties,
                "{role}::{}::{}",
                record.dependency_type,
                record.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_records_without_subscriber_do_not_panic() {
        let sink = TracingTelemetry::new("Producer");
        let started_at = Utc::now();

        sink.track_trace("op", "hello", Severity::Information, &Properties::new());
        sink.track_exception(
            "op",
            "failed",
            &std::io::Error::other("boom"),
            Severity::Critical,
            &Properties::new(),
        );
        sink.track_dependency(
            "op",
            &DependencyRecord {
                name: "Publish hub message".to_string(),
                dependency_type: "NATS".to_string(),
                target: "orders".to_string(),
                success: false,
                started_at,
                finished_at: started_at + Duration::milliseconds(12),
                properties: Properties::new(),
            },
        );
    }
}
