use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form key/value pairs attached to a telemetry record
pub type Properties = BTreeMap<String, String>;

/// Severity of a trace or exception record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Verbose => "verbose",
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// One outbound call to an external system (the message hub)
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRecord {
    pub name: String,
    pub dependency_type: String,
    pub target: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub properties: Properties,
}

impl DependencyRecord {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Destination for trace, exception and dependency records.
///
/// Every record is keyed by the operation id of the emission or request that
/// produced it. Implementations must be cheap to call from hot paths; none of
/// the methods are allowed to fail.
pub trait TelemetrySink: Send + Sync {
    fn track_trace(
        &self,
        operation_id: &str,
        message: &str,
        severity: Severity,
        properties: &Properties,
    );

    fn track_exception(
        &self,
        operation_id: &str,
        message: &str,
        error: &(dyn std::error::Error + 'static),
        severity: Severity,
        properties: &Properties,
    );

    fn track_dependency(&self, operation_id: &str, record: &DependencyRecord);
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn track_trace(&self, _: &str, _: &str, _: Severity, _: &Properties) {}

    fn track_exception(
        &self,
        _: &str,
        _: &str,
        _: &(dyn std::error::Error + 'static),
        _: Severity,
        _: &Properties,
    ) {
    }

    fn track_dependency(&self, _: &str, _: &DependencyRecord) {}
}
