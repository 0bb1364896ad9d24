use crate::domain::{DependencyRecord, Properties, Severity, TelemetrySink};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrace {
    pub operation_id: String,
    pub message: String,
    pub severity: Severity,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedException {
    pub operation_id: String,
    pub message: String,
    pub error: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDependency {
    pub operation_id: String,
    pub record: DependencyRecord,
}

/// In-memory sink for asserting on emitted telemetry in tests
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    traces: Mutex<Vec<RecordedTrace>>,
    exceptions: Mutex<Vec<RecordedException>>,
    dependencies: Mutex<Vec<RecordedDependency>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<RecordedTrace> {
        self.traces.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn exceptions(&self) -> Vec<RecordedException> {
        self.exceptions.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn dependencies(&self) -> Vec<RecordedDependency> {
        self.dependencies
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Messages of all traces recorded under the given operation id
    pub fn trace_messages_for(&self, operation_id: &str) -> Vec<String> {
        self.traces()
            .into_iter()
            .filter(|t| t.operation_id == operation_id)
            .map(|t| t.message)
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn track_trace(
        &self,
        operation_id: &str,
        message: &str,
        severity: Severity,
        properties: &Properties,
    ) {
        if let Ok(mut traces) = self.traces.lock() {
            traces.push(RecordedTrace {
                operation_id: operation_id.to_string(),
                message: message.to_string(),
                severity,
                properties: properties.clone(),
            });
        }
    }

    fn track_exception(
        &self,
        operation_id: &str,
        message: &str,
        error: &(dyn std::error::Error + 'static),
        severity: Severity,
        _properties: &Properties,
    ) {
        if let Ok(mut exceptions) = self.exceptions.lock() {
            exceptions.push(RecordedException {
                operation_id: operation_id.to_string(),
                message: message.to_string(),
                error: error.to_string(),
                severity,
            });
        }
    }

    fn track_dependency(&self, operation_id: &str, record: &DependencyRecord) {
        if let Ok(mut dependencies) = self.dependencies.lock() {
            dependencies.push(RecordedDependency {
                operation_id: operation_id.to_string(),
                record: record.clone(),
            });
        }
    }
}
