//! Per-request execution events.
//!
//! # Responsibilities
//! - Describe one dispatched request: who, what, how long, how it ended
//! - Hand the event to a pluggable publisher
//!
//! # Design Decisions
//! - Events are plain serializable values; publishers decide the sink
//! - Publishing never fails the request

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use uuid::Uuid;

use crate::observability::metrics;

/// Telemetry describing one pass through the dispatch pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    pub path: String,
    pub method: String,
    pub remote_addr: Option<String>,
    pub handler: String,
    pub session_id: Option<String>,
    pub user: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub started_at: u64,
    pub duration_ms: u64,
    pub outcome: &'static str,
    pub status: u16,
    pub failure: Option<FailureSummary>,
}

/// The failure part of an event, when the request took the error path.
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub kind: String,
    pub message: String,
    pub correlation_id: Uuid,
    pub recovered: bool,
}

impl ExecutionEvent {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Milliseconds since the Unix epoch for `time`.
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Sink for execution events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &ExecutionEvent);
}

/// Publishes events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: &ExecutionEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match &event.failure {
            Some(failure) => {
                metrics::record_failure(&failure.kind, failure.recovered);
                tracing::warn!(
                    path = %event.path,
                    handler = %event.handler,
                    status = event.status,
                    duration_ms = event.duration_ms,
                    correlation_id = %failure.correlation_id,
                    event = %payload,
                    "Request execution failed"
                );
            }
            None => {
                tracing::info!(
                    path = %event.path,
                    handler = %event.handler,
                    status = event.status,
                    duration_ms = event.duration_ms,
                    event = %payload,
                    "Request executed"
                );
            }
        }
    }
}
