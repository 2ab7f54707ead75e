//! Progress event emission toward the collaborator-owned event sink
//!
//! The core hands structured events to an append interface and never
//! blocks on subscriber presence; delivery, retry, and fan-out belong to
//! the collaborator.

use crate::error::TalonError;
use crate::transform::{ScanContext, TransformOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Discrete progress markers for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// New entities were produced for the investigation graph
    GraphAppend,
}

/// Severity attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Error,
}

/// One structured `(level, message, optional payload)` tuple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub sketch_id: String,
    pub scan_id: String,
    pub status: ScanStatus,
    pub level: EventLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn status(ctx: &ScanContext, status: ScanStatus, transform: &str) -> Self {
        Self {
            sketch_id: ctx.sketch_id.clone(),
            scan_id: ctx.scan_id.clone(),
            status,
            level: EventLevel::Info,
            message: format!("transform {transform}: {status:?}"),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn graph_append(ctx: &ScanContext, transform: &str, outcome: &TransformOutcome) -> Self {
        Self {
            sketch_id: ctx.sketch_id.clone(),
            scan_id: ctx.scan_id.clone(),
            status: ScanStatus::GraphAppend,
            level: EventLevel::Info,
            message: format!(
                "transform {transform} produced {} entities",
                outcome.entities.len()
            ),
            payload: Some(json!({
                "entities": outcome.entities.len(),
                "filtered": outcome.filtered,
            })),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(ctx: &ScanContext, transform: &str, error: &TalonError) -> Self {
        Self {
            sketch_id: ctx.sketch_id.clone(),
            scan_id: ctx.scan_id.clone(),
            status: ScanStatus::Failed,
            level: EventLevel::Error,
            message: format!("transform {transform} failed: {error}"),
            payload: None,
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget append interface owned by the collaborator
pub trait EventSink: Send + Sync {
    fn append(&self, event: ScanEvent);
}

/// Sink routing events into the tracing subscriber
#[derive(Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn append(&self, event: ScanEvent) {
        match event.level {
            EventLevel::Info => tracing::info!(
                sketch_id = %event.sketch_id,
                scan_id = %event.scan_id,
                status = ?event.status,
                "{}",
                event.message
            ),
            EventLevel::Error => tracing::error!(
                sketch_id = %event.sketch_id,
                scan_id = %event.scan_id,
                status = ?event.status,
                "{}",
                event.message
            ),
        }
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ScanEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for MemorySink {
    fn append(&self, event: ScanEvent) {
        self.events.lock().unwrap().push(event);
    }
}
