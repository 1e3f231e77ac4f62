//! Structured pipeline execution events for tracing and observability.
//!
//! This module defines the event types that can be emitted during a pipeline
//! run, enabling detailed tracking of step execution, short-circuits, and
//! errors.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Events that can be emitted during pipeline execution.
///
/// These events provide structured observability into pipeline behavior,
/// replacing unstructured string logs with typed, serializable data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PipelineEvent {
    /// A step has started execution.
    StepStart {
        /// Name of the step being executed.
        step_name: String,
    },
    /// A step has finished successfully.
    StepEnd {
        /// Name of the step that completed.
        step_name: String,
        /// Duration of execution in milliseconds.
        duration_ms: u128,
    },
    /// A step halted its pipeline with the stop sentinel.
    ShortCircuit {
        /// Name of the step that stopped the chain.
        step_name: String,
    },
    /// An error occurred during step execution.
    Error {
        /// Name of the step where the error occurred.
        step_name: String,
        /// Error message describing what went wrong.
        message: String,
    },
}

/// A timestamped trace entry containing a pipeline event.
///
/// Each trace entry records when the event occurred (as Unix epoch
/// milliseconds) along with the event itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: u128,
    /// The pipeline event that was recorded.
    #[serde(flatten)]
    pub event: PipelineEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: PipelineEvent) -> Self {
        let start = SystemTime::now();
        let timestamp = start
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis();
        Self { timestamp, event }
    }
}
