//! Execution context for pipeline runs.
//!
//! This module provides the `ExecutionContext` which is passed to every step
//! in a pipeline, enabling metrics collection and event tracing.

use std::sync::{Arc, Mutex};

use crate::events::{PipelineEvent, TraceEntry};
use crate::metrics::PipelineMetrics;

/// Context passed to every step in the pipeline.
///
/// This context is cloneable and thread-safe; a `ForEachStep` shares the
/// outer run's context with its sub-pipeline so metrics and traces aggregate
/// across nesting levels. All metric updates are synchronized.
///
/// # Tracing
///
/// The context also maintains a structured trace log of pipeline events,
/// enabling detailed observability without relying on unstructured string logs.
///
/// # Example
///
/// ```rust
/// use stepchain::{ExecutionContext, PipelineEvent};
///
/// let ctx = ExecutionContext::new();
/// ctx.emit(PipelineEvent::StepStart {
///     step_name: "Square".to_string(),
/// });
///
/// // Later, get all trace entries
/// let traces = ctx.trace_snapshot();
/// for entry in traces {
///     println!("{:?}", entry);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Shared metrics accumulator.
    pub metrics: Arc<Mutex<PipelineMetrics>>,
    /// Shared trace log for structured pipeline events.
    pub traces: Arc<Mutex<Vec<TraceEntry>>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Create a new execution context with empty metrics and traces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(PipelineMetrics::default())),
            traces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Increment the steps completed counter.
    pub fn record_step(&self) {
        let mut m = self.metrics.lock().unwrap();
        m.record_step();
    }

    /// Record a short-circuit.
    pub fn record_short_circuit(&self) {
        let mut m = self.metrics.lock().unwrap();
        m.record_short_circuit();
    }

    /// Record one processed collection element.
    pub fn record_element(&self) {
        let mut m = self.metrics.lock().unwrap();
        m.record_element();
    }

    /// Record a failure message.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut m = self.metrics.lock().unwrap();
        m.record_failure(error.into());
    }

    /// Get a snapshot of the current metrics.
    #[must_use]
    pub fn snapshot(&self) -> PipelineMetrics {
        let m = self.metrics.lock().unwrap();
        m.clone()
    }

    /// Emit a structured pipeline event to the trace log.
    ///
    /// Events are timestamped automatically when emitted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stepchain::{ExecutionContext, PipelineEvent};
    ///
    /// let ctx = ExecutionContext::new();
    /// ctx.emit(PipelineEvent::ShortCircuit {
    ///     step_name: "Threshold".to_string(),
    /// });
    /// ```
    pub fn emit(&self, event: PipelineEvent) {
        let entry = TraceEntry::new(event);
        self.traces.lock().unwrap().push(entry);
    }

    /// Get a snapshot of the current trace log.
    ///
    /// Returns all trace entries recorded so far. Useful for debugging
    /// or exporting execution traces.
    #[must_use]
    pub fn trace_snapshot(&self) -> Vec<TraceEntry> {
        self.traces.lock().unwrap().clone()
    }

    /// Clear all trace entries.
    ///
    /// This can be useful when reusing a context across multiple pipeline runs.
    pub fn clear_traces(&self) {
        self.traces.lock().unwrap().clear();
    }
}
