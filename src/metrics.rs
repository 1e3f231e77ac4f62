//! Metrics collection for pipeline execution.
//!
//! This module provides `PipelineMetrics` for tracking step execution,
//! short-circuits, per-element iteration, and failures.

use serde::{Deserialize, Serialize};

/// Aggregated metrics for a pipeline run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Number of steps completed successfully.
    pub steps_completed: usize,
    /// Number of times a step halted its pipeline with the stop sentinel.
    pub short_circuits: usize,
    /// Number of collection elements processed by iteration steps.
    pub elements_processed: usize,
    /// Collected failure messages from the run.
    pub failures: Vec<String>,
}

impl PipelineMetrics {
    /// Increment the steps completed counter.
    pub fn record_step(&mut self) {
        self.steps_completed += 1;
    }

    /// Record a short-circuit.
    pub fn record_short_circuit(&mut self) {
        self.short_circuits += 1;
    }

    /// Record one processed collection element.
    pub fn record_element(&mut self) {
        self.elements_processed += 1;
    }

    /// Record a failure message.
    pub fn record_failure(&mut self, error: String) {
        self.failures.push(error);
    }

    /// Check if there were any failures.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
