//! Instrumented step wrapper for automatic tracing and metrics.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;

use crate::step::Step;
use crate::{ExecutionContext, PipelineEvent, Result, StepOutcome};

/// Wraps any step with automatic event emission and metric recording.
///
/// For each execution, `InstrumentedStep` emits:
/// - A [`PipelineEvent::StepStart`] before the inner step runs
/// - A [`PipelineEvent::StepEnd`] with elapsed milliseconds on success
/// - A [`PipelineEvent::ShortCircuit`] when the inner step stops the chain
/// - A [`PipelineEvent::Error`] and failure metric on error
///
/// # Example
///
/// ```rust
/// use stepchain::{InstrumentedStep, LambdaStep, Step, ExecutionContext, StepOutcome};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let step = LambdaStep::new(|input| async move {
///     let n = input.as_i64().unwrap_or(0);
///     Ok(StepOutcome::Continue(json!(n + 1)))
/// });
/// let instrumented = InstrumentedStep::new(step, "Increment");
///
/// let ctx = ExecutionContext::new();
/// let result = instrumented.process(&ctx, json!(5)).await.unwrap();
/// assert_eq!(result, StepOutcome::Continue(json!(6)));
///
/// let traces = ctx.trace_snapshot();
/// assert_eq!(traces.len(), 2); // StepStart + StepEnd
/// # });
/// ```
pub struct InstrumentedStep<S> {
    inner: S,
    name: String,
}

impl<S: Step> InstrumentedStep<S> {
    /// Wrap `inner` with instrumentation, labelling it `name`.
    pub fn new(inner: S, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    /// Access the inner step.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S> Step for InstrumentedStep<S>
where
    S: Step + 'static,
{
    async fn process(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        ctx.emit(PipelineEvent::StepStart {
            step_name: self.name.clone(),
        });

        let start = Instant::now();
        let result = self.inner.process(ctx, input).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(StepOutcome::Continue(_)) => {
                ctx.emit(PipelineEvent::StepEnd {
                    step_name: self.name.clone(),
                    duration_ms,
                });
            }
            Ok(StepOutcome::Stop) => {
                ctx.emit(PipelineEvent::ShortCircuit {
                    step_name: self.name.clone(),
                });
            }
            Err(e) => {
                ctx.record_failure(e.to_string());
                ctx.emit(PipelineEvent::Error {
                    step_name: self.name.clone(),
                    message: e.to_string(),
                });
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
