//! Ordered step sequencing with short-circuit semantics.

use async_trait::async_trait;
use serde_json::Value;

use crate::step::{BoxedStep, Step};
use crate::{ExecutionContext, PipelineEvent, PipelineMetrics, Result, StepOutcome};

/// An ordered, reusable sequence of steps executed synchronously start to
/// finish.
///
/// Steps run in insertion order, each receiving the previous step's output.
/// When a step returns [`StepOutcome::Stop`], no later step runs and the
/// pipeline's own outcome is `Stop`. A step error propagates immediately with
/// no partial result; the pipeline does not retry, catch, or log on its own —
/// all recovery policy belongs to the caller.
///
/// A pipeline with zero steps returns its input unchanged.
///
/// # Example
///
/// ```rust
/// use stepchain::{LambdaStep, Pipeline, StepOutcome};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::new()
///     .with_name("AddThenDouble")
///     .add_step(LambdaStep::new(|input| async move {
///         let n = input.as_i64().unwrap_or(0);
///         Ok(StepOutcome::Continue(json!(n + 10)))
///     }))
///     .add_step(LambdaStep::new(|input| async move {
///         let n = input.as_i64().unwrap_or(0);
///         Ok(StepOutcome::Continue(json!(n * 2)))
///     }));
///
/// let (outcome, metrics) = pipeline.run(json!(5)).await.unwrap();
/// assert_eq!(outcome, StepOutcome::Continue(json!(30)));
/// assert_eq!(metrics.steps_completed, 2);
/// # });
/// ```
pub struct Pipeline {
    steps: Vec<BoxedStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "pipeline".to_string(),
        }
    }

    /// Set a human-readable name for this pipeline. Diagnostic only.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the name of this pipeline.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a step to the end of the chain.
    ///
    /// Insertion order is execution order. Adding the same logical step twice
    /// legitimately runs it twice.
    pub fn add_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Returns the number of steps in this pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if this pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the pipeline, returning the outcome along with collected metrics.
    ///
    /// A fresh [`ExecutionContext`] is created for each invocation.
    pub async fn run(&self, input: Value) -> Result<(StepOutcome, PipelineMetrics)> {
        let ctx = ExecutionContext::new();
        let outcome = self.run_with_ctx(&ctx, input).await?;
        let metrics = ctx.snapshot();
        Ok((outcome, metrics))
    }

    /// Run the pipeline with a caller-provided execution context.
    ///
    /// Useful when sharing a context across multiple runs to accumulate
    /// metrics, and used internally by [`ForEachStep`](crate::ForEachStep) so
    /// sub-pipeline activity aggregates into the outer run.
    pub async fn run_with_ctx(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        let mut current = input;
        for step in &self.steps {
            tracing::trace!(pipeline = %self.name, step = %step.name(), "running step");
            match step.process(ctx, current).await? {
                StepOutcome::Continue(value) => {
                    ctx.record_step();
                    current = value;
                }
                StepOutcome::Stop => {
                    ctx.record_short_circuit();
                    ctx.emit(PipelineEvent::ShortCircuit {
                        step_name: step.name().to_string(),
                    });
                    tracing::debug!(pipeline = %self.name, step = %step.name(), "short-circuit");
                    return Ok(StepOutcome::Stop);
                }
            }
        }
        Ok(StepOutcome::Continue(current))
    }
}

// A pipeline is itself a step, so pipelines nest without special-casing.
#[async_trait]
impl Step for Pipeline {
    async fn process(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        self.run_with_ctx(ctx, input).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, LambdaStep};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn add(n: i64) -> LambdaStep<impl Fn(Value) -> std::future::Ready<Result<StepOutcome>> + Send + Sync>
    {
        LambdaStep::new(move |input: Value| {
            let v = input.as_i64().unwrap_or(0);
            std::future::ready(Ok(StepOutcome::Continue(json!(v + n))))
        })
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        let (outcome, metrics) = pipeline.run(json!({"anything": [1, 2]})).await.unwrap();
        assert_eq!(outcome, StepOutcome::Continue(json!({"anything": [1, 2]})));
        assert_eq!(metrics.steps_completed, 0);
    }

    #[tokio::test]
    async fn test_sequential_composition() {
        let pipeline = Pipeline::new()
            .add_step(add(10))
            .add_step(LambdaStep::new(|input: Value| async move {
                let v = input.as_i64().unwrap_or(0);
                Ok(StepOutcome::Continue(json!(v * 2)))
            }));

        let (outcome, metrics) = pipeline.run(json!(5)).await.unwrap();
        assert_eq!(outcome, StepOutcome::Continue(json!(30)));
        assert_eq!(metrics.steps_completed, 2);
        assert_eq!(metrics.short_circuits, 0);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_later_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spy_calls = calls.clone();

        let pipeline = Pipeline::new()
            .add_step(LambdaStep::new(|_| async { Ok(StepOutcome::Stop) }))
            .add_step(LambdaStep::new(move |input| {
                let calls = spy_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(StepOutcome::Continue(input))
                }
            }));

        let (outcome, metrics) = pipeline.run(json!(1)).await.unwrap();
        assert_eq!(outcome, StepOutcome::Stop);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.short_circuits, 1);
        assert_eq!(metrics.steps_completed, 0);
    }

    #[tokio::test]
    async fn test_short_circuit_emits_trace_event() {
        let pipeline = Pipeline::new().add_step(
            LambdaStep::new(|_| async { Ok(StepOutcome::Stop) }).with_name("Halt"),
        );

        let ctx = ExecutionContext::new();
        let outcome = pipeline.run_with_ctx(&ctx, json!(1)).await.unwrap();
        assert!(outcome.is_stop());

        let traces = ctx.trace_snapshot();
        assert_eq!(traces.len(), 1);
        assert!(matches!(
            &traces[0].event,
            PipelineEvent::ShortCircuit { step_name } if step_name == "Halt"
        ));
    }

    #[tokio::test]
    async fn test_error_propagates_without_partial_result() {
        let pipeline = Pipeline::new()
            .add_step(add(1))
            .add_step(LambdaStep::new(|_| async {
                Err(Error::Execution("divisor is zero".to_string()))
            }))
            .add_step(add(100));

        let err = pipeline.run(json!(5)).await.unwrap_err();
        assert!(matches!(err, Error::Execution(msg) if msg == "divisor is zero"));
    }

    #[tokio::test]
    async fn test_nested_pipeline_as_step() {
        let inner = Pipeline::new().with_name("inner").add_step(add(1));
        let outer = Pipeline::new().add_step(inner).add_step(add(10));

        let (outcome, _) = outer.run(json!(0)).await.unwrap();
        assert_eq!(outcome, StepOutcome::Continue(json!(11)));
    }

    #[tokio::test]
    async fn test_pipeline_is_reusable() {
        let pipeline = Pipeline::new().add_step(add(1));
        let (first, _) = pipeline.run(json!(0)).await.unwrap();
        let (second, _) = pipeline.run(json!(41)).await.unwrap();
        assert_eq!(first, StepOutcome::Continue(json!(1)));
        assert_eq!(second, StepOutcome::Continue(json!(42)));
    }
}
