//! Per-element iteration over collections via a nested sub-pipeline.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::progress::{NoopProgress, ProgressReporter};
use crate::{Error, ExecutionContext, Pipeline, Result, StepOutcome};

use super::Step;

/// Reserved key holding the element currently being processed.
///
/// Each per-element input seen by a sub-pipeline is a shallow copy of the
/// outer object with this key populated, so sub-steps can read or replace the
/// current element while still seeing outer context.
pub const CURRENT_ITEM_KEY: &str = "_current_item";

/// Reserved key holding the zero-based position of the current element.
pub const ITERATION_INDEX_KEY: &str = "_iteration_index";

enum Mode {
    Items {
        items_key: String,
        results_key: String,
    },
    Iterations(usize),
}

/// A step that runs an inner pipeline once per element of a collection, or a
/// fixed number of times, aggregating per-run results into a list.
///
/// The mode is fixed at construction:
///
/// - [`ForEachStep::over_items`] reads the collection at `items_key` from an
///   object input, runs each element through the sub-pipeline, and writes the
///   results list at `results_key` in the same object.
/// - [`ForEachStep::iterations`] runs the sub-pipeline a fixed number of times
///   against the original input and yields the bare results list.
///
/// Elements whose sub-pipeline run short-circuits are retained in the results
/// list as `null`; append a
/// [`FilterNullsStep`](crate::step::keys::FilterNullsStep) downstream to drop
/// them. An error from any sub-step aborts the remaining elements and
/// propagates unmodified.
///
/// Sub-pipeline runs share the outer [`ExecutionContext`], so nested activity
/// aggregates into the outer run's metrics and traces. As a [`Step`] itself,
/// a `ForEachStep` nests inside another `ForEachStep`'s sub-pipeline with no
/// special-casing.
///
/// # Example
///
/// ```rust
/// use stepchain::{ForEachStep, LambdaStep, Pipeline, StepOutcome};
/// use stepchain::step::foreach::CURRENT_ITEM_KEY;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let square = LambdaStep::new(|input| async move {
///     let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
///     Ok(StepOutcome::Continue(json!(n * n)))
/// });
///
/// let pipeline = Pipeline::new()
///     .add_step(ForEachStep::over_items("numbers", "squared_numbers").add_sub_step(square));
///
/// let (outcome, _) = pipeline.run(json!({"numbers": [1, 2, 3]})).await.unwrap();
/// let data = outcome.into_value().unwrap();
/// assert_eq!(data["squared_numbers"], json!([1, 4, 9]));
/// # });
/// ```
pub struct ForEachStep {
    mode: Mode,
    sub_pipeline: Pipeline,
    progress: Arc<dyn ProgressReporter>,
    name: String,
}

impl ForEachStep {
    /// Create a keyed-collection step.
    ///
    /// `items_key` names the object entry holding the collection to iterate;
    /// `results_key` names the entry that receives the results list.
    pub fn over_items(items_key: impl Into<String>, results_key: impl Into<String>) -> Self {
        Self::with_mode(Mode::Items {
            items_key: items_key.into(),
            results_key: results_key.into(),
        })
    }

    /// Create a fixed-iteration step running its sub-pipeline `count` times.
    ///
    /// Each run receives a fresh copy of the original input; the step's
    /// outcome is the bare list of per-run results. `count` of zero yields an
    /// empty list without running anything.
    pub fn iterations(count: usize) -> Self {
        Self::with_mode(Mode::Iterations(count))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            sub_pipeline: Pipeline::new().with_name("foreach_sub"),
            progress: Arc::new(NoopProgress),
            name: "foreach".to_string(),
        }
    }

    /// Set a human-readable name for this step. Diagnostic only.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.sub_pipeline =
            std::mem::take(&mut self.sub_pipeline).with_name(format!("{}_sub", self.name));
        self
    }

    /// Install a progress reporter, advanced once per element or iteration
    /// and completed when the loop ends. Defaults to a no-op.
    pub fn with_progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Arc::new(reporter);
        self
    }

    /// Append a step to the sub-pipeline. Steps execute in the order added.
    pub fn add_sub_step(mut self, step: impl Step + 'static) -> Self {
        self.sub_pipeline = self.sub_pipeline.add_step(step);
        self
    }

    /// Run one value through the sub-pipeline, mapping a short-circuit to the
    /// `null` placeholder retained in the results list.
    async fn run_element(&self, ctx: &ExecutionContext, input: Value) -> Result<Value> {
        let outcome = self.sub_pipeline.run_with_ctx(ctx, input).await?;
        ctx.record_element();
        Ok(outcome.into_value().unwrap_or(Value::Null))
    }

    fn element_input(outer: &Value, item: Value, index: usize) -> Value {
        match outer {
            Value::Object(map) => {
                let mut elem = map.clone();
                elem.insert(CURRENT_ITEM_KEY.to_string(), item);
                elem.insert(ITERATION_INDEX_KEY.to_string(), json!(index));
                Value::Object(elem)
            }
            other => other.clone(),
        }
    }

    async fn process_items(
        &self,
        ctx: &ExecutionContext,
        data: Value,
        items_key: &str,
        results_key: &str,
    ) -> Result<StepOutcome> {
        let mut map = match data {
            Value::Object(map) => map,
            _ => {
                return Err(Error::Validation(format!(
                    "step '{}' requires an object input with an '{items_key}' entry",
                    self.name
                )))
            }
        };

        // A missing items entry means nothing to iterate, not an error.
        let items: Vec<Value> = match map.get(items_key) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(Error::Validation(format!(
                    "step '{}': '{items_key}' must hold a list",
                    self.name
                )))
            }
        };

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if !self.sub_pipeline.is_empty() {
                let mut elem = map.clone();
                elem.insert(CURRENT_ITEM_KEY.to_string(), item);
                elem.insert(ITERATION_INDEX_KEY.to_string(), json!(index));
                results.push(self.run_element(ctx, Value::Object(elem)).await?);
            }
            self.progress.advance();
        }
        self.progress.complete();

        map.insert(results_key.to_string(), Value::Array(results));
        Ok(StepOutcome::Continue(Value::Object(map)))
    }

    async fn process_iterations(
        &self,
        ctx: &ExecutionContext,
        data: Value,
        count: usize,
    ) -> Result<StepOutcome> {
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            if !self.sub_pipeline.is_empty() {
                let input = Self::element_input(&data, json!(index), index);
                results.push(self.run_element(ctx, input).await?);
            }
            self.progress.advance();
        }
        self.progress.complete();

        Ok(StepOutcome::Continue(Value::Array(results)))
    }
}

#[async_trait]
impl Step for ForEachStep {
    async fn process(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        match &self.mode {
            Mode::Items {
                items_key,
                results_key,
            } => {
                self.process_items(ctx, input, items_key, results_key)
                    .await
            }
            Mode::Iterations(count) => self.process_iterations(ctx, input, *count).await,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ClosureProgress, ProgressUpdate};
    use crate::LambdaStep;
    use std::sync::Mutex;

    fn square_current_item() -> LambdaStep<
        impl Fn(Value) -> std::future::Ready<Result<StepOutcome>> + Send + Sync,
    > {
        LambdaStep::new(|input: Value| {
            let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
            std::future::ready(Ok(StepOutcome::Continue(json!(n * n))))
        })
    }

    #[tokio::test]
    async fn test_keyed_mode_preserves_order_and_length() {
        let step = ForEachStep::over_items("numbers", "squared_numbers")
            .add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let out = step
            .process(&ctx, json!({"numbers": [1, 2, 3, 4, 5]}))
            .await
            .unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["squared_numbers"], json!([1, 4, 9, 16, 25]));
        // Outer data survives alongside the results.
        assert_eq!(data["numbers"], json!([1, 2, 3, 4, 5]));
        assert_eq!(ctx.snapshot().elements_processed, 5);
    }

    #[tokio::test]
    async fn test_sub_steps_see_outer_context() {
        let step = ForEachStep::over_items("items", "labels").add_sub_step(LambdaStep::new(
            |input: Value| async move {
                let prefix = input["prefix"].as_str().unwrap_or("").to_string();
                let item = input[CURRENT_ITEM_KEY].as_str().unwrap_or("").to_string();
                let index = input[ITERATION_INDEX_KEY].as_u64().unwrap_or(0);
                Ok(StepOutcome::Continue(json!(format!(
                    "{prefix}{item}#{index}"
                ))))
            },
        ));

        let ctx = ExecutionContext::new();
        let out = step
            .process(&ctx, json!({"prefix": "x-", "items": ["a", "b"]}))
            .await
            .unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["labels"], json!(["x-a#0", "x-b#1"]));
    }

    #[tokio::test]
    async fn test_empty_collection_yields_empty_results() {
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let out = step.process(&ctx, json!({"numbers": []})).await.unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["out"], json!([]));
        assert_eq!(ctx.snapshot().elements_processed, 0);
    }

    #[tokio::test]
    async fn test_missing_items_key_yields_empty_results() {
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let out = step.process(&ctx, json!({"other": 1})).await.unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["out"], json!([]));
    }

    #[tokio::test]
    async fn test_non_list_items_value_is_rejected() {
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let err = step
            .process(&ctx, json!({"numbers": "not a list"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_non_object_input_is_rejected_in_keyed_mode() {
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let err = step.process(&ctx, json!([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_short_circuited_elements_are_retained_as_null() {
        // Stop for odd elements, square the rest.
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(LambdaStep::new(
            |input: Value| async move {
                let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
                if n % 2 == 1 {
                    Ok(StepOutcome::Stop)
                } else {
                    Ok(StepOutcome::Continue(json!(n * n)))
                }
            },
        ));

        let ctx = ExecutionContext::new();
        let out = step
            .process(&ctx, json!({"numbers": [1, 2, 3, 4]}))
            .await
            .unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["out"], json!([null, 4, null, 16]));
        assert_eq!(ctx.snapshot().short_circuits, 2);
    }

    #[tokio::test]
    async fn test_fixed_iterations_yield_bare_list() {
        let step = ForEachStep::iterations(3).add_sub_step(LambdaStep::new(
            |input: Value| async move {
                let index = input[ITERATION_INDEX_KEY].as_u64().unwrap_or(99);
                Ok(StepOutcome::Continue(json!(index)))
            },
        ));

        let ctx = ExecutionContext::new();
        let out = step.process(&ctx, json!({"seed": 7})).await.unwrap();
        assert_eq!(out.into_value().unwrap(), json!([0, 1, 2]));
    }

    #[tokio::test]
    async fn test_iteration_runs_are_independent() {
        // Each run appends to a list in its own copy of the input; growth
        // never accumulates across runs.
        let step = ForEachStep::iterations(3).add_sub_step(LambdaStep::new(
            |mut input: Value| async move {
                let log = input["log"].as_array_mut().expect("log list");
                log.push(json!("ran"));
                Ok(StepOutcome::Continue(json!(log.len())))
            },
        ));

        let ctx = ExecutionContext::new();
        let out = step.process(&ctx, json!({"log": []})).await.unwrap();
        assert_eq!(out.into_value().unwrap(), json!([1, 1, 1]));
    }

    #[tokio::test]
    async fn test_zero_iterations_yield_empty_list() {
        let step = ForEachStep::iterations(0).add_sub_step(square_current_item());

        let ctx = ExecutionContext::new();
        let out = step.process(&ctx, json!(1)).await.unwrap();
        assert_eq!(out.into_value().unwrap(), json!([]));
        assert_eq!(ctx.snapshot().elements_processed, 0);
    }

    #[tokio::test]
    async fn test_sub_step_error_aborts_remaining_elements() {
        let step = ForEachStep::over_items("numbers", "out").add_sub_step(LambdaStep::new(
            |input: Value| async move {
                let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
                if n == 3 {
                    Err(Error::Execution("bad element".to_string()))
                } else {
                    Ok(StepOutcome::Continue(json!(n)))
                }
            },
        ));

        let ctx = ExecutionContext::new();
        let err = step
            .process(&ctx, json!({"numbers": [1, 2, 3, 4, 5]}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Execution(msg) if msg == "bad element"));
        // Only the first two elements completed before the abort.
        assert_eq!(ctx.snapshot().elements_processed, 2);
    }

    #[tokio::test]
    async fn test_progress_advances_per_element_and_completes() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let step = ForEachStep::over_items("numbers", "out")
            .add_sub_step(square_current_item())
            .with_progress(ClosureProgress::new(move |u| {
                sink.lock().unwrap().push(u)
            }));

        let ctx = ExecutionContext::new();
        step.process(&ctx, json!({"numbers": [1, 2, 3]}))
            .await
            .unwrap();

        let seen = updates.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ProgressUpdate::Advanced(1),
                ProgressUpdate::Advanced(2),
                ProgressUpdate::Advanced(3),
                ProgressUpdate::Completed(3),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_sub_pipeline_yields_empty_results() {
        let step = ForEachStep::over_items("numbers", "out");

        let ctx = ExecutionContext::new();
        let out = step
            .process(&ctx, json!({"numbers": [1, 2, 3]}))
            .await
            .unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["out"], json!([]));
        assert_eq!(ctx.snapshot().elements_processed, 0);
    }

    #[tokio::test]
    async fn test_nested_foreach_recursion() {
        // Outer iterates rows; inner increments each row's cells.
        let inner = ForEachStep::over_items(CURRENT_ITEM_KEY, "cell_sums").add_sub_step(
            LambdaStep::new(|input: Value| async move {
                let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
                Ok(StepOutcome::Continue(json!(n + 1)))
            }),
        );

        let outer = ForEachStep::over_items("rows", "out")
            .add_sub_step(inner)
            .add_sub_step(LambdaStep::new(|input: Value| async move {
                Ok(StepOutcome::Continue(input["cell_sums"].clone()))
            }));

        let ctx = ExecutionContext::new();
        let out = outer
            .process(&ctx, json!({"rows": [[1, 2], [3]]}))
            .await
            .unwrap();

        let data = out.into_value().unwrap();
        assert_eq!(data["out"], json!([[2, 3], [4]]));
    }
}
