//! Built-in steps for manipulating keyed-object inputs.
//!
//! These steps operate on the keyed-object convention: structured data passed
//! through the chain as a JSON object. Inputs that are not objects pass
//! through unchanged rather than failing, so the steps compose safely in
//! pipelines whose upstream output shape varies.

use async_trait::async_trait;
use serde_json::Value;

use crate::{ExecutionContext, Result, StepOutcome};

use super::Step;

/// A step that inserts a fixed key/value pair into an object input.
///
/// Non-object inputs pass through unchanged.
///
/// # Example
///
/// ```rust
/// use stepchain::{step::keys::AddKeyStep, Step, ExecutionContext, StepOutcome};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let step = AddKeyStep::new("flag", json!(true));
/// let ctx = ExecutionContext::new();
///
/// let out = step.process(&ctx, json!({"value": 5})).await.unwrap();
/// assert_eq!(out, StepOutcome::Continue(json!({"value": 5, "flag": true})));
/// # });
/// ```
pub struct AddKeyStep {
    key: String,
    value: Value,
}

impl AddKeyStep {
    /// Create a step inserting `value` at `key`.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Step for AddKeyStep {
    async fn process(&self, _ctx: &ExecutionContext, mut input: Value) -> Result<StepOutcome> {
        if let Some(map) = input.as_object_mut() {
            map.insert(self.key.clone(), self.value.clone());
        }
        Ok(StepOutcome::Continue(input))
    }

    fn name(&self) -> &str {
        "add_key"
    }
}

/// A step that removes a named key from an object input.
///
/// Missing keys and non-object inputs are no-ops.
pub struct DeleteKeyStep {
    key: String,
}

impl DeleteKeyStep {
    /// Create a step removing `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Step for DeleteKeyStep {
    async fn process(&self, _ctx: &ExecutionContext, mut input: Value) -> Result<StepOutcome> {
        if let Some(map) = input.as_object_mut() {
            map.remove(&self.key);
        }
        Ok(StepOutcome::Continue(input))
    }

    fn name(&self) -> &str {
        "delete_key"
    }
}

/// A step that removes `null` entries from the list stored at a named key.
///
/// [`ForEachStep`](crate::ForEachStep) retains short-circuited elements in its
/// results list as `null`; append this step downstream when those slots should
/// be dropped instead. Missing keys, non-list values, and non-object inputs
/// pass through unchanged.
pub struct FilterNullsStep {
    key: String,
}

impl FilterNullsStep {
    /// Create a step compacting the list at `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Step for FilterNullsStep {
    async fn process(&self, _ctx: &ExecutionContext, mut input: Value) -> Result<StepOutcome> {
        if let Some(list) = input.get_mut(&self.key).and_then(Value::as_array_mut) {
            list.retain(|entry| !entry.is_null());
        }
        Ok(StepOutcome::Continue(input))
    }

    fn name(&self) -> &str {
        "filter_nulls"
    }
}
