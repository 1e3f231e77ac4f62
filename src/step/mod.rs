//! Core step trait and fundamental step types.
//!
//! This module defines the [`Step`] trait — the atomic processing unit of
//! every pipeline — along with [`LambdaStep`] for closure-based steps and
//! [`StepExt`] for type-erased composition.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

use crate::{ExecutionContext, Result, StepOutcome};

pub mod foreach;
pub mod keys;

/// The atomic processing unit of a pipeline.
///
/// Each step receives shared execution context (for metrics/tracing) and an
/// untyped JSON value, and produces a [`StepOutcome`]: a transformed value for
/// the next step, or the stop sentinel halting the chain. A step may instead
/// fail with an [`Error`](crate::Error); errors are not part of the
/// short-circuit protocol and propagate to the caller unmodified.
///
/// # Example
///
/// ```rust
/// use stepchain::{LambdaStep, StepOutcome};
/// use serde_json::json;
///
/// let double = LambdaStep::new(|input| async move {
///     let n = input.as_i64().unwrap_or(0);
///     Ok(StepOutcome::Continue(json!(n * 2)))
/// });
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Execute this step with the provided context and input.
    async fn process(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome>;

    /// Returns a human-readable name for this step. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A type-erased step, as stored inside a [`Pipeline`](crate::Pipeline).
pub type BoxedStep = Box<dyn Step>;

/// A step constructed from a closure or function pointer.
///
/// # Example
///
/// ```rust
/// use stepchain::{LambdaStep, StepOutcome};
/// use serde_json::json;
///
/// let add_ten = LambdaStep::new(|input| async move {
///     let n = input.as_i64().unwrap_or(0);
///     Ok(StepOutcome::Continue(json!(n + 10)))
/// })
/// .with_name("AddTen");
/// ```
pub struct LambdaStep<F> {
    f: F,
    name: String,
}

impl<F, Fut> LambdaStep<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutcome>> + Send + 'static,
{
    /// Create a new `LambdaStep` from the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "lambda_step".to_string(),
        }
    }

    /// Set a human-readable name for this step.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Step for LambdaStep<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutcome>> + Send + 'static,
{
    async fn process(&self, _ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        (self.f)(input).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extension trait providing type erasure for all [`Step`] implementors.
///
/// This trait is automatically implemented for every type that implements
/// [`Step`].
pub trait StepExt: Step + Sized {
    /// Erase the concrete step type, returning a trait object.
    fn boxed(self) -> BoxedStep
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: Step + Sized> StepExt for T {}

// Implement Step for boxed steps so they can be nested and re-wrapped.
#[async_trait]
impl Step for BoxedStep {
    async fn process(&self, ctx: &ExecutionContext, input: Value) -> Result<StepOutcome> {
        (**self).process(ctx, input).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
