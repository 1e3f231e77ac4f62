//! # stepchain
//!
//! Composable sequential data-processing pipelines in Rust, built on the
//! Chain of Responsibility pattern.
//!
//! This crate provides building blocks for composing ordered chains of
//! processing steps over untyped JSON data, with short-circuit semantics,
//! per-element iteration, injectable progress reporting, and observability
//! through execution metrics and structured traces.
//!
//! ## Core Concepts
//!
//! - **Step**: the atomic processing unit; transforms one value into a
//!   [`StepOutcome`]
//! - **StepOutcome**: `Continue(value)` feeds the next step; `Stop` halts the
//!   chain without being an error
//! - **Pipeline**: an ordered, reusable sequence of steps
//! - **ForEachStep**: runs a sub-pipeline once per collection element, or a
//!   fixed number of times
//! - **ExecutionContext**: shared context for metrics and trace collection
//! - **InstrumentedStep**: per-step event emission and timing
//! - **ProgressReporter**: injectable advance/complete progress capability
//!
//! ## Example: Keyed Iteration
//!
//! ```rust
//! use stepchain::{ForEachStep, LambdaStep, Pipeline, StepOutcome};
//! use stepchain::step::foreach::CURRENT_ITEM_KEY;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let square = LambdaStep::new(|input| async move {
//!     let n = input[CURRENT_ITEM_KEY].as_i64().unwrap_or(0);
//!     Ok(StepOutcome::Continue(json!(n * n)))
//! });
//!
//! let pipeline = Pipeline::new().with_name("SquareAll").add_step(
//!     ForEachStep::over_items("numbers", "squared_numbers").add_sub_step(square),
//! );
//!
//! let (outcome, metrics) = pipeline.run(json!({"numbers": [1, 2, 3]})).await.unwrap();
//! let data = outcome.into_value().unwrap();
//!
//! assert_eq!(data["squared_numbers"], json!([1, 4, 9]));
//! assert_eq!(metrics.elements_processed, 3);
//! # });
//! ```

pub mod context;
pub mod error;
pub mod events;
pub mod instrumented;
pub mod metrics;
pub mod outcome;
pub mod pipeline;
pub mod progress;
pub mod step;

pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use events::{PipelineEvent, TraceEntry};
pub use instrumented::InstrumentedStep;
pub use metrics::PipelineMetrics;
pub use outcome::StepOutcome;
pub use pipeline::Pipeline;
pub use progress::{ClosureProgress, NoopProgress, ProgressReporter, ProgressUpdate, TracingProgress};

// Re-export step types
pub use step::foreach::ForEachStep;
pub use step::keys::{AddKeyStep, DeleteKeyStep, FilterNullsStep};
pub use step::{BoxedStep, LambdaStep, Step, StepExt};
