//! The step outcome type and its short-circuit sentinel.
//!
//! Steps either continue the chain with a value or stop it. Stopping is a
//! normal terminal outcome, distinct from an error: `Continue(Value::Null)`
//! carries a legitimate null payload, while [`StepOutcome::Stop`] means
//! "no more data — halt the pipeline here".

use serde_json::Value;

/// The result of running a step: either a value to feed the next step,
/// or the sentinel halting the owning pipeline.
///
/// # Example
///
/// ```rust
/// use stepchain::StepOutcome;
/// use serde_json::json;
///
/// let outcome = StepOutcome::Continue(json!({"value": 5}));
/// assert!(!outcome.is_stop());
/// assert_eq!(outcome.into_value(), Some(json!({"value": 5})));
///
/// assert!(StepOutcome::Stop.is_stop());
/// assert_eq!(StepOutcome::Stop.into_value(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Pass this value to the next step in the chain.
    Continue(Value),
    /// Halt the pipeline; no later step runs for this input.
    Stop,
}

impl StepOutcome {
    /// Returns `true` if this outcome is the short-circuit sentinel.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, StepOutcome::Stop)
    }

    /// Consume the outcome, returning the carried value if any.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            StepOutcome::Continue(value) => Some(value),
            StepOutcome::Stop => None,
        }
    }

    /// Borrow the carried value if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StepOutcome::Continue(value) => Some(value),
            StepOutcome::Stop => None,
        }
    }
}

impl From<Value> for StepOutcome {
    fn from(value: Value) -> Self {
        StepOutcome::Continue(value)
    }
}
