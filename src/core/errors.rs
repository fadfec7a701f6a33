//! Engine error taxonomy.
//!
//! Validation and compilation errors abort before any external side effect;
//! execution errors are recorded per step and escalate only when the recipe's
//! halt policy says so.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the recipe engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Structural or semantic recipe violation. Names the offending field.
    #[error("invalid recipe: {detail}")]
    InvalidRecipe { detail: String },

    /// A step group claimed active steps but compiled to an empty step list.
    #[error("step group '{group}' contains no steps")]
    NoSteps { group: String },

    /// A step's action has no registered executor.
    #[error("'{action}' is not a recognized action of the '{recipe_type}' engine")]
    UnknownAction { action: String, recipe_type: String },

    /// An action executor failed while running a step.
    #[error("step '{step}' (action '{action}') in group '{group}' failed: {detail}")]
    StepFailed {
        group: String,
        step: String,
        action: String,
        detail: String,
    },

    /// Emergency stop — terminates the run regardless of halt policy.
    #[error("execution killed: {message}")]
    Fatal { message: String },

    /// Recipe file could not be read.
    #[error("cannot read recipe {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Recipe file is not valid JSON for the recipe schema.
    #[error("recipe parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for a validation failure naming the offending field.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidRecipe {
            detail: detail.into(),
        }
    }
}
