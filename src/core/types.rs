//! Recipe schema, plan types, step results, and run events.
//!
//! A recipe is the immutable specification of work: ordered step groups,
//! run options (skip lists, halt policy, target environments), and symbolic
//! handler references. Recipes are written as JSON; all schema types derive
//! Serialize/Deserialize for roundtripping.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Recipe schema
// ============================================================================

/// Root recipe document — the declarative specification of an automation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Human-readable recipe name
    pub recipe_name: String,

    /// Recipe dialect; each engine variant accepts exactly one type
    pub recipe_type: String,

    /// Grammar version of this recipe document
    pub schema_version: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Run options
    pub options: RecipeOptions,

    /// Ordered step groups
    pub step_groups: Vec<StepGroup>,

    /// Named handler references (symbolic only at this layer)
    #[serde(default)]
    pub handlers: Vec<HandlerRef>,
}

/// Run options shared by every step of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeOptions {
    /// Group aliases to omit from the compiled plan
    pub skip_groups: Vec<String>,

    /// Action names to omit from the compiled plan
    pub skip_actions: Vec<String>,

    /// Abort the whole plan on the first step failure
    pub halt_on_error: bool,

    /// Deployment destinations (at least one)
    pub target_environments: Vec<TargetEnvironment>,
}

/// A deployment destination — either a freshly provisioned scratch
/// environment or a pre-existing one checked against external requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEnvironment {
    /// Environment name
    pub name: String,

    /// Short alias used for selection
    pub alias: String,

    /// Human-readable description
    pub description: String,

    /// Scratch (ephemeral) vs. persistent
    pub is_ephemeral: bool,

    /// Provisioning definition — required when ephemeral
    #[serde(default)]
    pub ephemeral_def: Option<String>,

    /// External requirements reference — required when persistent
    #[serde(default)]
    pub requirements_ref: Option<String>,
}

/// An ordered bundle of steps sharing a title and a skip alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepGroup {
    /// Group title shown in progress output
    pub group_name: String,

    /// Alias checked against `options.skip_groups`
    pub alias: String,

    /// Human-readable description
    pub description: String,

    /// Ordered steps; may be empty, but such a group is never compiled
    pub steps: Vec<Step>,
}

/// One unit of work, mapped to a named action at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step title shown in progress output
    pub step_name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Symbolic action key, resolved against the action registry at dispatch
    pub action: String,

    /// Action-specific payload, opaque to the engine
    #[serde(default)]
    pub options: serde_json::Value,

    /// Handler reference fired on success. Deserialized but never dispatched
    /// by the engine; reserved for handler support.
    #[serde(default)]
    pub on_success: Option<String>,

    /// Handler reference fired on error. Same status as `on_success`.
    #[serde(default)]
    pub on_error: Option<String>,
}

/// A named failure/success handler reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Handler name
    pub name: String,
}

// ============================================================================
// Step results
// ============================================================================

/// Terminal status of a single executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Warning,
    Error,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Result returned by an executed step and retained for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step status
    pub outcome: StepOutcome,

    /// Human-readable result message
    pub message: String,

    /// Action-specific result payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl StepResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Success,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Warning,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Error,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    /// Attach a result payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// A step result plus its identity and timing — one entry in the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Owning group name
    pub group: String,

    /// Step name
    pub step: String,

    /// Action that was dispatched
    pub action: String,

    /// The result the step produced
    pub result: StepResult,

    /// Wall-clock duration of the step
    pub duration_seconds: f64,
}

// ============================================================================
// Execution plan
// ============================================================================

/// Compiled, skip-filtered plan — ordered groups of ordered steps, ready for
/// strictly sequential execution.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Recipe name
    pub recipe_name: String,

    /// Recipe dialect the plan was compiled from
    pub recipe_type: String,

    /// Abort the remaining plan on the first step failure
    pub halt_on_error: bool,

    /// Surviving groups in declared order
    pub groups: Vec<PlannedGroup>,

    /// Summary counts
    pub total_steps: u32,
    pub skipped_steps: u32,
    pub skipped_groups: u32,
}

/// A surviving step group within a compiled plan.
#[derive(Debug, Clone)]
pub struct PlannedGroup {
    /// Group title
    pub group_name: String,

    /// Group skip alias
    pub alias: String,

    /// Surviving steps in declared order. Executors are resolved at
    /// dispatch, so an unknown action surfaces as a step failure.
    pub steps: Vec<Step>,
}

// ============================================================================
// Run outcome and progress events
// ============================================================================

/// Terminal outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Warning,
    Error,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Typed progress event posted by the execution runtime.
///
/// Events are one-way and append-only: the runtime posts, a caller-supplied
/// sink consumes. Serialized (tagged snake case) for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        recipe: String,
        target: String,
        total_steps: u32,
    },
    GroupStarted {
        group: String,
    },
    StepStarted {
        group: String,
        step: String,
        action: String,
    },
    StepSucceeded {
        group: String,
        step: String,
        outcome: StepOutcome,
        message: String,
        duration_seconds: f64,
    },
    StepFailed {
        group: String,
        step: String,
        action: String,
        error: String,
        duration_seconds: f64,
    },
    GroupCompleted {
        group: String,
    },
    GroupAborted {
        group: String,
    },
    RunCompleted {
        outcome: RunOutcome,
        steps_succeeded: u32,
        steps_warned: u32,
        steps_failed: u32,
        total_seconds: f64,
    },
    RunAborted {
        error: String,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

// ============================================================================
// Tests
// ============================================================================
