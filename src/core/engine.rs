//! Engine façade — `EngineSpec` variants behind a common compile/execute API.
//!
//! An `EngineSpec` defines one recipe dialect: which `recipe_type` it
//! accepts, which actions it registers, and how the run context is bound.
//! `RecipeEngine::compile` turns a spec plus a recipe into a ready-to-run
//! engine; `execute` consumes the engine and drives the plan.

use crate::core::compiler;
use crate::core::context::{ExecutionContext, RunStatus, RunSummary};
use crate::core::errors::{EngineError, Result};
use crate::core::parser::{validate_recipe, ValidatedRecipe};
use crate::core::registry::ActionRegistry;
use crate::core::runtime::{self, execute_plan, ProgressSink};
use crate::core::types::{ExecutionPlan, Recipe};
use tracing::info;

/// Hooks an engine variant must provide.
pub trait EngineSpec {
    /// Recipe dialect this variant accepts.
    fn recipe_type(&self) -> &str;

    /// Populate the action registry. Called once, during compile.
    fn initialize_action_map(&self, registry: &mut ActionRegistry);

    /// Bind the run context: target environment, filesystem roots, log level.
    fn initialize_context(
        &self,
        recipe: &ValidatedRecipe,
        compile_options: serde_json::Value,
    ) -> Result<ExecutionContext>;
}

/// A compiled, ready-to-run recipe engine.
///
/// Owns the run's `RunStatus`, so the authoritative timer and step log are
/// reachable for inspection and for `kill_execution` while a run is under
/// way. One engine drives exactly one run.
#[derive(Debug)]
pub struct RecipeEngine {
    plan: ExecutionPlan,
    ctx: ExecutionContext,
    registry: ActionRegistry,
    status: RunStatus,
}

impl RecipeEngine {
    /// Validate a recipe against a variant and compile it.
    ///
    /// Rejects recipes whose `recipe_type` does not match the variant before
    /// anything else runs.
    pub fn compile(
        spec: &dyn EngineSpec,
        recipe: Recipe,
        compile_options: serde_json::Value,
    ) -> Result<Self> {
        if recipe.recipe_type != spec.recipe_type() {
            return Err(EngineError::invalid(format!(
                "recipe_type '{}' is not handled by the '{}' engine",
                recipe.recipe_type,
                spec.recipe_type()
            )));
        }

        let validated = validate_recipe(recipe)?;
        let ctx = spec.initialize_context(&validated, compile_options)?;

        let mut registry = ActionRegistry::new(spec.recipe_type());
        spec.initialize_action_map(&mut registry);

        let plan = compiler::compile(&validated)?;
        info!(
            recipe = %plan.recipe_name,
            steps = plan.total_steps,
            actions = registry.len(),
            "engine compiled"
        );

        Ok(Self {
            plan,
            ctx,
            registry,
            status: RunStatus::new(),
        })
    }

    /// The compiled plan, for inspection and display.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// The bound run context.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Registered action names, in registration order.
    pub fn action_names(&self) -> Vec<&str> {
        self.registry.action_names()
    }

    /// The run's status tracker: timer plus the step log recorded so far.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Drive the plan to completion, posting progress to the sink.
    pub async fn execute(&mut self, progress: &mut dyn ProgressSink) -> RunSummary {
        execute_plan(
            &self.plan,
            &self.ctx,
            &self.registry,
            &mut self.status,
            progress,
        )
        .await
    }

    /// Emergency stop: freeze this run's timer and produce the fatal error.
    ///
    /// Bypasses the halt policy entirely. Available to engine variants and
    /// callers as the counterpart of ordinary per-step failure handling.
    pub fn kill_execution(&mut self, message: &str) -> EngineError {
        runtime::kill_execution(&mut self.status, message)
    }
}
