//! Built-in action executors and the demo engine variant.
//!
//! Real deployment actions wrap external CLIs and live outside this crate.
//! The executors here are small enough to ship built in and give the demo
//! engine variant a complete, runnable action map.

pub mod shell;

use crate::core::context::{ExecutionContext, LogLevel};
use crate::core::engine::EngineSpec;
use crate::core::errors::{EngineError, Result};
use crate::core::parser::ValidatedRecipe;
use crate::core::registry::{ActionExecutor, ActionRegistry, StepContext};
use crate::core::types::StepResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Succeeds immediately. Useful as a placeholder while authoring recipes.
pub struct Noop;

#[async_trait]
impl ActionExecutor for Noop {
    async fn execute(
        &self,
        _ctx: &StepContext<'_>,
        _options: &serde_json::Value,
    ) -> Result<StepResult> {
        Ok(StepResult::success("no-op"))
    }
}

#[derive(Debug, Deserialize)]
struct DelayOptions {
    milliseconds: u64,
}

/// Sleeps for the configured duration, then succeeds.
pub struct Delay;

#[async_trait]
impl ActionExecutor for Delay {
    async fn execute(
        &self,
        ctx: &StepContext<'_>,
        options: &serde_json::Value,
    ) -> Result<StepResult> {
        let opts: DelayOptions = serde_json::from_value(options.clone()).map_err(|e| {
            EngineError::invalid(format!("step '{}': delay options: {e}", ctx.step))
        })?;
        tokio::time::sleep(std::time::Duration::from_millis(opts.milliseconds)).await;
        Ok(StepResult::success(format!(
            "waited {} ms",
            opts.milliseconds
        )))
    }
}

/// Engine variant for `demo-deployment` recipes.
///
/// Registers the built-in executors and binds the first declared target.
pub struct DemoEngine {
    /// Project root used as the default working directory for shell steps
    pub project_path: PathBuf,
}

impl DemoEngine {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
        }
    }
}

impl EngineSpec for DemoEngine {
    fn recipe_type(&self) -> &str {
        "demo-deployment"
    }

    fn initialize_action_map(&self, registry: &mut ActionRegistry) {
        registry.register("shell-command", Arc::new(shell::ShellCommand));
        registry.register("delay", Arc::new(Delay));
        registry.register("noop", Arc::new(Noop));
    }

    fn initialize_context(
        &self,
        recipe: &ValidatedRecipe,
        compile_options: serde_json::Value,
    ) -> Result<ExecutionContext> {
        // Validation guarantees at least one target; the first declared one
        // is the run's destination.
        let target = recipe.options.target_environments[0].clone();
        Ok(ExecutionContext {
            target,
            config_path: self.project_path.join("config"),
            source_path: self.project_path.join("src"),
            data_path: self.project_path.join("data"),
            project_path: self.project_path.clone(),
            log_level: LogLevel::Info,
            compile_options,
            state: Default::default(),
        })
    }
}
