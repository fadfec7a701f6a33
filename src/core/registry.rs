//! Action registry — symbolic action names mapped to executors.
//!
//! Each engine variant populates its registry once, inside
//! `initialize_action_map`. The registry is read-only afterwards; steps
//! resolve executors by name at dispatch time.

use crate::core::context::ExecutionContext;
use crate::core::errors::{EngineError, Result};
use crate::core::types::StepResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// Step-scoped view handed to an executor: the shared run environment plus
/// the identity of the step being executed.
pub struct StepContext<'a> {
    /// Run-scoped environment
    pub env: &'a ExecutionContext,

    /// Owning group name
    pub group: &'a str,

    /// Step name
    pub step: &'a str,
}

/// A named unit of work dispatchable from a recipe step.
///
/// Executors report ordinary step failures through an error-status
/// `StepResult`; an `Err` return is reserved for conditions the executor
/// cannot express as a result at all.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &StepContext<'_>,
        options: &serde_json::Value,
    ) -> Result<StepResult>;
}

impl std::fmt::Debug for dyn ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<action executor>")
    }
}

/// Insertion-ordered dispatch table from action name to executor.
pub struct ActionRegistry {
    recipe_type: String,
    executors: IndexMap<String, Arc<dyn ActionExecutor>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("recipe_type", &self.recipe_type)
            .field("actions", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActionRegistry {
    pub fn new(recipe_type: impl Into<String>) -> Self {
        Self {
            recipe_type: recipe_type.into(),
            executors: IndexMap::new(),
        }
    }

    /// Recipe dialect this registry serves.
    pub fn recipe_type(&self) -> &str {
        &self.recipe_type
    }

    /// Register an executor under its action name. Last registration wins.
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ActionExecutor>) {
        self.executors.insert(name.into(), executor);
    }

    /// Resolve an action name to its executor.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn ActionExecutor>> {
        self.executors
            .get(name)
            .ok_or_else(|| EngineError::UnknownAction {
                action: name.to_string(),
                recipe_type: self.recipe_type.clone(),
            })
    }

    /// Registered action names in registration order.
    pub fn action_names(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::context::{ExecutionContext, LogLevel};
    use crate::core::types::TargetEnvironment;
    use std::path::PathBuf;

    pub(crate) struct FixedExecutor(pub StepResult);

    #[async_trait]
    impl ActionExecutor for FixedExecutor {
        async fn execute(
            &self,
            _ctx: &StepContext<'_>,
            _options: &serde_json::Value,
        ) -> Result<StepResult> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn test_context() -> ExecutionContext {
        ExecutionContext {
            target: TargetEnvironment {
                name: "Test".to_string(),
                alias: "test".to_string(),
                description: "test target".to_string(),
                is_ephemeral: true,
                ephemeral_def: Some("def.json".to_string()),
                requirements_ref: None,
            },
            project_path: PathBuf::from("."),
            config_path: PathBuf::from("config"),
            source_path: PathBuf::from("src"),
            data_path: PathBuf::from("data"),
            log_level: LogLevel::Info,
            compile_options: serde_json::Value::Null,
            state: Default::default(),
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ActionRegistry::new("demo-deployment");
        registry.register(
            "noop",
            Arc::new(FixedExecutor(StepResult::success("did nothing"))),
        );
        assert!(registry.resolve("noop").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_names_action_and_engine() {
        let registry = ActionRegistry::new("demo-deployment");
        let err = registry.resolve("deploy-metadata").unwrap_err();
        match err {
            EngineError::UnknownAction {
                action,
                recipe_type,
            } => {
                assert_eq!(action, "deploy-metadata");
                assert_eq!(recipe_type, "demo-deployment");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_action_names_preserve_registration_order() {
        let mut registry = ActionRegistry::new("demo-deployment");
        for name in ["shell-command", "delay", "noop"] {
            registry.register(name, Arc::new(FixedExecutor(StepResult::success("ok"))));
        }
        assert_eq!(registry.action_names(), vec!["shell-command", "delay", "noop"]);
    }

    #[tokio::test]
    async fn test_executor_receives_step_identity() {
        struct EchoIdentity;

        #[async_trait]
        impl ActionExecutor for EchoIdentity {
            async fn execute(
                &self,
                ctx: &StepContext<'_>,
                _options: &serde_json::Value,
            ) -> Result<StepResult> {
                Ok(StepResult::success(format!("{}/{}", ctx.group, ctx.step)))
            }
        }

        let mut registry = ActionRegistry::new("demo-deployment");
        registry.register("echo", Arc::new(EchoIdentity));

        let env = test_context();
        let ctx = StepContext {
            env: &env,
            group: "Prepare",
            step: "Create workspace",
        };
        let result = registry
            .resolve("echo")
            .unwrap()
            .execute(&ctx, &serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(result.message, "Prepare/Create workspace");
    }
}
