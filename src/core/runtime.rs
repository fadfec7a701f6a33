//! Execution runtime — sequential plan walker.
//!
//! Walks a compiled plan group by group, step by step, awaiting each
//! executor to completion before the next. One logical thread of control;
//! no concurrency across groups or steps. Progress is posted as typed
//! events to a caller-supplied sink.

use crate::core::context::{ExecutionContext, RunStatus, RunSummary};
use crate::core::errors::EngineError;
use crate::core::registry::{ActionRegistry, StepContext};
use crate::core::types::{ExecutionPlan, RunEvent, StepOutcome, StepRecord, StepResult};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Consumer of runtime progress events. Events are one-way and append-only.
pub trait ProgressSink {
    fn post(&mut self, event: RunEvent);
}

/// Sink that discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn post(&mut self, _event: RunEvent) {}
}

/// Execute a compiled plan sequentially.
///
/// Never returns an error: a failing step is recorded in the summary, and
/// with `halt_on_error` the remaining plan is abandoned while the summary
/// still carries every record produced so far. The overall outcome folds
/// the step outcomes (any error wins, then any warning).
///
/// The caller owns the `RunStatus`, so the authoritative timer and step log
/// stay reachable while the run is in flight. `kill_execution` acts on that
/// same status.
pub async fn execute_plan(
    plan: &ExecutionPlan,
    ctx: &ExecutionContext,
    registry: &ActionRegistry,
    status: &mut RunStatus,
    progress: &mut dyn ProgressSink,
) -> RunSummary {
    status.start();

    info!(recipe = %plan.recipe_name, target = %ctx.target.alias, "run started");
    progress.post(RunEvent::RunStarted {
        recipe: plan.recipe_name.clone(),
        target: ctx.target.alias.clone(),
        total_steps: plan.total_steps,
    });

    let mut halted = false;

    'groups: for group in &plan.groups {
        progress.post(RunEvent::GroupStarted {
            group: group.group_name.clone(),
        });

        for step in &group.steps {
            let record = execute_step(ctx, registry, &group.group_name, step, progress).await;
            let failed = record.result.outcome == StepOutcome::Error;
            status.record_step(record);

            if failed && plan.halt_on_error {
                warn!(group = %group.group_name, step = %step.step_name, "halting run");
                progress.post(RunEvent::GroupAborted {
                    group: group.group_name.clone(),
                });
                halted = true;
                break 'groups;
            }
        }

        if !halted {
            progress.post(RunEvent::GroupCompleted {
                group: group.group_name.clone(),
            });
        }
    }

    let summary = status.finalize(halted);
    if halted {
        progress.post(RunEvent::RunAborted {
            error: summary
                .records
                .last()
                .map(|r| r.result.message.clone())
                .unwrap_or_default(),
            total_seconds: summary.total_duration.as_secs_f64(),
        });
    } else {
        progress.post(RunEvent::RunCompleted {
            outcome: summary.outcome,
            steps_succeeded: summary.steps_succeeded,
            steps_warned: summary.steps_warned,
            steps_failed: summary.steps_failed,
            total_seconds: summary.total_duration.as_secs_f64(),
        });
    }
    info!(outcome = %summary.outcome, halted, "run finished");

    summary
}

/// Dispatch one step and fold every failure mode into its record.
///
/// Unknown actions and executor errors are attributed to the step like any
/// other failure, so the halt policy decides what happens next.
async fn execute_step(
    ctx: &ExecutionContext,
    registry: &ActionRegistry,
    group_name: &str,
    step: &crate::core::types::Step,
    progress: &mut dyn ProgressSink,
) -> StepRecord {
    debug!(group = %group_name, step = %step.step_name, action = %step.action, "step started");
    progress.post(RunEvent::StepStarted {
        group: group_name.to_string(),
        step: step.step_name.clone(),
        action: step.action.clone(),
    });

    let started = Instant::now();
    let step_ctx = StepContext {
        env: ctx,
        group: group_name,
        step: &step.step_name,
    };

    let result = match registry.resolve(&step.action) {
        Ok(executor) => match executor.execute(&step_ctx, &step.options).await {
            Ok(result) => result,
            Err(e) => StepResult::error(
                EngineError::StepFailed {
                    group: group_name.to_string(),
                    step: step.step_name.clone(),
                    action: step.action.clone(),
                    detail: e.to_string(),
                }
                .to_string(),
            ),
        },
        Err(e) => StepResult::error(e.to_string()),
    };

    let duration_seconds = started.elapsed().as_secs_f64();

    match result.outcome {
        StepOutcome::Error => {
            progress.post(RunEvent::StepFailed {
                group: group_name.to_string(),
                step: step.step_name.clone(),
                action: step.action.clone(),
                error: result.message.clone(),
                duration_seconds,
            });
        }
        outcome => {
            progress.post(RunEvent::StepSucceeded {
                group: group_name.to_string(),
                step: step.step_name.clone(),
                outcome,
                message: result.message.clone(),
                duration_seconds,
            });
        }
    }

    StepRecord {
        group: group_name.to_string(),
        step: step.step_name.clone(),
        action: step.action.clone(),
        result,
        duration_seconds,
    }
}

/// Emergency stop: freeze the status timer and produce a fatal error.
///
/// Bypasses the halt policy entirely. An empty message is replaced with a
/// generic unknown-failure text so the error always says something.
pub fn kill_execution(status: &mut RunStatus, message: &str) -> EngineError {
    status.stop_timer();
    let message = if message.is_empty() {
        "an unknown fatal error halted execution".to_string()
    } else {
        message.to_string()
    };
    EngineError::Fatal { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compiler::compile;
    use crate::core::parser::{tests::demo_recipe, validate_recipe};
    use crate::core::registry::tests::{test_context, FixedExecutor};
    use crate::core::registry::ActionExecutor;
    use crate::core::types::{Recipe, RunOutcome, Step, StepGroup};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Sink that keeps every event for inspection.
    struct RecordingSink(Vec<RunEvent>);

    impl ProgressSink for RecordingSink {
        fn post(&mut self, event: RunEvent) {
            self.0.push(event);
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl ActionExecutor for FailingExecutor {
        async fn execute(
            &self,
            _ctx: &StepContext<'_>,
            _options: &serde_json::Value,
        ) -> crate::core::errors::Result<StepResult> {
            Ok(StepResult::error("deliberate failure"))
        }
    }

    fn step(name: &str, action: &str) -> Step {
        Step {
            step_name: name.to_string(),
            description: String::new(),
            action: action.to_string(),
            options: serde_json::Value::Null,
            on_success: None,
            on_error: None,
        }
    }

    fn recipe_with_steps(steps: Vec<Step>, halt_on_error: bool) -> Recipe {
        let mut recipe = demo_recipe();
        recipe.options.halt_on_error = halt_on_error;
        recipe.step_groups = vec![StepGroup {
            group_name: "Main".to_string(),
            alias: "main".to_string(),
            description: "main steps".to_string(),
            steps,
        }];
        recipe
    }

    fn demo_registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new("demo-deployment");
        registry.register("ok", Arc::new(FixedExecutor(StepResult::success("fine"))));
        registry.register("warn", Arc::new(FixedExecutor(StepResult::warning("meh"))));
        registry.register("fail", Arc::new(FailingExecutor));
        registry
    }

    async fn run(recipe: Recipe) -> (RunSummary, Vec<RunEvent>) {
        let plan = compile(&validate_recipe(recipe).unwrap()).unwrap();
        let ctx = test_context();
        let registry = demo_registry();
        let mut status = RunStatus::new();
        let mut sink = RecordingSink(Vec::new());
        let summary = execute_plan(&plan, &ctx, &registry, &mut status, &mut sink).await;
        (summary, sink.0)
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let recipe = recipe_with_steps(vec![step("s1", "ok"), step("s2", "ok")], true);
        let (summary, events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Success);
        assert!(!summary.halted);
        assert_eq!(summary.steps_succeeded, 2);
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(RunEvent::RunCompleted { .. })));
    }

    #[tokio::test]
    async fn test_halt_on_error_abandons_remaining_steps() {
        let recipe = recipe_with_steps(
            vec![step("s1", "ok"), step("s2", "fail"), step("s3", "ok")],
            true,
        );
        let (summary, events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Error);
        assert!(summary.halted);
        // s3 never started: two records only.
        assert_eq!(summary.records.len(), 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::GroupAborted { .. })));
        assert!(matches!(events.last(), Some(RunEvent::RunAborted { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunEvent::StepStarted { step, .. } if step == "s3")));
    }

    #[tokio::test]
    async fn test_continue_on_error_runs_everything() {
        let recipe = recipe_with_steps(
            vec![step("s1", "ok"), step("s2", "fail"), step("s3", "ok")],
            false,
        );
        let (summary, _events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Error);
        assert!(!summary.halted);
        assert_eq!(summary.records.len(), 3);
        assert_eq!(summary.steps_succeeded, 2);
        assert_eq!(summary.steps_failed, 1);
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_step_failure() {
        let recipe = recipe_with_steps(vec![step("s1", "no-such-action")], true);
        let (summary, events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Error);
        assert!(summary.halted);
        let failed = events.iter().find_map(|e| match e {
            RunEvent::StepFailed { error, .. } => Some(error.clone()),
            _ => None,
        });
        let error = failed.expect("expected a step_failed event");
        assert!(error.contains("no-such-action"));
        assert!(error.contains("demo-deployment"));
    }

    #[tokio::test]
    async fn test_skip_filtered_two_group_run_halts_on_second_group() {
        // A(s1 ok, s2 skipped by action), B(s3 fails), halt on error.
        let mut recipe = demo_recipe();
        recipe.options.skip_actions = vec!["skipme".to_string()];
        recipe.step_groups = vec![
            StepGroup {
                group_name: "A".to_string(),
                alias: "a".to_string(),
                description: "first".to_string(),
                steps: vec![step("s1", "ok"), step("s2", "skipme")],
            },
            StepGroup {
                group_name: "B".to_string(),
                alias: "b".to_string(),
                description: "second".to_string(),
                steps: vec![step("s3", "fail")],
            },
        ];

        let (summary, _events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Error);
        assert!(summary.halted);
        let names: Vec<_> = summary.records.iter().map(|r| r.step.as_str()).collect();
        assert_eq!(names, vec!["s1", "s3"]);
    }

    #[tokio::test]
    async fn test_warning_does_not_halt() {
        let recipe = recipe_with_steps(vec![step("s1", "warn"), step("s2", "ok")], true);
        let (summary, _events) = run(recipe).await;
        assert_eq!(summary.outcome, RunOutcome::Warning);
        assert!(!summary.halted);
        assert_eq!(summary.records.len(), 2);
    }

    #[tokio::test]
    async fn test_group_event_ordering() {
        let recipe = recipe_with_steps(vec![step("s1", "ok")], true);
        let (_summary, events) = run(recipe).await;
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                RunEvent::RunStarted { .. } => "run_started",
                RunEvent::GroupStarted { .. } => "group_started",
                RunEvent::StepStarted { .. } => "step_started",
                RunEvent::StepSucceeded { .. } => "step_succeeded",
                RunEvent::StepFailed { .. } => "step_failed",
                RunEvent::GroupCompleted { .. } => "group_completed",
                RunEvent::GroupAborted { .. } => "group_aborted",
                RunEvent::RunCompleted { .. } => "run_completed",
                RunEvent::RunAborted { .. } => "run_aborted",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "run_started",
                "group_started",
                "step_started",
                "step_succeeded",
                "group_completed",
                "run_completed"
            ]
        );
    }

    #[tokio::test]
    async fn test_state_written_by_one_step_is_read_by_the_next() {
        struct Stash;

        #[async_trait]
        impl ActionExecutor for Stash {
            async fn execute(
                &self,
                ctx: &StepContext<'_>,
                _options: &serde_json::Value,
            ) -> crate::core::errors::Result<StepResult> {
                ctx.env.set_state("session", serde_json::json!("abc-123"));
                Ok(StepResult::success("stashed"))
            }
        }

        struct Fetch;

        #[async_trait]
        impl ActionExecutor for Fetch {
            async fn execute(
                &self,
                ctx: &StepContext<'_>,
                _options: &serde_json::Value,
            ) -> crate::core::errors::Result<StepResult> {
                match ctx.env.get_state("session") {
                    Some(value) => Ok(StepResult::success(format!("got {value}"))),
                    None => Ok(StepResult::error("session missing from run state")),
                }
            }
        }

        let recipe = recipe_with_steps(vec![step("s1", "stash"), step("s2", "fetch")], true);
        let plan = compile(&validate_recipe(recipe).unwrap()).unwrap();
        let ctx = test_context();
        let mut registry = ActionRegistry::new("demo-deployment");
        registry.register("stash", Arc::new(Stash));
        registry.register("fetch", Arc::new(Fetch));

        let mut status = RunStatus::new();
        let summary = execute_plan(&plan, &ctx, &registry, &mut status, &mut NullSink).await;
        assert_eq!(summary.outcome, RunOutcome::Success);
        assert!(summary.records[1].result.message.contains("abc-123"));
        assert_eq!(ctx.get_state("session"), Some(serde_json::json!("abc-123")));
    }

    #[tokio::test]
    async fn test_caller_owned_status_carries_the_step_log() {
        let recipe = recipe_with_steps(vec![step("s1", "ok"), step("s2", "ok")], true);
        let plan = compile(&validate_recipe(recipe).unwrap()).unwrap();
        let ctx = test_context();
        let registry = demo_registry();

        let mut status = RunStatus::new();
        let summary = execute_plan(&plan, &ctx, &registry, &mut status, &mut NullSink).await;
        assert_eq!(status.records().len(), 2);
        assert_eq!(status.records()[0].step, "s1");
        assert_eq!(status.elapsed(), summary.total_duration);
    }

    #[test]
    fn test_kill_execution_stops_timer_and_is_fatal() {
        let mut status = RunStatus::new();
        status.start();
        let err = kill_execution(&mut status, "target unreachable");
        let frozen = status.elapsed();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(status.elapsed(), frozen);
        assert!(matches!(err, EngineError::Fatal { .. }));
        assert!(err.to_string().contains("target unreachable"));
    }

    #[test]
    fn test_kill_execution_empty_message_gets_generic_text() {
        let mut status = RunStatus::new();
        status.start();
        let err = kill_execution(&mut status, "");
        assert!(err.to_string().contains("unknown fatal error"));
    }
}
