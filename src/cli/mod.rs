//! CLI subcommands — init, validate, compile, run, actions.

use crate::actions::DemoEngine;
use crate::core::engine::{EngineSpec, RecipeEngine};
use crate::core::parser;
use crate::core::registry::ActionRegistry;
use crate::core::runtime::ProgressSink;
use crate::core::types::{ExecutionPlan, Recipe, RunEvent, RunOutcome, StepOutcome};
use crate::trace::eventlog::{generate_run_id, JsonlSink};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a starter recipe
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a recipe without executing anything
    Validate {
        /// Path to the recipe file
        #[arg(short, long, default_value = "recipe.json")]
        file: PathBuf,
    },

    /// Compile a recipe and show the execution plan
    Compile {
        /// Path to the recipe file
        #[arg(short, long, default_value = "recipe.json")]
        file: PathBuf,

        /// Skip a step group by alias (repeatable)
        #[arg(long = "skip-group")]
        skip_groups: Vec<String>,

        /// Skip every step with this action (repeatable)
        #[arg(long = "skip-action")]
        skip_actions: Vec<String>,
    },

    /// Execute a recipe against its first declared target
    Run {
        /// Path to the recipe file
        #[arg(short, long, default_value = "recipe.json")]
        file: PathBuf,

        /// State directory for run logs
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Skip a step group by alias (repeatable)
        #[arg(long = "skip-group")]
        skip_groups: Vec<String>,

        /// Skip every step with this action (repeatable)
        #[arg(long = "skip-action")]
        skip_actions: Vec<String>,

        /// Continue past failing steps regardless of the recipe's halt policy
        #[arg(long)]
        no_halt: bool,
    },

    /// List the actions the engine can dispatch
    Actions,
}

/// Dispatch a CLI command.
pub async fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Compile {
            file,
            skip_groups,
            skip_actions,
        } => cmd_compile(&file, &skip_groups, &skip_actions),
        Commands::Run {
            file,
            state_dir,
            skip_groups,
            skip_actions,
            no_halt,
        } => cmd_run(&file, &state_dir, &skip_groups, &skip_actions, no_halt).await,
        Commands::Actions => cmd_actions(),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let recipe_path = path.join("recipe.json");
    if recipe_path.exists() {
        return Err(format!("{} already exists", recipe_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let template = r#"{
  "recipe_name": "my-deployment",
  "recipe_type": "demo-deployment",
  "schema_version": "1.0",
  "description": "Managed by orquesta",
  "options": {
    "skip_groups": [],
    "skip_actions": [],
    "halt_on_error": true,
    "target_environments": [
      {
        "name": "Scratch",
        "alias": "scratch",
        "description": "Ephemeral development environment",
        "is_ephemeral": true,
        "ephemeral_def": "config/scratch-def.json"
      }
    ]
  },
  "step_groups": [
    {
      "group_name": "Prepare",
      "alias": "prepare",
      "description": "Workspace preparation",
      "steps": [
        {
          "step_name": "Hello",
          "action": "shell-command",
          "options": { "command": "echo hello from orquesta" }
        }
      ]
    }
  ],
  "handlers": []
}
"#;
    std::fs::write(&recipe_path, template)
        .map_err(|e| format!("cannot write {}: {}", recipe_path.display(), e))?;

    println!("Initialized orquesta project at {}", path.display());
    println!("  Created: {}", recipe_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let recipe = parser::load_recipe(file).map_err(|e| e.to_string())?;
    let step_count: usize = recipe.step_groups.iter().map(|g| g.steps.len()).sum();
    let validated = parser::validate_recipe(recipe).map_err(|e| e.to_string())?;

    println!(
        "OK: {} ({} groups, {} steps, {} targets)",
        validated.recipe_name,
        validated.step_groups.len(),
        step_count,
        validated.options.target_environments.len()
    );
    Ok(())
}

/// Load a recipe and fold CLI skip flags and halt override into its options.
fn load_with_overrides(
    file: &Path,
    skip_groups: &[String],
    skip_actions: &[String],
    no_halt: bool,
) -> Result<Recipe, String> {
    let mut recipe = parser::load_recipe(file).map_err(|e| e.to_string())?;
    for alias in skip_groups {
        if !recipe.options.skip_groups.contains(alias) {
            recipe.options.skip_groups.push(alias.clone());
        }
    }
    for action in skip_actions {
        if !recipe.options.skip_actions.contains(action) {
            recipe.options.skip_actions.push(action.clone());
        }
    }
    if no_halt {
        recipe.options.halt_on_error = false;
    }
    Ok(recipe)
}

fn cmd_compile(file: &Path, skip_groups: &[String], skip_actions: &[String]) -> Result<(), String> {
    let recipe = load_with_overrides(file, skip_groups, skip_actions, false)?;
    let project_path = file.parent().unwrap_or(Path::new(".")).to_path_buf();
    let spec = DemoEngine::new(project_path);
    let engine =
        RecipeEngine::compile(&spec, recipe, serde_json::Value::Null).map_err(|e| e.to_string())?;

    print_plan(engine.plan());
    Ok(())
}

/// Display a compiled plan to stdout.
fn print_plan(plan: &ExecutionPlan) {
    println!(
        "Plan for {} ({} groups):",
        plan.recipe_name,
        plan.groups.len()
    );
    println!();

    for group in &plan.groups {
        println!("{}:", group.group_name);
        for step in &group.steps {
            println!("  + {} [{}]", step.step_name, step.action);
        }
    }

    println!();
    println!(
        "Plan: {} steps to run, {} steps skipped, {} groups skipped. Halt on error: {}.",
        plan.total_steps,
        plan.skipped_steps,
        plan.skipped_groups,
        if plan.halt_on_error { "yes" } else { "no" }
    );
}

/// Progress sink that renders events to stdout.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn post(&mut self, event: RunEvent) {
        match event {
            RunEvent::RunStarted {
                recipe,
                target,
                total_steps,
            } => {
                println!("Running {} against '{}' ({} steps)", recipe, target, total_steps);
            }
            RunEvent::GroupStarted { group } => println!("{}:", group),
            RunEvent::StepStarted { .. } => {}
            RunEvent::StepSucceeded {
                step,
                outcome,
                message,
                duration_seconds,
                ..
            } => {
                let symbol = match outcome {
                    StepOutcome::Warning => "~",
                    _ => "+",
                };
                println!("  {} {} ({:.2}s) {}", symbol, step, duration_seconds, message);
            }
            RunEvent::StepFailed {
                step,
                error,
                duration_seconds,
                ..
            } => {
                println!("  ! {} ({:.2}s) {}", step, duration_seconds, error);
            }
            RunEvent::GroupCompleted { .. } => {}
            RunEvent::GroupAborted { group } => println!("  aborted remaining steps in {}", group),
            RunEvent::RunCompleted { .. } | RunEvent::RunAborted { .. } => {}
        }
    }
}

/// Fan events out to the console and the JSONL run log.
struct TeeSink {
    console: ConsoleSink,
    log: JsonlSink,
}

impl ProgressSink for TeeSink {
    fn post(&mut self, event: RunEvent) {
        self.console.post(event.clone());
        self.log.post(event);
    }
}

async fn cmd_run(
    file: &Path,
    state_dir: &Path,
    skip_groups: &[String],
    skip_actions: &[String],
    no_halt: bool,
) -> Result<(), String> {
    let recipe = load_with_overrides(file, skip_groups, skip_actions, no_halt)?;
    let project_path = file.parent().unwrap_or(Path::new(".")).to_path_buf();
    let spec = DemoEngine::new(project_path);
    let mut engine =
        RecipeEngine::compile(&spec, recipe, serde_json::Value::Null).map_err(|e| e.to_string())?;

    let run_id = generate_run_id();
    let log = JsonlSink::open(state_dir, &run_id)
        .map_err(|e| format!("cannot open run log in {}: {}", state_dir.display(), e))?;
    println!("Run ID: {} (log: {})", run_id, log.path().display());

    let mut sink = TeeSink {
        console: ConsoleSink,
        log,
    };
    let summary = engine.execute(&mut sink).await;

    println!();
    println!(
        "Run {}: {} succeeded, {} warned, {} failed ({:.1}s)",
        summary.outcome,
        summary.steps_succeeded,
        summary.steps_warned,
        summary.steps_failed,
        summary.total_duration.as_secs_f64()
    );

    if summary.outcome == RunOutcome::Error {
        return Err(format!("{} step(s) failed", summary.steps_failed));
    }
    Ok(())
}

fn cmd_actions() -> Result<(), String> {
    let spec = DemoEngine::new(".");
    let mut registry = ActionRegistry::new(spec.recipe_type());
    spec.initialize_action_map(&mut registry);

    println!("Actions for recipe_type '{}':", registry.recipe_type());
    for name in registry.action_names() {
        println!("  {}", name);
    }
    Ok(())
}
