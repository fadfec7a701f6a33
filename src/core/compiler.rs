//! Plan compiler — validated recipe to skip-filtered execution plan.
//!
//! Two-level walk: groups are dropped when their alias is skipped or no step
//! survives the action skip list; surviving groups have their steps filtered
//! in declared order. Membership tests are exact set containment.

use crate::core::errors::{EngineError, Result};
use crate::core::parser::ValidatedRecipe;
use crate::core::types::{ExecutionPlan, PlannedGroup, Step, StepGroup};
use tracing::debug;

/// Compile a validated recipe into an execution plan.
pub fn compile(recipe: &ValidatedRecipe) -> Result<ExecutionPlan> {
    let skip_groups = &recipe.options.skip_groups;
    let skip_actions = &recipe.options.skip_actions;

    let mut groups = Vec::new();
    let mut total_steps = 0u32;
    let mut skipped_steps = 0u32;
    let mut skipped_groups = 0u32;

    for group in &recipe.step_groups {
        if skip_groups.contains(&group.alias) {
            debug!(group = %group.group_name, "group skipped by alias");
            skipped_groups += 1;
            skipped_steps += group.steps.len() as u32;
            continue;
        }
        if !group_has_active_steps(group, skip_actions) {
            debug!(group = %group.group_name, "group has no active steps");
            skipped_groups += 1;
            skipped_steps += group.steps.len() as u32;
            continue;
        }

        let steps = compile_group_steps(group, skip_actions)?;
        skipped_steps += (group.steps.len() - steps.len()) as u32;
        total_steps += steps.len() as u32;
        groups.push(PlannedGroup {
            group_name: group.group_name.clone(),
            alias: group.alias.clone(),
            steps,
        });
    }

    debug!(
        recipe = %recipe.recipe_name,
        groups = groups.len(),
        total_steps,
        skipped_steps,
        skipped_groups,
        "plan compiled"
    );

    Ok(ExecutionPlan {
        recipe_name: recipe.recipe_name.clone(),
        recipe_type: recipe.recipe_type.clone(),
        halt_on_error: recipe.options.halt_on_error,
        groups,
        total_steps,
        skipped_steps,
        skipped_groups,
    })
}

/// True when at least one step's action survives the skip list.
fn group_has_active_steps(group: &StepGroup, skip_actions: &[String]) -> bool {
    group
        .steps
        .iter()
        .any(|step| !skip_actions.contains(&step.action))
}

/// Filter one group's steps against the action skip list.
///
/// An empty declared step list here is a structural inconsistency: the
/// caller only reaches this for groups that claimed active steps.
fn compile_group_steps(group: &StepGroup, skip_actions: &[String]) -> Result<Vec<Step>> {
    if group.steps.is_empty() {
        return Err(EngineError::NoSteps {
            group: group.group_name.clone(),
        });
    }

    Ok(group
        .steps
        .iter()
        .filter(|step| !skip_actions.contains(&step.action))
        .cloned()
        .collect())
}
