//! Recipe loading and fail-fast validation.
//!
//! Validation checks the whole recipe before any external side effect and
//! stops at the first violation, naming the offending field. A recipe that
//! passes is wrapped in `ValidatedRecipe`; the compiler only accepts that
//! wrapper, so an unvalidated recipe cannot reach compilation.

use crate::core::errors::{EngineError, Result};
use crate::core::types::{HandlerRef, Recipe, Step, StepGroup, TargetEnvironment};
use std::ops::Deref;
use std::path::Path;

/// Read and parse a recipe file (JSON).
pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_recipe(&content)
}

/// Parse a recipe from a JSON string.
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    Ok(serde_json::from_str(content)?)
}

/// A recipe that has passed structural validation.
///
/// Only obtainable through [`validate_recipe`].
#[derive(Debug, Clone)]
pub struct ValidatedRecipe(Recipe);

impl ValidatedRecipe {
    pub fn into_inner(self) -> Recipe {
        self.0
    }
}

impl Deref for ValidatedRecipe {
    type Target = Recipe;

    fn deref(&self) -> &Recipe {
        &self.0
    }
}

/// Validate a recipe, fail-fast. Never mutates the recipe.
///
/// Typed fields (skip lists, halt flag) are already enforced by the parse;
/// this checks the semantic constraints the type system cannot express.
pub fn validate_recipe(recipe: Recipe) -> Result<ValidatedRecipe> {
    if recipe.recipe_name.is_empty() {
        return Err(EngineError::invalid("recipe_name must not be empty"));
    }
    if recipe.recipe_type.is_empty() {
        return Err(EngineError::invalid("recipe_type must not be empty"));
    }
    if recipe.schema_version.is_empty() {
        return Err(EngineError::invalid("schema_version must not be empty"));
    }

    if recipe.options.target_environments.is_empty() {
        return Err(EngineError::invalid(
            "options.target_environments must not be empty",
        ));
    }
    for target in &recipe.options.target_environments {
        validate_target_environment(target)?;
    }

    for group in &recipe.step_groups {
        validate_step_group(group)?;
    }

    for handler in &recipe.handlers {
        validate_handler(handler);
    }

    Ok(ValidatedRecipe(recipe))
}

fn validate_target_environment(target: &TargetEnvironment) -> Result<()> {
    if target.name.is_empty() {
        return Err(EngineError::invalid(
            "target_environments[].name must not be empty",
        ));
    }
    if target.alias.is_empty() {
        return Err(EngineError::invalid(format!(
            "target_environments['{}'].alias must not be empty",
            target.name
        )));
    }
    if target.description.is_empty() {
        return Err(EngineError::invalid(format!(
            "target_environments['{}'].description must not be empty",
            target.name
        )));
    }

    if target.is_ephemeral {
        match &target.ephemeral_def {
            Some(def) if !def.is_empty() => {}
            _ => {
                return Err(EngineError::invalid(format!(
                    "target_environments['{}'].ephemeral_def is required for an ephemeral target",
                    target.name
                )));
            }
        }
    } else {
        match &target.requirements_ref {
            Some(req) if !req.is_empty() => {}
            _ => {
                return Err(EngineError::invalid(format!(
                    "target_environments['{}'].requirements_ref is required for a persistent target",
                    target.name
                )));
            }
        }
    }

    Ok(())
}

fn validate_step_group(group: &StepGroup) -> Result<()> {
    if group.group_name.is_empty() {
        return Err(EngineError::invalid("step_groups[].group_name must not be empty"));
    }
    if group.alias.is_empty() {
        return Err(EngineError::invalid(format!(
            "step_groups['{}'].alias must not be empty",
            group.group_name
        )));
    }
    if group.description.is_empty() {
        return Err(EngineError::invalid(format!(
            "step_groups['{}'].description must not be empty",
            group.group_name
        )));
    }

    // Step-level validation is intentionally permissive; a step with an
    // unknown action surfaces at dispatch, not here.
    for step in &group.steps {
        validate_step(step);
    }

    Ok(())
}

fn validate_step(_step: &Step) {}

// Extension point. Handler references stay inert at this layer.
fn validate_handler(_handler: &HandlerRef) {}
