//! Local shell-command executor.

use crate::core::errors::{EngineError, Result};
use crate::core::registry::{ActionExecutor, StepContext};
use crate::core::types::StepResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Options accepted by the `shell-command` action.
#[derive(Debug, Deserialize)]
struct ShellOptions {
    command: String,
    #[serde(default)]
    cwd: Option<String>,
}

/// Runs a command through `bash` and maps the exit status to a step result.
///
/// Uses bash (not sh/dash) so recipe commands can rely on `set -o pipefail`.
pub struct ShellCommand;

#[async_trait]
impl ActionExecutor for ShellCommand {
    async fn execute(
        &self,
        ctx: &StepContext<'_>,
        options: &serde_json::Value,
    ) -> Result<StepResult> {
        let opts: ShellOptions = serde_json::from_value(options.clone()).map_err(|e| {
            EngineError::invalid(format!(
                "step '{}': shell-command options: {e}",
                ctx.step
            ))
        })?;

        let mut cmd = Command::new("bash");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref cwd) = opts.cwd {
            cmd.current_dir(cwd);
        } else {
            cmd.current_dir(&ctx.env.project_path);
        }

        let mut child = cmd.spawn().map_err(|e| EngineError::StepFailed {
            group: ctx.group.to_string(),
            step: ctx.step.to_string(),
            action: "shell-command".to_string(),
            detail: format!("failed to spawn bash: {e}"),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(opts.command.as_bytes())
                .await
                .map_err(|e| EngineError::StepFailed {
                    group: ctx.group.to_string(),
                    step: ctx.step.to_string(),
                    action: "shell-command".to_string(),
                    detail: format!("stdin write error: {e}"),
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EngineError::StepFailed {
                group: ctx.group.to_string(),
                step: ctx.step.to_string(),
                action: "shell-command".to_string(),
                detail: format!("wait error: {e}"),
            })?;

        // Killed by signal has no exit code; -1 marks that case.
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let data = serde_json::json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        });

        if output.status.success() {
            Ok(StepResult::success("command succeeded").with_data(data))
        } else {
            let mut message = format!("command exited with code {exit_code}");
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                message.push_str(": ");
                message.push_str(trimmed);
            }
            Ok(StepResult::error(message).with_data(data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::tests::test_context;
    use crate::core::types::StepOutcome;

    async fn run_shell(options: serde_json::Value) -> Result<StepResult> {
        let env = test_context();
        let ctx = StepContext {
            env: &env,
            group: "Main",
            step: "shell step",
        };
        ShellCommand.execute(&ctx, &options).await
    }

    #[tokio::test]
    async fn test_shell_echo() {
        let result = run_shell(serde_json::json!({ "command": "echo hello" }))
            .await
            .unwrap();
        assert_eq!(result.outcome, StepOutcome::Success);
        assert_eq!(result.data["stdout"].as_str().unwrap().trim(), "hello");
        assert_eq!(result.data["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_shell_nonzero_exit_is_error_result() {
        let result = run_shell(serde_json::json!({ "command": "echo boom >&2; exit 42" }))
            .await
            .unwrap();
        assert_eq!(result.outcome, StepOutcome::Error);
        assert!(result.message.contains("42"));
        assert!(result.message.contains("boom"));
        assert_eq!(result.data["exit_code"], 42);
    }

    #[tokio::test]
    async fn test_shell_pipefail_supported() {
        let result = run_shell(serde_json::json!({
            "command": "set -euo pipefail\nfalse | true"
        }))
        .await
        .unwrap();
        assert_eq!(result.outcome, StepOutcome::Error);
    }

    #[tokio::test]
    async fn test_shell_cwd_option() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_shell(serde_json::json!({
            "command": "pwd",
            "cwd": dir.path().to_str().unwrap(),
        }))
        .await
        .unwrap();
        assert_eq!(result.outcome, StepOutcome::Success);
        assert!(result.data["stdout"]
            .as_str()
            .unwrap()
            .contains(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_shell_missing_command_option() {
        let err = run_shell(serde_json::json!({ "cwd": "/tmp" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("shell-command options"));
    }
}
