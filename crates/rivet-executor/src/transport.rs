// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local task transport: runs task executables as child processes.
//!
//! Parameters are delivered according to the task's input method: as a JSON
//! object on stdin, as `PT_<name>` environment variables, or both. Stdout is
//! parsed into the result value; a non-zero exit is a failed result, not an
//! error.

use std::process::Stdio;

use async_trait::async_trait;
use rivet_core::task::expose_args;
use rivet_core::{InputMethod, PluginError, RunOptions, Target, Task, TaskArgs, TaskResult};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::runner::TaskTransport;

/// Runs tasks on the local machine.
#[derive(Debug, Default, Clone)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskTransport for LocalTransport {
    async fn run_task(
        &self,
        target: &Target,
        task: &Task,
        args: &TaskArgs,
        options: &RunOptions,
    ) -> Result<TaskResult, PluginError> {
        if options.noop && !task.supports_noop {
            return Ok(TaskResult::failure(
                &target.name,
                &task.name,
                format!("task '{}' does not support noop", task.name),
            ));
        }

        let mut params = expose_args(args);
        params.insert("_task".into(), Value::String(task.name.clone()));
        if options.noop {
            params.insert("_noop".into(), Value::Bool(true));
        }

        let mut cmd = Command::new(&task.executable);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if matches!(task.input_method, InputMethod::Environment | InputMethod::Both) {
            // `_config` becomes `PT__config`, distinct from a `config` parameter.
            for (name, value) in &params {
                cmd.env(format!("PT_{name}"), env_value(value));
            }
        }

        let mut child = cmd.spawn().map_err(|e| PluginError::Transport {
            message: format!("failed to start {}: {e}", task.executable.display()),
            source: Some(Box::new(e)),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            if matches!(task.input_method, InputMethod::Stdin | InputMethod::Both) {
                let payload = serde_json::to_vec(&params).map_err(|e| PluginError::Transport {
                    message: format!("failed to encode parameters: {e}"),
                    source: Some(Box::new(e)),
                })?;
                if let Err(e) = stdin.write_all(&payload).await {
                    // A task that never reads stdin may exit before we finish.
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                }
            }
            // Closing stdin signals end of input.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = TaskResult::parse_output(&stdout);

        if output.status.success() {
            return Ok(TaskResult::success(&target.name, &task.name, value));
        }

        // Prefer an error the task reported itself.
        if value.get("_error").is_some() {
            return Ok(TaskResult {
                status: rivet_core::TaskStatus::Failure,
                ..TaskResult::success(&target.name, &task.name, value)
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Ok(TaskResult::failure(
            &target.name,
            &task.name,
            format!("task exited with {code}: {}", stderr.trim()),
        ))
    }
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
