// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `task` plugin: answers hooks by running a named task on `localhost`.
//!
//! Hook options name the task under `task` and its parameters under
//! `parameters`:
//!
//! ```json
//! { "_plugin": "task", "task": "vault::lookup", "parameters": { "path": "db/pass" } }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use rivet_core::plugin::required_str;
use rivet_core::{HookKind, HookSet, Plugin, PluginError, RunOptions, TaskParams, TaskResult};
use rivet_executor::ExecutionContext;
use serde_json::Value;

pub const NAME: &str = "task";

pub struct TaskPlugin {
    ctx: Arc<ExecutionContext>,
}

impl TaskPlugin {
    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }

    async fn run(&self, opts: &Value) -> Result<TaskResult, PluginError> {
        let (task, params) = task_and_params(opts)?;
        let result = self
            .ctx
            .run_local_task(task, params, RunOptions::default())
            .await?;
        if result.ok() {
            Ok(result)
        } else {
            Err(PluginError::execution(
                NAME,
                format!(
                    "task '{task}' failed: {}",
                    result.error_message().unwrap_or("no error message")
                ),
            ))
        }
    }
}

fn task_and_params(opts: &Value) -> Result<(&str, TaskParams), PluginError> {
    let task = required_str(opts, "task")?;
    let params = match opts.get("parameters") {
        None | Some(Value::Null) => TaskParams::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(PluginError::Config(format!(
                "'parameters' must be an object, got {other}"
            )));
        }
    };
    Ok((task, params))
}

#[async_trait]
impl Plugin for TaskPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn hooks(&self) -> HookSet {
        HookSet::from([
            HookKind::PuppetLibrary,
            HookKind::ResolveReference,
            HookKind::ValidateResolveReference,
        ])
    }

    async fn validate_resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        let (task, params) = task_and_params(&opts)?;
        self.ctx.validate_params(task, &params).await?;
        Ok(Value::Null)
    }

    async fn resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        let result = self.run(&opts).await?;
        result.value.get("value").cloned().ok_or_else(|| {
            PluginError::execution(
                NAME,
                format!("task '{}' did not return a 'value'", result.task),
            )
        })
    }

    async fn puppet_library(&self, opts: Value) -> Result<Value, PluginError> {
        if let Some(target) = opts.get("target").and_then(Value::as_str) {
            tracing::info!(plugin = NAME, target = %target, "installing runtime library");
        }
        Ok(self.run(&opts).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parameters_default_to_empty() {
        let input = json!({"task": "demo::lookup"});
        let (task, params) = task_and_params(&input).unwrap();
        assert_eq!(task, "demo::lookup");
        assert!(params.is_empty());
    }

    #[test]
    fn task_name_is_required() {
        let err = task_and_params(&json!({"parameters": {}})).unwrap_err();
        assert!(err.to_string().contains("'task'"));
    }

    #[test]
    fn parameters_must_be_an_object() {
        let err = task_and_params(&json!({"task": "demo", "parameters": [1]})).unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }
}
