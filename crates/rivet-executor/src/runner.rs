// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task execution with a concurrency degree of one.

use std::sync::Arc;

use async_trait::async_trait;
use rivet_core::{PluginError, RunOptions, Target, Task, TaskArgs, TaskResult};
use tokio::sync::Semaphore;

/// Executes a task on a target. The execution engine proper lives behind
/// this trait.
#[async_trait]
pub trait TaskTransport: Send + Sync {
    async fn run_task(
        &self,
        target: &Target,
        task: &Task,
        args: &TaskArgs,
        options: &RunOptions,
    ) -> Result<TaskResult, PluginError>;
}

/// Runs tasks through a transport one at a time.
///
/// Callers that arrive while a task is running wait for the permit. Dropping
/// a waiting or running future releases its place.
pub struct TaskRunner {
    transport: Arc<dyn TaskTransport>,
    permits: Semaphore,
}

impl TaskRunner {
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self {
            transport,
            permits: Semaphore::new(1),
        }
    }

    pub async fn run_task(
        &self,
        target: &Target,
        task: &Task,
        args: &TaskArgs,
        options: &RunOptions,
    ) -> Result<TaskResult, PluginError> {
        let _permit = self.permits.acquire().await.map_err(|e| PluginError::Transport {
            message: "task runner is closed".to_string(),
            source: Some(Box::new(e)),
        })?;

        tracing::debug!(task = %task.name, target = %target.name, noop = options.noop, "running task");
        let result = self.transport.run_task(target, task, args, options).await?;
        if !result.ok() {
            tracing::debug!(
                task = %task.name,
                error = result.error_message().unwrap_or("unknown error"),
                "task failed"
            );
        }
        Ok(result)
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}
