// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock task transport for deterministic testing.
//!
//! Records every run (including which arguments arrived wrapped as
//! sensitive), returns canned values per task, and tracks the highest
//! number of runs in flight at once.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rivet_core::{PluginError, RunOptions, Target, Task, TaskArgs, TaskResult};
use rivet_executor::TaskTransport;
use serde_json::Value;

/// A single recorded task run.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub target: String,
    pub task: String,
    pub args: TaskArgs,
    pub options: RunOptions,
}

impl RecordedRun {
    /// Names of the arguments that arrived wrapped as sensitive.
    pub fn sensitive_args(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter(|(_, arg)| arg.is_sensitive())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

enum Canned {
    Value(Value),
    Failure(String),
}

/// A transport that never spawns anything.
///
/// Tasks without a canned response succeed with `{"value": <args>}` so a
/// resolve hook echoes its parameters back.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Canned>>,
    runs: Mutex<Vec<RecordedRun>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `task` with `value`.
    pub fn with_response(self, task: &str, value: Value) -> Self {
        self.lock_responses().insert(task.to_string(), Canned::Value(value));
        self
    }

    /// Report `task` as failed with `message`.
    pub fn with_failure(self, task: &str, message: &str) -> Self {
        self.lock_responses()
            .insert(task.to_string(), Canned::Failure(message.to_string()));
        self
    }

    /// Hold every run for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every run so far, in order.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().expect("runs lock poisoned").clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().expect("runs lock poisoned").len()
    }

    /// The highest number of runs observed in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canned>> {
        self.responses.lock().expect("responses lock poisoned")
    }
}

#[async_trait]
impl TaskTransport for MockTransport {
    async fn run_task(
        &self,
        target: &Target,
        task: &Task,
        args: &TaskArgs,
        options: &RunOptions,
    ) -> Result<TaskResult, PluginError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.runs.lock().expect("runs lock poisoned").push(RecordedRun {
            target: target.name.clone(),
            task: task.name.clone(),
            args: args.clone(),
            options: options.clone(),
        });
        tracing::debug!(task = %task.name, "mock transport run");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.lock_responses().get(&task.name) {
            Some(Canned::Value(value)) => TaskResult::success(&target.name, &task.name, value.clone()),
            Some(Canned::Failure(msg)) => TaskResult::failure(&target.name, &task.name, msg.as_str()),
            None => {
                let echoed = Value::Object(rivet_core::task::expose_args(args));
                TaskResult::success(&target.name, &task.name, serde_json::json!({ "value": echoed }))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }
}
