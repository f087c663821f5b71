// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock compiler sessions and factories for deterministic testing.
//!
//! `MockCompiler` answers signature lookups from an in-memory table.
//! `MockCompilerFactory` hands out that session and counts creations and
//! teardowns so tests can assert the session lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rivet_core::{PluginError, TaskMetadata, TaskSignature};
use rivet_executor::{CompilerFactory, CompilerSession};

/// A compiler session backed by a fixed set of task signatures.
#[derive(Debug, Default, Clone)]
pub struct MockCompiler {
    tasks: HashMap<String, TaskSignature>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task signature.
    pub fn with_task(mut self, signature: TaskSignature) -> Self {
        self.tasks.insert(signature.name.clone(), signature);
        self
    }
}

#[async_trait]
impl CompilerSession for MockCompiler {
    async fn task_signature(&self, name: &str) -> Result<Option<TaskSignature>, PluginError> {
        Ok(self.tasks.get(name).cloned())
    }
}

/// A factory that hands out one shared [`MockCompiler`] and counts the
/// session lifecycle.
#[derive(Debug, Default)]
pub struct MockCompilerFactory {
    session: Arc<MockCompiler>,
    created: AtomicUsize,
    torn_down: AtomicUsize,
    fail_create: bool,
}

impl MockCompilerFactory {
    pub fn new(session: MockCompiler) -> Self {
        Self {
            session: Arc::new(session),
            ..Self::default()
        }
    }

    /// A factory whose `create` always fails.
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// Sessions created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Sessions torn down so far.
    pub fn torn_down(&self) -> usize {
        self.torn_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompilerFactory for MockCompilerFactory {
    async fn create(&self) -> Result<Arc<dyn CompilerSession>, PluginError> {
        if self.fail_create {
            return Err(PluginError::Compiler("mock compiler unavailable".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.clone())
    }

    fn teardown(&self, _session: &dyn CompilerSession) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }
}

/// Signature of `test::required`, which takes one required string
/// parameter `param`.
pub fn task_with_required_param() -> TaskSignature {
    let metadata: TaskMetadata = serde_json::from_value(serde_json::json!({
        "description": "Task with a required parameter",
        "parameters": { "param": { "type": "String" } }
    }))
    .expect("fixture metadata is valid");
    TaskSignature::new("test::required", metadata, "/mock/tasks/test/required")
}

/// Signature of `test::login`, whose `password` parameter is sensitive.
pub fn task_with_sensitive_param() -> TaskSignature {
    let metadata: TaskMetadata = serde_json::from_value(serde_json::json!({
        "parameters": {
            "user": { "type": "String" },
            "password": { "type": "String", "sensitive": true }
        }
    }))
    .expect("fixture metadata is valid");
    TaskSignature::new("test::login", metadata, "/mock/tasks/test/login")
}
