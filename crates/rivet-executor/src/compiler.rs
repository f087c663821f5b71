// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiler sessions: the seam through which task signatures are looked up.
//!
//! A [`CompilerSession`] answers "what does task `X` look like?". Sessions are
//! either ambient (owned by the host, shared for the whole run) or temporary
//! (created by a [`CompilerFactory`] for one call and torn down afterwards).
//! [`SessionGuard`] ties the teardown of a temporary session to `Drop`, so it
//! happens exactly once whether the body returns, fails, panics, or is
//! cancelled.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rivet_core::{PluginError, TaskMetadata, TaskSignature};

/// An active compiler/evaluation context.
#[async_trait]
pub trait CompilerSession: Send + Sync {
    /// Look up the signature of task `name`. `Ok(None)` when no such task is
    /// visible to this session.
    async fn task_signature(&self, name: &str) -> Result<Option<TaskSignature>, PluginError>;
}

/// Creates and tears down temporary compiler sessions.
#[async_trait]
pub trait CompilerFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn CompilerSession>, PluginError>;

    /// Release a session created by [`create`](CompilerFactory::create).
    /// Called exactly once per created session, possibly from `Drop`.
    fn teardown(&self, session: &dyn CompilerSession);
}

/// Tears down a temporary session when dropped.
pub struct SessionGuard {
    factory: Arc<dyn CompilerFactory>,
    session: Option<Arc<dyn CompilerSession>>,
}

impl SessionGuard {
    pub fn new(factory: Arc<dyn CompilerFactory>, session: Arc<dyn CompilerSession>) -> Self {
        Self {
            factory,
            session: Some(session),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!("tearing down temporary compiler session");
            self.factory.teardown(session.as_ref());
        }
    }
}

/// Compiler backed by task metadata files on the module path.
///
/// Task `mod::name` is described by `<entry>/mod/tasks/name.json` with the
/// executable alongside it (`tasks/name`, `tasks/name.sh`, ...). A bare
/// module name refers to the module's `init` task. The first module path
/// entry containing the module wins.
#[derive(Debug, Clone)]
pub struct ModulepathCompiler {
    modulepath: Vec<PathBuf>,
}

impl ModulepathCompiler {
    pub fn new(modulepath: Vec<PathBuf>) -> Self {
        Self { modulepath }
    }

    pub fn modulepath(&self) -> &[PathBuf] {
        &self.modulepath
    }
}

#[async_trait]
impl CompilerFactory for ModulepathCompiler {
    async fn create(&self) -> Result<Arc<dyn CompilerSession>, PluginError> {
        tracing::debug!(entries = self.modulepath.len(), "creating modulepath compiler session");
        Ok(Arc::new(self.clone()))
    }

    fn teardown(&self, _session: &dyn CompilerSession) {}
}

#[async_trait]
impl CompilerSession for ModulepathCompiler {
    async fn task_signature(&self, name: &str) -> Result<Option<TaskSignature>, PluginError> {
        let Some((module, task)) = split_task_name(name) else {
            return Ok(None);
        };

        for entry in &self.modulepath {
            let tasks_dir = entry.join(module).join("tasks");
            let metadata_path = tasks_dir.join(format!("{task}.json"));
            if !tokio::fs::try_exists(&metadata_path).await? {
                continue;
            }

            let raw = tokio::fs::read_to_string(&metadata_path).await?;
            let metadata: TaskMetadata = serde_json::from_str(&raw).map_err(|e| {
                PluginError::Compiler(format!(
                    "invalid task metadata {}: {e}",
                    metadata_path.display()
                ))
            })?;

            let executable = find_executable(&tasks_dir, task).await?.ok_or_else(|| {
                PluginError::Compiler(format!(
                    "task '{name}' has metadata but no executable in {}",
                    tasks_dir.display()
                ))
            })?;

            return Ok(Some(TaskSignature::new(name, metadata, executable)));
        }

        Ok(None)
    }
}

/// Split `mod::task` into its parts; a bare module name means `init`.
fn split_task_name(name: &str) -> Option<(&str, &str)> {
    let (module, task) = match name.split_once("::") {
        Some((m, t)) => (m, t),
        None => (name, "init"),
    };
    (is_segment(module) && is_segment(task)).then_some((module, task))
}

fn is_segment(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

async fn find_executable(dir: &Path, task: &str) -> Result<Option<PathBuf>, PluginError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(task);
        let is_metadata = path.extension().and_then(|e| e.to_str()) == Some("json");
        if stem_matches && !is_metadata && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }
    // Directory order is unspecified.
    found.sort();
    Ok(found.into_iter().next())
}
