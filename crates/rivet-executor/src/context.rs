// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution context plugins use to run tasks.
//!
//! One context exists per run. It owns the compiler seam (an optional
//! ambient session plus a factory for temporary ones), the transport, and two
//! lazily built singletons: the degree-1 [`TaskRunner`] and the local
//! [`Inventory`] holding the synthetic `localhost` target.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rivet_config::RivetConfig;
use rivet_core::{
    Inventory, LOCALHOST, PluginError, RunOptions, Sensitive, Task, TaskArg, TaskArgs,
    TaskParams, TaskResult, TaskSignature,
};
use tokio::sync::OnceCell;

use crate::compiler::{CompilerFactory, CompilerSession, ModulepathCompiler, SessionGuard};
use crate::runner::{TaskRunner, TaskTransport};
use crate::transport::LocalTransport;

/// Shared services for plugin implementations.
pub struct ExecutionContext {
    boltdir: PathBuf,
    ambient: Option<Arc<dyn CompilerSession>>,
    factory: Arc<dyn CompilerFactory>,
    transport: Arc<dyn TaskTransport>,
    runner: OnceCell<TaskRunner>,
    inventory: OnceCell<Inventory>,
}

impl ExecutionContext {
    pub fn builder(boltdir: impl Into<PathBuf>) -> ExecutionContextBuilder {
        ExecutionContextBuilder::new(boltdir)
    }

    /// Context for a configured project: tasks come from the module path and
    /// run through the local transport.
    pub fn from_config(config: &RivetConfig) -> Self {
        Self::builder(&config.project.boltdir)
            .compiler_factory(Arc::new(ModulepathCompiler::new(config.modulepath())))
            .build()
    }

    /// Root directory of the project.
    pub fn boltdir_path(&self) -> &Path {
        &self.boltdir
    }

    pub fn has_ambient_compiler(&self) -> bool {
        self.ambient.is_some()
    }

    /// Run `body` with a compiler session.
    ///
    /// The ambient session is used when one was injected; otherwise a
    /// temporary session is created and torn down exactly once when `body`
    /// finishes, fails, panics, or is dropped.
    pub async fn with_compiler<T, F, Fut>(&self, body: F) -> Result<T, PluginError>
    where
        F: FnOnce(Arc<dyn CompilerSession>) -> Fut,
        Fut: Future<Output = Result<T, PluginError>>,
    {
        if let Some(session) = &self.ambient {
            return body(Arc::clone(session)).await;
        }

        let session = self.factory.create().await?;
        let _guard = SessionGuard::new(Arc::clone(&self.factory), Arc::clone(&session));
        body(session).await
    }

    /// Look up task `name`, checking `params` against its signature when
    /// given.
    pub async fn get_validated_task(
        &self,
        name: &str,
        params: Option<&TaskParams>,
    ) -> Result<Task, PluginError> {
        self.with_compiler(|session| async move {
            let signature = lookup(session.as_ref(), name, params).await?;
            Ok(signature.task())
        })
        .await
    }

    /// Check `params` against the signature of task `name`.
    pub async fn validate_params(&self, name: &str, params: &TaskParams) -> Result<(), PluginError> {
        self.with_compiler(|session| async move {
            lookup(session.as_ref(), name, Some(params)).await.map(|_| ())
        })
        .await
    }

    /// Run task `name` on `localhost`.
    ///
    /// Parameters the signature marks sensitive are wrapped before they
    /// reach the transport. Concurrent calls run one at a time.
    pub async fn run_local_task(
        &self,
        name: &str,
        params: TaskParams,
        options: RunOptions,
    ) -> Result<TaskResult, PluginError> {
        self.with_compiler(|session| async move {
            let signature = lookup(session.as_ref(), name, Some(&params)).await?;
            let args = wrap_sensitive(&signature, params);
            let task = signature.task();

            let inventory = self.inventory().await;
            let target = inventory
                .get_target(LOCALHOST)
                .ok_or_else(|| PluginError::Compiler("local inventory has no localhost target".into()))?;

            self.runner().await.run_task(target, &task, &args, &options).await
        })
        .await
    }

    /// The local inventory, built on first use.
    pub async fn inventory(&self) -> &Inventory {
        self.inventory
            .get_or_init(|| async {
                tracing::debug!("building local inventory");
                Inventory::local()
            })
            .await
    }

    async fn runner(&self) -> &TaskRunner {
        self.runner
            .get_or_init(|| async { TaskRunner::new(Arc::clone(&self.transport)) })
            .await
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("boltdir", &self.boltdir)
            .field("ambient_compiler", &self.ambient.is_some())
            .field("runner_initialized", &self.runner.initialized())
            .field("inventory_initialized", &self.inventory.initialized())
            .finish()
    }
}

async fn lookup(
    session: &dyn CompilerSession,
    name: &str,
    params: Option<&TaskParams>,
) -> Result<TaskSignature, PluginError> {
    let signature = session
        .task_signature(name)
        .await?
        .ok_or_else(|| PluginError::UnknownTask(name.to_string()))?;

    if let Some(params) = params {
        signature
            .validate(params)
            .map_err(|errors| PluginError::InvalidParameters {
                task: name.to_string(),
                errors,
            })?;
    }
    Ok(signature)
}

fn wrap_sensitive(signature: &TaskSignature, params: TaskParams) -> TaskArgs {
    let sensitive: HashSet<&str> = signature.sensitive_params().collect();
    params
        .into_iter()
        .map(|(key, value)| {
            let arg = if sensitive.contains(key.as_str()) {
                TaskArg::Sensitive(Sensitive::new(value))
            } else {
                TaskArg::Plain(value)
            };
            (key, arg)
        })
        .collect()
}

/// Builder for [`ExecutionContext`].
///
/// Defaults: tasks are looked up under `<boltdir>/modules` and run through
/// [`LocalTransport`]; no ambient compiler session.
pub struct ExecutionContextBuilder {
    boltdir: PathBuf,
    ambient: Option<Arc<dyn CompilerSession>>,
    factory: Option<Arc<dyn CompilerFactory>>,
    transport: Option<Arc<dyn TaskTransport>>,
}

impl ExecutionContextBuilder {
    fn new(boltdir: impl Into<PathBuf>) -> Self {
        Self {
            boltdir: boltdir.into(),
            ambient: None,
            factory: None,
            transport: None,
        }
    }

    /// Use `session` for every compiler call instead of temporary sessions.
    pub fn ambient_compiler(mut self, session: Arc<dyn CompilerSession>) -> Self {
        self.ambient = Some(session);
        self
    }

    pub fn compiler_factory(mut self, factory: Arc<dyn CompilerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn TaskTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ExecutionContext {
        let factory = self.factory.unwrap_or_else(|| {
            Arc::new(ModulepathCompiler::new(vec![self.boltdir.join("modules")]))
        });
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(LocalTransport::new()));

        ExecutionContext {
            boltdir: self.boltdir,
            ambient: self.ambient,
            factory,
            transport,
            runner: OnceCell::new(),
            inventory: OnceCell::new(),
        }
    }
}
