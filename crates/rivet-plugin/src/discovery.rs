// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of plugins shipped in content modules.
//!
//! A module `<entry>/<name>/` provides plugin `<name>` when it contains a
//! `plugin.toml`. Each declared hook is implemented by the module's task of
//! the same name (`<name>::resolve_reference`, ...) run on `localhost`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rivet_config::RivetConfig;
use rivet_core::{HookKind, HookSet, Plugin, PluginError, PluginOptions, RunOptions, TaskParams};
use rivet_executor::ExecutionContext;
use serde_json::Value;

use crate::manifest::{PluginManifest, parse_plugin_manifest};

/// File name of a module's plugin manifest.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Strategy for locating a plugin that was never registered.
#[async_trait]
pub trait ModuleDiscovery: Send + Sync {
    /// Build plugin `name` from installed content. Any error means the
    /// plugin is not available.
    async fn discover(
        &self,
        name: &str,
        ctx: Arc<ExecutionContext>,
        options: PluginOptions,
    ) -> Result<Arc<dyn Plugin>, PluginError>;
}

/// Discovers plugins on the module path.
#[derive(Debug, Clone)]
pub struct ModulepathDiscovery {
    modulepath: Vec<PathBuf>,
}

impl ModulepathDiscovery {
    pub fn new(modulepath: Vec<PathBuf>) -> Self {
        Self { modulepath }
    }

    pub fn from_config(config: &RivetConfig) -> Self {
        Self::new(config.modulepath())
    }

    /// Find and parse the manifest for `name`. The first module path entry
    /// containing the module wins.
    pub async fn find_manifest(&self, name: &str) -> Result<Option<PluginManifest>, PluginError> {
        if !is_module_name(name) {
            return Ok(None);
        }

        for entry in &self.modulepath {
            let path = entry.join(name).join(MANIFEST_FILE);
            if !tokio::fs::try_exists(&path).await? {
                continue;
            }

            let content = tokio::fs::read_to_string(&path).await?;
            let manifest = parse_plugin_manifest(&content).map_err(|e| PluginError::Load {
                plugin: name.to_string(),
                message: format!("{}: {e}", path.display()),
            })?;

            if manifest.name != name {
                return Err(PluginError::Load {
                    plugin: name.to_string(),
                    message: format!(
                        "{} declares plugin '{}'",
                        path.display(),
                        manifest.name
                    ),
                });
            }
            return Ok(Some(manifest));
        }

        Ok(None)
    }

    /// Every parseable plugin manifest on the module path, sorted by name.
    /// Shadowed and unparseable modules are skipped.
    pub async fn available(&self) -> Vec<PluginManifest> {
        let mut found: Vec<PluginManifest> = Vec::new();
        for entry in &self.modulepath {
            let Ok(mut dir) = tokio::fs::read_dir(entry).await else {
                continue;
            };
            while let Ok(Some(module)) = dir.next_entry().await {
                let Some(name) = module.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if found.iter().any(|m| m.name == name) {
                    continue;
                }
                match self.find_manifest(&name).await {
                    Ok(Some(manifest)) => found.push(manifest),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(plugin = %name, error = %e, "skipping module plugin"),
                }
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

#[async_trait]
impl ModuleDiscovery for ModulepathDiscovery {
    async fn discover(
        &self,
        name: &str,
        ctx: Arc<ExecutionContext>,
        options: PluginOptions,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        let manifest = self
            .find_manifest(name)
            .await?
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))?;

        tracing::debug!(plugin = %name, hooks = %manifest.hooks, "discovered module plugin");
        Ok(Arc::new(ModulePlugin::new(manifest, ctx, options)))
    }
}

fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// A plugin whose hooks are tasks in its module.
pub struct ModulePlugin {
    manifest: PluginManifest,
    ctx: Arc<ExecutionContext>,
    options: PluginOptions,
}

impl ModulePlugin {
    pub fn new(manifest: PluginManifest, ctx: Arc<ExecutionContext>, options: PluginOptions) -> Self {
        Self {
            manifest,
            ctx,
            options,
        }
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Run the task backing `kind`. Hook options become task parameters,
    /// with the plugin's configuration under `_config` and the project
    /// directory under `_boltdir`.
    async fn run_hook(&self, kind: HookKind, opts: Value) -> Result<Value, PluginError> {
        let name = self.manifest.name.as_str();
        if !self.manifest.hooks.contains(kind) {
            return Err(rivet_core::plugin::unsupported(name, kind));
        }

        let mut params: TaskParams = match opts {
            Value::Object(map) => map,
            Value::Null => TaskParams::new(),
            other => {
                return Err(PluginError::execution(
                    name,
                    format!("options for the '{kind}' hook must be an object, got {other}"),
                ));
            }
        };
        params.remove("_plugin");
        params.insert("_config".into(), Value::Object(self.options.clone()));
        params.insert(
            "_boltdir".into(),
            Value::String(self.ctx.boltdir_path().display().to_string()),
        );

        let task = format!("{name}::{kind}");
        let result = self
            .ctx
            .run_local_task(&task, params, RunOptions::default())
            .await?;

        if !result.ok() {
            return Err(PluginError::execution(
                name,
                result.error_message().unwrap_or("task failed without a message"),
            ));
        }

        match kind {
            HookKind::ResolveReference | HookKind::SecretEncrypt | HookKind::SecretDecrypt => result
                .value
                .get("value")
                .cloned()
                .ok_or_else(|| {
                    PluginError::execution(name, format!("task '{task}' did not return a 'value'"))
                }),
            HookKind::ValidateResolveReference => Ok(Value::Null),
            HookKind::PuppetLibrary | HookKind::SecretCreatekeys => Ok(result.value),
        }
    }
}

#[async_trait]
impl Plugin for ModulePlugin {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn hooks(&self) -> HookSet {
        self.manifest.hooks
    }

    async fn puppet_library(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::PuppetLibrary, opts).await
    }

    async fn resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::ResolveReference, opts).await
    }

    async fn validate_resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::ValidateResolveReference, opts).await
    }

    async fn secret_encrypt(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::SecretEncrypt, opts).await
    }

    async fn secret_decrypt(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::SecretDecrypt, opts).await
    }

    async fn secret_createkeys(&self, opts: Value) -> Result<Value, PluginError> {
        self.run_hook(HookKind::SecretCreatekeys, opts).await
    }
}

impl std::fmt::Debug for ModulePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModulePlugin")
            .field("manifest", &self.manifest)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}
