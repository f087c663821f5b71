// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin resolution and hook dispatch for Rivet.
//!
//! Provides the [`PluginRegistry`] (static, lazy, and module-discovered
//! plugins with failure memoization), the [`HookDispatcher`] that validates
//! a hook against a plugin's declared capabilities before handing it out,
//! reference resolution over configuration data, and the compiled-in
//! plugins listed by the [`catalog`].

pub mod builtin;
pub mod catalog;
pub mod discovery;
pub mod dispatcher;
pub mod manifest;
pub mod reference;
pub mod registry;
pub mod telemetry;

use std::sync::Arc;

use rivet_config::RivetConfig;
use rivet_core::PluginError;
use rivet_executor::ExecutionContext;

pub use catalog::{CatalogEntry, RegistrationMode, builtin_catalog};
pub use discovery::{ModuleDiscovery, ModulePlugin, ModulepathDiscovery};
pub use dispatcher::{Hook, HookDispatcher};
pub use manifest::{PluginManifest, parse_plugin_manifest};
pub use reference::{resolve_references, validate_references};
pub use registry::{PluginConfigs, PluginFactory, PluginRegistry};
pub use telemetry::{MetricsReporter, NoopReporter, UsageReporter};

/// Build the registry for a configured project: plugin options from
/// `[plugins]`, module discovery on the module path, and the compiled-in
/// plugins.
pub fn registry_from_config(config: &RivetConfig, ctx: Arc<ExecutionContext>) -> PluginRegistry {
    let mut registry = PluginRegistry::new(ctx, config.plugins.clone())
        .with_discovery(Arc::new(ModulepathDiscovery::from_config(config)));
    builtin::register_builtins(&mut registry);
    registry
}

/// Build a dispatcher for a configured project around
/// [`registry_from_config`], with `[plugin_hooks]` defaults and usage
/// reporting as `[telemetry]` says.
///
/// Every plugin with a `[plugins.<name>]` table is resolved up front, so a
/// misspelled or missing plugin fails here with
/// [`PluginError::UnknownPlugin`].
pub async fn dispatcher_from_config(
    config: &RivetConfig,
    ctx: Arc<ExecutionContext>,
) -> Result<HookDispatcher, PluginError> {
    let reporter: Arc<dyn UsageReporter> = if config.telemetry.enabled {
        Arc::new(MetricsReporter)
    } else {
        Arc::new(NoopReporter)
    };
    let mut registry = registry_from_config(config, ctx);
    registry.load_all_configured().await?;
    Ok(HookDispatcher::new(registry)
        .with_reporter(reporter)
        .with_hook_defaults(config.plugin_hooks.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path, extra: &str) -> RivetConfig {
        let toml = format!("[project]\nboltdir = \"{}\"\n{extra}", dir.display());
        rivet_config::load_and_validate_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn configured_plugins_are_resolved_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "[plugins.pkcs7]\nkey_file = \"keys/project.key\"\n");
        let ctx = Arc::new(ExecutionContext::from_config(&config));
        let dispatcher = dispatcher_from_config(&config, ctx).await.unwrap();
        assert!(dispatcher.registry().get("pkcs7").is_some());
    }

    #[tokio::test]
    async fn unknown_configured_plugin_fails_dispatcher_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "[plugins.vaultt]\nserver_url = \"https://vault\"\n");
        let ctx = Arc::new(ExecutionContext::from_config(&config));
        let err = dispatcher_from_config(&config, ctx).await.err().unwrap();
        assert!(matches!(err, PluginError::UnknownPlugin(ref name) if name == "vaultt"));
    }
}
