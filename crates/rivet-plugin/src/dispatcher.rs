// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hook dispatch: from `(plugin, hook)` to a callable [`Hook`].

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use rivet_core::{HookKind, HookSet, Location, Plugin, PluginError, PluginOptions};
use serde_json::Value;

use crate::registry::PluginRegistry;
use crate::telemetry::{MetricsReporter, UsageReporter};

/// Key in a `[plugin_hooks.<hook>]` table naming the plugin.
pub const HOOK_PLUGIN_KEY: &str = "plugin";

/// Resolves plugins and hands out hooks they support.
pub struct HookDispatcher {
    registry: PluginRegistry,
    reporter: Arc<dyn UsageReporter>,
    hook_defaults: BTreeMap<String, PluginOptions>,
}

impl HookDispatcher {
    /// Dispatcher reporting usage through [`MetricsReporter`], with no
    /// default hook configuration.
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            reporter: Arc::new(MetricsReporter),
            hook_defaults: BTreeMap::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn UsageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Default hook configuration, keyed by hook name, as found under
    /// `[plugin_hooks]`.
    pub fn with_hook_defaults(mut self, defaults: BTreeMap<String, PluginOptions>) -> Self {
        self.hook_defaults = defaults;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Get hook `kind` of plugin `name`.
    ///
    /// Fails with [`PluginError::UnknownPlugin`] when the name does not
    /// resolve and [`PluginError::UnsupportedHook`] when the plugin does not
    /// declare the hook. A usage event is reported only on success.
    pub async fn get_hook(&mut self, name: &str, kind: HookKind) -> Result<Hook, PluginError> {
        let plugin = self
            .registry
            .resolve(name)
            .await?
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))?;

        if !plugin.hooks().contains(kind) {
            return Err(PluginError::UnsupportedHook {
                plugin: name.to_string(),
                hook: kind,
            });
        }

        tracing::debug!(plugin = %name, hook = %kind, "dispatching hook");
        self.reporter.report_plugin_usage(name, kind);

        Ok(Hook {
            plugin,
            kind,
            defaults: PluginOptions::new(),
        })
    }

    /// Like [`get_hook`](Self::get_hook) with the hook given by name.
    pub async fn get_hook_by_name(&mut self, name: &str, hook: &str) -> Result<Hook, PluginError> {
        let kind = HookKind::from_str(hook).map_err(|_| {
            PluginError::Config(format!(
                "unknown hook '{hook}'; expected one of: {}",
                HookSet::all()
            ))
        })?;
        self.get_hook(name, kind).await
    }

    /// Hooks declared by plugin `name`.
    pub async fn plugin_hooks(&mut self, name: &str) -> Result<HookSet, PluginError> {
        self.registry
            .resolve(name)
            .await?
            .map(|p| p.hooks())
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))
    }

    /// Get hook `kind` of the plugin configured for it under
    /// `[plugin_hooks]`. The rest of the hook table is merged into the
    /// options of every call, without overriding keys the caller sets.
    pub async fn get_default_hook(&mut self, kind: HookKind) -> Result<Hook, PluginError> {
        let mut defaults = self
            .hook_defaults
            .get(&kind.to_string())
            .cloned()
            .ok_or_else(|| PluginError::Config(format!("no plugin configured for the '{kind}' hook")))?;

        let name = match defaults.remove(HOOK_PLUGIN_KEY) {
            Some(Value::String(name)) => name,
            _ => {
                return Err(PluginError::Config(format!(
                    "plugin_hooks.{kind}.{HOOK_PLUGIN_KEY} must name a plugin"
                )));
            }
        };

        let mut hook = self.get_hook(&name, kind).await?;
        hook.defaults = defaults;
        Ok(hook)
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("registry", &self.registry)
            .field("hook_defaults", &self.hook_defaults.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A hook bound to the plugin that implements it.
#[derive(Clone)]
pub struct Hook {
    plugin: Arc<dyn Plugin>,
    kind: HookKind,
    defaults: PluginOptions,
}

impl Hook {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// Invoke the hook. Failures are reported as execution errors of the
    /// plugin unless they already carry plugin context.
    pub async fn call(&self, opts: Value) -> Result<Value, PluginError> {
        let opts = self.with_defaults(opts)?;
        let plugin = self.plugin.as_ref();
        let result = match self.kind {
            HookKind::PuppetLibrary => plugin.puppet_library(opts).await,
            HookKind::ResolveReference => plugin.resolve_reference(opts).await,
            HookKind::ValidateResolveReference => plugin.validate_resolve_reference(opts).await,
            HookKind::SecretEncrypt => plugin.secret_encrypt(opts).await,
            HookKind::SecretDecrypt => plugin.secret_decrypt(opts).await,
            HookKind::SecretCreatekeys => plugin.secret_createkeys(opts).await,
        };
        result.map_err(|e| e.into_execution(plugin.name()))
    }

    /// Invoke the hook for configuration found at `location`.
    pub async fn call_at(&self, opts: Value, location: Location) -> Result<Value, PluginError> {
        self.call(opts).await.map_err(|e| e.with_location(location))
    }

    /// Fill in configured defaults for keys the caller left out. Defaults
    /// can only be merged into an options object.
    fn with_defaults(&self, opts: Value) -> Result<Value, PluginError> {
        if self.defaults.is_empty() {
            return Ok(opts);
        }
        let mut map = match opts {
            Value::Object(map) => map,
            Value::Null => PluginOptions::new(),
            other => {
                return Err(PluginError::Config(format!(
                    "'{}' hook of plugin '{}' has configured defaults and needs object options, got {other}",
                    self.kind,
                    self.plugin.name()
                )));
            }
        };
        for (key, value) in &self.defaults {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(Value::Object(map))
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("plugin", &self.plugin.name())
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rivet_executor::ExecutionContext;
    use serde_json::json;

    use super::*;
    use crate::registry::PluginConfigs;

    struct Secrets;

    #[async_trait]
    impl Plugin for Secrets {
        fn name(&self) -> &str {
            "secrets"
        }

        fn hooks(&self) -> HookSet {
            HookSet::from([HookKind::SecretEncrypt, HookKind::PuppetLibrary])
        }

        async fn secret_encrypt(&self, opts: Value) -> Result<Value, PluginError> {
            match opts["value"].as_str() {
                Some(v) => Ok(json!(format!("enc({v})"))),
                None => Err(PluginError::Config("missing value".into())),
            }
        }

        async fn puppet_library(&self, opts: Value) -> Result<Value, PluginError> {
            Ok(opts)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, HookKind)>>);

    impl UsageReporter for Recorder {
        fn report_plugin_usage(&self, plugin: &str, hook: HookKind) {
            self.0.lock().unwrap().push((plugin.to_string(), hook));
        }
    }

    fn dispatcher(reporter: Arc<Recorder>) -> HookDispatcher {
        let ctx = Arc::new(ExecutionContext::builder("/tmp/project").build());
        let mut registry = PluginRegistry::new(ctx, PluginConfigs::new());
        registry.register(Arc::new(Secrets));
        HookDispatcher::new(registry).with_reporter(reporter)
    }

    #[tokio::test]
    async fn supported_hook_is_callable_and_reported() {
        let reporter = Arc::new(Recorder::default());
        let mut dispatcher = dispatcher(reporter.clone());

        let hook = dispatcher.get_hook("secrets", HookKind::SecretEncrypt).await.unwrap();
        assert_eq!(hook.call(json!({"value": "x"})).await.unwrap(), "enc(x)");
        assert_eq!(
            *reporter.0.lock().unwrap(),
            vec![("secrets".to_string(), HookKind::SecretEncrypt)]
        );
    }

    #[tokio::test]
    async fn undeclared_hook_is_unsupported_and_not_reported() {
        let reporter = Arc::new(Recorder::default());
        let mut dispatcher = dispatcher(reporter.clone());

        let err = dispatcher
            .get_hook("secrets", HookKind::SecretDecrypt)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PluginError::UnsupportedHook { ref plugin, hook: HookKind::SecretDecrypt } if plugin == "secrets"
        ));
        assert!(reporter.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_plugin_is_reported_as_such() {
        let mut dispatcher = dispatcher(Arc::new(Recorder::default()));
        let err = dispatcher
            .get_hook("nonexistent", HookKind::ResolveReference)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(ref n) if n == "nonexistent"));
    }

    #[tokio::test]
    async fn hook_failures_become_execution_errors_with_location() {
        let mut dispatcher = dispatcher(Arc::new(Recorder::default()));
        let hook = dispatcher.get_hook("secrets", HookKind::SecretEncrypt).await.unwrap();
        let err = hook
            .call_at(json!({}), Location::new("inventory.json", "/vars/password"))
            .await
            .unwrap_err();
        match err {
            PluginError::Execution {
                plugin, location, ..
            } => {
                assert_eq!(plugin, "secrets");
                assert_eq!(location, Some(Location::new("inventory.json", "/vars/password")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn hook_names_are_parsed_at_the_boundary() {
        let mut dispatcher = dispatcher(Arc::new(Recorder::default()));
        assert!(dispatcher.get_hook_by_name("secrets", "secret_encrypt").await.is_ok());
        let err = dispatcher
            .get_hook_by_name("secrets", "secret_encrpyt")
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[tokio::test]
    async fn default_hook_merges_configured_options() {
        let mut table = PluginOptions::new();
        table.insert("plugin".into(), json!("secrets"));
        table.insert("version".into(), json!("7"));
        table.insert("collection".into(), json!("puppet7"));
        let mut defaults = BTreeMap::new();
        defaults.insert("puppet_library".to_string(), table);

        let mut dispatcher = dispatcher(Arc::new(Recorder::default())).with_hook_defaults(defaults);
        let hook = dispatcher.get_default_hook(HookKind::PuppetLibrary).await.unwrap();
        assert_eq!(hook.plugin_name(), "secrets");

        let out = hook.call(json!({"target": "web01", "version": "8"})).await.unwrap();
        assert_eq!(out, json!({"target": "web01", "version": "8", "collection": "puppet7"}));
    }

    #[tokio::test]
    async fn default_hook_rejects_non_object_options() {
        let mut table = PluginOptions::new();
        table.insert("plugin".into(), json!("secrets"));
        table.insert("collection".into(), json!("puppet7"));
        let mut defaults = BTreeMap::new();
        defaults.insert("puppet_library".to_string(), table);

        let mut dispatcher = dispatcher(Arc::new(Recorder::default())).with_hook_defaults(defaults);
        let hook = dispatcher.get_default_hook(HookKind::PuppetLibrary).await.unwrap();

        let err = hook.call(json!("web01")).await.unwrap_err();
        assert!(matches!(err, PluginError::Config(ref m) if m.contains("needs object options")));
        let out = hook.call(Value::Null).await.unwrap();
        assert_eq!(out, json!({"collection": "puppet7"}));
    }

    #[tokio::test]
    async fn default_hook_requires_configuration() {
        let mut dispatcher = dispatcher(Arc::new(Recorder::default()));
        let err = dispatcher
            .get_default_hook(HookKind::PuppetLibrary)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("puppet_library"));
    }
}
