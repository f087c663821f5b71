// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry with lazy construction and module discovery.
//!
//! A name resolves, in order, to: a registered plugin; the result of its
//! lazy factory; nothing, if module discovery already failed for it; or
//! whatever module discovery finds. Discovery failures are remembered so a
//! missing plugin costs one discovery attempt per run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rivet_core::{Plugin, PluginError, PluginOptions};
use rivet_executor::ExecutionContext;

use crate::discovery::ModuleDiscovery;

/// Plugin options for every configured plugin, keyed by plugin name.
pub type PluginConfigs = BTreeMap<String, PluginOptions>;

/// Builds a plugin from the execution context and its options.
///
/// Implemented for any `Fn(Arc<ExecutionContext>, PluginOptions) ->
/// Result<Arc<dyn Plugin>, PluginError>`.
pub trait PluginFactory: Send + Sync {
    fn create(
        &self,
        ctx: Arc<ExecutionContext>,
        options: PluginOptions,
    ) -> Result<Arc<dyn Plugin>, PluginError>;
}

impl<F> PluginFactory for F
where
    F: Fn(Arc<ExecutionContext>, PluginOptions) -> Result<Arc<dyn Plugin>, PluginError>
        + Send
        + Sync,
{
    fn create(
        &self,
        ctx: Arc<ExecutionContext>,
        options: PluginOptions,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        self(ctx, options)
    }
}

/// Registry of plugins for one run.
pub struct PluginRegistry {
    ctx: Arc<ExecutionContext>,
    configs: PluginConfigs,
    plugins: HashMap<String, Arc<dyn Plugin>>,
    lazy: HashMap<String, Box<dyn PluginFactory>>,
    unknown: HashSet<String>,
    discovery: Option<Arc<dyn ModuleDiscovery>>,
}

impl PluginRegistry {
    /// Create an empty registry with no module discovery.
    pub fn new(ctx: Arc<ExecutionContext>, configs: PluginConfigs) -> Self {
        Self {
            ctx,
            configs,
            plugins: HashMap::new(),
            lazy: HashMap::new(),
            unknown: HashSet::new(),
            discovery: None,
        }
    }

    /// Use `discovery` for names that were never registered.
    pub fn with_discovery(mut self, discovery: Arc<dyn ModuleDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Register a constructed plugin under its own name. Replaces any
    /// earlier registration and forgets a previous discovery failure.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();
        tracing::debug!(plugin = %name, hooks = %plugin.hooks(), "registering plugin");
        self.lazy.remove(&name);
        self.unknown.remove(&name);
        self.plugins.insert(name, plugin);
    }

    /// Register a factory that builds `name` on first resolution.
    pub fn register_lazy(&mut self, name: impl Into<String>, factory: impl PluginFactory + 'static) {
        let name = name.into();
        tracing::debug!(plugin = %name, "registering lazy plugin");
        self.plugins.remove(&name);
        self.unknown.remove(&name);
        self.lazy.insert(name, Box::new(factory));
    }

    /// Build `name` through module discovery and register it.
    ///
    /// Any discovery failure is reported as [`PluginError::UnknownPlugin`].
    pub async fn register_from_module(&mut self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        let Some(discovery) = self.discovery.clone() else {
            tracing::debug!(plugin = %name, "no module discovery configured");
            return Err(PluginError::UnknownPlugin(name.to_string()));
        };

        match discovery
            .discover(name, Arc::clone(&self.ctx), self.options(name))
            .await
        {
            Ok(plugin) => {
                if plugin.name() != name {
                    tracing::warn!(
                        plugin = %name,
                        actual = %plugin.name(),
                        "discovered plugin reports a different name"
                    );
                }
                tracing::debug!(plugin = %name, "registering discovered plugin");
                self.unknown.remove(name);
                self.plugins.insert(name.to_string(), Arc::clone(&plugin));
                Ok(plugin)
            }
            Err(PluginError::UnknownPlugin(_)) => {
                tracing::debug!(plugin = %name, "no module provides plugin");
                Err(PluginError::UnknownPlugin(name.to_string()))
            }
            Err(e) => {
                tracing::warn!(plugin = %name, error = %e, "module discovery failed");
                Err(PluginError::UnknownPlugin(name.to_string()))
            }
        }
    }

    /// Resolve `name` to a plugin.
    ///
    /// `Ok(None)` means no plugin by that name exists. Errors come only from
    /// a lazy factory failing to construct its plugin; the factory is kept
    /// so a later resolution reports the same failure.
    pub async fn resolve(&mut self, name: &str) -> Result<Option<Arc<dyn Plugin>>, PluginError> {
        if let Some(plugin) = self.plugins.get(name) {
            return Ok(Some(Arc::clone(plugin)));
        }

        if let Some(factory) = self.lazy.remove(name) {
            return match factory.create(Arc::clone(&self.ctx), self.options(name)) {
                Ok(plugin) => {
                    tracing::debug!(plugin = %name, "constructed lazy plugin");
                    self.plugins.insert(name.to_string(), Arc::clone(&plugin));
                    Ok(Some(plugin))
                }
                Err(e) => {
                    self.lazy.insert(name.to_string(), factory);
                    Err(e)
                }
            };
        }

        if self.unknown.contains(name) {
            return Ok(None);
        }

        match self.register_from_module(name).await {
            Ok(plugin) => Ok(Some(plugin)),
            Err(_) => {
                self.unknown.insert(name.to_string());
                Ok(None)
            }
        }
    }

    /// Resolve every plugin named in the configuration.
    pub async fn load_all_configured(&mut self) -> Result<(), PluginError> {
        let names: Vec<String> = self.configs.keys().cloned().collect();
        for name in names {
            if self.resolve(&name).await?.is_none() {
                return Err(PluginError::UnknownPlugin(name));
            }
        }
        Ok(())
    }

    /// A constructed plugin, without construction or discovery.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    /// Whether `name` is registered, constructed or lazily.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name) || self.lazy.contains_key(name)
    }

    /// Whether module discovery already failed for `name`.
    pub fn is_known_missing(&self, name: &str) -> bool {
        self.unknown.contains(name)
    }

    /// Names of registered plugins, constructed or lazy, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .keys()
            .chain(self.lazy.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len() + self.lazy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.lazy.is_empty()
    }

    /// Options configured for `name`, empty when it has none.
    pub fn options(&self, name: &str) -> PluginOptions {
        self.configs.get(name).cloned().unwrap_or_default()
    }

    pub fn configs(&self) -> &PluginConfigs {
        &self.configs
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.ctx
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("lazy", &self.lazy.keys().collect::<Vec<_>>())
            .field("unknown", &self.unknown)
            .field("discovery", &self.discovery.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rivet_core::{HookKind, HookSet};
    use serde_json::Value;
    use tracing_test::traced_test;

    use super::*;

    struct Named(&'static str, Option<String>);

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn hooks(&self) -> HookSet {
            HookSet::from([HookKind::ResolveReference])
        }

        async fn resolve_reference(&self, _opts: Value) -> Result<Value, PluginError> {
            Ok(Value::from(self.1.clone()))
        }
    }

    #[derive(Default)]
    struct Counting {
        attempts: AtomicUsize,
        provides: Option<&'static str>,
    }

    #[async_trait]
    impl ModuleDiscovery for Counting {
        async fn discover(
            &self,
            name: &str,
            _ctx: Arc<ExecutionContext>,
            _options: PluginOptions,
        ) -> Result<Arc<dyn Plugin>, PluginError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.provides {
                Some(p) if p == name => Ok(Arc::new(Named(p, Some("module".into())))),
                _ => Err(PluginError::UnknownPlugin(name.to_string())),
            }
        }
    }

    struct Broken;

    #[async_trait]
    impl ModuleDiscovery for Broken {
        async fn discover(
            &self,
            name: &str,
            _ctx: Arc<ExecutionContext>,
            _options: PluginOptions,
        ) -> Result<Arc<dyn Plugin>, PluginError> {
            Err(PluginError::Load {
                plugin: name.to_string(),
                message: "manifest is not valid TOML".into(),
            })
        }
    }

    type Built = Result<Arc<dyn Plugin>, PluginError>;

    fn ctx() -> Arc<ExecutionContext> {
        Arc::new(ExecutionContext::builder("/tmp/project").build())
    }

    #[tokio::test]
    async fn register_and_resolve_roundtrip() {
        let mut registry = PluginRegistry::new(ctx(), PluginConfigs::new());
        registry.register(Arc::new(Named("alpha", None)));

        let plugin = registry.resolve("alpha").await.unwrap().unwrap();
        assert_eq!(plugin.name(), "alpha");
        assert!(registry.contains("alpha"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn lazy_factory_runs_once_with_configured_options() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut configs = PluginConfigs::new();
        let mut opts = PluginOptions::new();
        opts.insert("greeting".into(), Value::from("hi"));
        configs.insert("lazy".into(), opts);

        let mut registry = PluginRegistry::new(ctx(), configs);
        let counter = Arc::clone(&calls);
        registry.register_lazy("lazy", move |_ctx: Arc<ExecutionContext>, options: PluginOptions| -> Built {
            counter.fetch_add(1, Ordering::SeqCst);
            let greeting = options["greeting"].as_str().map(str::to_string);
            Ok(Arc::new(Named("lazy", greeting)))
        });

        for _ in 0..3 {
            let plugin = registry.resolve("lazy").await.unwrap().unwrap();
            assert_eq!(plugin.resolve_reference(Value::Null).await.unwrap(), "hi");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lazy_factory_errors_propagate() {
        let mut registry = PluginRegistry::new(ctx(), PluginConfigs::new());
        registry.register_lazy("broken", |_ctx: Arc<ExecutionContext>, _opts: PluginOptions| -> Built {
            Err(PluginError::Load {
                plugin: "broken".into(),
                message: "missing key file".into(),
            })
        });

        for _ in 0..2 {
            let err = registry.resolve("broken").await.err().unwrap();
            assert!(matches!(err, PluginError::Load { .. }));
        }
        assert!(!registry.is_known_missing("broken"));
    }

    #[tokio::test]
    async fn failed_discovery_is_memoized() {
        let discovery = Arc::new(Counting::default());
        let mut registry =
            PluginRegistry::new(ctx(), PluginConfigs::new()).with_discovery(discovery.clone());

        for _ in 0..5 {
            assert!(registry.resolve("ghost").await.unwrap().is_none());
        }
        assert_eq!(discovery.attempts.load(Ordering::SeqCst), 1);
        assert!(registry.is_known_missing("ghost"));
    }

    #[tokio::test]
    async fn register_clears_negative_cache() {
        let discovery = Arc::new(Counting::default());
        let mut registry =
            PluginRegistry::new(ctx(), PluginConfigs::new()).with_discovery(discovery.clone());

        assert!(registry.resolve("ghost").await.unwrap().is_none());
        registry.register(Arc::new(Named("ghost", None)));
        assert!(!registry.is_known_missing("ghost"));
        assert!(registry.resolve("ghost").await.unwrap().is_some());
        assert_eq!(discovery.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn discovered_plugin_is_cached() {
        let discovery = Arc::new(Counting {
            attempts: AtomicUsize::new(0),
            provides: Some("vault"),
        });
        let mut registry =
            PluginRegistry::new(ctx(), PluginConfigs::new()).with_discovery(discovery.clone());

        registry.resolve("vault").await.unwrap().unwrap();
        registry.resolve("vault").await.unwrap().unwrap();
        assert_eq!(discovery.attempts.load(Ordering::SeqCst), 1);
        assert!(registry.get("vault").is_some());
    }

    #[tokio::test]
    async fn register_from_module_without_discovery_is_unknown() {
        let mut registry = PluginRegistry::new(ctx(), PluginConfigs::new());
        let err = registry.register_from_module("vault").await.err().unwrap();
        assert!(matches!(err, PluginError::UnknownPlugin(ref n) if n == "vault"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = PluginRegistry::new(ctx(), PluginConfigs::new());
        registry.register(Arc::new(Named("dup", Some("first".into()))));
        registry.register_lazy("dup", |_ctx: Arc<ExecutionContext>, _opts: PluginOptions| -> Built {
            Ok(Arc::new(Named("dup", Some("second".into()))))
        });
        let plugin = registry.resolve("dup").await.unwrap().unwrap();
        assert_eq!(plugin.resolve_reference(Value::Null).await.unwrap(), "second");
        assert_eq!(registry.names(), vec!["dup".to_string()]);
    }

    #[tokio::test]
    async fn load_all_configured_fails_on_missing_plugin() {
        let mut configs = PluginConfigs::new();
        configs.insert("present".into(), PluginOptions::new());
        configs.insert("absent".into(), PluginOptions::new());

        let mut registry = PluginRegistry::new(ctx(), configs);
        registry.register(Arc::new(Named("present", None)));
        let err = registry.load_all_configured().await.unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(ref n) if n == "absent"));
    }

    #[test]
    fn options_default_to_empty() {
        let registry = PluginRegistry::new(ctx(), PluginConfigs::new());
        assert!(registry.options("anything").is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn broken_module_is_logged_and_treated_as_missing() {
        let mut registry =
            PluginRegistry::new(ctx(), PluginConfigs::new()).with_discovery(Arc::new(Broken));

        assert!(registry.resolve("vault").await.unwrap().is_none());
        assert!(registry.is_known_missing("vault"));
        assert!(logs_contain("module discovery failed"));
    }
}
