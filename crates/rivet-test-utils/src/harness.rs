// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for plugin integration testing.
//!
//! `TestHarness` assembles an execution context with a mock compiler and
//! transport, a registry with the compiled-in plugins plus any mock
//! plugins, counting discovery, and a dispatcher that records usage.

use std::collections::BTreeMap;
use std::sync::Arc;

use rivet_core::{HookKind, Plugin, PluginError, PluginOptions, TaskSignature};
use rivet_executor::ExecutionContext;
use rivet_plugin::builtin::register_builtins;
use rivet_plugin::{Hook, HookDispatcher, PluginConfigs, PluginRegistry};
use serde_json::Value;

use crate::mock_compiler::{MockCompiler, MockCompilerFactory};
use crate::mock_plugin::{CountingDiscovery, RecordingReporter};
use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    compiler: MockCompiler,
    transport: MockTransport,
    ambient: bool,
    registered: Vec<Arc<dyn Plugin>>,
    discovery: CountingDiscovery,
    configs: PluginConfigs,
    hook_defaults: BTreeMap<String, PluginOptions>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            compiler: MockCompiler::new(),
            transport: MockTransport::new(),
            ambient: false,
            registered: Vec::new(),
            discovery: CountingDiscovery::new(),
            configs: PluginConfigs::new(),
            hook_defaults: BTreeMap::new(),
        }
    }

    /// Make a task visible to the compiler.
    pub fn with_task(mut self, signature: TaskSignature) -> Self {
        self.compiler = self.compiler.with_task(signature);
        self
    }

    /// Use a preconfigured transport.
    pub fn with_transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Inject the compiler as an ambient session instead of creating one
    /// per call.
    pub fn with_ambient_compiler(mut self) -> Self {
        self.ambient = true;
        self
    }

    /// Register a plugin statically.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.registered.push(plugin);
        self
    }

    /// Make a plugin reachable only through module discovery.
    pub fn with_discoverable(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.discovery = self.discovery.with_plugin(plugin);
        self
    }

    /// Set the `[plugins.<name>]` options for a plugin.
    pub fn with_plugin_config(mut self, name: &str, options: Value) -> Self {
        self.configs.insert(name.to_string(), as_options(options));
        self
    }

    /// Set the `[plugin_hooks.<hook>]` table for a hook.
    pub fn with_hook_default(mut self, kind: HookKind, options: Value) -> Self {
        self.hook_defaults.insert(kind.to_string(), as_options(options));
        self
    }

    /// Build the test harness.
    pub fn build(self) -> Result<TestHarness, PluginError> {
        let temp_dir = tempfile::TempDir::new()?;

        let transport = Arc::new(self.transport);
        let factory = Arc::new(MockCompilerFactory::new(self.compiler.clone()));
        let mut builder = ExecutionContext::builder(temp_dir.path())
            .compiler_factory(factory.clone())
            .transport(transport.clone());
        if self.ambient {
            builder = builder.ambient_compiler(Arc::new(self.compiler));
        }
        let ctx = Arc::new(builder.build());

        let discovery = Arc::new(self.discovery);
        let mut registry =
            PluginRegistry::new(Arc::clone(&ctx), self.configs).with_discovery(discovery.clone());
        register_builtins(&mut registry);
        for plugin in self.registered {
            registry.register(plugin);
        }

        let reporter = Arc::new(RecordingReporter::new());
        let dispatcher = HookDispatcher::new(registry)
            .with_reporter(reporter.clone())
            .with_hook_defaults(self.hook_defaults);

        tracing::debug!(boltdir = %temp_dir.path().display(), "test harness ready");

        Ok(TestHarness {
            dispatcher,
            ctx,
            transport,
            factory,
            discovery,
            reporter,
            _temp_dir: temp_dir,
        })
    }
}

fn as_options(value: Value) -> PluginOptions {
    match value {
        Value::Object(map) => map,
        _ => PluginOptions::new(),
    }
}

/// A fully wired plugin stack backed by mocks.
///
/// The temporary project directory lives as long as the harness.
pub struct TestHarness {
    pub dispatcher: HookDispatcher,
    pub ctx: Arc<ExecutionContext>,
    pub transport: Arc<MockTransport>,
    pub factory: Arc<MockCompilerFactory>,
    pub discovery: Arc<CountingDiscovery>,
    pub reporter: Arc<RecordingReporter>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Look up `kind` on plugin `name` and call it with `opts`.
    pub async fn call_hook(&mut self, name: &str, kind: HookKind, opts: Value) -> Result<Value, PluginError> {
        let hook: Hook = self.dispatcher.get_hook(name, kind).await?;
        hook.call(opts).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock_compiler::task_with_required_param;

    #[tokio::test]
    async fn builtins_are_registered() {
        let harness = TestHarness::builder().build().unwrap();
        let names = harness.dispatcher.registry().names();
        for builtin in ["task", "prompt", "pkcs7"] {
            assert!(names.iter().any(|n| n == builtin), "missing {builtin}");
        }
    }

    #[tokio::test]
    async fn task_plugin_runs_through_mock_transport() {
        let mut harness = TestHarness::builder()
            .with_task(task_with_required_param())
            .build()
            .unwrap();
        let value = harness
            .call_hook(
                "task",
                HookKind::ResolveReference,
                json!({"task": "test::required", "parameters": {"param": "x"}}),
            )
            .await
            .unwrap();
        assert_eq!(value["param"], "x");
        assert_eq!(harness.transport.run_count(), 1);
        assert_eq!(harness.factory.created(), harness.factory.torn_down());
    }
}
