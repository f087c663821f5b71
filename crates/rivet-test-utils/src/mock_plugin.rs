// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock plugins, discovery, and usage reporting for deterministic testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rivet_core::plugin::unsupported;
use rivet_core::{HookKind, HookSet, Plugin, PluginError, PluginOptions};
use rivet_executor::ExecutionContext;
use rivet_plugin::{ModuleDiscovery, UsageReporter};
use serde_json::Value;

enum Reply {
    Value(Value),
    Failure(String),
}

/// A plugin with a configurable hook set.
///
/// Declared hooks answer with a canned value when one is set, otherwise
/// `opts["value"]` for resolve and secret hooks and `Null` for the rest.
/// Undeclared hooks report themselves unsupported. Every call is recorded.
pub struct MockPlugin {
    name: String,
    hooks: HookSet,
    replies: Mutex<HashMap<HookKind, Reply>>,
    calls: Mutex<Vec<(HookKind, Value)>>,
}

impl MockPlugin {
    pub fn new(name: &str, hooks: impl Into<HookSet>) -> Self {
        Self {
            name: name.to_string(),
            hooks: hooks.into(),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A plugin with the three secret hooks, shaped like a vault client.
    pub fn secret_store(name: &str) -> Self {
        Self::new(
            name,
            [
                HookKind::SecretEncrypt,
                HookKind::SecretDecrypt,
                HookKind::SecretCreatekeys,
            ],
        )
    }

    /// Answer `kind` with `value`.
    pub fn returning(self, kind: HookKind, value: Value) -> Self {
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .insert(kind, Reply::Value(value));
        self
    }

    /// Fail `kind` with an execution error carrying `message`.
    pub fn failing(self, kind: HookKind, message: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .insert(kind, Reply::Failure(message.to_string()));
        self
    }

    /// Every hook call so far with its options.
    pub fn calls(&self) -> Vec<(HookKind, Value)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Number of calls to `kind`.
    pub fn call_count(&self, kind: HookKind) -> usize {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    fn handle(&self, kind: HookKind, opts: Value) -> Result<Value, PluginError> {
        if !self.hooks.contains(kind) {
            return Err(unsupported(&self.name, kind));
        }
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((kind, opts.clone()));

        match self.replies.lock().expect("replies lock poisoned").get(&kind) {
            Some(Reply::Value(v)) => Ok(v.clone()),
            Some(Reply::Failure(msg)) => Err(PluginError::execution(&self.name, msg.as_str())),
            None => Ok(match kind {
                HookKind::ResolveReference | HookKind::SecretEncrypt | HookKind::SecretDecrypt => {
                    opts["value"].clone()
                }
                _ => Value::Null,
            }),
        }
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        self.hooks
    }

    async fn puppet_library(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::PuppetLibrary, opts)
    }

    async fn resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::ResolveReference, opts)
    }

    async fn validate_resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::ValidateResolveReference, opts)
    }

    async fn secret_encrypt(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::SecretEncrypt, opts)
    }

    async fn secret_decrypt(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::SecretDecrypt, opts)
    }

    async fn secret_createkeys(&self, opts: Value) -> Result<Value, PluginError> {
        self.handle(HookKind::SecretCreatekeys, opts)
    }
}

/// Discovery that serves a fixed set of plugins and counts attempts.
#[derive(Default)]
pub struct CountingDiscovery {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    attempts: AtomicUsize,
    seen: Mutex<Vec<(String, PluginOptions)>>,
}

impl CountingDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `plugin` discoverable under its own name.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.insert(plugin.name().to_string(), plugin);
        self
    }

    /// Discovery attempts so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Attempts for `name` only.
    pub fn attempts_for(&self, name: &str) -> usize {
        self.seen
            .lock()
            .expect("seen lock poisoned")
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }

    /// Options passed along with the most recent attempt for `name`.
    pub fn options_for(&self, name: &str) -> Option<PluginOptions> {
        self.seen
            .lock()
            .expect("seen lock poisoned")
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, opts)| opts.clone())
    }
}

#[async_trait]
impl ModuleDiscovery for CountingDiscovery {
    async fn discover(
        &self,
        name: &str,
        _ctx: Arc<ExecutionContext>,
        options: PluginOptions,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("seen lock poisoned")
            .push((name.to_string(), options));
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))
    }
}

/// Usage reporter that keeps every event in memory.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(String, HookKind)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, HookKind)> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl UsageReporter for RecordingReporter {
    fn report_plugin_usage(&self, plugin: &str, hook: HookKind) {
        self.events
            .lock()
            .expect("events lock poisoned")
            .push((plugin.to_string(), hook));
    }
}
