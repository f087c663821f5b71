// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capability contract every plugin implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PluginError;
use crate::hook::{HookKind, HookSet};

/// Plugin-specific options, taken from the `[plugins.<name>]` configuration
/// table. Opaque to the core.
pub type PluginOptions = serde_json::Map<String, Value>;

/// A named provider of one or more hooks.
///
/// Every hook has a method here with a default body that reports the hook as
/// unsupported. Implementations override the methods for the hooks they
/// declare in [`hooks`](Plugin::hooks); the dispatcher only calls methods
/// whose kind is in that set. The declared set must not change after
/// construction.
///
/// All hooks take and return JSON values: the options of the reference or
/// hook configuration in, the hook's result out.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Unique plugin name used for registry lookup.
    fn name(&self) -> &str;

    /// Hooks this plugin implements.
    fn hooks(&self) -> HookSet;

    /// Installs the runtime library on the target named in `opts["target"]`.
    async fn puppet_library(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::PuppetLibrary))
    }

    /// Resolves an indirect configuration reference to its value.
    async fn resolve_reference(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::ResolveReference))
    }

    /// Checks a reference before it is resolved. Returns `Value::Null` when
    /// the reference is acceptable.
    async fn validate_resolve_reference(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::ValidateResolveReference))
    }

    /// Encrypts `opts["value"]`.
    async fn secret_encrypt(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::SecretEncrypt))
    }

    /// Decrypts `opts["value"]`.
    async fn secret_decrypt(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::SecretDecrypt))
    }

    /// Generates key material for the secret hooks.
    async fn secret_createkeys(&self, _opts: Value) -> Result<Value, PluginError> {
        Err(unsupported(self.name(), HookKind::SecretCreatekeys))
    }
}

/// The error a plugin returns for a hook it does not implement.
pub fn unsupported(plugin: &str, hook: HookKind) -> PluginError {
    PluginError::UnsupportedHook {
        plugin: plugin.to_string(),
        hook,
    }
}

/// Read a required string option from hook options or plugin configuration.
pub fn required_str<'a>(opts: &'a Value, key: &str) -> Result<&'a str, PluginError> {
    opts.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| PluginError::Config(format!("missing required string option '{key}'")))
}
