// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `prompt` plugin: resolves a reference by asking the operator.
//!
//! The reference carries the prompt text under `message`. When it also names
//! an environment variable under `env_var` and that variable is set, its
//! value is used without prompting. Input is read without echo.

use std::io::IsTerminal;
use std::sync::Arc;

use async_trait::async_trait;
use rivet_core::plugin::required_str;
use rivet_core::{HookKind, HookSet, Plugin, PluginError, PluginOptions};
use rivet_executor::ExecutionContext;
use serde_json::Value;

pub const NAME: &str = "prompt";

pub struct PromptPlugin {
    interactive: bool,
}

impl PromptPlugin {
    /// Reads `interactive` (default `true`) from the plugin options. When
    /// false the plugin never touches the terminal.
    pub fn new(options: &PluginOptions) -> Result<Self, PluginError> {
        let interactive = match options.get("interactive") {
            None => true,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(PluginError::Load {
                    plugin: NAME.to_string(),
                    message: format!("'interactive' must be a boolean, got {other}"),
                });
            }
        };
        Ok(Self { interactive })
    }

    fn read(&self, message: &str, env_var: Option<&str>) -> Result<String, PluginError> {
        if let Some(var) = env_var
            && let Ok(value) = std::env::var(var)
            && !value.is_empty()
        {
            return Ok(value);
        }

        if !self.interactive || !std::io::stdin().is_terminal() {
            let hint = env_var
                .map(|v| format!(" Set {v} or run interactively."))
                .unwrap_or_default();
            return Err(PluginError::execution(
                NAME,
                format!("cannot prompt for '{message}' without a terminal.{hint}"),
            ));
        }

        let value = rpassword::prompt_password(format!("{message}: "))
            .map_err(|e| PluginError::execution(NAME, format!("failed to read input: {e}")))?;
        if value.is_empty() {
            return Err(PluginError::execution(NAME, "empty value not allowed"));
        }
        Ok(value)
    }
}

#[async_trait]
impl Plugin for PromptPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn hooks(&self) -> HookSet {
        HookSet::from([HookKind::ResolveReference])
    }

    async fn resolve_reference(&self, opts: Value) -> Result<Value, PluginError> {
        let message = required_str(&opts, "message")?;
        let env_var = opts.get("env_var").and_then(Value::as_str);
        self.read(message, env_var).map(Value::String)
    }
}

/// Factory used by the registry.
pub(crate) fn build(
    _ctx: Arc<ExecutionContext>,
    options: PluginOptions,
) -> Result<Arc<dyn Plugin>, PluginError> {
    Ok(Arc::new(PromptPlugin::new(&options)?))
}
