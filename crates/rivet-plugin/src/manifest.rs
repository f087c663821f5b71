// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `plugin.toml`: what a content module declares about the plugin it
//! provides.
//!
//! ```toml
//! [plugin]
//! name = "vault"
//! hooks = ["resolve_reference"]
//! config_keys = ["server_url"]
//! ```
//!
//! Each declared hook is backed by a task named after the hook inside the
//! module.

use std::str::FromStr;

use rivet_core::{HookKind, HookSet, PluginError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Must match the module directory name.
    pub name: String,
    pub version: Option<String>,
    pub description: String,
    pub hooks: HookSet,
    /// Option keys the plugin reads from `[plugins.<name>]`.
    pub config_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    plugin: RawPlugin,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlugin {
    name: String,
    version: Option<String>,
    #[serde(default)]
    description: String,
    hooks: Vec<String>,
    #[serde(default)]
    config_keys: Vec<String>,
}

impl RawPlugin {
    fn into_manifest(self) -> Result<PluginManifest, PluginError> {
        if self.name.is_empty() {
            return Err(invalid("plugin name must not be empty"));
        }
        let hooks = self
            .hooks
            .iter()
            .map(|hook| {
                HookKind::from_str(hook).map_err(|_| {
                    invalid(format!(
                        "plugin '{}' declares invalid hook '{hook}' (known hooks: {})",
                        self.name,
                        HookSet::all()
                    ))
                })
            })
            .collect::<Result<HookSet, _>>()?;
        if hooks.is_empty() {
            return Err(invalid(format!("plugin '{}' declares no hooks", self.name)));
        }

        Ok(PluginManifest {
            name: self.name,
            version: self.version,
            description: self.description,
            hooks,
            config_keys: self.config_keys,
        })
    }
}

fn invalid(message: impl Into<String>) -> PluginError {
    PluginError::Config(format!("invalid plugin manifest: {}", message.into()))
}

impl FromStr for PluginManifest {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawManifest = toml::from_str(s).map_err(|e| invalid(e.to_string()))?;
        raw.plugin.into_manifest()
    }
}

/// Parse and check `plugin.toml` content.
pub fn parse_plugin_manifest(toml_content: &str) -> Result<PluginManifest, PluginError> {
    toml_content.parse()
}
