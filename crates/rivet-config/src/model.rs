// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Rivet.
//!
//! Fixed sections use `#[serde(deny_unknown_fields)]` so typos are caught at
//! startup. Plugin option tables are opaque and accept any keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rivet_core::{HookKind, PluginOptions};
use serde::{Deserialize, Serialize};

/// Top-level Rivet configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RivetConfig {
    /// Project directory and module lookup settings.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Per-plugin options, keyed by plugin name.
    #[serde(default)]
    pub plugins: BTreeMap<String, PluginOptions>,

    /// Default hook configuration, keyed by hook name. Each table names the
    /// plugin that serves the hook under `plugin`; the remaining keys are
    /// passed to the hook.
    #[serde(default)]
    pub plugin_hooks: BTreeMap<String, PluginOptions>,

    /// Usage reporting settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl RivetConfig {
    /// Options for `plugin`, or an empty map when it has no table.
    pub fn plugin_options(&self, plugin: &str) -> PluginOptions {
        self.plugins.get(plugin).cloned().unwrap_or_default()
    }

    /// Default configuration for `hook`, if one is set.
    pub fn plugin_hook(&self, hook: HookKind) -> Option<&PluginOptions> {
        self.plugin_hooks.get(&hook.to_string())
    }

    /// Module search path with relative entries resolved against the boltdir.
    pub fn modulepath(&self) -> Vec<PathBuf> {
        self.project
            .modulepath
            .iter()
            .map(|entry| {
                let path = Path::new(entry);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.project.boltdir.join(path)
                }
            })
            .collect()
    }
}

/// Project settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Root working directory of the project.
    #[serde(default = "default_boltdir")]
    pub boltdir: PathBuf,

    /// Directories searched for content modules, relative to `boltdir`
    /// unless absolute.
    #[serde(default = "default_modulepath")]
    pub modulepath: Vec<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            boltdir: default_boltdir(),
            modulepath: default_modulepath(),
            log_level: default_log_level(),
        }
    }
}

fn default_boltdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_modulepath() -> Vec<String> {
    vec!["modules".to_string(), ".modules".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Usage reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Emit a usage event for every hook dispatch.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}
