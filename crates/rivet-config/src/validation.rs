// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as hook names in `[plugin_hooks]` and non-empty paths.

use std::str::FromStr;

use rivet_core::HookKind;

use crate::diagnostic::{ConfigError, suggest_key};
use crate::model::RivetConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RivetConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.project.boltdir.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            message: "project.boltdir must not be empty".to_string(),
        });
    }

    for (i, entry) in config.project.modulepath.iter().enumerate() {
        if entry.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("project.modulepath[{i}] must not be empty"),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.project.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "project.log_level `{}` is not one of: {}",
                config.project.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    for name in config.plugins.keys() {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "plugin names in [plugins] must not be empty".to_string(),
            });
        }
    }

    let hook_names: Vec<String> = HookKind::ALL.iter().map(|k| k.to_string()).collect();
    let hook_refs: Vec<&str> = hook_names.iter().map(String::as_str).collect();

    for (hook, table) in &config.plugin_hooks {
        if HookKind::from_str(hook).is_err() {
            errors.push(ConfigError::UnknownHook {
                name: hook.clone(),
                suggestion: suggest_key(hook, &hook_refs),
                valid_hooks: hook_refs.join(", "),
            });
            continue;
        }

        match table.get("plugin") {
            Some(serde_json::Value::String(p)) if !p.trim().is_empty() => {}
            Some(_) => errors.push(ConfigError::Validation {
                message: format!("plugin_hooks.{hook}.plugin must be a non-empty string"),
            }),
            None => errors.push(ConfigError::MissingKey {
                key: format!("plugin_hooks.{hook}.plugin"),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
