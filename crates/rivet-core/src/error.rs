// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Rivet plugin core.

use std::fmt;

use thiserror::Error;

use crate::hook::HookKind;

/// Where in the configuration a plugin reference or hook invocation came from.
///
/// `source` names the file (or `<inline>` for in-memory data) and `path` is a
/// JSON pointer to the offending value inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: String,
    pub path: String,
}

impl Location {
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    /// A location inside in-memory data that has no backing file.
    pub fn inline(path: impl Into<String>) -> Self {
        Self::new("<inline>", path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{} at {}", self.source, self.path)
        }
    }
}

fn at(location: &Option<Location>) -> String {
    location
        .as_ref()
        .map(|l| format!(" ({l})"))
        .unwrap_or_default()
}

/// Failures raised while resolving plugins, dispatching hooks, or running
/// the tasks a hook needs.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No static registration and no discoverable module implementation.
    #[error("unknown plugin: '{0}'")]
    UnknownPlugin(String),

    /// The plugin exists but does not declare the requested hook.
    #[error("plugin '{plugin}' does not support the '{hook}' hook")]
    UnsupportedHook { plugin: String, hook: HookKind },

    /// A hook implementation failed while running.
    #[error("plugin '{plugin}' failed: {message}{}", at(.location))]
    Execution {
        message: String,
        plugin: String,
        location: Option<Location>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No task signature with this name is visible to the compiler.
    #[error("could not find a task named '{0}'")]
    UnknownTask(String),

    /// Supplied parameters do not match the task's declared signature.
    #[error("invalid parameters for task '{task}': {}", .errors.join("; "))]
    InvalidParameters { task: String, errors: Vec<String> },

    /// A plugin factory or module failed to construct the plugin.
    #[error("failed to load plugin '{plugin}': {message}")]
    Load { plugin: String, message: String },

    /// The compiler session could not be created or queried.
    #[error("compiler error: {0}")]
    Compiler(String),

    /// The task transport failed to execute a task.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A `_plugin` reference is malformed.
    #[error("invalid plugin reference: {message}{}", at(.location))]
    InvalidReference {
        message: String,
        location: Option<Location>,
    },

    /// Plugin options are missing or have the wrong shape.
    #[error("plugin configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Build an [`PluginError::Execution`] with no location or source.
    pub fn execution(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        PluginError::Execution {
            message: message.into(),
            plugin: plugin.into(),
            location: None,
            source: None,
        }
    }

    /// Attach a configuration location to errors that carry one.
    ///
    /// An existing location is kept: the innermost reference wins.
    pub fn with_location(self, loc: Location) -> Self {
        match self {
            PluginError::Execution {
                message,
                plugin,
                location,
                source,
            } => PluginError::Execution {
                message,
                plugin,
                location: location.or(Some(loc)),
                source,
            },
            PluginError::InvalidReference { message, location } => PluginError::InvalidReference {
                message,
                location: location.or(Some(loc)),
            },
            other => other,
        }
    }

    /// Wrap this error as an execution failure of `plugin`.
    ///
    /// Dispatch-level errors (unknown plugin, unsupported hook) and errors
    /// already attributed to a plugin pass through unchanged.
    pub fn into_execution(self, plugin: &str) -> Self {
        match self {
            e @ (PluginError::Execution { .. }
            | PluginError::UnknownPlugin(_)
            | PluginError::UnsupportedHook { .. }
            | PluginError::InvalidReference { .. }) => e,
            other => PluginError::Execution {
                message: other.to_string(),
                plugin: plugin.to_string(),
                location: None,
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Top-level error type used by configuration loading and the CLI.
#[derive(Debug, Error)]
pub enum RivetError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input data could not be parsed or serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_mentions_plugin_and_location() {
        let err = PluginError::execution("vault", "token expired")
            .with_location(Location::new("inventory.yaml", "/targets/0/password"));
        let msg = err.to_string();
        assert!(msg.contains("vault"));
        assert!(msg.contains("token expired"));
        assert!(msg.contains("inventory.yaml at /targets/0/password"));
    }

    #[test]
    fn with_location_keeps_innermost() {
        let err = PluginError::execution("task", "boom")
            .with_location(Location::inline("/a/b"))
            .with_location(Location::inline("/a"));
        match err {
            PluginError::Execution { location, .. } => {
                assert_eq!(location, Some(Location::inline("/a/b")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn into_execution_wraps_lower_level_errors() {
        let err = PluginError::UnknownTask("nope::task".into()).into_execution("task");
        match err {
            PluginError::Execution {
                plugin, message, ..
            } => {
                assert_eq!(plugin, "task");
                assert!(message.contains("nope::task"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn into_execution_passes_dispatch_errors_through() {
        let err = PluginError::UnknownPlugin("ghost".into()).into_execution("task");
        assert!(matches!(err, PluginError::UnknownPlugin(name) if name == "ghost"));
    }

    #[test]
    fn invalid_parameters_lists_every_error() {
        let err = PluginError::InvalidParameters {
            task: "demo".into(),
            errors: vec!["first".into(), "second".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid parameters for task 'demo': first; second"
        );
    }
}
