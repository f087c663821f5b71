// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targets and the single-target inventory plugins run their tasks against.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Name of the synthetic target that plugin tasks run on.
pub const LOCALHOST: &str = "localhost";

/// An addressable endpoint a task can run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub uri: String,
    /// Transport used to reach the target (`local`, `ssh`, ...).
    pub transport: String,
    /// Transport configuration, keyed by transport name.
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

impl Target {
    /// The isolated local target used for plugin tasks.
    ///
    /// It runs tasks in-process on the controller with the tool's own
    /// interpreter, never over the network.
    pub fn localhost() -> Self {
        let config = json!({
            "local": { "bundled-runtime": true },
        });
        Self {
            name: LOCALHOST.to_string(),
            uri: LOCALHOST.to_string(),
            transport: "local".to_string(),
            config: config.as_object().cloned().unwrap_or_default(),
        }
    }
}

/// A set of targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    targets: Vec<Target>,
}

impl Inventory {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    /// Inventory containing only [`Target::localhost`].
    pub fn local() -> Self {
        Self::new(vec![Target::localhost()])
    }

    pub fn get_target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}
