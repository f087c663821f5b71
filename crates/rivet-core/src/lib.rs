// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the Rivet plugin system.
//!
//! This crate defines the closed set of hooks, the [`Plugin`] capability
//! contract every provider implements, the error taxonomy shared by the
//! registry, dispatcher, and execution context, and the task/target model
//! plugins use to run their own tasks.

pub mod error;
pub mod hook;
pub mod inventory;
pub mod plugin;
pub mod task;

// Re-export key items at crate root for ergonomic imports.
pub use error::{Location, PluginError, RivetError};
pub use hook::{HookKind, HookSet};
pub use inventory::{Inventory, LOCALHOST, Target};
pub use plugin::{Plugin, PluginOptions};
pub use task::{
    InputMethod, ParamSpec, ParamType, RunOptions, Sensitive, Task, TaskArg, TaskArgs,
    TaskMetadata, TaskParams, TaskResult, TaskSignature, TaskStatus,
};
