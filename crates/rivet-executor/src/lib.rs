// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution services for Rivet plugins.
//!
//! Plugins that need to run an orchestration task do so through the
//! [`ExecutionContext`]: it looks the task up in a compiler session, wraps
//! sensitive parameters, and runs the task on the synthetic `localhost`
//! target through a [`TaskRunner`] that admits one task at a time.

pub mod compiler;
pub mod context;
pub mod runner;
pub mod transport;

pub use compiler::{CompilerFactory, CompilerSession, ModulepathCompiler, SessionGuard};
pub use context::{ExecutionContext, ExecutionContextBuilder};
pub use runner::{TaskRunner, TaskTransport};
pub use transport::LocalTransport;
