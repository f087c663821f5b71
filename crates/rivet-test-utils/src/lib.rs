// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Rivet integration tests.
//!
//! Provides mock compilers, transports, and plugins plus a harness that
//! wires them into a registry and dispatcher, so plugin behavior can be
//! tested without spawning tasks or reading modules from disk.
//!
//! # Components
//!
//! - [`MockCompiler`] / [`MockCompilerFactory`] - in-memory task signatures with lifecycle counters
//! - [`MockTransport`] - records task runs and returns canned results
//! - [`MockPlugin`] - configurable hook set with call recording
//! - [`CountingDiscovery`] - module discovery that counts attempts
//! - [`TestHarness`] - the assembled stack

pub mod harness;
pub mod mock_compiler;
pub mod mock_plugin;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_compiler::{MockCompiler, MockCompilerFactory};
pub use mock_plugin::{CountingDiscovery, MockPlugin, RecordingReporter};
pub use mock_transport::{MockTransport, RecordedRun};
