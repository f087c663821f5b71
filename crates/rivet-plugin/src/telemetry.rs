// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage events for hook dispatch.
//!
//! Uses the metrics-rs facade so any installed recorder can collect them.
//! With no recorder installed the counters are no-ops.

use metrics::describe_counter;
use rivet_core::HookKind;

/// Counter incremented once per successful hook dispatch.
pub const HOOK_DISPATCH_TOTAL: &str = "rivet_plugin_hook_dispatch_total";

/// Receives one event per successful hook dispatch.
pub trait UsageReporter: Send + Sync {
    fn report_plugin_usage(&self, plugin: &str, hook: HookKind);
}

/// Reports usage through the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsReporter;

impl MetricsReporter {
    /// Register metric descriptions. Called once after the recorder is
    /// installed.
    pub fn describe() {
        describe_counter!(HOOK_DISPATCH_TOTAL, "Hook dispatches by plugin and hook");
    }
}

impl UsageReporter for MetricsReporter {
    fn report_plugin_usage(&self, plugin: &str, hook: HookKind) {
        metrics::counter!(
            HOOK_DISPATCH_TOTAL,
            "plugin" => plugin.to_string(),
            "hook" => hook.to_string()
        )
        .increment(1);
    }
}

/// Discards usage events. Used when telemetry is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl UsageReporter for NoopReporter {
    fn report_plugin_usage(&self, _plugin: &str, _hook: HookKind) {}
}
