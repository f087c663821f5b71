// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rivet plugin list` and `rivet plugin show` command implementations.

use std::io::IsTerminal;

use rivet_config::RivetConfig;
use rivet_core::{HookSet, RivetError};
use rivet_plugin::catalog::catalog_entry;
use rivet_plugin::{HookDispatcher, ModulepathDiscovery, builtin_catalog};
use serde_json::json;

/// One row of `plugin list`.
struct PluginRow {
    name: String,
    description: String,
    hooks: HookSet,
    source: &'static str,
    available: bool,
}

async fn collect_rows(config: &RivetConfig) -> Vec<PluginRow> {
    let modules = ModulepathDiscovery::from_config(config).available().await;

    let mut rows: Vec<PluginRow> = builtin_catalog()
        .into_iter()
        .map(|entry| {
            let installed = modules.iter().any(|m| m.name == entry.name);
            PluginRow {
                name: entry.name.to_string(),
                description: entry.description.to_string(),
                hooks: entry.hooks,
                source: if entry.compiled_in { "builtin" } else { "module" },
                available: entry.compiled_in || installed,
            }
        })
        .collect();

    for manifest in modules {
        if rows.iter().any(|r| r.name == manifest.name) {
            continue;
        }
        rows.push(PluginRow {
            name: manifest.name,
            description: manifest.description,
            hooks: manifest.hooks,
            source: "module",
            available: true,
        });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Run `rivet plugin list`.
///
/// With `--json`, prints one JSON array for scripting. With `--plain` or
/// when stdout is not a TTY, disables colors.
pub async fn run_list(config: &RivetConfig, json: bool, plain: bool) -> Result<(), RivetError> {
    let rows = collect_rows(config).await;

    if json {
        let out: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "description": r.description,
                    "hooks": r.hooks,
                    "source": r.source,
                    "available": r.available,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let color = !plain && std::io::stdout().is_terminal();
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);

    for row in &rows {
        let name = format!("{:<width$}", row.name);
        let status = if row.available { "" } else { " (not installed)" };
        if color {
            use colored::Colorize;
            let name = if row.available { name.green() } else { name.dimmed() };
            println!("{name}  {:<7}  {}{}", row.source, row.hooks, status.yellow());
        } else {
            println!("{name}  {:<7}  {}{status}", row.source, row.hooks);
        }
    }
    Ok(())
}

/// Run `rivet plugin show <name>`: resolve the plugin the way a hook
/// lookup would and print what it supports.
pub async fn run_show(dispatcher: &mut HookDispatcher, name: &str) -> Result<(), RivetError> {
    let hooks = dispatcher.plugin_hooks(name).await?;

    println!("name:  {name}");
    if let Some(entry) = catalog_entry(name) {
        println!("about: {}", entry.description);
        println!("mode:  {}", entry.mode);
    }
    println!("hooks:");
    for hook in hooks.iter() {
        println!("  - {hook}");
    }
    let options = dispatcher.registry().options(name);
    if !options.is_empty() {
        let keys: Vec<&str> = options.keys().map(String::as_str).collect();
        println!("configured options: {}", keys.join(", "));
    }
    Ok(())
}
