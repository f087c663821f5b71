// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rivet resolve` command implementation.

use std::path::Path;

use rivet_core::RivetError;
use rivet_plugin::{HookDispatcher, resolve_references, validate_references};
use serde_json::Value;

/// Read `file` as JSON, resolve every plugin reference in it, and print the
/// result. With `validate_only`, references are checked but never resolved.
pub async fn run_resolve(
    dispatcher: &mut HookDispatcher,
    file: &Path,
    validate_only: bool,
) -> Result<(), RivetError> {
    let raw = tokio::fs::read_to_string(file).await?;
    let data: Value = serde_json::from_str(&raw)?;
    let source = file.display().to_string();

    if validate_only {
        validate_references(dispatcher, &data, &source).await?;
        tracing::info!(file = %source, "all references are valid");
        return Ok(());
    }

    let resolved = resolve_references(dispatcher, data, &source).await?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
