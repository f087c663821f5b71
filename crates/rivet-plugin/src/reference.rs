// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of plugin references embedded in configuration data.
//!
//! A reference is any JSON object with a `_plugin` key:
//!
//! ```json
//! { "password": { "_plugin": "prompt", "message": "Database password" } }
//! ```
//!
//! Resolution is post-order: references nested inside a reference's options
//! are resolved before the outer reference sees them. If the plugin declares
//! `validate_resolve_reference` it is called first with the same options.

use futures::future::BoxFuture;
use rivet_core::{HookKind, Location, PluginError};
use serde_json::{Map, Value};

use crate::dispatcher::HookDispatcher;

/// Key that marks an object as a plugin reference.
pub const PLUGIN_KEY: &str = "_plugin";

/// Replace every reference in `value` with the value its plugin resolves it
/// to. `source` names where the data came from and appears in error
/// locations together with the JSON pointer of the failing reference.
pub async fn resolve_references(
    dispatcher: &mut HookDispatcher,
    value: Value,
    source: &str,
) -> Result<Value, PluginError> {
    resolve_at(dispatcher, value, String::new(), source).await
}

/// Check every reference in `value` without resolving any of them.
///
/// Each reference must name a plugin that supports `resolve_reference`; if
/// the plugin also supports `validate_resolve_reference` it is consulted.
pub async fn validate_references(
    dispatcher: &mut HookDispatcher,
    value: &Value,
    source: &str,
) -> Result<(), PluginError> {
    validate_at(dispatcher, value, String::new(), source).await
}

/// Whether `value` contains any reference.
pub fn contains_references(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(PLUGIN_KEY) || map.values().any(contains_references),
        Value::Array(items) => items.iter().any(contains_references),
        _ => false,
    }
}

fn resolve_at<'a>(
    dispatcher: &'a mut HookDispatcher,
    value: Value,
    pointer: String,
    source: &'a str,
) -> BoxFuture<'a, Result<Value, PluginError>> {
    Box::pin(async move {
        match value {
            Value::Object(map) => {
                let mut resolved = Map::with_capacity(map.len());
                for (key, child) in map {
                    let child_pointer = child_pointer(&pointer, &key);
                    let child = if key == PLUGIN_KEY {
                        child
                    } else {
                        resolve_at(dispatcher, child, child_pointer, source).await?
                    };
                    resolved.insert(key, child);
                }

                if !resolved.contains_key(PLUGIN_KEY) {
                    return Ok(Value::Object(resolved));
                }

                let location = Location::new(source, pointer.clone());
                let (name, opts) = split_reference(resolved, &location)?;
                let hooks = dispatcher.plugin_hooks(&name).await?;

                if hooks.contains(HookKind::ValidateResolveReference) {
                    dispatcher
                        .get_hook(&name, HookKind::ValidateResolveReference)
                        .await?
                        .call_at(opts.clone(), location.clone())
                        .await?;
                }

                tracing::debug!(plugin = %name, location = %location, "resolving reference");
                dispatcher
                    .get_hook(&name, HookKind::ResolveReference)
                    .await?
                    .call_at(opts, location)
                    .await
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let item_pointer = child_pointer(&pointer, &i.to_string());
                    resolved.push(resolve_at(dispatcher, item, item_pointer, source).await?);
                }
                Ok(Value::Array(resolved))
            }
            other => Ok(other),
        }
    })
}

fn validate_at<'a>(
    dispatcher: &'a mut HookDispatcher,
    value: &'a Value,
    pointer: String,
    source: &'a str,
) -> BoxFuture<'a, Result<(), PluginError>> {
    Box::pin(async move {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key != PLUGIN_KEY {
                        validate_at(dispatcher, child, child_pointer(&pointer, key), source).await?;
                    }
                }

                if !map.contains_key(PLUGIN_KEY) {
                    return Ok(());
                }

                let location = Location::new(source, pointer.clone());
                let (name, opts) = split_reference(map.clone(), &location)?;
                let hooks = dispatcher.plugin_hooks(&name).await?;
                if !hooks.contains(HookKind::ResolveReference) {
                    return Err(PluginError::UnsupportedHook {
                        plugin: name,
                        hook: HookKind::ResolveReference,
                    });
                }
                if hooks.contains(HookKind::ValidateResolveReference) {
                    dispatcher
                        .get_hook(&name, HookKind::ValidateResolveReference)
                        .await?
                        .call_at(opts, location)
                        .await?;
                }
                Ok(())
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_at(dispatcher, item, child_pointer(&pointer, &i.to_string()), source)
                        .await?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    })
}

/// Split a reference into its plugin name and the options passed to hooks.
fn split_reference(
    mut map: Map<String, Value>,
    location: &Location,
) -> Result<(String, Value), PluginError> {
    match map.remove(PLUGIN_KEY) {
        Some(Value::String(name)) if !name.is_empty() => Ok((name, Value::Object(map))),
        _ => Err(PluginError::InvalidReference {
            message: format!("'{PLUGIN_KEY}' must be a non-empty plugin name"),
            location: Some(location.clone()),
        }),
    }
}

/// Append `token` to a JSON pointer, escaping per RFC 6901.
fn child_pointer(pointer: &str, token: &str) -> String {
    format!("{pointer}/{}", token.replace('~', "~0").replace('/', "~1"))
}
