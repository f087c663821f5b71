// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rivet secret` command implementation.

use rivet_config::RivetConfig;
use rivet_core::{HookKind, RivetError};
use rivet_plugin::{Hook, HookDispatcher};
use serde_json::{Value, json};

/// Plugin used when neither `--plugin` nor `[plugin_hooks]` picks one.
const DEFAULT_SECRET_PLUGIN: &str = "pkcs7";

#[derive(Debug)]
pub enum SecretOp {
    Createkeys { force: bool },
    Encrypt(String),
    Decrypt(String),
}

impl SecretOp {
    fn hook(&self) -> HookKind {
        match self {
            SecretOp::Createkeys { .. } => HookKind::SecretCreatekeys,
            SecretOp::Encrypt(_) => HookKind::SecretEncrypt,
            SecretOp::Decrypt(_) => HookKind::SecretDecrypt,
        }
    }

    fn options(&self) -> Value {
        match self {
            SecretOp::Createkeys { force } => json!({ "force": force }),
            SecretOp::Encrypt(text) | SecretOp::Decrypt(text) => json!({ "value": text }),
        }
    }
}

async fn select_hook(
    dispatcher: &mut HookDispatcher,
    config: &RivetConfig,
    plugin: Option<&str>,
    kind: HookKind,
) -> Result<Hook, RivetError> {
    let hook = match plugin {
        Some(name) => dispatcher.get_hook(name, kind).await?,
        None if config.plugin_hook(kind).is_some() => dispatcher.get_default_hook(kind).await?,
        None => dispatcher.get_hook(DEFAULT_SECRET_PLUGIN, kind).await?,
    };
    Ok(hook)
}

/// Run one secret operation and print its result. String results print
/// bare so they can be pasted into configuration.
pub async fn run_secret(
    dispatcher: &mut HookDispatcher,
    config: &RivetConfig,
    plugin: Option<&str>,
    op: SecretOp,
) -> Result<(), RivetError> {
    let hook = select_hook(dispatcher, config, plugin, op.hook()).await?;
    tracing::debug!(plugin = %hook.plugin_name(), hook = %hook.kind(), "running secret command");

    match hook.call(op.options()).await? {
        Value::String(s) => println!("{s}"),
        Value::Null => {}
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rivet_executor::ExecutionContext;
    use rivet_plugin::dispatcher_from_config;

    use super::*;

    fn config_in(dir: &std::path::Path, extra: &str) -> RivetConfig {
        let toml = format!("[project]\nboltdir = \"{}\"\n{extra}", dir.display());
        rivet_config::load_and_validate_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn defaults_to_pkcs7() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), "");
        let ctx = Arc::new(ExecutionContext::from_config(&config));
        let mut dispatcher = dispatcher_from_config(&config, ctx).await.unwrap();

        let hook = select_hook(&mut dispatcher, &config, None, HookKind::SecretEncrypt)
            .await
            .unwrap();
        assert_eq!(hook.plugin_name(), "pkcs7");
    }

    #[tokio::test]
    async fn hook_table_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            dir.path(),
            "[plugin_hooks.secret_decrypt]\nplugin = \"task\"\n",
        );
        let ctx = Arc::new(ExecutionContext::from_config(&config));
        let mut dispatcher = dispatcher_from_config(&config, ctx).await.unwrap();

        let err = select_hook(&mut dispatcher, &config, None, HookKind::SecretDecrypt)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not support the 'secret_decrypt' hook"));
    }

    #[tokio::test]
    async fn createkeys_then_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), "");
        let ctx = Arc::new(ExecutionContext::from_config(&config));
        let mut dispatcher = dispatcher_from_config(&config, ctx).await.unwrap();

        let create = select_hook(&mut dispatcher, &config, None, HookKind::SecretCreatekeys)
            .await
            .unwrap();
        create.call(SecretOp::Createkeys { force: false }.options()).await.unwrap();

        let encrypt = select_hook(&mut dispatcher, &config, None, HookKind::SecretEncrypt)
            .await
            .unwrap();
        let sealed = encrypt
            .call(SecretOp::Encrypt("hunter2".into()).options())
            .await
            .unwrap();
        let decrypt = select_hook(&mut dispatcher, &config, None, HookKind::SecretDecrypt)
            .await
            .unwrap();
        let opened = decrypt.call(json!({ "value": sealed })).await.unwrap();
        assert_eq!(opened, "hunter2");
    }
}
