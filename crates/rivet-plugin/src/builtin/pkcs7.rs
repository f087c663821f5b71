// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `pkcs7` plugin: project-local secret encryption.
//!
//! Values are sealed with AES-256-GCM under a 256-bit key kept in the
//! project and written as `ENC[PKCS7,<base64>]` envelopes, where the payload
//! is the 96-bit nonce followed by the ciphertext and tag. Every seal uses a
//! fresh random nonce.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use rivet_core::plugin::required_str;
use rivet_core::{HookKind, HookSet, Plugin, PluginError, PluginOptions};
use rivet_executor::ExecutionContext;
use serde_json::{Value, json};

pub const NAME: &str = "pkcs7";

/// Key file used when the plugin options name none, relative to the
/// project directory.
pub const DEFAULT_KEY_FILE: &str = "keys/private_key.pkcs7.key";

const ENVELOPE_PREFIX: &str = "ENC[PKCS7,";
const ENVELOPE_SUFFIX: &str = "]";

pub struct Pkcs7Plugin {
    key_file: PathBuf,
}

impl Pkcs7Plugin {
    /// Reads `key_file` from the plugin options; relative paths are resolved
    /// against the project directory.
    pub fn new(ctx: &ExecutionContext, options: &PluginOptions) -> Result<Self, PluginError> {
        let configured = match options.get("key_file") {
            None => DEFAULT_KEY_FILE,
            Some(Value::String(path)) if !path.is_empty() => path.as_str(),
            Some(other) => {
                return Err(PluginError::Load {
                    plugin: NAME.to_string(),
                    message: format!("'key_file' must be a non-empty path, got {other}"),
                });
            }
        };
        Ok(Self {
            key_file: ctx.boltdir_path().join(configured),
        })
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    async fn load_key(&self) -> Result<[u8; 32], PluginError> {
        let encoded = tokio::fs::read_to_string(&self.key_file).await.map_err(|e| {
            PluginError::execution(
                NAME,
                format!(
                    "cannot read key file {}: {e}. Run `rivet secret createkeys` first",
                    self.key_file.display()
                ),
            )
        })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PluginError::execution(NAME, format!("key file is not base64: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| PluginError::execution(NAME, "key file does not hold a 256-bit key"))
    }
}

#[async_trait]
impl Plugin for Pkcs7Plugin {
    fn name(&self) -> &str {
        NAME
    }

    fn hooks(&self) -> HookSet {
        HookSet::from([
            HookKind::SecretEncrypt,
            HookKind::SecretDecrypt,
            HookKind::SecretCreatekeys,
        ])
    }

    async fn secret_createkeys(&self, opts: Value) -> Result<Value, PluginError> {
        let force = opts.get("force").and_then(Value::as_bool).unwrap_or(false);
        if !force && tokio::fs::try_exists(&self.key_file).await? {
            return Err(PluginError::execution(
                NAME,
                format!(
                    "key file {} already exists; pass force to overwrite it",
                    self.key_file.display()
                ),
            ));
        }

        if let Some(dir) = self.key_file.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let key = generate_key()?;
        tokio::fs::write(&self.key_file, STANDARD.encode(key)).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.key_file, std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        tracing::info!(plugin = NAME, path = %self.key_file.display(), "created encryption key");
        Ok(json!({ "key_file": self.key_file.display().to_string() }))
    }

    async fn secret_encrypt(&self, opts: Value) -> Result<Value, PluginError> {
        let plaintext = required_str(&opts, "value")?;
        let key = self.load_key().await?;
        let payload = seal(&key, plaintext.as_bytes())?;
        Ok(Value::String(format!(
            "{ENVELOPE_PREFIX}{}{ENVELOPE_SUFFIX}",
            STANDARD.encode(payload)
        )))
    }

    async fn secret_decrypt(&self, opts: Value) -> Result<Value, PluginError> {
        let envelope = required_str(&opts, "value")?;
        let encoded = envelope
            .trim()
            .strip_prefix(ENVELOPE_PREFIX)
            .and_then(|rest| rest.strip_suffix(ENVELOPE_SUFFIX))
            .ok_or_else(|| {
                PluginError::execution(NAME, format!("value is not an {ENVELOPE_PREFIX}...] envelope"))
            })?;
        // Envelopes copied from files are often wrapped across lines.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let payload = STANDARD
            .decode(compact)
            .map_err(|e| PluginError::execution(NAME, format!("envelope is not base64: {e}")))?;

        let key = self.load_key().await?;
        let plaintext = open(&key, &payload)?;
        String::from_utf8(plaintext)
            .map(Value::String)
            .map_err(|_| PluginError::execution(NAME, "decrypted value is not UTF-8"))
    }
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
fn generate_key() -> Result<[u8; 32], PluginError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| PluginError::execution(NAME, "failed to generate random key"))?;
    Ok(key)
}

/// Encrypt `plaintext`, returning nonce followed by ciphertext and tag.
fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, PluginError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| PluginError::execution(NAME, "failed to create AES-256-GCM key"))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| PluginError::execution(NAME, "failed to generate random nonce"))?;

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| PluginError::execution(NAME, "AES-256-GCM encryption failed"))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + in_out.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&in_out);
    Ok(payload)
}

/// Decrypt a payload produced by [`seal`].
fn open(key: &[u8; 32], payload: &[u8]) -> Result<Vec<u8>, PluginError> {
    if payload.len() < NONCE_LEN {
        return Err(PluginError::execution(NAME, "envelope is too short"));
    }
    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| PluginError::execution(NAME, "invalid nonce"))?;

    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| PluginError::execution(NAME, "failed to create AES-256-GCM key"))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            PluginError::execution(NAME, "decryption failed: wrong key or corrupted data")
        })?;
    Ok(plaintext.to_vec())
}

/// Factory used by the registry.
pub(crate) fn build(
    ctx: Arc<ExecutionContext>,
    options: PluginOptions,
) -> Result<Arc<dyn Plugin>, PluginError> {
    Ok(Arc::new(Pkcs7Plugin::new(&ctx, &options)?))
}
