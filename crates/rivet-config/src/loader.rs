// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading of `rivet.toml` through Figment.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RivetConfig;

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "rivet.toml";

const SYSTEM_CONFIG: &str = "/etc/rivet/rivet.toml";

/// Prefix of environment overrides, e.g. `RIVET_PROJECT_LOG_LEVEL`.
const ENV_PREFIX: &str = "RIVET_";

/// Candidate configuration files, lowest precedence first: system, user
/// (`$XDG_CONFIG_HOME/rivet`), then the project file in the working
/// directory. Missing files are skipped by Figment.
pub fn search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("rivet").join(CONFIG_FILE_NAME));
    }
    paths.push(
        std::env::current_dir()
            .map(|d| d.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME)),
    );
    paths
}

/// Compiled defaults, every file on the [`search_path`], then `RIVET_*`
/// environment overrides.
pub fn build_figment() -> Figment {
    search_path()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_overrides())
}

pub fn load_config() -> Result<RivetConfig, figment::Error> {
    build_figment().extract()
}

/// Load one explicit file, still honoring environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<RivetConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
}

/// Load from TOML text alone. The environment is ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<RivetConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

fn defaults() -> Figment {
    Figment::new().merge(Serialized::defaults(RivetConfig::default()))
}

/// Maps `RIVET_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first underscore after the section name is a separator, since
/// keys such as `log_level` contain underscores themselves. Plugin tables
/// are not reachable from the environment.
fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let key = key.as_str();
        ["project", "telemetry"]
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}
