// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rivet.toml` loading and validation.
//!
//! Unknown keys are rejected, values are checked after deserialization, and
//! every problem is reported as a [`ConfigError`] that points at the
//! offending line.
//!
//! ```no_run
//! let config = match rivet_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         rivet_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("modulepath: {:?}", config.project.modulepath);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{CONFIG_FILE_NAME, load_config, load_config_from_path, load_config_from_str};
pub use model::RivetConfig;

/// Load from the standard search path plus environment, then validate.
pub fn load_and_validate() -> Result<RivetConfig, Vec<ConfigError>> {
    checked(loader::load_config(), collect_toml_sources)
}

/// Load one explicit file, then validate.
pub fn load_and_validate_path(path: &Path) -> Result<RivetConfig, Vec<ConfigError>> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    checked(loader::load_config_from_path(path), || {
        read_sources(std::iter::once(path.to_path_buf()))
    })
}

/// Load TOML text, then validate. Diagnostics name the source `<inline>`.
pub fn load_and_validate_str(toml_content: &str) -> Result<RivetConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Name and content of every configuration file on the search path that
/// exists, for pointing diagnostics into.
pub fn collect_toml_sources() -> Vec<(String, String)> {
    read_sources(loader::search_path())
}

/// Sources are only read when extraction failed.
fn checked(
    loaded: Result<RivetConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<RivetConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn read_sources(paths: impl IntoIterator<Item = std::path::PathBuf>) -> Vec<(String, String)> {
    paths
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
