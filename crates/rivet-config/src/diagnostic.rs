// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors become [`ConfigError`]s that miette renders with the
//! offending line highlighted and, for misspelled keys and hook names, the
//! closest valid spelling.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must exceed to be offered as a
/// correction (`boltdri` -> `boltdir`, `resolve_refrence` ->
/// `resolve_reference`).
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, ready for miette to render.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(rivet::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted at this position.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: found {found}")]
    #[diagnostic(code(rivet::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the key, e.g. `project.modulepath`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(rivet::config::missing_key),
        help("add `{key} = <value>` to your rivet.toml")
    )]
    MissingKey { key: String },

    /// A `[plugin_hooks]` table named after something that is not a hook.
    #[error("unknown hook `{name}` in [plugin_hooks]")]
    #[diagnostic(
        code(rivet::config::unknown_hook),
        help("{}", did_you_mean(suggestion.as_deref(), valid_hooks))
    )]
    UnknownHook {
        name: String,
        suggestion: Option<String>,
        valid_hooks: String,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(rivet::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(rivet::config::other))]
    Other(String),
}

fn did_you_mean(suggestion: Option<&str>, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid}"),
        None => format!("valid keys: {valid}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into
/// diagnostics. `toml_sources` pairs each file name with its content so
/// spans can point into it.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let located = source_for(&error, toml_sources)
                        .and_then(|(name, content)| locate(name, content, &section, field));
                    let (span, src) = located.unzip();
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => {
                    let key = section
                        .iter()
                        .map(String::as_str)
                        .chain(std::iter::once(field.as_ref()))
                        .collect::<Vec<_>>()
                        .join(".");
                    ConfigError::MissingKey { key }
                }
                Kind::InvalidType(actual, expected) => {
                    // The last path segment is the key holding the bad value.
                    let located = section.split_last().and_then(|(field, parent)| {
                        source_for(&error, toml_sources)
                            .and_then(|(name, content)| locate(name, content, parent, field))
                    });
                    let (span, src) = located.unzip();
                    ConfigError::InvalidType {
                        key: section.join("."),
                        found: actual.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// The source text an error came from: the file named in its metadata, or
/// the only source when there is just one (inline strings carry no path).
fn source_for<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let found = match path {
        Some(path) => toml_sources.iter().find(|(name, _)| *name == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };
    found.map(|(name, content)| (name.as_str(), content.as_str()))
}

fn locate(
    name: &str,
    content: &str,
    section: &[String],
    field: &str,
) -> Option<(SourceSpan, NamedSource<String>)> {
    let offset = find_key_offset(content, section, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(name, content.to_string()),
    ))
}

/// Byte offset of `field` inside the table `section` of TOML `content`.
///
/// Nested tables are matched by their dotted header, so
/// `["plugin_hooks", "puppet_library"]` looks under
/// `[plugin_hooks.puppet_library]`. An empty section searches the top level.
/// The search stops at the next table header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let start = if section.is_empty() {
        0
    } else {
        let header = format!("[{}]", section.join("."));
        content.find(&header)? + header.len()
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if !section.is_empty() && trimmed.starts_with('[') {
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && matches!(rest.trim_start().chars().next(), Some('='))
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown` by Jaro-Winkler similarity, if any is
/// close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics as miette's graphical report.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => out.push_str(&buf),
            Err(_) => out.push_str(&format!("Error: {error}\n")),
        }
    }
    out
}

/// Print diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}
