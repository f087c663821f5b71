// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in plugin catalog.
//!
//! Names every plugin Rivet knows about without a module on disk, with the
//! hooks each declares and how it enters the registry. No I/O is done here.

use std::fmt;

use rivet_core::{HookKind, HookSet};

/// How a built-in plugin enters the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Constructed and registered when the registry is built.
    Eager,
    /// Constructed on first resolution.
    Lazy,
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationMode::Eager => write!(f, "eager"),
            RegistrationMode::Lazy => write!(f, "lazy"),
        }
    }
}

/// A catalog entry describing one built-in plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub hooks: HookSet,
    pub mode: RegistrationMode,
    /// Whether an implementation is compiled into this binary. Entries
    /// without one are provided by a content module or, for external
    /// clients, registered by the host.
    pub compiled_in: bool,
}

const RESOLVE: HookSet = HookSet::EMPTY.with(HookKind::ResolveReference);

/// Returns every built-in plugin, sorted by name.
pub fn builtin_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "aws_inventory",
            description: "Generate targets from AWS EC2 instances",
            hooks: RESOLVE,
            mode: RegistrationMode::Lazy,
            compiled_in: false,
        },
        CatalogEntry {
            name: "azure_inventory",
            description: "Generate targets from Azure virtual machines",
            hooks: RESOLVE,
            mode: RegistrationMode::Lazy,
            compiled_in: false,
        },
        CatalogEntry {
            name: "pkcs7",
            description: "Encrypt and decrypt values with a project-local key",
            hooks: HookSet::EMPTY
                .with(HookKind::SecretEncrypt)
                .with(HookKind::SecretDecrypt)
                .with(HookKind::SecretCreatekeys),
            mode: RegistrationMode::Lazy,
            compiled_in: true,
        },
        CatalogEntry {
            name: "prompt",
            description: "Prompt the operator for a value",
            hooks: RESOLVE,
            mode: RegistrationMode::Lazy,
            compiled_in: true,
        },
        CatalogEntry {
            name: "puppetdb",
            description: "Query PuppetDB for targets and facts",
            hooks: RESOLVE,
            mode: RegistrationMode::Eager,
            compiled_in: false,
        },
        CatalogEntry {
            name: "task",
            description: "Run a task to resolve a value or install the runtime library",
            hooks: HookSet::EMPTY
                .with(HookKind::PuppetLibrary)
                .with(HookKind::ResolveReference)
                .with(HookKind::ValidateResolveReference),
            mode: RegistrationMode::Eager,
            compiled_in: true,
        },
        CatalogEntry {
            name: "terraform",
            description: "Read targets and values from Terraform state",
            hooks: RESOLVE,
            mode: RegistrationMode::Lazy,
            compiled_in: false,
        },
        CatalogEntry {
            name: "vault",
            description: "Look up secrets in HashiCorp Vault",
            hooks: RESOLVE,
            mode: RegistrationMode::Lazy,
            compiled_in: false,
        },
    ]
}

/// Look up a catalog entry by name.
pub fn catalog_entry(name: &str) -> Option<CatalogEntry> {
    builtin_catalog().into_iter().find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_eight_entries() {
        assert_eq!(builtin_catalog().len(), 8);
    }

    #[test]
    fn catalog_names_are_unique_and_sorted() {
        let names: Vec<&str> = builtin_catalog().iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn every_entry_declares_hooks() {
        for entry in builtin_catalog() {
            assert!(!entry.hooks.is_empty(), "{} declares no hooks", entry.name);
            assert!(!entry.description.is_empty());
        }
    }

    #[test]
    fn compiled_in_plugins_and_modes() {
        let task = catalog_entry("task").unwrap();
        assert!(task.compiled_in);
        assert_eq!(task.mode, RegistrationMode::Eager);

        let pkcs7 = catalog_entry("pkcs7").unwrap();
        assert_eq!(pkcs7.mode, RegistrationMode::Lazy);
        assert!(pkcs7.hooks.contains(HookKind::SecretCreatekeys));

        let puppetdb = catalog_entry("puppetdb").unwrap();
        assert!(!puppetdb.compiled_in);
        assert_eq!(puppetdb.mode, RegistrationMode::Eager);

        assert!(catalog_entry("nonexistent").is_none());
    }
}
