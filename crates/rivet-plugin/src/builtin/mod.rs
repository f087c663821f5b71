// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugins compiled into Rivet.

pub mod pkcs7;
pub mod prompt;
pub mod task;

use std::sync::Arc;

pub use pkcs7::Pkcs7Plugin;
pub use prompt::PromptPlugin;
pub use task::TaskPlugin;

use crate::catalog::{RegistrationMode, builtin_catalog};
use crate::registry::PluginRegistry;

/// Register every compiled-in plugin the way the catalog lists it: eager
/// plugins are constructed now, lazy ones on first resolution.
pub fn register_builtins(registry: &mut PluginRegistry) {
    for entry in builtin_catalog().into_iter().filter(|e| e.compiled_in) {
        match (entry.name, entry.mode) {
            (task::NAME, RegistrationMode::Eager) => {
                let ctx = Arc::clone(registry.context());
                registry.register(Arc::new(TaskPlugin::new(ctx)));
            }
            (prompt::NAME, RegistrationMode::Lazy) => registry.register_lazy(prompt::NAME, prompt::build),
            (pkcs7::NAME, RegistrationMode::Lazy) => registry.register_lazy(pkcs7::NAME, pkcs7::build),
            (name, mode) => {
                tracing::warn!(plugin = %name, mode = %mode, "no compiled-in constructor for catalog entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rivet_core::HookKind;
    use rivet_executor::ExecutionContext;

    use super::*;
    use crate::catalog::catalog_entry;
    use crate::registry::PluginConfigs;

    #[tokio::test]
    async fn builtins_match_catalog_hooks() {
        let ctx = Arc::new(ExecutionContext::builder("/tmp/project").build());
        let mut registry = PluginRegistry::new(ctx, PluginConfigs::new());
        register_builtins(&mut registry);

        assert!(registry.get(task::NAME).is_some(), "task is eager");
        assert!(registry.get(pkcs7::NAME).is_none(), "pkcs7 is lazy");
        assert_eq!(registry.names(), vec!["pkcs7", "prompt", "task"]);

        for name in registry.names() {
            let plugin = registry.resolve(&name).await.unwrap().unwrap();
            assert_eq!(plugin.hooks(), catalog_entry(&name).unwrap().hooks);
        }
        assert!(
            registry
                .get(pkcs7::NAME)
                .unwrap()
                .hooks()
                .contains(HookKind::SecretCreatekeys)
        );
    }
}
