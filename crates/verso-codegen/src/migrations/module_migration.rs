//! Module-level changes: extra imports and deletions

use super::MigrationPlugin;
use crate::context::GlobalContext;
use tracing::debug;
use verso_registry::{Registry, RegistryError};

/// Applies `module_had` and `module_didnt_exist`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleMigration;

impl MigrationPlugin for ModuleMigration {
    fn name(&self) -> &str {
        "module"
    }

    fn apply(&self, context: &GlobalContext<'_>, registry: &mut Registry) -> Result<(), RegistryError> {
        for (change, instruction) in context.current_version.instructions() {
            if !instruction.is_module_level() {
                continue;
            }
            debug!(version = %context.current_version.value, change, %instruction, "applying module change");
            registry.apply(change, instruction)?;
        }
        Ok(())
    }
}
