//! Schema and enum changes

use super::MigrationPlugin;
use crate::context::GlobalContext;
use tracing::debug;
use verso_registry::{Registry, RegistryError};

/// Applies every schema, field, validator and enum instruction
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMigration;

impl MigrationPlugin for SchemaMigration {
    fn name(&self) -> &str {
        "schema"
    }

    fn apply(&self, context: &GlobalContext<'_>, registry: &mut Registry) -> Result<(), RegistryError> {
        for (change, instruction) in context.current_version.instructions() {
            if instruction.is_module_level() {
                continue;
            }
            debug!(version = %context.current_version.value, change, %instruction, "applying schema change");
            registry.apply(change, instruction)?;
        }
        Ok(())
    }
}
