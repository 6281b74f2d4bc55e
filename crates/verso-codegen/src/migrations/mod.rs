//! Migration plugin chain
//!
//! Migrations move the registry one version back in time. They run strictly
//! between versions: once with the bundle's head changes before the newest
//! version is rendered, then once after each version is rendered.

use crate::context::GlobalContext;
use verso_registry::{Registry, RegistryError};

mod module_migration;
mod schema_migration;

pub use module_migration::ModuleMigration;
pub use schema_migration::SchemaMigration;

/// Registry transformation applied between versions
pub trait MigrationPlugin: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Apply the current version's changes to the registry
    ///
    /// # Errors
    /// Returns [`RegistryError`] when a change does not fit the registry.
    fn apply(&self, context: &GlobalContext<'_>, registry: &mut Registry) -> Result<(), RegistryError>;
}

/// Built-in migrations in their default order
#[must_use]
pub fn default_migrations() -> Vec<Box<dyn MigrationPlugin>> {
    vec![Box::new(ModuleMigration), Box::new(SchemaMigration)]
}

/// Ordered migration list
#[derive(Default)]
pub struct MigrationChain {
    migrations: Vec<Box<dyn MigrationPlugin>>,
}

impl std::fmt::Debug for MigrationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.migrations.iter().map(|m| m.name()).collect();
        f.debug_struct("MigrationChain").field("migrations", &names).finish()
    }
}

impl MigrationChain {
    /// Create empty chain
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the built-in migrations
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            migrations: default_migrations(),
        }
    }

    /// Append a migration
    pub fn push(&mut self, migration: Box<dyn MigrationPlugin>) {
        self.migrations.push(migration);
    }

    /// Append a migration, builder style
    #[must_use]
    pub fn with(mut self, migration: impl MigrationPlugin + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Number of migrations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether the chain is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Run every migration in order
    ///
    /// # Errors
    /// Stops at the first failing migration. Changes already applied are not
    /// rolled back.
    pub fn run(&self, context: &GlobalContext<'_>, registry: &mut Registry) -> Result<(), RegistryError> {
        for migration in &self.migrations {
            migration.apply(context, registry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use verso_registry::{Instruction, ModuleWrapper, SchemaWrapper, Version, VersionBundle, VersionChange};
    use verso_syntax::parse_module;

    pub(crate) fn registry() -> Registry {
        let path = "pkg.head.models".parse().unwrap();
        let module = parse_module("class Widget(BaseModel):\n    name: str\n    size: int\n").unwrap();
        let mut registry = Registry::new();
        registry.insert_schema(SchemaWrapper::from_class(&path, module.classes().next().unwrap()));
        registry.insert_module(ModuleWrapper::new(path));
        registry
    }

    pub(crate) fn run(migration: &dyn MigrationPlugin, instructions: Vec<Instruction>, registry: &mut Registry) -> Result<(), RegistryError> {
        let bundle = VersionBundle::new(vec![], vec![Version::new("2000-01-01", vec![])]).unwrap();
        let version = Version::new("2001-01-01", vec![VersionChange::new("change", instructions)]);
        let extra = BTreeMap::new();
        let config = GenerationConfig::default();
        let context = GlobalContext::new(&version, &bundle, &extra, &config);
        migration.apply(&context, registry)
    }

    #[test]
    fn chain_runs_in_order() {
        let chain = MigrationChain::with_defaults();
        assert_eq!(chain.len(), 2);
        assert_eq!(format!("{chain:?}"), "MigrationChain { migrations: [\"module\", \"schema\"] }");

        let bundle = VersionBundle::new(vec![], vec![Version::new("2000-01-01", vec![])]).unwrap();
        let version = Version::new(
            "2001-01-01",
            vec![VersionChange::new(
                "drop size and models",
                vec![
                    Instruction::FieldDidntExist {
                        schema: "pkg.head.models.Widget".parse().unwrap(),
                        field: "size".into(),
                    },
                    Instruction::ModuleDidntExist {
                        module: "pkg.head.models".parse().unwrap(),
                    },
                ],
            )],
        );
        let extra = BTreeMap::new();
        let config = GenerationConfig::default();
        let context = GlobalContext::new(&version, &bundle, &extra, &config);

        let mut registry = registry();
        chain.run(&context, &mut registry).unwrap();
        assert!(registry.is_deleted(&"pkg.head.models".parse().unwrap()));
        let widget = registry.schema(&"pkg.head.models.Widget".parse().unwrap()).unwrap();
        assert_eq!(widget.fields.len(), 1);
    }

    #[test]
    fn empty_chain_is_noop() {
        let chain = MigrationChain::new();
        assert!(chain.is_empty());
    }
}
