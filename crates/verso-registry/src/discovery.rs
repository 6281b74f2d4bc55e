//! Static registry discovery
//!
//! Builds the initial [`Registry`] from parsed canonical modules without
//! executing them. A class is a schema or an enum when one of its bases is a
//! configured base class, or is itself a discovered schema or enum (defined
//! in the same module or imported with `from ... import`).

use crate::error::{RegistryError, Result};
use crate::path::ModulePath;
use crate::registry::Registry;
use crate::wrappers::{EnumWrapper, ModuleWrapper, SchemaWrapper};
use std::collections::BTreeMap;
use tracing::debug;
use verso_syntax::{ClassDef, Module, StmtKind};

/// Kind of a discovered class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Data schema
    Schema,
    /// Enumeration
    Enum,
}

/// Base class names that mark schemas and enums
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions<'a> {
    /// Last dotted segment of schema base classes
    pub schema_bases: &'a [String],
    /// Last dotted segment of enum base classes
    pub enum_bases: &'a [String],
}

/// Parsed canonical module
#[derive(Debug, Clone, Copy)]
pub struct SourceModule<'a> {
    /// Dotted module path, `__init__` stripped
    pub path: &'a ModulePath,
    /// Module is a package initializer
    pub is_package: bool,
    /// Parsed source
    pub module: &'a Module,
}

/// Names bound by `from ... import` statements, mapped to their targets
///
/// Imports that cannot be resolved are skipped.
#[must_use]
pub fn imported_symbols(source: &SourceModule<'_>) -> BTreeMap<String, ModulePath> {
    let mut symbols = BTreeMap::new();
    for stmt in &source.module.body {
        let StmtKind::ImportFrom(from) = &stmt.kind else {
            continue;
        };
        let Ok(target_module) = source.path.resolve_import(source.is_package, &from.module) else {
            continue;
        };
        for alias in from.names.iter().filter(|a| a.name != "*") {
            symbols.insert(alias.bound_name().to_string(), target_module.child(&alias.name));
        }
    }
    symbols
}

/// Discover every schema, enum and module of the canonical tree
///
/// # Errors
/// Fails when one identifier is classified as both a schema and an enum.
pub fn discover(sources: &[SourceModule<'_>], options: DiscoveryOptions<'_>) -> Result<Registry> {
    let imports: Vec<BTreeMap<String, ModulePath>> = sources.iter().map(imported_symbols).collect();
    let mut kinds: BTreeMap<ModulePath, ClassKind> = BTreeMap::new();

    // bases may be declared in modules visited later, so iterate to a fixpoint
    loop {
        let mut changed = false;
        for (source, imports) in sources.iter().zip(&imports) {
            for class in source.module.classes() {
                let identifier = source.path.child(&class.name);
                let Some(kind) = classify(class, source.path, imports, &kinds, options) else {
                    continue;
                };
                match kinds.get(&identifier) {
                    Some(existing) if *existing != kind => {
                        return Err(RegistryError::ConflictingKinds { identifier });
                    }
                    Some(_) => {}
                    None => {
                        kinds.insert(identifier, kind);
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut registry = Registry::new();
    for source in sources {
        registry.insert_module(ModuleWrapper::new(source.path.clone()));
        for class in source.module.classes() {
            match kinds.get(&source.path.child(&class.name)) {
                Some(ClassKind::Schema) => registry.insert_schema(SchemaWrapper::from_class(source.path, class)),
                Some(ClassKind::Enum) => registry.insert_enum(EnumWrapper::from_class(source.path, class)),
                None => {}
            }
        }
    }

    debug!(
        modules = sources.len(),
        schemas = registry.schemas().count(),
        enums = registry.enums().count(),
        "Discovered registry"
    );
    Ok(registry)
}

fn classify(
    class: &ClassDef,
    module: &ModulePath,
    imports: &BTreeMap<String, ModulePath>,
    kinds: &BTreeMap<ModulePath, ClassKind>,
    options: DiscoveryOptions<'_>,
) -> Option<ClassKind> {
    for base in class.bases.iter().filter(|b| !b.contains('=')) {
        let base = base.split('[').next().unwrap_or(base).trim();
        let last = base.rsplit('.').next().unwrap_or(base);

        if options.schema_bases.iter().any(|b| b == last) {
            return Some(ClassKind::Schema);
        }
        if options.enum_bases.iter().any(|b| b == last) {
            return Some(ClassKind::Enum);
        }

        let mut segments = base.split('.');
        let Some(head) = segments.next() else {
            continue;
        };
        let rest: Vec<&str> = segments.collect();
        let target = match imports.get(head) {
            Some(target) => target.extend(rest.as_slice()),
            None if rest.is_empty() => module.child(head),
            None => continue,
        };
        if let Some(kind) = kinds.get(&target) {
            return Some(*kind);
        }
    }
    None
}
