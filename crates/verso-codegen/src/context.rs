//! Generation contexts
//!
//! [`GlobalContext`] lives for one version and is shared by every file of
//! that version and by the migration pass that follows. [`CodegenContext`]
//! lives for one file and is discarded once the file is rendered.

use crate::config::GenerationConfig;
use crate::walker::CanonicalTree;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use verso_registry::{imported_symbols, ModulePath, Registry, SourceModule, Version, VersionBundle};
use verso_syntax::Module;

/// Per-version context
#[derive(Debug, Clone, Copy)]
pub struct GlobalContext<'a> {
    /// Version being generated, or the synthetic head version
    pub current_version: &'a Version,
    /// All versions
    pub bundle: &'a VersionBundle,
    /// Free-form values passed through to plugins unmodified
    pub extra: &'a BTreeMap<String, serde_json::Value>,
    /// Run configuration
    pub config: &'a GenerationConfig,
}

impl<'a> GlobalContext<'a> {
    /// Create context for a version
    #[must_use]
    pub fn new(
        current_version: &'a Version,
        bundle: &'a VersionBundle,
        extra: &'a BTreeMap<String, serde_json::Value>,
        config: &'a GenerationConfig,
    ) -> Self {
        Self {
            current_version,
            bundle,
            extra,
            config,
        }
    }

    /// Directory name of the current version
    #[inline]
    #[must_use]
    pub fn version_dir_name(&self) -> String {
        self.current_version.dir_name()
    }
}

/// Per-file context, read-only for plugins
#[derive(Debug, Clone)]
pub struct CodegenContext<'a> {
    /// Version-wide context
    pub global: GlobalContext<'a>,
    /// Registry state valid at the current version
    pub registry: &'a Registry,
    /// Dotted path of the canonical module, `__init__` stripped
    pub module_path: ModulePath,
    /// Module is a package initializer
    pub is_package: bool,
    /// Names bound at the top level of the canonical module
    pub top_level_names: BTreeSet<String>,
    /// Name bound by each `from ... import` to its resolved target
    pub imported_symbols: BTreeMap<String, ModulePath>,
    /// Dotted path of the canonical package
    pub head_package: ModulePath,
    /// Index of the version-identifying segment in module paths
    pub head_package_index: usize,
    /// Canonical file, relative to the canonical root
    pub source_path: PathBuf,
    /// Generated file
    pub output_path: PathBuf,
}

impl CodegenContext<'_> {
    /// Dotted path of the package generated for the current version
    #[must_use]
    pub fn version_package(&self) -> ModulePath {
        self.head_package
            .with_segment(self.head_package_index, self.global.version_dir_name())
    }

    /// Whether a dotted path lies inside the canonical package
    #[inline]
    #[must_use]
    pub fn is_head_path(&self, path: &ModulePath) -> bool {
        self.head_package.is_prefix_of(path)
    }
}

/// Build the context for one canonical file
///
/// Pure: reads the parsed module and the tree description, touches nothing.
#[must_use]
pub fn build_context<'a>(
    global: GlobalContext<'a>,
    registry: &'a Registry,
    tree: &CanonicalTree,
    source: SourceModule<'_>,
    source_path: PathBuf,
    output_path: PathBuf,
) -> CodegenContext<'a> {
    CodegenContext {
        global,
        registry,
        module_path: source.path.clone(),
        is_package: source.is_package,
        top_level_names: source.module.top_level_names().into_iter().collect(),
        imported_symbols: imported_symbols(&source),
        head_package: tree.package().clone(),
        head_package_index: tree.head_package_index(),
        source_path,
        output_path,
    }
}

/// Convenience for building a [`SourceModule`]
#[must_use]
pub fn source_module<'a>(path: &'a ModulePath, is_package: bool, module: &'a Module) -> SourceModule<'a> {
    SourceModule {
        path,
        is_package,
        module,
    }
}
