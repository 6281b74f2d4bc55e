//! Versioned package generation
//!
//! A run reads the canonical tree once, discovers the registry, normalizes it
//! with the bundle's head changes and then walks the versions newest first:
//! render the version package from the registry, then migrate the registry
//! one version back. Every version is rendered in memory before anything is
//! written, so a fatal error leaves the filesystem untouched.

use crate::cache::ModuleCache;
use crate::config::GenerationConfig;
use crate::context::{build_context, source_module, GlobalContext};
use crate::error::{GenerationError, Result};
use crate::migrations::MigrationChain;
use crate::pipeline::Pipeline;
use crate::walker::{CanonicalTree, EntryKind, TreeEntry};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use verso_registry::{discover, DiscoveryOptions, ModulePath, Registry, Version, VersionBundle, HEAD_VERSION};
use verso_syntax::{print_module, Module};

/// Header written at the top of every generated source file
pub const AUTO_GENERATION_WARNING: &str =
    "# THIS FILE WAS AUTO-GENERATED BY CADWYN. DO NOT EVER TRY TO EDIT IT BY HAND\n\n";

/// Summary of one generated version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    /// Version value
    pub version: String,
    /// Directory the version package was written to
    pub directory: PathBuf,
    /// Generated source files
    pub files_generated: usize,
    /// Files copied byte for byte
    pub files_copied: usize,
    /// Source modules not emitted because they were deleted
    pub modules_skipped: usize,
}

/// Summary of a generation run, newest version first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Per-version summaries
    pub versions: Vec<VersionReport>,
}

impl GenerationReport {
    /// Total number of generated source files
    #[must_use]
    pub fn files_generated(&self) -> usize {
        self.versions.iter().map(|v| v.files_generated).sum()
    }
}

/// Canonical source file, parsed
struct LoadedSource {
    relative: PathBuf,
    module_path: ModulePath,
    is_package: bool,
    parsed: Arc<Module>,
}

/// One filesystem action of the write phase
enum PlannedEntry {
    Directory(PathBuf),
    File { path: PathBuf, contents: String },
    Copy { from: PathBuf, to: PathBuf },
}

/// Version directory rendered in memory
struct PlannedVersion {
    directory: PathBuf,
    entries: Vec<PlannedEntry>,
    report: VersionReport,
}

/// Generation driver
///
/// Holds the configuration, plugins and parse cache; a single generator can
/// run any number of times.
#[derive(Debug)]
pub struct Generator {
    config: GenerationConfig,
    pipeline: Pipeline,
    migrations: MigrationChain,
    extra: BTreeMap<String, serde_json::Value>,
    cache: ModuleCache,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl Generator {
    /// Create generator with the built-in plugins and migrations
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            cache: ModuleCache::new(config.cache_capacity.max(1)),
            config,
            pipeline: Pipeline::with_defaults(),
            migrations: MigrationChain::with_defaults(),
            extra: BTreeMap::new(),
        }
    }

    /// Replace the codegen pipeline
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replace the migration chain
    #[must_use]
    pub fn with_migrations(mut self, migrations: MigrationChain) -> Self {
        self.migrations = migrations;
        self
    }

    /// Add a value passed through to plugins
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Run configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Parse cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Generate one package per version of the bundle
    ///
    /// # Errors
    /// Any error is fatal and is returned before anything is written, except
    /// filesystem failures of the write phase itself.
    pub fn generate(&self, tree: &CanonicalTree, bundle: &VersionBundle) -> Result<GenerationReport> {
        self.config.validate()?;

        let entries = tree.walk(&self.config)?;
        let sources = self.load_sources(tree, &entries)?;
        let mut registry = self.discover(&sources)?;

        let head = bundle.head_version();
        self.migrate(&head, bundle, &mut registry)?;

        let mut planned = Vec::with_capacity(bundle.len());
        for version in bundle {
            planned.push(self.render_version(tree, bundle, version, &entries, &sources, &registry)?);
            self.migrate(version, bundle, &mut registry)?;
        }

        let mut report = GenerationReport::default();
        for version in planned {
            write_version(&version, self.config.clean_output)?;
            report.versions.push(version.report);
        }

        self.cache.invalidate_all();
        info!(
            package = %tree.package(),
            versions = report.versions.len(),
            files = report.files_generated(),
            "generation complete"
        );
        Ok(report)
    }

    fn load_sources(&self, tree: &CanonicalTree, entries: &[TreeEntry]) -> Result<Vec<LoadedSource>> {
        let mut sources = Vec::new();
        for entry in entries {
            let EntryKind::Source { module, is_package } = &entry.kind else {
                continue;
            };
            let path = tree.root().join(&entry.relative);
            let text = fs::read_to_string(&path).map_err(|e| GenerationError::io_error(&path, e))?;
            let parsed = self
                .cache
                .parse(&text)
                .map_err(|source| GenerationError::Syntax { path: path.clone(), source })?;
            sources.push(LoadedSource {
                relative: entry.relative.clone(),
                module_path: module.clone(),
                is_package: *is_package,
                parsed,
            });
        }
        Ok(sources)
    }

    fn discover(&self, sources: &[LoadedSource]) -> Result<Registry> {
        let modules: Vec<_> = sources
            .iter()
            .map(|s| source_module(&s.module_path, s.is_package, &s.parsed))
            .collect();
        let options = DiscoveryOptions {
            schema_bases: &self.config.schema_bases,
            enum_bases: &self.config.enum_bases,
        };
        discover(&modules, options).map_err(|e| GenerationError::registry(HEAD_VERSION, e))
    }

    fn migrate(&self, version: &Version, bundle: &VersionBundle, registry: &mut Registry) -> Result<()> {
        let global = GlobalContext::new(version, bundle, &self.extra, &self.config);
        self.migrations
            .run(&global, registry)
            .map_err(|e| GenerationError::registry(&version.value, e))
    }

    fn render_version(
        &self,
        tree: &CanonicalTree,
        bundle: &VersionBundle,
        version: &Version,
        entries: &[TreeEntry],
        sources: &[LoadedSource],
        registry: &Registry,
    ) -> Result<PlannedVersion> {
        let directory = tree.version_dir(&version.dir_name(), &self.config);
        if directory == tree.root() {
            return Err(GenerationError::OutputIsSource(directory));
        }
        info!(version = %version.value, directory = %directory.display(), "generating version");

        let global = GlobalContext::new(version, bundle, &self.extra, &self.config);
        let mut report = VersionReport {
            version: version.value.clone(),
            directory: directory.clone(),
            files_generated: 0,
            files_copied: 0,
            modules_skipped: 0,
        };
        let mut planned = Vec::with_capacity(entries.len());
        let mut sources = sources.iter();

        for entry in entries {
            let target = directory.join(&entry.relative);
            match &entry.kind {
                EntryKind::Directory => planned.push(PlannedEntry::Directory(target)),
                EntryKind::Other => {
                    report.files_copied += 1;
                    planned.push(PlannedEntry::Copy {
                        from: tree.root().join(&entry.relative),
                        to: target,
                    });
                }
                EntryKind::Source { .. } => {
                    // sources were loaded in walk order
                    let Some(source) = sources.find(|s| s.relative == entry.relative) else {
                        continue;
                    };
                    if registry.is_deleted(&source.module_path) {
                        debug!(module = %source.module_path, "module deleted, skipping");
                        report.modules_skipped += 1;
                        continue;
                    }

                    let context = build_context(
                        global,
                        registry,
                        tree,
                        source_module(&source.module_path, source.is_package, &source.parsed),
                        entry.relative.clone(),
                        target.clone(),
                    );
                    let module = self
                        .pipeline
                        .run(Module::clone(&source.parsed), &context)
                        .map_err(|source| GenerationError::Codegen {
                            path: entry.relative.clone(),
                            source,
                        })?;
                    debug!(file = %target.display(), "rendered");

                    report.files_generated += 1;
                    planned.push(PlannedEntry::File {
                        path: target,
                        contents: format!("{AUTO_GENERATION_WARNING}{}", print_module(&module)),
                    });
                }
            }
        }

        Ok(PlannedVersion {
            directory,
            entries: planned,
            report,
        })
    }
}

fn write_version(version: &PlannedVersion, clean_output: bool) -> Result<()> {
    let directory = &version.directory;
    if clean_output && directory.exists() {
        fs::remove_dir_all(directory).map_err(|e| GenerationError::io_error(directory, e))?;
    }
    create_dir(directory)?;

    for entry in &version.entries {
        match entry {
            PlannedEntry::Directory(path) => create_dir(path)?,
            PlannedEntry::File { path, contents } => {
                fs::write(path, contents).map_err(|e| GenerationError::io_error(path, e))?;
            }
            PlannedEntry::Copy { from, to } => {
                fs::copy(from, to).map_err(|e| GenerationError::io_error(to, e))?;
            }
        }
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| GenerationError::io_error(path, e))
}

/// Generate one sibling package per version for the package rooted at `root`
///
/// The dotted package name is derived from the enclosing `__init__.py` files.
/// Runs the built-in plugins and migrations with the default configuration;
/// use [`generate_code_with_plugins`] or a [`Generator`] to customize them.
///
/// # Errors
/// See [`Generator::generate`]; additionally fails with
/// [`GenerationError::UnresolvableSource`] when `root` is not a directory.
pub fn generate_code_for_versioned_packages(root: impl AsRef<Path>, bundle: &VersionBundle) -> Result<()> {
    let tree = CanonicalTree::discover(root.as_ref())?;
    Generator::default().generate(&tree, bundle)?;
    Ok(())
}

/// Like [`generate_code_for_versioned_packages`], with caller-supplied
/// codegen plugins, migration plugins and extension values
///
/// # Errors
/// Same as [`generate_code_for_versioned_packages`].
pub fn generate_code_with_plugins(
    root: impl AsRef<Path>,
    bundle: &VersionBundle,
    pipeline: Pipeline,
    migrations: MigrationChain,
    extra: BTreeMap<String, serde_json::Value>,
) -> Result<()> {
    let tree = CanonicalTree::discover(root.as_ref())?;
    let generator = extra.into_iter().fold(
        Generator::default().with_pipeline(pipeline).with_migrations(migrations),
        |generator, (key, value)| generator.with_extra(key, value),
    );
    generator.generate(&tree, bundle)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verso_registry::VersionChange;

    fn package() -> (tempfile::TempDir, CanonicalTree) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("head");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("__init__.py"), "").unwrap();
        fs::write(root.join("models.py"), "class Widget(BaseModel):\n    name: str\n").unwrap();
        let tree = CanonicalTree::new(&root, "head".parse().unwrap()).unwrap();
        (dir, tree)
    }

    #[test]
    fn renders_every_version_with_header() {
        let (dir, tree) = package();
        let bundle = VersionBundle::new(
            vec![],
            vec![Version::new("2001-01-01", vec![]), Version::new("2000-01-01", vec![])],
        )
        .unwrap();

        let generator = Generator::default();
        let report = generator.generate(&tree, &bundle).unwrap();
        assert_eq!(report.versions.len(), 2);
        assert_eq!(report.files_generated(), 4);

        let text = fs::read_to_string(dir.path().join("v2000_01_01").join("models.py")).unwrap();
        assert_eq!(text, format!("{AUTO_GENERATION_WARNING}class Widget(BaseModel):\n    name: str\n"));
        generator.cache().sync();
        assert_eq!(generator.cache().stats().entry_count, 0);
    }

    #[test]
    fn registry_errors_name_the_version() {
        let (dir, tree) = package();
        let bundle = VersionBundle::new(
            vec![],
            vec![
                Version::new(
                    "2001-01-01",
                    vec![VersionChange::new(
                        "drop missing",
                        vec![verso_registry::Instruction::FieldDidntExist {
                            schema: "head.models.Widget".parse().unwrap(),
                            field: "missing".into(),
                        }],
                    )],
                ),
                Version::new("2000-01-01", vec![]),
            ],
        )
        .unwrap();

        let err = Generator::default().generate(&tree, &bundle).unwrap_err();
        assert!(matches!(err, GenerationError::Registry { ref version, .. } if version == "2001-01-01"));
        assert!(!dir.path().join("v2001_01_01").exists());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (_dir, tree) = package();
        let bundle = VersionBundle::new(vec![], vec![Version::new("1", vec![])]).unwrap();
        let config = GenerationConfig {
            cache_capacity: 0,
            ..GenerationConfig::default()
        };
        let err = Generator::new(config).generate(&tree, &bundle).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }
}
