//! Canonical tree traversal
//!
//! Lists the canonical package in a deterministic order so it can be mirrored
//! into a version directory: directories, source files (with their module
//! paths) and other files, sorted by file name, excluded directories pruned.

use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use std::path::{Path, PathBuf};
use verso_registry::ModulePath;
use walkdir::WalkDir;

const PACKAGE_INITIALIZER: &str = "__init__";

/// Kind of a canonical tree entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Directory to recreate
    Directory,
    /// Source file to parse and transform
    Source {
        /// Dotted module path, `__init__` stripped
        module: ModulePath,
        /// File is a package initializer
        is_package: bool,
    },
    /// Any other file, copied byte for byte
    Other,
}

/// Entry of the canonical tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the canonical root
    pub relative: PathBuf,
    /// What to do with it
    pub kind: EntryKind,
}

/// The canonical ("head") package on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTree {
    root: PathBuf,
    package: ModulePath,
}

impl CanonicalTree {
    /// Create tree for a root directory with a known dotted package name
    ///
    /// # Errors
    /// Returns [`GenerationError::UnresolvableSource`] when the root is not an
    /// existing directory or the package name is empty.
    pub fn new(root: impl Into<PathBuf>, package: ModulePath) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(GenerationError::unresolvable(&root, "not an existing directory"));
        }
        if package.is_empty() {
            return Err(GenerationError::unresolvable(&root, "empty package name"));
        }
        Ok(Self { root, package })
    }

    /// Create tree for a root directory, deriving the package name
    ///
    /// Parent directories containing an `__init__.py` are treated as enclosing
    /// packages: `src/pkg/head` with `src/pkg/__init__.py` is `pkg.head`.
    ///
    /// # Errors
    /// Returns [`GenerationError::UnresolvableSource`] when the root is not an
    /// existing directory or a directory name is not a valid identifier.
    pub fn discover(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(GenerationError::unresolvable(&root, "not an existing directory"));
        }

        let mut segments = Vec::new();
        let mut current = Some(root.as_path());
        while let Some(dir) = current {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                break;
            };
            segments.push(name.to_string());
            current = dir
                .parent()
                .filter(|parent| parent.join(format!("{PACKAGE_INITIALIZER}.py")).is_file());
        }
        segments.reverse();

        let package: ModulePath = segments
            .join(".")
            .parse()
            .map_err(|e| GenerationError::unresolvable(&root, format!("invalid package name: {e}")))?;
        Self::new(root, package)
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dotted package name
    #[inline]
    #[must_use]
    pub fn package(&self) -> &ModulePath {
        &self.package
    }

    /// Index of the package's own segment in module paths of the tree
    #[inline]
    #[must_use]
    pub fn head_package_index(&self) -> usize {
        self.package.len() - 1
    }

    /// Directory a version package is written to
    ///
    /// A sibling of the canonical root unless an output root is configured.
    #[must_use]
    pub fn version_dir(&self, dir_name: &str, config: &GenerationConfig) -> PathBuf {
        match (&config.output_root, self.root.parent()) {
            (Some(output_root), _) => output_root.join(dir_name),
            (None, Some(parent)) => parent.join(dir_name),
            (None, None) => PathBuf::from(dir_name),
        }
    }

    /// List the tree in sorted order
    ///
    /// # Errors
    /// Fails on traversal errors or source files whose names are not valid
    /// module names.
    pub fn walk(&self, config: &GenerationConfig) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry.file_name().to_str().is_some_and(|name| config.is_excluded(name)))
            });

        for entry in walker {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();

            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else if config.is_source(&relative) {
                let (module, is_package) = self.module_path(&relative)?;
                EntryKind::Source { module, is_package }
            } else {
                EntryKind::Other
            };
            entries.push(TreeEntry { relative, kind });
        }
        Ok(entries)
    }

    fn module_path(&self, relative: &Path) -> Result<(ModulePath, bool)> {
        let invalid = |source| GenerationError::InvalidModulePath {
            path: relative.to_path_buf(),
            source,
        };
        let mut segments: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let is_package = segments.last().is_some_and(|s| s == PACKAGE_INITIALIZER);
        if is_package {
            segments.pop();
        }

        let suffix: ModulePath = segments.join(".").parse().map_err(invalid)?;
        Ok((self.package.extend(suffix.segments()), is_package))
    }
}
