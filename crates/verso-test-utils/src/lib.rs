//! Testing utilities for the Verso workspace
//!
//! Fixtures that lay out a canonical package on disk and shorthands for
//! building version bundles.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use verso_registry::{Instruction, ModulePath, Version, VersionBundle, VersionChange};

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once per process; `RUST_LOG` controls it
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `src/pkg/head` package in a temporary directory
///
/// `src/pkg/__init__.py` and `src/pkg/head/__init__.py` exist from the start,
/// so the canonical package is discovered as `pkg.head` and versions land in
/// `src/pkg/v...`.
pub struct CanonicalFixture {
    dir: TempDir,
}

impl CanonicalFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self { dir };
        fixture.write_raw(&fixture.package_dir().join("__init__.py"), "");
        fixture.write("__init__.py", "");
        fixture
    }

    /// Directory containing the canonical package and its versions
    pub fn package_dir(&self) -> PathBuf {
        self.dir.path().join("src").join("pkg")
    }

    /// Canonical package root
    pub fn root(&self) -> PathBuf {
        self.package_dir().join("head")
    }

    /// Write a file relative to the canonical root, creating directories
    pub fn write(&self, relative: &str, contents: &str) -> &Self {
        self.write_raw(&self.root().join(relative), contents);
        self
    }

    /// Write raw bytes relative to the canonical root
    pub fn write_bytes(&self, relative: &str, contents: &[u8]) -> &Self {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    fn write_raw(&self, path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Directory of a generated version
    pub fn version_dir(&self, dir_name: &str) -> PathBuf {
        self.package_dir().join(dir_name)
    }

    /// Read a generated file
    pub fn read_version(&self, dir_name: &str, relative: &str) -> String {
        let path = self.version_dir(dir_name).join(relative);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
    }

    /// Every file under a version directory, relative and sorted
    pub fn list_version(&self, dir_name: &str) -> Vec<String> {
        let root = self.version_dir(dir_name);
        let mut files = Vec::new();
        collect(&root, &root, &mut files);
        files.sort();
        files
    }
}

impl Default for CanonicalFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(root: &Path, dir: &Path, files: &mut Vec<String>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap();
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}

pub fn path(dotted: &str) -> ModulePath {
    dotted.parse().unwrap()
}

pub fn change(name: &str, instructions: Vec<Instruction>) -> VersionChange {
    VersionChange::new(name, instructions)
}

pub fn version(value: &str, changes: Vec<VersionChange>) -> Version {
    Version::new(value, changes)
}

/// Bundle without head changes, versions newest first
pub fn bundle(versions: Vec<Version>) -> VersionBundle {
    VersionBundle::new(vec![], versions).unwrap()
}

pub fn bundle_with_head(head_changes: Vec<VersionChange>, versions: Vec<Version>) -> VersionBundle {
    VersionBundle::new(head_changes, versions).unwrap()
}
