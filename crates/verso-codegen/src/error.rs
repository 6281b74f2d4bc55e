//! Error types for code generation
//!
//! Provides error handling for:
//! - Plugin contract violations ([`CodegenError`])
//! - Configuration loading ([`ConfigError`])
//! - Whole generation runs ([`GenerationError`])

use std::path::PathBuf;
use verso_registry::{BundleError, PathError, RegistryError};
use verso_syntax::{NodeKind, SyntaxError};

/// Errors raised by codegen plugins
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Plugin returned a node the pipeline cannot place
    #[error("plugin '{plugin}' returned a {returned} node where a {expected} node was expected")]
    PluginContract {
        /// Plugin name
        plugin: String,
        /// Kind the pipeline expected
        expected: &'static str,
        /// Kind the plugin returned
        returned: &'static str,
    },

    /// Plugin could not rewrite source text
    #[error("plugin '{plugin}' failed: {source}")]
    Syntax {
        /// Plugin name
        plugin: String,
        /// Underlying error
        #[source]
        source: SyntaxError,
    },

    /// Plugin-specific failure
    #[error("plugin '{plugin}' failed: {message}")]
    Failed {
        /// Plugin name
        plugin: String,
        /// What went wrong
        message: String,
    },
}

impl CodegenError {
    /// Create contract violation
    pub fn contract(plugin: impl Into<String>, expected: &'static str, returned: &'static str) -> Self {
        Self::PluginContract {
            plugin: plugin.into(),
            expected,
            returned,
        }
    }

    /// Create syntax failure for plugin
    pub fn syntax(plugin: impl Into<String>, source: SyntaxError) -> Self {
        Self::Syntax {
            plugin: plugin.into(),
            source,
        }
    }

    /// Create plugin-specific failure
    pub fn failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::GenerationConfig`]
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config values are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fatal errors of a generation run
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Canonical root is missing or not a directory
    #[error("cannot resolve canonical package at {path}: {reason}")]
    UnresolvableSource {
        /// Requested root
        path: PathBuf,
        /// Why it cannot be used
        reason: String,
    },

    /// File name cannot be turned into a module path
    #[error("cannot derive a module path for {path}")]
    InvalidModulePath {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: PathError,
    },

    /// Canonical source does not parse
    #[error("syntax error in {path}: {source}")]
    Syntax {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: SyntaxError,
    },

    /// Registry consistency violation
    #[error("registry error while generating {version}: {source}")]
    Registry {
        /// Version being generated, `head` for the normalization pass
        version: String,
        /// Underlying error
        #[source]
        source: RegistryError,
    },

    /// Plugin contract violation
    #[error("codegen failed for {path}: {source}")]
    Codegen {
        /// File being generated
        path: PathBuf,
        /// Underlying error
        #[source]
        source: CodegenError,
    },

    /// Output would overwrite the canonical package
    #[error("output directory {0} is the canonical package")]
    OutputIsSource(PathBuf),

    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failure
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Version bundle is invalid
    #[error("version bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Configuration is invalid
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl GenerationError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create unresolvable-source error
    pub fn unresolvable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnresolvableSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create registry error for a version
    pub fn registry(version: impl Into<String>, source: RegistryError) -> Self {
        Self::Registry {
            version: version.into(),
            source,
        }
    }
}

/// Name of a node kind as returned by plugins
#[must_use]
pub(crate) fn node_name(kind: Option<NodeKind>) -> &'static str {
    kind.map_or("removed", NodeKind::name)
}

/// Result type for generation runs
pub type Result<T> = std::result::Result<T, GenerationError>;
