//! Error types for the model registry
//!
//! Provides error handling for:
//! - Dotted paths ([`PathError`])
//! - Version bundle loading and validation ([`BundleError`])
//! - Registry discovery and migration instructions ([`RegistryError`])

use crate::path::ModulePath;
use std::path::PathBuf;
use verso_syntax::SyntaxError;

/// Errors related to dotted paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Relative import climbs above the top-level package
    #[error("relative import '{import}' in '{module}' goes beyond the top-level package")]
    BeyondTopLevel {
        /// Module containing the import
        module: String,
        /// Import module text
        import: String,
    },
}

/// Errors while loading or validating a version bundle
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Bundle declares no versions
    #[error("version bundle must contain at least one version")]
    Empty,

    /// Same version value declared twice
    #[error("version '{0}' is declared more than once")]
    DuplicateVersion(String),

    /// Two versions map to the same directory name
    #[error("versions '{first}' and '{second}' both map to directory '{directory}'")]
    DuplicateDirectory {
        /// Newer version
        first: String,
        /// Older version
        second: String,
        /// Shared directory name
        directory: String,
    },

    /// The oldest version has nothing older to migrate to
    #[error("the oldest version '{0}' cannot contain version changes")]
    OldestHasChanges(String),

    /// Date versions out of order
    #[error("versions must be ordered newest first, but '{newer}' is not newer than '{older}'")]
    NotChronological {
        /// Version listed first
        newer: String,
        /// Version listed after it
        older: String,
    },

    /// Bundle file extension is not one of toml, yaml, yml, json
    #[error("unsupported bundle format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Bundle file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Bundle file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Bundle file could not be deserialized
    #[error("invalid bundle {format}: {message}")]
    Format {
        /// Format name
        format: &'static str,
        /// Deserializer message
        message: String,
    },
}

impl BundleError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create deserialization error
    pub fn format(format: &'static str, message: impl ToString) -> Self {
        Self::Format {
            format,
            message: message.to_string(),
        }
    }
}

/// Registry consistency violations
///
/// Every variant that comes from a migration carries the name of the version
/// change that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Referenced schema is not in the registry
    #[error("in \"{change}\": schema {schema} was not found")]
    SchemaNotFound {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
    },

    /// Referenced enum is not in the registry
    #[error("in \"{change}\": enum {enumeration} was not found")]
    EnumNotFound {
        /// Version change name
        change: String,
        /// Enum identifier
        enumeration: ModulePath,
    },

    /// Referenced module is not in the registry
    #[error("in \"{change}\": module {module} was not found")]
    ModuleNotFound {
        /// Version change name
        change: String,
        /// Module path
        module: ModulePath,
    },

    /// Referenced field does not exist on the schema
    #[error("in \"{change}\": field \"{field}\" does not exist on {schema}")]
    FieldNotFound {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// Field name
        field: String,
    },

    /// Field being added already exists
    #[error("in \"{change}\": field \"{field}\" already exists on {schema}")]
    FieldAlreadyExists {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// Field name
        field: String,
    },

    /// Referenced validator does not exist on the schema
    #[error("in \"{change}\": validator \"{validator}\" does not exist on {schema}")]
    ValidatorNotFound {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// Validator function name
        validator: String,
    },

    /// Validator being added already exists
    #[error("in \"{change}\": validator \"{validator}\" already exists on {schema}")]
    ValidatorAlreadyExists {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// Validator function name
        validator: String,
    },

    /// Validator source is not a validator function
    #[error("in \"{change}\": invalid validator for {schema}: {message}")]
    InvalidValidator {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// What is wrong
        message: String,
    },

    /// Referenced enum member does not exist
    #[error("in \"{change}\": member \"{member}\" does not exist on {enumeration}")]
    MemberNotFound {
        /// Version change name
        change: String,
        /// Enum identifier
        enumeration: ModulePath,
        /// Member name
        member: String,
    },

    /// Schema rename collides with another class in the same module
    #[error("in \"{change}\": cannot rename {schema} to \"{name}\", the name is already taken in {module}")]
    NameTaken {
        /// Version change name
        change: String,
        /// Schema identifier
        schema: ModulePath,
        /// Requested name
        name: String,
        /// Module that already defines the name
        module: ModulePath,
    },

    /// Instruction does not change anything
    #[error("in \"{change}\": {target} already has {what}, the instruction changes nothing")]
    NoChange {
        /// Version change name
        change: String,
        /// Schema or field being changed
        target: String,
        /// Attribute that was set to its current value
        what: String,
    },

    /// Extra module import is not an import statement
    #[error("in \"{change}\": invalid import for module {module}: {message}")]
    InvalidImport {
        /// Version change name
        change: String,
        /// Module path
        module: ModulePath,
        /// What is wrong
        message: String,
    },

    /// Two discovered classes resolve to the same identifier with different kinds
    #[error("{identifier} is declared as both a schema and an enum")]
    ConflictingKinds {
        /// Class identifier
        identifier: ModulePath,
    },
}

impl RegistryError {
    /// Create validator error from a syntax error
    pub fn invalid_validator(change: &str, schema: &ModulePath, source: &SyntaxError) -> Self {
        Self::InvalidValidator {
            change: change.to_string(),
            schema: schema.clone(),
            message: source.to_string(),
        }
    }

    /// Create no-change error
    pub fn no_change(change: &str, target: impl ToString, what: impl Into<String>) -> Self {
        Self::NoChange {
            change: change.to_string(),
            target: target.to_string(),
            what: what.into(),
        }
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
