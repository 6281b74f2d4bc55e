//! Verso Registry
//!
//! The in-memory model of every versioned schema, enum and module, and the
//! version history that mutates it.
//!
//! # Core Types
//!
//! - [`Registry`]: live wrappers keyed by identifier, discovered from the
//!   canonical tree with [`discover`]
//! - [`VersionBundle`]: versions newest first, each carrying the
//!   [`VersionChange`]s that lead to the version before it
//! - [`Instruction`]: one registry mutation, applied with [`Registry::apply`]
//!
//! # Lifecycle
//!
//! ```text
//! canonical tree ──discover──▶ Registry ──apply(head changes)──▶ render newest
//!                                   ▲                                  │
//!                                   └────── apply(version changes) ◀───┘
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod discovery;
pub mod error;
pub mod instruction;
pub mod path;
pub mod registry;
pub mod version;
pub mod wrappers;

pub use discovery::{discover, imported_symbols, ClassKind, DiscoveryOptions, SourceModule};
pub use error::{BundleError, PathError, RegistryError, Result};
pub use instruction::{EnumMember, ImportRequirement, Instruction};
pub use path::ModulePath;
pub use registry::Registry;
pub use version::{version_dir_name, Version, VersionBundle, VersionChange, HEAD_VERSION};
pub use wrappers::{
    EnumWrapper, FieldDefinition, ModuleWrapper, SchemaWrapper, ValidatorDefinition,
    FIELD_VALIDATOR_DECORATORS, MODEL_VALIDATOR_DECORATORS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
