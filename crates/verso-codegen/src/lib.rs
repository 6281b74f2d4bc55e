//! Verso Codegen
//!
//! Materializes one importable package per API version from a single
//! canonical ("head") package.
//!
//! # Architecture
//!
//! ```text
//! canonical tree → walk → parse (ModuleCache) → discover → Registry
//!                                                              │
//!        ┌──────────────── per version, newest first ──────────┘
//!        ▼
//!   Pipeline (codegen plugins, &Registry) → rendered files (in memory)
//!        │
//!        ▼
//!   MigrationChain (&mut Registry) → next version
//!
//! all versions rendered → write version directories
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use verso_codegen::generate_code_for_versioned_packages;
//! use verso_registry::VersionBundle;
//!
//! let bundle = VersionBundle::from_path("versions.toml")?;
//! generate_code_for_versioned_packages("src/app/head", &bundle)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod migrations;
pub mod pipeline;
pub mod plugins;
pub mod walker;

pub use cache::{CacheStats, ModuleCache};
pub use config::GenerationConfig;
pub use context::{build_context, source_module, CodegenContext, GlobalContext};
pub use error::{CodegenError, ConfigError, GenerationError, Result};
pub use generator::{
    generate_code_for_versioned_packages, generate_code_with_plugins, GenerationReport, Generator,
    VersionReport, AUTO_GENERATION_WARNING,
};
pub use migrations::{MigrationChain, MigrationPlugin, ModuleMigration, SchemaMigration};
pub use pipeline::{CodegenPlugin, FnPlugin, Node, Pipeline};
pub use plugins::{
    ClassRebuildingPlugin, ClassRenamingPlugin, HeadImportRewritingPlugin, ImportAutoAddingPlugin,
};
pub use walker::{CanonicalTree, EntryKind, TreeEntry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
