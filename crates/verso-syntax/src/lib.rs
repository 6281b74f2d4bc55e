//! Verso Syntax
//!
//! Comment-preserving syntax trees for the Python source that versioned
//! packages are generated from.
//!
//! # Core Operations
//!
//! - **Parse**: source text into a [`Module`] ([`parse_module`])
//! - **Print**: a [`Module`] back to deterministic text ([`print_module`])
//! - **Rename**: identifier tokens inside source snippets ([`rename_identifiers`])
//!
//! # Example
//!
//! ```rust
//! use verso_syntax::{parse_module, print_module};
//!
//! let module = parse_module("class User(BaseModel):\n    name: str\n").unwrap();
//! assert_eq!(module.classes().next().unwrap().name, "User");
//! assert_eq!(print_module(&module), "class User(BaseModel):\n    name: str\n");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod ast;
pub mod error;
pub mod parser;
pub mod printer;
pub mod rename;

pub use ast::{
    Assign, ClassDef, ClassItem, ClassItemKind, Comment, Decorator, DecoratorCall, Field,
    FunctionDef, ImportAlias, ImportFrom, Module, NodeKind, Stmt, StmtKind,
};
pub use error::{SyntaxError, SyntaxResult};
pub use parser::{parse_function, parse_module, parse_statement};
pub use printer::{print_module, print_stmt};
pub use rename::rename_identifiers;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
