//! Migration instructions
//!
//! Each instruction describes how the registry looked one version earlier
//! than the version that contains it. Instructions are data; the registry
//! interprets them in [`crate::Registry::apply`].

use crate::path::ModulePath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use verso_syntax::{ImportAlias, ImportFrom, Stmt, StmtKind};

/// Single registry mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// The schema was called `name` in the older version
    SchemaHad {
        /// Schema identifier
        schema: ModulePath,
        /// Older class name
        name: String,
    },

    /// The field existed in the older version
    FieldExistedAs {
        /// Schema identifier
        schema: ModulePath,
        /// Field name
        field: String,
        /// Annotation source text
        annotation: String,
        /// Default value source text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        /// Import the annotation needs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        import: Option<ImportRequirement>,
    },

    /// The field did not exist in the older version
    FieldDidntExist {
        /// Schema identifier
        schema: ModulePath,
        /// Field name
        field: String,
    },

    /// The field looked different in the older version
    FieldHad {
        /// Schema identifier
        schema: ModulePath,
        /// Current field name
        field: String,
        /// Older field name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Older annotation
        #[serde(default, skip_serializing_if = "Option::is_none")]
        annotation: Option<String>,
        /// Older default value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },

    /// The validator existed in the older version
    ValidatorExistedAs {
        /// Schema identifier
        schema: ModulePath,
        /// Decorated function source
        source: String,
    },

    /// The validator did not exist in the older version
    ValidatorDidntExist {
        /// Schema identifier
        schema: ModulePath,
        /// Validator function name
        validator: String,
    },

    /// The enum had these members (added or with these values)
    EnumHadMembers {
        /// Enum identifier
        #[serde(rename = "enum")]
        enumeration: ModulePath,
        /// Members and their value source text
        members: Vec<EnumMember>,
    },

    /// The enum did not have these members
    EnumDidntHaveMembers {
        /// Enum identifier
        #[serde(rename = "enum")]
        enumeration: ModulePath,
        /// Member names
        members: Vec<String>,
    },

    /// The module had an extra import statement
    ModuleHad {
        /// Module path
        module: ModulePath,
        /// Import statement source
        import: String,
    },

    /// The module did not exist in the older version
    ModuleDidntExist {
        /// Module path
        module: ModulePath,
    },
}

impl Instruction {
    /// Whether the instruction targets a module rather than a class
    #[must_use]
    pub fn is_module_level(&self) -> bool {
        matches!(
            self,
            Instruction::ModuleHad { .. } | Instruction::ModuleDidntExist { .. }
        )
    }

    /// Identifier of the schema, enum or module the instruction targets
    #[must_use]
    pub fn target(&self) -> &ModulePath {
        match self {
            Instruction::SchemaHad { schema, .. }
            | Instruction::FieldExistedAs { schema, .. }
            | Instruction::FieldDidntExist { schema, .. }
            | Instruction::FieldHad { schema, .. }
            | Instruction::ValidatorExistedAs { schema, .. }
            | Instruction::ValidatorDidntExist { schema, .. } => schema,
            Instruction::EnumHadMembers { enumeration, .. }
            | Instruction::EnumDidntHaveMembers { enumeration, .. } => enumeration,
            Instruction::ModuleHad { module, .. } | Instruction::ModuleDidntExist { module } => {
                module
            }
        }
    }

    /// Operation name as it appears in bundle files
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Instruction::SchemaHad { .. } => "schema_had",
            Instruction::FieldExistedAs { .. } => "field_existed_as",
            Instruction::FieldDidntExist { .. } => "field_didnt_exist",
            Instruction::FieldHad { .. } => "field_had",
            Instruction::ValidatorExistedAs { .. } => "validator_existed_as",
            Instruction::ValidatorDidntExist { .. } => "validator_didnt_exist",
            Instruction::EnumHadMembers { .. } => "enum_had_members",
            Instruction::EnumDidntHaveMembers { .. } => "enum_didnt_have_members",
            Instruction::ModuleHad { .. } => "module_had",
            Instruction::ModuleDidntExist { .. } => "module_didnt_exist",
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op(), self.target())
    }
}

/// Enum member with its value as source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Member name
    pub name: String,
    /// Value source text, e.g. `"red"` or `3`
    pub value: String,
}

impl EnumMember {
    /// Create member
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Import a field annotation depends on
///
/// With `name` set this is `from module import name [as alias]`, otherwise
/// `import module [as alias]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportRequirement {
    /// Module to import from
    pub module: String,
    /// Imported name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bound alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ImportRequirement {
    /// `from module import name`
    #[must_use]
    pub fn from_module(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: Some(name.into()),
            alias: None,
        }
    }

    /// Name this import binds in the importing module
    #[must_use]
    pub fn bound_name(&self) -> &str {
        match (&self.alias, &self.name) {
            (Some(alias), _) => alias,
            (None, Some(name)) => name,
            (None, None) => self.module.split('.').next().unwrap_or(&self.module),
        }
    }

    /// Import statement for this requirement
    #[must_use]
    pub fn to_stmt(&self) -> Stmt {
        let entry = |name: &str| ImportAlias {
            name: name.to_string(),
            alias: self.alias.clone(),
        };
        let kind = match &self.name {
            Some(name) => StmtKind::ImportFrom(ImportFrom::new(self.module.clone(), vec![entry(name)])),
            None => StmtKind::Import(vec![entry(&self.module)]),
        };
        Stmt::new(kind)
    }
}
