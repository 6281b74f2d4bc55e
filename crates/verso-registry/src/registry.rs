//! The model registry
//!
//! Holds one live wrapper per canonical schema, enum and module, keyed by
//! identifier. Codegen reads it through `&Registry`; migrations mutate it
//! through [`Registry::apply`].

use crate::error::{RegistryError, Result};
use crate::instruction::{EnumMember, ImportRequirement, Instruction};
use crate::path::ModulePath;
use crate::wrappers::{EnumWrapper, FieldDefinition, ModuleWrapper, SchemaWrapper, ValidatorDefinition};
use std::collections::BTreeMap;
use verso_syntax::{parse_function, parse_statement, NodeKind};

/// All wrappers of a generation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    schemas: BTreeMap<ModulePath, SchemaWrapper>,
    enums: BTreeMap<ModulePath, EnumWrapper>,
    modules: BTreeMap<ModulePath, ModuleWrapper>,
}

impl Registry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous one with the same identifier
    pub fn insert_schema(&mut self, schema: SchemaWrapper) {
        self.schemas.insert(schema.identifier.clone(), schema);
    }

    /// Register an enum, replacing any previous one with the same identifier
    pub fn insert_enum(&mut self, enumeration: EnumWrapper) {
        self.enums.insert(enumeration.identifier.clone(), enumeration);
    }

    /// Register a module
    pub fn insert_module(&mut self, module: ModuleWrapper) {
        self.modules.insert(module.path.clone(), module);
    }

    /// Schema by identifier
    #[must_use]
    pub fn schema(&self, identifier: &ModulePath) -> Option<&SchemaWrapper> {
        self.schemas.get(identifier)
    }

    /// Enum by identifier
    #[must_use]
    pub fn enumeration(&self, identifier: &ModulePath) -> Option<&EnumWrapper> {
        self.enums.get(identifier)
    }

    /// Module by path
    #[must_use]
    pub fn module(&self, path: &ModulePath) -> Option<&ModuleWrapper> {
        self.modules.get(path)
    }

    /// Schemas in identifier order
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaWrapper> {
        self.schemas.values()
    }

    /// Enums in identifier order
    pub fn enums(&self) -> impl Iterator<Item = &EnumWrapper> {
        self.enums.values()
    }

    /// Modules in path order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleWrapper> {
        self.modules.values()
    }

    /// Schemas defined in a module
    pub fn schemas_in<'a>(&'a self, module: &'a ModulePath) -> impl Iterator<Item = &'a SchemaWrapper> {
        self.schemas.values().filter(move |s| &s.module == module)
    }

    /// Whether the module is marked deleted
    #[must_use]
    pub fn is_deleted(&self, module: &ModulePath) -> bool {
        self.modules.get(module).is_some_and(|m| m.deleted)
    }

    /// Apply one instruction of the named version change
    ///
    /// # Errors
    /// Returns a [`RegistryError`] naming the change when the instruction
    /// references something missing, collides with existing state or changes
    /// nothing. The registry is left unchanged on error.
    pub fn apply(&mut self, change: &str, instruction: &Instruction) -> Result<()> {
        match instruction {
            Instruction::SchemaHad { schema, name } => self.rename_schema(change, schema, name),
            Instruction::FieldExistedAs {
                schema,
                field,
                annotation,
                default,
                import,
            } => self.add_field(change, schema, field, annotation, default.as_ref(), import.as_ref()),
            Instruction::FieldDidntExist { schema, field } => self.remove_field(change, schema, field),
            Instruction::FieldHad {
                schema,
                field,
                name,
                annotation,
                default,
            } => self.change_field(
                change,
                schema,
                field,
                FieldChange {
                    name: name.as_deref(),
                    annotation: annotation.as_deref(),
                    default: default.as_deref(),
                },
            ),
            Instruction::ValidatorExistedAs { schema, source } => self.add_validator(change, schema, source),
            Instruction::ValidatorDidntExist { schema, validator } => {
                let wrapper = self.schema_mut(change, schema)?;
                let before = wrapper.validators.len();
                wrapper.validators.retain(|v| &v.name != validator);
                if wrapper.validators.len() == before {
                    return Err(RegistryError::ValidatorNotFound {
                        change: change.to_string(),
                        schema: schema.clone(),
                        validator: validator.clone(),
                    });
                }
                Ok(())
            }
            Instruction::EnumHadMembers { enumeration, members } => {
                let wrapper = self.enum_mut(change, enumeration)?;
                for EnumMember { name, value } in members {
                    wrapper.members.insert(name.clone(), value.clone());
                }
                Ok(())
            }
            Instruction::EnumDidntHaveMembers { enumeration, members } => {
                let wrapper = self.enum_mut(change, enumeration)?;
                if let Some(missing) = members.iter().find(|m| !wrapper.members.contains_key(*m)) {
                    return Err(RegistryError::MemberNotFound {
                        change: change.to_string(),
                        enumeration: enumeration.clone(),
                        member: missing.clone(),
                    });
                }
                for member in members {
                    wrapper.members.shift_remove(member);
                }
                Ok(())
            }
            Instruction::ModuleHad { module, import } => self.add_module_import(change, module, import),
            Instruction::ModuleDidntExist { module } => {
                self.module_mut(change, module)?.deleted = true;
                Ok(())
            }
        }
    }

    fn schema_mut(&mut self, change: &str, schema: &ModulePath) -> Result<&mut SchemaWrapper> {
        self.schemas
            .get_mut(schema)
            .ok_or_else(|| RegistryError::SchemaNotFound {
                change: change.to_string(),
                schema: schema.clone(),
            })
    }

    fn enum_mut(&mut self, change: &str, enumeration: &ModulePath) -> Result<&mut EnumWrapper> {
        self.enums
            .get_mut(enumeration)
            .ok_or_else(|| RegistryError::EnumNotFound {
                change: change.to_string(),
                enumeration: enumeration.clone(),
            })
    }

    fn module_mut(&mut self, change: &str, module: &ModulePath) -> Result<&mut ModuleWrapper> {
        self.modules
            .get_mut(module)
            .ok_or_else(|| RegistryError::ModuleNotFound {
                change: change.to_string(),
                module: module.clone(),
            })
    }

    fn rename_schema(&mut self, change: &str, schema: &ModulePath, name: &str) -> Result<()> {
        let wrapper = self.schema_mut(change, schema)?;
        if wrapper.name == name {
            return Err(RegistryError::no_change(change, schema, format!("the name \"{name}\"")));
        }
        let module = wrapper.module.clone();

        let taken = self
            .schemas
            .values()
            .any(|s| s.module == module && &s.identifier != schema && s.name == name)
            || self.enums.values().any(|e| e.module == module && e.name == name);
        if taken {
            return Err(RegistryError::NameTaken {
                change: change.to_string(),
                schema: schema.clone(),
                name: name.to_string(),
                module,
            });
        }

        self.schema_mut(change, schema)?.name = name.to_string();
        Ok(())
    }

    fn add_field(
        &mut self,
        change: &str,
        schema: &ModulePath,
        field: &str,
        annotation: &str,
        default: Option<&String>,
        import: Option<&ImportRequirement>,
    ) -> Result<()> {
        let wrapper = self.schema_mut(change, schema)?;
        if wrapper.field(field).is_some() {
            return Err(RegistryError::FieldAlreadyExists {
                change: change.to_string(),
                schema: schema.clone(),
                field: field.to_string(),
            });
        }
        let mut definition = FieldDefinition::new(field, annotation, default.cloned());
        definition.import = import.cloned();
        wrapper.fields.push(definition);
        Ok(())
    }

    fn remove_field(&mut self, change: &str, schema: &ModulePath, field: &str) -> Result<()> {
        let wrapper = self.schema_mut(change, schema)?;
        let Some(index) = wrapper.fields.iter().position(|f| f.name == field) else {
            return Err(field_not_found(change, schema, field));
        };
        wrapper.fields.remove(index);

        for validator in wrapper.validators.iter_mut().filter(|v| v.field_scoped) {
            validator.fields.retain(|f| f != field);
        }
        wrapper
            .validators
            .retain(|v| !v.field_scoped || !v.fields.is_empty());
        Ok(())
    }

    fn change_field(
        &mut self,
        change: &str,
        schema: &ModulePath,
        field: &str,
        update: FieldChange<'_>,
    ) -> Result<()> {
        let wrapper = self.schema_mut(change, schema)?;
        let Some(current) = wrapper.field(field) else {
            return Err(field_not_found(change, schema, field));
        };

        let rename = update.name.filter(|name| *name != current.name);
        let annotation = update.annotation.filter(|a| *a != current.annotation);
        let default = update.default.filter(|d| current.default.as_deref() != Some(*d));
        if rename.is_none() && annotation.is_none() && default.is_none() {
            return Err(RegistryError::no_change(
                change,
                format!("{schema}.{field}"),
                "the requested attributes",
            ));
        }
        if let Some(name) = rename {
            if wrapper.field(name).is_some() {
                return Err(RegistryError::FieldAlreadyExists {
                    change: change.to_string(),
                    schema: schema.clone(),
                    field: name.to_string(),
                });
            }
        }

        if let Some(definition) = wrapper.field_mut(field) {
            if let Some(annotation) = annotation {
                definition.annotation = annotation.to_string();
            }
            if let Some(default) = default {
                definition.default = Some(default.to_string());
            }
            if let Some(name) = rename {
                definition.name = name.to_string();
            }
        }
        if let Some(name) = rename {
            for validator in &mut wrapper.validators {
                for attached in validator.fields.iter_mut().filter(|f| f.as_str() == field) {
                    *attached = name.to_string();
                }
            }
        }
        Ok(())
    }

    fn add_validator(&mut self, change: &str, schema: &ModulePath, source: &str) -> Result<()> {
        let function =
            parse_function(source).map_err(|e| RegistryError::invalid_validator(change, schema, &e))?;
        let Some(validator) = ValidatorDefinition::from_function(&function) else {
            return Err(RegistryError::InvalidValidator {
                change: change.to_string(),
                schema: schema.clone(),
                message: format!("\"{}\" has no validator decorator", function.name),
            });
        };

        let wrapper = self.schema_mut(change, schema)?;
        if wrapper.validator(&validator.name).is_some() {
            return Err(RegistryError::ValidatorAlreadyExists {
                change: change.to_string(),
                schema: schema.clone(),
                validator: validator.name,
            });
        }
        if let Some(missing) = validator.fields.iter().find(|f| wrapper.field(f).is_none()) {
            return Err(field_not_found(change, schema, missing));
        }
        wrapper.validators.push(validator);
        Ok(())
    }

    fn add_module_import(&mut self, change: &str, module: &ModulePath, import: &str) -> Result<()> {
        let invalid = |message: String| RegistryError::InvalidImport {
            change: change.to_string(),
            module: module.clone(),
            message,
        };
        let stmt = parse_statement(import).map_err(|e| invalid(e.to_string()))?;
        if !matches!(stmt.node_kind(), NodeKind::Import | NodeKind::ImportFrom) {
            return Err(invalid(format!("expected an import, found {}", stmt.node_kind())));
        }
        self.module_mut(change, module)?.extra_imports.push(stmt);
        Ok(())
    }
}

struct FieldChange<'a> {
    name: Option<&'a str>,
    annotation: Option<&'a str>,
    default: Option<&'a str>,
}

fn field_not_found(change: &str, schema: &ModulePath, field: &str) -> RegistryError {
    RegistryError::FieldNotFound {
        change: change.to_string(),
        schema: schema.clone(),
        field: field.to_string(),
    }
}
