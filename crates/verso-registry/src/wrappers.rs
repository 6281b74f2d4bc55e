//! Registry entries for schemas, enums and modules
//!
//! Wrappers hold the live, mutable description of one canonical class or
//! module. They start out matching the canonical declaration and drift from
//! it as migrations are applied.

use crate::instruction::ImportRequirement;
use crate::path::ModulePath;
use indexmap::IndexMap;
use verso_syntax::{ClassDef, ClassItemKind, Comment, Decorator, FunctionDef, Stmt};

/// Decorators that attach a validator to named fields
pub const FIELD_VALIDATOR_DECORATORS: [&str; 2] = ["field_validator", "validator"];

/// Decorators that attach a validator to the whole model
pub const MODEL_VALIDATOR_DECORATORS: [&str; 2] = ["model_validator", "root_validator"];

/// Field definition of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Annotation source text
    pub annotation: String,
    /// Default value source text
    pub default: Option<String>,
    /// Comments above the field in the canonical source
    pub leading_comments: Vec<Comment>,
    /// Comment after the field in the canonical source
    pub trailing_comment: Option<Comment>,
    /// Import the annotation needs in generated code
    pub import: Option<ImportRequirement>,
}

impl FieldDefinition {
    /// Create field without comments or imports
    #[must_use]
    pub fn new(name: impl Into<String>, annotation: impl Into<String>, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            annotation: annotation.into(),
            default,
            leading_comments: Vec::new(),
            trailing_comment: None,
            import: None,
        }
    }

    /// Whether the field renders the same as a declared field
    #[must_use]
    pub fn matches(&self, field: &verso_syntax::Field) -> bool {
        self.name == field.name && self.annotation == field.annotation && self.default == field.default
    }
}

/// Validator method of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorDefinition {
    /// Function name
    pub name: String,
    /// Fields the validator is attached to
    pub fields: Vec<String>,
    /// Attached to fields (`field_validator`) rather than the whole model
    pub field_scoped: bool,
    /// Method as declared
    pub function: FunctionDef,
}

impl ValidatorDefinition {
    /// Recognize a validator method by its decorators
    #[must_use]
    pub fn from_function(function: &FunctionDef) -> Option<Self> {
        if let Some(decorator) = field_validator_decorator(function) {
            let fields = decorator
                .call
                .as_ref()
                .map(|call| call.string_args.clone())
                .unwrap_or_default();
            return Some(Self {
                name: function.name.clone(),
                fields,
                field_scoped: true,
                function: function.clone(),
            });
        }

        let model_scoped = function.decorators.iter().any(|d| {
            let callee = d
                .callee_name()
                .unwrap_or_else(|| d.text.trim_start_matches('@').rsplit('.').next().unwrap_or(""));
            MODEL_VALIDATOR_DECORATORS.contains(&callee)
        });
        model_scoped.then(|| Self {
            name: function.name.clone(),
            fields: Vec::new(),
            field_scoped: false,
            function: function.clone(),
        })
    }

    /// Fields named by the declared decorator
    #[must_use]
    pub fn declared_fields(&self) -> Vec<String> {
        field_validator_decorator(&self.function)
            .and_then(|decorator| decorator.call.as_ref())
            .map(|call| call.string_args.clone())
            .unwrap_or_default()
    }

    /// Whether the field list differs from the declared decorator
    #[must_use]
    pub fn fields_changed(&self) -> bool {
        self.field_scoped && self.fields != self.declared_fields()
    }

    /// Method to emit, with its decorator re-rendered when the fields changed
    #[must_use]
    pub fn rendered(&self) -> FunctionDef {
        if !self.fields_changed() {
            return self.function.clone();
        }
        let mut function = self.function.clone();
        if let Some(decorator) = function.decorators.iter_mut().find(|d| is_field_validator(d)) {
            *decorator = decorator.with_string_args(&self.fields);
        }
        function
    }
}

fn is_field_validator(decorator: &Decorator) -> bool {
    decorator
        .callee_name()
        .is_some_and(|callee| FIELD_VALIDATOR_DECORATORS.contains(&callee))
}

fn field_validator_decorator(function: &FunctionDef) -> Option<&Decorator> {
    function.decorators.iter().find(|d| is_field_validator(d))
}

/// Live description of a schema class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaWrapper {
    /// Canonical identifier, never changes
    pub identifier: ModulePath,
    /// Module that defines the class
    pub module: ModulePath,
    /// Class name in the canonical source
    pub original_name: String,
    /// Class name at the version being generated
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDefinition>,
    /// Validators in declaration order
    pub validators: Vec<ValidatorDefinition>,
}

impl SchemaWrapper {
    /// Build wrapper from a canonical class declaration
    #[must_use]
    pub fn from_class(module: &ModulePath, class: &ClassDef) -> Self {
        let mut fields = Vec::new();
        let mut validators = Vec::new();
        for item in &class.body {
            match &item.kind {
                ClassItemKind::Field(field) => fields.push(FieldDefinition {
                    name: field.name.clone(),
                    annotation: field.annotation.clone(),
                    default: field.default.clone(),
                    leading_comments: item.leading_comments.clone(),
                    trailing_comment: item.trailing_comment.clone(),
                    import: None,
                }),
                ClassItemKind::Method(function) => {
                    validators.extend(ValidatorDefinition::from_function(function));
                }
                _ => {}
            }
        }

        Self {
            identifier: module.child(&class.name),
            module: module.clone(),
            original_name: class.name.clone(),
            name: class.name.clone(),
            fields,
            validators,
        }
    }

    /// Whether the schema was renamed
    #[inline]
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.name != self.original_name
    }

    /// Field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Mutable field by name
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Validator by function name
    #[must_use]
    pub fn validator(&self, name: &str) -> Option<&ValidatorDefinition> {
        self.validators.iter().find(|v| v.name == name)
    }

    /// Whether the declared class body already matches the registry state
    #[must_use]
    pub fn matches_class(&self, class: &ClassDef) -> bool {
        let declared: Vec<_> = class.fields().collect();
        let fields_match = declared.len() == self.fields.len()
            && self.fields.iter().zip(&declared).all(|(def, field)| def.matches(field));

        let declared_validators: Vec<ValidatorDefinition> = class
            .methods()
            .filter_map(ValidatorDefinition::from_function)
            .collect();
        let validators_match = declared_validators.len() == self.validators.len()
            && self
                .validators
                .iter()
                .zip(&declared_validators)
                .all(|(ours, theirs)| ours.name == theirs.name && !ours.fields_changed());

        fields_match && validators_match
    }
}

/// Live description of an enum class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumWrapper {
    /// Canonical identifier
    pub identifier: ModulePath,
    /// Module that defines the class
    pub module: ModulePath,
    /// Class name
    pub name: String,
    /// Member name to value source text, in declaration order
    pub members: IndexMap<String, String>,
}

impl EnumWrapper {
    /// Build wrapper from a canonical class declaration
    #[must_use]
    pub fn from_class(module: &ModulePath, class: &ClassDef) -> Self {
        let members = class
            .assignments()
            .filter_map(|assign| Some((assign.target.clone(), assign.value.clone()?)))
            .collect();
        Self {
            identifier: module.child(&class.name),
            module: module.clone(),
            name: class.name.clone(),
            members,
        }
    }

    /// Whether the declared members already match the registry state
    #[must_use]
    pub fn matches_class(&self, class: &ClassDef) -> bool {
        let declared: Vec<(&str, &str)> = class
            .assignments()
            .filter_map(|a| Some((a.target.as_str(), a.value.as_deref()?)))
            .collect();
        declared.len() == self.members.len()
            && self
                .members
                .iter()
                .zip(&declared)
                .all(|((name, value), (n, v))| name == n && value == v)
    }
}

/// Module-level state
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWrapper {
    /// Module path
    pub path: ModulePath,
    /// Module is not emitted for this version
    pub deleted: bool,
    /// Import statements the module needs at this version
    pub extra_imports: Vec<Stmt>,
}

impl ModuleWrapper {
    /// Fresh module wrapper
    #[must_use]
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            deleted: false,
            extra_imports: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verso_syntax::parse_module;

    fn class(source: &str) -> ClassDef {
        parse_module(source).unwrap().classes().next().unwrap().clone()
    }

    fn module() -> ModulePath {
        "pkg.head.users".parse().unwrap()
    }

    const USER: &str = "\
class User(BaseModel):
    # display name
    name: str
    age: int = 0

    @field_validator(\"name\", \"age\")
    @classmethod
    def check(cls, value):
        return value

    @model_validator(mode=\"after\")
    def whole(self):
        return self

    def helper(self):
        return 1
";

    #[test]
    fn schema_from_class() {
        let wrapper = SchemaWrapper::from_class(&module(), &class(USER));

        assert_eq!(wrapper.identifier.to_string(), "pkg.head.users.User");
        assert_eq!(wrapper.fields.len(), 2);
        assert_eq!(wrapper.fields[0].leading_comments, vec![Comment::new("# display name")]);
        assert_eq!(wrapper.fields[1].default.as_deref(), Some("0"));

        let names: Vec<_> = wrapper.validators.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["check", "whole"]);
        assert_eq!(wrapper.validators[0].fields, vec!["name", "age"]);
        assert!(!wrapper.validators[1].field_scoped);
        assert!(wrapper.matches_class(&class(USER)));
    }

    #[test]
    fn changed_fields_rerender_decorator() {
        let wrapper = SchemaWrapper::from_class(&module(), &class(USER));
        let mut validator = wrapper.validators[0].clone();
        assert!(!validator.fields_changed());

        validator.fields.retain(|f| f != "age");
        assert!(validator.fields_changed());
        let rendered = validator.rendered();
        assert_eq!(rendered.decorators[0].text, "@field_validator(\"name\")");
        assert_eq!(rendered.decorators[1].text, "@classmethod");
    }

    #[test]
    fn drift_is_detected() {
        let declared = class(USER);
        let mut wrapper = SchemaWrapper::from_class(&module(), &declared);
        wrapper.fields.pop();
        assert!(!wrapper.matches_class(&declared));
    }

    #[test]
    fn enum_from_class() {
        let declared = class("class Color(str, Enum):\n    RED = \"red\"\n    BLUE = \"blue\"\n");
        let mut wrapper = EnumWrapper::from_class(&module(), &declared);
        assert_eq!(wrapper.members.get("BLUE").map(String::as_str), Some("\"blue\""));
        assert!(wrapper.matches_class(&declared));

        wrapper.members.shift_remove("BLUE");
        assert!(!wrapper.matches_class(&declared));
    }
}
