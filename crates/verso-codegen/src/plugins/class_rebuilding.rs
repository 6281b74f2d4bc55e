//! Class rebuilding
//!
//! Regenerates the fields, enum members and validators of a class whose
//! registry state no longer matches its canonical declaration. Everything
//! else in the class body (docstrings, methods, class variables) stays where
//! it was. Classes that still match are passed through untouched.

use crate::context::CodegenContext;
use crate::error::CodegenError;
use crate::pipeline::{CodegenPlugin, Node};
use std::collections::BTreeMap;
use verso_registry::{EnumWrapper, SchemaWrapper, ValidatorDefinition};
use verso_syntax::{Assign, ClassDef, ClassItem, ClassItemKind, Comment, Field, NodeKind, StmtKind};

/// Rebuilds drifted schema and enum classes from the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassRebuildingPlugin;

impl CodegenPlugin for ClassRebuildingPlugin {
    fn name(&self) -> &str {
        "class-rebuilding"
    }

    fn applies_to(&self, kind: NodeKind) -> bool {
        kind == NodeKind::ClassDef
    }

    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError> {
        let Node::Statement(mut stmt) = node else {
            return Ok(node);
        };
        let StmtKind::ClassDef(class) = &mut stmt.kind else {
            return Ok(Node::Statement(stmt));
        };

        let identifier = context.module_path.child(&class.name);
        if let Some(schema) = context.registry.schema(&identifier) {
            if !schema.matches_class(class) {
                rebuild_schema(class, schema);
            }
        } else if let Some(enumeration) = context.registry.enumeration(&identifier) {
            if !enumeration.matches_class(class) {
                rebuild_enum(class, enumeration);
            }
        }
        Ok(Node::Statement(stmt))
    }
}

fn rebuild_schema(class: &mut ClassDef, schema: &SchemaWrapper) {
    let fields: Vec<ClassItem> = schema
        .fields
        .iter()
        .map(|def| ClassItem {
            kind: ClassItemKind::Field(Field::new(&def.name, &def.annotation, def.default.clone())),
            leading_comments: def.leading_comments.clone(),
            trailing_comment: def.trailing_comment.clone(),
        })
        .collect();

    let mut body = Vec::with_capacity(class.body.len() + fields.len());
    let mut fields = Some(fields);
    let mut emitted = Vec::new();

    for item in std::mem::take(&mut class.body) {
        match &item.kind {
            ClassItemKind::Field(_) => body.extend(fields.take().into_iter().flatten()),
            ClassItemKind::Pass => {}
            ClassItemKind::Method(method) => match ValidatorDefinition::from_function(method) {
                Some(declared) => {
                    if let Some(current) = schema.validator(&declared.name) {
                        emitted.push(current.name.clone());
                        body.push(ClassItem {
                            kind: ClassItemKind::Method(current.rendered()),
                            ..item
                        });
                    }
                }
                None => body.push(item),
            },
            _ => body.push(item),
        }
    }

    // the class had no fields: place them after a leading docstring
    if let Some(fields) = fields {
        let at = usize::from(body.first().is_some_and(|item| item.kind.is_docstring()));
        body.splice(at..at, fields);
    }

    body.extend(
        schema
            .validators
            .iter()
            .filter(|v| !emitted.contains(&v.name))
            .map(|v| ClassItem::new(ClassItemKind::Method(v.rendered()))),
    );

    if body.is_empty() {
        body.push(ClassItem::new(ClassItemKind::Pass));
    }
    class.body = body;
}

fn rebuild_enum(class: &mut ClassDef, enumeration: &EnumWrapper) {
    let mut comments: BTreeMap<String, (Vec<Comment>, Option<Comment>)> = BTreeMap::new();
    for item in &class.body {
        if let ClassItemKind::Assign(assign) = &item.kind {
            comments.insert(
                assign.target.clone(),
                (item.leading_comments.clone(), item.trailing_comment.clone()),
            );
        }
    }

    let members: Vec<ClassItem> = enumeration
        .members
        .iter()
        .map(|(name, value)| {
            let (leading_comments, trailing_comment) = comments.remove(name).unwrap_or_default();
            ClassItem {
                kind: ClassItemKind::Assign(Assign {
                    target: name.clone(),
                    annotation: None,
                    value: Some(value.clone()),
                }),
                leading_comments,
                trailing_comment,
            }
        })
        .collect();

    let mut body = Vec::with_capacity(class.body.len() + members.len());
    let mut members = Some(members);
    for item in std::mem::take(&mut class.body) {
        match &item.kind {
            ClassItemKind::Assign(Assign { value: Some(_), .. }) => {
                body.extend(members.take().into_iter().flatten());
            }
            ClassItemKind::Pass => {}
            _ => body.push(item),
        }
    }
    if let Some(members) = members {
        let at = usize::from(body.first().is_some_and(|item| item.kind.is_docstring()));
        body.splice(at..at, members);
    }

    if body.is_empty() {
        body.push(ClassItem::new(ClassItemKind::Pass));
    }
    class.body = body;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::Fixture;
    use crate::pipeline::Pipeline;
    use pretty_assertions::assert_eq;
    use verso_registry::{EnumMember, Instruction, ModuleWrapper, Registry};
    use verso_syntax::{parse_module, print_module};

    const MODELS: &str = "\
class Widget(BaseModel):
    \"\"\"A widget.\"\"\"
    # display name
    name: str
    size: int = 1

    @field_validator(\"name\", \"size\")
    @classmethod
    def check(cls, value):
        return value

    def describe(self):
        return self.name


class Color(Enum):
    RED = \"red\"
    BLUE = \"blue\"  # cool


class Plain(BaseModel):
    \"\"\"Nothing yet.\"\"\"
";

    fn registry(instructions: &[Instruction]) -> Registry {
        let module = parse_module(MODELS).unwrap();
        let path = "pkg.head.models".parse().unwrap();
        let mut registry = Registry::new();
        for class in module.classes() {
            if class.name == "Color" {
                registry.insert_enum(EnumWrapper::from_class(&path, class));
            } else {
                registry.insert_schema(SchemaWrapper::from_class(&path, class));
            }
        }
        registry.insert_module(ModuleWrapper::new(path));
        for instruction in instructions {
            registry.apply("test", instruction).unwrap();
        }
        registry
    }

    fn rebuild(registry: Registry) -> String {
        let fixture = Fixture::new(registry);
        let module = parse_module(MODELS).unwrap();
        let context = fixture.context(&module);
        let out = Pipeline::new()
            .with(ClassRebuildingPlugin)
            .run(module.clone(), &context)
            .unwrap();
        print_module(&out)
    }

    #[test]
    fn untouched_when_registry_matches() {
        assert_eq!(rebuild(registry(&[])), MODELS);
    }

    #[test]
    fn removing_field_rerenders_validator() {
        let out = rebuild(registry(&[Instruction::FieldDidntExist {
            schema: "pkg.head.models.Widget".parse().unwrap(),
            field: "size".into(),
        }]));
        assert!(out.contains(
            "    \"\"\"A widget.\"\"\"\n    # display name\n    name: str\n\n    @field_validator(\"name\")\n    @classmethod\n    def check"
        ));
        assert!(!out.contains("size"));
        assert!(out.contains("    def describe(self):"));
    }

    #[test]
    fn removing_all_validated_fields_drops_validator() {
        let schema: verso_registry::ModulePath = "pkg.head.models.Widget".parse().unwrap();
        let out = rebuild(registry(&[
            Instruction::FieldDidntExist { schema: schema.clone(), field: "size".into() },
            Instruction::FieldDidntExist { schema, field: "name".into() },
        ]));
        assert!(out.contains("class Widget(BaseModel):\n    \"\"\"A widget.\"\"\"\n\n    def describe(self):"));
        assert!(!out.contains("check"));
    }

    #[test]
    fn fields_added_to_fieldless_class_follow_docstring() {
        let out = rebuild(registry(&[Instruction::FieldExistedAs {
            schema: "pkg.head.models.Plain".parse().unwrap(),
            field: "legacy".into(),
            annotation: "str | None".into(),
            default: Some("None".into()),
            import: None,
        }]));
        assert!(out.ends_with("class Plain(BaseModel):\n    \"\"\"Nothing yet.\"\"\"\n    legacy: str | None = None\n"));
    }

    #[test]
    fn enum_members_follow_registry() {
        let out = rebuild(registry(&[
            Instruction::EnumDidntHaveMembers {
                enumeration: "pkg.head.models.Color".parse().unwrap(),
                members: vec!["RED".into()],
            },
            Instruction::EnumHadMembers {
                enumeration: "pkg.head.models.Color".parse().unwrap(),
                members: vec![EnumMember::new("GREEN", "\"green\"")],
            },
        ]));
        assert!(out.contains("class Color(Enum):\n    BLUE = \"blue\"  # cool\n    GREEN = \"green\"\n"));
    }

    #[test]
    fn empty_enum_gets_pass() {
        let out = rebuild(registry(&[Instruction::EnumDidntHaveMembers {
            enumeration: "pkg.head.models.Color".parse().unwrap(),
            members: vec!["RED".into(), "BLUE".into()],
        }]));
        assert!(out.contains("class Color(Enum):\n    pass\n"));
    }
}
