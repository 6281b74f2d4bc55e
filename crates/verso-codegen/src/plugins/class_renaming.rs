//! Class renaming
//!
//! Propagates schema renames: the class statement itself, references to it
//! in the defining module, and references in modules that import it without
//! an alias. Aliased imports keep their alias and only change the imported
//! name.

use crate::context::CodegenContext;
use crate::error::CodegenError;
use crate::pipeline::{CodegenPlugin, Node};
use std::collections::BTreeMap;
use verso_syntax::{
    rename_identifiers, ClassItemKind, Decorator, FunctionDef, NodeKind, StmtKind, SyntaxResult,
};

/// Renames schema classes and their references
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassRenamingPlugin;

impl CodegenPlugin for ClassRenamingPlugin {
    fn name(&self) -> &str {
        "class-renaming"
    }

    fn applies_to(&self, kind: NodeKind) -> bool {
        !kind.is_module()
    }

    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError> {
        let Node::Statement(mut stmt) = node else {
            return Ok(node);
        };
        let renames = rename_map(context);
        rename_stmt(&mut stmt.kind, &renames, context).map_err(|e| CodegenError::syntax(self.name(), e))?;
        Ok(Node::Statement(stmt))
    }
}

/// Old name to new name for every rename visible in the module
fn rename_map(context: &CodegenContext<'_>) -> BTreeMap<String, String> {
    let mut renames: BTreeMap<String, String> = context
        .registry
        .schemas_in(&context.module_path)
        .filter(|schema| schema.is_renamed())
        .map(|schema| (schema.original_name.clone(), schema.name.clone()))
        .collect();

    for (bound, target) in &context.imported_symbols {
        if let Some(schema) = context.registry.schema(target) {
            if schema.is_renamed() && *bound == schema.original_name {
                renames.insert(bound.clone(), schema.name.clone());
            }
        }
    }
    renames
}

fn rename_stmt(
    kind: &mut StmtKind,
    renames: &BTreeMap<String, String>,
    context: &CodegenContext<'_>,
) -> SyntaxResult<()> {
    match kind {
        StmtKind::ImportFrom(from) => {
            let Ok(target_module) = context.module_path.resolve_import(context.is_package, &from.module) else {
                return Ok(());
            };
            for alias in from.names.iter_mut().filter(|a| a.name != "*") {
                if let Some(schema) = context.registry.schema(&target_module.child(&alias.name)) {
                    if schema.is_renamed() {
                        alias.name.clone_from(&schema.name);
                    }
                }
            }
        }
        StmtKind::Import(_) => {}
        _ if renames.is_empty() => {}
        StmtKind::ClassDef(class) => {
            if let Some(new) = renames.get(&class.name) {
                class.name.clone_from(new);
            }
            rename_decorators(&mut class.decorators, renames)?;
            if let Some(params) = &mut class.type_params {
                *params = rename_type_params(params, renames)?;
            }
            for base in &mut class.bases {
                *base = rename_identifiers(base, renames)?;
            }
            for item in &mut class.body {
                match &mut item.kind {
                    ClassItemKind::Field(field) => {
                        field.annotation = rename_identifiers(&field.annotation, renames)?;
                        rename_optional(&mut field.default, renames)?;
                    }
                    ClassItemKind::Assign(assign) => {
                        rename_optional(&mut assign.annotation, renames)?;
                        rename_optional(&mut assign.value, renames)?;
                    }
                    ClassItemKind::Method(method) => rename_function(method, renames)?,
                    ClassItemKind::Raw(text) => *text = rename_identifiers(text, renames)?,
                    ClassItemKind::Pass => {}
                }
            }
        }
        StmtKind::FunctionDef(function) => rename_function(function, renames)?,
        StmtKind::Assign(assign) => {
            rename_optional(&mut assign.annotation, renames)?;
            rename_optional(&mut assign.value, renames)?;
        }
        StmtKind::Raw(text) => *text = rename_identifiers(text, renames)?,
    }
    Ok(())
}

fn rename_function(function: &mut FunctionDef, renames: &BTreeMap<String, String>) -> SyntaxResult<()> {
    rename_decorators(&mut function.decorators, renames)?;
    function.source = rename_identifiers(&function.source, renames)?;
    Ok(())
}

fn rename_decorators(decorators: &mut [Decorator], renames: &BTreeMap<String, String>) -> SyntaxResult<()> {
    for decorator in decorators {
        decorator.text = rename_identifiers(&decorator.text, renames)?;
        if let Some(call) = &mut decorator.call {
            call.callee = rename_identifiers(&call.callee, renames)?;
            for arg in &mut call.other_args {
                *arg = rename_identifiers(arg, renames)?;
            }
        }
    }
    Ok(())
}

fn rename_optional(text: &mut Option<String>, renames: &BTreeMap<String, String>) -> SyntaxResult<()> {
    if let Some(text) = text {
        *text = rename_identifiers(text, renames)?;
    }
    Ok(())
}

/// Type parameter lists only parse as part of a definition
fn rename_type_params(params: &str, renames: &BTreeMap<String, String>) -> SyntaxResult<String> {
    const PREFIX: &str = "def _";
    const SUFFIX: &str = "(): pass";
    let renamed = rename_identifiers(&format!("{PREFIX}{params}{SUFFIX}"), renames)?;
    Ok(renamed
        .strip_prefix(PREFIX)
        .and_then(|s| s.strip_suffix(SUFFIX))
        .unwrap_or(params)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::Fixture;
    use crate::pipeline::Pipeline;
    use pretty_assertions::assert_eq;
    use verso_registry::{Instruction, ModuleWrapper, Registry, SchemaWrapper};
    use verso_syntax::{parse_module, print_module};

    const MODELS: &str = "\
from .common import Base


class Widget(Base):
    parent: \"Widget | None\" = None
    children: list[Widget] = []

    def clone(self) -> Widget:
        return Widget(name=self.name)


DEFAULT: Widget | None = None
";

    fn renamed_registry() -> Registry {
        let path = "pkg.head.models".parse().unwrap();
        let module = parse_module(MODELS).unwrap();
        let mut registry = Registry::new();
        for class in module.classes() {
            registry.insert_schema(SchemaWrapper::from_class(&path, class));
        }
        registry.insert_module(ModuleWrapper::new(path));
        registry
            .apply(
                "rename",
                &Instruction::SchemaHad {
                    schema: "pkg.head.models.Widget".parse().unwrap(),
                    name: "Gadget".into(),
                },
            )
            .unwrap();
        registry
    }

    fn run(fixture: &Fixture, source: &str) -> String {
        let module = parse_module(source).unwrap();
        let context = fixture.context(&module);
        let out = Pipeline::new()
            .with(ClassRenamingPlugin)
            .run(module.clone(), &context)
            .unwrap();
        print_module(&out)
    }

    #[test]
    fn renames_class_and_local_references() {
        let fixture = Fixture::new(renamed_registry());
        assert_eq!(
            run(&fixture, MODELS),
            "\
from .common import Base


class Gadget(Base):
    parent: \"Widget | None\" = None
    children: list[Gadget] = []

    def clone(self) -> Gadget:
        return Gadget(name=self.name)


DEFAULT: Gadget | None = None
"
        );
    }

    #[test]
    fn importers_follow_the_rename() {
        let mut fixture = Fixture::new(renamed_registry());
        fixture.path = "pkg.head.api".parse().unwrap();
        let source = "\
from .models import Widget
from .models import Widget as W


def make() -> Widget:
    return W()
";
        assert_eq!(
            run(&fixture, source),
            "\
from .models import Gadget
from .models import Gadget as W


def make() -> Gadget:
    return W()
"
        );
    }

    #[test]
    fn nothing_renamed_is_identity() {
        let path = "pkg.head.models".parse().unwrap();
        let module = parse_module(MODELS).unwrap();
        let mut registry = Registry::new();
        for class in module.classes() {
            registry.insert_schema(SchemaWrapper::from_class(&path, class));
        }
        let fixture = Fixture::new(registry);
        assert_eq!(run(&fixture, MODELS), MODELS);
    }

    #[test]
    fn type_params_are_renamed() {
        let renames = BTreeMap::from([("Widget".to_string(), "Gadget".to_string())]);
        assert_eq!(rename_type_params("[T: Widget]", &renames).unwrap(), "[T: Gadget]");
    }
}
