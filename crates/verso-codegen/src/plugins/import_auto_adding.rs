//! Import auto-adding
//!
//! Adds the imports that fields and module changes of the current version
//! depend on. A name already bound to the same target is left alone; a name
//! bound to something else keeps its local definition and the import is
//! skipped.

use crate::context::CodegenContext;
use crate::error::CodegenError;
use crate::pipeline::{CodegenPlugin, Node};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use verso_syntax::{Module, NodeKind, Stmt, StmtKind};

/// Inserts missing imports at the top of the module
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportAutoAddingPlugin;

/// What a top-level name is bound to; `None` for non-import bindings
type Bindings = BTreeMap<String, Option<String>>;

impl CodegenPlugin for ImportAutoAddingPlugin {
    fn name(&self) -> &str {
        "import-auto-adding"
    }

    fn applies_to(&self, kind: NodeKind) -> bool {
        kind.is_module()
    }

    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError> {
        let Node::Module(mut module) = node else {
            return Ok(node);
        };

        let required = required_imports(context);
        if required.is_empty() {
            return Ok(Node::Module(module));
        }

        let mut bindings = Bindings::new();
        for stmt in &module.body {
            bindings.extend(binding_targets(&stmt.kind, context));
        }

        let mut at = insertion_point(&module);
        for stmt in required {
            let targets = binding_targets(&stmt.kind, context);
            let collision = targets
                .iter()
                .find(|(name, target)| bindings.get(*name).is_some_and(|bound| bound != *target));
            if let Some((name, _)) = collision {
                warn!(
                    module = %context.module_path,
                    name = %name,
                    "import skipped, name already defined in module"
                );
                continue;
            }
            if targets.iter().all(|(name, _)| bindings.contains_key(name)) {
                continue;
            }

            debug!(module = %context.module_path, names = ?targets.keys().collect::<Vec<_>>(), "adding import");
            bindings.extend(targets);
            module.body.insert(at, stmt);
            at += 1;
        }
        Ok(Node::Module(module))
    }
}

/// Field imports of the module's schemas, then module-level imports, deduplicated
fn required_imports(context: &CodegenContext<'_>) -> Vec<Stmt> {
    let field_imports = context
        .registry
        .schemas_in(&context.module_path)
        .flat_map(|schema| schema.fields.iter())
        .filter_map(|field| field.import.as_ref())
        .map(verso_registry::ImportRequirement::to_stmt);
    let module_imports = context
        .registry
        .module(&context.module_path)
        .into_iter()
        .flat_map(|module| module.extra_imports.iter().cloned());

    let mut required: Vec<Stmt> = Vec::new();
    for stmt in field_imports.chain(module_imports) {
        if !required.iter().any(|seen| seen.kind == stmt.kind) {
            required.push(stmt);
        }
    }
    required
}

fn binding_targets(kind: &StmtKind, context: &CodegenContext<'_>) -> Bindings {
    match kind {
        StmtKind::Import(aliases) => aliases
            .iter()
            .map(|alias| {
                // `import a.b` binds `a`
                let root = alias.name.split('.').next().unwrap_or(&alias.name).to_string();
                match &alias.alias {
                    Some(bound) => (bound.clone(), Some(alias.name.clone())),
                    None => (root.clone(), Some(root)),
                }
            })
            .collect(),
        StmtKind::ImportFrom(from) => {
            let resolved = context
                .module_path
                .resolve_import(context.is_package, &from.module)
                .map_or_else(|_| from.module.clone(), |path| path.to_string());
            from.names
                .iter()
                .filter(|alias| alias.name != "*")
                .map(|alias| (alias.bound_name().to_string(), Some(format!("{resolved}.{}", alias.name))))
                .collect()
        }
        other => other.bound_names().into_iter().map(|name| (name, None)).collect(),
    }
}

/// After the last top-level import, else after a module docstring
fn insertion_point(module: &Module) -> usize {
    let last_import = module
        .body
        .iter()
        .rposition(|stmt| matches!(stmt.kind, StmtKind::Import(_) | StmtKind::ImportFrom(_)));
    match last_import {
        Some(index) => index + 1,
        None => usize::from(module.body.first().is_some_and(|stmt| is_docstring(&stmt.kind))),
    }
}

fn is_docstring(kind: &StmtKind) -> bool {
    match kind {
        StmtKind::Raw(text) => {
            let text = text.trim_start_matches(['r', 'R', 'u', 'U']);
            text.starts_with('"') || text.starts_with('\'')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::Fixture;
    use crate::pipeline::Pipeline;
    use pretty_assertions::assert_eq;
    use verso_registry::{ImportRequirement, Instruction, ModuleWrapper, Registry, SchemaWrapper};
    use verso_syntax::{parse_module, print_module};

    fn registry(source: &str, instructions: &[Instruction]) -> Registry {
        let path = "pkg.head.models".parse().unwrap();
        let module = parse_module(source).unwrap();
        let mut registry = Registry::new();
        for class in module.classes() {
            registry.insert_schema(SchemaWrapper::from_class(&path, class));
        }
        registry.insert_module(ModuleWrapper::new(path));
        for instruction in instructions {
            registry.apply("test", instruction).unwrap();
        }
        registry
    }

    fn price_field() -> Instruction {
        Instruction::FieldExistedAs {
            schema: "pkg.head.models.Widget".parse().unwrap(),
            field: "price".into(),
            annotation: "Decimal".into(),
            default: None,
            import: Some(ImportRequirement::from_module("decimal", "Decimal")),
        }
    }

    fn run(source: &str, instructions: &[Instruction]) -> String {
        let fixture = Fixture::new(registry(source, instructions));
        let module = parse_module(source).unwrap();
        let context = fixture.context(&module);
        let out = Pipeline::new()
            .with(ImportAutoAddingPlugin)
            .run(module.clone(), &context)
            .unwrap();
        print_module(&out)
    }

    #[test]
    fn adds_after_last_import() {
        let source = "\"\"\"Models.\"\"\"\nfrom .common import Base\n\n\nclass Widget(Base):\n    name: str\n";
        assert_eq!(
            run(source, &[price_field()]),
            "\"\"\"Models.\"\"\"\nfrom .common import Base\nfrom decimal import Decimal\n\n\nclass Widget(Base):\n    name: str\n"
        );
    }

    #[test]
    fn adds_after_docstring_without_imports() {
        let source = "\"\"\"Models.\"\"\"\n\n\nclass Widget(BaseModel):\n    name: str\n";
        let out = run(
            source,
            &[Instruction::ModuleHad {
                module: "pkg.head.models".parse().unwrap(),
                import: "import datetime as dt".into(),
            }],
        );
        assert!(out.starts_with("\"\"\"Models.\"\"\"\nimport datetime as dt\n\n\nclass Widget"));
    }

    #[test]
    fn existing_import_is_not_duplicated() {
        let source = "from decimal import Decimal\n\n\nclass Widget(BaseModel):\n    name: str\n";
        assert_eq!(run(source, &[price_field()]), source);
    }

    #[test]
    fn local_definition_wins_over_import() {
        let source = "class Decimal:\n    pass\n\n\nclass Widget(BaseModel):\n    name: str\n";
        assert_eq!(run(source, &[price_field()]), source);
    }

    #[test]
    fn requirements_are_deduplicated() {
        let source = "class Widget(BaseModel):\n    name: str\n";
        let out = run(
            source,
            &[
                price_field(),
                Instruction::ModuleHad {
                    module: "pkg.head.models".parse().unwrap(),
                    import: "from decimal import Decimal".into(),
                },
            ],
        );
        assert_eq!(out.matches("from decimal import Decimal").count(), 1);
        assert!(out.starts_with("from decimal import Decimal\n\n\nclass Widget"));
    }
}
