//! Head import rewriting
//!
//! Absolute imports that point into the canonical package are redirected to
//! the package of the version being generated. Relative imports already
//! resolve inside the version package and are left alone, as are plain
//! `import pkg.head.x` statements: rewriting those would change the name they
//! bind.

use crate::context::CodegenContext;
use crate::error::CodegenError;
use crate::pipeline::{CodegenPlugin, Node};
use verso_registry::ModulePath;
use verso_syntax::{NodeKind, StmtKind};

/// Redirects absolute imports of the canonical package
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadImportRewritingPlugin;

impl CodegenPlugin for HeadImportRewritingPlugin {
    fn name(&self) -> &str {
        "head-import-rewriting"
    }

    fn applies_to(&self, kind: NodeKind) -> bool {
        matches!(kind, NodeKind::Import | NodeKind::ImportFrom)
    }

    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError> {
        let Node::Statement(mut stmt) = node else {
            return Ok(node);
        };
        match &mut stmt.kind {
            StmtKind::ImportFrom(from) if from.level() == 0 => {
                if let Some(rewritten) = rewrite(&from.module, context) {
                    from.module = rewritten;
                }
            }
            StmtKind::Import(aliases) => {
                for alias in aliases.iter_mut().filter(|a| a.alias.is_some()) {
                    if let Some(rewritten) = rewrite(&alias.name, context) {
                        alias.name = rewritten;
                    }
                }
            }
            _ => {}
        }
        Ok(Node::Statement(stmt))
    }
}

fn rewrite(module: &str, context: &CodegenContext<'_>) -> Option<String> {
    let path: ModulePath = module.parse().ok()?;
    context.is_head_path(&path).then(|| {
        path.with_segment(context.head_package_index, context.global.version_dir_name())
            .to_string()
    })
}
