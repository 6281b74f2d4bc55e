//! Codegen plugin pipeline
//!
//! Plugins registered for [`NodeKind::Module`] run first, in registration
//! order, on the whole file. Plugins registered for statement kinds then run
//! once per top-level statement, in registration order, each seeing the output
//! of the previous one. A statement plugin deletes a statement by returning
//! [`Node::Removed`]; later plugins do not see it.

use crate::context::CodegenContext;
use crate::error::{node_name, CodegenError};
use verso_syntax::{Module, NodeKind, Stmt};

/// Unit of work handed to a plugin
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Whole file
    Module(Module),
    /// Top-level statement
    Statement(Stmt),
    /// Statement deleted by a previous plugin
    Removed,
}

impl Node {
    /// Kind of the node, `None` once removed
    #[must_use]
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Node::Module(_) => Some(NodeKind::Module),
            Node::Statement(stmt) => Some(stmt.node_kind()),
            Node::Removed => None,
        }
    }
}

/// Structural transformation of generated source
///
/// Plugins read the registry through the context but cannot mutate it.
pub trait CodegenPlugin: Send + Sync {
    /// Name used in errors and logs
    fn name(&self) -> &str;

    /// Whether the plugin handles nodes of this kind
    fn applies_to(&self, kind: NodeKind) -> bool;

    /// Transform a node
    ///
    /// # Errors
    /// Returns [`CodegenError`] when the node cannot be transformed.
    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError>;
}

/// Plugin built from a closure
pub struct FnPlugin<F> {
    name: String,
    kinds: Vec<NodeKind>,
    transform: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(Node, &CodegenContext<'_>) -> Result<Node, CodegenError> + Send + Sync,
{
    /// Create plugin handling the given kinds
    pub fn new(name: impl Into<String>, kinds: &[NodeKind], transform: F) -> Self {
        Self {
            name: name.into(),
            kinds: kinds.to_vec(),
            transform,
        }
    }
}

impl<F> CodegenPlugin for FnPlugin<F>
where
    F: Fn(Node, &CodegenContext<'_>) -> Result<Node, CodegenError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn apply(&self, node: Node, context: &CodegenContext<'_>) -> Result<Node, CodegenError> {
        (self.transform)(node, context)
    }
}

/// Ordered plugin list
#[derive(Default)]
pub struct Pipeline {
    plugins: Vec<Box<dyn CodegenPlugin>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugins", &self.names())
            .finish()
    }
}

impl Pipeline {
    /// Create empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with the built-in plugins in their default order
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        for plugin in crate::plugins::default_plugins() {
            pipeline.push(plugin);
        }
        pipeline
    }

    /// Append a plugin
    pub fn push(&mut self, plugin: Box<dyn CodegenPlugin>) {
        self.plugins.push(plugin);
    }

    /// Append a plugin, builder style
    #[must_use]
    pub fn with(mut self, plugin: impl CodegenPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Plugin names in order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of plugins
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin over a module
    ///
    /// # Errors
    /// Propagates plugin errors. A module plugin must return a module and a
    /// statement plugin must not return one; anything else is a
    /// [`CodegenError::PluginContract`] violation.
    pub fn run(&self, module: Module, context: &CodegenContext<'_>) -> Result<Module, CodegenError> {
        let mut module = module;
        for plugin in self.plugins.iter().filter(|p| p.applies_to(NodeKind::Module)) {
            module = match plugin.apply(Node::Module(module), context)? {
                Node::Module(module) => module,
                other => {
                    return Err(CodegenError::contract(plugin.name(), "module", node_name(other.kind())));
                }
            };
        }

        let Module {
            body,
            trailing_comments,
        } = module;
        let mut new_body = Vec::with_capacity(body.len());
        for stmt in body {
            let mut node = Node::Statement(stmt);
            for plugin in &self.plugins {
                let Some(kind) = node.kind() else {
                    break;
                };
                if !plugin.applies_to(kind) {
                    continue;
                }
                node = plugin.apply(node, context)?;
                if matches!(node, Node::Module(_)) {
                    return Err(CodegenError::contract(plugin.name(), "statement", "module"));
                }
            }
            if let Node::Statement(stmt) = node {
                new_body.push(stmt);
            }
        }

        Ok(Module {
            body: new_body,
            trailing_comments,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::context::{build_context, source_module, GlobalContext};
    use crate::walker::CanonicalTree;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use verso_registry::{ModulePath, Registry, Version, VersionBundle};
    use verso_syntax::{parse_module, print_module, StmtKind};

    /// Owned inputs for a [`CodegenContext`] in unit tests
    pub(crate) struct Fixture {
        pub(crate) dir: tempfile::TempDir,
        pub(crate) bundle: VersionBundle,
        pub(crate) extra: BTreeMap<String, serde_json::Value>,
        pub(crate) config: GenerationConfig,
        pub(crate) registry: Registry,
        pub(crate) tree: CanonicalTree,
        pub(crate) path: ModulePath,
    }

    impl Fixture {
        pub(crate) fn new(registry: Registry) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("head");
            std::fs::create_dir(&root).unwrap();
            Self {
                tree: CanonicalTree::new(&root, "pkg.head".parse().unwrap()).unwrap(),
                dir,
                bundle: VersionBundle::new(vec![], vec![Version::new("2000-01-01", vec![])]).unwrap(),
                extra: BTreeMap::new(),
                config: GenerationConfig::default(),
                registry,
                path: "pkg.head.models".parse().unwrap(),
            }
        }

        pub(crate) fn context<'a>(&'a self, module: &'a verso_syntax::Module) -> CodegenContext<'a> {
            let global = GlobalContext::new(&self.bundle.versions()[0], &self.bundle, &self.extra, &self.config);
            build_context(
                global,
                &self.registry,
                &self.tree,
                source_module(&self.path, false, module),
                PathBuf::from("models.py"),
                self.dir.path().join("v2000_01_01").join("models.py"),
            )
        }
    }

    fn rename_assignments() -> FnPlugin<impl Fn(Node, &CodegenContext<'_>) -> Result<Node, CodegenError> + Send + Sync> {
        FnPlugin::new("upper", &[NodeKind::Assign], |node, _| {
            Ok(match node {
                Node::Statement(mut stmt) => {
                    if let StmtKind::Assign(assign) = &mut stmt.kind {
                        assign.target = assign.target.to_uppercase();
                    }
                    Node::Statement(stmt)
                }
                other => other,
            })
        })
    }

    #[test]
    fn node_plugins_chain_and_remove() {
        let fixture = Fixture::new(Registry::new());
        let module = parse_module("import os\nx = 1\ny = 2\n").unwrap();
        let context = fixture.context(&module);

        let drop_upper_y = FnPlugin::new("drop-y", &[NodeKind::Assign], |node, _| {
            let drop = matches!(&node, Node::Statement(stmt) if stmt.kind.bound_names() == ["Y"]);
            Ok(if drop { Node::Removed } else { node })
        });
        let pipeline = Pipeline::new().with(rename_assignments()).with(drop_upper_y);

        let out = pipeline.run(module.clone(), &context).unwrap();
        assert_eq!(print_module(&out), "import os\nX = 1\n");
    }

    #[test]
    fn order_matters() {
        let fixture = Fixture::new(Registry::new());
        let module = parse_module("y = 2\n").unwrap();
        let context = fixture.context(&module);

        let drop_lower_y = || {
            FnPlugin::new("drop-y", &[NodeKind::Assign], |node, _| {
                let drop = matches!(&node, Node::Statement(stmt) if stmt.kind.bound_names() == ["y"]);
                Ok(if drop { Node::Removed } else { node })
            })
        };
        let dropped = Pipeline::new().with(drop_lower_y()).with(rename_assignments());
        let renamed = Pipeline::new().with(rename_assignments()).with(drop_lower_y());

        assert_eq!(print_module(&dropped.run(module.clone(), &context).unwrap()), "");
        assert_eq!(print_module(&renamed.run(module.clone(), &context).unwrap()), "Y = 2\n");
    }

    #[test]
    fn module_plugins_run_first_and_must_return_modules() {
        let fixture = Fixture::new(Registry::new());
        let module = parse_module("x = 1\n").unwrap();
        let context = fixture.context(&module);

        let broken = FnPlugin::new("broken", &[NodeKind::Module], |_, _| Ok(Node::Removed));
        let err = Pipeline::new().with(broken).run(module.clone(), &context).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::PluginContract { expected: "module", returned: "removed", .. }
        ));

        let promote = FnPlugin::new("promote", &[NodeKind::Assign], |_, _| Ok(Node::Module(Module::default())));
        let err = Pipeline::new().with(promote).run(module.clone(), &context).unwrap_err();
        assert!(matches!(err, CodegenError::PluginContract { expected: "statement", .. }));
    }
}
