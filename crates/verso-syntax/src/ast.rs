//! Syntax tree types
//!
//! A deliberately shallow model of a Python module: top-level statements that
//! the generator needs to understand (imports, classes, functions, simple
//! assignments) are structured, everything else is kept as verbatim text.
//! Comments are attached to the node they precede or trail.

use std::fmt::{self, Display, Formatter};

/// A single `#` comment, stored with its leading `#`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment(String);

impl Comment {
    /// Create comment from its source text
    ///
    /// A missing `#` prefix is added.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = text.trim_end();
        if text.starts_with('#') {
            Self(text.to_string())
        } else {
            Self(format!("# {text}"))
        }
    }

    /// Comment text including the leading `#`
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Display for Comment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// Top-level statements in source order
    pub body: Vec<Stmt>,
    /// Comments after the last statement
    pub trailing_comments: Vec<Comment>,
}

impl Module {
    /// Create module from statements
    #[inline]
    #[must_use]
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            body,
            trailing_comments: Vec::new(),
        }
    }

    /// Iterate over top-level class definitions
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::ClassDef(class) => Some(class),
            _ => None,
        })
    }

    /// Names bound at the top level of the module
    ///
    /// Covers classes, functions, simple assignments and imports. Names bound
    /// inside verbatim statements (`if`, `try`, ...) are not seen.
    #[must_use]
    pub fn top_level_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for stmt in &self.body {
            names.extend(stmt.kind.bound_names());
        }
        names
    }
}

/// Top-level statement with its attached comments
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement payload
    pub kind: StmtKind,
    /// Comments on the lines directly above the statement
    pub leading_comments: Vec<Comment>,
    /// Comment on the same line as a single-line statement
    pub trailing_comment: Option<Comment>,
}

impl Stmt {
    /// Wrap a statement kind without comments
    #[inline]
    #[must_use]
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            leading_comments: Vec::new(),
            trailing_comment: None,
        }
    }

    /// Node kind used for plugin dispatch
    #[inline]
    #[must_use]
    pub fn node_kind(&self) -> NodeKind {
        self.kind.node_kind()
    }

    /// Attach leading comments
    #[must_use]
    pub fn with_leading_comments(mut self, comments: Vec<Comment>) -> Self {
        self.leading_comments = comments;
        self
    }
}

/// Statement payloads
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `import a.b as c, d`
    Import(Vec<ImportAlias>),
    /// `from module import a as b, c`
    ImportFrom(ImportFrom),
    /// `class Name(...): ...`
    ClassDef(ClassDef),
    /// `def name(...): ...`
    FunctionDef(FunctionDef),
    /// `name[: annotation][ = value]`
    Assign(Assign),
    /// Any other statement, kept verbatim (dedented)
    Raw(String),
}

impl StmtKind {
    /// Node kind used for plugin dispatch
    #[must_use]
    pub fn node_kind(&self) -> NodeKind {
        match self {
            StmtKind::Import(_) => NodeKind::Import,
            StmtKind::ImportFrom(_) => NodeKind::ImportFrom,
            StmtKind::ClassDef(_) => NodeKind::ClassDef,
            StmtKind::FunctionDef(_) => NodeKind::FunctionDef,
            StmtKind::Assign(_) => NodeKind::Assign,
            StmtKind::Raw(_) => NodeKind::Raw,
        }
    }

    /// Names this statement binds in its enclosing scope
    #[must_use]
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            StmtKind::Import(aliases) => aliases
                .iter()
                .map(|alias| match &alias.alias {
                    Some(bound) => bound.clone(),
                    // `import a.b` binds `a`
                    None => alias.name.split('.').next().unwrap_or(&alias.name).to_string(),
                })
                .collect(),
            StmtKind::ImportFrom(from) => from
                .names
                .iter()
                .filter(|alias| alias.name != "*")
                .map(|alias| alias.bound_name().to_string())
                .collect(),
            StmtKind::ClassDef(class) => vec![class.name.clone()],
            StmtKind::FunctionDef(function) => vec![function.name.clone()],
            StmtKind::Assign(assign) => vec![assign.target.clone()],
            StmtKind::Raw(_) => Vec::new(),
        }
    }

    /// Compound statements are separated by blank lines when printed
    #[must_use]
    pub fn is_compound(&self) -> bool {
        match self {
            StmtKind::ClassDef(_) | StmtKind::FunctionDef(_) => true,
            StmtKind::Raw(text) => text.contains('\n'),
            _ => false,
        }
    }
}

/// Closed set of node kinds plugins can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// The whole file
    Module,
    /// `import ...`
    Import,
    /// `from ... import ...`
    ImportFrom,
    /// Class definition
    ClassDef,
    /// Function definition
    FunctionDef,
    /// Simple assignment
    Assign,
    /// Verbatim statement
    Raw,
}

impl NodeKind {
    /// All statement-level kinds
    pub const STATEMENTS: [NodeKind; 6] = [
        NodeKind::Import,
        NodeKind::ImportFrom,
        NodeKind::ClassDef,
        NodeKind::FunctionDef,
        NodeKind::Assign,
        NodeKind::Raw,
    ];

    /// Whether this kind addresses the whole file
    #[inline]
    #[must_use]
    pub fn is_module(self) -> bool {
        matches!(self, NodeKind::Module)
    }

    /// Human-readable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Import => "import",
            NodeKind::ImportFrom => "import-from",
            NodeKind::ClassDef => "class",
            NodeKind::FunctionDef => "function",
            NodeKind::Assign => "assignment",
            NodeKind::Raw => "statement",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `name [as alias]` entry of an import
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportAlias {
    /// Imported (possibly dotted) name
    pub name: String,
    /// `as` alias
    pub alias: Option<String>,
}

impl ImportAlias {
    /// Entry without alias
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Entry with alias
    #[must_use]
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name the entry binds
    #[inline]
    #[must_use]
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl Display for ImportAlias {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.name, alias),
            None => f.write_str(&self.name),
        }
    }
}

/// `from module import names`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportFrom {
    /// Module text, leading dots included for relative imports
    pub module: String,
    /// Imported names; a single `*` entry for wildcard imports
    pub names: Vec<ImportAlias>,
}

impl ImportFrom {
    /// Build an import-from statement
    #[must_use]
    pub fn new(module: impl Into<String>, names: Vec<ImportAlias>) -> Self {
        Self {
            module: module.into(),
            names,
        }
    }

    /// Number of leading dots
    #[must_use]
    pub fn level(&self) -> usize {
        self.module.chars().take_while(|c| *c == '.').count()
    }
}

/// Decorator line, e.g. `@field_validator("a", mode="before")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    /// Source text including `@`
    pub text: String,
    /// Call structure when the decorator is a call expression
    pub call: Option<DecoratorCall>,
    /// Own-line comments between this decorator and the next line
    pub trailing_comments: Vec<Comment>,
}

impl Decorator {
    /// Decorator that is not inspected further
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            call: None,
            trailing_comments: Vec::new(),
        }
    }

    /// Last dotted segment of the called expression
    #[must_use]
    pub fn callee_name(&self) -> Option<&str> {
        self.call
            .as_ref()
            .map(|call| call.callee.rsplit('.').next().unwrap_or(&call.callee))
    }

    /// Replace the positional string arguments, keeping all other arguments
    #[must_use]
    pub fn with_string_args(&self, string_args: &[String]) -> Self {
        let Some(call) = &self.call else {
            return self.clone();
        };
        let args: Vec<String> = string_args
            .iter()
            .map(|arg| format!("\"{arg}\""))
            .chain(call.other_args.iter().cloned())
            .collect();
        Self {
            text: format!("@{}({})", call.callee, args.join(", ")),
            call: Some(DecoratorCall {
                callee: call.callee.clone(),
                string_args: string_args.to_vec(),
                other_args: call.other_args.clone(),
            }),
            trailing_comments: self.trailing_comments.clone(),
        }
    }
}

/// Call structure of a decorator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorCall {
    /// Called expression, e.g. `field_validator` or `pydantic.validator`
    pub callee: String,
    /// Contents of plain string literal arguments, in order
    pub string_args: Vec<String>,
    /// Source text of every other argument, in order
    pub other_args: Vec<String>,
}

/// Function or method definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Decorators, outermost first
    pub decorators: Vec<Decorator>,
    /// `def ...` text without decorators, dedented to column zero
    pub source: String,
}

/// Simple single-target assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assign {
    /// Assigned name
    pub target: String,
    /// Annotation text
    pub annotation: Option<String>,
    /// Right-hand side text
    pub value: Option<String>,
}

/// Class definition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name
    pub name: String,
    /// Decorators, outermost first
    pub decorators: Vec<Decorator>,
    /// PEP 695 type parameters text, brackets included
    pub type_params: Option<String>,
    /// Base classes and class keywords, as source text
    pub bases: Vec<String>,
    /// Comment on the `class` line
    pub header_comment: Option<Comment>,
    /// Body items
    pub body: Vec<ClassItem>,
    /// Comments after the last body item
    pub trailing_comments: Vec<Comment>,
}

impl ClassDef {
    /// Empty class with the given bases
    #[must_use]
    pub fn new(name: impl Into<String>, bases: Vec<String>) -> Self {
        Self {
            name: name.into(),
            decorators: Vec::new(),
            type_params: None,
            bases,
            header_comment: None,
            body: Vec::new(),
            trailing_comments: Vec::new(),
        }
    }

    /// Annotated fields in body order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.body.iter().filter_map(|item| match &item.kind {
            ClassItemKind::Field(field) => Some(field),
            _ => None,
        })
    }

    /// Unannotated assignments (enum members, class variables) in body order
    pub fn assignments(&self) -> impl Iterator<Item = &Assign> {
        self.body.iter().filter_map(|item| match &item.kind {
            ClassItemKind::Assign(assign) => Some(assign),
            _ => None,
        })
    }

    /// Methods in body order
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|item| match &item.kind {
            ClassItemKind::Method(method) => Some(method),
            _ => None,
        })
    }

    /// Last dotted segment of each positional base, generics stripped
    #[must_use]
    pub fn base_names(&self) -> Vec<&str> {
        self.bases
            .iter()
            .filter(|base| !is_keyword_argument(base))
            .map(|base| {
                let base = base.split('[').next().unwrap_or(base).trim();
                base.rsplit('.').next().unwrap_or(base)
            })
            .collect()
    }
}

fn is_keyword_argument(text: &str) -> bool {
    match text.find('=') {
        Some(index) => {
            let head = &text[..index];
            !head.is_empty()
                && head.trim().chars().all(|c| c.is_alphanumeric() || c == '_')
                && !text[index..].starts_with("==")
        }
        None => text.starts_with('*'),
    }
}

/// Class body item with its attached comments
#[derive(Debug, Clone, PartialEq)]
pub struct ClassItem {
    /// Item payload
    pub kind: ClassItemKind,
    /// Comments on the lines directly above the item
    pub leading_comments: Vec<Comment>,
    /// Comment on the same line as a single-line item
    pub trailing_comment: Option<Comment>,
}

impl ClassItem {
    /// Wrap an item kind without comments
    #[inline]
    #[must_use]
    pub fn new(kind: ClassItemKind) -> Self {
        Self {
            kind,
            leading_comments: Vec::new(),
            trailing_comment: None,
        }
    }
}

/// Class body payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ClassItemKind {
    /// `name: annotation [= default]`
    Field(Field),
    /// `name = value`
    Assign(Assign),
    /// Method definition
    Method(FunctionDef),
    /// `pass`
    Pass,
    /// Any other statement (docstrings included), dedented
    Raw(String),
}

impl ClassItemKind {
    /// Compound items are separated by blank lines when printed
    #[must_use]
    pub fn is_compound(&self) -> bool {
        match self {
            ClassItemKind::Method(_) => true,
            ClassItemKind::Raw(text) => text.contains('\n'),
            _ => false,
        }
    }

    /// Whether this is a string literal statement
    #[must_use]
    pub fn is_docstring(&self) -> bool {
        match self {
            ClassItemKind::Raw(text) => {
                let text = text.trim_start_matches(['r', 'R', 'u', 'U']);
                text.starts_with('"') || text.starts_with('\'')
            }
            _ => false,
        }
    }
}

/// Annotated class attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Annotation text
    pub annotation: String,
    /// Default value text
    pub default: Option<String>,
}

impl Field {
    /// Build a field
    #[must_use]
    pub fn new(name: impl Into<String>, annotation: impl Into<String>, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            annotation: annotation.into(),
            default,
        }
    }
}
