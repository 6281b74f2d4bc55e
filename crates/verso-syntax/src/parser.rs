//! tree-sitter backed parser
//!
//! Converts the concrete syntax tree produced by `tree-sitter-python` into the
//! shallow [`Module`] model. Comments are extras in tree-sitter; they are
//! re-attached to the neighbouring statement here.

use crate::ast::{
    Assign, ClassDef, ClassItemKind, Comment, Decorator, DecoratorCall, Field, FunctionDef,
    ImportAlias, ImportFrom, Module, Stmt, StmtKind,
};
use crate::error::{SyntaxError, SyntaxResult};
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser, Tree};

/// Create a parser configured for Python
pub(crate) fn python_parser() -> SyntaxResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SyntaxError::ParserInit(e.to_string()))?;
    Ok(parser)
}

/// Parse source into a raw tree-sitter tree
pub(crate) fn parse_tree(source: &str) -> SyntaxResult<Tree> {
    python_parser()?
        .parse(source, None)
        .ok_or(SyntaxError::ParseFailed)
}

/// Collect all children of a node
pub(crate) fn child_nodes<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children
}

/// Parse a whole source file
///
/// # Errors
/// Returns [`SyntaxError::InvalidSyntax`] pointing at the first error node.
pub fn parse_module(source: &str) -> SyntaxResult<Module> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    check_errors(root)?;

    let reader = Reader { source };
    let (items, trailing_comments) =
        reader.sequence(child_nodes(root), Vec::new(), |node| reader.statement(node))?;

    Ok(Module {
        body: items
            .into_iter()
            .map(|s| Stmt {
                kind: s.item,
                leading_comments: s.leading,
                trailing_comment: s.trailing,
            })
            .collect(),
        trailing_comments,
    })
}

/// Parse a snippet that must contain exactly one statement
///
/// # Errors
/// Fails on syntax errors or when the snippet holds zero or several statements.
pub fn parse_statement(source: &str) -> SyntaxResult<Stmt> {
    let mut module = parse_module(source)?;
    if module.body.len() != 1 {
        return Err(SyntaxError::UnexpectedNode {
            expected: "a single statement",
            found: format!("{} statements", module.body.len()),
        });
    }
    Ok(module.body.remove(0))
}

/// Parse a snippet that must contain exactly one (possibly decorated) function
///
/// # Errors
/// Fails on syntax errors or when the snippet is not a function definition.
pub fn parse_function(source: &str) -> SyntaxResult<FunctionDef> {
    let stmt = parse_statement(source)?;
    match stmt.kind {
        StmtKind::FunctionDef(function) => Ok(function),
        other => Err(SyntaxError::UnexpectedNode {
            expected: "a function definition",
            found: other.node_kind().to_string(),
        }),
    }
}

fn check_errors(root: Node<'_>) -> SyntaxResult<()> {
    if !root.has_error() {
        return Ok(());
    }
    match find_error(root) {
        Some(node) => {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "unexpected input".to_string()
            };
            Err(SyntaxError::invalid_syntax(position.row, position.column, message))
        }
        None => Err(SyntaxError::invalid_syntax(0, 0, "unexpected input")),
    }
}

fn find_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    child_nodes(node)
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(find_error)
}

/// Strip up to `column` leading spaces from every line but the first
///
/// tree-sitter node text starts at the node's column, so continuation lines
/// carry the enclosing indentation. Lines listed in `verbatim` lie inside a
/// string literal and are kept as they are.
pub(crate) fn dedent(text: &str, column: usize, verbatim: &BTreeSet<usize>) -> String {
    if column == 0 || !text.contains('\n') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if index == 0 || verbatim.contains(&index) {
            out.push_str(line);
            continue;
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        out.push_str(&line[spaces.min(column)..]);
    }
    out
}

/// Rows, relative to `node`, that continue a multi-line string literal
pub(crate) fn string_continuation_rows(node: Node<'_>) -> BTreeSet<usize> {
    let mut rows = BTreeSet::new();
    collect_string_rows(node, node.start_position().row, &mut rows);
    rows
}

fn collect_string_rows(node: Node<'_>, origin: usize, rows: &mut BTreeSet<usize>) {
    if node.kind() == "string" {
        let (start, end) = (node.start_position().row, node.end_position().row);
        rows.extend(start + 1 - origin..=end - origin);
        return;
    }
    for child in child_nodes(node) {
        collect_string_rows(child, origin, rows);
    }
}

/// Lines of a dedented snippet that continue a multi-line string literal
///
/// Unparseable snippets report no such lines.
pub(crate) fn verbatim_lines(text: &str) -> BTreeSet<usize> {
    if !text.contains('\n') {
        return BTreeSet::new();
    }
    parse_tree(text).map_or_else(|_| BTreeSet::new(), |tree| string_continuation_rows(tree.root_node()))
}

struct Sequenced<T> {
    item: T,
    leading: Vec<Comment>,
    trailing: Option<Comment>,
}

struct Reader<'s> {
    source: &'s str,
}

impl<'s> Reader<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn block_text(&self, node: Node<'_>) -> String {
        self.text_at(node, node.start_position().column)
    }

    /// Node text with continuation lines dedented by the enclosing `column`
    fn text_at(&self, node: Node<'_>, column: usize) -> String {
        if column == 0 {
            return self.text(node).to_string();
        }
        dedent(self.text(node), column, &string_continuation_rows(node))
    }

    /// Convert a run of sibling nodes, attaching comments
    ///
    /// A comment on the same row as a preceding single-line item trails it;
    /// any other comment leads the next item. Comments after the last item are
    /// returned separately.
    fn sequence<'t, T>(
        &self,
        children: Vec<Node<'t>>,
        mut pending: Vec<Comment>,
        mut convert: impl FnMut(Node<'t>) -> SyntaxResult<T>,
    ) -> SyntaxResult<(Vec<Sequenced<T>>, Vec<Comment>)> {
        let mut items: Vec<Sequenced<T>> = Vec::new();
        let mut single_line_row: Option<usize> = None;

        for child in children {
            if child.kind() == "comment" {
                let comment = Comment::new(self.text(child));
                let row = child.start_position().row;
                match items.last_mut() {
                    Some(last)
                        if pending.is_empty()
                            && last.trailing.is_none()
                            && single_line_row == Some(row) =>
                    {
                        last.trailing = Some(comment);
                    }
                    _ => pending.push(comment),
                }
                continue;
            }
            if !child.is_named() {
                continue;
            }

            let start = child.start_position().row;
            single_line_row = (start == child.end_position().row).then_some(start);
            let item = convert(child)?;
            items.push(Sequenced {
                item,
                leading: std::mem::take(&mut pending),
                trailing: None,
            });
        }

        Ok((items, pending))
    }

    fn statement(&self, node: Node<'_>) -> SyntaxResult<StmtKind> {
        let kind = match node.kind() {
            "import_statement" => StmtKind::Import(self.import_names(node)),
            "import_from_statement" => StmtKind::ImportFrom(self.import_from(node)),
            "future_import_statement" => {
                StmtKind::ImportFrom(ImportFrom::new("__future__", self.import_names(node)))
            }
            "class_definition" => StmtKind::ClassDef(self.class_def(node, Vec::new())?),
            "function_definition" => StmtKind::FunctionDef(self.function_def(node, Vec::new())),
            "decorated_definition" => {
                let decorators = self.decorators(node);
                match node.child_by_field_name("definition") {
                    Some(def) if def.kind() == "class_definition" => {
                        StmtKind::ClassDef(self.class_def(def, decorators)?)
                    }
                    Some(def) if def.kind() == "function_definition" => {
                        StmtKind::FunctionDef(self.function_def(def, decorators))
                    }
                    _ => StmtKind::Raw(self.block_text(node)),
                }
            }
            "expression_statement" => match self.assignment(node) {
                Some(assign) => StmtKind::Assign(assign),
                None => StmtKind::Raw(self.block_text(node)),
            },
            _ => StmtKind::Raw(self.block_text(node)),
        };
        Ok(kind)
    }

    fn import_names(&self, node: Node<'_>) -> Vec<ImportAlias> {
        let mut cursor = node.walk();
        let names: Vec<ImportAlias> = node
            .children_by_field_name("name", &mut cursor)
            .map(|child| self.import_alias(child))
            .collect();
        names
    }

    fn import_alias(&self, node: Node<'_>) -> ImportAlias {
        if node.kind() == "aliased_import" {
            ImportAlias {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                alias: node
                    .child_by_field_name("alias")
                    .map(|n| self.text(n).to_string()),
            }
        } else {
            ImportAlias::new(self.text(node))
        }
    }

    fn import_from(&self, node: Node<'_>) -> ImportFrom {
        let module = node
            .child_by_field_name("module_name")
            .map(|n| self.text(n).split_whitespace().collect::<String>())
            .unwrap_or_default();
        let wildcard = child_nodes(node)
            .iter()
            .any(|child| child.kind() == "wildcard_import");
        let names = if wildcard {
            vec![ImportAlias::new("*")]
        } else {
            self.import_names(node)
        };
        ImportFrom { module, names }
    }

    /// Decorators of a `decorated_definition`
    ///
    /// Own-line comments below a decorator stay with that decorator.
    fn decorators(&self, node: Node<'_>) -> Vec<Decorator> {
        let mut decorators: Vec<Decorator> = Vec::new();
        for child in child_nodes(node) {
            match child.kind() {
                "decorator" => decorators.push(self.decorator(child)),
                "comment" => {
                    if let Some(last) = decorators.last_mut() {
                        last.trailing_comments.push(Comment::new(self.text(child)));
                    }
                }
                _ => {}
            }
        }
        decorators
    }

    fn decorator(&self, node: Node<'_>) -> Decorator {
        let call = child_nodes(node)
            .into_iter()
            .find(|child| child.is_named() && child.kind() != "comment")
            .filter(|expression| expression.kind() == "call")
            .and_then(|call| self.decorator_call(call));
        Decorator {
            text: self.text(node).trim_end().to_string(),
            call,
            trailing_comments: Vec::new(),
        }
    }

    fn decorator_call(&self, call: Node<'_>) -> Option<DecoratorCall> {
        let callee = self.text(call.child_by_field_name("function")?).to_string();
        let arguments = call.child_by_field_name("arguments")?;
        if arguments.kind() != "argument_list" {
            return None;
        }

        let mut string_args = Vec::new();
        let mut other_args = Vec::new();
        for arg in child_nodes(arguments)
            .into_iter()
            .filter(|arg| arg.is_named() && arg.kind() != "comment")
        {
            match self.plain_string(arg) {
                Some(value) if other_args.is_empty() => string_args.push(value),
                _ => other_args.push(self.text(arg).to_string()),
            }
        }

        Some(DecoratorCall {
            callee,
            string_args,
            other_args,
        })
    }

    /// Contents of a prefix-free, interpolation-free string literal
    fn plain_string(&self, node: Node<'_>) -> Option<String> {
        if node.kind() != "string" {
            return None;
        }
        let children = child_nodes(node);
        let start = children.first().filter(|c| c.kind() == "string_start")?;
        let end = children.last().filter(|c| c.kind() == "string_end")?;
        let prefixed = self
            .text(*start)
            .chars()
            .any(|c| c.is_ascii_alphabetic());
        if prefixed || children.iter().any(|c| c.kind() == "interpolation") {
            return None;
        }
        Some(self.source[start.end_byte()..end.start_byte()].to_string())
    }

    fn function_def(&self, node: Node<'_>, decorators: Vec<Decorator>) -> FunctionDef {
        FunctionDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            decorators,
            source: self.block_text(node),
        }
    }

    fn class_def(&self, node: Node<'_>, decorators: Vec<Decorator>) -> SyntaxResult<ClassDef> {
        let header_row = node.start_position().row;
        let mut header_comment = None;
        let mut pending = Vec::new();

        let mut bases = Vec::new();
        if let Some(arguments) = node.child_by_field_name("superclasses") {
            for arg in child_nodes(arguments) {
                if arg.kind() == "comment" {
                    pending.push(Comment::new(self.text(arg)));
                } else if arg.is_named() {
                    bases.push(self.text(arg).to_string());
                }
            }
        }

        let body = node.child_by_field_name("body");
        let body_start = body.map_or(usize::MAX, |b| b.start_byte());
        let mut after_body = Vec::new();
        for child in child_nodes(node) {
            if child.kind() != "comment" {
                continue;
            }
            if child.start_byte() >= body_start {
                after_body.push(child);
                continue;
            }
            let comment = Comment::new(self.text(child));
            if child.start_position().row == header_row && header_comment.is_none() {
                header_comment = Some(comment);
            } else {
                pending.push(comment);
            }
        }

        // comments can land on either side of the block boundary
        let mut children = body.map(child_nodes).unwrap_or_default();
        while let Some(first) = children.first().copied() {
            if first.kind() != "comment" || first.start_position().row != header_row {
                break;
            }
            if header_comment.is_some() {
                pending.push(Comment::new(self.text(first)));
            } else {
                header_comment = Some(Comment::new(self.text(first)));
            }
            children.remove(0);
        }
        children.extend(after_body);

        let (items, trailing_comments) =
            self.sequence(children, pending, |item| Ok(self.class_item(item)))?;

        Ok(ClassDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            decorators,
            type_params: node
                .child_by_field_name("type_parameters")
                .map(|n| self.text(n).to_string()),
            bases,
            header_comment,
            body: items
                .into_iter()
                .map(|s| crate::ast::ClassItem {
                    kind: s.item,
                    leading_comments: s.leading,
                    trailing_comment: s.trailing,
                })
                .collect(),
            trailing_comments,
        })
    }

    fn class_item(&self, node: Node<'_>) -> ClassItemKind {
        match node.kind() {
            "expression_statement" => match self.assignment(node) {
                Some(Assign {
                    target,
                    annotation: Some(annotation),
                    value,
                }) => ClassItemKind::Field(Field {
                    name: target,
                    annotation,
                    default: value,
                }),
                Some(assign) => ClassItemKind::Assign(assign),
                None => ClassItemKind::Raw(self.block_text(node)),
            },
            "pass_statement" => ClassItemKind::Pass,
            "function_definition" => ClassItemKind::Method(self.function_def(node, Vec::new())),
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => {
                    ClassItemKind::Method(self.function_def(def, self.decorators(node)))
                }
                _ => ClassItemKind::Raw(self.block_text(node)),
            },
            _ => ClassItemKind::Raw(self.block_text(node)),
        }
    }

    /// Recognize `name[: annotation][ = value]` with a single plain target
    fn assignment(&self, node: Node<'_>) -> Option<Assign> {
        let named: Vec<Node<'_>> = child_nodes(node)
            .into_iter()
            .filter(|child| child.is_named() && child.kind() != "comment")
            .collect();
        let [assignment] = named.as_slice() else {
            return None;
        };
        if assignment.kind() != "assignment" {
            return None;
        }
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        let right = assignment.child_by_field_name("right");
        if right.is_some_and(|r| r.kind() == "assignment") {
            return None;
        }
        let column = node.start_position().column;
        let annotation = assignment
            .child_by_field_name("type")
            .map(|t| self.text_at(t, column));
        if annotation.is_none() && right.is_none() {
            return None;
        }
        Some(Assign {
            target: self.text(left).to_string(),
            annotation,
            value: right.map(|r| self.text_at(r, column)),
        })
    }
}
