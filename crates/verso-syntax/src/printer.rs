//! Deterministic printer
//!
//! Output depends only on the tree: four-space indentation, two blank lines
//! around top-level compound statements, one blank line around methods inside
//! a class, two spaces before a trailing comment.

use crate::ast::{
    Assign, ClassDef, ClassItem, ClassItemKind, Comment, Decorator, Field, FunctionDef,
    ImportFrom, Module, Stmt, StmtKind,
};
use crate::parser::verbatim_lines;
use std::collections::BTreeSet;
use std::fmt::Write;

const INDENT: &str = "    ";

/// Print a module to source text
#[must_use]
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    let mut previous: Option<&Stmt> = None;

    for stmt in &module.body {
        if let Some(prev) = previous {
            if prev.kind.is_compound() || stmt.kind.is_compound() {
                out.push_str("\n\n");
            }
        }
        write_stmt(&mut out, stmt);
        previous = Some(stmt);
    }

    if !module.trailing_comments.is_empty() && previous.is_some_and(|s| s.kind.is_compound()) {
        out.push('\n');
    }
    write_comments(&mut out, &module.trailing_comments, "");
    out
}

/// Print a single statement at column zero
#[must_use]
pub fn print_stmt(stmt: &Stmt) -> String {
    let mut out = String::new();
    write_stmt(&mut out, stmt);
    out
}

fn write_stmt(out: &mut String, stmt: &Stmt) {
    write_comments(out, &stmt.leading_comments, "");
    match &stmt.kind {
        StmtKind::ClassDef(class) => write_class(out, class, "", stmt.trailing_comment.as_ref()),
        StmtKind::FunctionDef(function) => write_function(out, function, ""),
        kind => {
            let text = match kind {
                StmtKind::Import(aliases) => format!("import {}", join(aliases)),
                StmtKind::ImportFrom(from) => import_from_text(from),
                StmtKind::Assign(assign) => assign_text(assign),
                StmtKind::Raw(text) => text.clone(),
                StmtKind::ClassDef(_) | StmtKind::FunctionDef(_) => unreachable!("handled above"),
            };
            write_lines(out, &text, "", stmt.trailing_comment.as_ref());
        }
    }
}

fn write_class(out: &mut String, class: &ClassDef, indent: &str, trailing: Option<&Comment>) {
    write_decorators(out, &class.decorators, indent);

    let _ = write!(out, "{indent}class {}", class.name);
    if let Some(params) = &class.type_params {
        out.push_str(params);
    }
    if !class.bases.is_empty() {
        let _ = write!(out, "({})", class.bases.join(", "));
    }
    out.push(':');
    if let Some(comment) = class.header_comment.as_ref().or(trailing) {
        let _ = write!(out, "  {comment}");
    }
    out.push('\n');

    let inner = format!("{indent}{INDENT}");
    if class.body.is_empty() {
        let _ = writeln!(out, "{inner}pass");
    }

    let mut previous: Option<&ClassItem> = None;
    for item in &class.body {
        if let Some(prev) = previous {
            if prev.kind.is_compound() || item.kind.is_compound() {
                out.push('\n');
            }
        }
        write_class_item(out, item, &inner);
        previous = Some(item);
    }
    write_comments(out, &class.trailing_comments, &inner);
}

fn write_class_item(out: &mut String, item: &ClassItem, indent: &str) {
    write_comments(out, &item.leading_comments, indent);
    let text = match &item.kind {
        ClassItemKind::Field(field) => field_text(field),
        ClassItemKind::Assign(assign) => assign_text(assign),
        ClassItemKind::Pass => "pass".to_string(),
        ClassItemKind::Raw(text) => text.clone(),
        ClassItemKind::Method(function) => {
            write_function(out, function, indent);
            return;
        }
    };
    write_lines(out, &text, indent, item.trailing_comment.as_ref());
}

fn write_function(out: &mut String, function: &FunctionDef, indent: &str) {
    write_decorators(out, &function.decorators, indent);
    write_lines(out, &function.source, indent, None);
}

fn write_decorators(out: &mut String, decorators: &[Decorator], indent: &str) {
    for decorator in decorators {
        let _ = writeln!(out, "{indent}{}", decorator.text);
        write_comments(out, &decorator.trailing_comments, indent);
    }
}

fn write_comments(out: &mut String, comments: &[Comment], indent: &str) {
    for comment in comments {
        let _ = writeln!(out, "{indent}{comment}");
    }
}

/// Write possibly multi-line text at an indentation level
///
/// The trailing comment goes on the last line. Empty lines and lines inside
/// multi-line string literals are not indented.
fn write_lines(out: &mut String, text: &str, indent: &str, trailing: Option<&Comment>) {
    let verbatim = if indent.is_empty() {
        BTreeSet::new()
    } else {
        verbatim_lines(text)
    };
    let mut lines = text.split('\n').enumerate().peekable();
    while let Some((index, line)) = lines.next() {
        if !line.is_empty() && !verbatim.contains(&index) {
            out.push_str(indent);
        }
        out.push_str(line);
        if lines.peek().is_none() {
            if let Some(comment) = trailing {
                let _ = write!(out, "  {comment}");
            }
        }
        out.push('\n');
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn import_from_text(from: &ImportFrom) -> String {
    format!("from {} import {}", from.module, join(&from.names))
}

fn field_text(field: &Field) -> String {
    match &field.default {
        Some(default) => format!("{}: {} = {}", field.name, field.annotation, default),
        None => format!("{}: {}", field.name, field.annotation),
    }
}

fn assign_text(assign: &Assign) -> String {
    let mut text = assign.target.clone();
    if let Some(annotation) = &assign.annotation {
        let _ = write!(text, ": {annotation}");
    }
    if let Some(value) = &assign.value {
        let _ = write!(text, " = {value}");
    }
    text
}
