//! Identifier renaming on source snippets
//!
//! Renames whole identifier tokens only. Strings, comments, attribute names
//! (`obj.Widget`) and keyword-argument names (`f(Widget=1)`) are untouched.

use crate::error::{SyntaxError, SyntaxResult};
use crate::parser::parse_tree;
use std::collections::BTreeMap;
use std::ops::Range;
use tree_sitter::Node;

/// Rename identifiers in a snippet of Python source
///
/// A snippet starting with `@` is treated as a decorator line.
///
/// # Errors
/// Returns [`SyntaxError::InvalidSyntax`] when the snippet does not parse.
pub fn rename_identifiers(text: &str, renames: &BTreeMap<String, String>) -> SyntaxResult<String> {
    if renames.is_empty() || !renames.keys().any(|old| text.contains(old.as_str())) {
        return Ok(text.to_string());
    }

    let (prefix, body) = match text.strip_prefix('@') {
        Some(rest) => ("@", rest),
        None => ("", text),
    };

    let tree = parse_tree(body)?;
    let root = tree.root_node();
    if root.has_error() {
        let position = root.start_position();
        return Err(SyntaxError::invalid_syntax(
            position.row,
            position.column,
            format!("cannot rename identifiers in `{text}`"),
        ));
    }

    let mut edits = Vec::new();
    collect_renames(root, body, renames, &mut edits);

    let mut out = body.to_string();
    // apply back to front so earlier ranges stay valid
    for (range, replacement) in edits.into_iter().rev() {
        out.replace_range(range, replacement);
    }
    Ok(format!("{prefix}{out}"))
}

fn collect_renames<'r>(
    node: Node<'_>,
    source: &str,
    renames: &'r BTreeMap<String, String>,
    edits: &mut Vec<(Range<usize>, &'r str)>,
) {
    if node.kind() == "identifier" && !is_member_name(node) {
        if let Some(new) = renames.get(&source[node.byte_range()]) {
            edits.push((node.byte_range(), new.as_str()));
        }
        return;
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_renames(child, source, renames, edits);
        }
    }
}

/// Identifier names a member or keyword rather than a binding
fn is_member_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let field = match parent.kind() {
        "attribute" => "attribute",
        "keyword_argument" => "name",
        _ => return false,
    };
    parent
        .child_by_field_name(field)
        .is_some_and(|named| named.id() == node.id())
}
