// Statement classification

use sqlscope_ast::{SelectCore, SelectStatement, Statement};

/// Whether `statements` is exactly one plain SELECT.
///
/// A WITH clause in front of the SELECT and redundant parentheses around it
/// are allowed. A set operation is a compound query, not a single SELECT,
/// even when every branch is one; a bare VALUES list is not a SELECT.
#[must_use]
pub fn is_single_select(statements: &[Statement]) -> bool {
    matches!(statements, [Statement::Select(query)] if is_plain_select(query))
}

fn is_plain_select(query: &SelectStatement) -> bool {
    if query.is_compound() {
        return false;
    }
    match &query.body.select {
        SelectCore::Select(_) => true,
        SelectCore::Nested(inner, _) => is_plain_select(inner),
        SelectCore::Values(..) => false,
    }
}
