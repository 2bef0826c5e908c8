// Table Extractor
//
// Collects the base tables a script touches: FROM and JOIN tables at any
// depth, DML targets, and DDL objects. CTE references and derived tables are
// not tables; their bodies are still searched.

use serde::{Deserialize, Serialize};
use sqlscope_ast::Statement;
use sqlscope_error::ResolutionError;
use sqlscope_parser::Dialect;

use crate::scope::Resolver;

/// Order of the names returned by [`extract_tables`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrder {
    /// Order of first appearance in the source text.
    #[default]
    FirstSeen,
    /// Lexicographic byte order.
    Sorted,
}

/// Qualified names of every base table referenced by `statements`.
///
/// Names are unquoted and joined by `.`. Two references are the same table
/// when their qualified names are equal under the dialect's case rules; the
/// first spelling in the source is kept.
pub fn extract_tables(
    statements: &[Statement],
    dialect: &Dialect,
    order: TableOrder,
) -> Result<Vec<String>, ResolutionError> {
    let span = tracing::debug_span!(
        target: "sqlscope.analysis",
        "extract_tables",
        statements = statements.len(),
        tables = tracing::field::Empty,
    );
    let _guard = span.enter();

    let mut sites = Vec::new();
    for stmt in statements {
        let resolved = Resolver::new(dialect).resolve_statement(stmt)?;
        sites.extend(
            resolved
                .tables
                .iter()
                .map(|site| {
                    let key = dialect.fold_name(site.name);
                    (site.name.span.start, key, site.name.qualified())
                }),
        );
    }
    sites.sort_by_key(|(offset, ..)| *offset);

    let mut seen = std::collections::HashSet::new();
    let mut names: Vec<String> = sites
        .into_iter()
        .filter(|(_, key, _)| seen.insert(key.clone()))
        .map(|(.., name)| name)
        .collect();
    if order == TableOrder::Sorted {
        names.sort();
    }

    span.record("tables", names.len());
    Ok(names)
}
