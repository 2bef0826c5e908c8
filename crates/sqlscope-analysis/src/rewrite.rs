// Rewriter
//
// Minimal-diff rewrites of SQL text. Both transforms compute a list of edits
// against byte spans of the original source and splice them in; text outside
// the edited spans (whitespace, comments, keyword casing) is kept verbatim.

use sqlscope_ast::{Ident, ObjectName, SelectCore, SelectStatement, Span, Statement};
use sqlscope_error::{ResolutionError, SqlError};
use sqlscope_parser::{Dialect, LimitStyle};

use crate::scope::{ResolvedStatement, Resolver, TableSite};

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Replace the text under `span` (empty for an insertion) with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    span: Span,
    text: String,
}

impl Edit {
    fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    fn insert(at: u32, text: impl Into<String>) -> Self {
        Self::replace(Span::new(at, at), text)
    }
}

/// Splice `edits` into `sql`. Edits overlapping an earlier one are dropped.
fn apply_edits(sql: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut out = String::with_capacity(sql.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut pos = 0;
    for edit in edits {
        let (start, end) = (edit.span.start_usize(), edit.span.end_usize());
        if start < pos || end > sql.len() {
            continue;
        }
        out.push_str(&sql[pos..start]);
        out.push_str(&edit.text);
        pos = end;
    }
    out.push_str(&sql[pos..]);
    out
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

/// Rename base tables of `statements`, which were parsed from `sql`.
///
/// Mapping keys are qualified names as [`crate::extract_tables`] reports
/// them, compared under the dialect's case rules. Aliases are kept, and
/// column qualifiers that spell the old name of an unaliased renamed table
/// follow the rename. Keys matching no table are ignored.
pub fn rename_tables<I, K, V>(
    sql: &str,
    statements: &[Statement],
    dialect: &Dialect,
    mapping: I,
) -> Result<String, ResolutionError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mapping = RenameMap::new(mapping);
    if mapping.is_empty() {
        return Ok(sql.to_owned());
    }

    let span = tracing::debug_span!(
        target: "sqlscope.analysis",
        "rename_tables",
        mappings = mapping.len(),
        edits = tracing::field::Empty,
    );
    let _guard = span.enter();

    let mut edits = Vec::new();
    for stmt in statements {
        let resolved = Resolver::new(dialect).resolve_statement(stmt)?;
        rename_in_statement(&resolved, dialect, &mapping, &mut edits)?;
    }

    span.record("edits", edits.len());
    Ok(apply_edits(sql, edits))
}

/// Old name to new name parts, both split on `.`.
struct RenameMap {
    entries: Vec<(Vec<String>, Vec<String>)>,
}

impl RenameMap {
    fn new<I, K, V>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let split = |name: &str| name.split('.').map(str::to_owned).collect::<Vec<_>>();
        let mut entries: Vec<_> = mapping
            .into_iter()
            .map(|(old, new)| (split(old.as_ref()), split(new.as_ref())))
            .collect();
        entries.sort();
        Self { entries }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// New name parts for `name`. A key spelled exactly like `name` wins;
    /// otherwise unquoted parts compare under the dialect's case rules and
    /// quoted parts compare exactly where quoting keeps case.
    fn lookup(&self, name: &ObjectName, dialect: &Dialect) -> Option<&[String]> {
        let matches = |key: &Vec<String>, eq: &dyn Fn(&Ident, &str) -> bool| {
            key.len() == name.parts.len()
                && name.parts.iter().zip(key).all(|(part, k)| eq(part, k))
        };
        let exact = self
            .entries
            .iter()
            .find(|(key, _)| matches(key, &|part, k| part.value == k));
        exact
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| matches(key, &|part, k| dialect.ident_names(part, k)))
            })
            .map(|(_, new)| new.as_slice())
    }
}

fn rename_in_statement(
    resolved: &ResolvedStatement<'_>,
    dialect: &Dialect,
    mapping: &RenameMap,
    edits: &mut Vec<Edit>,
) -> Result<(), ResolutionError> {
    for site in &resolved.tables {
        let Some(new_parts) = mapping.lookup(site.name, dialect) else {
            continue;
        };
        edits.push(Edit::replace(site.name.span, render_name(site.name, new_parts)));

        if site.alias.is_some() {
            continue;
        }
        let Some(binding) = site.binding else {
            continue;
        };
        check_binding_clash(resolved, site, binding, new_parts, dialect)?;

        for qualifier in &resolved.qualifiers {
            if qualifier.scope == site.scope && qualifier.binding == binding {
                let keep = qualifier.qualifier.parts.len().min(new_parts.len());
                let tail = &new_parts[new_parts.len() - keep..];
                edits.push(Edit::replace(
                    qualifier.qualifier.span,
                    render_name(qualifier.qualifier, tail),
                ));
            }
        }
    }
    Ok(())
}

/// A renamed unaliased table is referenced by its new last part; that name
/// must not already belong to another binding of the same FROM clause.
fn check_binding_clash(
    resolved: &ResolvedStatement<'_>,
    site: &TableSite<'_>,
    binding: usize,
    new_parts: &[String],
    dialect: &Dialect,
) -> Result<(), ResolutionError> {
    let Some(last) = new_parts.last() else {
        return Ok(());
    };
    let quoted = site.name.parts.iter().all(Ident::is_quoted);
    let new_name = if quoted && dialect.quoted_case_sensitive {
        last.clone()
    } else {
        dialect.fold(last)
    };
    let clash = resolved
        .tree
        .get(site.scope)
        .bindings
        .iter()
        .enumerate()
        .any(|(i, b)| i != binding && b.name.as_deref() == Some(new_name.as_str()));
    if clash {
        return Err(ResolutionError::duplicate_alias(last.as_str()).at(site.name.span.start_usize()));
    }
    Ok(())
}

/// Spell `parts` the way `original` was quoted.
///
/// A name written as one quoted token (`` `project.dataset.table` ``) is
/// rewritten as one quoted token; a name whose parts are all quoted with the
/// same character gets every part quoted; anything else is written bare.
fn render_name(original: &ObjectName, parts: &[String]) -> String {
    let quote = original
        .parts
        .first()
        .and_then(|p| p.quote)
        .filter(|q| original.parts.iter().all(|p| p.quote == Some(*q)));
    let Some(quote) = quote else {
        return parts.join(".");
    };
    let single_token = original.parts.len() > 1
        && original.parts.iter().all(|p| p.span == original.span);
    if single_token {
        quote_ident(&parts.join("."), quote)
    } else {
        parts
            .iter()
            .map(|p| quote_ident(p, quote))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn quote_ident(value: &str, open: char) -> String {
    let close = if open == '[' { ']' } else { open };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(open);
    for c in value.chars() {
        if c == close {
            out.push(close);
        }
        out.push(c);
    }
    out.push(close);
    out
}

// ---------------------------------------------------------------------------
// Add limit
// ---------------------------------------------------------------------------

/// Cap the rows returned by the single query in `statements`.
///
/// A query that already carries LIMIT, FETCH, or TOP is returned unchanged.
/// For a set operation the cap applies to the whole chain.
pub fn add_limit(
    sql: &str,
    statements: &[Statement],
    dialect: &Dialect,
    limit: u64,
) -> Result<String, SqlError> {
    let [stmt] = statements else {
        return Err(SqlError::not_limitable(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    };
    let Statement::Select(query) = stmt else {
        return Err(SqlError::not_limitable(format!(
            "{} statement is not a query",
            stmt.kind_name()
        )));
    };

    let target = limit_target(query);
    if has_limit(target) {
        tracing::debug!(target: "sqlscope.analysis", "query already limited");
        return Ok(sql.to_owned());
    }

    let edit = match dialect.limit_style {
        LimitStyle::Limit => limit_clause_edit(target, limit),
        LimitStyle::FetchFirst => fetch_edit(target, limit, "FIRST"),
        LimitStyle::Top => top_edit(sql, target, dialect, limit),
    };
    Ok(apply_edits(sql, vec![edit]))
}

/// Look through redundant parentheses: `(SELECT ...)` limits its inner query.
fn limit_target(mut query: &SelectStatement) -> &SelectStatement {
    while let SelectCore::Nested(inner, _) = &query.body.select {
        if query.is_compound()
            || query.with.is_some()
            || !query.order_by.is_empty()
            || query.limit.is_some()
        {
            break;
        }
        query = inner;
    }
    query
}

fn has_limit(query: &SelectStatement) -> bool {
    if query.limit.as_ref().is_some_and(|l| l.limit.is_some()) {
        return true;
    }
    !query.is_compound()
        && matches!(&query.body.select, SelectCore::Select(select) if select.top.is_some())
}

/// `LIMIT n` at the end, or before an OFFSET that has no LIMIT.
fn limit_clause_edit(query: &SelectStatement, limit: u64) -> Edit {
    match &query.limit {
        Some(clause) => Edit::insert(clause.span.start, format!("LIMIT {limit} ")),
        None => tail_insert(query, format!("LIMIT {limit}")),
    }
}

/// Append `clause` to the query, ahead of any row locking clause.
fn tail_insert(query: &SelectStatement, clause: String) -> Edit {
    match query.locking.first() {
        Some(lock) => Edit::insert(lock.span.start, format!("{clause} ")),
        None => Edit::insert(query.span.end, format!(" {clause}")),
    }
}

/// `FETCH FIRST n ROWS ONLY`, or `FETCH NEXT` after an existing OFFSET.
fn fetch_edit(query: &SelectStatement, limit: u64, word: &str) -> Edit {
    let word = if query.limit.is_some() { "NEXT" } else { word };
    tail_insert(query, format!("FETCH {word} {limit} ROWS ONLY"))
}

fn top_edit(sql: &str, query: &SelectStatement, dialect: &Dialect, limit: u64) -> Edit {
    if query.limit.is_some() && dialect.offset_fetch {
        return fetch_edit(query, limit, "NEXT");
    }
    if !query.is_compound() {
        if let SelectCore::Select(select) = &query.body.select {
            return Edit::insert(select.head_span.end, format!(" TOP {limit}"));
        }
    }
    if query.is_compound() && dialect.offset_fetch {
        let order = if query.order_by.is_empty() {
            "ORDER BY (SELECT NULL) "
        } else {
            ""
        };
        return tail_insert(
            query,
            format!("{order}OFFSET 0 ROWS FETCH NEXT {limit} ROWS ONLY"),
        );
    }
    // Wrap everything after the WITH clause in a limited derived table.
    let body = Span::new(query.body.select.span().start, query.span.end);
    Edit::replace(
        body,
        format!(
            "SELECT TOP {limit} * FROM ({}) AS limited_query",
            body.text(sql)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_error::ResolutionErrorKind;
    use sqlscope_parser::dialect::{ANSI, BIGQUERY, MYSQL, ORACLE, POSTGRES, TERADATA, TSQL};
    use sqlscope_parser::parse_sql;

    fn parse_in(sql: &str, dialect: &Dialect) -> Vec<Statement> {
        parse_sql(sql, dialect).unwrap()
    }

    fn rename(sql: &str, dialect: &Dialect, mapping: &[(&str, &str)]) -> String {
        let stmts = parse_in(sql, dialect);
        rename_tables(sql, &stmts, dialect, mapping.iter().copied()).unwrap()
    }

    fn limited(sql: &str, dialect: &Dialect, limit: u64) -> String {
        let stmts = parse_in(sql, dialect);
        add_limit(sql, &stmts, dialect, limit).unwrap()
    }

    // ── rename ──────────────────────────────────────────────────────────

    #[test]
    fn empty_mapping_is_identity() {
        let sql = "select *  -- keep\nfrom   T /* c */ where x=1;";
        assert_eq!(rename(sql, &ANSI, &[]), sql);
    }

    #[test]
    fn rename_keeps_alias_and_layout() {
        assert_eq!(
            rename(
                "SELECT o.id\nFROM   sales.orders AS o -- note\nWHERE o.id > 1",
                &ANSI,
                &[("sales.orders", "archive.orders_2020")]
            ),
            "SELECT o.id\nFROM   archive.orders_2020 AS o -- note\nWHERE o.id > 1"
        );
    }

    #[test]
    fn rename_is_case_folded() {
        assert_eq!(
            rename("SELECT * FROM Orders", &ANSI, &[("ORDERS", "orders_v2")]),
            "SELECT * FROM orders_v2"
        );
    }

    #[test]
    fn rename_leaves_quoted_names_of_another_case() {
        assert_eq!(
            rename(
                r#"SELECT * FROM "Foo" f JOIN foo g ON f.id = g.id"#,
                &POSTGRES,
                &[("foo", "bar")]
            ),
            r#"SELECT * FROM "Foo" f JOIN bar g ON f.id = g.id"#
        );
        assert_eq!(
            rename(r#"SELECT * FROM "Foo" f, Bar b"#, &POSTGRES, &[("Foo", "Baz")]),
            r#"SELECT * FROM "Baz" f, Bar b"#
        );
        assert_eq!(
            rename("SELECT * FROM [Foo] f", &TSQL, &[("foo", "bar")]),
            "SELECT * FROM [bar] f"
        );
    }

    #[test]
    fn rename_select_into_and_locked_tables() {
        assert_eq!(
            rename(
                "SELECT a INTO staging.copy FROM src WHERE a > 0",
                &TSQL,
                &[("staging.copy", "staging.copy_v2"), ("src", "raw.src")]
            ),
            "SELECT a INTO staging.copy_v2 FROM raw.src WHERE a > 0"
        );
        assert_eq!(
            rename("SELECT * FROM jobs FOR UPDATE OF jobs NOWAIT", &POSTGRES, &[("jobs", "queue")]),
            "SELECT * FROM queue FOR UPDATE OF queue NOWAIT"
        );
    }

    #[test]
    fn rename_unaliased_rewrites_qualifiers() {
        assert_eq!(
            rename(
                "SELECT orders.id, c.name FROM orders JOIN customers c ON orders.cid = c.id",
                &ANSI,
                &[("orders", "shop.purchases"), ("customers", "crm.people")]
            ),
            "SELECT purchases.id, c.name FROM shop.purchases JOIN crm.people c ON purchases.cid = c.id"
        );
    }

    #[test]
    fn rename_keeps_quote_style() {
        assert_eq!(
            rename(
                "SELECT * FROM `proj.ds.t` JOIN `proj`.`ds`.`u` USING (id)",
                &BIGQUERY,
                &[("proj.ds.t", "proj.ds.t2"), ("proj.ds.u", "other.ds.u")]
            ),
            "SELECT * FROM `proj.ds.t2` JOIN `other`.`ds`.`u` USING (id)"
        );
        assert_eq!(
            rename("SELECT * FROM [dbo].[t]", &TSQL, &[("dbo.t", "dbo.t_new")]),
            "SELECT * FROM [dbo].[t_new]"
        );
    }

    #[test]
    fn rename_dml_and_ddl_targets() {
        assert_eq!(
            rename(
                "INSERT INTO t SELECT * FROM s; DROP TABLE t; CREATE TABLE t AS SELECT 1",
                &ANSI,
                &[("t", "t2")]
            ),
            "INSERT INTO t2 SELECT * FROM s; DROP TABLE t2; CREATE TABLE t2 AS SELECT 1"
        );
    }

    #[test]
    fn rename_ignores_cte_of_the_same_name() {
        assert_eq!(
            rename(
                "WITH t AS (SELECT * FROM t) SELECT * FROM t",
                &ANSI,
                &[("t", "base")]
            ),
            "WITH t AS (SELECT * FROM base) SELECT * FROM t"
        );
    }

    #[test]
    fn unmatched_key_is_noop() {
        let sql = "SELECT * FROM a";
        assert_eq!(rename(sql, &ANSI, &[("zzz", "yyy")]), sql);
    }

    #[test]
    fn rename_into_existing_binding_name_is_duplicate_alias() {
        let sql = "SELECT * FROM a JOIN b ON a.id = b.id";
        let stmts = parse_in(sql, &ANSI);
        let err = rename_tables(sql, &stmts, &ANSI, [("a", "b")]).unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::DuplicateAlias);
        assert_eq!(err.name, "b");
    }

    #[test]
    fn rename_with_alias_does_not_clash() {
        assert_eq!(
            rename("SELECT * FROM a x JOIN b ON x.id = b.id", &ANSI, &[("a", "b")]),
            "SELECT * FROM b x JOIN b ON x.id = b.id"
        );
    }

    // ── add_limit ───────────────────────────────────────────────────────

    #[test]
    fn appends_limit() {
        assert_eq!(limited("SELECT * FROM t", &ANSI, 10), "SELECT * FROM t LIMIT 10");
        assert_eq!(
            limited("SELECT * FROM t ORDER BY a; -- done", &POSTGRES, 5),
            "SELECT * FROM t ORDER BY a LIMIT 5; -- done"
        );
    }

    #[test]
    fn existing_limit_is_untouched() {
        for sql in [
            "SELECT * FROM t LIMIT 3",
            "SELECT * FROM t LIMIT 1, 2",
            "SELECT * FROM t LIMIT ALL",
        ] {
            assert_eq!(limited(sql, &MYSQL, 100), sql);
        }
        let sql = "SELECT TOP 5 * FROM t";
        assert_eq!(limited(sql, &TSQL, 100), sql);
        let sql = "SELECT * FROM t FETCH FIRST 2 ROWS ONLY";
        assert_eq!(limited(sql, &ORACLE, 100), sql);
    }

    #[test]
    fn compound_query_limits_the_chain() {
        assert_eq!(
            limited("SELECT a FROM x UNION ALL SELECT a FROM y", &ANSI, 7),
            "SELECT a FROM x UNION ALL SELECT a FROM y LIMIT 7"
        );
    }

    #[test]
    fn offset_only_gets_limit_before_offset() {
        assert_eq!(
            limited("SELECT * FROM t ORDER BY a OFFSET 20", &POSTGRES, 10),
            "SELECT * FROM t ORDER BY a LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn limit_goes_before_locking_clause() {
        assert_eq!(
            limited("SELECT * FROM jobs WHERE state = 'new' FOR UPDATE SKIP LOCKED", &POSTGRES, 1),
            "SELECT * FROM jobs WHERE state = 'new' LIMIT 1 FOR UPDATE SKIP LOCKED"
        );
        assert_eq!(
            limited("SELECT * FROM jobs LOCK IN SHARE MODE", &MYSQL, 3),
            "SELECT * FROM jobs LIMIT 3 LOCK IN SHARE MODE"
        );
    }

    #[test]
    fn parenthesized_query_limits_inside() {
        assert_eq!(
            limited("(SELECT * FROM t)", &ANSI, 1),
            "(SELECT * FROM t LIMIT 1)"
        );
    }

    #[test]
    fn top_dialects() {
        assert_eq!(
            limited("SELECT DISTINCT a FROM t", &TSQL, 10),
            "SELECT DISTINCT TOP 10 a FROM t"
        );
        assert_eq!(
            limited("SELECT a FROM x UNION SELECT a FROM y", &TSQL, 10),
            "SELECT a FROM x UNION SELECT a FROM y ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            limited("SELECT a FROM t ORDER BY a OFFSET 5 ROWS", &TSQL, 10),
            "SELECT a FROM t ORDER BY a OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            limited("SELECT a FROM x UNION SELECT a FROM y", &TERADATA, 3),
            "SELECT TOP 3 * FROM (SELECT a FROM x UNION SELECT a FROM y) AS limited_query"
        );
        assert_eq!(
            limited("WITH c AS (SELECT 1 AS a) SELECT a FROM c UNION SELECT a FROM c", &TERADATA, 3),
            "WITH c AS (SELECT 1 AS a) SELECT TOP 3 * FROM (SELECT a FROM c UNION SELECT a FROM c) AS limited_query"
        );
    }

    #[test]
    fn fetch_first_dialect() {
        assert_eq!(
            limited("SELECT a FROM t", &ORACLE, 4),
            "SELECT a FROM t FETCH FIRST 4 ROWS ONLY"
        );
        assert_eq!(
            limited("SELECT a FROM t OFFSET 2 ROWS", &ORACLE, 4),
            "SELECT a FROM t OFFSET 2 ROWS FETCH NEXT 4 ROWS ONLY"
        );
    }

    #[test]
    fn not_limitable() {
        for sql in ["INSERT INTO t VALUES (1)", "SELECT 1; SELECT 2", "", "DROP TABLE t"] {
            let stmts = parse_in(sql, &ANSI);
            let err = add_limit(sql, &stmts, &ANSI, 1).unwrap_err();
            assert!(
                matches!(err, SqlError::NotLimitable { .. }),
                "expected NotLimitable for `{sql}`, got {err:?}"
            );
        }
    }

    #[test]
    fn apply_edits_in_order() {
        let sql = "abcdef";
        let edits = vec![
            Edit::replace(Span::new(4, 5), "E"),
            Edit::insert(0, ">"),
            Edit::replace(Span::new(1, 3), "BC"),
        ];
        assert_eq!(apply_edits(sql, edits), ">aBCdEf");
    }
}
