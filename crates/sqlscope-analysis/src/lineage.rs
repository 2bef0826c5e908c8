// Column Lineage
//
// Traces every output column of a query back to the schema columns it is
// computed from. Derived tables, CTEs, set-operation branches, and scalar
// subqueries are analyzed recursively on top of the scope tree; each query
// scope's outputs are computed once and cached by scope id.
//
// Resolution failures are collected, never propagated: a column that cannot
// be resolved carries its error and contributes no sources, and its siblings
// are analyzed as usual.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlscope_ast::{
    ColumnRef, Expr, FromClause, Ident, InsertSource, JoinConstraint, ResultColumn, Select,
    Statement, TableOrSubquery,
};
use sqlscope_error::ResolutionError;
use sqlscope_parser::Dialect;

use crate::schema::Schema;
use crate::scope::{
    Binding, BindingSource, ResolvedStatement, Resolver, ScopeId, ScopeKind, ScopeTree,
};
use crate::visit::{walk_expr, Visit};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A column of a base table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceColumn {
    pub table: String,
    pub column: String,
}

impl SourceColumn {
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for SourceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Lineage of one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub name: String,
    /// Zero-based position in the query's output.
    pub position: usize,
    pub sources: BTreeSet<SourceColumn>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`column_lineage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageReport {
    pub columns: Vec<LineageEntry>,
    /// Columns used by WHERE, JOIN, GROUP BY, HAVING, QUALIFY, or ORDER BY
    /// that no output column is derived from.
    pub non_selected_columns: BTreeSet<SourceColumn>,
    /// Every resolution failure met during the analysis.
    pub errors: Vec<String>,
}

impl LineageReport {
    /// A report with no columns and a single error.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    /// The entry for the output column called `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&LineageEntry> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Column lineage of the first statement in `statements`.
///
/// `INSERT ... SELECT` and `CREATE ... AS SELECT` are analyzed through their
/// query. Other statement kinds yield a report holding only an error.
#[must_use]
pub fn column_lineage(statements: &[Statement], dialect: &Dialect, schema: &Schema) -> LineageReport {
    let span = tracing::debug_span!(
        target: "sqlscope.analysis",
        "column_lineage",
        columns = tracing::field::Empty,
        errors = tracing::field::Empty,
    );
    let _guard = span.enter();

    let Some(stmt) = statements.first() else {
        return LineageReport::default();
    };
    let resolved = match Resolver::new(dialect).resolve_statement(stmt) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::debug!(target: "sqlscope.analysis", %err, "scope resolution failed");
            return LineageReport::failed(err.to_string());
        }
    };
    let Some(top) = query_scope(&resolved) else {
        return LineageReport::failed(format!(
            "column lineage needs a query, found {}",
            stmt.kind_name()
        ));
    };

    let report = Lineage::new(&resolved, dialect, schema).run(top);
    span.record("columns", report.columns.len());
    span.record("errors", report.errors.len());
    report
}

fn query_scope(resolved: &ResolvedStatement<'_>) -> Option<ScopeId> {
    match resolved.statement {
        Statement::Select(_) => Some(resolved.root),
        Statement::Insert(insert) => match &insert.source {
            InsertSource::Query(query) => resolved.tree.child_query(resolved.root, query),
            InsertSource::DefaultValues => None,
        },
        Statement::CreateTable(create) => create
            .query
            .as_ref()
            .and_then(|query| resolved.tree.child_query(resolved.root, query)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct OutputColumn {
    name: String,
    sources: BTreeSet<SourceColumn>,
    data_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ResolvedColumn {
    sources: BTreeSet<SourceColumn>,
    data_type: Option<String>,
}

impl From<OutputColumn> for ResolvedColumn {
    fn from(column: OutputColumn) -> Self {
        Self {
            sources: column.sources,
            data_type: column.data_type,
        }
    }
}

struct Lineage<'r, 'a> {
    resolved: &'r ResolvedStatement<'a>,
    dialect: &'r Dialect,
    schema: &'r Schema,
    outputs: HashMap<ScopeId, Vec<OutputColumn>>,
    in_progress: HashSet<ScopeId>,
    errors: Vec<String>,
}

impl<'r, 'a> Lineage<'r, 'a> {
    fn new(resolved: &'r ResolvedStatement<'a>, dialect: &'r Dialect, schema: &'r Schema) -> Self {
        Self {
            resolved,
            dialect,
            schema,
            outputs: HashMap::new(),
            in_progress: HashSet::new(),
            errors: Vec::new(),
        }
    }

    fn tree(&self) -> &'r ScopeTree<'a> {
        &self.resolved.tree
    }

    fn run(mut self, top: ScopeId) -> LineageReport {
        let outputs = self.query_outputs(top);
        let projected: BTreeSet<&SourceColumn> =
            outputs.iter().flat_map(|c| c.sources.iter()).collect();
        let non_selected_columns = self
            .clause_references()
            .into_iter()
            .filter(|source| !projected.contains(source))
            .collect();
        let columns = outputs
            .iter()
            .enumerate()
            .map(|(position, column)| LineageEntry {
                name: column.name.clone(),
                position,
                sources: column.sources.clone(),
                data_type: column.data_type.clone(),
                error: column.error.clone(),
            })
            .collect();
        LineageReport {
            columns,
            non_selected_columns,
            errors: self.errors,
        }
    }

    // ── Query outputs ───────────────────────────────────────────────────

    /// Output columns of a query, SELECT, or VALUES scope.
    fn query_outputs(&mut self, id: ScopeId) -> Vec<OutputColumn> {
        if let Some(cached) = self.outputs.get(&id) {
            return cached.clone();
        }
        // A recursive CTE that is still being analyzed contributes nothing.
        if !self.in_progress.insert(id) {
            return Vec::new();
        }

        let scope = self.tree().get(id);
        let columns = match scope.kind {
            ScopeKind::Query(_) => {
                let mut columns: Vec<OutputColumn> = Vec::new();
                for (i, branch) in scope.branches.iter().enumerate() {
                    let branch_columns = self.query_outputs(*branch);
                    if i == 0 {
                        columns = branch_columns;
                        // Recursive references see the anchor branch.
                        self.outputs.insert(id, columns.clone());
                    } else {
                        for (column, other) in columns.iter_mut().zip(branch_columns) {
                            column.sources.extend(other.sources);
                        }
                    }
                }
                columns
            }
            ScopeKind::Select(select) => self.select_outputs(id, select),
            ScopeKind::Values(rows) => rows.first().map_or_else(Vec::new, |row| {
                (0..row.len())
                    .map(|i| OutputColumn {
                        name: format!("_col_{i}"),
                        ..OutputColumn::default()
                    })
                    .collect()
            }),
            ScopeKind::Statement(_) => Vec::new(),
        };

        self.in_progress.remove(&id);
        self.outputs.insert(id, columns.clone());
        columns
    }

    fn select_outputs(&mut self, id: ScopeId, select: &'a Select) -> Vec<OutputColumn> {
        let mut out = Vec::new();
        for column in &select.columns {
            match column {
                ResultColumn::Star { except, .. } => {
                    let base = out.len();
                    for index in 0..self.tree().get(id).bindings.len() {
                        self.expand_binding(id, index, except, base, &mut out);
                    }
                }
                ResultColumn::TableStar {
                    qualifier, except, ..
                } => match self.tree().lookup_binding(id, qualifier, self.dialect) {
                    Some((scope, index)) => {
                        let base = out.len();
                        self.expand_binding(scope, index, except, base, &mut out);
                    }
                    None => self.errors.push(
                        ResolutionError::unknown_table(qualifier.qualified())
                            .at(qualifier.span.start_usize())
                            .to_string(),
                    ),
                },
                ResultColumn::Expr { expr, alias } => {
                    let position = out.len();
                    let name = alias
                        .as_ref()
                        .map(|a| a.value.clone())
                        .or_else(|| expr.as_column().map(|c| c.column.value.clone()))
                        .unwrap_or_else(|| format!("_col_{position}"));
                    let mut errors = Vec::new();
                    let resolved = self.expr_lineage(expr, id, &mut errors);
                    let error = errors.first().map(ToString::to_string);
                    self.errors.extend(errors.iter().map(ToString::to_string));
                    out.push(OutputColumn {
                        name,
                        sources: resolved.sources,
                        data_type: resolved.data_type,
                        error,
                    });
                }
            }
        }
        out
    }

    /// Append the columns of one binding for `*` or `t.*`.
    ///
    /// Columns joined with USING (or by a NATURAL join) are emitted once,
    /// carrying the sources of both sides.
    fn expand_binding(
        &mut self,
        scope: ScopeId,
        index: usize,
        except: &[Ident],
        base: usize,
        out: &mut Vec<OutputColumn>,
    ) {
        let binding = &self.tree().get(scope).bindings[index];
        let Some(columns) = self.binding_columns(scope, index) else {
            self.errors.push(format!(
                "cannot expand * over {}: columns unknown",
                binding_label(binding)
            ));
            return;
        };
        for column in columns {
            if except.iter().any(|e| self.dialect.ident_eq(&e.value, &column.name)) {
                continue;
            }
            let shared = binding.natural
                || binding
                    .using
                    .iter()
                    .any(|u| self.dialect.ident_eq(&u.value, &column.name));
            if shared {
                let dialect = self.dialect;
                if let Some(existing) = out[base..]
                    .iter_mut()
                    .find(|c| dialect.ident_eq(&c.name, &column.name))
                {
                    existing.sources.extend(column.sources);
                    continue;
                }
            }
            out.push(column);
        }
    }

    /// Columns a binding exposes, or `None` when they are unknown.
    fn binding_columns(&mut self, scope: ScopeId, index: usize) -> Option<Vec<OutputColumn>> {
        let binding = &self.tree().get(scope).bindings[index];
        let columns = match binding.source {
            BindingSource::Table(name) => {
                let (table, columns) = self.schema.lookup(name, self.dialect)?;
                columns
                    .iter()
                    .map(|c| OutputColumn {
                        name: c.name.clone(),
                        sources: BTreeSet::from([SourceColumn::new(table, &c.name)]),
                        data_type: c.data_type.clone(),
                        error: None,
                    })
                    .collect()
            }
            BindingSource::Derived { scope: body, .. } => self.query_outputs(body),
            BindingSource::Cte { cte, scope: body } => {
                rename_columns(self.query_outputs(body), &cte.columns)
            }
            BindingSource::Function { .. } => return None,
        };
        let alias_columns = binding.alias.map_or(&[][..], |a| a.columns.as_slice());
        Some(rename_columns(columns, alias_columns))
    }

    // ── Column resolution ───────────────────────────────────────────────

    /// Sources of a projected expression; a bare column also keeps its type.
    fn expr_lineage(
        &mut self,
        expr: &'a Expr,
        scope: ScopeId,
        errors: &mut Vec<ResolutionError>,
    ) -> ResolvedColumn {
        match expr {
            Expr::Column(column, _) => match self.resolve_column(column, scope) {
                Ok(resolved) => resolved,
                Err(err) => {
                    errors.push(err);
                    ResolvedColumn::default()
                }
            },
            Expr::Cast { type_name, .. } => ResolvedColumn {
                sources: self.expr_sources(expr, scope, errors),
                data_type: Some(type_name.name.clone()),
            },
            _ => ResolvedColumn {
                sources: self.expr_sources(expr, scope, errors),
                data_type: None,
            },
        }
    }

    /// Union of the sources of every column and nested query in `expr`.
    fn expr_sources(
        &mut self,
        expr: &'a Expr,
        scope: ScopeId,
        errors: &mut Vec<ResolutionError>,
    ) -> BTreeSet<SourceColumn> {
        let mut columns = Vec::new();
        let mut queries = Vec::new();
        walk_expr(expr, &mut |visit: Visit<'a>| match visit {
            Visit::Column(column, _) => columns.push(column),
            Visit::Query(query) => queries.push(query),
            Visit::Wildcard(..) => {}
        });

        let mut sources = BTreeSet::new();
        for column in columns {
            match self.resolve_column(column, scope) {
                Ok(resolved) => sources.extend(resolved.sources),
                Err(err) => errors.push(err),
            }
        }
        for query in queries {
            if let Some(child) = self.tree().child_query(scope, query) {
                for column in self.query_outputs(child) {
                    sources.extend(column.sources);
                }
            }
        }
        sources
    }

    fn resolve_column(
        &mut self,
        column: &ColumnRef,
        scope: ScopeId,
    ) -> Result<ResolvedColumn, ResolutionError> {
        let Some(qualifier) = &column.qualifier else {
            return self.resolve_unqualified(&column.column, scope);
        };
        if let Some((found, index)) = self.tree().lookup_binding(scope, qualifier, self.dialect) {
            return self.column_of_binding(found, index, &column.column).ok_or_else(|| {
                ResolutionError::unknown_column(column.to_string())
                    .at(column.column.span.start_usize())
            });
        }
        // `s.field` where `s` is a struct column of a table in scope.
        let unknown_table = || {
            ResolutionError::unknown_table(qualifier.qualified()).at(qualifier.span.start_usize())
        };
        let head = qualifier.parts.first().ok_or_else(unknown_table)?;
        self.resolve_unqualified(head, scope)
            .map_err(|_| unknown_table())
    }

    fn column_of_binding(
        &mut self,
        scope: ScopeId,
        index: usize,
        ident: &Ident,
    ) -> Option<ResolvedColumn> {
        let binding = &self.tree().get(scope).bindings[index];
        match self.binding_columns(scope, index) {
            Some(columns) => columns
                .into_iter()
                .find(|c| self.dialect.ident_eq(&c.name, &ident.value))
                .map(ResolvedColumn::from),
            None => Some(unknown_schema_column(binding, ident)),
        }
    }

    /// Resolve an unqualified column, innermost scope first.
    ///
    /// Within one scope the column must be declared by exactly one binding,
    /// unless the bindings declaring it were joined on it with USING or
    /// NATURAL. When no binding declares it, a single binding with unknown
    /// columns is assumed to provide it.
    fn resolve_unqualified(
        &mut self,
        ident: &Ident,
        scope: ScopeId,
    ) -> Result<ResolvedColumn, ResolutionError> {
        let tree = self.tree();
        let ambiguous =
            || ResolutionError::ambiguous_column(ident.value.as_str()).at(ident.span.start_usize());

        for id in tree.binding_scopes(scope) {
            let bindings = &tree.get(id).bindings;
            if bindings.is_empty() {
                continue;
            }
            let mut found: Vec<ResolvedColumn> = Vec::new();
            let mut unknown = Vec::new();
            let mut joined_on = false;
            for (index, binding) in bindings.iter().enumerate() {
                match self.binding_columns(id, index) {
                    Some(columns) => {
                        if let Some(column) = columns
                            .into_iter()
                            .find(|c| self.dialect.ident_eq(&c.name, &ident.value))
                        {
                            joined_on |= binding.natural
                                || binding
                                    .using
                                    .iter()
                                    .any(|u| self.dialect.ident_eq(&u.value, &ident.value));
                            found.push(column.into());
                        }
                    }
                    None => unknown.push(binding),
                }
            }

            match found.len() {
                0 => {}
                1 => return Ok(found.pop().unwrap_or_default()),
                _ if joined_on => {
                    let mut merged = ResolvedColumn::default();
                    for column in found {
                        merged.sources.extend(column.sources);
                    }
                    return Ok(merged);
                }
                _ => return Err(ambiguous()),
            }
            match unknown.as_slice() {
                [] => {}
                [binding] => return Ok(unknown_schema_column(binding, ident)),
                _ => return Err(ambiguous()),
            }
        }
        Err(ResolutionError::unknown_column(ident.value.as_str()).at(ident.span.start_usize()))
    }

    // ── Clause references ───────────────────────────────────────────────

    /// Sources of every column used outside the projections.
    fn clause_references(&mut self) -> BTreeSet<SourceColumn> {
        let tree = self.tree();
        let mut refs = BTreeSet::new();
        for id in tree.ids() {
            match tree.get(id).kind {
                ScopeKind::Select(select) => {
                    let aliases = projection_aliases(select, self.dialect);
                    if let Some(from) = &select.from {
                        self.join_references(from, id, &mut refs);
                    }
                    if let Some(expr) = &select.where_clause {
                        self.clause_refs(expr, id, &[], &mut refs);
                    }
                    for expr in select
                        .group_by
                        .iter()
                        .chain(&select.having)
                        .chain(&select.qualify)
                    {
                        self.clause_refs(expr, id, &aliases, &mut refs);
                    }
                }
                ScopeKind::Query(query) => {
                    let Some(first) = tree.get(id).branches.first().copied() else {
                        continue;
                    };
                    let aliases = match tree.get(first).kind {
                        ScopeKind::Select(select) => projection_aliases(select, self.dialect),
                        _ => Vec::new(),
                    };
                    for term in &query.order_by {
                        self.clause_refs(&term.expr, first, &aliases, &mut refs);
                    }
                }
                ScopeKind::Values(_) | ScopeKind::Statement(_) => {}
            }
        }
        refs
    }

    fn join_references(
        &mut self,
        from: &'a FromClause,
        scope: ScopeId,
        refs: &mut BTreeSet<SourceColumn>,
    ) {
        if let TableOrSubquery::ParenJoin(inner, _) = &from.source {
            self.join_references(inner, scope, refs);
        }
        for join in &from.joins {
            if let TableOrSubquery::ParenJoin(inner, _) = &join.table {
                self.join_references(inner, scope, refs);
            }
            match &join.constraint {
                Some(JoinConstraint::On(expr)) => self.clause_refs(expr, scope, &[], refs),
                Some(JoinConstraint::Using(columns)) => {
                    for column in columns {
                        for index in 0..self.tree().get(scope).bindings.len() {
                            let declared = self.binding_columns(scope, index).and_then(|cols| {
                                cols.into_iter()
                                    .find(|c| self.dialect.ident_eq(&c.name, &column.value))
                            });
                            if let Some(declared) = declared {
                                refs.extend(declared.sources);
                            }
                        }
                    }
                }
                None => {}
            }
        }
    }

    /// Add the sources of the columns and nested queries of a clause.
    ///
    /// An unqualified name that fails to resolve but matches a projection
    /// alias is an alias reference and is skipped.
    fn clause_refs(
        &mut self,
        expr: &'a Expr,
        scope: ScopeId,
        aliases: &[String],
        refs: &mut BTreeSet<SourceColumn>,
    ) {
        let mut columns = Vec::new();
        let mut queries = Vec::new();
        walk_expr(expr, &mut |visit: Visit<'a>| match visit {
            Visit::Column(column, _) => columns.push(column),
            Visit::Query(query) => queries.push(query),
            Visit::Wildcard(..) => {}
        });

        for column in columns {
            match self.resolve_column(column, scope) {
                Ok(resolved) => refs.extend(resolved.sources),
                Err(_)
                    if column.qualifier.is_none()
                        && aliases.contains(&self.dialect.fold_ident(&column.column)) => {}
                Err(err) => self.errors.push(err.to_string()),
            }
        }
        for query in queries {
            if let Some(child) = self.tree().child_query(scope, query) {
                for column in self.query_outputs(child) {
                    refs.extend(column.sources);
                }
            }
        }
    }
}

fn rename_columns(mut columns: Vec<OutputColumn>, names: &[Ident]) -> Vec<OutputColumn> {
    for (column, name) in columns.iter_mut().zip(names) {
        column.name.clone_from(&name.value);
    }
    columns
}

/// A column of a binding whose columns are unknown: attributed to the table
/// as written, or to nothing for a table function.
fn unknown_schema_column(binding: &Binding<'_>, ident: &Ident) -> ResolvedColumn {
    let sources = match binding.source {
        BindingSource::Table(name) => BTreeSet::from([SourceColumn::new(name.qualified(), &ident.value)]),
        _ => BTreeSet::new(),
    };
    ResolvedColumn {
        sources,
        data_type: None,
    }
}

fn binding_label(binding: &Binding<'_>) -> String {
    match binding.source {
        BindingSource::Table(name) | BindingSource::Function { name, .. } => name.qualified(),
        BindingSource::Derived { .. } | BindingSource::Cte { .. } => {
            binding.name.clone().unwrap_or_else(|| "subquery".to_owned())
        }
    }
}

fn projection_aliases(select: &Select, dialect: &Dialect) -> Vec<String> {
    select
        .columns
        .iter()
        .filter_map(|column| match column {
            ResultColumn::Expr {
                alias: Some(alias), ..
            } => Some(dialect.fold_ident(alias)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaColumn;
    use sqlscope_parser::dialect::{ANSI, BIGQUERY};
    use sqlscope_parser::parse_sql;

    fn lineage(sql: &str, dialect: &Dialect, schema: &Schema) -> LineageReport {
        let stmts = parse_sql(sql, dialect).unwrap();
        column_lineage(&stmts, dialect, schema)
    }

    fn shop() -> Schema {
        Schema::new()
            .with_table("orders", ["id", "customer_id"])
            .with_table("customers", ["id", "name"])
    }

    fn src(table: &str, column: &str) -> SourceColumn {
        SourceColumn::new(table, column)
    }

    fn set(items: &[(&str, &str)]) -> BTreeSet<SourceColumn> {
        items.iter().map(|(t, c)| src(t, c)).collect()
    }

    fn sources_of(report: &LineageReport, name: &str) -> BTreeSet<SourceColumn> {
        match report.column(name) {
            Some(entry) => entry.sources.clone(),
            None => unreachable!("no output column `{name}` in {report:?}"),
        }
    }

    #[test]
    fn join_projection_and_condition() {
        let report = lineage(
            "SELECT c.name FROM orders o JOIN customers c ON o.customer_id = c.id",
            &ANSI,
            &shop(),
        );
        assert_eq!(report.columns.len(), 1);
        assert_eq!(sources_of(&report, "name"), set(&[("customers", "name")]));
        assert_eq!(
            report.non_selected_columns,
            set(&[("orders", "customer_id"), ("customers", "id")])
        );
        assert!(report.errors.is_empty());
    }

    #[test]
    fn case_expression_and_filters() {
        let schema = Schema::new()
            .with_table(
                "items",
                [
                    SchemaColumn::typed("item_id", "STRING"),
                    SchemaColumn::typed("price", "INT64"),
                    SchemaColumn::typed("in_stock", "BOOL"),
                ],
            )
            .with_table("orders", ["item_id", "somecol"]);
        let report = lineage(
            "SELECT items.item_id AS item_id,
                    CASE WHEN price > 1000 AND t2.somecol < 250 THEN 'high'
                         WHEN price > 100 THEN 'medium'
                         ELSE 'low' END AS price_category
             FROM items
             JOIN orders AS t2 ON items.item_id = t2.item_id
             WHERE in_stock = true",
            &BIGQUERY,
            &schema,
        );
        let item_id = &report.columns[0];
        assert_eq!(item_id.name, "item_id");
        assert_eq!(item_id.data_type.as_deref(), Some("STRING"));
        assert_eq!(item_id.sources, set(&[("items", "item_id")]));
        assert_eq!(
            sources_of(&report, "price_category"),
            set(&[("items", "price"), ("orders", "somecol")])
        );
        assert_eq!(
            report.non_selected_columns,
            set(&[("items", "in_stock"), ("orders", "item_id")])
        );
    }

    #[test]
    fn star_expansion_in_from_order() {
        let report = lineage("SELECT * FROM customers, orders", &ANSI, &shop());
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "id", "customer_id"]);
        assert_eq!(report.columns[2].sources, set(&[("orders", "id")]));
        assert_eq!(report.columns[3].position, 3);
    }

    #[test]
    fn star_with_using_coalesces_join_column() {
        let schema = Schema::new()
            .with_table("a", ["id", "x"])
            .with_table("b", ["id", "y"]);
        let report = lineage("SELECT * FROM a JOIN b USING (id)", &ANSI, &schema);
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "x", "y"]);
        assert_eq!(report.columns[0].sources, set(&[("a", "id"), ("b", "id")]));
        assert!(report.non_selected_columns.is_empty());
    }

    #[test]
    fn table_star_and_except() {
        let report = lineage(
            "SELECT c.* EXCEPT (name), o.id FROM customers c JOIN orders o ON o.customer_id = c.id",
            &BIGQUERY,
            &shop(),
        );
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "id"]);
        assert_eq!(report.non_selected_columns, set(&[("orders", "customer_id")]));
    }

    #[test]
    fn derived_table_and_cte_columns() {
        let report = lineage(
            "WITH c(k) AS (SELECT id FROM customers)
             SELECT d.total, c.k
             FROM (SELECT sum(id) AS total, customer_id FROM orders WHERE id > 0 GROUP BY customer_id) d
             JOIN c ON c.k = d.customer_id",
            &ANSI,
            &shop(),
        );
        assert_eq!(sources_of(&report, "total"), set(&[("orders", "id")]));
        assert_eq!(sources_of(&report, "k"), set(&[("customers", "id")]));
        assert_eq!(report.non_selected_columns, set(&[("orders", "customer_id")]));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
    }

    #[test]
    fn set_operation_unions_by_position() {
        let report = lineage(
            "SELECT id AS ref_id FROM orders UNION ALL SELECT id FROM customers",
            &ANSI,
            &shop(),
        );
        assert_eq!(report.columns.len(), 1);
        assert_eq!(
            sources_of(&report, "ref_id"),
            set(&[("orders", "id"), ("customers", "id")])
        );
    }

    #[test]
    fn per_entry_errors_do_not_abort() {
        let report = lineage(
            "SELECT id, nope, name FROM orders JOIN customers ON orders.customer_id = customers.id",
            &ANSI,
            &shop(),
        );
        assert_eq!(report.columns.len(), 3);
        assert!(report.columns[0].error.as_deref().is_some_and(|e| e.starts_with("AmbiguousColumn")));
        assert!(report.columns[1].error.as_deref().is_some_and(|e| e.starts_with("UnknownColumn")));
        assert_eq!(report.columns[2].error, None);
        assert_eq!(report.columns[2].sources, set(&[("customers", "name")]));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn unnamed_projections() {
        let report = lineage("SELECT 1, upper(name) FROM customers", &ANSI, &shop());
        assert_eq!(report.columns[0].name, "_col_0");
        assert!(report.columns[0].sources.is_empty());
        assert_eq!(report.columns[1].name, "_col_1");
        assert_eq!(report.columns[1].sources, set(&[("customers", "name")]));
    }

    #[test]
    fn scalar_subquery_sources_and_filters() {
        let report = lineage(
            "SELECT name, (SELECT max(o.id) FROM orders o WHERE o.customer_id = c.id) AS last_order
             FROM customers c",
            &ANSI,
            &shop(),
        );
        assert_eq!(sources_of(&report, "last_order"), set(&[("orders", "id")]));
        assert_eq!(
            report.non_selected_columns,
            set(&[("orders", "customer_id"), ("customers", "id")])
        );
    }

    #[test]
    fn alias_references_are_skipped() {
        let report = lineage(
            "SELECT name AS nm, count(*) AS n FROM customers GROUP BY nm ORDER BY n DESC, 1",
            &ANSI,
            &shop(),
        );
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(report.non_selected_columns.is_empty());
    }

    #[test]
    fn unknown_schema_falls_back_to_single_table() {
        let report = lineage("SELECT a, t.b FROM raw.t", &ANSI, &Schema::new());
        assert_eq!(sources_of(&report, "a"), set(&[("raw.t", "a")]));
        assert_eq!(sources_of(&report, "b"), set(&[("raw.t", "b")]));
    }

    #[test]
    fn types_from_schema_and_casts() {
        let schema = Schema::new().with_table("t", [SchemaColumn::typed("a", "INT")]);
        let report = lineage("SELECT a, CAST(a AS TEXT) AS s, a + 1 AS p FROM t", &ANSI, &schema);
        assert_eq!(report.columns[0].data_type.as_deref(), Some("INT"));
        assert_eq!(report.columns[1].data_type.as_deref(), Some("TEXT"));
        assert_eq!(report.columns[2].data_type, None);
    }

    #[test]
    fn insert_select_uses_its_query() {
        let report = lineage("INSERT INTO archive SELECT id FROM orders", &ANSI, &shop());
        assert_eq!(sources_of(&report, "id"), set(&[("orders", "id")]));
    }

    #[test]
    fn insert_target_is_not_visible_to_its_query() {
        let schema = shop().with_table("archive", ["nope", "id"]);
        for sql in [
            "INSERT INTO archive SELECT nope FROM orders",
            "INSERT INTO archive (nope) SELECT nope FROM orders",
        ] {
            let report = lineage(sql, &ANSI, &schema);
            assert_eq!(report.columns.len(), 1, "{sql}");
            assert!(report.columns[0].sources.is_empty(), "{sql}");
            assert!(
                report.columns[0].error.as_deref().is_some_and(|e| e.starts_with("UnknownColumn")),
                "{sql}: {:?}",
                report.columns[0].error
            );
        }

        let report = lineage("INSERT INTO archive SELECT nope FROM orders", &ANSI, &shop());
        assert!(report.columns[0].sources.is_empty());
    }

    #[test]
    fn insert_query_still_sees_statement_ctes() {
        let report = lineage(
            "WITH recent AS (SELECT id FROM orders) INSERT INTO archive SELECT id FROM recent",
            &ANSI,
            &shop(),
        );
        assert_eq!(sources_of(&report, "id"), set(&[("orders", "id")]));
    }

    #[test]
    fn non_query_statement_is_reported() {
        let report = lineage("DROP TABLE orders", &ANSI, &shop());
        assert!(report.columns.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn recursive_cte_terminates() {
        let report = lineage(
            "WITH RECURSIVE r AS (SELECT id FROM orders UNION ALL SELECT id FROM r) SELECT id FROM r",
            &ANSI,
            &shop(),
        );
        assert_eq!(sources_of(&report, "id"), set(&[("orders", "id")]));
    }

    #[test]
    fn struct_field_access_through_column() {
        let schema = Schema::new().with_table("events", ["payload", "ts"]);
        let report = lineage("SELECT payload.user_id FROM events", &BIGQUERY, &schema);
        assert_eq!(sources_of(&report, "user_id"), set(&[("events", "payload")]));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn report_json_shape() {
        let report = lineage("SELECT name FROM customers", &ANSI, &shop());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "columns": [{
                    "name": "name",
                    "position": 0,
                    "sources": [{"table": "customers", "column": "name"}]
                }],
                "non_selected_columns": [],
                "errors": []
            })
        );
    }
}
