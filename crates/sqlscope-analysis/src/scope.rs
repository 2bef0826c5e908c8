// Scope Resolver
//
// Builds the scope tree of one statement. Scopes live in an arena and point
// at their parent by index; a scope never owns another. Each FROM entry
// becomes a binding of the SELECT scope it appears in, CTEs are registered on
// the scope that carries the WITH clause, and every nested query gets its own
// scope whose parent is the scope it appears in.
//
// The resolver also records the raw material the analyses work from: every
// base-table site (FROM tables and DML/DDL targets) and every column
// qualifier that resolved to a binding.

use sqlscope_ast::{
    Cte, Distinctness, Expr, FromClause, FunctionArg, Ident, InsertSource, JoinConstraint,
    MergeAction, ObjectName, ResultColumn, Select, SelectCore, SelectStatement, Span, Statement,
    TableAlias, TableOrSubquery, WithClause,
};
use sqlscope_error::ResolutionError;
use sqlscope_parser::Dialect;

use crate::visit::{walk_expr, walk_window, Visit};

// ---------------------------------------------------------------------------
// Scope tree
// ---------------------------------------------------------------------------

/// Index of a scope in its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The syntactic construct a scope was built for.
#[derive(Debug, Clone, Copy)]
pub enum ScopeKind<'a> {
    /// A non-query statement (INSERT, UPDATE, DELETE, MERGE, DDL).
    Statement(&'a Statement),
    /// A full query: WITH, set-operation branches, ORDER BY, LIMIT.
    Query(&'a SelectStatement),
    /// One SELECT core with its FROM bindings.
    Select(&'a Select),
    /// A VALUES list.
    Values(&'a [Vec<Expr>]),
}

/// What a FROM binding stands for.
#[derive(Debug, Clone, Copy)]
pub enum BindingSource<'a> {
    /// A base table.
    Table(&'a ObjectName),
    /// A derived table; `scope` is the query scope of its body.
    Derived {
        query: &'a SelectStatement,
        scope: ScopeId,
    },
    /// A reference to a CTE; `scope` is the query scope of the CTE body.
    Cte { cte: &'a Cte, scope: ScopeId },
    /// A table-valued function such as `UNNEST(arr)`.
    Function {
        name: &'a ObjectName,
        args: &'a [FunctionArg],
    },
}

/// One entry of a FROM clause.
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    /// Folded name the binding is referenced by: the alias, or the table or
    /// CTE name. Unaliased derived tables and functions have none.
    pub name: Option<String>,
    pub alias: Option<&'a TableAlias>,
    pub source: BindingSource<'a>,
    pub span: Span,
    /// Columns of the `USING (...)` constraint that attached this binding.
    pub using: &'a [Ident],
    /// Whether this binding was attached by a NATURAL join.
    pub natural: bool,
}

impl Binding<'_> {
    /// Whether a column qualifier (already folded) names this binding.
    fn matches(&self, parts: &[String], dialect: &Dialect) -> bool {
        if let [single] = parts {
            return self.name.as_deref() == Some(single.as_str());
        }
        match self.source {
            BindingSource::Table(name) if self.alias.is_none() => {
                name.parts.len() >= parts.len()
                    && name.parts[name.parts.len() - parts.len()..]
                        .iter()
                        .zip(parts)
                        .all(|(part, want)| dialect.fold_ident(part) == *want)
            }
            _ => false,
        }
    }

    /// Key used to detect two bindings of one FROM clause clashing.
    fn clash_key(&self, dialect: &Dialect) -> Option<String> {
        match self.source {
            BindingSource::Table(name) if self.alias.is_none() => {
                Some(dialect.fold_name(name))
            }
            _ => self.name.clone(),
        }
    }
}

/// A CTE registered on the scope that carries its WITH clause.
#[derive(Debug, Clone)]
pub struct CteBinding<'a> {
    /// Folded CTE name.
    pub name: String,
    pub cte: &'a Cte,
    /// Query scope of the CTE body.
    pub scope: ScopeId,
}

/// A single scope.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind<'a>,
    /// FROM bindings, left to right.
    pub bindings: Vec<Binding<'a>>,
    /// CTEs visible from this scope and its descendants, in definition order.
    pub ctes: Vec<CteBinding<'a>>,
    /// CTE names of this scope's WITH clause that are not defined yet.
    pending_ctes: Vec<String>,
    /// Set-operation branches of a query scope, left to right.
    pub branches: Vec<ScopeId>,
    /// Scopes of queries nested in expressions (scalar, EXISTS, IN) and of
    /// statement bodies such as `INSERT ... SELECT`.
    pub subqueries: Vec<ScopeId>,
    /// The bindings of enclosing scopes are out of reach. Set on the query
    /// that supplies the rows of an INSERT, which cannot see its target.
    pub detached: bool,
}

/// Arena of scopes for one statement.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> ScopeTree<'a> {
    fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind<'a>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent,
            kind,
            bindings: Vec::new(),
            ctes: Vec::new(),
            pending_ctes: Vec::new(),
            branches: Vec::new(),
            subqueries: Vec::new(),
            detached: false,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id.0]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope<'a> {
        &mut self.scopes[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Every scope id, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (0..self.scopes.len()).map(ScopeId)
    }

    /// `id` followed by its parent chain up to the root.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |cur| self.get(*cur).parent)
    }

    /// Scopes whose FROM bindings are visible from `id`, innermost first.
    /// The walk stops after a detached scope; CTE lookups still see the
    /// full chain through [`Self::ancestors`].
    pub fn binding_scopes(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |cur| {
            let scope = self.get(*cur);
            if scope.detached { None } else { scope.parent }
        })
    }

    /// Find the binding a column qualifier names, searching `from` and then
    /// its enclosing scopes.
    #[must_use]
    pub fn lookup_binding(
        &self,
        from: ScopeId,
        qualifier: &ObjectName,
        dialect: &Dialect,
    ) -> Option<(ScopeId, usize)> {
        let parts: Vec<String> = qualifier
            .parts
            .iter()
            .map(|p| dialect.fold_ident(p))
            .collect();
        self.binding_scopes(from).find_map(|id| {
            self.get(id)
                .bindings
                .iter()
                .position(|b| b.matches(&parts, dialect))
                .map(|index| (id, index))
        })
    }

    /// The scope built for `query` when it appears nested under `scope`.
    #[must_use]
    pub fn child_query(&self, scope: ScopeId, query: &SelectStatement) -> Option<ScopeId> {
        self.get(scope).subqueries.iter().copied().find(|id| {
            matches!(self.get(*id).kind, ScopeKind::Query(q) if std::ptr::eq(q, query))
        })
    }

    /// Resolve an unqualified table name against the visible CTEs.
    ///
    /// A name that only matches a CTE defined later in an enclosing WITH
    /// clause is an error.
    fn lookup_cte(
        &self,
        from: ScopeId,
        name: &ObjectName,
        dialect: &Dialect,
    ) -> Result<Option<(&'a Cte, ScopeId)>, ResolutionError> {
        let [part] = name.parts.as_slice() else {
            return Ok(None);
        };
        let key = dialect.fold_ident(part);
        for id in self.ancestors(from) {
            let scope = self.get(id);
            if let Some(found) = scope.ctes.iter().rev().find(|c| c.name == key) {
                return Ok(Some((found.cte, found.scope)));
            }
            if scope.pending_ctes.contains(&key) {
                return Err(
                    ResolutionError::unknown_table(&part.value).at(name.span.start_usize())
                );
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Resolution output
// ---------------------------------------------------------------------------

/// How a base table is used by its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    /// Read from (FROM, JOIN, USING, `LIKE source`).
    Source,
    /// Written or defined (INSERT/UPDATE/DELETE/MERGE target, DDL object).
    Target,
}

/// A base-table reference in the source text.
#[derive(Debug, Clone)]
pub struct TableSite<'a> {
    pub name: &'a ObjectName,
    pub alias: Option<&'a Ident>,
    pub role: TableRole,
    pub scope: ScopeId,
    /// Index of the binding this site created in `scope`, if any.
    pub binding: Option<usize>,
}

/// A column qualifier that resolved to a binding.
#[derive(Debug, Clone, Copy)]
pub struct QualifierSite<'a> {
    pub qualifier: &'a ObjectName,
    pub scope: ScopeId,
    pub binding: usize,
}

/// The scope tree of one statement with its recorded sites.
#[derive(Debug, Clone)]
pub struct ResolvedStatement<'a> {
    pub statement: &'a Statement,
    pub tree: ScopeTree<'a>,
    pub root: ScopeId,
    pub tables: Vec<TableSite<'a>>,
    pub qualifiers: Vec<QualifierSite<'a>>,
}

impl<'a> ResolvedStatement<'a> {
    #[must_use]
    pub fn binding(&self, scope: ScopeId, index: usize) -> &Binding<'a> {
        &self.tree.get(scope).bindings[index]
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Builds a [`ResolvedStatement`] for one statement.
pub struct Resolver<'a> {
    dialect: &'a Dialect,
    tree: ScopeTree<'a>,
    tables: Vec<TableSite<'a>>,
    qualifiers: Vec<QualifierSite<'a>>,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(dialect: &'a Dialect) -> Self {
        Self {
            dialect,
            tree: ScopeTree::default(),
            tables: Vec::new(),
            qualifiers: Vec::new(),
        }
    }

    /// Resolve every scope of `stmt`.
    pub fn resolve_statement(
        mut self,
        stmt: &'a Statement,
    ) -> Result<ResolvedStatement<'a>, ResolutionError> {
        let span = tracing::debug_span!(
            target: "sqlscope.analysis",
            "resolve_scopes",
            kind = stmt.kind_name(),
            scopes = tracing::field::Empty,
            tables = tracing::field::Empty,
        );
        let _guard = span.enter();

        let root = self.resolve_stmt_inner(stmt)?;

        span.record("scopes", self.tree.len());
        span.record("tables", self.tables.len());

        Ok(ResolvedStatement {
            statement: stmt,
            tree: self.tree,
            root,
            tables: self.tables,
            qualifiers: self.qualifiers,
        })
    }

    fn resolve_stmt_inner(&mut self, stmt: &'a Statement) -> Result<ScopeId, ResolutionError> {
        if let Statement::Select(query) = stmt {
            return self.resolve_query(query, None);
        }
        let root = self.tree.push(None, ScopeKind::Statement(stmt));
        match stmt {
            Statement::Select(_) | Statement::Unsupported(_) => {}
            Statement::Insert(insert) => {
                self.resolve_with_opt(root, insert.with.as_ref())?;
                let binding = self.push_binding(
                    root,
                    Binding {
                        name: Some(self.binding_name(insert.alias.as_ref(), &insert.table)),
                        alias: None,
                        source: BindingSource::Table(&insert.table),
                        span: insert.table.span,
                        using: &[],
                        natural: false,
                    },
                )?;
                self.add_site(&insert.table, insert.alias.as_ref(), TableRole::Target, root, Some(binding));
                if let InsertSource::Query(query) = &insert.source {
                    let body = self.tree.push(Some(root), ScopeKind::Query(query));
                    self.tree.get_mut(body).detached = true;
                    self.fill_query(body, query)?;
                    self.tree.get_mut(root).subqueries.push(body);
                }
                if let Some(on_conflict) = &insert.on_conflict {
                    if let sqlscope_ast::ConflictAction::Update {
                        assignments,
                        where_clause,
                    } = &on_conflict.action
                    {
                        self.resolve_assignments(assignments, root)?;
                        self.resolve_expr_opt(where_clause.as_ref(), root)?;
                    }
                }
                self.resolve_result_columns(&insert.returning, root)?;
            }
            Statement::Update(update) => {
                self.resolve_with_opt(root, update.with.as_ref())?;
                self.resolve_from(&update.target, root, TableRole::Target)?;
                if let Some(from) = &update.from {
                    self.resolve_from(from, root, TableRole::Source)?;
                }
                self.resolve_assignments(&update.assignments, root)?;
                self.resolve_expr_opt(update.where_clause.as_ref(), root)?;
                self.resolve_result_columns(&update.returning, root)?;
            }
            Statement::Delete(delete) => {
                self.resolve_with_opt(root, delete.with.as_ref())?;
                if let Some(using) = &delete.using {
                    self.resolve_from(using, root, TableRole::Source)?;
                }
                // `DELETE t1 FROM t1 JOIN t2 ...` names a binding of the FROM list.
                let parts: Vec<String> = delete
                    .table
                    .parts
                    .iter()
                    .map(|p| self.dialect.fold_ident(p))
                    .collect();
                let names_binding = delete.alias.is_none()
                    && self
                        .tree
                        .get(root)
                        .bindings
                        .iter()
                        .any(|b| b.matches(&parts, self.dialect));
                if !names_binding {
                    let alias = delete.alias.as_ref().map(|a| &a.name);
                    let binding = self.push_binding(
                        root,
                        Binding {
                            name: Some(self.binding_name(alias, &delete.table)),
                            alias: delete.alias.as_ref(),
                            source: BindingSource::Table(&delete.table),
                            span: delete.table.span,
                            using: &[],
                            natural: false,
                        },
                    )?;
                    self.add_site(&delete.table, alias, TableRole::Target, root, Some(binding));
                }
                self.resolve_expr_opt(delete.where_clause.as_ref(), root)?;
                self.resolve_result_columns(&delete.returning, root)?;
            }
            Statement::Merge(merge) => {
                self.resolve_with_opt(root, merge.with.as_ref())?;
                let alias = merge.target_alias.as_ref().map(|a| &a.name);
                let binding = self.push_binding(
                    root,
                    Binding {
                        name: Some(self.binding_name(alias, &merge.target)),
                        alias: merge.target_alias.as_ref(),
                        source: BindingSource::Table(&merge.target),
                        span: merge.target.span,
                        using: &[],
                        natural: false,
                    },
                )?;
                self.add_site(&merge.target, alias, TableRole::Target, root, Some(binding));
                self.bind_source(&merge.source, root, TableRole::Source, &[], false)?;
                self.resolve_expr(&merge.on, root)?;
                for clause in &merge.clauses {
                    self.resolve_expr_opt(clause.condition.as_ref(), root)?;
                    match &clause.action {
                        MergeAction::Update(assignments) => {
                            self.resolve_assignments(assignments, root)?;
                        }
                        MergeAction::Insert {
                            values: Some(values),
                            ..
                        } => {
                            for value in values {
                                self.resolve_expr(value, root)?;
                            }
                        }
                        MergeAction::Insert { values: None, .. } | MergeAction::Delete => {}
                    }
                }
            }
            Statement::CreateTable(create) => {
                self.add_site(&create.name, None, TableRole::Target, root, None);
                if let Some(like) = &create.like {
                    self.add_site(like, None, TableRole::Source, root, None);
                }
                if let Some(query) = &create.query {
                    let body = self.resolve_query(query, Some(root))?;
                    self.tree.get_mut(root).subqueries.push(body);
                }
            }
            Statement::Other(other) => {
                for table in &other.tables {
                    self.add_site(table, None, TableRole::Target, root, None);
                }
            }
        }
        Ok(root)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    fn resolve_query(
        &mut self,
        query: &'a SelectStatement,
        parent: Option<ScopeId>,
    ) -> Result<ScopeId, ResolutionError> {
        let id = self.tree.push(parent, ScopeKind::Query(query));
        self.fill_query(id, query)?;
        Ok(id)
    }

    fn fill_query(&mut self, id: ScopeId, query: &'a SelectStatement) -> Result<(), ResolutionError> {
        self.resolve_with_opt(id, query.with.as_ref())?;

        for core in query.body.cores() {
            let branch = self.resolve_select_core(core, id)?;
            self.tree.get_mut(id).branches.push(branch);
        }

        // ORDER BY sees the FROM bindings of the first branch.
        let first = self.tree.get(id).branches.first().copied().unwrap_or(id);
        for term in &query.order_by {
            self.resolve_expr(&term.expr, first)?;
        }
        for name in query.locking.iter().flat_map(|lock| &lock.of) {
            self.bind_qualifier(name, first);
        }
        if let Some(limit) = &query.limit {
            self.resolve_expr_opt(limit.limit.as_ref(), id)?;
            self.resolve_expr_opt(limit.offset.as_ref(), id)?;
        }
        Ok(())
    }

    fn resolve_with_opt(
        &mut self,
        scope: ScopeId,
        with: Option<&'a WithClause>,
    ) -> Result<(), ResolutionError> {
        let Some(with) = with else {
            return Ok(());
        };
        let names: Vec<String> = with
            .ctes
            .iter()
            .map(|cte| self.dialect.fold_ident(&cte.name))
            .collect();

        for (i, cte) in with.ctes.iter().enumerate() {
            // A CTE body sees the CTEs before it; a non-recursive CTE that
            // names itself reads the table of that name.
            self.tree.get_mut(scope).pending_ctes = names[i + 1..].to_vec();
            let body = self.tree.push(Some(scope), ScopeKind::Query(&cte.query));
            let binding = CteBinding {
                name: names[i].clone(),
                cte,
                scope: body,
            };
            if with.recursive {
                self.tree.get_mut(scope).ctes.push(binding);
                self.fill_query(body, &cte.query)?;
            } else {
                self.fill_query(body, &cte.query)?;
                self.tree.get_mut(scope).ctes.push(binding);
            }
        }
        self.tree.get_mut(scope).pending_ctes.clear();
        Ok(())
    }

    fn resolve_select_core(
        &mut self,
        core: &'a SelectCore,
        parent: ScopeId,
    ) -> Result<ScopeId, ResolutionError> {
        match core {
            SelectCore::Select(select) => {
                let id = self.tree.push(Some(parent), ScopeKind::Select(select));
                if let Some(into) = &select.into {
                    self.add_site(&into.name, None, TableRole::Target, id, None);
                }
                if let Some(top) = &select.top {
                    self.resolve_expr(&top.count, id)?;
                }
                if let Some(from) = &select.from {
                    self.resolve_from(from, id, TableRole::Source)?;
                }
                if let Distinctness::DistinctOn(exprs) = &select.distinct {
                    for expr in exprs {
                        self.resolve_expr(expr, id)?;
                    }
                }
                self.resolve_result_columns(&select.columns, id)?;
                self.resolve_expr_opt(select.where_clause.as_ref(), id)?;
                for expr in &select.group_by {
                    self.resolve_expr(expr, id)?;
                }
                self.resolve_expr_opt(select.having.as_ref(), id)?;
                self.resolve_expr_opt(select.qualify.as_ref(), id)?;
                for window in &select.windows {
                    self.resolve_visits(id, |f| walk_window(&window.spec, f))?;
                }
                Ok(id)
            }
            SelectCore::Values(rows, _) => {
                let id = self.tree.push(Some(parent), ScopeKind::Values(rows));
                for expr in rows.iter().flatten() {
                    self.resolve_expr(expr, id)?;
                }
                Ok(id)
            }
            SelectCore::Nested(query, _) => self.resolve_query(query, Some(parent)),
        }
    }

    // ── FROM clauses ────────────────────────────────────────────────────

    fn resolve_from(
        &mut self,
        from: &'a FromClause,
        scope: ScopeId,
        role: TableRole,
    ) -> Result<(), ResolutionError> {
        self.bind_source(&from.source, scope, role, &[], false)?;
        for join in &from.joins {
            let using: &'a [Ident] = match &join.constraint {
                Some(JoinConstraint::Using(columns)) => columns,
                _ => &[],
            };
            self.bind_source(
                &join.table,
                scope,
                TableRole::Source,
                using,
                join.join_type.natural,
            )?;
            if let Some(JoinConstraint::On(expr)) = &join.constraint {
                self.resolve_expr(expr, scope)?;
            }
        }
        Ok(())
    }

    fn bind_source(
        &mut self,
        source: &'a TableOrSubquery,
        scope: ScopeId,
        role: TableRole,
        using: &'a [Ident],
        natural: bool,
    ) -> Result<(), ResolutionError> {
        match source {
            TableOrSubquery::Table { name, alias, span } => {
                let cte = self.tree.lookup_cte(scope, name, self.dialect)?;
                let binding_source = match cte {
                    Some((cte, body)) => BindingSource::Cte { cte, scope: body },
                    None => BindingSource::Table(name),
                };
                let alias_name = alias.as_ref().map(|a| &a.name);
                let index = self.push_binding(
                    scope,
                    Binding {
                        name: Some(self.binding_name(alias_name, name)),
                        alias: alias.as_ref(),
                        source: binding_source,
                        span: *span,
                        using,
                        natural,
                    },
                )?;
                if cte.is_none() {
                    self.add_site(name, alias_name, role, scope, Some(index));
                }
            }
            TableOrSubquery::Subquery {
                query, alias, span, ..
            } => {
                let body = self.resolve_query(query, Some(scope))?;
                let name = self.alias_name(alias.as_ref());
                self.push_binding(
                    scope,
                    Binding {
                        name,
                        alias: alias.as_ref(),
                        source: BindingSource::Derived { query, scope: body },
                        span: *span,
                        using,
                        natural,
                    },
                )?;
            }
            TableOrSubquery::TableFunction {
                name,
                args,
                alias,
                span,
                ..
            } => {
                for arg in args {
                    self.resolve_expr(&arg.value, scope)?;
                }
                let alias_name = self.alias_name(alias.as_ref());
                self.push_binding(
                    scope,
                    Binding {
                        name: alias_name,
                        alias: alias.as_ref(),
                        source: BindingSource::Function { name, args },
                        span: *span,
                        using,
                        natural,
                    },
                )?;
            }
            TableOrSubquery::ParenJoin(inner, _) => self.resolve_from(inner, scope, role)?,
        }
        Ok(())
    }

    fn alias_name(&self, alias: Option<&TableAlias>) -> Option<String> {
        alias.map(|a| self.dialect.fold_ident(&a.name))
    }

    fn binding_name(&self, alias: Option<&Ident>, table: &ObjectName) -> String {
        let ident = alias.or_else(|| table.name());
        ident.map_or_else(String::new, |i| self.dialect.fold_ident(i))
    }

    fn push_binding(
        &mut self,
        scope: ScopeId,
        binding: Binding<'a>,
    ) -> Result<usize, ResolutionError> {
        let key = binding.clash_key(self.dialect);
        let bindings = &self.tree.get(scope).bindings;
        if key.is_some() && bindings.iter().any(|b| b.clash_key(self.dialect) == key) {
            let spelled = match (binding.alias, binding.source) {
                (Some(alias), _) => alias.name.value.clone(),
                (None, BindingSource::Table(name)) => name.qualified(),
                (None, _) => binding.name.clone().unwrap_or_default(),
            };
            return Err(ResolutionError::duplicate_alias(spelled).at(binding.span.start_usize()));
        }
        let bindings = &mut self.tree.get_mut(scope).bindings;
        bindings.push(binding);
        Ok(bindings.len() - 1)
    }

    fn add_site(
        &mut self,
        name: &'a ObjectName,
        alias: Option<&'a Ident>,
        role: TableRole,
        scope: ScopeId,
        binding: Option<usize>,
    ) {
        self.tables.push(TableSite {
            name,
            alias,
            role,
            scope,
            binding,
        });
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr, scope: ScopeId) -> Result<(), ResolutionError> {
        self.resolve_visits(scope, |f| walk_expr(expr, f))
    }

    fn resolve_expr_opt(
        &mut self,
        expr: Option<&'a Expr>,
        scope: ScopeId,
    ) -> Result<(), ResolutionError> {
        expr.map_or(Ok(()), |e| self.resolve_expr(e, scope))
    }

    /// Run a walk, bind the qualifiers it reports, and resolve the nested
    /// queries it reports as children of `scope`.
    fn resolve_visits<W>(&mut self, scope: ScopeId, walk: W) -> Result<(), ResolutionError>
    where
        W: FnOnce(&mut dyn FnMut(Visit<'a>)),
    {
        let mut qualifiers = Vec::new();
        let mut nested = Vec::new();
        walk(&mut |visit: Visit<'a>| match visit {
            Visit::Column(col, _) => qualifiers.extend(col.qualifier.as_ref()),
            Visit::Wildcard(qualifier, _) => qualifiers.extend(qualifier),
            Visit::Query(query) => nested.push(query),
        });
        for qualifier in qualifiers {
            self.bind_qualifier(qualifier, scope);
        }
        for query in nested {
            let id = self.resolve_query(query, Some(scope))?;
            self.tree.get_mut(scope).subqueries.push(id);
        }
        Ok(())
    }

    fn bind_qualifier(&mut self, qualifier: &'a ObjectName, scope: ScopeId) {
        if let Some((found, binding)) = self.tree.lookup_binding(scope, qualifier, self.dialect) {
            self.qualifiers.push(QualifierSite {
                qualifier,
                scope: found,
                binding,
            });
        }
    }

    fn resolve_result_columns(
        &mut self,
        columns: &'a [ResultColumn],
        scope: ScopeId,
    ) -> Result<(), ResolutionError> {
        for column in columns {
            match column {
                ResultColumn::Star { .. } => {}
                ResultColumn::TableStar { qualifier, .. } => self.bind_qualifier(qualifier, scope),
                ResultColumn::Expr { expr, .. } => self.resolve_expr(expr, scope)?,
            }
        }
        Ok(())
    }

    fn resolve_assignments(
        &mut self,
        assignments: &'a [sqlscope_ast::Assignment],
        scope: ScopeId,
    ) -> Result<(), ResolutionError> {
        for assignment in assignments {
            for column in &assignment.columns {
                if let Some(qualifier) = &column.qualifier {
                    self.bind_qualifier(qualifier, scope);
                }
            }
            self.resolve_expr(&assignment.value, scope)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_error::ResolutionErrorKind;
    use sqlscope_parser::dialect::{ANSI, BIGQUERY, MYSQL, TSQL};
    use sqlscope_parser::parse_sql;

    fn parse_in(sql: &str, dialect: &Dialect) -> Vec<Statement> {
        parse_sql(sql, dialect).unwrap()
    }

    fn resolve<'a>(stmt: &'a Statement, dialect: &'a Dialect) -> ResolvedStatement<'a> {
        Resolver::new(dialect).resolve_statement(stmt).unwrap()
    }

    fn site_names(resolved: &ResolvedStatement<'_>) -> Vec<String> {
        resolved.tables.iter().map(|s| s.name.qualified()).collect()
    }

    fn binding_names(resolved: &ResolvedStatement<'_>, scope: ScopeId) -> Vec<Option<String>> {
        resolved
            .tree
            .get(scope)
            .bindings
            .iter()
            .map(|b| b.name.clone())
            .collect()
    }

    #[test]
    fn from_bindings_in_order() {
        let stmts = parse_in(
            "SELECT * FROM db.orders o JOIN Customers ON o.cid = customers.id, (SELECT 1) d",
            &ANSI,
        );
        let resolved = resolve(&stmts[0], &ANSI);
        let select = resolved.tree.get(resolved.root).branches[0];
        assert_eq!(
            binding_names(&resolved, select),
            vec![
                Some("o".to_owned()),
                Some("customers".to_owned()),
                Some("d".to_owned())
            ]
        );
        assert_eq!(site_names(&resolved), vec!["db.orders", "Customers"]);
        assert_eq!(resolved.qualifiers.len(), 2);
        assert!(resolved.qualifiers.iter().all(|q| q.scope == select));
    }

    #[test]
    fn derived_table_scope_nests_under_select() {
        let stmts = parse_in("SELECT * FROM (SELECT * FROM a) b", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        let select = resolved.tree.get(resolved.root).branches[0];
        let binding = resolved.binding(select, 0);
        match binding.source {
            BindingSource::Derived { scope, .. } => {
                assert_eq!(resolved.tree.get(scope).parent, Some(select));
            }
            other => unreachable!("expected derived binding, got {other:?}"),
        }
        assert_eq!(site_names(&resolved), vec!["a"]);
    }

    #[test]
    fn ctes_visible_in_definition_order() {
        let stmts = parse_in(
            "WITH a AS (SELECT * FROM raw), b AS (SELECT * FROM a) SELECT * FROM b",
            &ANSI,
        );
        let resolved = resolve(&stmts[0], &ANSI);
        assert_eq!(site_names(&resolved), vec!["raw"]);
        let root = resolved.tree.get(resolved.root);
        assert_eq!(root.ctes.len(), 2);
        let main = resolved.binding(root.branches[0], 0);
        assert!(matches!(main.source, BindingSource::Cte { .. }));
    }

    #[test]
    fn forward_cte_reference_is_unknown_table() {
        let stmts = parse_in(
            "WITH a AS (SELECT * FROM b), b AS (SELECT 1) SELECT * FROM a",
            &ANSI,
        );
        let err = Resolver::new(&ANSI)
            .resolve_statement(&stmts[0])
            .unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::UnknownTable);
        assert_eq!(err.name, "b");
        assert_eq!(err.offset, Some(25));
    }

    #[test]
    fn self_named_cte_reads_the_table() {
        let stmts = parse_in(
            "WITH orders AS (SELECT * FROM orders WHERE ok) SELECT * FROM orders",
            &ANSI,
        );
        let resolved = resolve(&stmts[0], &ANSI);
        assert_eq!(site_names(&resolved), vec!["orders"]);
    }

    #[test]
    fn recursive_cte_sees_itself() {
        let stmts = parse_in(
            "WITH RECURSIVE r AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM r) SELECT * FROM r",
            &ANSI,
        );
        let resolved = resolve(&stmts[0], &ANSI);
        assert!(resolved.tables.is_empty());
    }

    #[test]
    fn duplicate_alias_in_one_from_clause() {
        let stmts = parse_in("SELECT * FROM a x JOIN b x ON x.id = x.id", &ANSI);
        let err = Resolver::new(&ANSI)
            .resolve_statement(&stmts[0])
            .unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::DuplicateAlias);
        assert_eq!(err.name, "x");
        assert_eq!(err.offset, Some(23));
    }

    #[test]
    fn same_table_name_in_different_schemas_is_not_a_clash() {
        let stmts = parse_in("SELECT * FROM s1.t, s2.t", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        assert_eq!(site_names(&resolved), vec!["s1.t", "s2.t"]);

        let stmts = parse_in("SELECT * FROM t, T", &ANSI);
        assert!(Resolver::new(&ANSI).resolve_statement(&stmts[0]).is_err());
    }

    #[test]
    fn correlated_qualifier_resolves_to_outer_scope() {
        let stmts = parse_in(
            "SELECT * FROM a WHERE EXISTS (SELECT 1 FROM b WHERE b.id = a.id)",
            &ANSI,
        );
        let resolved = resolve(&stmts[0], &ANSI);
        let outer = resolved.tree.get(resolved.root).branches[0];
        let outer_hits = resolved.qualifiers.iter().filter(|q| q.scope == outer).count();
        assert_eq!(outer_hits, 1);
        assert_eq!(resolved.tree.get(outer).subqueries.len(), 1);
        assert_eq!(site_names(&resolved), vec!["a", "b"]);
    }

    #[test]
    fn unknown_qualifier_is_not_an_error() {
        let stmts = parse_in("SELECT s.field FROM t", &BIGQUERY);
        let resolved = resolve(&stmts[0], &BIGQUERY);
        assert!(resolved.qualifiers.is_empty());
    }

    #[test]
    fn multi_part_qualifier_matches_unaliased_table() {
        let stmts = parse_in("SELECT sales.orders.id FROM db.sales.orders", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        assert_eq!(resolved.qualifiers.len(), 1);
    }

    #[test]
    fn insert_query_does_not_see_the_target() {
        let stmts = parse_in("INSERT INTO archive SELECT archive.id FROM orders", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        let body = resolved.tree.get(resolved.root).subqueries[0];
        assert!(resolved.tree.get(body).detached);
        assert_eq!(resolved.tree.binding_scopes(body).last(), Some(body));
        assert!(resolved.qualifiers.is_empty());

        let quoted = parse_in(r#"SELECT "Orders".id FROM orders"#, &ANSI);
        assert!(resolve(&quoted[0], &ANSI).qualifiers.is_empty());
    }

    #[test]
    fn dml_targets_are_sites() {
        let stmts = parse_in(
            "INSERT INTO t1 SELECT * FROM t2; \
             UPDATE t3 SET a = b FROM t4 WHERE t3.id = t4.id; \
             DELETE FROM t5 WHERE id IN (SELECT id FROM t6); \
             MERGE INTO t7 USING t8 ON t7.id = t8.id WHEN MATCHED THEN DELETE; \
             CREATE TABLE t9 AS SELECT * FROM t10; \
             DROP TABLE t11",
            &ANSI,
        );
        let mut all = Vec::new();
        let mut targets = Vec::new();
        for stmt in &stmts {
            let resolved = resolve(stmt, &ANSI);
            for site in &resolved.tables {
                all.push(site.name.qualified());
                if site.role == TableRole::Target {
                    targets.push(site.name.qualified());
                }
            }
        }
        all.sort();
        assert_eq!(all.len(), 11);
        assert_eq!(targets, vec!["t1", "t3", "t5", "t7", "t9", "t11"]);
    }

    #[test]
    fn mysql_delete_head_names_a_from_binding() {
        let stmts = parse_in("DELETE t1 FROM t1 JOIN t2 ON t1.id = t2.id", &MYSQL);
        let resolved = resolve(&stmts[0], &MYSQL);
        assert_eq!(site_names(&resolved), vec!["t1", "t2"]);
    }

    #[test]
    fn tsql_delete_with_second_from() {
        let stmts = parse_in(
            "DELETE FROM a FROM a JOIN b ON a.id = b.id WHERE b.x = 1",
            &TSQL,
        );
        let resolved = resolve(&stmts[0], &TSQL);
        assert_eq!(site_names(&resolved), vec!["a", "b"]);
    }

    #[test]
    fn set_operation_branches_have_their_own_scopes() {
        let stmts = parse_in("SELECT a FROM x UNION SELECT b FROM y ORDER BY 1", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        let root = resolved.tree.get(resolved.root);
        assert_eq!(root.branches.len(), 2);
        for branch in &root.branches {
            assert_eq!(resolved.tree.get(*branch).parent, Some(resolved.root));
            assert_eq!(resolved.tree.get(*branch).bindings.len(), 1);
        }
    }

    #[test]
    fn child_query_finds_expression_subquery() {
        let stmts = parse_in("SELECT (SELECT max(v) FROM m) AS mx FROM t", &ANSI);
        let resolved = resolve(&stmts[0], &ANSI);
        let select_id = resolved.tree.get(resolved.root).branches[0];
        let ScopeKind::Select(select) = resolved.tree.get(select_id).kind else {
            unreachable!("expected a select scope");
        };
        let ResultColumn::Expr {
            expr: Expr::Subquery(query, _),
            ..
        } = &select.columns[0]
        else {
            unreachable!("expected a scalar subquery");
        };
        assert!(resolved.tree.child_query(select_id, query).is_some());
    }
}
