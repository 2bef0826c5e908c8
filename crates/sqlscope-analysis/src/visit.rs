// Expression walking
//
// A read-only pre-order walk over expression trees. Nested queries are not
// entered: they are reported to the caller, which decides which scope they
// belong to.

use sqlscope_ast::{
    ColumnRef, Expr, FrameBound, InSet, ObjectName, OrderingTerm, SelectStatement, Span,
    WindowSpec,
};

/// A node of interest reported by [`walk_expr`].
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    /// A column reference.
    Column(&'a ColumnRef, Span),
    /// `*` or `t.*` used as a function argument.
    Wildcard(Option<&'a ObjectName>, Span),
    /// A nested query (scalar subquery, `EXISTS`, `IN (SELECT ...)`).
    Query(&'a SelectStatement),
}

/// Walk `expr` in source order, reporting columns, wildcards, and nested
/// queries to `f`.
pub fn walk_expr<'a, F>(expr: &'a Expr, f: &mut F)
where
    F: FnMut(Visit<'a>) + ?Sized,
{
    match expr {
        Expr::Literal(..) | Expr::Placeholder(..) => {}
        Expr::Column(col, span) => f(Visit::Column(col, *span)),
        Expr::Wildcard { qualifier, span } => f(Visit::Wildcard(qualifier.as_ref(), *span)),
        Expr::BinaryOp { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::Extract { expr, .. }
        | Expr::Collate { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::IsBool { expr, .. } => walk_expr(expr, f),
        Expr::Interval { value, .. } => walk_expr(value, f),
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, f);
            walk_expr(low, f);
            walk_expr(high, f);
        }
        Expr::In { expr, set, .. } => {
            walk_expr(expr, f);
            match set {
                InSet::List(items) => walk_exprs(items, f),
                InSet::Subquery(query) => f(Visit::Query(query)),
                InSet::Unnest(array) => walk_expr(array, f),
            }
        }
        Expr::Like {
            expr,
            pattern,
            escape,
            ..
        } => {
            walk_expr(expr, f);
            walk_expr(pattern, f);
            if let Some(escape) = escape {
                walk_expr(escape, f);
            }
        }
        Expr::Case {
            operand,
            whens,
            else_expr,
            ..
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, f);
            }
            for (condition, result) in whens {
                walk_expr(condition, f);
                walk_expr(result, f);
            }
            if let Some(else_expr) = else_expr {
                walk_expr(else_expr, f);
            }
        }
        Expr::Exists { subquery, .. } => f(Visit::Query(subquery)),
        Expr::Subquery(query, _) => f(Visit::Query(query)),
        Expr::Quantified { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::FunctionCall(call) => {
            for arg in &call.args {
                walk_expr(&arg.value, f);
            }
            walk_ordering(&call.order_by, f);
            if let Some(filter) = &call.filter {
                walk_expr(filter, f);
            }
            if let Some(over) = &call.over {
                walk_window(over, f);
            }
        }
        Expr::Array(items, _) | Expr::RowValue(items, _) => walk_exprs(items, f),
        Expr::Subscript { expr, index, .. } => {
            walk_expr(expr, f);
            walk_expr(index, f);
        }
    }
}

pub fn walk_exprs<'a, F>(exprs: &'a [Expr], f: &mut F)
where
    F: FnMut(Visit<'a>) + ?Sized,
{
    for expr in exprs {
        walk_expr(expr, f);
    }
}

pub fn walk_ordering<'a, F>(terms: &'a [OrderingTerm], f: &mut F)
where
    F: FnMut(Visit<'a>) + ?Sized,
{
    for term in terms {
        walk_expr(&term.expr, f);
    }
}

pub fn walk_window<'a, F>(spec: &'a WindowSpec, f: &mut F)
where
    F: FnMut(Visit<'a>) + ?Sized,
{
    walk_exprs(&spec.partition_by, f);
    walk_ordering(&spec.order_by, f);
    if let Some(frame) = &spec.frame {
        for bound in std::iter::once(&frame.start).chain(frame.end.as_ref()) {
            if let FrameBound::Preceding(offset) | FrameBound::Following(offset) = bound {
                walk_expr(offset, f);
            }
        }
    }
}

/// Every column reference in `expr`, outside nested queries.
#[must_use]
pub fn columns_of(expr: &Expr) -> Vec<&ColumnRef> {
    let mut out = Vec::new();
    walk_expr(expr, &mut |visit| {
        if let Visit::Column(col, _) = visit {
            out.push(col);
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_parser::dialect::ANSI;
    use sqlscope_parser::parse_expr;

    fn parse(sql: &str) -> Expr {
        parse_expr(sql, &ANSI).unwrap()
    }

    fn column_names(expr: &Expr) -> Vec<String> {
        columns_of(expr).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn columns_in_source_order() {
        let expr = parse("CASE WHEN a.x > 1 THEN b ELSE upper(c) END || d");
        assert_eq!(column_names(&expr), vec!["a.x", "b", "c", "d"]);
    }

    #[test]
    fn window_and_filter_columns() {
        let expr = parse(
            "sum(v) FILTER (WHERE f > 0) OVER (PARTITION BY p ORDER BY o \
             ROWS BETWEEN n PRECEDING AND CURRENT ROW)",
        );
        assert_eq!(column_names(&expr), vec!["v", "f", "p", "o", "n"]);
    }

    #[test]
    fn nested_queries_are_reported_not_entered() {
        let expr = parse("a IN (SELECT b FROM t) AND EXISTS (SELECT 1 FROM u WHERE u.c = a)");
        let mut queries = 0;
        let mut columns = Vec::new();
        walk_expr(&expr, &mut |visit| match visit {
            Visit::Query(_) => queries += 1,
            Visit::Column(col, _) => columns.push(col.to_string()),
            Visit::Wildcard(..) => {}
        });
        assert_eq!(queries, 2);
        assert_eq!(columns, vec!["a"]);
    }

    #[test]
    fn wildcard_arguments() {
        let expr = parse("count(*) + count(t.*)");
        let mut seen = Vec::new();
        walk_expr(&expr, &mut |visit| {
            if let Visit::Wildcard(q, _) = visit {
                seen.push(q.map(ToString::to_string));
            }
        });
        assert_eq!(seen, vec![None, Some("t".to_owned())]);
    }
}
