// sqlscope
//
// Request-level entry points of the SQL analysis engine. Each operation
// takes SQL text and a dialect name, looks the dialect up in the registry,
// parses the text, and runs one analysis. Lexical, syntax, and dialect errors
// are fatal; lineage collects resolution errors instead of failing.

mod config;

use std::collections::HashMap;

pub use config::{AnalyzerConfig, QUERY_TOO_LONG};
pub use sqlscope_analysis::{
    LineageEntry, LineageReport, Schema, SchemaColumn, SourceColumn, TableOrder,
};
pub use sqlscope_error::{ErrorKind, ResolutionError, ResolutionErrorKind, Result, SqlError};
pub use sqlscope_parser::Dialect;

pub use sqlscope_analysis as analysis;
pub use sqlscope_ast as ast;
pub use sqlscope_parser as parser;

use sqlscope_ast::Statement;

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// The five analyses, run under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    #[must_use]
    pub const fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Unique qualified names of the base tables `sql` references.
    pub fn extract_tables(&self, sql: &str, dialect: &str) -> Result<Vec<String>> {
        let span = tracing::debug_span!(target: "sqlscope.api", "extract_tables", dialect);
        let _guard = span.enter();

        let (dialect, statements) = prepare(sql, dialect)?;
        let tables = sqlscope_analysis::extract_tables(&statements, dialect, self.config.table_order)
            .inspect_err(|err| tracing::debug!(target: "sqlscope.api", %err, "extraction failed"))?;
        Ok(tables)
    }

    /// `sql` with the tables named by `mapping` keys renamed to its values.
    ///
    /// Everything outside the renamed names is kept byte for byte.
    pub fn rename_tables<I, K, V>(&self, sql: &str, dialect: &str, mapping: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let span = tracing::debug_span!(target: "sqlscope.api", "rename_tables", dialect);
        let _guard = span.enter();

        let (dialect, statements) = prepare(sql, dialect)?;
        let renamed = sqlscope_analysis::rename_tables(sql, &statements, dialect, mapping)
            .inspect_err(|err| tracing::debug!(target: "sqlscope.api", %err, "rename failed"))?;
        Ok(renamed)
    }

    /// `sql` with a row cap of `limit` in the dialect's syntax.
    pub fn add_limit(&self, sql: &str, dialect: &str, limit: u64) -> Result<String> {
        let span = tracing::debug_span!(target: "sqlscope.api", "add_limit", dialect, limit);
        let _guard = span.enter();

        let (dialect, statements) = prepare(sql, dialect)?;
        sqlscope_analysis::add_limit(sql, &statements, dialect, limit)
            .inspect_err(|err| tracing::debug!(target: "sqlscope.api", %err, "add_limit failed"))
    }

    /// Whether `sql` is exactly one SELECT.
    pub fn is_single_select(&self, sql: &str, dialect: &str) -> Result<bool> {
        let span = tracing::debug_span!(target: "sqlscope.api", "is_single_select", dialect);
        let _guard = span.enter();

        let (_, statements) = prepare(sql, dialect)?;
        Ok(sqlscope_analysis::is_single_select(&statements))
    }

    /// Column lineage of the first statement of `sql` against `schema`.
    ///
    /// Only lexical, syntax, and dialect errors fail the call; resolution
    /// problems are reported inside the returned report.
    pub fn column_lineage(&self, sql: &str, dialect: &str, schema: &Schema) -> Result<LineageReport> {
        let span = tracing::debug_span!(
            target: "sqlscope.api",
            "column_lineage",
            dialect,
            tables = schema.len(),
        );
        let _guard = span.enter();

        let found = lookup_dialect(dialect)?;
        if self.config.lineage_too_long(sql.len()) {
            tracing::debug!(target: "sqlscope.api", len = sql.len(), "lineage skipped");
            return Ok(LineageReport::failed(QUERY_TOO_LONG));
        }
        let statements = parse(sql, found)?;
        Ok(sqlscope_analysis::column_lineage(&statements, found, schema))
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// [`Analyzer::extract_tables`] with the default configuration.
pub fn extract_tables(sql: &str, dialect: &str) -> Result<Vec<String>> {
    Analyzer::default().extract_tables(sql, dialect)
}

/// [`Analyzer::rename_tables`] with the default configuration.
pub fn rename_tables(sql: &str, dialect: &str, mapping: &HashMap<String, String>) -> Result<String> {
    Analyzer::default().rename_tables(sql, dialect, mapping)
}

/// [`Analyzer::add_limit`] with the default configuration.
pub fn add_limit(sql: &str, dialect: &str, limit: u64) -> Result<String> {
    Analyzer::default().add_limit(sql, dialect, limit)
}

/// [`Analyzer::is_single_select`] with the default configuration.
pub fn is_single_select(sql: &str, dialect: &str) -> Result<bool> {
    Analyzer::default().is_single_select(sql, dialect)
}

/// [`Analyzer::column_lineage`] with the default configuration.
pub fn column_lineage(sql: &str, dialect: &str, schema: &Schema) -> Result<LineageReport> {
    Analyzer::default().column_lineage(sql, dialect, schema)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Registry lookup; an unknown name is a request error.
pub fn lookup_dialect(name: &str) -> Result<&'static Dialect> {
    Dialect::from_name(name).ok_or_else(|| {
        let err = SqlError::unknown_dialect(name);
        tracing::debug!(target: "sqlscope.api", %err, "dialect lookup failed");
        err
    })
}

fn parse(sql: &str, dialect: &Dialect) -> Result<Vec<Statement>> {
    sqlscope_parser::parse_sql(sql, dialect)
        .inspect_err(|err| tracing::debug!(target: "sqlscope.api", %err, "parse failed"))
}

fn prepare(sql: &str, dialect: &str) -> Result<(&'static Dialect, Vec<Statement>)> {
    let dialect = lookup_dialect(dialect)?;
    let statements = parse(sql, dialect)?;
    Ok((dialect, statements))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_dialect_is_a_request_error() {
        match extract_tables("SELECT 1", "nosuchsql") {
            Err(SqlError::UnknownDialect { name }) => assert_eq!(name, "nosuchsql"),
            other => unreachable!("expected UnknownDialect, got {other:?}"),
        }
        assert_eq!(
            column_lineage("SELECT 1", "nosuchsql", &Schema::new()).map_err(|e| e.kind()),
            Err(ErrorKind::UnknownDialect)
        );
    }

    #[test]
    fn empty_dialect_name_is_generic() {
        assert_eq!(extract_tables("SELECT * FROM t", ""), Ok(vec!["t".to_owned()]));
    }

    #[test]
    fn configured_table_order() {
        let analyzer = Analyzer::new(AnalyzerConfig::default().with_table_order(TableOrder::Sorted));
        assert_eq!(
            analyzer.extract_tables("SELECT * FROM b JOIN a ON a.id = b.id", "postgres"),
            Ok(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn oversized_lineage_is_skipped() {
        let analyzer = Analyzer::new(AnalyzerConfig::default().with_max_lineage_query_length(8));
        let report = analyzer.column_lineage("SELECT a FROM t", "ansi", &Schema::new()).unwrap();
        assert!(report.columns.is_empty());
        assert_eq!(report.errors, vec![QUERY_TOO_LONG.to_owned()]);
    }

    #[test]
    fn resolution_errors_surface_from_extraction() {
        let err = extract_tables(
            "WITH a AS (SELECT * FROM b), b AS (SELECT 1) SELECT * FROM a",
            "ansi",
        );
        assert_eq!(err.map_err(|e| e.kind()), Err(ErrorKind::ResolutionError));
    }

    #[test]
    fn not_limitable_requests() {
        assert_eq!(
            add_limit("SELECT 1; SELECT 2", "ansi", 5).map_err(|e| e.kind()),
            Err(ErrorKind::NotLimitable)
        );
        assert_eq!(
            add_limit("DELETE FROM t", "ansi", 5).map_err(|e| e.kind()),
            Err(ErrorKind::NotLimitable)
        );
    }
}
