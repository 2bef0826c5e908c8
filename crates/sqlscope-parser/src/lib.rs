// SQL Lexer and Parser
//
// Hand-written recursive descent SQL parser with Pratt precedence-climbing
// for expressions. Produces an AST from `sqlscope-ast`, parameterized by a
// static `Dialect` record.

pub mod dialect;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod token;

pub use dialect::{Dialect, DoubleQuote, LimitStyle};
pub use expr::parse_expr;
pub use lexer::{LexError, Lexer};
pub use parser::{MAX_NESTING_DEPTH, ParseError, Parser};
pub use token::{Token, TokenKind};

use sqlscope_ast::Statement;
use sqlscope_error::SqlError;

/// Lex and parse every statement in `sql`.
///
/// The first lexical or syntax error aborts the whole input.
pub fn parse_sql(sql: &str, dialect: &Dialect) -> Result<Vec<Statement>, SqlError> {
    let mut parser = Parser::from_sql(sql, dialect)?;
    Ok(parser.parse_all()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{ANSI, BIGQUERY};

    #[test]
    fn parse_sql_reports_lex_errors_first() {
        let err = parse_sql("SELECT 'open", &ANSI).unwrap_err();
        assert!(matches!(err, SqlError::Lex { offset: 7, .. }));
    }

    #[test]
    fn parse_sql_splits_statements() {
        let stmts = parse_sql("SELECT 1; SELECT 2;", &BIGQUERY).unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn parse_sql_empty_input() {
        assert!(parse_sql("  -- nothing\n", &ANSI).unwrap().is_empty());
    }
}
