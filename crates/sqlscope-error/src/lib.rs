use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary error type for sqlscope operations.
///
/// Every fatal outcome of a request maps onto exactly one variant. Positions
/// are byte offsets into the original SQL text plus 1-based line/column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    // === Lexical Errors ===
    /// Input cannot be tokenized (unterminated string, quoted identifier,
    /// block comment, or an unexpected byte).
    #[error("lex error at {line}:{col} (offset {offset}): {reason}")]
    Lex {
        offset: usize,
        line: u32,
        col: u32,
        reason: String,
    },

    // === Syntax Errors ===
    /// The token stream does not match the grammar.
    #[error("parse error at {line}:{col} (offset {offset}): expected {expected}, found {found}")]
    Parse {
        offset: usize,
        line: u32,
        col: u32,
        expected: String,
        found: String,
    },

    // === Semantic Errors ===
    /// A name could not be resolved against its scopes.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    // === Request Errors ===
    /// The requested dialect is not registered.
    #[error("unknown dialect: '{name}'")]
    UnknownDialect { name: String },

    /// `add_limit` was asked to limit something that is not a single SELECT.
    #[error("statement cannot be limited: {reason}")]
    NotLimitable { reason: String },
}

/// Kind of a name-resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionErrorKind {
    /// A table qualifier or CTE name that is not visible from its scope.
    UnknownTable,
    /// Two FROM entries of one scope bind the same name.
    DuplicateAlias,
    /// An unqualified column matches more than one table in scope.
    AmbiguousColumn,
    /// A column that no table in scope declares.
    UnknownColumn,
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownTable => "UnknownTable",
            Self::DuplicateAlias => "DuplicateAlias",
            Self::AmbiguousColumn => "AmbiguousColumn",
            Self::UnknownColumn => "UnknownColumn",
        };
        f.write_str(name)
    }
}

/// A name-resolution failure, carrying the offending name.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {name}")]
pub struct ResolutionError {
    pub kind: ResolutionErrorKind,
    pub name: String,
    /// Byte offset of the offending reference, when known.
    pub offset: Option<usize>,
}

impl ResolutionError {
    #[must_use]
    pub fn new(kind: ResolutionErrorKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            offset: None,
        }
    }

    #[must_use]
    pub const fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::UnknownTable, name)
    }

    #[must_use]
    pub fn duplicate_alias(name: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::DuplicateAlias, name)
    }

    #[must_use]
    pub fn ambiguous_column(name: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::AmbiguousColumn, name)
    }

    #[must_use]
    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::UnknownColumn, name)
    }
}

/// Stable, serializable error codes for the marshalling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    LexError,
    ParseError,
    ResolutionError,
    UnknownDialect,
    NotLimitable,
}

impl SqlError {
    /// Map this error to its stable code.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex { .. } => ErrorKind::LexError,
            Self::Parse { .. } => ErrorKind::ParseError,
            Self::Resolution(_) => ErrorKind::ResolutionError,
            Self::UnknownDialect { .. } => ErrorKind::UnknownDialect,
            Self::NotLimitable { .. } => ErrorKind::NotLimitable,
        }
    }

    /// Byte offset into the input, for errors tied to a source position.
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Lex { offset, .. } | Self::Parse { offset, .. } => Some(*offset),
            Self::Resolution(err) => err.offset,
            Self::UnknownDialect { .. } | Self::NotLimitable { .. } => None,
        }
    }

    /// 1-based line and column, for lexical and syntax errors.
    pub const fn line_col(&self) -> Option<(u32, u32)> {
        match self {
            Self::Lex { line, col, .. } | Self::Parse { line, col, .. } => Some((*line, *col)),
            _ => None,
        }
    }

    /// Whether the input text itself is at fault (as opposed to the request).
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Lex { .. } | Self::Parse { .. } | Self::Resolution(_)
        )
    }

    /// Create an unknown-dialect error.
    pub fn unknown_dialect(name: impl Into<String>) -> Self {
        Self::UnknownDialect { name: name.into() }
    }

    /// Create a not-limitable error.
    pub fn not_limitable(reason: impl Into<String>) -> Self {
        Self::NotLimitable {
            reason: reason.into(),
        }
    }
}

/// Result type alias using `SqlError`.
pub type Result<T> = std::result::Result<T, SqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_lex() {
        let err = SqlError::Lex {
            offset: 7,
            line: 1,
            col: 8,
            reason: "unterminated string literal".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "lex error at 1:8 (offset 7): unterminated string literal"
        );
    }

    #[test]
    fn error_display_parse() {
        let err = SqlError::Parse {
            offset: 14,
            line: 2,
            col: 3,
            expected: "expression".to_owned(),
            found: "end of input".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "parse error at 2:3 (offset 14): expected expression, found end of input"
        );
    }

    #[test]
    fn error_display_resolution() {
        let err: SqlError = ResolutionError::duplicate_alias("o").into();
        assert_eq!(err.to_string(), "DuplicateAlias: o");
        assert_eq!(err.kind(), ErrorKind::ResolutionError);
    }

    #[test]
    fn error_kind_mapping() {
        assert_eq!(SqlError::unknown_dialect("x").kind(), ErrorKind::UnknownDialect);
        assert_eq!(SqlError::not_limitable("x").kind(), ErrorKind::NotLimitable);
        assert_eq!(
            SqlError::unknown_dialect("cobol").to_string(),
            "unknown dialect: 'cobol'"
        );
    }

    #[test]
    fn offsets() {
        let err: SqlError = ResolutionError::unknown_table("later").at(31).into();
        assert_eq!(err.offset(), Some(31));
        assert_eq!(err.line_col(), None);
        assert_eq!(SqlError::not_limitable("insert").offset(), None);
    }

    #[test]
    fn input_errors() {
        assert!(SqlError::from(ResolutionError::unknown_column("c")).is_input_error());
        assert!(!SqlError::unknown_dialect("x").is_input_error());
        assert!(!SqlError::not_limitable("x").is_input_error());
    }

    #[test]
    fn kinds_serialize_as_names() {
        let json = serde_json::to_string(&ErrorKind::NotLimitable).unwrap();
        assert_eq!(json, "\"NotLimitable\"");
        let json = serde_json::to_string(&ResolutionErrorKind::AmbiguousColumn).unwrap();
        assert_eq!(json, "\"AmbiguousColumn\"");
    }
}
