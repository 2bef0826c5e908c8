// SQL Token Types
//
// Every token carries a discriminant, a byte-offset span, and the line/column
// of its first byte. Keywords are their own variants for O(1) matching in the
// parser; whether a keyword is reserved is decided together with the dialect.

use sqlscope_ast::Span;

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token discriminant.
    pub kind: TokenKind,
    /// Byte-offset span into the original source.
    pub span: Span,
    /// Line number (1-based) at the start of the token.
    pub line: u32,
    /// Column number (1-based) at the start of the token.
    pub col: u32,
}

impl Token {
    /// The raw source text of this token.
    #[must_use]
    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        self.span.text(src)
    }
}

/// Token discriminant.
///
/// Organized by category: literals, identifiers, parameters, operators,
/// punctuation, keywords, and end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // === Literals ===
    /// Numeric literal as written: `42`, `3.14`, `1e10`, `0xFF`.
    Number(String),
    /// String literal with its decoded value and optional prefix
    /// (`E`, `N`, `R`, `B`, `X`, ...), uppercased.
    String {
        value: String,
        prefix: Option<String>,
    },

    // === Identifiers ===
    /// Unquoted identifier.
    Id(String),
    /// Quoted identifier and its opening quote character.
    QuotedId(String, char),

    // === Bind parameters ===
    /// `?`, `$1`, `:name`, `@name`, `@@name`, as written.
    Param(String),

    // === Operators ===
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,
    Eq,          // `=`
    EqEq,        // `==`
    Ne,          // `!=`
    LtGt,        // `<>`
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship,   // `<=>`
    Concat,      // `||`
    Arrow,       // `->`
    DoubleArrow, // `->>`
    FatArrow,    // `=>`
    DoubleColon, // `::`
    Colon,

    // === Punctuation ===
    Dot,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // === Keywords ===
    KwAll,
    KwAlter,
    KwAnd,
    KwAnti,
    KwAny,
    KwApply,
    KwArray,
    KwAs,
    KwAsc,
    KwBegin,
    KwBetween,
    KwBy,
    KwCase,
    KwCast,
    KwClone,
    KwCollate,
    KwCommit,
    KwConflict,
    KwCreate,
    KwCross,
    KwCurrent,
    KwDefault,
    KwDelete,
    KwDesc,
    KwDistinct,
    KwDiv,
    KwDo,
    KwDrop,
    KwDuplicate,
    KwElse,
    KwEnd,
    KwEscape,
    KwExcept,
    KwExists,
    KwExtract,
    KwFalse,
    KwFetch,
    KwFilter,
    KwFirst,
    KwFollowing,
    KwFor,
    KwFrom,
    KwFull,
    KwGlob,
    KwGroup,
    KwGroups,
    KwHaving,
    KwIf,
    KwIgnore,
    KwIlike,
    KwIn,
    KwInner,
    KwInsert,
    KwIntersect,
    KwInterval,
    KwInto,
    KwIs,
    KwJoin,
    KwKey,
    KwLast,
    KwLateral,
    KwLeft,
    KwLike,
    KwLimit,
    KwMatched,
    KwMaterialized,
    KwMerge,
    KwMinus,
    KwNatural,
    KwNext,
    KwNot,
    KwNothing,
    KwNull,
    KwNulls,
    KwOf,
    KwOffset,
    KwOn,
    KwOnly,
    KwOr,
    KwOrder,
    KwOuter,
    KwOver,
    KwOverwrite,
    KwPartition,
    KwPercent,
    KwPreceding,
    KwQualify,
    KwRange,
    KwRecursive,
    KwRegexp,
    KwReplace,
    KwRespect,
    KwReturning,
    KwRight,
    KwRlike,
    KwRollback,
    KwRow,
    KwRows,
    KwSafeCast,
    KwSelect,
    KwSemi,
    KwSet,
    KwSimilar,
    KwSome,
    KwSource,
    KwStart,
    KwTable,
    KwTarget,
    KwTemp,
    KwTemporary,
    KwThen,
    KwTies,
    KwTo,
    KwTop,
    KwTransaction,
    KwTransient,
    KwTrue,
    KwTruncate,
    KwTryCast,
    KwUnbounded,
    KwUnion,
    KwUnnest,
    KwUpdate,
    KwUsing,
    KwValues,
    KwView,
    KwWhen,
    KwWhere,
    KwWindow,
    KwWith,
    KwWithin,
    KwXor,

    // === Special ===
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up an identifier string to see if it's a keyword.
    /// Returns the keyword variant if so, else `None`.
    #[must_use]
    pub fn lookup_keyword(s: &str) -> Option<Self> {
        let kw = match s.to_ascii_uppercase().as_str() {
            "ALL" => Self::KwAll,
            "ALTER" => Self::KwAlter,
            "AND" => Self::KwAnd,
            "ANTI" => Self::KwAnti,
            "ANY" => Self::KwAny,
            "APPLY" => Self::KwApply,
            "ARRAY" => Self::KwArray,
            "AS" => Self::KwAs,
            "ASC" => Self::KwAsc,
            "BEGIN" => Self::KwBegin,
            "BETWEEN" => Self::KwBetween,
            "BY" => Self::KwBy,
            "CASE" => Self::KwCase,
            "CAST" => Self::KwCast,
            "CLONE" => Self::KwClone,
            "COLLATE" => Self::KwCollate,
            "COMMIT" => Self::KwCommit,
            "CONFLICT" => Self::KwConflict,
            "CREATE" => Self::KwCreate,
            "CROSS" => Self::KwCross,
            "CURRENT" => Self::KwCurrent,
            "DEFAULT" => Self::KwDefault,
            "DELETE" => Self::KwDelete,
            "DESC" => Self::KwDesc,
            "DISTINCT" => Self::KwDistinct,
            "DIV" => Self::KwDiv,
            "DO" => Self::KwDo,
            "DROP" => Self::KwDrop,
            "DUPLICATE" => Self::KwDuplicate,
            "ELSE" => Self::KwElse,
            "END" => Self::KwEnd,
            "ESCAPE" => Self::KwEscape,
            "EXCEPT" => Self::KwExcept,
            "EXISTS" => Self::KwExists,
            "EXTRACT" => Self::KwExtract,
            "FALSE" => Self::KwFalse,
            "FETCH" => Self::KwFetch,
            "FILTER" => Self::KwFilter,
            "FIRST" => Self::KwFirst,
            "FOLLOWING" => Self::KwFollowing,
            "FOR" => Self::KwFor,
            "FROM" => Self::KwFrom,
            "FULL" => Self::KwFull,
            "GLOB" => Self::KwGlob,
            "GROUP" => Self::KwGroup,
            "GROUPS" => Self::KwGroups,
            "HAVING" => Self::KwHaving,
            "IF" => Self::KwIf,
            "IGNORE" => Self::KwIgnore,
            "ILIKE" => Self::KwIlike,
            "IN" => Self::KwIn,
            "INNER" => Self::KwInner,
            "INSERT" => Self::KwInsert,
            "INTERSECT" => Self::KwIntersect,
            "INTERVAL" => Self::KwInterval,
            "INTO" => Self::KwInto,
            "IS" => Self::KwIs,
            "JOIN" => Self::KwJoin,
            "KEY" => Self::KwKey,
            "LAST" => Self::KwLast,
            "LATERAL" => Self::KwLateral,
            "LEFT" => Self::KwLeft,
            "LIKE" => Self::KwLike,
            "LIMIT" => Self::KwLimit,
            "MATCHED" => Self::KwMatched,
            "MATERIALIZED" => Self::KwMaterialized,
            "MERGE" => Self::KwMerge,
            "MINUS" => Self::KwMinus,
            "NATURAL" => Self::KwNatural,
            "NEXT" => Self::KwNext,
            "NOT" => Self::KwNot,
            "NOTHING" => Self::KwNothing,
            "NULL" => Self::KwNull,
            "NULLS" => Self::KwNulls,
            "OF" => Self::KwOf,
            "OFFSET" => Self::KwOffset,
            "ON" => Self::KwOn,
            "ONLY" => Self::KwOnly,
            "OR" => Self::KwOr,
            "ORDER" => Self::KwOrder,
            "OUTER" => Self::KwOuter,
            "OVER" => Self::KwOver,
            "OVERWRITE" => Self::KwOverwrite,
            "PARTITION" => Self::KwPartition,
            "PERCENT" => Self::KwPercent,
            "PRECEDING" => Self::KwPreceding,
            "QUALIFY" => Self::KwQualify,
            "RANGE" => Self::KwRange,
            "RECURSIVE" => Self::KwRecursive,
            "REGEXP" => Self::KwRegexp,
            "REPLACE" => Self::KwReplace,
            "RESPECT" => Self::KwRespect,
            "RETURNING" => Self::KwReturning,
            "RIGHT" => Self::KwRight,
            "RLIKE" => Self::KwRlike,
            "ROLLBACK" => Self::KwRollback,
            "ROW" => Self::KwRow,
            "ROWS" => Self::KwRows,
            "SAFE_CAST" => Self::KwSafeCast,
            "SELECT" => Self::KwSelect,
            "SEMI" => Self::KwSemi,
            "SET" => Self::KwSet,
            "SIMILAR" => Self::KwSimilar,
            "SOME" => Self::KwSome,
            "SOURCE" => Self::KwSource,
            "START" => Self::KwStart,
            "TABLE" => Self::KwTable,
            "TARGET" => Self::KwTarget,
            "TEMP" => Self::KwTemp,
            "TEMPORARY" => Self::KwTemporary,
            "THEN" => Self::KwThen,
            "TIES" => Self::KwTies,
            "TO" => Self::KwTo,
            "TOP" => Self::KwTop,
            "TRANSACTION" => Self::KwTransaction,
            "TRANSIENT" => Self::KwTransient,
            "TRUE" => Self::KwTrue,
            "TRUNCATE" => Self::KwTruncate,
            "TRY_CAST" => Self::KwTryCast,
            "UNBOUNDED" => Self::KwUnbounded,
            "UNION" => Self::KwUnion,
            "UNNEST" => Self::KwUnnest,
            "UPDATE" => Self::KwUpdate,
            "USING" => Self::KwUsing,
            "VALUES" => Self::KwValues,
            "VIEW" => Self::KwView,
            "WHEN" => Self::KwWhen,
            "WHERE" => Self::KwWhere,
            "WINDOW" => Self::KwWindow,
            "WITH" => Self::KwWith,
            "WITHIN" => Self::KwWithin,
            "XOR" => Self::KwXor,
            _ => return None,
        };
        Some(kw)
    }

    /// The uppercase spelling of a keyword token.
    #[must_use]
    pub const fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Self::KwAll => "ALL",
            Self::KwAlter => "ALTER",
            Self::KwAnd => "AND",
            Self::KwAnti => "ANTI",
            Self::KwAny => "ANY",
            Self::KwApply => "APPLY",
            Self::KwArray => "ARRAY",
            Self::KwAs => "AS",
            Self::KwAsc => "ASC",
            Self::KwBegin => "BEGIN",
            Self::KwBetween => "BETWEEN",
            Self::KwBy => "BY",
            Self::KwCase => "CASE",
            Self::KwCast => "CAST",
            Self::KwClone => "CLONE",
            Self::KwCollate => "COLLATE",
            Self::KwCommit => "COMMIT",
            Self::KwConflict => "CONFLICT",
            Self::KwCreate => "CREATE",
            Self::KwCross => "CROSS",
            Self::KwCurrent => "CURRENT",
            Self::KwDefault => "DEFAULT",
            Self::KwDelete => "DELETE",
            Self::KwDesc => "DESC",
            Self::KwDistinct => "DISTINCT",
            Self::KwDiv => "DIV",
            Self::KwDo => "DO",
            Self::KwDrop => "DROP",
            Self::KwDuplicate => "DUPLICATE",
            Self::KwElse => "ELSE",
            Self::KwEnd => "END",
            Self::KwEscape => "ESCAPE",
            Self::KwExcept => "EXCEPT",
            Self::KwExists => "EXISTS",
            Self::KwExtract => "EXTRACT",
            Self::KwFalse => "FALSE",
            Self::KwFetch => "FETCH",
            Self::KwFilter => "FILTER",
            Self::KwFirst => "FIRST",
            Self::KwFollowing => "FOLLOWING",
            Self::KwFor => "FOR",
            Self::KwFrom => "FROM",
            Self::KwFull => "FULL",
            Self::KwGlob => "GLOB",
            Self::KwGroup => "GROUP",
            Self::KwGroups => "GROUPS",
            Self::KwHaving => "HAVING",
            Self::KwIf => "IF",
            Self::KwIgnore => "IGNORE",
            Self::KwIlike => "ILIKE",
            Self::KwIn => "IN",
            Self::KwInner => "INNER",
            Self::KwInsert => "INSERT",
            Self::KwIntersect => "INTERSECT",
            Self::KwInterval => "INTERVAL",
            Self::KwInto => "INTO",
            Self::KwIs => "IS",
            Self::KwJoin => "JOIN",
            Self::KwKey => "KEY",
            Self::KwLast => "LAST",
            Self::KwLateral => "LATERAL",
            Self::KwLeft => "LEFT",
            Self::KwLike => "LIKE",
            Self::KwLimit => "LIMIT",
            Self::KwMatched => "MATCHED",
            Self::KwMaterialized => "MATERIALIZED",
            Self::KwMerge => "MERGE",
            Self::KwMinus => "MINUS",
            Self::KwNatural => "NATURAL",
            Self::KwNext => "NEXT",
            Self::KwNot => "NOT",
            Self::KwNothing => "NOTHING",
            Self::KwNull => "NULL",
            Self::KwNulls => "NULLS",
            Self::KwOf => "OF",
            Self::KwOffset => "OFFSET",
            Self::KwOn => "ON",
            Self::KwOnly => "ONLY",
            Self::KwOr => "OR",
            Self::KwOrder => "ORDER",
            Self::KwOuter => "OUTER",
            Self::KwOver => "OVER",
            Self::KwOverwrite => "OVERWRITE",
            Self::KwPartition => "PARTITION",
            Self::KwPercent => "PERCENT",
            Self::KwPreceding => "PRECEDING",
            Self::KwQualify => "QUALIFY",
            Self::KwRange => "RANGE",
            Self::KwRecursive => "RECURSIVE",
            Self::KwRegexp => "REGEXP",
            Self::KwReplace => "REPLACE",
            Self::KwRespect => "RESPECT",
            Self::KwReturning => "RETURNING",
            Self::KwRight => "RIGHT",
            Self::KwRlike => "RLIKE",
            Self::KwRollback => "ROLLBACK",
            Self::KwRow => "ROW",
            Self::KwRows => "ROWS",
            Self::KwSafeCast => "SAFE_CAST",
            Self::KwSelect => "SELECT",
            Self::KwSemi => "SEMI",
            Self::KwSet => "SET",
            Self::KwSimilar => "SIMILAR",
            Self::KwSome => "SOME",
            Self::KwSource => "SOURCE",
            Self::KwStart => "START",
            Self::KwTable => "TABLE",
            Self::KwTarget => "TARGET",
            Self::KwTemp => "TEMP",
            Self::KwTemporary => "TEMPORARY",
            Self::KwThen => "THEN",
            Self::KwTies => "TIES",
            Self::KwTo => "TO",
            Self::KwTop => "TOP",
            Self::KwTransaction => "TRANSACTION",
            Self::KwTransient => "TRANSIENT",
            Self::KwTrue => "TRUE",
            Self::KwTruncate => "TRUNCATE",
            Self::KwTryCast => "TRY_CAST",
            Self::KwUnbounded => "UNBOUNDED",
            Self::KwUnion => "UNION",
            Self::KwUnnest => "UNNEST",
            Self::KwUpdate => "UPDATE",
            Self::KwUsing => "USING",
            Self::KwValues => "VALUES",
            Self::KwView => "VIEW",
            Self::KwWhen => "WHEN",
            Self::KwWhere => "WHERE",
            Self::KwWindow => "WINDOW",
            Self::KwWith => "WITH",
            Self::KwWithin => "WITHIN",
            Self::KwXor => "XOR",
            _ => return None,
        };
        Some(text)
    }

    /// Whether this token is any keyword.
    #[must_use]
    pub const fn is_keyword(&self) -> bool {
        self.keyword_text().is_some()
    }

    /// Keywords no dialect allows as a bare identifier or implicit alias.
    #[must_use]
    pub const fn is_reserved_keyword(&self) -> bool {
        matches!(
            self,
            Self::KwAll
                | Self::KwAnd
                | Self::KwAny
                | Self::KwAs
                | Self::KwAsc
                | Self::KwBetween
                | Self::KwBy
                | Self::KwCase
                | Self::KwCast
                | Self::KwCollate
                | Self::KwCreate
                | Self::KwCross
                | Self::KwDefault
                | Self::KwDelete
                | Self::KwDesc
                | Self::KwDistinct
                | Self::KwDrop
                | Self::KwElse
                | Self::KwEnd
                | Self::KwExcept
                | Self::KwExists
                | Self::KwFalse
                | Self::KwFetch
                | Self::KwFor
                | Self::KwFrom
                | Self::KwFull
                | Self::KwGroup
                | Self::KwHaving
                | Self::KwIn
                | Self::KwInner
                | Self::KwInsert
                | Self::KwIntersect
                | Self::KwInto
                | Self::KwIs
                | Self::KwJoin
                | Self::KwLateral
                | Self::KwLeft
                | Self::KwLike
                | Self::KwLimit
                | Self::KwNatural
                | Self::KwNot
                | Self::KwNull
                | Self::KwOffset
                | Self::KwOn
                | Self::KwOr
                | Self::KwOrder
                | Self::KwOuter
                | Self::KwOver
                | Self::KwRight
                | Self::KwSelect
                | Self::KwSet
                | Self::KwSome
                | Self::KwTable
                | Self::KwThen
                | Self::KwTo
                | Self::KwTrue
                | Self::KwUnion
                | Self::KwUpdate
                | Self::KwUsing
                | Self::KwValues
                | Self::KwWhen
                | Self::KwWhere
                | Self::KwWindow
                | Self::KwWith
        )
    }

    /// Human-readable description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::String { value, .. } => format!("string '{value}'"),
            Self::Id(name) => format!("identifier {name}"),
            Self::QuotedId(name, q) => format!("identifier {q}{name}"),
            Self::Param(p) => format!("parameter {p}"),
            Self::Eof => "end of input".to_owned(),
            other => other.keyword_text().map_or_else(
                || format!("'{}'", other.punct_text()),
                |kw| format!("keyword {kw}"),
            ),
        }
    }

    /// Spelling of an operator or punctuation token.
    #[must_use]
    pub const fn punct_text(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Eq => "=",
            Self::EqEq => "==",
            Self::Ne => "!=",
            Self::LtGt => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Spaceship => "<=>",
            Self::Concat => "||",
            Self::Arrow => "->",
            Self::DoubleArrow => "->>",
            Self::FatArrow => "=>",
            Self::DoubleColon => "::",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            _ => "?",
        }
    }

    /// Returns true if this keyword starts a SELECT-producing query.
    #[must_use]
    pub const fn is_query_start(&self) -> bool {
        matches!(self, Self::KwSelect | Self::KwWith | Self::KwValues)
    }
}
