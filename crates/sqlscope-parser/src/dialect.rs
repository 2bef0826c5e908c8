// SQL Dialect Registry
//
// Static, read-only descriptions of the lexical and syntactic rules that
// differ between engines. A `Dialect` is plain data: the lexer and parser
// consult it, nothing mutates it, and every request shares the same records.

use sqlscope_ast::{Ident, ObjectName};

use crate::token::TokenKind;

/// How a dialect spells a row cap on a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitStyle {
    /// `... LIMIT n`
    Limit,
    /// `SELECT TOP n ...`
    Top,
    /// `... FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

/// What a double-quoted token means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleQuote {
    Identifier,
    String,
}

/// Lexical and syntactic parameters of one SQL dialect.
#[derive(Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Dialect {
    /// Canonical registry name.
    pub name: &'static str,
    /// Meaning of `"..."`.
    pub double_quote: DoubleQuote,
    /// `` `name` `` quotes an identifier.
    pub backtick_identifiers: bool,
    /// `[name]` quotes an identifier.
    pub bracket_identifiers: bool,
    /// A single quoted identifier containing `.` spells a multi-part name.
    pub dotted_quoted_names: bool,
    /// `\'` and friends are escapes inside string literals.
    pub backslash_escapes: bool,
    /// `'''...'''` and `"""..."""` string literals.
    pub triple_quoted_strings: bool,
    /// `# ...` line comments.
    pub hash_comments: bool,
    /// `// ...` line comments.
    pub double_slash_comments: bool,
    /// `/* /* */ */` nests.
    pub nested_block_comments: bool,
    /// Unquoted identifiers compare case-insensitively.
    pub case_insensitive: bool,
    /// Quoted identifiers keep their exact spelling when compared.
    pub quoted_case_sensitive: bool,
    /// `^` is exponentiation rather than bitwise XOR.
    pub caret_is_power: bool,
    /// Row cap syntax used when injecting a limit.
    pub limit_style: LimitStyle,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY` is available.
    pub offset_fetch: bool,
    /// Words reserved in this dialect on top of the shared reserved set.
    /// These can never be used as an implicit alias.
    pub extra_reserved: &'static [&'static str],
}

impl Dialect {
    /// Whether the token is reserved here, i.e. cannot be used as a bare
    /// identifier or implicit alias.
    #[must_use]
    pub fn is_reserved(&self, kind: &TokenKind) -> bool {
        if kind.is_reserved_keyword() {
            return true;
        }
        kind.keyword_text()
            .is_some_and(|kw| self.extra_reserved.iter().any(|r| r.eq_ignore_ascii_case(kw)))
    }

    /// Whether `word` is one of this dialect's extra reserved words.
    #[must_use]
    pub fn reserves(&self, word: &str) -> bool {
        self.extra_reserved
            .iter()
            .any(|r| r.eq_ignore_ascii_case(word))
    }

    /// Normalize an identifier for comparison under this dialect's rules.
    #[must_use]
    pub fn fold(&self, ident: &str) -> String {
        if self.case_insensitive {
            ident.to_lowercase()
        } else {
            ident.to_owned()
        }
    }

    /// Comparison key of a parsed identifier. A quoted identifier is folded
    /// only in dialects where quoting does not preserve case.
    #[must_use]
    pub fn fold_ident(&self, ident: &Ident) -> String {
        if ident.is_quoted() && self.quoted_case_sensitive {
            ident.value.clone()
        } else {
            self.fold(&ident.value)
        }
    }

    /// Comparison key of a dotted name, each part folded on its own terms.
    #[must_use]
    pub fn fold_name(&self, name: &ObjectName) -> String {
        let mut key = String::new();
        for (i, part) in name.parts.iter().enumerate() {
            if i > 0 {
                key.push('.');
            }
            key.push_str(&self.fold_ident(part));
        }
        key
    }

    /// Whether a parsed identifier names `name`, a plain spelling such as a
    /// schema key. A quoted identifier must match exactly where quoting
    /// keeps case.
    #[must_use]
    pub fn ident_names(&self, ident: &Ident, name: &str) -> bool {
        if ident.is_quoted() && self.quoted_case_sensitive {
            ident.value == name
        } else {
            self.ident_eq(&ident.value, name)
        }
    }

    /// Compare two parsed identifiers under this dialect's rules.
    #[must_use]
    pub fn ident_matches(&self, a: &Ident, b: &Ident) -> bool {
        self.fold_ident(a) == self.fold_ident(b)
    }

    /// Compare two identifiers under this dialect's rules.
    #[must_use]
    pub fn ident_eq(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    /// Look up a registered dialect by name (case-insensitive).
    ///
    /// The empty name selects the generic ANSI dialect.
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static Self> {
        let key = name.trim().to_ascii_lowercase();
        let dialect = match key.as_str() {
            "" | "ansi" | "generic" => &ANSI,
            "bigquery" => &BIGQUERY,
            "snowflake" => &SNOWFLAKE,
            "postgres" | "postgresql" => &POSTGRES,
            "redshift" => &REDSHIFT,
            "mysql" | "mariadb" => &MYSQL,
            "athena" => &ATHENA,
            "trino" => &TRINO,
            "presto" => &PRESTO,
            "clickhouse" => &CLICKHOUSE,
            "databricks" => &DATABRICKS,
            "spark" | "spark2" => &SPARK,
            "hive" => &HIVE,
            "tsql" | "mssql" | "sqlserver" | "synapse" | "fabric" => &TSQL,
            "duckdb" => &DUCKDB,
            "sqlite" => &SQLITE,
            "oracle" => &ORACLE,
            "teradata" => &TERADATA,
            _ => return None,
        };
        Some(dialect)
    }

    /// Every registered dialect, in registry order.
    #[must_use]
    pub fn all() -> &'static [&'static Self] {
        ALL
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

const BASE: Dialect = Dialect {
    name: "ansi",
    double_quote: DoubleQuote::Identifier,
    backtick_identifiers: false,
    bracket_identifiers: false,
    dotted_quoted_names: false,
    backslash_escapes: false,
    triple_quoted_strings: false,
    hash_comments: false,
    double_slash_comments: false,
    nested_block_comments: false,
    case_insensitive: true,
    quoted_case_sensitive: true,
    caret_is_power: false,
    limit_style: LimitStyle::Limit,
    offset_fetch: true,
    extra_reserved: &[],
};

pub static ANSI: Dialect = BASE;

pub static BIGQUERY: Dialect = Dialect {
    name: "bigquery",
    double_quote: DoubleQuote::String,
    backtick_identifiers: true,
    dotted_quoted_names: true,
    backslash_escapes: true,
    triple_quoted_strings: true,
    hash_comments: true,
    case_insensitive: false,
    offset_fetch: false,
    extra_reserved: &["QUALIFY", "WINDOW"],
    ..BASE
};

pub static SNOWFLAKE: Dialect = Dialect {
    name: "snowflake",
    backslash_escapes: true,
    double_slash_comments: true,
    extra_reserved: &["QUALIFY", "MINUS"],
    ..BASE
};

pub static POSTGRES: Dialect = Dialect {
    name: "postgres",
    nested_block_comments: true,
    caret_is_power: true,
    ..BASE
};

pub static REDSHIFT: Dialect = Dialect {
    name: "redshift",
    quoted_case_sensitive: false,
    caret_is_power: true,
    offset_fetch: false,
    ..BASE
};

pub static MYSQL: Dialect = Dialect {
    name: "mysql",
    quoted_case_sensitive: false,
    double_quote: DoubleQuote::String,
    backtick_identifiers: true,
    backslash_escapes: true,
    hash_comments: true,
    offset_fetch: false,
    ..BASE
};

pub static TRINO: Dialect = Dialect {
    name: "trino",
    ..BASE
};

pub static PRESTO: Dialect = Dialect {
    name: "presto",
    ..BASE
};

pub static ATHENA: Dialect = Dialect {
    name: "athena",
    quoted_case_sensitive: false,
    backtick_identifiers: true,
    ..BASE
};

pub static CLICKHOUSE: Dialect = Dialect {
    name: "clickhouse",
    backtick_identifiers: true,
    backslash_escapes: true,
    case_insensitive: false,
    ..BASE
};

pub static DATABRICKS: Dialect = Dialect {
    name: "databricks",
    quoted_case_sensitive: false,
    double_quote: DoubleQuote::String,
    backtick_identifiers: true,
    backslash_escapes: true,
    offset_fetch: false,
    extra_reserved: &["QUALIFY", "MINUS"],
    ..BASE
};

pub static SPARK: Dialect = Dialect {
    name: "spark",
    quoted_case_sensitive: false,
    double_quote: DoubleQuote::String,
    backtick_identifiers: true,
    backslash_escapes: true,
    offset_fetch: false,
    extra_reserved: &["MINUS"],
    ..BASE
};

pub static HIVE: Dialect = Dialect {
    name: "hive",
    quoted_case_sensitive: false,
    double_quote: DoubleQuote::String,
    backtick_identifiers: true,
    backslash_escapes: true,
    offset_fetch: false,
    ..BASE
};

pub static TSQL: Dialect = Dialect {
    name: "tsql",
    quoted_case_sensitive: false,
    bracket_identifiers: true,
    limit_style: LimitStyle::Top,
    extra_reserved: &["TOP"],
    ..BASE
};

pub static DUCKDB: Dialect = Dialect {
    name: "duckdb",
    quoted_case_sensitive: false,
    nested_block_comments: true,
    caret_is_power: true,
    extra_reserved: &["QUALIFY"],
    ..BASE
};

pub static SQLITE: Dialect = Dialect {
    name: "sqlite",
    quoted_case_sensitive: false,
    backtick_identifiers: true,
    bracket_identifiers: true,
    offset_fetch: false,
    ..BASE
};

pub static ORACLE: Dialect = Dialect {
    name: "oracle",
    limit_style: LimitStyle::FetchFirst,
    extra_reserved: &["MINUS"],
    ..BASE
};

pub static TERADATA: Dialect = Dialect {
    name: "teradata",
    quoted_case_sensitive: false,
    limit_style: LimitStyle::Top,
    offset_fetch: false,
    extra_reserved: &["TOP", "QUALIFY", "MINUS"],
    ..BASE
};

static ALL: &[&Dialect] = &[
    &ANSI,
    &BIGQUERY,
    &SNOWFLAKE,
    &POSTGRES,
    &REDSHIFT,
    &MYSQL,
    &TRINO,
    &PRESTO,
    &ATHENA,
    &CLICKHOUSE,
    &DATABRICKS,
    &SPARK,
    &HIVE,
    &TSQL,
    &DUCKDB,
    &SQLITE,
    &ORACLE,
    &TERADATA,
];
