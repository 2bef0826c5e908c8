//! SQL syntax tree node types for sqlscope.
//!
//! Every statement parsed by `sqlscope-parser` produces a tree of these nodes.
//! Identifiers, table names, table references, and expressions all carry a
//! [`Span`] into the original text, so analyzers can rewrite the source by
//! splicing byte ranges instead of re-printing the tree.

use std::fmt;

use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// Span: source location tracking
// ---------------------------------------------------------------------------

/// A byte-offset range into the original SQL source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: u32,
    /// Byte offset one past the last character (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from start (inclusive) to end (exclusive) byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-length span at position 0, used as a placeholder.
    pub const ZERO: Self = Self { start: 0, end: 0 };

    /// Merge two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Start offset as a `usize`, for slicing.
    #[must_use]
    pub const fn start_usize(self) -> usize {
        self.start as usize
    }

    /// End offset as a `usize`, for slicing.
    #[must_use]
    pub const fn end_usize(self) -> usize {
        self.end as usize
    }

    /// The source text covered by this span (empty if out of range).
    #[must_use]
    pub fn text(self, src: &str) -> &str {
        src.get(self.start_usize()..self.end_usize()).unwrap_or("")
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Identifiers and qualified names
// ---------------------------------------------------------------------------

/// A single identifier, with its quoting preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The identifier value with quotes removed and escapes decoded.
    pub value: String,
    /// The opening quote character, if the identifier was quoted.
    pub quote: Option<char>,
    pub span: Span,
}

impl Ident {
    /// Create an unquoted identifier.
    #[must_use]
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self {
            value: value.into(),
            quote: None,
            span,
        }
    }

    /// Create a quoted identifier.
    #[must_use]
    pub fn quoted(value: impl Into<String>, quote: char, span: Span) -> Self {
        Self {
            value: value.into(),
            quote: Some(quote),
            span,
        }
    }

    #[must_use]
    pub const fn is_quoted(&self) -> bool {
        self.quote.is_some()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A possibly-qualified object name like `db.schema.orders` or `orders`.
///
/// Several parts may share one span when a dialect allows a single quoted
/// identifier to spell a whole path (`` `project.dataset.table` ``).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub parts: SmallVec<[Ident; 3]>,
    pub span: Span,
}

impl ObjectName {
    /// Create a single-part name.
    #[must_use]
    pub fn bare(ident: Ident) -> Self {
        let span = ident.span;
        let mut parts = SmallVec::new();
        parts.push(ident);
        Self { parts, span }
    }

    /// Create a name from its parts; the span covers all of them.
    #[must_use]
    pub fn from_parts(parts: impl IntoIterator<Item = Ident>) -> Self {
        let parts: SmallVec<[Ident; 3]> = parts.into_iter().collect();
        let span = match (parts.first(), parts.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => Span::ZERO,
        };
        Self { parts, span }
    }

    /// The last (unqualified) part.
    #[must_use]
    pub fn name(&self) -> Option<&Ident> {
        self.parts.last()
    }

    /// The parts joined by `.`, without quotes.
    #[must_use]
    pub fn qualified(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&part.value);
        }
        out
    }

    /// Whether this name has more than one part.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

// ---------------------------------------------------------------------------
// Top-level statement
// ---------------------------------------------------------------------------

/// A single parsed SQL statement.
///
/// The parser produces one `Statement` per separator-delimited command.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    // Queries and DML
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Merge(MergeStatement),

    // DDL
    CreateTable(CreateTableStatement),

    /// Recognized statement whose body is only skimmed for table names.
    Other(OtherStatement),
    /// Recognized statement kind that is not modeled; body skipped.
    Unsupported(UnsupportedStatement),
}

impl Statement {
    /// Span from the first token of the statement to its last token
    /// (excluding the separator).
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Select(s) => s.span,
            Self::Insert(s) => s.span,
            Self::Update(s) => s.span,
            Self::Delete(s) => s.span,
            Self::Merge(s) => s.span,
            Self::CreateTable(s) => s.span,
            Self::Other(s) => s.span,
            Self::Unsupported(s) => s.span,
        }
    }

    /// Short uppercase name of the statement kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Select(_) => "SELECT",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::Merge(_) => "MERGE",
            Self::CreateTable(s) => match s.object {
                CreatedObject::Table => "CREATE TABLE",
                CreatedObject::View => "CREATE VIEW",
                CreatedObject::MaterializedView => "CREATE MATERIALIZED VIEW",
            },
            Self::Other(s) => s.kind.as_str(),
            Self::Unsupported(s) => &s.keyword,
        }
    }
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A literal value in SQL source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Numeric literal, as written.
    Number(String),
    /// String literal (decoded value).
    String(String),
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// The keyword `NULL`.
    Null,
    /// A typed literal such as `DATE '2024-01-01'`.
    Typed { type_name: String, value: String },
}

// ---------------------------------------------------------------------------
// Column references
// ---------------------------------------------------------------------------

/// A reference to a column, possibly qualified with a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Optional (possibly multi-part) table qualifier.
    pub qualifier: Option<ObjectName>,
    /// Column name.
    pub column: Ident,
}

impl ColumnRef {
    /// Create an unqualified column reference.
    #[must_use]
    pub const fn bare(column: Ident) -> Self {
        Self {
            qualifier: None,
            column,
        }
    }

    /// Create a qualified column reference.
    #[must_use]
    pub const fn qualified(qualifier: ObjectName, column: Ident) -> Self {
        Self {
            qualifier: Some(qualifier),
            column,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref q) = self.qualifier {
            write!(f, "{q}.{}", self.column)
        } else {
            write!(f, "{}", self.column)
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    IntDivide,
    Power,

    // String
    Concat,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IsDistinctFrom,
    IsNotDistinctFrom,

    // Logical
    And,
    Or,
    Xor,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,

    // JSON access
    Arrow,
    LongArrow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::IntDivide => "DIV",
            Self::Power => "^",
            Self::Concat => "||",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::IsDistinctFrom => "IS DISTINCT FROM",
            Self::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Arrow => "->",
            Self::LongArrow => "->>",
        })
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Unary minus (`-expr`).
    Negate,
    /// Unary plus (`+expr`).
    Plus,
    /// Bitwise NOT (`~expr`).
    BitNot,
    /// Logical NOT (`NOT expr`).
    Not,
}

/// Pattern-matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeOp {
    Like,
    ILike,
    RLike,
    Regexp,
    SimilarTo,
    Glob,
}

/// `ANY` / `ALL` quantifier on a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Any,
    All,
}

/// How a cast was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// `CAST(x AS t)`
    Cast,
    /// `TRY_CAST(x AS t)`
    TryCast,
    /// `SAFE_CAST(x AS t)`
    SafeCast,
    /// `x::t`
    DoubleColon,
}

/// A type name as written, e.g. `VARCHAR(255)` or `ARRAY<STRING>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Source text of the type.
    pub name: String,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression node.
///
/// Every variant carries a [`Span`] for source-location tracking.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant.
    Literal(Literal, Span),

    /// A column reference (possibly table-qualified).
    Column(ColumnRef, Span),

    /// `*` or `t.*` in an argument position, e.g. `COUNT(*)`.
    Wildcard {
        qualifier: Option<ObjectName>,
        span: Span,
    },

    /// A binary operation: `left op right`.
    BinaryOp {
        left: Box<Self>,
        op: BinaryOp,
        right: Box<Self>,
        span: Span,
    },

    /// A unary operation: `op expr`.
    UnaryOp {
        op: UnaryOp,
        expr: Box<Self>,
        span: Span,
    },

    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        expr: Box<Self>,
        low: Box<Self>,
        high: Box<Self>,
        not: bool,
        span: Span,
    },

    /// `expr [NOT] IN (...)`.
    In {
        expr: Box<Self>,
        set: InSet,
        not: bool,
        span: Span,
    },

    /// `expr [NOT] LIKE/ILIKE/RLIKE/REGEXP/SIMILAR TO pattern [ESCAPE escape]`.
    Like {
        expr: Box<Self>,
        pattern: Box<Self>,
        escape: Option<Box<Self>>,
        op: LikeOp,
        not: bool,
        span: Span,
    },

    /// `CASE [operand] WHEN ... THEN ... [ELSE ...] END`.
    Case {
        operand: Option<Box<Self>>,
        whens: Vec<(Self, Self)>,
        else_expr: Option<Box<Self>>,
        span: Span,
    },

    /// `CAST(expr AS type)` and its variants.
    Cast {
        expr: Box<Self>,
        type_name: TypeName,
        kind: CastKind,
        span: Span,
    },

    /// `[NOT] EXISTS (subquery)`.
    Exists {
        subquery: Box<SelectStatement>,
        not: bool,
        span: Span,
    },

    /// A scalar subquery: `(SELECT ...)`.
    Subquery(Box<SelectStatement>, Span),

    /// `left op ANY|ALL (subquery or array)`.
    Quantified {
        left: Box<Self>,
        op: BinaryOp,
        quantifier: Quantifier,
        right: Box<Self>,
        span: Span,
    },

    /// A function call, with the optional aggregate and window decorations.
    FunctionCall(Box<FunctionCall>),

    /// `EXTRACT(field FROM expr)`.
    Extract {
        field: String,
        expr: Box<Self>,
        span: Span,
    },

    /// `INTERVAL value [unit]`.
    Interval {
        value: Box<Self>,
        unit: Option<String>,
        span: Span,
    },

    /// `expr COLLATE collation`.
    Collate {
        expr: Box<Self>,
        collation: String,
        span: Span,
    },

    /// `expr IS [NOT] NULL`.
    IsNull {
        expr: Box<Self>,
        not: bool,
        span: Span,
    },

    /// `expr IS [NOT] TRUE|FALSE`.
    IsBool {
        expr: Box<Self>,
        value: bool,
        not: bool,
        span: Span,
    },

    /// Array literal: `[a, b]` or `ARRAY[a, b]`.
    Array(Vec<Self>, Span),

    /// `expr[index]`.
    Subscript {
        expr: Box<Self>,
        index: Box<Self>,
        span: Span,
    },

    /// A row value `(a, b, c)`.
    RowValue(Vec<Self>, Span),

    /// A bind parameter (`?`, `$1`, `:name`, `@name`), as written.
    Placeholder(String, Span),
}

impl Expr {
    /// Return the span of this expression node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, s)
            | Self::Column(_, s)
            | Self::Subquery(_, s)
            | Self::Array(_, s)
            | Self::RowValue(_, s)
            | Self::Placeholder(_, s) => *s,
            Self::FunctionCall(call) => call.span,
            Self::Wildcard { span, .. }
            | Self::BinaryOp { span, .. }
            | Self::UnaryOp { span, .. }
            | Self::Between { span, .. }
            | Self::In { span, .. }
            | Self::Like { span, .. }
            | Self::Case { span, .. }
            | Self::Cast { span, .. }
            | Self::Exists { span, .. }
            | Self::Quantified { span, .. }
            | Self::Extract { span, .. }
            | Self::Interval { span, .. }
            | Self::Collate { span, .. }
            | Self::IsNull { span, .. }
            | Self::IsBool { span, .. }
            | Self::Subscript { span, .. } => *span,
        }
    }

    /// The column reference, if this expression is exactly one.
    #[must_use]
    pub const fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Self::Column(col, _) => Some(col),
            _ => None,
        }
    }
}

/// The set of values for an IN expression.
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    /// `IN (expr, expr, ...)`
    List(Vec<Expr>),
    /// `IN (SELECT ...)`
    Subquery(Box<SelectStatement>),
    /// `IN UNNEST(expr)`
    Unnest(Box<Expr>),
}

/// A function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: ObjectName,
    pub args: Vec<FunctionArg>,
    pub distinct: bool,
    /// `ORDER BY` inside the argument list or `WITHIN GROUP (ORDER BY ...)`.
    pub order_by: Vec<OrderingTerm>,
    pub filter: Option<Box<Expr>>,
    pub over: Option<WindowSpec>,
    pub span: Span,
}

/// A single function argument, optionally named (`name => value`).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub name: Option<Ident>,
    pub value: Expr,
}

// ---------------------------------------------------------------------------
// Window specifications
// ---------------------------------------------------------------------------

/// Window specification for window functions.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    /// Optional base window name (`OVER w` or `OVER (w ...)`).
    pub base_window: Option<Ident>,
    /// PARTITION BY expressions.
    pub partition_by: Vec<Expr>,
    /// ORDER BY terms within the window.
    pub order_by: Vec<OrderingTerm>,
    /// Frame specification.
    pub frame: Option<FrameSpec>,
}

/// Window frame specification.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSpec {
    pub frame_type: FrameType,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

/// Window frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Rows,
    Range,
    Groups,
}

/// Window frame boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Box<Expr>),
    CurrentRow,
    Following(Box<Expr>),
    UnboundedFollowing,
}

// ---------------------------------------------------------------------------
// SELECT statement
// ---------------------------------------------------------------------------

/// A full SELECT statement, including WITH, ORDER BY, and LIMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Optional common table expressions.
    pub with: Option<WithClause>,
    /// The SELECT body (core + compound operators).
    pub body: SelectBody,
    /// ORDER BY clause (applies to the whole chain).
    pub order_by: Vec<OrderingTerm>,
    /// LIMIT / OFFSET / FETCH clause (applies to the whole chain).
    pub limit: Option<LimitClause>,
    /// Row locking clauses (`FOR UPDATE`, `FOR SHARE`, ...), in order.
    pub locking: Vec<LockingClause>,
    pub span: Span,
}

impl SelectStatement {
    /// Whether the body is a set-operation chain.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        !self.body.compounds.is_empty()
    }
}

/// WITH clause for common table expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    /// Whether this is `WITH RECURSIVE`.
    pub recursive: bool,
    /// The CTE definitions, in source order.
    pub ctes: Vec<Cte>,
    pub span: Span,
}

/// A single Common Table Expression definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Ident,
    /// Optional column name list.
    pub columns: Vec<Ident>,
    /// Materialization hint.
    pub materialized: Option<CteMaterialized>,
    /// The CTE body query.
    pub query: Box<SelectStatement>,
    pub span: Span,
}

/// CTE materialization hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CteMaterialized {
    Materialized,
    NotMaterialized,
}

/// The body of a SELECT: one or more cores connected by set operators.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBody {
    /// The first SELECT core.
    pub select: SelectCore,
    /// Zero or more compound operations (UNION, INTERSECT, EXCEPT).
    pub compounds: Vec<(CompoundOp, SelectCore)>,
}

impl SelectBody {
    /// All cores of the chain, left to right.
    pub fn cores(&self) -> impl Iterator<Item = &SelectCore> {
        std::iter::once(&self.select).chain(self.compounds.iter().map(|(_, core)| core))
    }
}

/// Compound SELECT operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

/// A single SELECT core, VALUES list, or parenthesized query.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectCore {
    /// `SELECT ... FROM ... WHERE ... GROUP BY ... HAVING ... QUALIFY ... WINDOW ...`
    Select(Box<Select>),
    /// `VALUES (row), (row), ...`
    Values(Vec<Vec<Expr>>, Span),
    /// `( query )` used as a set-operation operand or as the whole body.
    Nested(Box<SelectStatement>, Span),
}

impl SelectCore {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Select(select) => select.span,
            Self::Values(_, span) | Self::Nested(_, span) => *span,
        }
    }
}

/// A plain SELECT core.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: Distinctness,
    /// T-SQL / Teradata `TOP n`.
    pub top: Option<TopClause>,
    pub columns: Vec<ResultColumn>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub qualify: Option<Expr>,
    pub windows: Vec<WindowDef>,
    /// `SELECT ... INTO new_table`: the table created from the result.
    pub into: Option<SelectInto>,
    /// Span of `SELECT [DISTINCT|ALL]` (and `DISTINCT ON (...)`).
    pub head_span: Span,
    pub span: Span,
}

/// `INTO [TEMPORARY] [TABLE] name` between the projection and FROM.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectInto {
    pub temporary: bool,
    pub name: ObjectName,
    pub span: Span,
}

/// DISTINCT / ALL modifier on SELECT.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Distinctness {
    #[default]
    All,
    Distinct,
    /// PostgreSQL `DISTINCT ON (expr, ...)`.
    DistinctOn(Vec<Expr>),
}

/// `TOP n [PERCENT] [WITH TIES]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TopClause {
    pub count: Expr,
    pub percent: bool,
    pub with_ties: bool,
    pub span: Span,
}

/// A single item in the SELECT projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultColumn {
    /// `*`, optionally `* EXCEPT (a, b)`.
    Star { except: Vec<Ident>, span: Span },
    /// `t.*`, optionally `t.* EXCEPT (a, b)`.
    TableStar {
        qualifier: ObjectName,
        except: Vec<Ident>,
        span: Span,
    },
    /// `expr [AS alias]`.
    Expr { expr: Expr, alias: Option<Ident> },
}

impl ResultColumn {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Star { span, .. } | Self::TableStar { span, .. } => *span,
            Self::Expr { expr, alias } => alias
                .as_ref()
                .map_or_else(|| expr.span(), |a| expr.span().merge(a.span)),
        }
    }
}

/// The FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    /// The leftmost table source.
    pub source: TableOrSubquery,
    /// JOIN clauses (comma joins are `JoinKind::Cross` with `comma: true`).
    pub joins: Vec<JoinClause>,
}

/// `AS name (col, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAlias {
    pub name: Ident,
    pub columns: Vec<Ident>,
}

impl TableAlias {
    #[must_use]
    pub const fn new(name: Ident) -> Self {
        Self {
            name,
            columns: Vec::new(),
        }
    }
}

/// A table source in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOrSubquery {
    /// A named table: `[catalog.][schema.]table [AS alias]`.
    Table {
        name: ObjectName,
        alias: Option<TableAlias>,
        span: Span,
    },
    /// A derived table: `[LATERAL] (SELECT ...) [AS alias]`.
    Subquery {
        query: Box<SelectStatement>,
        alias: Option<TableAlias>,
        lateral: bool,
        span: Span,
    },
    /// A table-valued function: `UNNEST(arr) AS x`, `generate_series(1, 3)`.
    TableFunction {
        name: ObjectName,
        args: Vec<FunctionArg>,
        alias: Option<TableAlias>,
        lateral: bool,
        span: Span,
    },
    /// Parenthesized join: `(a JOIN b ON ...)`.
    ParenJoin(Box<FromClause>, Span),
}

impl TableOrSubquery {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Table { span, .. }
            | Self::Subquery { span, .. }
            | Self::TableFunction { span, .. }
            | Self::ParenJoin(_, span) => *span,
        }
    }

    /// The alias, if any.
    #[must_use]
    pub const fn alias(&self) -> Option<&TableAlias> {
        match self {
            Self::Table { alias, .. }
            | Self::Subquery { alias, .. }
            | Self::TableFunction { alias, .. } => alias.as_ref(),
            Self::ParenJoin(..) => None,
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// The right-hand table source.
    pub table: TableOrSubquery,
    /// Join constraint (ON or USING).
    pub constraint: Option<JoinConstraint>,
}

/// Join type modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinType {
    /// Whether this is a NATURAL join.
    pub natural: bool,
    /// Whether this join was written as a comma.
    pub comma: bool,
    pub kind: JoinKind,
}

/// The kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `,` or `CROSS JOIN`.
    Cross,
    /// `[INNER] JOIN`.
    Inner,
    /// `LEFT [OUTER] JOIN`.
    Left,
    /// `RIGHT [OUTER] JOIN`.
    Right,
    /// `FULL [OUTER] JOIN`.
    Full,
    /// `LEFT SEMI JOIN`.
    LeftSemi,
    /// `LEFT ANTI JOIN`.
    LeftAnti,
    /// `CROSS APPLY`.
    CrossApply,
    /// `OUTER APPLY`.
    OuterApply,
}

/// Join constraint: ON expression or USING column list.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<Ident>),
}

/// Named window definition in the WINDOW clause.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDef {
    pub name: Ident,
    pub spec: WindowSpec,
}

/// ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// NULLS ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    First,
    Last,
}

/// Row-limiting clause in any of its spellings.
///
/// `LIMIT n [OFFSET m]`, `LIMIT m, n`, `OFFSET m [ROWS]`, and
/// `[OFFSET m ROWS] FETCH FIRST|NEXT n ROWS ONLY` all land here.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    /// Row cap, if any (`LIMIT n` or `FETCH ... n ROWS`).
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    /// Whether the cap was written with `FETCH FIRST|NEXT`.
    pub fetch: bool,
    pub span: Span,
}

/// `FOR UPDATE [OF t, ...] [NOWAIT | SKIP LOCKED]` and its relatives,
/// including MySQL `LOCK IN SHARE MODE`.
#[derive(Debug, Clone, PartialEq)]
pub struct LockingClause {
    pub mode: LockMode,
    /// Tables named by `OF`; empty locks every table of the query.
    pub of: Vec<ObjectName>,
    pub wait: LockWait,
    pub span: Span,
}

/// Strength of a row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

/// What a locking read does when a row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

// ---------------------------------------------------------------------------
// INSERT statement
// ---------------------------------------------------------------------------

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Optional WITH clause.
    pub with: Option<WithClause>,
    /// `INSERT OVERWRITE` (Hive/Spark).
    pub overwrite: bool,
    /// Target table name.
    pub table: ObjectName,
    /// Optional alias for the target table.
    pub alias: Option<Ident>,
    /// Optional column name list.
    pub columns: Vec<Ident>,
    /// The source of rows.
    pub source: InsertSource,
    /// `ON CONFLICT ...` / `ON DUPLICATE KEY UPDATE ...`.
    pub on_conflict: Option<OnConflict>,
    /// RETURNING clause.
    pub returning: Vec<ResultColumn>,
    pub span: Span,
}

/// Source of rows for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `VALUES ...` or a query.
    Query(Box<SelectStatement>),
    /// `DEFAULT VALUES`
    DefaultValues,
}

/// An upsert clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    /// Conflict target columns (empty for MySQL and target-less clauses).
    pub target: Vec<Ident>,
    pub action: ConflictAction,
}

/// Upsert action: DO NOTHING or DO UPDATE SET ...
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    Nothing,
    Update {
        assignments: Vec<Assignment>,
        where_clause: Option<Expr>,
    },
}

// ---------------------------------------------------------------------------
// UPDATE statement
// ---------------------------------------------------------------------------

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub with: Option<WithClause>,
    /// Target table(s); MySQL allows a join here.
    pub target: FromClause,
    pub assignments: Vec<Assignment>,
    /// Optional FROM clause.
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub returning: Vec<ResultColumn>,
    pub span: Span,
}

/// A SET assignment: `col = expr` or `(a, b) = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column(s).
    pub columns: Vec<ColumnRef>,
    pub value: Expr,
}

// ---------------------------------------------------------------------------
// DELETE statement
// ---------------------------------------------------------------------------

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub with: Option<WithClause>,
    /// Target table.
    pub table: ObjectName,
    pub alias: Option<TableAlias>,
    /// `USING` (PostgreSQL) or a second `FROM` (T-SQL).
    pub using: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub returning: Vec<ResultColumn>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// MERGE statement
// ---------------------------------------------------------------------------

/// `MERGE INTO target USING source ON cond WHEN ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStatement {
    pub with: Option<WithClause>,
    pub target: ObjectName,
    pub target_alias: Option<TableAlias>,
    pub source: TableOrSubquery,
    pub on: Expr,
    pub clauses: Vec<MergeClause>,
    pub span: Span,
}

/// One `WHEN [NOT] MATCHED [BY SOURCE|TARGET] [AND cond] THEN action` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub matched: bool,
    /// `NOT MATCHED BY SOURCE`.
    pub by_source: bool,
    pub condition: Option<Expr>,
    pub action: MergeAction,
}

/// The action of a MERGE arm.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAction {
    Update(Vec<Assignment>),
    Delete,
    /// `INSERT [(cols)] VALUES (...)`; `values` is `None` for `INSERT ROW`.
    Insert {
        columns: Vec<Ident>,
        values: Option<Vec<Expr>>,
    },
}

// ---------------------------------------------------------------------------
// DDL: CREATE TABLE / VIEW
// ---------------------------------------------------------------------------

/// What a CREATE statement creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatedObject {
    Table,
    View,
    MaterializedView,
}

/// `CREATE [OR REPLACE] [TEMP] TABLE|VIEW [IF NOT EXISTS] name ...`.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CreateTableStatement {
    pub or_replace: bool,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub object: CreatedObject,
    pub name: ObjectName,
    /// Column definitions (for tables) or the view's column list.
    pub columns: Vec<ColumnDef>,
    /// `LIKE source` / `CLONE source`.
    pub like: Option<ObjectName>,
    /// `AS query`.
    pub query: Option<Box<SelectStatement>>,
    pub span: Span,
}

/// A column definition; constraints are not modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Ident,
    pub data_type: Option<TypeName>,
}

// ---------------------------------------------------------------------------
// Skimmed statements
// ---------------------------------------------------------------------------

/// Kinds of [`OtherStatement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherKind {
    DropTable,
    DropView,
    Truncate,
    AlterTable,
    Begin,
    Commit,
    Rollback,
}

impl OtherKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DropTable => "DROP TABLE",
            Self::DropView => "DROP VIEW",
            Self::Truncate => "TRUNCATE",
            Self::AlterTable => "ALTER TABLE",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
        }
    }
}

/// A recognized statement whose only modeled content is its table names.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherStatement {
    pub kind: OtherKind,
    pub tables: Vec<ObjectName>,
    pub span: Span,
}

/// A recognized statement kind that is not modeled at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedStatement {
    /// Leading keyword, uppercased.
    pub keyword: String,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(value: &str, start: u32) -> Ident {
        #[allow(clippy::cast_possible_truncation)]
        let end = start + value.len() as u32;
        Ident::new(value, Span::new(start, end))
    }

    #[test]
    fn span_merge_and_len() {
        let a = Span::new(3, 7);
        let b = Span::new(10, 12);
        assert_eq!(a.merge(b), Span::new(3, 12));
        assert_eq!(b.merge(a), Span::new(3, 12));
        assert_eq!(a.len(), 4);
        assert!(Span::ZERO.is_empty());
        assert_eq!(format!("{a:?}"), "3..7");
    }

    #[test]
    fn span_text() {
        let src = "SELECT a FROM t";
        assert_eq!(Span::new(7, 8).text(src), "a");
        assert_eq!(Span::new(14, 99).text(src), "");
    }

    #[test]
    fn object_name_qualified() {
        let name = ObjectName::from_parts([ident("raw", 5), ident("orders", 9)]);
        assert_eq!(name.qualified(), "raw.orders");
        assert_eq!(name.span, Span::new(5, 15));
        assert_eq!(name.name().map(|i| i.value.as_str()), Some("orders"));
        assert!(name.is_qualified());
        assert_eq!(name.to_string(), "raw.orders");
    }

    #[test]
    fn object_name_bare() {
        let name = ObjectName::bare(ident("t", 0));
        assert!(!name.is_qualified());
        assert_eq!(name.qualified(), "t");
    }

    #[test]
    fn column_ref_display() {
        let col = ColumnRef::qualified(ObjectName::bare(ident("o", 0)), ident("id", 2));
        assert_eq!(col.to_string(), "o.id");
        assert_eq!(ColumnRef::bare(ident("id", 0)).to_string(), "id");
    }

    #[test]
    fn expr_span_and_as_column() {
        let col = Expr::Column(ColumnRef::bare(ident("a", 7)), Span::new(7, 8));
        assert_eq!(col.span(), Span::new(7, 8));
        assert!(col.as_column().is_some());
        let lit = Expr::Literal(Literal::Number("1".to_owned()), Span::new(0, 1));
        assert!(lit.as_column().is_none());
    }

    #[test]
    fn select_body_cores() {
        let core = |s| SelectCore::Values(vec![], Span::new(s, s + 1));
        let body = SelectBody {
            select: core(0),
            compounds: vec![(CompoundOp::UnionAll, core(5)), (CompoundOp::Except, core(9))],
        };
        let starts: Vec<u32> = body.cores().map(|c| c.span().start).collect();
        assert_eq!(starts, vec![0, 5, 9]);
    }

    #[test]
    fn statement_kind_names() {
        let stmt = Statement::Other(OtherStatement {
            kind: OtherKind::DropTable,
            tables: vec![],
            span: Span::ZERO,
        });
        assert_eq!(stmt.kind_name(), "DROP TABLE");
        let stmt = Statement::Unsupported(UnsupportedStatement {
            keyword: "GRANT".to_owned(),
            span: Span::new(0, 5),
        });
        assert_eq!(stmt.kind_name(), "GRANT");
        assert_eq!(stmt.span(), Span::new(0, 5));
    }
}
