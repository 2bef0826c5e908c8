// SQL Parser
//
// Hand-written recursive descent parser for statements and clauses.
// Expression parsing lives in expr.rs. The parser never recovers: the first
// syntax error ends the parse and no partial tree is returned.

use std::fmt;

use sqlscope_ast::{
    Assignment, ColumnDef, ColumnRef, CompoundOp, ConflictAction, CreateTableStatement,
    CreatedObject, Cte, CteMaterialized, DeleteStatement, Distinctness, Expr, FromClause, Ident,
    InsertSource, InsertStatement, JoinClause, JoinConstraint, JoinKind, JoinType, LimitClause,
    Literal, LockMode, LockWait, LockingClause, MergeAction, MergeClause, MergeStatement,
    NullsOrder, ObjectName, OnConflict, OrderingTerm, OtherKind, OtherStatement, ResultColumn,
    Select, SelectBody, SelectCore, SelectInto, SelectStatement, SortDirection, Span, Statement,
    TableAlias, TableOrSubquery, TopClause, UnsupportedStatement, UpdateStatement, WithClause,
};
use sqlscope_error::SqlError;

use crate::dialect::Dialect;
use crate::lexer::{LexError, Lexer};
use crate::token::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A syntax error: what the grammar expected and the token it found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub span: Span,
    pub line: u32,
    pub col: u32,
}

impl ParseError {
    #[must_use]
    pub(crate) fn at(expected: impl Into<String>, token: &Token) -> Self {
        Self {
            expected: expected.into(),
            found: token.kind.describe(),
            span: token.span,
            line: token.line,
            col: token.col,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: expected {}, found {}",
            self.line, self.col, self.expected, self.found
        )
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for SqlError {
    fn from(err: ParseError) -> Self {
        Self::Parse {
            offset: err.span.start_usize(),
            line: err.line,
            col: err.col,
            expected: err.expected,
            found: err.found,
        }
    }
}

/// Leading words of statements that are recognized but not modeled.
const UNSUPPORTED_LEADERS: &[&str] = &[
    "GRANT", "REVOKE", "USE", "SHOW", "DESCRIBE", "EXPLAIN", "CALL", "EXEC", "EXECUTE", "DECLARE",
    "COPY", "VACUUM", "ANALYZE", "COMMENT", "OPTIMIZE", "REFRESH", "MSCK", "CACHE", "UNCACHE",
];

/// Deepest nesting of expressions, subqueries, and parenthesized joins the
/// parser descends into before rejecting the input.
pub const MAX_NESTING_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser<'a> {
    pub(crate) src: &'a str,
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) dialect: &'a Dialect,
    depth: usize,
    eof: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser over an already tokenized `source`.
    #[must_use]
    pub fn new(source: &'a str, tokens: Vec<Token>, dialect: &'a Dialect) -> Self {
        let end = u32::try_from(source.len()).unwrap_or(u32::MAX);
        let eof = tokens
            .last()
            .filter(|t| t.kind == TokenKind::Eof)
            .cloned()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
                line: 0,
                col: 0,
            });
        Self {
            src: source,
            tokens,
            pos: 0,
            dialect,
            depth: 0,
            eof,
        }
    }

    /// Tokenize `sql` and create a parser over it.
    pub fn from_sql(sql: &'a str, dialect: &'a Dialect) -> Result<Self, LexError> {
        let tokens = Lexer::tokenize(sql, dialect)?;
        Ok(Self::new(sql, tokens, dialect))
    }

    /// Parse every statement in the input. Empty statements (`;;`) are
    /// skipped; a trailing separator is allowed.
    pub fn parse_all(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.at_eof() {
                break;
            }
            stmts.push(self.parse_statement()?);
            if !self.at_eof() && !self.check(&TokenKind::Semicolon) {
                return Err(self.err_expected("';' or end of input"));
            }
        }
        tracing::debug!(target: "sqlscope.parse", statements = stmts.len(), "parsed");
        Ok(stmts)
    }

    /// Parse one statement, without its separator.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::KwSelect | TokenKind::KwValues | TokenKind::LeftParen => {
                Ok(Statement::Select(self.parse_query()?))
            }
            TokenKind::KwWith => self.parse_with_leading(),
            TokenKind::KwInsert => self.parse_insert(None),
            TokenKind::KwReplace if self.peek_nth(1) == &TokenKind::KwInto => {
                self.parse_insert(None)
            }
            TokenKind::KwUpdate => self.parse_update(None),
            TokenKind::KwDelete => self.parse_delete(None),
            TokenKind::KwMerge => self.parse_merge(None),
            TokenKind::KwCreate => self.parse_create(),
            TokenKind::KwDrop => self.parse_drop(),
            TokenKind::KwTruncate => self.parse_truncate(),
            TokenKind::KwAlter => self.parse_alter(),
            TokenKind::KwBegin | TokenKind::KwStart => Ok(self.skim_other(OtherKind::Begin, start)),
            TokenKind::KwCommit | TokenKind::KwEnd => Ok(self.skim_other(OtherKind::Commit, start)),
            TokenKind::KwRollback => Ok(self.skim_other(OtherKind::Rollback, start)),
            TokenKind::KwSet => Ok(self.skip_unsupported("SET".to_owned(), start)),
            TokenKind::Id(word) => {
                let upper = word.to_ascii_uppercase();
                if UNSUPPORTED_LEADERS.contains(&upper.as_str()) {
                    Ok(self.skip_unsupported(upper, start))
                } else {
                    Err(self.err_expected("statement"))
                }
            }
            TokenKind::KwDesc => Ok(self.skip_unsupported("DESC".to_owned(), start)),
            _ => Err(self.err_expected("statement")),
        }
    }

    // -----------------------------------------------------------------------
    // Token navigation
    // -----------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    pub(crate) fn check_kw(&self, kw: &TokenKind) -> bool {
        self.peek() == kw
    }

    /// Whether the current token is the bare (non-keyword) word `word`.
    pub(crate) fn check_word(&self, word: &str) -> bool {
        is_word(self.peek(), word)
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_kw(&mut self, kw: &TokenKind) -> bool {
        if self.peek() == kw {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: &TokenKind) -> Result<Span, ParseError> {
        if self.peek() == kw {
            Ok(self.advance().span)
        } else {
            Err(self.err_expected(&kw.describe()))
        }
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.err_expected(&kind.describe()))
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(Span::ZERO, |t| t.span)
    }

    /// Span from `start` through the most recently consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.merge(self.prev_span())
    }

    pub(crate) fn err_expected(&self, what: &str) -> ParseError {
        ParseError::at(what, self.current())
    }

    /// Run `f` one nesting level deeper, failing at the current token once
    /// [`MAX_NESTING_DEPTH`] levels are open.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            tracing::debug!(target: "sqlscope.parse", depth = self.depth, "nesting limit hit");
            return Err(self.err_expected("shallower nesting"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Whether a query (possibly behind opening parentheses) starts `n`
    /// tokens ahead.
    pub(crate) fn query_follows(&self, n: usize) -> bool {
        let mut i = n;
        while self.peek_nth(i) == &TokenKind::LeftParen {
            i += 1;
        }
        self.peek_nth(i).is_query_start()
    }

    /// Consume a balanced `( ... )` group starting at the current token.
    pub(crate) fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                TokenKind::Eof => return Err(self.err_expected("')'")),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip to the top-level end of the current statement.
    fn skip_statement_rest(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    // -----------------------------------------------------------------------
    // Identifiers and names
    // -----------------------------------------------------------------------

    /// Whether a token can stand as a bare identifier in this dialect.
    pub(crate) fn is_ident_token(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Id(_) | TokenKind::QuotedId(..) => true,
            k => k.is_keyword() && !self.dialect.is_reserved(k),
        }
    }

    /// Build an identifier from a token without checking reservation.
    fn ident_from_token(&self, tok: &Token) -> Option<Ident> {
        match &tok.kind {
            TokenKind::Id(v) => Some(Ident::new(v.clone(), tok.span)),
            TokenKind::QuotedId(v, q) => Some(Ident::quoted(v.clone(), *q, tok.span)),
            k if k.is_keyword() => Some(Ident::new(tok.text(self.src), tok.span)),
            _ => None,
        }
    }

    pub(crate) fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        if !self.is_ident_token(self.peek()) {
            return Err(self.err_expected("identifier"));
        }
        match self.ident_from_token(self.current()) {
            Some(ident) => {
                self.advance();
                Ok(ident)
            }
            None => Err(self.err_expected("identifier")),
        }
    }

    /// A name part after `.`; any keyword is accepted there.
    fn parse_name_part(&mut self) -> Result<Ident, ParseError> {
        match self.ident_from_token(self.current()) {
            Some(ident) => {
                self.advance();
                Ok(ident)
            }
            None => Err(self.err_expected("identifier")),
        }
    }

    fn push_name_part(&self, parts: &mut Vec<Ident>, ident: Ident) {
        if self.dialect.dotted_quoted_names && ident.quote.is_some() && ident.value.contains('.')
        {
            for piece in ident.value.split('.') {
                parts.push(Ident {
                    value: piece.to_owned(),
                    quote: ident.quote,
                    span: ident.span,
                });
            }
        } else {
            parts.push(ident);
        }
    }

    /// Whether `.` at `n` continues a dotted name.
    pub(crate) fn name_continues(&self, n: usize) -> bool {
        let next = self.peek_nth(n + 1);
        self.peek_nth(n) == &TokenKind::Dot
            && (matches!(next, TokenKind::Id(_) | TokenKind::QuotedId(..)) || next.is_keyword())
    }

    /// Parse `part[.part]*`, starting from an already consumed first part.
    pub(crate) fn parse_object_name_from(&mut self, first: Ident) -> Result<ObjectName, ParseError> {
        let mut parts = Vec::new();
        self.push_name_part(&mut parts, first);
        while self.name_continues(0) {
            self.advance();
            let part = self.parse_name_part()?;
            self.push_name_part(&mut parts, part);
        }
        Ok(ObjectName::from_parts(parts))
    }

    pub(crate) fn parse_object_name(&mut self) -> Result<ObjectName, ParseError> {
        let first = self.parse_ident()?;
        self.parse_object_name_from(first)
    }

    /// Whether the current token may start an implicit (AS-less) alias.
    fn implicit_alias_ahead(&self) -> bool {
        let kind = self.peek();
        if !self.is_ident_token(kind) {
            return false;
        }
        match kind {
            TokenKind::KwQualify | TokenKind::KwReturning | TokenKind::KwWindow => false,
            _ if is_word(kind, "LOCK") => self.peek_nth(1) != &TokenKind::KwIn,
            TokenKind::KwMinus => !self.query_follows(1),
            TokenKind::KwSemi | TokenKind::KwAnti => self.peek_nth(1) != &TokenKind::KwJoin,
            TokenKind::KwStart => self.peek_nth(1) != &TokenKind::KwWith,
            _ => true,
        }
    }

    /// `[AS] alias`. A string literal is accepted after `AS`.
    pub(crate) fn try_alias(&mut self) -> Result<Option<Ident>, ParseError> {
        if self.eat_kw(&TokenKind::KwAs) {
            if let TokenKind::String { value, .. } = self.peek().clone() {
                let span = self.advance().span;
                return Ok(Some(Ident::quoted(value, '\'', span)));
            }
            return Ok(Some(self.parse_ident()?));
        }
        if self.implicit_alias_ahead() {
            return Ok(Some(self.parse_ident()?));
        }
        Ok(None)
    }

    /// `[AS] alias [(col, ...)]`.
    fn try_table_alias(&mut self) -> Result<Option<TableAlias>, ParseError> {
        let Some(name) = self.try_alias()? else {
            return Ok(None);
        };
        let mut alias = TableAlias::new(name);
        if self.check(&TokenKind::LeftParen) && self.is_ident_token(self.peek_nth(1)) {
            self.advance();
            alias.columns = self.parse_comma_sep(Self::parse_ident)?;
            self.expect_token(&TokenKind::RightParen)?;
        }
        Ok(Some(alias))
    }

    pub(crate) fn parse_comma_sep<T>(
        &mut self,
        f: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut v = vec![f(self)?];
        while self.eat(&TokenKind::Comma) {
            v.push(f(self)?);
        }
        Ok(v)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<Ident>, ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let idents = self.parse_comma_sep(Self::parse_ident)?;
        self.expect_token(&TokenKind::RightParen)?;
        Ok(idents)
    }

    // -----------------------------------------------------------------------
    // WITH ... (SELECT | INSERT | UPDATE | DELETE | MERGE)
    // -----------------------------------------------------------------------

    fn parse_with_leading(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        let with = self.parse_with_clause()?;
        match self.peek() {
            TokenKind::KwInsert => self.parse_insert(Some(with)),
            TokenKind::KwUpdate => self.parse_update(Some(with)),
            TokenKind::KwDelete => self.parse_delete(Some(with)),
            TokenKind::KwMerge => self.parse_merge(Some(with)),
            _ => {
                let mut query = self.parse_query_after_with(Some(with))?;
                query.span = self.span_from(start);
                Ok(Statement::Select(query))
            }
        }
    }

    fn parse_with_clause(&mut self) -> Result<WithClause, ParseError> {
        let start = self.expect_kw(&TokenKind::KwWith)?;
        let recursive = self.eat_kw(&TokenKind::KwRecursive);
        let ctes = self.parse_comma_sep(Self::parse_cte)?;
        Ok(WithClause {
            recursive,
            ctes,
            span: self.span_from(start),
        })
    }

    fn parse_cte(&mut self) -> Result<Cte, ParseError> {
        let name = self.parse_ident()?;
        let start = name.span;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_ident_list()?
        } else {
            vec![]
        };
        self.expect_kw(&TokenKind::KwAs)?;
        let materialized = if self.check_kw(&TokenKind::KwNot)
            && self.peek_nth(1) == &TokenKind::KwMaterialized
        {
            self.advance();
            self.advance();
            Some(CteMaterialized::NotMaterialized)
        } else if self.eat_kw(&TokenKind::KwMaterialized) {
            Some(CteMaterialized::Materialized)
        } else {
            None
        };
        self.expect_token(&TokenKind::LeftParen)?;
        let query = self.parse_query()?;
        self.expect_token(&TokenKind::RightParen)?;
        Ok(Cte {
            name,
            columns,
            materialized,
            query: Box::new(query),
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    /// Parse `[WITH ...] body [ORDER BY ...] [LIMIT ...]`.
    pub(crate) fn parse_query(&mut self) -> Result<SelectStatement, ParseError> {
        self.nested(Self::parse_query_unguarded)
    }

    fn parse_query_unguarded(&mut self) -> Result<SelectStatement, ParseError> {
        let start = self.current_span();
        let with = if self.check_kw(&TokenKind::KwWith) {
            Some(self.parse_with_clause()?)
        } else {
            None
        };
        let mut query = self.parse_query_after_with(with)?;
        query.span = self.span_from(start);
        Ok(query)
    }

    fn parse_query_after_with(
        &mut self,
        with: Option<WithClause>,
    ) -> Result<SelectStatement, ParseError> {
        let start = self.current_span();
        let body = self.parse_select_body()?;
        let order_by = self.parse_order_by()?;
        let mut limit = self.parse_limit()?;
        let locking = self.parse_locking()?;
        if limit.is_none() && !locking.is_empty() {
            limit = self.parse_limit()?;
        }
        Ok(SelectStatement {
            with,
            body,
            order_by,
            limit,
            locking,
            span: self.span_from(start),
        })
    }

    fn parse_select_body(&mut self) -> Result<SelectBody, ParseError> {
        let select = self.parse_select_core()?;
        let mut compounds = Vec::new();
        while let Some(op) = self.try_compound_op() {
            compounds.push((op, self.parse_select_core()?));
        }
        Ok(SelectBody { select, compounds })
    }

    fn try_compound_op(&mut self) -> Option<CompoundOp> {
        let (plain, all) = match self.peek() {
            TokenKind::KwUnion => (CompoundOp::Union, CompoundOp::UnionAll),
            TokenKind::KwIntersect => (CompoundOp::Intersect, CompoundOp::IntersectAll),
            TokenKind::KwExcept => (CompoundOp::Except, CompoundOp::ExceptAll),
            TokenKind::KwMinus if self.query_follows(1) => {
                (CompoundOp::Except, CompoundOp::ExceptAll)
            }
            _ => return None,
        };
        self.advance();
        if self.eat_kw(&TokenKind::KwAll) {
            return Some(all);
        }
        let _ = self.eat_kw(&TokenKind::KwDistinct);
        Some(plain)
    }

    fn parse_select_core(&mut self) -> Result<SelectCore, ParseError> {
        match self.peek() {
            TokenKind::KwSelect => Ok(SelectCore::Select(Box::new(self.parse_select()?))),
            TokenKind::KwValues => self.parse_values_core(),
            TokenKind::LeftParen if self.query_follows(1) => {
                let start = self.advance().span;
                let inner = self.parse_query()?;
                self.expect_token(&TokenKind::RightParen)?;
                Ok(SelectCore::Nested(Box::new(inner), self.span_from(start)))
            }
            _ => Err(self.err_expected("SELECT")),
        }
    }

    fn parse_select(&mut self) -> Result<Select, ParseError> {
        let start = self.expect_kw(&TokenKind::KwSelect)?;
        let distinct = if self.eat_kw(&TokenKind::KwDistinct) {
            if self.eat_kw(&TokenKind::KwOn) {
                self.expect_token(&TokenKind::LeftParen)?;
                let exprs = self.parse_comma_sep(Self::parse_expr)?;
                self.expect_token(&TokenKind::RightParen)?;
                Distinctness::DistinctOn(exprs)
            } else {
                Distinctness::Distinct
            }
        } else {
            let _ = self.eat_kw(&TokenKind::KwAll);
            Distinctness::All
        };
        let head_span = self.span_from(start);
        let top = self.parse_top()?;
        let columns = self.parse_comma_sep(Self::parse_result_column)?;
        let into = self.parse_select_into()?;
        let from = if self.eat_kw(&TokenKind::KwFrom) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };
        let where_clause = if self.eat_kw(&TokenKind::KwWhere) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let group_by = self.parse_group_by()?;
        let having = if self.eat_kw(&TokenKind::KwHaving) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let mut qualify = None;
        let mut windows = Vec::new();
        loop {
            if qualify.is_none() && self.eat_kw(&TokenKind::KwQualify) {
                qualify = Some(self.parse_expr()?);
            } else if windows.is_empty() && self.eat_kw(&TokenKind::KwWindow) {
                windows = self.parse_comma_sep(Self::parse_window_def)?;
            } else {
                break;
            }
        }
        Ok(Select {
            distinct,
            top,
            columns,
            from,
            where_clause,
            group_by,
            having,
            qualify,
            windows,
            into,
            head_span,
            span: self.span_from(start),
        })
    }

    /// `TOP n [PERCENT] [WITH TIES]` or `TOP (expr) ...`.
    fn parse_top(&mut self) -> Result<Option<TopClause>, ParseError> {
        if !self.check_kw(&TokenKind::KwTop) || !self.dialect.reserves("TOP") {
            return Ok(None);
        }
        let start = self.advance().span;
        let count = if self.eat(&TokenKind::LeftParen) {
            let expr = self.parse_expr()?;
            self.expect_token(&TokenKind::RightParen)?;
            expr
        } else {
            let tok = self.advance();
            match tok.kind {
                TokenKind::Number(n) => Expr::Literal(Literal::Number(n), tok.span),
                TokenKind::Param(p) => Expr::Placeholder(p, tok.span),
                _ => return Err(ParseError::at("row count after TOP", &tok)),
            }
        };
        let percent = self.eat_kw(&TokenKind::KwPercent);
        let with_ties = if self.check_kw(&TokenKind::KwWith) && self.peek_nth(1) == &TokenKind::KwTies
        {
            self.advance();
            self.advance();
            true
        } else {
            false
        };
        Ok(Some(TopClause {
            count,
            percent,
            with_ties,
            span: self.span_from(start),
        }))
    }

    fn parse_values_core(&mut self) -> Result<SelectCore, ParseError> {
        let start = self.expect_kw(&TokenKind::KwValues)?;
        let mut rows = Vec::new();
        loop {
            if self.eat_kw(&TokenKind::KwRow) && !self.check(&TokenKind::LeftParen) {
                return Err(self.err_expected("'('"));
            }
            self.expect_token(&TokenKind::LeftParen)?;
            let row = if self.check(&TokenKind::RightParen) {
                vec![]
            } else {
                self.parse_comma_sep(Self::parse_expr)?
            };
            self.expect_token(&TokenKind::RightParen)?;
            rows.push(row);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(SelectCore::Values(rows, self.span_from(start)))
    }

    /// Length of a `name.name.*` prefix at the current position, counted in
    /// tokens up to and including the `*`.
    fn qualified_star_len(&self) -> Option<usize> {
        if !self.is_ident_token(self.peek()) {
            return None;
        }
        let mut i = 0;
        loop {
            if self.peek_nth(i + 1) != &TokenKind::Dot {
                return None;
            }
            match self.peek_nth(i + 2) {
                TokenKind::Star => return Some(i + 3),
                k if matches!(k, TokenKind::Id(_) | TokenKind::QuotedId(..)) || k.is_keyword() => {
                    i += 2;
                }
                _ => return None,
            }
        }
    }

    /// `* EXCEPT (a, b)` / `* EXCLUDE (a, b)` / `* EXCLUDE a`.
    fn parse_star_exclusions(&mut self) -> Result<Vec<Ident>, ParseError> {
        if self.check_kw(&TokenKind::KwExcept)
            && self.peek_nth(1) == &TokenKind::LeftParen
            && !self.query_follows(1)
        {
            self.advance();
            return self.parse_ident_list();
        }
        if self.eat_word("EXCLUDE") {
            if self.check(&TokenKind::LeftParen) {
                return self.parse_ident_list();
            }
            return Ok(vec![self.parse_ident()?]);
        }
        Ok(vec![])
    }

    pub(crate) fn parse_result_column(&mut self) -> Result<ResultColumn, ParseError> {
        if self.check(&TokenKind::Star) {
            let start = self.advance().span;
            let except = self.parse_star_exclusions()?;
            return Ok(ResultColumn::Star {
                except,
                span: self.span_from(start),
            });
        }
        if self.qualified_star_len().is_some() {
            let start = self.current_span();
            let qualifier = self.parse_object_name()?;
            self.expect_token(&TokenKind::Dot)?;
            self.expect_token(&TokenKind::Star)?;
            let except = self.parse_star_exclusions()?;
            return Ok(ResultColumn::TableStar {
                qualifier,
                except,
                span: self.span_from(start),
            });
        }
        let expr = self.parse_expr()?;
        let alias = self.try_alias()?;
        Ok(ResultColumn::Expr { expr, alias })
    }

    fn parse_group_by(&mut self) -> Result<Vec<Expr>, ParseError> {
        if !self.check_kw(&TokenKind::KwGroup) {
            return Ok(vec![]);
        }
        self.advance();
        self.expect_kw(&TokenKind::KwBy)?;
        if self.eat_kw(&TokenKind::KwAll) {
            return Ok(vec![]);
        }
        let items = self.parse_comma_sep(Self::parse_group_item)?;
        if self.check_kw(&TokenKind::KwWith)
            && (is_word(self.peek_nth(1), "ROLLUP") || is_word(self.peek_nth(1), "CUBE"))
        {
            self.advance();
            self.advance();
        }
        Ok(items)
    }

    /// A GROUP BY item; `GROUPING SETS (...)` becomes a call whose
    /// arguments are the sets.
    fn parse_group_item(&mut self) -> Result<Expr, ParseError> {
        if !(self.check_word("GROUPING") && is_word(self.peek_nth(1), "SETS")) {
            return self.parse_expr();
        }
        let start = self.advance().span;
        let sets_span = self.advance().span;
        self.expect_token(&TokenKind::LeftParen)?;
        let mut args = Vec::new();
        loop {
            let set_start = self.current_span();
            let value = if self.eat(&TokenKind::LeftParen) {
                let exprs = if self.check(&TokenKind::RightParen) {
                    vec![]
                } else {
                    self.parse_comma_sep(Self::parse_expr)?
                };
                self.expect_token(&TokenKind::RightParen)?;
                Expr::RowValue(exprs, self.span_from(set_start))
            } else {
                self.parse_expr()?
            };
            args.push(sqlscope_ast::FunctionArg { name: None, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RightParen)?;
        let span = self.span_from(start);
        Ok(Expr::FunctionCall(Box::new(sqlscope_ast::FunctionCall {
            name: ObjectName::bare(Ident::new("GROUPING SETS", start.merge(sets_span))),
            args,
            distinct: false,
            order_by: vec![],
            filter: None,
            over: None,
            span,
        })))
    }

    // -----------------------------------------------------------------------
    // FROM clause & JOINs
    // -----------------------------------------------------------------------

    pub(crate) fn parse_from_clause(&mut self) -> Result<FromClause, ParseError> {
        let source = self.parse_table_or_subquery()?;
        let mut joins = Vec::new();
        loop {
            if let Some(join_type) = self.try_join_type()? {
                let table = self.parse_table_or_subquery()?;
                let constraint = self.parse_join_constraint()?;
                joins.push(JoinClause {
                    join_type,
                    table,
                    constraint,
                });
            } else if self.eat(&TokenKind::Comma) {
                let table = self.parse_table_or_subquery()?;
                joins.push(JoinClause {
                    join_type: JoinType {
                        natural: false,
                        comma: true,
                        kind: JoinKind::Cross,
                    },
                    table,
                    constraint: None,
                });
            } else {
                break;
            }
        }
        Ok(FromClause { source, joins })
    }

    fn parse_table_or_subquery(&mut self) -> Result<TableOrSubquery, ParseError> {
        let start = self.current_span();
        let lateral = self.eat_kw(&TokenKind::KwLateral);

        if self.check(&TokenKind::LeftParen) {
            if self.query_follows(1) {
                let saved = self.pos;
                match self.parse_derived_table(start, lateral) {
                    Ok(table) => return Ok(table),
                    Err(err) if self.peek_nth_from(saved, 1) != &TokenKind::LeftParen => {
                        return Err(err);
                    }
                    Err(_) => self.pos = saved,
                }
            }
            self.advance();
            let inner = self.nested(Self::parse_from_clause)?;
            self.expect_token(&TokenKind::RightParen)?;
            let _ = self.try_table_alias()?;
            return Ok(TableOrSubquery::ParenJoin(
                Box::new(inner),
                self.span_from(start),
            ));
        }

        // Snowflake `TABLE(fn(...))`.
        if self.check_kw(&TokenKind::KwTable) && self.peek_nth(1) == &TokenKind::LeftParen {
            let kw = self.advance();
            let name = ObjectName::bare(Ident::new(kw.text(self.src), kw.span));
            return self.parse_table_function(name, start, lateral);
        }

        let first = match self.peek() {
            TokenKind::KwUnnest => {
                let tok = self.advance();
                Ident::new(tok.text(self.src), tok.span)
            }
            _ => self.parse_ident()?,
        };
        let name = self.parse_object_name_from(first)?;
        if self.check(&TokenKind::LeftParen) {
            return self.parse_table_function(name, start, lateral);
        }
        let alias = self.try_table_alias()?;
        self.skip_table_hints()?;
        Ok(TableOrSubquery::Table {
            name,
            alias,
            span: self.span_from(start),
        })
    }

    fn peek_nth_from(&self, pos: usize, n: usize) -> &TokenKind {
        self.tokens.get(pos + n).map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn parse_derived_table(
        &mut self,
        start: Span,
        lateral: bool,
    ) -> Result<TableOrSubquery, ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let query = self.parse_query()?;
        self.expect_token(&TokenKind::RightParen)?;
        let alias = self.try_table_alias()?;
        Ok(TableOrSubquery::Subquery {
            query: Box::new(query),
            alias,
            lateral,
            span: self.span_from(start),
        })
    }

    fn parse_table_function(
        &mut self,
        name: ObjectName,
        start: Span,
        lateral: bool,
    ) -> Result<TableOrSubquery, ParseError> {
        let args = self.parse_function_args_list()?;
        self.skip_with_offset()?;
        let alias = self.try_table_alias()?;
        self.skip_with_offset()?;
        Ok(TableOrSubquery::TableFunction {
            name,
            args,
            alias,
            lateral,
            span: self.span_from(start),
        })
    }

    /// BigQuery `UNNEST(arr) [AS x] WITH OFFSET [AS pos]`.
    fn skip_with_offset(&mut self) -> Result<(), ParseError> {
        if self.check_kw(&TokenKind::KwWith) && self.peek_nth(1) == &TokenKind::KwOffset {
            self.advance();
            self.advance();
            let _ = self.try_alias()?;
        }
        Ok(())
    }

    /// T-SQL `WITH (NOLOCK, ...)` after a table reference.
    fn skip_table_hints(&mut self) -> Result<(), ParseError> {
        if self.check_kw(&TokenKind::KwWith)
            && self.peek_nth(1) == &TokenKind::LeftParen
            && !self.query_follows(2)
        {
            self.advance();
            self.skip_parenthesized()?;
        }
        Ok(())
    }

    fn try_join_type(&mut self) -> Result<Option<JoinType>, ParseError> {
        let natural = self.eat_kw(&TokenKind::KwNatural);
        let kind = match self.peek() {
            TokenKind::KwJoin => {
                self.advance();
                Some(JoinKind::Inner)
            }
            TokenKind::KwInner => {
                self.advance();
                self.expect_kw(&TokenKind::KwJoin)?;
                Some(JoinKind::Inner)
            }
            TokenKind::KwCross => {
                self.advance();
                if self.eat_kw(&TokenKind::KwApply) {
                    Some(JoinKind::CrossApply)
                } else {
                    self.expect_kw(&TokenKind::KwJoin)?;
                    Some(JoinKind::Cross)
                }
            }
            TokenKind::KwOuter if self.peek_nth(1) == &TokenKind::KwApply => {
                self.advance();
                self.advance();
                Some(JoinKind::OuterApply)
            }
            TokenKind::KwLeft => {
                self.advance();
                let kind = if self.eat_kw(&TokenKind::KwSemi) {
                    JoinKind::LeftSemi
                } else if self.eat_kw(&TokenKind::KwAnti) {
                    JoinKind::LeftAnti
                } else {
                    let _ = self.eat_kw(&TokenKind::KwOuter);
                    JoinKind::Left
                };
                self.expect_kw(&TokenKind::KwJoin)?;
                Some(kind)
            }
            TokenKind::KwSemi | TokenKind::KwAnti
                if self.peek_nth(1) == &TokenKind::KwJoin =>
            {
                let kind = if self.advance().kind == TokenKind::KwSemi {
                    JoinKind::LeftSemi
                } else {
                    JoinKind::LeftAnti
                };
                self.advance();
                Some(kind)
            }
            TokenKind::KwRight => {
                self.advance();
                let _ = self.eat_kw(&TokenKind::KwOuter);
                self.expect_kw(&TokenKind::KwJoin)?;
                Some(JoinKind::Right)
            }
            TokenKind::KwFull => {
                self.advance();
                let _ = self.eat_kw(&TokenKind::KwOuter);
                self.expect_kw(&TokenKind::KwJoin)?;
                Some(JoinKind::Full)
            }
            _ => None,
        };
        match kind {
            Some(kind) => Ok(Some(JoinType {
                natural,
                comma: false,
                kind,
            })),
            None if natural => Err(self.err_expected("JOIN after NATURAL")),
            None => Ok(None),
        }
    }

    fn parse_join_constraint(&mut self) -> Result<Option<JoinConstraint>, ParseError> {
        if self.eat_kw(&TokenKind::KwOn) {
            Ok(Some(JoinConstraint::On(self.parse_expr()?)))
        } else if self.eat_kw(&TokenKind::KwUsing) {
            Ok(Some(JoinConstraint::Using(self.parse_ident_list()?)))
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // ORDER BY / LIMIT
    // -----------------------------------------------------------------------

    fn parse_order_by(&mut self) -> Result<Vec<OrderingTerm>, ParseError> {
        if self.eat_kw(&TokenKind::KwOrder) {
            self.expect_kw(&TokenKind::KwBy)?;
            self.parse_comma_sep(Self::parse_ordering_term)
        } else {
            Ok(vec![])
        }
    }

    pub(crate) fn parse_ordering_term(&mut self) -> Result<OrderingTerm, ParseError> {
        let expr = self.parse_expr()?;
        let direction = if self.eat_kw(&TokenKind::KwAsc) {
            Some(SortDirection::Asc)
        } else if self.eat_kw(&TokenKind::KwDesc) {
            Some(SortDirection::Desc)
        } else {
            None
        };
        let nulls = if self.eat_kw(&TokenKind::KwNulls) {
            if self.eat_kw(&TokenKind::KwFirst) {
                Some(NullsOrder::First)
            } else {
                self.expect_kw(&TokenKind::KwLast)?;
                Some(NullsOrder::Last)
            }
        } else {
            None
        };
        Ok(OrderingTerm {
            expr,
            direction,
            nulls,
        })
    }

    /// `LIMIT n [OFFSET m]`, `LIMIT m, n`, `OFFSET m [ROWS]`, and
    /// `[OFFSET m ROWS] FETCH FIRST|NEXT [n] ROW|ROWS ONLY|WITH TIES`.
    fn parse_limit(&mut self) -> Result<Option<LimitClause>, ParseError> {
        let start = self.current_span();
        let mut limit = None;
        let mut offset = None;
        let mut fetch = false;

        if self.eat_kw(&TokenKind::KwLimit) {
            if self.check_kw(&TokenKind::KwAll) {
                // LIMIT ALL behaves like LIMIT NULL: no cap.
                let span = self.advance().span;
                limit = Some(Expr::Literal(Literal::Null, span));
            } else {
                let first = self.parse_expr()?;
                if self.eat(&TokenKind::Comma) {
                    offset = Some(first);
                    limit = Some(self.parse_expr()?);
                } else {
                    limit = Some(first);
                }
            }
        }
        if offset.is_none() && self.eat_kw(&TokenKind::KwOffset) {
            offset = Some(self.parse_expr()?);
            let _ = self.eat_kw(&TokenKind::KwRow) || self.eat_kw(&TokenKind::KwRows);
        }
        if limit.is_none() && self.check_kw(&TokenKind::KwFetch) {
            let fetch_start = self.advance().span;
            if !self.eat_kw(&TokenKind::KwFirst) {
                self.expect_kw(&TokenKind::KwNext)?;
            }
            let count = if matches!(self.peek(), TokenKind::KwRow | TokenKind::KwRows) {
                Expr::Literal(Literal::Number("1".to_owned()), fetch_start)
            } else {
                self.parse_expr()?
            };
            let _ = self.eat_kw(&TokenKind::KwPercent);
            if !self.eat_kw(&TokenKind::KwRows) {
                self.expect_kw(&TokenKind::KwRow)?;
            }
            if self.eat_kw(&TokenKind::KwWith) {
                self.expect_kw(&TokenKind::KwTies)?;
            } else {
                self.expect_kw(&TokenKind::KwOnly)?;
            }
            limit = Some(count);
            fetch = true;
        }

        if limit.is_none() && offset.is_none() {
            return Ok(None);
        }
        Ok(Some(LimitClause {
            limit,
            offset,
            fetch,
            span: self.span_from(start),
        }))
    }

    /// `INTO [TEMPORARY | TEMP | UNLOGGED] [TABLE] name`.
    fn parse_select_into(&mut self) -> Result<Option<SelectInto>, ParseError> {
        if !self.check_kw(&TokenKind::KwInto) {
            return Ok(None);
        }
        let start = self.advance().span;
        let temporary = self.eat_kw(&TokenKind::KwTemporary) || self.eat_kw(&TokenKind::KwTemp);
        let _ = self.eat_word("UNLOGGED");
        let _ = self.eat_kw(&TokenKind::KwTable);
        let name = self.parse_object_name()?;
        Ok(Some(SelectInto {
            temporary,
            name,
            span: self.span_from(start),
        }))
    }

    /// Trailing row locking clauses of a query.
    fn parse_locking(&mut self) -> Result<Vec<LockingClause>, ParseError> {
        let mut clauses = Vec::new();
        loop {
            let start = self.current_span();
            if self.check_word("LOCK") && self.peek_nth(1) == &TokenKind::KwIn {
                self.advance();
                self.advance();
                self.expect_word("SHARE")?;
                self.expect_word("MODE")?;
                clauses.push(LockingClause {
                    mode: LockMode::Share,
                    of: Vec::new(),
                    wait: LockWait::Wait,
                    span: self.span_from(start),
                });
                continue;
            }
            if !(self.check_kw(&TokenKind::KwFor) && self.lock_mode_follows()) {
                break;
            }
            self.advance();
            let mode = self.parse_lock_mode()?;
            let of = if self.eat_kw(&TokenKind::KwOf) {
                self.parse_comma_sep(Self::parse_object_name)?
            } else {
                Vec::new()
            };
            let wait = if self.eat_word("NOWAIT") {
                LockWait::NoWait
            } else if self.eat_word("SKIP") {
                self.expect_word("LOCKED")?;
                LockWait::SkipLocked
            } else {
                // Oracle `WAIT n`
                if self.eat_word("WAIT") {
                    let _ = self.parse_expr()?;
                }
                LockWait::Wait
            };
            clauses.push(LockingClause {
                mode,
                of,
                wait,
                span: self.span_from(start),
            });
        }
        Ok(clauses)
    }

    /// Whether a lock strength follows the current `FOR`.
    fn lock_mode_follows(&self) -> bool {
        match self.peek_nth(1) {
            TokenKind::KwUpdate => true,
            TokenKind::KwKey => is_word(self.peek_nth(2), "SHARE"),
            kind => {
                is_word(kind, "SHARE")
                    || (is_word(kind, "NO") && self.peek_nth(2) == &TokenKind::KwKey)
            }
        }
    }

    fn parse_lock_mode(&mut self) -> Result<LockMode, ParseError> {
        if self.eat_kw(&TokenKind::KwUpdate) {
            return Ok(LockMode::Update);
        }
        if self.eat_word("SHARE") {
            return Ok(LockMode::Share);
        }
        if self.eat_kw(&TokenKind::KwKey) {
            self.expect_word("SHARE")?;
            return Ok(LockMode::KeyShare);
        }
        self.expect_word("NO")?;
        self.expect_kw(&TokenKind::KwKey)?;
        self.expect_kw(&TokenKind::KwUpdate)?;
        Ok(LockMode::NoKeyUpdate)
    }

    fn parse_returning(&mut self) -> Result<Vec<ResultColumn>, ParseError> {
        if self.eat_kw(&TokenKind::KwReturning) {
            self.parse_comma_sep(Self::parse_result_column)
        } else {
            Ok(vec![])
        }
    }

    // -----------------------------------------------------------------------
    // INSERT
    // -----------------------------------------------------------------------

    fn parse_insert(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        let start = with.as_ref().map_or_else(|| self.current_span(), |w| w.span);
        // INSERT or MySQL REPLACE
        self.advance();
        let _ = self.eat_kw(&TokenKind::KwIgnore);
        let overwrite = self.eat_kw(&TokenKind::KwOverwrite);
        let into = self.eat_kw(&TokenKind::KwInto);
        if !overwrite && !into && !self.is_ident_token(self.peek()) {
            return Err(self.err_expected("keyword INTO"));
        }
        let _ = self.eat_kw(&TokenKind::KwTable);
        let table = self.parse_object_name()?;
        if self.eat_kw(&TokenKind::KwPartition) {
            self.skip_parenthesized()?;
        }
        let alias = if self.eat_kw(&TokenKind::KwAs) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let columns = if self.check(&TokenKind::LeftParen) && !self.query_follows(1) {
            self.parse_ident_list()?
        } else {
            vec![]
        };
        let source = if self.check_kw(&TokenKind::KwDefault) {
            self.advance();
            self.expect_kw(&TokenKind::KwValues)?;
            InsertSource::DefaultValues
        } else {
            InsertSource::Query(Box::new(self.parse_query()?))
        };
        let on_conflict = self.parse_on_conflict()?;
        let returning = self.parse_returning()?;
        Ok(Statement::Insert(InsertStatement {
            with,
            overwrite,
            table,
            alias,
            columns,
            source,
            on_conflict,
            returning,
            span: self.span_from(start),
        }))
    }

    /// `ON CONFLICT [(cols) | ON CONSTRAINT c] DO NOTHING | DO UPDATE SET ...`
    /// or MySQL `ON DUPLICATE KEY UPDATE ...`.
    fn parse_on_conflict(&mut self) -> Result<Option<OnConflict>, ParseError> {
        if !self.check_kw(&TokenKind::KwOn) {
            return Ok(None);
        }
        match self.peek_nth(1) {
            TokenKind::KwDuplicate => {
                self.advance();
                self.advance();
                self.expect_kw(&TokenKind::KwKey)?;
                self.expect_kw(&TokenKind::KwUpdate)?;
                let assignments = self.parse_comma_sep(Self::parse_assignment)?;
                Ok(Some(OnConflict {
                    target: vec![],
                    action: ConflictAction::Update {
                        assignments,
                        where_clause: None,
                    },
                }))
            }
            TokenKind::KwConflict => {
                self.advance();
                self.advance();
                let target = if self.check(&TokenKind::LeftParen) {
                    self.parse_ident_list()?
                } else {
                    if self.eat_kw(&TokenKind::KwOn) {
                        self.expect_word("CONSTRAINT")?;
                        let _ = self.parse_ident()?;
                    }
                    vec![]
                };
                if self.eat_kw(&TokenKind::KwWhere) {
                    let _ = self.parse_expr()?;
                }
                self.expect_kw(&TokenKind::KwDo)?;
                let action = if self.eat_kw(&TokenKind::KwNothing) {
                    ConflictAction::Nothing
                } else {
                    self.expect_kw(&TokenKind::KwUpdate)?;
                    self.expect_kw(&TokenKind::KwSet)?;
                    let assignments = self.parse_comma_sep(Self::parse_assignment)?;
                    let where_clause = if self.eat_kw(&TokenKind::KwWhere) {
                        Some(self.parse_expr()?)
                    } else {
                        None
                    };
                    ConflictAction::Update {
                        assignments,
                        where_clause,
                    }
                };
                Ok(Some(OnConflict { target, action }))
            }
            _ => Err(self.err_expected("end of statement")),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Span, ParseError> {
        if self.check_word(word) {
            Ok(self.advance().span)
        } else {
            Err(self.err_expected(word))
        }
    }

    // -----------------------------------------------------------------------
    // UPDATE
    // -----------------------------------------------------------------------

    fn parse_update(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        let start = with.as_ref().map_or_else(|| self.current_span(), |w| w.span);
        self.expect_kw(&TokenKind::KwUpdate)?;
        let _ = self.eat_kw(&TokenKind::KwOnly);
        let target = self.parse_from_clause()?;
        self.expect_kw(&TokenKind::KwSet)?;
        let assignments = self.parse_comma_sep(Self::parse_assignment)?;
        let from = if self.eat_kw(&TokenKind::KwFrom) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };
        let where_clause = if self.eat_kw(&TokenKind::KwWhere) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let returning = self.parse_returning()?;
        // MySQL single-table ORDER BY / LIMIT carry no table references.
        let _ = self.parse_order_by()?;
        let _ = self.parse_limit()?;
        Ok(Statement::Update(UpdateStatement {
            with,
            target,
            assignments,
            from,
            where_clause,
            returning,
            span: self.span_from(start),
        }))
    }

    /// `col = expr`, `t.col = expr`, or `(a, b) = expr`.
    pub(crate) fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let columns = if self.eat(&TokenKind::LeftParen) {
            let cols = self.parse_comma_sep(Self::parse_assignment_target)?;
            self.expect_token(&TokenKind::RightParen)?;
            cols
        } else {
            vec![self.parse_assignment_target()?]
        };
        self.expect_token(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        Ok(Assignment { columns, value })
    }

    fn parse_assignment_target(&mut self) -> Result<ColumnRef, ParseError> {
        let name = self.parse_object_name()?;
        Ok(split_column_name(name))
    }

    // -----------------------------------------------------------------------
    // DELETE
    // -----------------------------------------------------------------------

    fn parse_delete(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        let start = with.as_ref().map_or_else(|| self.current_span(), |w| w.span);
        self.expect_kw(&TokenKind::KwDelete)?;
        let (table, alias, using) = if self.eat_kw(&TokenKind::KwFrom) {
            let table = self.parse_object_name()?;
            let alias = self.try_table_alias()?;
            let using = if self.eat_kw(&TokenKind::KwUsing) || self.eat_kw(&TokenKind::KwFrom) {
                Some(self.parse_from_clause()?)
            } else {
                None
            };
            (table, alias, using)
        } else {
            // `DELETE t [WHERE ...]` or MySQL `DELETE t1[, t2] FROM ...`
            let table = self.parse_object_name()?;
            if self.check_kw(&TokenKind::KwFrom) || self.check(&TokenKind::Comma) {
                while self.eat(&TokenKind::Comma) {
                    let _ = self.parse_object_name()?;
                }
                self.expect_kw(&TokenKind::KwFrom)?;
                let using = self.parse_from_clause()?;
                (table, None, Some(using))
            } else {
                let alias = self.try_table_alias()?;
                (table, alias, None)
            }
        };
        let where_clause = if self.eat_kw(&TokenKind::KwWhere) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let returning = self.parse_returning()?;
        let _ = self.parse_order_by()?;
        let _ = self.parse_limit()?;
        Ok(Statement::Delete(DeleteStatement {
            with,
            table,
            alias,
            using,
            where_clause,
            returning,
            span: self.span_from(start),
        }))
    }

    // -----------------------------------------------------------------------
    // MERGE
    // -----------------------------------------------------------------------

    fn parse_merge(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        let start = with.as_ref().map_or_else(|| self.current_span(), |w| w.span);
        self.expect_kw(&TokenKind::KwMerge)?;
        let _ = self.eat_kw(&TokenKind::KwInto);
        let target = self.parse_object_name()?;
        let target_alias = self.try_table_alias()?;
        self.expect_kw(&TokenKind::KwUsing)?;
        let source = self.parse_table_or_subquery()?;
        self.expect_kw(&TokenKind::KwOn)?;
        let on = self.parse_expr()?;
        let mut clauses = Vec::new();
        while self.check_kw(&TokenKind::KwWhen) {
            clauses.push(self.parse_merge_clause()?);
        }
        if clauses.is_empty() {
            return Err(self.err_expected("keyword WHEN"));
        }
        Ok(Statement::Merge(MergeStatement {
            with,
            target,
            target_alias,
            source,
            on,
            clauses,
            span: self.span_from(start),
        }))
    }

    fn parse_merge_clause(&mut self) -> Result<MergeClause, ParseError> {
        self.expect_kw(&TokenKind::KwWhen)?;
        let matched = !self.eat_kw(&TokenKind::KwNot);
        self.expect_kw(&TokenKind::KwMatched)?;
        let mut by_source = false;
        if self.eat_kw(&TokenKind::KwBy) {
            if self.eat_kw(&TokenKind::KwSource) {
                by_source = true;
            } else {
                self.expect_kw(&TokenKind::KwTarget)?;
            }
        }
        let condition = if self.eat_kw(&TokenKind::KwAnd) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_kw(&TokenKind::KwThen)?;
        let action = match self.peek() {
            TokenKind::KwUpdate => {
                self.advance();
                self.expect_kw(&TokenKind::KwSet)?;
                if self.eat(&TokenKind::Star) {
                    MergeAction::Update(vec![])
                } else {
                    MergeAction::Update(self.parse_comma_sep(Self::parse_assignment)?)
                }
            }
            TokenKind::KwDelete => {
                self.advance();
                MergeAction::Delete
            }
            TokenKind::KwInsert => {
                self.advance();
                if self.eat(&TokenKind::Star) || self.eat_kw(&TokenKind::KwRow) {
                    MergeAction::Insert {
                        columns: vec![],
                        values: None,
                    }
                } else {
                    let columns = if self.check(&TokenKind::LeftParen) {
                        self.parse_ident_list()?
                    } else {
                        vec![]
                    };
                    self.expect_kw(&TokenKind::KwValues)?;
                    self.expect_token(&TokenKind::LeftParen)?;
                    let values = self.parse_comma_sep(Self::parse_expr)?;
                    self.expect_token(&TokenKind::RightParen)?;
                    MergeAction::Insert {
                        columns,
                        values: Some(values),
                    }
                }
            }
            _ => return Err(self.err_expected("UPDATE, DELETE, or INSERT")),
        };
        Ok(MergeClause {
            matched,
            by_source,
            condition,
            action,
        })
    }

    // -----------------------------------------------------------------------
    // CREATE TABLE / VIEW
    // -----------------------------------------------------------------------

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect_kw(&TokenKind::KwCreate)?;
        let or_replace = if self.check_kw(&TokenKind::KwOr)
            && self.peek_nth(1) == &TokenKind::KwReplace
        {
            self.advance();
            self.advance();
            true
        } else {
            false
        };
        let mut temporary = false;
        loop {
            if self.eat_kw(&TokenKind::KwTemp)
                || self.eat_kw(&TokenKind::KwTemporary)
                || self.eat_word("VOLATILE")
            {
                temporary = true;
            } else if !(self.eat_kw(&TokenKind::KwTransient)
                || self.eat_word("GLOBAL")
                || self.eat_word("LOCAL")
                || self.eat_word("EXTERNAL")
                || self.eat_word("SECURE")
                || self.eat_word("MULTISET"))
            {
                break;
            }
        }
        let object = if self.eat_kw(&TokenKind::KwTable) {
            CreatedObject::Table
        } else if self.eat_kw(&TokenKind::KwView) {
            CreatedObject::View
        } else if self.check_kw(&TokenKind::KwMaterialized)
            && self.peek_nth(1) == &TokenKind::KwView
        {
            self.advance();
            self.advance();
            CreatedObject::MaterializedView
        } else {
            return Ok(self.skip_unsupported("CREATE".to_owned(), start));
        };
        let if_not_exists = if self.check_kw(&TokenKind::KwIf)
            && self.peek_nth(1) == &TokenKind::KwNot
            && self.peek_nth(2) == &TokenKind::KwExists
        {
            self.advance();
            self.advance();
            self.advance();
            true
        } else {
            false
        };
        let name = self.parse_object_name()?;

        let mut columns = Vec::new();
        let mut like = None;
        if self.check(&TokenKind::LeftParen) && !self.query_follows(1) {
            if self.peek_nth(1) == &TokenKind::KwLike {
                self.advance();
                self.advance();
                like = Some(self.parse_object_name()?);
                self.skip_statement_rest_in_parens()?;
            } else {
                columns = self.parse_column_defs()?;
            }
        }

        let mut query = None;
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::KwAs if self.query_follows(1) => {
                    self.advance();
                    query = Some(Box::new(self.parse_query()?));
                    break;
                }
                TokenKind::KwLike | TokenKind::KwClone if like.is_none() => {
                    self.advance();
                    like = Some(self.parse_object_name()?);
                }
                TokenKind::LeftParen => self.skip_parenthesized()?,
                _ => {
                    self.advance();
                }
            }
        }
        Ok(Statement::CreateTable(CreateTableStatement {
            or_replace,
            temporary,
            if_not_exists,
            object,
            name,
            columns,
            like,
            query,
            span: self.span_from(start),
        }))
    }

    /// Consume tokens through the `)` closing the current group.
    fn skip_statement_rest_in_parens(&mut self) -> Result<(), ParseError> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                TokenKind::Eof => return Err(self.err_expected("')'")),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// `(col type [constraints], ..., [table constraints])`. Constraints are
    /// skipped; only names and types are kept.
    fn parse_column_defs(&mut self) -> Result<Vec<ColumnDef>, ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let mut defs = Vec::new();
        loop {
            let is_constraint = ["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "INDEX"]
                .iter()
                .any(|w| self.check_word(w))
                || self.check_kw(&TokenKind::KwKey);
            if !is_constraint {
                let name = self.parse_ident()?;
                let data_type = if matches!(self.peek(), TokenKind::Comma | TokenKind::RightParen)
                {
                    None
                } else {
                    Some(self.parse_type_name()?)
                };
                defs.push(ColumnDef { name, data_type });
            }
            // Skip the rest of the item up to a top-level `,` or `)`.
            loop {
                match self.peek() {
                    TokenKind::Comma | TokenKind::RightParen => break,
                    TokenKind::Eof => return Err(self.err_expected("')'")),
                    TokenKind::LeftParen => self.skip_parenthesized()?,
                    _ => {
                        self.advance();
                    }
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RightParen)?;
        Ok(defs)
    }

    // -----------------------------------------------------------------------
    // DROP / TRUNCATE / ALTER / transaction control
    // -----------------------------------------------------------------------

    fn parse_drop(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect_kw(&TokenKind::KwDrop)?;
        let kind = if self.eat_kw(&TokenKind::KwTable) {
            OtherKind::DropTable
        } else if self.eat_kw(&TokenKind::KwView) {
            OtherKind::DropView
        } else if self.check_kw(&TokenKind::KwMaterialized)
            && self.peek_nth(1) == &TokenKind::KwView
        {
            self.advance();
            self.advance();
            OtherKind::DropView
        } else {
            return Ok(self.skip_unsupported("DROP".to_owned(), start));
        };
        if self.check_kw(&TokenKind::KwIf) && self.peek_nth(1) == &TokenKind::KwExists {
            self.advance();
            self.advance();
        }
        let tables = self.parse_comma_sep(Self::parse_object_name)?;
        self.skip_statement_rest();
        Ok(Statement::Other(OtherStatement {
            kind,
            tables,
            span: self.span_from(start),
        }))
    }

    fn parse_truncate(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect_kw(&TokenKind::KwTruncate)?;
        let _ = self.eat_kw(&TokenKind::KwTable);
        if self.check_kw(&TokenKind::KwIf) && self.peek_nth(1) == &TokenKind::KwExists {
            self.advance();
            self.advance();
        }
        let _ = self.eat_kw(&TokenKind::KwOnly);
        let tables = self.parse_comma_sep(Self::parse_object_name)?;
        self.skip_statement_rest();
        Ok(Statement::Other(OtherStatement {
            kind: OtherKind::Truncate,
            tables,
            span: self.span_from(start),
        }))
    }

    fn parse_alter(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect_kw(&TokenKind::KwAlter)?;
        if !self.eat_kw(&TokenKind::KwTable) {
            return Ok(self.skip_unsupported("ALTER".to_owned(), start));
        }
        if self.check_kw(&TokenKind::KwIf) && self.peek_nth(1) == &TokenKind::KwExists {
            self.advance();
            self.advance();
        }
        let _ = self.eat_kw(&TokenKind::KwOnly);
        let tables = vec![self.parse_object_name()?];
        self.skip_statement_rest();
        Ok(Statement::Other(OtherStatement {
            kind: OtherKind::AlterTable,
            tables,
            span: self.span_from(start),
        }))
    }

    fn skim_other(&mut self, kind: OtherKind, start: Span) -> Statement {
        self.advance();
        self.skip_statement_rest();
        Statement::Other(OtherStatement {
            kind,
            tables: vec![],
            span: self.span_from(start),
        })
    }

    fn skip_unsupported(&mut self, keyword: String, start: Span) -> Statement {
        if self.current_span() == start {
            self.advance();
        }
        self.skip_statement_rest();
        Statement::Unsupported(UnsupportedStatement {
            keyword,
            span: self.span_from(start),
        })
    }
}

/// Whether `kind` is the bare word `word` (unquoted, case-insensitive).
pub(crate) fn is_word(kind: &TokenKind, word: &str) -> bool {
    matches!(kind, TokenKind::Id(w) if w.eq_ignore_ascii_case(word))
}

/// Split `a.b.c` into qualifier `a.b` and column `c`.
pub(crate) fn split_column_name(name: ObjectName) -> ColumnRef {
    let mut parts = name.parts.into_vec();
    let column = parts.pop().unwrap_or_else(|| Ident::new("", name.span));
    if parts.is_empty() {
        ColumnRef::bare(column)
    } else {
        ColumnRef::qualified(ObjectName::from_parts(parts), column)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
