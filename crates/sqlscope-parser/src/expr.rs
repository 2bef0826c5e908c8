// SQL Expression Parser
//
// Pratt expression parser shared by every dialect. Dialect differences are
// confined to a few operators (`^`, `::`, JSON arrows) and to which keywords
// may stand as identifiers.
//
// Precedence table (lowest to highest):
//   OR
//   XOR
//   AND
//   NOT (prefix)
//   = == != <> <=> IS LIKE ILIKE RLIKE REGEXP SIMILAR GLOB BETWEEN IN
//   < <= > >=
//   & | << >> (bitwise)
//   + - (binary)
//   * / % DIV
//   || (concat)
//   ^ (power, where the dialect has it; right-associative)
//   COLLATE (postfix)
//   ~ - + (unary prefix)
//   -> ->> (JSON)
//   :: and [] (postfix)

use sqlscope_ast::{
    BinaryOp, CastKind, Expr, FrameBound, FrameSpec, FrameType, FunctionArg, FunctionCall, Ident,
    InSet, LikeOp, Literal, ObjectName, OrderingTerm, Quantifier, Span, TypeName, UnaryOp,
    WindowDef, WindowSpec,
};
use sqlscope_error::SqlError;

use crate::dialect::Dialect;
use crate::parser::{is_word, split_column_name, ParseError, Parser};
use crate::token::TokenKind;

// Binding powers: higher = tighter binding.
// Left BP is checked against min_bp; right BP is passed to recursive call.
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const XOR: (u8, u8) = (3, 4);
    pub const AND: (u8, u8) = (5, 6);
    pub const NOT_PREFIX: u8 = 7;
    pub const EQUALITY: (u8, u8) = (9, 10);
    pub const COMPARISON: (u8, u8) = (11, 12);
    pub const BITWISE: (u8, u8) = (13, 14);
    pub const ADD: (u8, u8) = (15, 16);
    pub const MUL: (u8, u8) = (17, 18);
    pub const CONCAT: (u8, u8) = (19, 20);
    // Right-associative: the right BP is lower than the left.
    pub const POWER: (u8, u8) = (22, 21);
    pub const COLLATE: u8 = 23;
    pub const UNARY: u8 = 25;
    pub const JSON: (u8, u8) = (27, 28);
    pub const POSTFIX: u8 = 29;
}

/// Zero-argument functions spelled without parentheses.
const NILADIC_FUNCTIONS: &[&str] = &[
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "CURRENT_ROLE",
    "CURRENT_SCHEMA",
    "CURRENT_CATALOG",
    "SESSION_USER",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "SYSDATE",
    "SYSTIMESTAMP",
];

/// Type words that introduce a typed string literal (`DATE '2024-01-01'`).
const TYPED_LITERALS: &[&str] = &[
    "DATE",
    "TIME",
    "TIMESTAMP",
    "TIMESTAMPTZ",
    "DATETIME",
    "JSON",
    "NUMERIC",
    "BIGNUMERIC",
    "DECIMAL",
];

/// Functions whose first argument may be a bare date part (`DATEADD(day, 1, d)`).
const DATE_PART_FUNCTIONS: &[&str] = &[
    "DATEADD",
    "DATEDIFF",
    "DATE_ADD",
    "DATE_DIFF",
    "DATE_SUB",
    "DATEPART",
    "DATENAME",
    "DATE_PART",
    "DATE_TRUNC",
    "TIMESTAMPADD",
    "TIMESTAMPDIFF",
    "TIMESTAMP_DIFF",
    "TIMESTAMP_TRUNC",
    "LAST_DAY",
];

const DATE_PARTS: &[&str] = &[
    "YEAR",
    "YY",
    "YYYY",
    "QUARTER",
    "QQ",
    "MONTH",
    "MM",
    "WEEK",
    "WK",
    "ISOWEEK",
    "DAY",
    "DD",
    "DAYOFWEEK",
    "DAYOFYEAR",
    "DOW",
    "DOY",
    "HOUR",
    "HH",
    "MINUTE",
    "MI",
    "SECOND",
    "SS",
    "MILLISECOND",
    "MS",
    "MICROSECOND",
    "US",
    "NANOSECOND",
    "NS",
    "EPOCH",
];

fn is_date_part(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    let singular = upper.strip_suffix('S').unwrap_or(&upper);
    DATE_PARTS.contains(&upper.as_str()) || DATE_PARTS.contains(&singular)
}

/// Arguments and in-parenthesis decorations of a function call.
#[derive(Default)]
struct CallArgs {
    args: Vec<FunctionArg>,
    distinct: bool,
    order_by: Vec<OrderingTerm>,
}

impl Parser<'_> {
    /// Parse a single SQL expression.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    // ── Pratt core ──────────────────────────────────────────────────────

    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_expr_bp_unguarded(min_bp))
    }

    fn parse_expr_bp_unguarded(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Postfix: COLLATE, ::, [], IS, and the predicate forms.
            if let Some(l_bp) = self.postfix_bp() {
                if l_bp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs)?;
                continue;
            }

            if let Some((l_bp, r_bp)) = self.infix_bp() {
                if l_bp < min_bp {
                    break;
                }
                lhs = self.parse_infix(lhs, r_bp)?;
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    // ── Prefix ──────────────────────────────────────────────────────────

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let tok = self.current().clone();
        let start = tok.span;
        match &tok.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n.clone()), start))
            }
            TokenKind::String { value, .. } => {
                self.advance();
                Ok(Expr::Literal(Literal::String(value.clone()), start))
            }
            TokenKind::KwNull => {
                self.advance();
                Ok(Expr::Literal(Literal::Null, start))
            }
            // DEFAULT in a VALUES row or SET list carries no references.
            TokenKind::KwDefault => {
                self.advance();
                Ok(Expr::Literal(Literal::Null, start))
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.advance();
                let value = tok.kind == TokenKind::KwTrue;
                Ok(Expr::Literal(Literal::Boolean(value), start))
            }
            TokenKind::Param(p) => {
                self.advance();
                Ok(Expr::Placeholder(p.clone(), start))
            }

            TokenKind::Minus | TokenKind::Plus | TokenKind::Tilde => {
                self.advance();
                let op = match tok.kind {
                    TokenKind::Minus => UnaryOp::Negate,
                    TokenKind::Plus => UnaryOp::Plus,
                    _ => UnaryOp::BitNot,
                };
                let operand = self.parse_expr_bp(bp::UNARY)?;
                let span = start.merge(operand.span());
                Ok(Expr::UnaryOp {
                    op,
                    expr: Box::new(operand),
                    span,
                })
            }
            TokenKind::KwNot => {
                self.advance();
                if self.check_kw(&TokenKind::KwExists) {
                    return self.parse_exists(start, true);
                }
                let operand = self.parse_expr_bp(bp::NOT_PREFIX)?;
                let span = start.merge(operand.span());
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Not,
                    expr: Box::new(operand),
                    span,
                })
            }

            TokenKind::KwExists => self.parse_exists(start, false),
            TokenKind::KwCase => self.parse_case_expr(),
            TokenKind::KwCast | TokenKind::KwTryCast | TokenKind::KwSafeCast
                if self.peek_nth(1) == &TokenKind::LeftParen =>
            {
                self.parse_cast()
            }
            TokenKind::KwExtract if self.peek_nth(1) == &TokenKind::LeftParen => {
                self.parse_extract()
            }
            TokenKind::KwInterval
                if matches!(
                    self.peek_nth(1),
                    TokenKind::String { .. }
                        | TokenKind::Number(_)
                        | TokenKind::LeftParen
                        | TokenKind::Minus
                ) =>
            {
                self.parse_interval()
            }
            TokenKind::KwArray
                if matches!(self.peek_nth(1), TokenKind::LeftBracket | TokenKind::Lt) =>
            {
                self.advance();
                if self.check(&TokenKind::Lt) {
                    self.skip_angle_group()?;
                }
                self.parse_array_literal(start)
            }
            TokenKind::LeftBracket => self.parse_array_literal(start),
            TokenKind::LeftParen => self.parse_paren_expr(),

            // Reserved words that double as function names.
            TokenKind::KwLeft
            | TokenKind::KwRight
            | TokenKind::KwInsert
            | TokenKind::KwValues
            | TokenKind::KwOffset
                if self.peek_nth(1) == &TokenKind::LeftParen =>
            {
                self.advance();
                let name = ObjectName::bare(Ident::new(tok.text(self.src), start));
                self.parse_function_call(name)
            }

            k if self.is_ident_token(k) => self.parse_ident_expr(),

            _ => Err(self.err_expected("expression")),
        }
    }

    /// Identifier-led expressions: column references, `t.*`, function
    /// calls, typed literals, and niladic functions.
    fn parse_ident_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();

        if let TokenKind::Id(word) = self.peek() {
            let upper = word.to_ascii_uppercase();
            if TYPED_LITERALS.contains(&upper.as_str()) {
                if let TokenKind::String { value, .. } = self.peek_nth(1).clone() {
                    self.advance();
                    self.advance();
                    let literal = Literal::Typed {
                        type_name: upper,
                        value,
                    };
                    return Ok(Expr::Literal(literal, self.span_from(start)));
                }
            }
            if NILADIC_FUNCTIONS.contains(&upper.as_str())
                && !matches!(self.peek_nth(1), TokenKind::LeftParen | TokenKind::Dot)
            {
                let name = ObjectName::bare(self.parse_ident()?);
                return Ok(Expr::FunctionCall(Box::new(FunctionCall {
                    name,
                    args: vec![],
                    distinct: false,
                    order_by: vec![],
                    filter: None,
                    over: None,
                    span: start,
                })));
            }
        }

        let first = self.parse_ident()?;
        let name = self.parse_object_name_from(first)?;
        if self.check(&TokenKind::Dot) && self.peek_nth(1) == &TokenKind::Star {
            self.advance();
            self.advance();
            return Ok(Expr::Wildcard {
                qualifier: Some(name),
                span: self.span_from(start),
            });
        }
        if self.check(&TokenKind::LeftParen) {
            return self.parse_function_call(name);
        }
        let span = self.span_from(start);
        Ok(Expr::Column(split_column_name(name), span))
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect_token(&TokenKind::LeftParen)?;

        if self.peek().is_query_start() {
            let query = self.parse_query()?;
            self.expect_token(&TokenKind::RightParen)?;
            return Ok(Expr::Subquery(Box::new(query), self.span_from(start)));
        }
        // `((SELECT ...) UNION ...)` or `((SELECT 1) + 2)`
        if self.query_follows(0) {
            let saved = self.pos;
            if let Ok(query) = self.parse_query() {
                if self.eat(&TokenKind::RightParen) {
                    return Ok(Expr::Subquery(Box::new(query), self.span_from(start)));
                }
            }
            self.pos = saved;
        }

        let first = self.parse_expr()?;
        if self.eat(&TokenKind::Comma) {
            let mut items = vec![first];
            items.extend(self.parse_comma_sep(Self::parse_expr)?);
            self.expect_token(&TokenKind::RightParen)?;
            return Ok(Expr::RowValue(items, self.span_from(start)));
        }
        self.expect_token(&TokenKind::RightParen)?;
        Ok(first)
    }

    fn parse_array_literal(&mut self, start: Span) -> Result<Expr, ParseError> {
        self.expect_token(&TokenKind::LeftBracket)?;
        let items = if self.check(&TokenKind::RightBracket) {
            vec![]
        } else {
            self.parse_comma_sep(Self::parse_expr)?
        };
        self.expect_token(&TokenKind::RightBracket)?;
        Ok(Expr::Array(items, self.span_from(start)))
    }

    // ── Postfix ─────────────────────────────────────────────────────────

    fn postfix_bp(&self) -> Option<u8> {
        match self.peek() {
            TokenKind::DoubleColon | TokenKind::LeftBracket => Some(bp::POSTFIX),
            TokenKind::KwCollate => Some(bp::COLLATE),
            TokenKind::KwIs
            | TokenKind::KwIn
            | TokenKind::KwBetween
            | TokenKind::KwLike
            | TokenKind::KwIlike
            | TokenKind::KwRlike
            | TokenKind::KwRegexp
            | TokenKind::KwGlob
            | TokenKind::KwSimilar => Some(bp::EQUALITY.0),
            TokenKind::KwNot
                if matches!(
                    self.peek_nth(1),
                    TokenKind::KwIn
                        | TokenKind::KwBetween
                        | TokenKind::KwLike
                        | TokenKind::KwIlike
                        | TokenKind::KwRlike
                        | TokenKind::KwRegexp
                        | TokenKind::KwGlob
                        | TokenKind::KwSimilar
                ) =>
            {
                Some(bp::EQUALITY.0)
            }
            _ => None,
        }
    }

    fn parse_postfix(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let start = lhs.span();
        let tok = self.advance();
        match tok.kind {
            TokenKind::DoubleColon => {
                let type_name = self.parse_type_name()?;
                Ok(Expr::Cast {
                    expr: Box::new(lhs),
                    type_name,
                    kind: CastKind::DoubleColon,
                    span: self.span_from(start),
                })
            }
            TokenKind::LeftBracket => {
                let index = self.parse_expr()?;
                // Slices `a[1:2]` keep only the lower bound.
                if self.eat(&TokenKind::Colon) && !self.check(&TokenKind::RightBracket) {
                    let _ = self.parse_expr()?;
                }
                self.expect_token(&TokenKind::RightBracket)?;
                Ok(Expr::Subscript {
                    expr: Box::new(lhs),
                    index: Box::new(index),
                    span: self.span_from(start),
                })
            }
            TokenKind::KwCollate => {
                let collation = if let TokenKind::String { value, .. } = self.peek().clone() {
                    self.advance();
                    value
                } else {
                    self.parse_object_name()?.qualified()
                };
                Ok(Expr::Collate {
                    expr: Box::new(lhs),
                    collation,
                    span: self.span_from(start),
                })
            }
            TokenKind::KwIs => self.parse_is(lhs),
            TokenKind::KwNot => {
                let next = self.advance();
                self.parse_predicate(lhs, &next.kind, true)
            }
            other => self.parse_predicate(lhs, &other, false),
        }
    }

    /// `[NOT] BETWEEN`, `[NOT] IN`, and the pattern-matching operators,
    /// after the operator keyword has been consumed.
    fn parse_predicate(
        &mut self,
        lhs: Expr,
        op: &TokenKind,
        not: bool,
    ) -> Result<Expr, ParseError> {
        match op {
            TokenKind::KwBetween => self.parse_between(lhs, not),
            TokenKind::KwIn => self.parse_in(lhs, not),
            TokenKind::KwLike => self.parse_like(lhs, LikeOp::Like, not),
            TokenKind::KwIlike => self.parse_like(lhs, LikeOp::ILike, not),
            TokenKind::KwRlike => self.parse_like(lhs, LikeOp::RLike, not),
            TokenKind::KwRegexp => self.parse_like(lhs, LikeOp::Regexp, not),
            TokenKind::KwGlob => self.parse_like(lhs, LikeOp::Glob, not),
            TokenKind::KwSimilar => {
                self.expect_kw(&TokenKind::KwTo)?;
                self.parse_like(lhs, LikeOp::SimilarTo, not)
            }
            _ => Err(self.err_expected("IN, BETWEEN, or LIKE")),
        }
    }

    fn parse_is(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let start = lhs.span();
        let not = self.eat_kw(&TokenKind::KwNot);
        if self.eat_kw(&TokenKind::KwNull) || self.eat_word("UNKNOWN") {
            return Ok(Expr::IsNull {
                expr: Box::new(lhs),
                not,
                span: self.span_from(start),
            });
        }
        if self.check_kw(&TokenKind::KwTrue) || self.check_kw(&TokenKind::KwFalse) {
            let value = self.advance().kind == TokenKind::KwTrue;
            return Ok(Expr::IsBool {
                expr: Box::new(lhs),
                value,
                not,
                span: self.span_from(start),
            });
        }
        if self.eat_kw(&TokenKind::KwDistinct) {
            self.expect_kw(&TokenKind::KwFrom)?;
            let rhs = self.parse_expr_bp(bp::EQUALITY.1)?;
            let op = if not {
                BinaryOp::IsNotDistinctFrom
            } else {
                BinaryOp::IsDistinctFrom
            };
            return Ok(make_binop(lhs, op, rhs));
        }
        Err(self.err_expected("NULL, TRUE, FALSE, or DISTINCT FROM"))
    }

    // ── Infix ───────────────────────────────────────────────────────────

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.peek() {
            TokenKind::KwOr => Some(bp::OR),
            TokenKind::KwXor => Some(bp::XOR),
            TokenKind::KwAnd => Some(bp::AND),
            TokenKind::Eq
            | TokenKind::EqEq
            | TokenKind::Ne
            | TokenKind::LtGt
            | TokenKind::Spaceship => Some(bp::EQUALITY),
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(bp::COMPARISON),
            TokenKind::Ampersand
            | TokenKind::Pipe
            | TokenKind::ShiftLeft
            | TokenKind::ShiftRight => Some(bp::BITWISE),
            TokenKind::Caret if self.dialect.caret_is_power => Some(bp::POWER),
            TokenKind::Caret => Some(bp::BITWISE),
            TokenKind::Plus | TokenKind::Minus => Some(bp::ADD),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::KwDiv => {
                Some(bp::MUL)
            }
            TokenKind::Concat => Some(bp::CONCAT),
            TokenKind::Arrow | TokenKind::DoubleArrow => Some(bp::JSON),
            _ => None,
        }
    }

    fn parse_infix(&mut self, lhs: Expr, r_bp: u8) -> Result<Expr, ParseError> {
        let tok = self.advance();
        let op = match tok.kind {
            TokenKind::KwOr => BinaryOp::Or,
            TokenKind::KwXor => BinaryOp::Xor,
            TokenKind::KwAnd => BinaryOp::And,
            TokenKind::Eq | TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::Ne | TokenKind::LtGt => BinaryOp::Ne,
            TokenKind::Spaceship => BinaryOp::IsNotDistinctFrom,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Ampersand => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
            TokenKind::ShiftRight => BinaryOp::ShiftRight,
            TokenKind::Caret if self.dialect.caret_is_power => BinaryOp::Power,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            TokenKind::Star => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            TokenKind::KwDiv => BinaryOp::IntDivide,
            TokenKind::Concat => BinaryOp::Concat,
            TokenKind::Arrow => BinaryOp::Arrow,
            TokenKind::DoubleArrow => BinaryOp::LongArrow,
            _ => return Err(ParseError::at("binary operator", &tok)),
        };

        let is_comparison = matches!(
            op,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        );
        if is_comparison
            && matches!(
                self.peek(),
                TokenKind::KwAny | TokenKind::KwAll | TokenKind::KwSome
            )
            && self.peek_nth(1) == &TokenKind::LeftParen
        {
            return self.parse_quantified(lhs, op);
        }

        let rhs = self.parse_expr_bp(r_bp)?;
        Ok(make_binop(lhs, op, rhs))
    }

    /// `lhs op ANY|SOME|ALL (subquery | array)`.
    fn parse_quantified(&mut self, lhs: Expr, op: BinaryOp) -> Result<Expr, ParseError> {
        let quantifier = if self.advance().kind == TokenKind::KwAll {
            Quantifier::All
        } else {
            Quantifier::Any
        };
        let open = self.expect_token(&TokenKind::LeftParen)?;
        let right = if self.peek().is_query_start() {
            let query = self.parse_query()?;
            self.expect_token(&TokenKind::RightParen)?;
            Expr::Subquery(Box::new(query), self.span_from(open))
        } else {
            let inner = self.parse_expr()?;
            self.expect_token(&TokenKind::RightParen)?;
            inner
        };
        let span = lhs.span().merge(self.prev_span());
        Ok(Expr::Quantified {
            left: Box::new(lhs),
            op,
            quantifier,
            right: Box::new(right),
            span,
        })
    }

    // ── Special expression forms ────────────────────────────────────────

    fn parse_like(&mut self, lhs: Expr, op: LikeOp, not: bool) -> Result<Expr, ParseError> {
        // Snowflake `LIKE ANY ('a%', 'b%')`
        let pattern = if matches!(
            self.peek(),
            TokenKind::KwAny | TokenKind::KwAll | TokenKind::KwSome
        ) && self.peek_nth(1) == &TokenKind::LeftParen
        {
            self.advance();
            let open = self.expect_token(&TokenKind::LeftParen)?;
            let items = self.parse_comma_sep(Self::parse_expr)?;
            self.expect_token(&TokenKind::RightParen)?;
            Expr::RowValue(items, self.span_from(open))
        } else {
            self.parse_expr_bp(bp::EQUALITY.1)?
        };
        let escape = if self.eat_kw(&TokenKind::KwEscape) {
            Some(Box::new(self.parse_expr_bp(bp::EQUALITY.1)?))
        } else {
            None
        };
        let end = escape.as_ref().map_or_else(|| pattern.span(), |e| e.span());
        let span = lhs.span().merge(end);
        Ok(Expr::Like {
            expr: Box::new(lhs),
            pattern: Box::new(pattern),
            escape,
            op,
            not,
            span,
        })
    }

    fn parse_between(&mut self, lhs: Expr, not: bool) -> Result<Expr, ParseError> {
        // Parse bounds above AND level so the AND keyword is not consumed.
        let low = self.parse_expr_bp(bp::NOT_PREFIX)?;
        self.expect_kw(&TokenKind::KwAnd)?;
        let high = self.parse_expr_bp(bp::NOT_PREFIX)?;
        let span = lhs.span().merge(high.span());
        Ok(Expr::Between {
            expr: Box::new(lhs),
            low: Box::new(low),
            high: Box::new(high),
            not,
            span,
        })
    }

    fn parse_in(&mut self, lhs: Expr, not: bool) -> Result<Expr, ParseError> {
        let start = lhs.span();

        if self.eat_kw(&TokenKind::KwUnnest) {
            self.expect_token(&TokenKind::LeftParen)?;
            let array = self.parse_expr()?;
            let end = self.expect_token(&TokenKind::RightParen)?;
            return Ok(Expr::In {
                expr: Box::new(lhs),
                set: InSet::Unnest(Box::new(array)),
                not,
                span: start.merge(end),
            });
        }

        self.expect_token(&TokenKind::LeftParen)?;
        let set = if self.peek().is_query_start() {
            InSet::Subquery(Box::new(self.parse_query()?))
        } else if self.check(&TokenKind::RightParen) {
            InSet::List(vec![])
        } else {
            InSet::List(self.parse_comma_sep(Self::parse_expr)?)
        };
        let end = self.expect_token(&TokenKind::RightParen)?;
        Ok(Expr::In {
            expr: Box::new(lhs),
            set,
            not,
            span: start.merge(end),
        })
    }

    fn parse_exists(&mut self, start: Span, not: bool) -> Result<Expr, ParseError> {
        self.expect_kw(&TokenKind::KwExists)?;
        self.expect_token(&TokenKind::LeftParen)?;
        let subquery = self.parse_query()?;
        let end = self.expect_token(&TokenKind::RightParen)?;
        Ok(Expr::Exists {
            subquery: Box::new(subquery),
            not,
            span: start.merge(end),
        })
    }

    fn parse_case_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect_kw(&TokenKind::KwCase)?;
        let operand = if self.check_kw(&TokenKind::KwWhen) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut whens = Vec::new();
        while self.eat_kw(&TokenKind::KwWhen) {
            let condition = self.parse_expr()?;
            self.expect_kw(&TokenKind::KwThen)?;
            let result = self.parse_expr()?;
            whens.push((condition, result));
        }
        if whens.is_empty() {
            return Err(self.err_expected("keyword WHEN"));
        }

        let else_expr = if self.eat_kw(&TokenKind::KwElse) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.expect_kw(&TokenKind::KwEnd)?;
        Ok(Expr::Case {
            operand,
            whens,
            else_expr,
            span: start.merge(end),
        })
    }

    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        let tok = self.advance();
        let kind = match tok.kind {
            TokenKind::KwTryCast => CastKind::TryCast,
            TokenKind::KwSafeCast => CastKind::SafeCast,
            _ => CastKind::Cast,
        };
        self.expect_token(&TokenKind::LeftParen)?;
        let inner = self.parse_expr()?;
        self.expect_kw(&TokenKind::KwAs)?;
        let type_name = self.parse_type_name()?;
        // BigQuery `CAST(x AS STRING FORMAT 'YYYY')`
        if self.eat_word("FORMAT") {
            let _ = self.parse_expr()?;
        }
        let end = self.expect_token(&TokenKind::RightParen)?;
        Ok(Expr::Cast {
            expr: Box::new(inner),
            type_name,
            kind,
            span: tok.span.merge(end),
        })
    }

    fn parse_extract(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance().span;
        self.expect_token(&TokenKind::LeftParen)?;
        let field_tok = self.advance();
        let field = match &field_tok.kind {
            TokenKind::String { value, .. } => value.to_ascii_uppercase(),
            TokenKind::Id(_) | TokenKind::QuotedId(..) => {
                field_tok.text(self.src).to_ascii_uppercase()
            }
            k if k.is_keyword() => field_tok.text(self.src).to_ascii_uppercase(),
            _ => return Err(ParseError::at("date part", &field_tok)),
        };
        if !self.eat_kw(&TokenKind::KwFrom) {
            self.expect_token(&TokenKind::Comma)?;
        }
        let source = self.parse_expr()?;
        let end = self.expect_token(&TokenKind::RightParen)?;
        Ok(Expr::Extract {
            field,
            expr: Box::new(source),
            span: start.merge(end),
        })
    }

    /// `INTERVAL '1' DAY`, `INTERVAL 3 HOUR`, `INTERVAL '1-2' YEAR TO MONTH`.
    fn parse_interval(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance().span;
        let value = self.parse_expr_bp(bp::UNARY)?;
        let unit = match self.peek() {
            TokenKind::Id(word) if is_date_part(word) => {
                let mut unit = word.to_ascii_uppercase();
                self.advance();
                if self.check_kw(&TokenKind::KwTo) {
                    if let TokenKind::Id(to) = self.peek_nth(1) {
                        if is_date_part(to) {
                            unit = format!("{unit} TO {}", to.to_ascii_uppercase());
                            self.advance();
                            self.advance();
                        }
                    }
                }
                Some(unit)
            }
            _ => None,
        };
        Ok(Expr::Interval {
            value: Box::new(value),
            unit,
            span: self.span_from(start),
        })
    }

    // ── Function calls ──────────────────────────────────────────────────

    fn parse_function_call(&mut self, name: ObjectName) -> Result<Expr, ParseError> {
        let start = name.span;
        let upper = name.qualified().to_ascii_uppercase();
        let mut call = self.parse_call_args(&upper)?;

        if matches!(self.peek(), TokenKind::KwIgnore | TokenKind::KwRespect)
            && self.peek_nth(1) == &TokenKind::KwNulls
        {
            self.advance();
            self.advance();
        }

        if self.check_kw(&TokenKind::KwWithin) && self.peek_nth(1) == &TokenKind::KwGroup {
            self.advance();
            self.advance();
            self.expect_token(&TokenKind::LeftParen)?;
            self.expect_kw(&TokenKind::KwOrder)?;
            self.expect_kw(&TokenKind::KwBy)?;
            call.order_by = self.parse_comma_sep(Self::parse_ordering_term)?;
            self.expect_token(&TokenKind::RightParen)?;
        }

        let filter = if self.check_kw(&TokenKind::KwFilter)
            && self.peek_nth(1) == &TokenKind::LeftParen
        {
            self.advance();
            self.advance();
            self.expect_kw(&TokenKind::KwWhere)?;
            let cond = self.parse_expr()?;
            self.expect_token(&TokenKind::RightParen)?;
            Some(Box::new(cond))
        } else {
            None
        };

        let over = if self.eat_kw(&TokenKind::KwOver) {
            if self.check(&TokenKind::LeftParen) {
                Some(self.parse_window_spec_parens()?)
            } else {
                Some(WindowSpec {
                    base_window: Some(self.parse_ident()?),
                    partition_by: vec![],
                    order_by: vec![],
                    frame: None,
                })
            }
        } else {
            None
        };

        Ok(Expr::FunctionCall(Box::new(FunctionCall {
            name,
            args: call.args,
            distinct: call.distinct,
            order_by: call.order_by,
            filter,
            over,
            span: self.span_from(start),
        })))
    }

    /// Parenthesized argument list of a table-valued function.
    pub(crate) fn parse_function_args_list(&mut self) -> Result<Vec<FunctionArg>, ParseError> {
        Ok(self.parse_call_args("")?.args)
    }

    /// `( [DISTINCT] arg, ... [IGNORE NULLS] [ORDER BY ...] [LIMIT n] )`,
    /// including the keyword-separated forms of SUBSTRING, TRIM, POSITION,
    /// and CONVERT.
    fn parse_call_args(&mut self, name: &str) -> Result<CallArgs, ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let mut call = CallArgs::default();
        if self.eat(&TokenKind::RightParen) {
            return Ok(call);
        }
        call.distinct = self.eat_kw(&TokenKind::KwDistinct);

        if name == "TRIM" {
            let _ = self.eat_word("BOTH") || self.eat_word("LEADING") || self.eat_word("TRAILING");
            let _ = self.eat_kw(&TokenKind::KwFrom);
        }

        loop {
            let arg = self.parse_function_arg(name, call.args.is_empty())?;
            call.args.push(arg);
            if self.eat(&TokenKind::Comma)
                || self.eat_kw(&TokenKind::KwFrom)
                || self.eat_kw(&TokenKind::KwFor)
                || self.eat_kw(&TokenKind::KwUsing)
                || (name == "POSITION" && self.eat_kw(&TokenKind::KwIn))
            {
                continue;
            }
            if matches!(self.peek(), TokenKind::KwIgnore | TokenKind::KwRespect)
                && self.peek_nth(1) == &TokenKind::KwNulls
            {
                self.advance();
                self.advance();
            }
            if self.eat_kw(&TokenKind::KwOrder) {
                self.expect_kw(&TokenKind::KwBy)?;
                call.order_by = self.parse_comma_sep(Self::parse_ordering_term)?;
            }
            if self.eat_kw(&TokenKind::KwLimit) || self.eat_word("SEPARATOR") {
                let _ = self.parse_expr()?;
            }
            break;
        }

        self.expect_token(&TokenKind::RightParen)?;
        Ok(call)
    }

    fn parse_function_arg(&mut self, name: &str, first: bool) -> Result<FunctionArg, ParseError> {
        if self.check(&TokenKind::Star) {
            let span = self.advance().span;
            return Ok(FunctionArg {
                name: None,
                value: Expr::Wildcard {
                    qualifier: None,
                    span,
                },
            });
        }
        if self.is_ident_token(self.peek()) && self.peek_nth(1) == &TokenKind::FatArrow {
            let arg_name = self.parse_ident()?;
            self.advance();
            let value = self.parse_expr()?;
            return Ok(FunctionArg {
                name: Some(arg_name),
                value,
            });
        }
        if first && DATE_PART_FUNCTIONS.contains(&name) {
            if let TokenKind::Id(word) = self.peek() {
                if is_date_part(word) && self.peek_nth(1) == &TokenKind::Comma {
                    let value = Literal::String(word.to_ascii_uppercase());
                    let span = self.advance().span;
                    return Ok(FunctionArg {
                        name: None,
                        value: Expr::Literal(value, span),
                    });
                }
            }
        }
        let value = if first && name == "POSITION" {
            self.parse_expr_bp(bp::EQUALITY.1)?
        } else {
            self.parse_expr()?
        };
        Ok(FunctionArg { name: None, value })
    }

    // ── Window specifications ───────────────────────────────────────────

    /// `name AS (spec)` in a WINDOW clause.
    pub(crate) fn parse_window_def(&mut self) -> Result<WindowDef, ParseError> {
        let name = self.parse_ident()?;
        self.expect_kw(&TokenKind::KwAs)?;
        let spec = self.parse_window_spec_parens()?;
        Ok(WindowDef { name, spec })
    }

    fn parse_window_spec_parens(&mut self) -> Result<WindowSpec, ParseError> {
        self.expect_token(&TokenKind::LeftParen)?;
        let base_window = if matches!(self.peek(), TokenKind::Id(_) | TokenKind::QuotedId(..)) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let partition_by = if self.eat_kw(&TokenKind::KwPartition) {
            self.expect_kw(&TokenKind::KwBy)?;
            self.parse_comma_sep(Self::parse_expr)?
        } else {
            vec![]
        };
        let order_by = if self.eat_kw(&TokenKind::KwOrder) {
            self.expect_kw(&TokenKind::KwBy)?;
            self.parse_comma_sep(Self::parse_ordering_term)?
        } else {
            vec![]
        };
        let frame = self.try_frame_spec()?;
        self.expect_token(&TokenKind::RightParen)?;
        Ok(WindowSpec {
            base_window,
            partition_by,
            order_by,
            frame,
        })
    }

    fn try_frame_spec(&mut self) -> Result<Option<FrameSpec>, ParseError> {
        let frame_type = match self.peek() {
            TokenKind::KwRows => FrameType::Rows,
            TokenKind::KwRange => FrameType::Range,
            TokenKind::KwGroups => FrameType::Groups,
            _ => return Ok(None),
        };
        self.advance();

        let (start, end) = if self.eat_kw(&TokenKind::KwBetween) {
            let start = self.parse_frame_bound()?;
            self.expect_kw(&TokenKind::KwAnd)?;
            (start, Some(self.parse_frame_bound()?))
        } else {
            (self.parse_frame_bound()?, None)
        };

        // EXCLUDE CURRENT ROW | GROUP | TIES | NO OTHERS
        if self.eat_word("EXCLUDE") {
            if self.eat_kw(&TokenKind::KwCurrent) {
                self.expect_kw(&TokenKind::KwRow)?;
            } else if !(self.eat_kw(&TokenKind::KwGroup) || self.eat_kw(&TokenKind::KwTies)) {
                self.expect_word_token("NO")?;
                self.expect_word_token("OTHERS")?;
            }
        }

        Ok(Some(FrameSpec {
            frame_type,
            start,
            end,
        }))
    }

    fn expect_word_token(&mut self, word: &str) -> Result<(), ParseError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.err_expected(word))
        }
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound, ParseError> {
        if self.eat_kw(&TokenKind::KwUnbounded) {
            if self.eat_kw(&TokenKind::KwPreceding) {
                return Ok(FrameBound::UnboundedPreceding);
            }
            self.expect_kw(&TokenKind::KwFollowing)?;
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.eat_kw(&TokenKind::KwCurrent) {
            self.expect_kw(&TokenKind::KwRow)?;
            return Ok(FrameBound::CurrentRow);
        }
        let offset = self.parse_expr()?;
        if self.eat_kw(&TokenKind::KwPreceding) {
            Ok(FrameBound::Preceding(Box::new(offset)))
        } else {
            self.expect_kw(&TokenKind::KwFollowing)?;
            Ok(FrameBound::Following(Box::new(offset)))
        }
    }

    // ── Type names ──────────────────────────────────────────────────────

    /// A type as written: `INT`, `DOUBLE PRECISION`, `VARCHAR(255)`,
    /// `TIMESTAMP(3) WITH TIME ZONE`, `ARRAY<STRUCT<a INT64>>`, `INT[]`.
    pub(crate) fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let start = self.current_span();
        let first = self.peek();
        if !(matches!(first, TokenKind::Id(_) | TokenKind::QuotedId(..)) || first.is_keyword()) {
            return Err(self.err_expected("type name"));
        }
        self.advance();
        while ["PRECISION", "VARYING", "UNSIGNED", "SIGNED"]
            .iter()
            .any(|w| self.check_word(w))
        {
            self.advance();
        }
        self.eat_time_zone_suffix();
        if self.check(&TokenKind::LeftParen) {
            self.skip_parenthesized()?;
        }
        if self.check(&TokenKind::Lt) {
            self.skip_angle_group()?;
        }
        while self.check(&TokenKind::LeftBracket) {
            self.advance();
            while !matches!(self.peek(), TokenKind::RightBracket | TokenKind::Eof) {
                self.advance();
            }
            self.expect_token(&TokenKind::RightBracket)?;
        }
        self.eat_time_zone_suffix();
        let span = self.span_from(start);
        Ok(TypeName {
            name: span.text(self.src).to_owned(),
            span,
        })
    }

    /// `WITH TIME ZONE` / `WITHOUT TIME ZONE`.
    fn eat_time_zone_suffix(&mut self) {
        let leads = self.check_kw(&TokenKind::KwWith) || self.check_word("WITHOUT");
        if leads && is_word(self.peek_nth(1), "TIME") && is_word(self.peek_nth(2), "ZONE") {
            self.advance();
            self.advance();
            self.advance();
        }
    }

    /// Consume a balanced `< ... >` group; `>>` closes two levels.
    fn skip_angle_group(&mut self) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Lt)?;
        let mut depth: i32 = 1;
        while depth > 0 {
            match self.peek() {
                TokenKind::Eof => return Err(self.err_expected("'>'")),
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth -= 1,
                TokenKind::ShiftRight => depth -= 2,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }
}

fn make_binop(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    let span = lhs.span().merge(rhs.span());
    Expr::BinaryOp {
        left: Box::new(lhs),
        op,
        right: Box::new(rhs),
        span,
    }
}

/// Parse a single expression from raw SQL text.
pub fn parse_expr(sql: &str, dialect: &Dialect) -> Result<Expr, SqlError> {
    let mut parser = Parser::from_sql(sql, dialect)?;
    let expr = parser.parse_expr()?;
    if !matches!(parser.peek(), TokenKind::Eof | TokenKind::Semicolon) {
        return Err(parser.err_expected("end of expression").into());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{ANSI, BIGQUERY, MYSQL, POSTGRES, SNOWFLAKE};
    use sqlscope_ast::ColumnRef;

    fn parse_in(sql: &str, dialect: &Dialect) -> Expr {
        parse_expr(sql, dialect).unwrap()
    }

    fn parse(sql: &str) -> Expr {
        parse_in(sql, &ANSI)
    }

    fn column_name(expr: &Expr) -> String {
        match expr {
            Expr::Column(col, _) => col.to_string(),
            other => unreachable!("expected column, got {other:?}"),
        }
    }

    // ── Precedence ──────────────────────────────────────────────────────

    #[test]
    fn test_not_lower_precedence_than_comparison() {
        // NOT x = y → NOT (x = y)
        match parse("NOT x = y") {
            Expr::UnaryOp {
                op: UnaryOp::Not,
                expr: inner,
                ..
            } => assert!(matches!(
                *inner,
                Expr::BinaryOp {
                    op: BinaryOp::Eq,
                    ..
                }
            )),
            other => unreachable!("expected NOT(Eq), got {other:?}"),
        }
    }

    #[test]
    fn test_and_higher_than_or() {
        // a OR b AND c → a OR (b AND c)
        match parse("a OR b AND c") {
            Expr::BinaryOp {
                op: BinaryOp::Or,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::BinaryOp {
                    op: BinaryOp::And,
                    ..
                }
            )),
            other => unreachable!("expected OR at root, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        // 1 + 2 * 3 → 1 + (2 * 3)
        match parse("1 + 2 * 3") {
            Expr::BinaryOp {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::BinaryOp {
                    op: BinaryOp::Multiply,
                    ..
                }
            )),
            other => unreachable!("expected Add at root, got {other:?}"),
        }
    }

    #[test]
    fn test_caret_depends_on_dialect() {
        match parse_in("2 ^ 3 ^ 2", &POSTGRES) {
            Expr::BinaryOp {
                op: BinaryOp::Power,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::BinaryOp {
                    op: BinaryOp::Power,
                    ..
                }
            )),
            other => unreachable!("expected right-nested Power, got {other:?}"),
        }
        assert!(matches!(
            parse_in("a ^ b", &MYSQL),
            Expr::BinaryOp {
                op: BinaryOp::BitXor,
                ..
            }
        ));
    }

    #[test]
    fn test_between_does_not_consume_outer_and() {
        match parse("x BETWEEN 1 AND 5 AND y = 2") {
            Expr::BinaryOp {
                op: BinaryOp::And,
                left,
                ..
            } => assert!(matches!(*left, Expr::Between { not: false, .. })),
            other => unreachable!("expected AND at root, got {other:?}"),
        }
    }

    // ── Columns and names ───────────────────────────────────────────────

    #[test]
    fn test_qualified_columns() {
        assert_eq!(column_name(&parse("a")), "a");
        assert_eq!(column_name(&parse("t.a")), "t.a");
        assert_eq!(column_name(&parse("db.s.t.a")), "db.s.t.a");
        match parse("s.t.a") {
            Expr::Column(ColumnRef { qualifier, column }, span) => {
                assert_eq!(qualifier.unwrap().qualified(), "s.t");
                assert_eq!(column.value, "a");
                assert_eq!(span, Span::new(0, 5));
            }
            other => unreachable!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_non_reserved_keyword_column() {
        assert_eq!(column_name(&parse("source.first")), "source.first");
    }

    #[test]
    fn test_niladic_and_typed_literals() {
        match parse("CURRENT_DATE") {
            Expr::FunctionCall(call) => assert!(call.args.is_empty()),
            other => unreachable!("expected niladic call, got {other:?}"),
        }
        match parse("DATE '2024-01-01'") {
            Expr::Literal(Literal::Typed { type_name, value }, _) => {
                assert_eq!(type_name, "DATE");
                assert_eq!(value, "2024-01-01");
            }
            other => unreachable!("expected typed literal, got {other:?}"),
        }
    }

    // ── Predicates ──────────────────────────────────────────────────────

    #[test]
    fn test_in_forms() {
        assert!(matches!(
            parse("x IN (1, 2, 3)"),
            Expr::In {
                set: InSet::List(ref items),
                not: false,
                ..
            } if items.len() == 3
        ));
        assert!(matches!(
            parse("x NOT IN (SELECT y FROM t)"),
            Expr::In {
                set: InSet::Subquery(_),
                not: true,
                ..
            }
        ));
        assert!(matches!(
            parse_in("x IN UNNEST(arr)", &BIGQUERY),
            Expr::In {
                set: InSet::Unnest(_),
                ..
            }
        ));
    }

    #[test]
    fn test_like_family() {
        assert!(matches!(
            parse("name NOT ILIKE '%a%' ESCAPE '\\'"),
            Expr::Like {
                op: LikeOp::ILike,
                not: true,
                escape: Some(_),
                ..
            }
        ));
        assert!(matches!(
            parse("name SIMILAR TO 'a+'"),
            Expr::Like {
                op: LikeOp::SimilarTo,
                ..
            }
        ));
        assert!(matches!(
            parse_in("name LIKE ANY ('a%', 'b%')", &SNOWFLAKE),
            Expr::Like { ref pattern, .. } if matches!(**pattern, Expr::RowValue(..))
        ));
    }

    #[test]
    fn test_is_forms() {
        assert!(matches!(parse("x IS NULL"), Expr::IsNull { not: false, .. }));
        assert!(matches!(parse("x IS NOT NULL"), Expr::IsNull { not: true, .. }));
        assert!(matches!(
            parse("x IS NOT TRUE"),
            Expr::IsBool {
                value: true,
                not: true,
                ..
            }
        ));
        assert!(matches!(
            parse("x IS DISTINCT FROM y"),
            Expr::BinaryOp {
                op: BinaryOp::IsDistinctFrom,
                ..
            }
        ));
    }

    #[test]
    fn test_quantified_comparison() {
        match parse("x > ALL (SELECT y FROM t)") {
            Expr::Quantified {
                op: BinaryOp::Gt,
                quantifier: Quantifier::All,
                right,
                ..
            } => assert!(matches!(*right, Expr::Subquery(..))),
            other => unreachable!("expected quantified, got {other:?}"),
        }
        assert!(matches!(
            parse_in("x = ANY(arr)", &POSTGRES),
            Expr::Quantified {
                quantifier: Quantifier::Any,
                ..
            }
        ));
    }

    #[test]
    fn test_exists_and_not_exists() {
        assert!(matches!(
            parse("EXISTS (SELECT 1)"),
            Expr::Exists { not: false, .. }
        ));
        assert!(matches!(
            parse("NOT EXISTS (SELECT 1)"),
            Expr::Exists { not: true, .. }
        ));
    }

    // ── Special forms ───────────────────────────────────────────────────

    #[test]
    fn test_case_forms() {
        match parse("CASE WHEN a > 0 THEN 'pos' WHEN a < 0 THEN 'neg' ELSE 'zero' END") {
            Expr::Case {
                operand: None,
                whens,
                else_expr: Some(_),
                ..
            } => assert_eq!(whens.len(), 2),
            other => unreachable!("expected searched CASE, got {other:?}"),
        }
        assert!(matches!(
            parse("CASE x WHEN 1 THEN 'a' END"),
            Expr::Case {
                operand: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_casts() {
        match parse("CAST(x AS VARCHAR(10))") {
            Expr::Cast {
                type_name,
                kind: CastKind::Cast,
                ..
            } => assert_eq!(type_name.name, "VARCHAR(10)"),
            other => unreachable!("expected CAST, got {other:?}"),
        }
        match parse_in("x::timestamp with time zone", &POSTGRES) {
            Expr::Cast {
                type_name,
                kind: CastKind::DoubleColon,
                ..
            } => assert_eq!(type_name.name, "timestamp with time zone"),
            other => unreachable!("expected :: cast, got {other:?}"),
        }
        match parse_in("SAFE_CAST(x AS ARRAY<STRUCT<a INT64>>)", &BIGQUERY) {
            Expr::Cast { type_name, .. } => assert_eq!(type_name.name, "ARRAY<STRUCT<a INT64>>"),
            other => unreachable!("expected SAFE_CAST, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_and_interval() {
        assert!(matches!(
            parse("EXTRACT(year FROM d)"),
            Expr::Extract { ref field, .. } if field == "YEAR"
        ));
        match parse("d + INTERVAL '1' DAY") {
            Expr::BinaryOp { right, .. } => assert!(matches!(
                *right,
                Expr::Interval { unit: Some(ref u), .. } if u == "DAY"
            )),
            other => unreachable!("expected interval arithmetic, got {other:?}"),
        }
    }

    #[test]
    fn test_arrays_subscripts_and_rows() {
        assert!(matches!(parse_in("[1, 2]", &BIGQUERY), Expr::Array(ref v, _) if v.len() == 2));
        assert!(matches!(parse("ARRAY[1]"), Expr::Array(..)));
        assert!(matches!(parse("arr[1]"), Expr::Subscript { .. }));
        assert!(matches!(parse("(1, 2)"), Expr::RowValue(ref v, _) if v.len() == 2));
        assert!(matches!(parse("(SELECT 1)"), Expr::Subquery(..)));
        assert!(matches!(parse("(a)"), Expr::Column(..)));
    }

    #[test]
    fn test_json_arrows() {
        assert!(matches!(
            parse_in("doc ->> 'name'", &POSTGRES),
            Expr::BinaryOp {
                op: BinaryOp::LongArrow,
                ..
            }
        ));
    }

    // ── Function calls ──────────────────────────────────────────────────

    #[test]
    fn test_count_star_and_distinct() {
        match parse("COUNT(*)") {
            Expr::FunctionCall(call) => {
                assert!(matches!(call.args[0].value, Expr::Wildcard { qualifier: None, .. }));
            }
            other => unreachable!("expected call, got {other:?}"),
        }
        match parse("count(DISTINCT a)") {
            Expr::FunctionCall(call) => assert!(call.distinct),
            other => unreachable!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_window_call() {
        match parse(
            "sum(x) FILTER (WHERE x > 0) OVER (PARTITION BY g ORDER BY t \
             ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)",
        ) {
            Expr::FunctionCall(call) => {
                assert!(call.filter.is_some());
                let over = call.over.unwrap();
                assert_eq!(over.partition_by.len(), 1);
                assert_eq!(over.order_by.len(), 1);
                let frame = over.frame.unwrap();
                assert_eq!(frame.frame_type, FrameType::Rows);
                assert_eq!(frame.start, FrameBound::UnboundedPreceding);
                assert_eq!(frame.end, Some(FrameBound::CurrentRow));
            }
            other => unreachable!("expected window call, got {other:?}"),
        }
        match parse("rank() OVER w") {
            Expr::FunctionCall(call) => {
                assert_eq!(call.over.unwrap().base_window.unwrap().value, "w");
            }
            other => unreachable!("expected window call, got {other:?}"),
        }
    }

    #[test]
    fn test_keyword_separated_arguments() {
        match parse("SUBSTRING(s FROM 2 FOR 3)") {
            Expr::FunctionCall(call) => assert_eq!(call.args.len(), 3),
            other => unreachable!("expected call, got {other:?}"),
        }
        match parse("POSITION('a' IN s)") {
            Expr::FunctionCall(call) => assert_eq!(call.args.len(), 2),
            other => unreachable!("expected call, got {other:?}"),
        }
        match parse("TRIM(BOTH ' ' FROM s)") {
            Expr::FunctionCall(call) => assert_eq!(call.args.len(), 2),
            other => unreachable!("expected call, got {other:?}"),
        }
        match parse_in("GROUP_CONCAT(a ORDER BY b SEPARATOR ',')", &MYSQL) {
            Expr::FunctionCall(call) => assert_eq!(call.order_by.len(), 1),
            other => unreachable!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_date_part_argument_is_not_a_column() {
        match parse_in("DATEADD(day, 1, created_at)", &SNOWFLAKE) {
            Expr::FunctionCall(call) => {
                assert!(matches!(call.args[0].value, Expr::Literal(Literal::String(_), _)));
                assert!(matches!(call.args[2].value, Expr::Column(..)));
            }
            other => unreachable!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_named_arguments_and_keyword_functions() {
        match parse_in("FLATTEN(input => v, path => 'a')", &SNOWFLAKE) {
            Expr::FunctionCall(call) => {
                assert_eq!(call.args[0].name.as_ref().unwrap().value, "input");
            }
            other => unreachable!("expected call, got {other:?}"),
        }
        match parse("LEFT(s, 3)") {
            Expr::FunctionCall(call) => assert_eq!(call.name.qualified(), "LEFT"),
            other => unreachable!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_qualified_wildcard_argument() {
        match parse("to_json(t.*)") {
            Expr::FunctionCall(call) => assert!(matches!(
                call.args[0].value,
                Expr::Wildcard {
                    qualifier: Some(_),
                    ..
                }
            )),
            other => unreachable!("expected call, got {other:?}"),
        }
    }

    // ── Errors ──────────────────────────────────────────────────────────

    #[test]
    fn test_errors() {
        let err = parse_expr("1 +", &ANSI).unwrap_err();
        assert!(matches!(err, SqlError::Parse { ref expected, .. } if expected == "expression"));
        let err = parse_expr("CASE x END", &ANSI).unwrap_err();
        assert!(matches!(err, SqlError::Parse { ref expected, .. } if expected == "keyword WHEN"));
        let err = parse_expr("a b", &ANSI).unwrap_err();
        assert!(
            matches!(err, SqlError::Parse { ref expected, .. } if expected == "end of expression")
        );
        assert!(matches!(
            parse_expr("'open", &ANSI).unwrap_err(),
            SqlError::Lex { .. }
        ));
    }
}
