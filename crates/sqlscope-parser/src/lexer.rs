// SQL Lexer
//
// Converts SQL text into a stream of tokens under a dialect's lexical rules.
// Whitespace and comments are not tokens: they live in the gaps between
// consecutive token spans, so the original text can always be recovered by
// slicing the source. Uses memchr for accelerated quote scanning and tracks
// line/column for error reporting.

use std::fmt;

use memchr::{memchr, memchr2};
use sqlscope_ast::Span;
use sqlscope_error::SqlError;

use crate::dialect::{Dialect, DoubleQuote};
use crate::token::{Token, TokenKind};

/// A lexical error. Fatal: tokenization stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    /// Byte offset of the offending input (the opening delimiter for
    /// unterminated literals and comments).
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexError {}

impl From<LexError> for SqlError {
    fn from(err: LexError) -> Self {
        Self::Lex {
            offset: err.offset,
            line: err.line,
            col: err.col,
            reason: err.message,
        }
    }
}

/// Source position captured at the start of a token.
#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    col: u32,
}

/// SQL lexer that produces a stream of tokens from source text.
///
/// Eager use goes through [`Lexer::tokenize`]; lazy use iterates the lexer,
/// which yields tokens (without the final `Eof`) until the input or the
/// first error is reached.
pub struct Lexer<'a> {
    /// The source text.
    text: &'a str,
    /// The source bytes (UTF-8).
    src: &'a [u8],
    dialect: &'a Dialect,
    /// Current byte offset into src.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    /// Set once `Eof` or an error has been produced.
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given SQL source text.
    #[must_use]
    pub fn new(source: &'a str, dialect: &'a Dialect) -> Self {
        Self {
            text: source,
            src: source.as_bytes(),
            dialect,
            pos: 0,
            line: 1,
            col: 1,
            finished: false,
        }
    }

    /// Tokenize the entire input into a Vec of tokens ending with `Eof`.
    pub fn tokenize(source: &str, dialect: &Dialect) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source, dialect);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tracing::trace!(target: "sqlscope.parse", tokens = tokens.len(), "tokenized");
        Ok(tokens)
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        let mark = self.mark();
        if self.pos >= self.src.len() {
            return Ok(self.finish(TokenKind::Eof, mark));
        }

        let ch = self.src[self.pos];
        let kind = match ch {
            // String literal (single-quoted)
            b'\'' => self.lex_string(b'\'', false, None, mark)?,

            // Double quote: identifier or string depending on the dialect
            b'"' => match self.dialect.double_quote {
                DoubleQuote::Identifier => self.lex_quoted_ident(b'"', b'"', mark)?,
                DoubleQuote::String => self.lex_string(b'"', false, None, mark)?,
            },

            b'`' if self.dialect.backtick_identifiers => self.lex_quoted_ident(b'`', b'`', mark)?,
            b'[' if self.dialect.bracket_identifiers => self.lex_quoted_ident(b'[', b']', mark)?,

            // Numbers
            b'0'..=b'9' => self.lex_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),

            // Prefixed strings (E'..', N'..', r"..", b'..') before identifiers
            _ if self.string_prefix_len().is_some() => self.lex_prefixed_string(mark)?,

            // Identifiers and keywords
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_identifier(),
            _ if ch >= 0x80 => self.lex_identifier(),

            // Bind parameters and dollar-quoted strings
            b'?' => self.lex_question(),
            b'@' => self.lex_at_param(),
            b'$' => self.lex_dollar(mark)?,
            b':' => self.lex_colon(),

            // Single-character operators and punctuation
            b'+' => self.single(TokenKind::Plus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b'&' => self.single(TokenKind::Ampersand),
            b'^' => self.single(TokenKind::Caret),
            b'~' => self.single(TokenKind::Tilde),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b'[' => self.single(TokenKind::LeftBracket),
            b']' => self.single(TokenKind::RightBracket),
            b'.' => self.single(TokenKind::Dot),

            // Multi-character operators
            b'-' => self.lex_minus_or_arrow(),
            b'<' => self.lex_lt(),
            b'>' => self.lex_gt(),
            b'=' => self.lex_eq(),
            b'!' => self.lex_bang(mark)?,
            b'|' => self.lex_pipe(),

            _ => {
                let c = self.text[self.pos..].chars().next().unwrap_or('?');
                return Err(self.error(format!("unexpected character '{c}'"), mark));
            }
        };

        Ok(self.finish(kind, mark))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn advance(&mut self) -> u8 {
        let ch = self.src[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // Continuation bytes of a multi-byte character do not move the column.
            self.col += 1;
        }
        ch
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            if self.pos >= self.src.len() {
                break;
            }
            self.advance();
        }
    }

    fn skip_to_end(&mut self) {
        self.advance_by(self.src.len() - self.pos);
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(&mut self, kind: TokenKind, mark: Mark) -> Token {
        if kind == TokenKind::Eof {
            self.finished = true;
        }
        Token {
            kind,
            span: Span::new(mark.pos as u32, self.pos as u32),
            line: mark.line,
            col: mark.col,
        }
    }

    fn error(&mut self, message: impl Into<String>, mark: Mark) -> LexError {
        self.finished = true;
        LexError {
            message: message.into(),
            offset: mark.pos,
            line: mark.line,
            col: mark.col,
        }
    }

    fn is_ident_byte(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' || ch >= 0x80
    }

    /// Skip whitespace and the dialect's comment forms.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.advance();
            }

            let Some(ch) = self.peek() else {
                return Ok(());
            };
            let next = self.peek_at(1);

            let line_comment = (ch == b'-' && next == Some(b'-'))
                || (ch == b'#' && self.dialect.hash_comments)
                || (ch == b'/' && next == Some(b'/') && self.dialect.double_slash_comments);
            if line_comment {
                let len = memchr(b'\n', &self.src[self.pos..]).unwrap_or(self.src.len() - self.pos);
                self.advance_by(len);
                continue;
            }

            if ch == b'/' && next == Some(b'*') {
                self.skip_block_comment()?;
                continue;
            }

            return Ok(());
        }
    }

    /// Skip `/* ... */`, nesting when the dialect allows it.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let mark = self.mark();
        self.advance_by(2);
        let mut depth = 1u32;
        while depth > 0 {
            let Some(offset) = memchr2(b'*', b'/', &self.src[self.pos..]) else {
                self.skip_to_end();
                return Err(self.error("unterminated block comment", mark));
            };
            self.advance_by(offset);
            let ch = self.advance();
            if ch == b'*' && self.peek() == Some(b'/') {
                self.advance();
                depth -= 1;
            } else if ch == b'/' && self.peek() == Some(b'*') && self.dialect.nested_block_comments
            {
                self.advance();
                depth += 1;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Literal tokenizers
    // -----------------------------------------------------------------------

    /// Lex a string literal opened by `quote`. Doubled quotes always escape;
    /// backslashes escape when the dialect allows it and the literal is not raw.
    fn lex_string(
        &mut self,
        quote: u8,
        raw: bool,
        prefix: Option<String>,
        mark: Mark,
    ) -> Result<TokenKind, LexError> {
        if self.dialect.triple_quoted_strings
            && self.peek_at(1) == Some(quote)
            && self.peek_at(2) == Some(quote)
        {
            return self.lex_triple_quoted(quote, prefix, mark);
        }

        self.advance(); // opening quote
        let backslash = self.dialect.backslash_escapes && !raw;
        let mut value = String::new();
        loop {
            let remaining = &self.src[self.pos..];
            let found = if backslash {
                memchr2(quote, b'\\', remaining)
            } else {
                memchr(quote, remaining)
            };
            let Some(offset) = found else {
                self.skip_to_end();
                return Err(self.error("unterminated string literal", mark));
            };
            value.push_str(&self.text[self.pos..self.pos + offset]);
            self.advance_by(offset);

            if self.advance() == b'\\' {
                let Some(escaped) = self.peek() else {
                    return Err(self.error("unterminated string literal", mark));
                };
                self.push_escape(&mut value, escaped);
                continue;
            }

            // Doubled-quote escape: '' -> '
            if self.peek() == Some(quote) {
                value.push(char::from(quote));
                self.advance();
            } else {
                return Ok(TokenKind::String { value, prefix });
            }
        }
    }

    /// Decode one backslash escape and consume the escaped character.
    fn push_escape(&mut self, value: &mut String, escaped: u8) {
        let decoded = match escaped {
            b'n' => Some('\n'),
            b't' => Some('\t'),
            b'r' => Some('\r'),
            b'0' => Some('\0'),
            b'b' => Some('\u{8}'),
            b'\\' | b'\'' | b'"' | b'`' => Some(char::from(escaped)),
            _ => None,
        };
        if let Some(c) = decoded {
            value.push(c);
            self.advance();
        } else {
            // Unknown escape: keep the character itself (possibly multi-byte).
            let c = self.text[self.pos..].chars().next().unwrap_or('\\');
            value.push(c);
            self.advance_by(c.len_utf8());
        }
    }

    /// Lex `'''...'''` or `"""..."""`.
    fn lex_triple_quoted(
        &mut self,
        quote: u8,
        prefix: Option<String>,
        mark: Mark,
    ) -> Result<TokenKind, LexError> {
        self.advance_by(3);
        let body_start = self.pos;
        loop {
            let Some(offset) = memchr(quote, &self.src[self.pos..]) else {
                self.skip_to_end();
                return Err(self.error("unterminated string literal", mark));
            };
            self.advance_by(offset);
            if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                let value = self.text[body_start..self.pos].to_owned();
                self.advance_by(3);
                return Ok(TokenKind::String { value, prefix });
            }
            self.advance();
        }
    }

    /// Length of a string prefix (`E`, `N`, `X`, `B`, `R`, `RB`, `BR`, `U&`)
    /// directly followed by a quote that opens a string, if any.
    fn string_prefix_len(&self) -> Option<usize> {
        let is_string_quote = |q: Option<u8>| {
            q == Some(b'\'')
                || (q == Some(b'"') && self.dialect.double_quote == DoubleQuote::String)
        };
        let c0 = self.peek()?.to_ascii_uppercase();
        let c1 = self.peek_at(1);
        match c0 {
            b'E' | b'N' | b'X' | b'B' | b'R' if is_string_quote(c1) => Some(1),
            b'R' | b'B'
                if c1.is_some_and(|c| matches!(c.to_ascii_uppercase(), b'R' | b'B'))
                    && c1.map(|c| c.to_ascii_uppercase()) != Some(c0)
                    && is_string_quote(self.peek_at(2)) =>
            {
                Some(2)
            }
            b'U' if c1 == Some(b'&') && is_string_quote(self.peek_at(2)) => Some(2),
            _ => None,
        }
    }

    fn lex_prefixed_string(&mut self, mark: Mark) -> Result<TokenKind, LexError> {
        let len = self.string_prefix_len().unwrap_or(0);
        let prefix = self.text[self.pos..self.pos + len].to_ascii_uppercase();
        self.advance_by(len);
        let quote = self.peek().unwrap_or(b'\'');
        let raw = prefix.contains('R');
        // E'...' always honors backslash escapes.
        if prefix == "E" && !self.dialect.backslash_escapes {
            return self.lex_escape_string(mark);
        }
        self.lex_string(quote, raw, Some(prefix), mark)
    }

    /// PostgreSQL `E'...'` in a dialect without default backslash escapes.
    fn lex_escape_string(&mut self, mark: Mark) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            let Some(offset) = memchr2(b'\'', b'\\', &self.src[self.pos..]) else {
                self.skip_to_end();
                return Err(self.error("unterminated string literal", mark));
            };
            value.push_str(&self.text[self.pos..self.pos + offset]);
            self.advance_by(offset);
            if self.advance() == b'\\' {
                let Some(escaped) = self.peek() else {
                    return Err(self.error("unterminated string literal", mark));
                };
                self.push_escape(&mut value, escaped);
            } else if self.peek() == Some(b'\'') {
                value.push('\'');
                self.advance();
            } else {
                return Ok(TokenKind::String {
                    value,
                    prefix: Some("E".to_owned()),
                });
            }
        }
    }

    /// Lex a quoted identifier. The closing delimiter doubled is an escape.
    fn lex_quoted_ident(&mut self, open: u8, close: u8, mark: Mark) -> Result<TokenKind, LexError> {
        self.advance(); // opening delimiter
        let mut value = String::new();
        loop {
            let Some(offset) = memchr(close, &self.src[self.pos..]) else {
                self.skip_to_end();
                return Err(self.error("unterminated quoted identifier", mark));
            };
            value.push_str(&self.text[self.pos..self.pos + offset]);
            self.advance_by(offset);
            self.advance(); // closing delimiter

            if self.peek() == Some(close) {
                value.push(char::from(close));
                self.advance();
            } else {
                return Ok(TokenKind::QuotedId(value, char::from(open)));
            }
        }
    }

    /// Lex a number: integer, hex integer, or decimal with optional exponent.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;

        if self.src[self.pos] == b'0' && self.peek_at(1).is_some_and(|c| c == b'x' || c == b'X') {
            self.advance_by(2);
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            return TokenKind::Number(self.text[start..self.pos].to_owned());
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part; `1.` is a number but `t.1col` style paths are not
        // split here since identifiers never start with a digit.
        if self.peek() == Some(b'.') && !self.peek_at(1).is_some_and(|c| c == b'.') {
            let after = self.peek_at(1);
            if after.is_some_and(|c| c.is_ascii_digit())
                || !after.is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
                || after.is_some_and(|c| c == b'e' || c == b'E')
            {
                self.advance();
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        // Exponent
        if self.peek().is_some_and(|c| c == b'e' || c == b'E') {
            let sign = usize::from(self.peek_at(1).is_some_and(|c| c == b'+' || c == b'-'));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.advance_by(1 + sign);
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        TokenKind::Number(self.text[start..self.pos].to_owned())
    }

    /// Lex an identifier or keyword.
    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance();
        while self.peek().is_some_and(Self::is_ident_byte) {
            self.advance();
        }
        let text = &self.text[start..self.pos];
        TokenKind::lookup_keyword(text).unwrap_or_else(|| TokenKind::Id(text.to_owned()))
    }

    /// Consume identifier bytes after a parameter sigil.
    fn take_param_name(&mut self, start: usize) -> TokenKind {
        while self.peek().is_some_and(Self::is_ident_byte) {
            self.advance();
        }
        TokenKind::Param(self.text[start..self.pos].to_owned())
    }

    /// Lex `?` or `?NNN`.
    fn lex_question(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        TokenKind::Param(self.text[start..self.pos].to_owned())
    }

    /// Lex `@name` or `@@name`.
    fn lex_at_param(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance();
        if self.peek() == Some(b'@') {
            self.advance();
        }
        self.take_param_name(start)
    }

    /// Lex `$1`, `$name`, or a dollar-quoted string `$$...$$` / `$tag$...$tag$`.
    fn lex_dollar(&mut self, mark: Mark) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let rest = &self.src[self.pos + 1..];
        let tag_len = rest
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
            .count();
        let tag_is_word = rest.first().is_none_or(|c| !c.is_ascii_digit());
        if rest.get(tag_len) == Some(&b'$') && tag_is_word {
            let delim_len = tag_len + 2;
            let delim = &self.text[start..start + delim_len];
            let body_start = start + delim_len;
            let Some(end) = self.text[body_start..].find(delim) else {
                self.skip_to_end();
                return Err(self.error("unterminated dollar-quoted string", mark));
            };
            let value = self.text[body_start..body_start + end].to_owned();
            self.advance_by(delim_len + end + delim_len);
            return Ok(TokenKind::String {
                value,
                prefix: None,
            });
        }
        self.advance();
        Ok(self.take_param_name(start))
    }

    /// Lex `::`, `:name`, or a bare `:`.
    fn lex_colon(&mut self) -> TokenKind {
        let start = self.pos;
        let prev = start.checked_sub(1).map(|i| self.src[i]);
        self.advance();
        if self.peek() == Some(b':') {
            self.advance();
            return TokenKind::DoubleColon;
        }
        let after_separator =
            prev.is_none_or(|c| c.is_ascii_whitespace() || matches!(c, b'(' | b',' | b'='));
        if after_separator && self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') {
            return self.take_param_name(start);
        }
        TokenKind::Colon
    }

    // -----------------------------------------------------------------------
    // Multi-character operator tokenizers
    // -----------------------------------------------------------------------

    /// Lex `-`, `->`, or `->>`.
    fn lex_minus_or_arrow(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'>') {
            self.advance();
            if self.peek() == Some(b'>') {
                self.advance();
                TokenKind::DoubleArrow
            } else {
                TokenKind::Arrow
            }
        } else {
            TokenKind::Minus
        }
    }

    /// Lex `<`, `<=`, `<=>`, `<>`, or `<<`.
    fn lex_lt(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => {
                self.advance();
                if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::Spaceship
                } else {
                    TokenKind::Le
                }
            }
            Some(b'>') => self.single(TokenKind::LtGt),
            Some(b'<') => self.single(TokenKind::ShiftLeft),
            _ => TokenKind::Lt,
        }
    }

    /// Lex `>`, `>=`, or `>>`.
    fn lex_gt(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Ge),
            Some(b'>') => self.single(TokenKind::ShiftRight),
            _ => TokenKind::Gt,
        }
    }

    /// Lex `=`, `==`, or `=>`.
    fn lex_eq(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => self.single(TokenKind::EqEq),
            Some(b'>') => self.single(TokenKind::FatArrow),
            _ => TokenKind::Eq,
        }
    }

    /// Lex `!=`.
    fn lex_bang(&mut self, mark: Mark) -> Result<TokenKind, LexError> {
        self.advance();
        if self.peek() == Some(b'=') {
            self.advance();
            Ok(TokenKind::Ne)
        } else {
            Err(self.error("unexpected character '!'", mark))
        }
    }

    /// Lex `|` or `||`.
    fn lex_pipe(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'|') {
            self.single(TokenKind::Concat)
        } else {
            TokenKind::Pipe
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(tok) if tok.kind == TokenKind::Eof => None,
            other => Some(other),
        }
    }
}
