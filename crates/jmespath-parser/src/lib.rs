//! Top-down operator precedence parser for JMESPath
//!
//! Consumes the logos token stream and builds a `Spanned<Ast>`. Each token
//! has a left binding power; `nud` handles tokens in prefix position and
//! `led` handles tokens that continue an expression to their left.

use jmespath_ast::{Ast, Comparator, JmespathError, KeyValuePair, Rcvar, Span, Spanned, Variable};
use jmespath_lexer::{LexError, Lexer, SpannedToken, Token};
use tracing::trace;

// Token text decoding
pub mod string_utils;

/// Result of parsing an expression
pub type ParseResult = Result<Spanned<Ast>, JmespathError>;

/// Tokens binding below this value end a projection's right hand side
const PROJECTION_STOP: usize = 10;

/// Deepest expression nesting and AST depth accepted
pub const MAX_DEPTH: usize = 128;

/// Left binding power of a token
const fn lbp(token: Token) -> usize {
    match token {
        Token::Pipe => 1,
        Token::Or => 2,
        Token::And => 3,
        Token::Eq | Token::Ne | Token::Lt | Token::Lte | Token::Gt | Token::Gte => 5,
        Token::Flatten => 9,
        Token::Star => 20,
        Token::Filter => 21,
        Token::Dot => 40,
        Token::Not => 45,
        Token::Lbrace => 50,
        Token::Lbracket => 55,
        Token::Lparen => 60,
        _ => 0,
    }
}

const fn comparator(token: Token) -> Option<Comparator> {
    match token {
        Token::Eq => Some(Comparator::Equal),
        Token::Ne => Some(Comparator::NotEqual),
        Token::Lt => Some(Comparator::LessThan),
        Token::Lte => Some(Comparator::LessThanEqual),
        Token::Gt => Some(Comparator::GreaterThan),
        Token::Gte => Some(Comparator::GreaterThanEqual),
        _ => None,
    }
}

/// Parse an expression into an AST
///
/// # Errors
///
/// Returns `JmespathError` with a parse reason for lexical or syntax errors
pub fn parse(expression: &str) -> ParseResult {
    Parser::new(expression)?.parse()
}

pub struct Parser {
    input: String,
    tokens: Vec<SpannedToken>,
    index: usize,
    last_end: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser for the given expression
    ///
    /// # Errors
    ///
    /// Returns `JmespathError` if there are lexical errors in the input
    pub fn new(input: &str) -> Result<Self, JmespathError> {
        let tokens = Lexer::new(input).tokenize();

        // Check for lexer errors
        if let Some(token) = tokens.iter().find(|token| token.token == Token::Error) {
            return Err(JmespathError::parse(
                input,
                token.span.start,
                LexError::from_text(&token.text).to_string(),
            ));
        }

        Ok(Self {
            input: input.to_string(),
            tokens,
            index: 0,
            last_end: 0,
            depth: 0,
        })
    }

    /// Parse the whole token stream into an AST
    ///
    /// # Errors
    ///
    /// Returns `JmespathError` if there are syntax errors or trailing tokens
    pub fn parse(&mut self) -> ParseResult {
        trace!(expression = %self.input, "parsing expression");
        self.index = 0;
        self.last_end = 0;
        self.depth = 0;

        let ast = self.expr(0)?;
        let next = self.peek(0);
        if next.token == Token::Eof {
            Ok(ast)
        } else {
            Err(self.error_at(
                next,
                format!("Unexpected {}, expected end of expression", next.token.name()),
            ))
        }
    }

    /// Get access to the original input
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Get access to the tokens (useful for debugging)
    #[must_use]
    pub fn tokens(&self) -> &[SpannedToken] {
        &self.tokens
    }

    fn expr(&mut self, rbp: usize) -> ParseResult {
        if self.depth >= MAX_DEPTH {
            return Err(self.nesting_error());
        }
        self.depth += 1;
        let result = self.expr_chain(rbp);
        self.depth -= 1;
        result
    }

    /// Left-associative chains grow the AST without recursing, so the
    /// depth of the node is checked after every step
    fn expr_chain(&mut self, rbp: usize) -> ParseResult {
        let mut left = self.nud()?;
        if deeper_than(&left, MAX_DEPTH) {
            return Err(self.nesting_error());
        }
        while rbp < lbp(self.peek_token(0)) {
            left = self.led(left)?;
            if deeper_than(&left, MAX_DEPTH) {
                return Err(self.nesting_error());
            }
        }
        Ok(left)
    }

    fn nesting_error(&self) -> JmespathError {
        self.error_at(self.peek(0), "Expression nested too deeply")
    }

    fn nud(&mut self) -> ParseResult {
        let token = self.advance();
        let start = token.span.start;
        match token.token {
            Token::At => Ok(self.finish(start, Ast::Identity)),
            Token::Identifier => Ok(self.finish(start, Ast::Field { name: token.text })),
            Token::QuotedIdentifier => {
                if self.peek_token(0) == Token::Lparen {
                    return Err(self.error_at(&token, "Quoted strings can't be a function name"));
                }
                let name = string_utils::unquote_identifier(&token.text)
                    .map_err(|err| self.error_at(&token, err.to_string()))?;
                Ok(self.finish(start, Ast::Field { name }))
            }
            Token::RawString => {
                let value = Variable::String(string_utils::unquote_raw_string(&token.text));
                Ok(self.finish(start, Ast::Literal { value: Rcvar::new(value) }))
            }
            Token::Literal => {
                let value = string_utils::parse_literal(&token.text)
                    .map_err(|err| self.error_at(&token, err.to_string()))?;
                Ok(self.finish(start, Ast::Literal { value: Rcvar::new(value) }))
            }
            Token::Star => {
                let lhs = self.finish(start, Ast::Identity);
                self.parse_wildcard_values(lhs)
            }
            Token::Flatten => {
                let lhs = self.finish(start, Ast::Identity);
                self.parse_flatten(lhs)
            }
            Token::Filter => {
                let lhs = self.finish(start, Ast::Identity);
                self.parse_filter(lhs)
            }
            Token::Lbracket => match self.peek_token(0) {
                Token::Number | Token::Colon => self.parse_index(start),
                Token::Star if self.peek_token(1) == Token::Rbracket => {
                    self.advance();
                    let lhs = self.finish(start, Ast::Identity);
                    self.parse_wildcard_index(lhs)
                }
                _ => self.parse_multi_list(start),
            },
            Token::Lbrace => self.parse_multi_hash(start),
            Token::Ampersand => {
                let ast = self.expr(lbp(Token::Ampersand))?;
                Ok(self.finish(start, Ast::Expref { ast: Box::new(ast) }))
            }
            Token::Not => {
                let node = self.expr(lbp(Token::Not))?;
                Ok(self.finish(start, Ast::Not { node: Box::new(node) }))
            }
            Token::Lparen => {
                let inner = self.expr(0)?;
                self.expect(Token::Rparen)?;
                Ok(inner)
            }
            _ => Err(self.error_at(&token, format!("Unexpected {}", token.token.name()))),
        }
    }

    fn led(&mut self, left: Spanned<Ast>) -> ParseResult {
        let start = left.span.start;
        let token = self.advance();
        match token.token {
            Token::Dot => {
                if self.peek_token(0) == Token::Star {
                    self.advance();
                    self.parse_wildcard_values(left)
                } else {
                    let rhs = self.parse_dot(lbp(Token::Dot))?;
                    Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::Subexpr { lhs, rhs }))
                }
            }
            Token::Lbracket => match self.peek_token(0) {
                Token::Number | Token::Colon => {
                    let rhs = self.parse_index(token.span.start)?;
                    Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::Subexpr { lhs, rhs }))
                }
                _ => {
                    self.expect(Token::Star)?;
                    self.parse_wildcard_index(left)
                }
            },
            Token::Flatten => self.parse_flatten(left),
            Token::Filter => self.parse_filter(left),
            Token::Or => {
                let rhs = self.expr(lbp(Token::Or))?;
                Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::Or { lhs, rhs }))
            }
            Token::And => {
                let rhs = self.expr(lbp(Token::And))?;
                Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::And { lhs, rhs }))
            }
            Token::Pipe => {
                let rhs = self.expr(lbp(Token::Pipe))?;
                Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::Subexpr { lhs, rhs }))
            }
            Token::Lparen => match left.node {
                Ast::Field { name } => {
                    let args = self.parse_list(Token::Rparen, true)?;
                    Ok(self.finish(start, Ast::Function { name, args }))
                }
                _ => Err(self.error_at(&token, "Invalid function name")),
            },
            kind => match comparator(kind) {
                Some(comparator) => {
                    let rhs = self.expr(lbp(kind))?;
                    Ok(self.binary(start, left, rhs, |lhs, rhs| Ast::Comparison {
                        comparator,
                        lhs,
                        rhs,
                    }))
                }
                None => Err(self.error_at(&token, format!("Unexpected {}", kind.name()))),
            },
        }
    }

    /// Parse the right hand side of a dot: `foo.<here>`
    fn parse_dot(&mut self, rbp: usize) -> ParseResult {
        match self.peek_token(0) {
            Token::Lbracket => {
                let start = self.advance().span.start;
                self.parse_multi_list(start)
            }
            Token::Identifier | Token::QuotedIdentifier | Token::Star | Token::Lbrace => {
                self.expr(rbp)
            }
            _ => Err(self.error_at(
                self.peek(0),
                "Expected identifier, '*', '{' or '[' after '.'",
            )),
        }
    }

    /// Parse what follows a projection, stopping at low binding tokens
    fn projection_rhs(&mut self, rbp: usize) -> ParseResult {
        match self.peek_token(0) {
            Token::Dot => {
                self.advance();
                self.parse_dot(rbp)
            }
            Token::Lbracket | Token::Filter => self.expr(rbp),
            token if lbp(token) < PROJECTION_STOP => {
                let at = self.last_end;
                Ok(Spanned::new(Ast::Identity, Span::new(at, at)))
            }
            _ => Err(self.error_at(self.peek(0), "Syntax error found in projection")),
        }
    }

    /// `[n]` or `[start:stop:step]`, called after the opening bracket
    fn parse_index(&mut self, start: usize) -> ParseResult {
        let mut parts = [None, None, None];
        let mut pos = 0;
        loop {
            let token = self.advance();
            match token.token {
                Token::Number => {
                    let value = string_utils::parse_number(&token.text)
                        .map_err(|err| self.error_at(&token, err.to_string()))?;
                    parts[pos] = Some(value);
                    if !matches!(self.peek_token(0), Token::Colon | Token::Rbracket) {
                        return Err(self.error_at(self.peek(0), "Expected ':' or ']'"));
                    }
                }
                Token::Rbracket => break,
                Token::Colon if pos >= 2 => {
                    return Err(self.error_at(&token, "Too many colons in slice expression"));
                }
                Token::Colon => {
                    pos += 1;
                    if !matches!(
                        self.peek_token(0),
                        Token::Number | Token::Colon | Token::Rbracket
                    ) {
                        return Err(self.error_at(self.peek(0), "Expected number, ':', or ']'"));
                    }
                }
                _ => return Err(self.error_at(&token, "Expected number, ':', or ']'")),
            }
        }

        if pos == 0 {
            let idx = parts[0].unwrap_or_default();
            Ok(self.finish(start, Ast::Index { idx }))
        } else {
            let slice = self.finish(
                start,
                Ast::Slice {
                    start: parts[0],
                    stop: parts[1],
                    step: parts[2].unwrap_or(1),
                },
            );
            let rhs = self.projection_rhs(lbp(Token::Star))?;
            Ok(self.binary(start, slice, rhs, |lhs, rhs| Ast::Projection { lhs, rhs }))
        }
    }

    /// `[*]`, called once the star has been consumed
    fn parse_wildcard_index(&mut self, lhs: Spanned<Ast>) -> ParseResult {
        self.expect(Token::Rbracket)?;
        let start = lhs.span.start;
        let rhs = self.projection_rhs(lbp(Token::Star))?;
        Ok(self.binary(start, lhs, rhs, |lhs, rhs| Ast::Projection { lhs, rhs }))
    }

    /// `*` and `.*`, called once the star has been consumed
    fn parse_wildcard_values(&mut self, lhs: Spanned<Ast>) -> ParseResult {
        let start = lhs.span.start;
        let values = self.finish(start, Ast::ObjectValues { node: Box::new(lhs) });
        let rhs = self.projection_rhs(lbp(Token::Star))?;
        Ok(self.binary(start, values, rhs, |lhs, rhs| Ast::Projection { lhs, rhs }))
    }

    fn parse_flatten(&mut self, lhs: Spanned<Ast>) -> ParseResult {
        let start = lhs.span.start;
        let flattened = self.finish(start, Ast::Flatten { node: Box::new(lhs) });
        let rhs = self.projection_rhs(lbp(Token::Flatten))?;
        Ok(self.binary(start, flattened, rhs, |lhs, rhs| Ast::Projection { lhs, rhs }))
    }

    /// `[?predicate]`, called once `[?` has been consumed
    fn parse_filter(&mut self, lhs: Spanned<Ast>) -> ParseResult {
        let start = lhs.span.start;
        let predicate = self.expr(0)?;
        self.expect(Token::Rbracket)?;
        let then = self.projection_rhs(lbp(Token::Filter))?;
        let condition_start = predicate.span.start;
        let condition = self.binary(condition_start, predicate, then, |predicate, then| {
            Ast::Condition { predicate, then }
        });
        Ok(self.binary(start, lhs, condition, |lhs, rhs| Ast::Projection { lhs, rhs }))
    }

    fn parse_multi_list(&mut self, start: usize) -> ParseResult {
        let elements = self.parse_list(Token::Rbracket, false)?;
        Ok(self.finish(start, Ast::MultiList { elements }))
    }

    fn parse_multi_hash(&mut self, start: usize) -> ParseResult {
        let mut elements = Vec::new();
        loop {
            let key_token = self.advance();
            if !matches!(key_token.token, Token::Identifier | Token::QuotedIdentifier) {
                return Err(self.error_at(&key_token, "Expected key for multi-select hash"));
            }
            let key = string_utils::identifier_name(&key_token)
                .map_err(|err| self.error_at(&key_token, err.to_string()))?;
            self.expect(Token::Colon)?;
            let value = self.expr(0)?;
            elements.push(KeyValuePair { key, value });

            let token = self.advance();
            match token.token {
                Token::Rbrace => break,
                Token::Comma => {}
                _ => return Err(self.error_at(&token, "Expected ',' or '}'")),
            }
        }
        Ok(self.finish(start, Ast::MultiHash { elements }))
    }

    /// Comma separated expressions terminated by `closing`
    fn parse_list(
        &mut self,
        closing: Token,
        allow_empty: bool,
    ) -> Result<Vec<Spanned<Ast>>, JmespathError> {
        let mut nodes = Vec::new();
        if allow_empty && self.peek_token(0) == closing {
            self.advance();
            return Ok(nodes);
        }
        loop {
            nodes.push(self.expr(0)?);
            let token = self.advance();
            if token.token == closing {
                return Ok(nodes);
            }
            if token.token != Token::Comma {
                return Err(self.error_at(
                    &token,
                    format!("Expected ',' or {}", closing.name()),
                ));
            }
            if self.peek_token(0) == closing {
                return Err(self.error_at(self.peek(0), "Invalid token after ','"));
            }
        }
    }

    fn binary(
        &self,
        start: usize,
        lhs: Spanned<Ast>,
        rhs: Spanned<Ast>,
        build: impl FnOnce(Box<Spanned<Ast>>, Box<Spanned<Ast>>) -> Ast,
    ) -> Spanned<Ast> {
        let node = build(Box::new(lhs), Box::new(rhs));
        self.finish(start, node)
    }

    /// Wrap a node spanning from `start` to the last consumed token
    fn finish(&self, start: usize, node: Ast) -> Spanned<Ast> {
        Spanned::new(node, Span::new(start, self.last_end.max(start)))
    }

    fn expect(&mut self, expected: Token) -> Result<SpannedToken, JmespathError> {
        let token = self.advance();
        if token.token == expected {
            Ok(token)
        } else {
            Err(self.error_at(
                &token,
                format!("Expected {}, found {}", expected.name(), token.token.name()),
            ))
        }
    }

    fn peek(&self, offset: usize) -> &SpannedToken {
        // The token stream always ends with Eof
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + offset).min(last)]
    }

    fn peek_token(&self, offset: usize) -> Token {
        self.peek(offset).token
    }

    fn advance(&mut self) -> SpannedToken {
        let token = self.peek(0).clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        if token.token != Token::Eof {
            self.last_end = token.span.end;
        }
        token
    }

    fn error_at(&self, token: &SpannedToken, message: impl Into<String>) -> JmespathError {
        JmespathError::parse(&self.input, token.span.start, message)
    }
}

/// Whether `node` is more than `limit` levels deep
fn deeper_than(node: &Spanned<Ast>, limit: usize) -> bool {
    let Some(limit) = limit.checked_sub(1) else {
        return true;
    };
    match &node.node {
        Ast::Identity
        | Ast::Field { .. }
        | Ast::Index { .. }
        | Ast::Slice { .. }
        | Ast::Literal { .. } => false,
        Ast::Subexpr { lhs, rhs }
        | Ast::Projection { lhs, rhs }
        | Ast::Comparison { lhs, rhs, .. }
        | Ast::And { lhs, rhs }
        | Ast::Or { lhs, rhs }
        | Ast::Condition {
            predicate: lhs,
            then: rhs,
        } => deeper_than(lhs, limit) || deeper_than(rhs, limit),
        Ast::ObjectValues { node }
        | Ast::Flatten { node }
        | Ast::Not { node }
        | Ast::Expref { ast: node } => deeper_than(node, limit),
        Ast::MultiList { elements } | Ast::Function { args: elements, .. } => {
            elements.iter().any(|element| deeper_than(element, limit))
        }
        Ast::MultiHash { elements } => elements
            .iter()
            .any(|pair| deeper_than(&pair.value, limit)),
    }
}
