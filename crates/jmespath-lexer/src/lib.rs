//! Lexical analysis for JMESPath expressions
//!
//! Tokenizes expressions using logos. Token payloads (identifier names,
//! literal JSON, numbers) stay as source text and are decoded by the parser.

use logos::Logos;
use jmespath_ast::Span;

/// JMESPath tokens
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// Unquoted identifier: foo, _bar1
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    /// Quoted identifier with JSON escapes: "foo bar"
    #[regex(r#""([^"\\]|\\.)*""#)]
    QuotedIdentifier,

    /// Raw string literal: 'foo'
    #[regex(r"'([^'\\]|\\.)*'")]
    RawString,

    /// JSON literal: `{"a": 1}`
    #[regex(r"`([^`\\]|\\.)*`")]
    Literal,

    /// Signed integer used by indices and slices
    #[regex(r"-?[0-9]+")]
    Number,

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    /// Flatten projection ([])
    #[token("[]")]
    Flatten,

    /// Start of a filter projection ([?)
    #[token("[?")]
    Filter,

    #[token("[")]
    Lbracket,

    #[token("]")]
    Rbracket,

    #[token("{")]
    Lbrace,

    #[token("}")]
    Rbrace,

    #[token("(")]
    Lparen,

    #[token(")")]
    Rparen,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    /// Current node (@)
    #[token("@")]
    At,

    /// Expression reference (&)
    #[token("&")]
    Ampersand,

    #[token("|")]
    Pipe,

    #[token("||")]
    Or,

    #[token("&&")]
    And,

    #[token("!")]
    Not,

    #[token("==")]
    Eq,

    #[token("!=")]
    Ne,

    #[token("<")]
    Lt,

    #[token("<=")]
    Lte,

    #[token(">")]
    Gt,

    #[token(">=")]
    Gte,

    /// Whitespace (ignored)
    #[regex(r"[ \t\n\r]+", logos::skip)]
    Whitespace,

    /// End of input
    Eof,

    /// Lexer error
    Error,
}

impl Token {
    /// Human readable token name for error messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::QuotedIdentifier => "quoted identifier",
            Self::RawString => "raw string",
            Self::Literal => "literal",
            Self::Number => "number",
            Self::Dot => "'.'",
            Self::Star => "'*'",
            Self::Flatten => "'[]'",
            Self::Filter => "'[?'",
            Self::Lbracket => "'['",
            Self::Rbracket => "']'",
            Self::Lbrace => "'{'",
            Self::Rbrace => "'}'",
            Self::Lparen => "'('",
            Self::Rparen => "')'",
            Self::Comma => "','",
            Self::Colon => "':'",
            Self::At => "'@'",
            Self::Ampersand => "'&'",
            Self::Pipe => "'|'",
            Self::Or => "'||'",
            Self::And => "'&&'",
            Self::Not => "'!'",
            Self::Eq => "'=='",
            Self::Ne => "'!='",
            Self::Lt => "'<'",
            Self::Lte => "'<='",
            Self::Gt => "'>'",
            Self::Gte => "'>='",
            Self::Whitespace => "whitespace",
            Self::Eof => "end of expression",
            Self::Error => "invalid token",
        }
    }
}

/// Reasons a piece of input could not be tokenized
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unclosed \" delimiter")]
    UnclosedQuotedIdentifier,

    #[error("Unclosed ' delimiter")]
    UnclosedRawString,

    #[error("Unclosed ` delimiter")]
    UnclosedLiteral,

    #[error("Did you mean \"==\"?")]
    SingleEquals,

    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(String),
}

impl LexError {
    /// Classify the text of an error token
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.chars().next() {
            Some('"') => Self::UnclosedQuotedIdentifier,
            Some('\'') => Self::UnclosedRawString,
            Some('`') => Self::UnclosedLiteral,
            Some('=') => Self::SingleEquals,
            _ => Self::UnexpectedCharacter(text.to_string()),
        }
    }
}

/// Token with location information
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub text: String,
}

/// Lexer that produces tokens with spans
pub struct Lexer<'input> {
    lexer: logos::Lexer<'input, Token>,
    input: &'input str,
}

impl<'input> Lexer<'input> {
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self {
            lexer: Token::lexer(input),
            input,
        }
    }

    /// Get the next token with span information
    pub fn next_token(&mut self) -> SpannedToken {
        match self.lexer.next() {
            Some(Ok(token)) => self.spanned(token),
            Some(Err(())) => self.spanned(Token::Error),
            None => SpannedToken {
                token: Token::Eof,
                span: Span::new(self.input.len(), self.input.len()),
                text: String::new(),
            },
        }
    }

    fn spanned(&self, token: Token) -> SpannedToken {
        let span = self.lexer.span();
        let text = self.input.get(span.clone()).map_or_else(
            || String::from_utf8_lossy(&self.input.as_bytes()[span.clone()]).into_owned(),
            str::to_string,
        );
        SpannedToken {
            token,
            span: Span::new(span.start, span.end),
            text,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token == Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
