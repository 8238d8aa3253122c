//! Pest-backed lexer
//!
//! Produces the flat token sequence the formatter consumes. The grammar
//! is total, so lexing succeeds on arbitrary input; malformed literals
//! (unterminated strings, unterminated block comments) are surfaced as
//! diagnostics, not errors.

use pest::Parser;
use pest_derive::Parser;

use crate::diagnostic::Diagnostic;
use crate::token::{Span, Token, TokenKind};

#[derive(Parser)]
#[grammar = "halite.pest"]
struct LispLexer;

/// Error type for lexing
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Lex error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

impl From<pest::error::Error<Rule>> for LexError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        LexError::Syntax {
            line,
            column,
            message: err.variant.message().to_string(),
        }
    }
}

/// Lexer output: the token sequence plus literal diagnostics
#[derive(Debug)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex source text into a flat token sequence
pub fn lex(source: &str) -> Result<Lexed, LexError> {
    let pairs = LispLexer::parse(Rule::file, source)?;

    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for inner in pair.into_inner() {
            let span = Span::new(inner.as_span().start(), inner.as_span().end());
            let text = inner.as_str();

            let kind = match inner.as_rule() {
                Rule::EOI => continue,
                Rule::ws => TokenKind::Whitespace,
                Rule::line_comment => TokenKind::Comment,
                Rule::block_comment => {
                    if !block_comment_terminated(text) {
                        diagnostics
                            .push(Diagnostic::new(span.start, "unterminated block comment"));
                    }
                    TokenKind::Comment
                }
                Rule::string => {
                    if !string_terminated(text) {
                        diagnostics
                            .push(Diagnostic::new(span.start, "unterminated string literal"));
                    }
                    TokenKind::Str
                }
                Rule::char_lit => TokenKind::Symbol,
                Rule::quote_marker => TokenKind::QuoteMarker,
                Rule::open_paren => TokenKind::OpenParen,
                Rule::close_paren => TokenKind::CloseParen,
                Rule::symbol => TokenKind::Symbol,
                // Silent rules never produce pairs
                Rule::file
                | Rule::token
                | Rule::block_body
                | Rule::bar_escape
                | Rule::sym_char => unreachable!(),
            };

            tokens.push(Token::new(kind, text, span));
        }
    }

    Ok(Lexed {
        tokens,
        diagnostics,
    })
}

fn string_terminated(text: &str) -> bool {
    let mut chars = text.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return true,
            _ => {}
        }
    }
    false
}

fn block_comment_terminated(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"#|") {
            depth += 1;
            i += 2;
        } else if bytes[i..].starts_with(b"|#") {
            depth = depth.saturating_sub(1);
            i += 2;
        } else {
            i += 1;
        }
    }
    depth == 0
}
