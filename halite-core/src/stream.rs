//! Format token stream
//!
//! Pairs every semantic token with the whitespace run that precedes it.
//! Substituting each run's existing text back between the tokens
//! reconstructs the document exactly; the walker later fills in target
//! text and the edit generator diffs the two.

use crate::token::{Span, Token, TokenKind};

/// The whitespace run preceding one semantic token
#[derive(Debug, Clone)]
pub struct Whitespace {
    /// Byte offset where the run starts
    pub start: usize,
    /// Verbatim text from the source (possibly empty)
    pub existing: String,
    /// Computed replacement; contains only spaces, newlines and tabs
    pub target: String,
}

impl Whitespace {
    fn new(start: usize, existing: String) -> Self {
        let target = existing.clone();
        Self {
            start,
            existing,
            target,
        }
    }

    /// Byte range the run occupies in the original document
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start + self.existing.len())
    }
}

/// One semantic token plus its lead-in whitespace
#[derive(Debug, Clone)]
pub struct FormatToken {
    pub before: Whitespace,
    pub token: Token,
}

/// All format tokens for one document, in document order
#[derive(Debug)]
pub struct FormatTokenStream {
    tokens: Vec<FormatToken>,
}

impl FormatTokenStream {
    /// Build the stream from a lexed token sequence.
    ///
    /// Whitespace tokens are absorbed into the following semantic token's
    /// lead-in; adjacent semantic tokens get an empty run materialized at
    /// the boundary. The stream always ends with an end-of-input sentinel
    /// carrying any trailing whitespace, so end-of-file trimming is an
    /// ordinary edit.
    ///
    /// Panics if the token spans are not contiguous from offset zero:
    /// that is a caller contract violation, and continuing would corrupt
    /// the document.
    pub fn build(tokens: &[Token]) -> Self {
        let mut out = Vec::new();
        let mut pending: Option<Whitespace> = None;
        let mut cursor = 0usize;

        for token in tokens {
            assert_eq!(
                token.span.start, cursor,
                "token stream has a gap or overlap at byte {cursor}"
            );
            assert_eq!(
                token.span.len(),
                token.text.len(),
                "token span disagrees with its text at byte {cursor}"
            );
            cursor = token.span.end;

            if token.kind == TokenKind::Whitespace {
                match &mut pending {
                    Some(ws) => ws.existing.push_str(&token.text),
                    None => pending = Some(Whitespace::new(token.span.start, token.text.clone())),
                }
                continue;
            }

            let before = pending
                .take()
                .unwrap_or_else(|| Whitespace::new(token.span.start, String::new()));
            out.push(FormatToken {
                before,
                token: token.clone(),
            });
        }

        let before = pending
            .take()
            .unwrap_or_else(|| Whitespace::new(cursor, String::new()));
        out.push(FormatToken {
            before,
            token: Token::new(TokenKind::Eof, "", Span::new(cursor, cursor)),
        });

        Self { tokens: out }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, idx: usize) -> &FormatToken {
        &self.tokens[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut FormatToken {
        &mut self.tokens[idx]
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    /// Reconstruct the original document from existing whitespace and
    /// token text
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        for ft in &self.tokens {
            out.push_str(&ft.before.existing);
            out.push_str(&ft.token.text);
        }
        out
    }
}
