//! Formatting entry points
//!
//! `format_tokens` is the core contract: a token sequence in, a list of
//! whitespace-only edits plus diagnostics out. `format` and
//! `needs_format` are text-level conveniences built on the lexer.

use crate::config::FormatConfig;
use crate::diagnostic::Diagnostic;
use crate::edit::{self, TextEdit};
use crate::lexer::{self, LexError};
use crate::stream::FormatTokenStream;
use crate::token::Token;
use crate::walk;

/// Result of a token-level pass: edits over the original coordinate
/// space plus any structural diagnostics
#[derive(Debug)]
pub struct FormatOutcome {
    pub edits: Vec<TextEdit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a text-level pass
#[derive(Debug)]
pub struct FormatResult {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Format a token sequence. Unbalanced structure degrades to best-effort
/// edits plus diagnostics; this function does not fail.
///
/// Panics if the token spans are inconsistent (not contiguous from
/// offset zero) - that is a caller contract violation.
pub fn format_tokens(tokens: &[Token], config: &FormatConfig) -> FormatOutcome {
    let mut stream = FormatTokenStream::build(tokens);
    let diagnostics = walk::assign_targets(&mut stream, config);
    FormatOutcome {
        edits: edit::edits_for(&stream),
        diagnostics,
    }
}

/// Format source text, returning the formatted document and any
/// diagnostics for malformed input
pub fn format(source: &str, config: &FormatConfig) -> Result<FormatResult, LexError> {
    let lexed = lexer::lex(source)?;
    let mut outcome = format_tokens(&lexed.tokens, config);

    let mut diagnostics = lexed.diagnostics;
    diagnostics.append(&mut outcome.diagnostics);
    diagnostics.sort_by_key(|d| d.offset);

    Ok(FormatResult {
        text: edit::apply_edits(source, &outcome.edits),
        diagnostics,
    })
}

/// Check if source text needs formatting
pub fn needs_format(source: &str, config: &FormatConfig) -> Result<bool, LexError> {
    let lexed = lexer::lex(source)?;
    Ok(!format_tokens(&lexed.tokens, config).edits.is_empty())
}
