//! Halite Core
//!
//! Structural formatter core for Lisp source files. Nesting is
//! reconstructed from a flat token stream; formatting assigns every
//! inter-token whitespace run a canonical target and emits the minimal
//! whitespace-only edits that differ from the source, so editor
//! integrations can apply them incrementally. Non-whitespace content is
//! never altered.
//!
//! A formatting pass is synchronous and keeps all state local to the
//! pass, so independent documents may be formatted concurrently; the
//! policy table is read-only once built.
//!
//! # Example
//!
//! ```
//! use halite_core::{FormatConfig, format};
//!
//! let source = "(defun greet (name)\n(format t \"hello ~a\" name))\n";
//! let config = FormatConfig::default();
//! let result = format(source, &config).unwrap();
//!
//! assert_eq!(
//!     result.text,
//!     "(defun greet (name)\n  (format t \"hello ~a\" name))\n"
//! );
//! ```

pub mod config;
pub mod diagnostic;
pub mod edit;
pub mod format;
pub mod lexer;
pub mod policy;
pub mod stream;
pub mod token;
mod walk;

pub use config::{CloseParenPlacement, FormatConfig};
pub use diagnostic::Diagnostic;
pub use edit::{TextEdit, apply_edits};
pub use format::{FormatOutcome, FormatResult, format, format_tokens, needs_format};
pub use lexer::{LexError, Lexed, lex};
pub use policy::{IndentRule, IndentStyle, PolicyTable};
pub use token::{Span, Token, TokenKind};
