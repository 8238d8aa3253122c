//! Structural formatter
//!
//! Reconstructs nesting from the flat stream by walking an index over it
//! (one recursion level per open delimiter, no shared cursor state) and
//! assigns a target to every whitespace run. Columns are tracked against
//! the formatted layout, not the source, so alignment composes when
//! outer levels move.

use crate::config::{CloseParenPlacement, FormatConfig};
use crate::diagnostic::Diagnostic;
use crate::policy::{IndentRule, IndentStyle};
use crate::stream::FormatTokenStream;
use crate::token::TokenKind;

/// Assign a target to every whitespace run in the stream. Returns the
/// diagnostics for unbalanced structure; the stream is always fully
/// processed.
pub(crate) fn assign_targets(
    stream: &mut FormatTokenStream,
    config: &FormatConfig,
) -> Vec<Diagnostic> {
    let (matched, mut diagnostics) = match_delimiters(stream);
    if !diagnostics.is_empty() {
        log::debug!(
            "structure is unbalanced: {} delimiter diagnostic(s)",
            diagnostics.len()
        );
    }

    let mut walker = Walker {
        stream,
        config,
        matched,
        column: 0,
        glue: None,
        after_line_comment: false,
    };
    walker.run();

    diagnostics.sort_by_key(|d| d.offset);
    diagnostics
}

/// Pair open and close delimiters ahead of the walk, so unmatched opens
/// are known when their frame is entered
fn match_delimiters(stream: &FormatTokenStream) -> (Vec<Option<usize>>, Vec<Diagnostic>) {
    let mut matched = vec![None; stream.len()];
    let mut opens: Vec<usize> = Vec::new();
    let mut diagnostics = Vec::new();

    for (idx, ft) in stream.tokens().iter().enumerate() {
        match ft.token.kind {
            TokenKind::OpenParen => opens.push(idx),
            TokenKind::CloseParen => match opens.pop() {
                Some(open) => {
                    matched[open] = Some(idx);
                    matched[idx] = Some(open);
                }
                None => diagnostics.push(Diagnostic::new(
                    ft.token.span.start,
                    "unmatched closing delimiter",
                )),
            },
            _ => {}
        }
    }

    for open in opens {
        diagnostics.push(Diagnostic::new(
            stream.get(open).token.span.start,
            "unterminated form; expected a closing delimiter",
        ));
    }

    (matched, diagnostics)
}

/// Marker glue: a quote marker attaches to the following form. Data
/// markers also suppress operator lookup in the form they quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glue {
    Data,
    Code,
}

/// One open nesting level
#[derive(Debug)]
struct Frame {
    document: bool,
    /// Output column of the opening delimiter
    open_col: usize,
    /// Column for argument-aligned positions
    align_col: usize,
    rule: IndentRule,
    /// Sub-forms seen so far at this level; the operator is sub-form 0
    subforms: usize,
    /// No semantic token has been placed inside this level yet
    just_opened: bool,
    /// A newline has been emitted inside this level
    multiline: bool,
    /// The opening delimiter has no matching close
    unbalanced: bool,
    /// Elements are binding pairs (the binding list of a `let`-like form)
    binding_list: bool,
    /// First element is data, not an operator
    no_operator: bool,
}

impl Frame {
    fn document() -> Self {
        Self {
            document: true,
            open_col: 0,
            align_col: 0,
            rule: IndentRule::aligned(),
            subforms: 0,
            just_opened: true,
            multiline: false,
            unbalanced: false,
            binding_list: false,
            no_operator: true,
        }
    }

    fn list(open_col: usize, align_col: usize) -> Self {
        Self {
            document: false,
            open_col,
            align_col,
            rule: IndentRule::aligned(),
            subforms: 0,
            just_opened: true,
            multiline: false,
            unbalanced: false,
            binding_list: false,
            no_operator: false,
        }
    }
}

struct Walker<'a> {
    stream: &'a mut FormatTokenStream,
    config: &'a FormatConfig,
    matched: Vec<Option<usize>>,
    /// Output column after the last placed text
    column: usize,
    /// Set by a quote marker; glues the next token to it
    glue: Option<Glue>,
    /// The previous semantic token was a line comment, which pins the
    /// next token to a fresh line
    after_line_comment: bool,
}

impl Walker<'_> {
    fn run(&mut self) {
        let mut document = Frame::document();
        let end = self.walk_level(0, &mut document, None);
        debug_assert_eq!(end, self.stream.len());
    }

    /// Process tokens at one nesting level, starting at `start`, until
    /// the close matching `open_idx` (or end of stream). Returns the
    /// index just past the level.
    fn walk_level(&mut self, start: usize, frame: &mut Frame, open_idx: Option<usize>) -> usize {
        let mut idx = start;
        while idx < self.stream.len() {
            match self.stream.get(idx).token.kind {
                TokenKind::Eof => {
                    self.place_eof(idx);
                    idx += 1;
                }
                TokenKind::CloseParen => {
                    if open_idx.is_some() && self.matched[idx] == open_idx {
                        self.place_close(idx, frame);
                        return idx + 1;
                    }
                    self.place_stray_close(idx, frame);
                    idx += 1;
                }
                TokenKind::OpenParen => idx = self.enter_form(idx, frame),
                TokenKind::QuoteMarker => {
                    self.place_marker(idx, frame);
                    idx += 1;
                }
                TokenKind::Comment => {
                    self.place_comment(idx, frame);
                    idx += 1;
                }
                TokenKind::Symbol | TokenKind::Str => {
                    self.place_atom(idx, frame);
                    idx += 1;
                }
                TokenKind::Whitespace => unreachable!("whitespace is absorbed by the builder"),
            }
        }
        idx
    }

    fn place_atom(&mut self, idx: usize, frame: &mut Frame) {
        let glued = self.glue.take().is_some();
        let position = frame.subforms;
        self.place_lead(idx, frame, position, glued);

        let operator_rule = {
            let token = &self.stream.get(idx).token;
            let is_operator =
                position == 0 && !glued && !frame.no_operator && token.kind == TokenKind::Symbol;
            is_operator.then(|| self.config.policy.rule(&token.text))
        };
        self.advance_over_token(idx, frame);
        if let Some(rule) = operator_rule {
            frame.rule = rule;
            frame.align_col = self.column + 1;
        }
        if !glued {
            frame.subforms += 1;
        }
        self.after_line_comment = false;
    }

    fn place_marker(&mut self, idx: usize, frame: &mut Frame) {
        let glued = self.glue.take().is_some();
        let position = frame.subforms;
        self.place_lead(idx, frame, position, glued);
        self.advance_over_token(idx, frame);
        if !glued {
            frame.subforms += 1;
        }
        self.glue = Some(match self.stream.get(idx).token.text.as_str() {
            "," | ",@" => Glue::Code,
            _ => Glue::Data,
        });
        self.after_line_comment = false;
    }

    fn place_comment(&mut self, idx: usize, frame: &mut Frame) {
        // takes the indentation of the position it occupies, but never
        // advances the sub-form counter or consumes marker glue
        let position = frame.subforms;
        self.place_lead(idx, frame, position, false);
        self.advance_over_token(idx, frame);
        self.after_line_comment = self.stream.get(idx).token.is_line_comment();
    }

    fn enter_form(&mut self, idx: usize, parent: &mut Frame) -> usize {
        let glue = self.glue.take();
        let glued = glue.is_some();
        let position = parent.subforms;
        self.place_lead(idx, parent, position, glued);

        let open_col = self.column;
        self.advance_over_token(idx, parent);
        let align_col = self.column;
        if !glued {
            parent.subforms += 1;
        }
        self.after_line_comment = false;

        let mut child = Frame::list(open_col, align_col);
        child.unbalanced = self.matched[idx].is_none();
        if parent.binding_list {
            child.rule = IndentRule::binding_pair();
            child.no_operator = true;
        } else if parent.rule.binding_list && position == 1 && !glued {
            child.binding_list = true;
            child.no_operator = true;
        }
        if glue == Some(Glue::Data) || self.stream.get(idx).token.text == "#(" {
            child.no_operator = true;
        }

        let next = self.walk_level(idx + 1, &mut child, Some(idx));
        parent.multiline |= child.multiline;
        next
    }

    fn place_close(&mut self, idx: usize, frame: &mut Frame) {
        self.glue = None;
        let newlines = count_newlines(&self.stream.get(idx).before.existing);
        let pinned = self.after_line_comment && newlines > 0;

        let target = if frame.just_opened {
            String::new()
        } else {
            match self.config.close_paren_own_line {
                CloseParenPlacement::Never if !pinned => String::new(),
                CloseParenPlacement::Multiline if !frame.multiline && !pinned => String::new(),
                _ => own_line(frame.open_col),
            }
        };

        self.set_target(idx, frame, target);
        self.advance_over_token(idx, frame);
        frame.just_opened = false;
        self.after_line_comment = false;
    }

    fn place_stray_close(&mut self, idx: usize, frame: &mut Frame) {
        // unmatched close: keep its line position, normalize same-line
        // spacing only
        self.glue = None;
        let existing = &self.stream.get(idx).before.existing;
        let target = if count_newlines(existing) == 0 {
            String::new()
        } else {
            existing.clone()
        };
        self.set_target(idx, frame, target);
        self.advance_over_token(idx, frame);
        frame.just_opened = false;
        self.after_line_comment = false;
    }

    fn place_eof(&mut self, idx: usize) {
        self.glue = None;
        let has_content = idx > 0;
        let target = if has_content && self.config.trailing_newline {
            "\n".to_string()
        } else {
            String::new()
        };
        self.stream.get_mut(idx).before.target = target;
    }

    /// Assign the whitespace target in front of a non-close token
    fn place_lead(&mut self, idx: usize, frame: &mut Frame, position: usize, glued: bool) {
        let newlines = count_newlines(&self.stream.get(idx).before.existing);
        let pinned = self.after_line_comment && newlines > 0;

        let target = if frame.document && frame.just_opened {
            // nothing before the first top-level token
            String::new()
        } else if glued && !pinned {
            String::new()
        } else if newlines == 0 {
            if frame.just_opened {
                String::new()
            } else {
                " ".to_string()
            }
        } else if frame.unbalanced {
            // minimal treatment inside an unterminated form: keep the
            // author's line layout untouched
            self.stream.get(idx).before.existing.clone()
        } else {
            let keep = newlines.min(self.config.max_blank_lines + 1);
            let col = self.indent_col(frame, position);
            let mut text = "\n".repeat(keep);
            text.push_str(&" ".repeat(col));
            text
        };

        self.set_target(idx, frame, target);
        frame.just_opened = false;
    }

    /// Indentation column for a sub-form (or comment) at `position`
    /// within `frame`, for a token starting on a fresh line
    fn indent_col(&self, frame: &Frame, position: usize) -> usize {
        if frame.document {
            return 0;
        }
        if frame.binding_list || position <= frame.rule.header_arity {
            return frame.align_col;
        }
        match frame.rule.style {
            IndentStyle::ArgumentAligned => frame.align_col,
            IndentStyle::BodyIndent => frame.open_col + self.config.indent_size,
            IndentStyle::FixedOffset(offset) => frame.open_col + offset,
        }
    }

    fn set_target(&mut self, idx: usize, frame: &mut Frame, target: String) {
        match target.rsplit_once('\n') {
            Some((_, tail)) => {
                frame.multiline = true;
                self.column = tail.chars().count();
            }
            None => self.column += target.chars().count(),
        }
        self.stream.get_mut(idx).before.target = target;
    }

    fn advance_over_token(&mut self, idx: usize, frame: &mut Frame) {
        let text = &self.stream.get(idx).token.text;
        match text.rsplit_once('\n') {
            Some((_, tail)) => {
                frame.multiline = true;
                self.column = tail.chars().count();
            }
            None => self.column += text.chars().count(),
        }
    }
}

fn own_line(col: usize) -> String {
    let mut text = String::from("\n");
    text.push_str(&" ".repeat(col));
    text
}

fn count_newlines(text: &str) -> usize {
    let lf = text.matches('\n').count();
    // a bare carriage return still separates lines
    if lf == 0 && text.contains('\r') { 1 } else { lf }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn formatted(source: &str, config: &FormatConfig) -> (String, Vec<Diagnostic>) {
        let lexed = lex(source).unwrap();
        let mut stream = FormatTokenStream::build(&lexed.tokens);
        let diagnostics = assign_targets(&mut stream, config);
        let mut out = String::new();
        for ft in stream.tokens() {
            out.push_str(&ft.before.target);
            out.push_str(&ft.token.text);
        }
        (out, diagnostics)
    }

    fn fmt(source: &str) -> String {
        formatted(source, &FormatConfig::default()).0
    }

    #[test]
    fn test_same_line_spacing_is_single_space() {
        assert_eq!(fmt("(foo   1    2)"), "(foo 1 2)\n");
    }

    #[test]
    fn test_no_space_after_open_delimiter() {
        assert_eq!(fmt("(  foo)"), "(foo)\n");
    }

    #[test]
    fn test_argument_alignment_under_first_argument() {
        assert_eq!(fmt("(foo bar\nbaz)"), "(foo bar\n     baz)\n");
    }

    #[test]
    fn test_body_indent_for_defun() {
        assert_eq!(
            fmt("(defun foo (x)\n(bar x))"),
            "(defun foo (x)\n  (bar x))\n"
        );
    }

    #[test]
    fn test_nested_body_indent_composes() {
        assert_eq!(
            fmt("(defun foo (x)\n(when x\n(bar x)))"),
            "(defun foo (x)\n  (when x\n    (bar x)))\n"
        );
    }

    #[test]
    fn test_let_binding_list_alignment() {
        assert_eq!(
            fmt("(let ((a 1)\n(b 2))\n(use a b))"),
            "(let ((a 1)\n      (b 2))\n  (use a b))\n"
        );
    }

    #[test]
    fn test_binding_pair_is_mini_body_region() {
        assert_eq!(fmt("(let ((a\n1))\na)"), "(let ((a\n        1))\n  a)\n");
    }

    #[test]
    fn test_fixed_offset_for_if() {
        assert_eq!(
            fmt("(if (test)\n(then)\n(else))"),
            "(if (test)\n    (then)\n    (else))\n"
        );
    }

    #[test]
    fn test_quote_marker_glues_to_form() {
        assert_eq!(fmt("(foo ' bar)"), "(foo 'bar)\n");
    }

    #[test]
    fn test_quoted_list_is_not_operator_led() {
        // data lists align under the first element even when the head is
        // a known operator
        assert_eq!(fmt("'(defun a\nb)"), "'(defun a\n  b)\n");
    }

    #[test]
    fn test_unquoted_form_keeps_operator_rules() {
        assert_eq!(fmt("`(a ,(when x\n(f)))"), "`(a ,(when x\n       (f)))\n");
    }

    #[test]
    fn test_vector_aligns_under_first_element() {
        assert_eq!(fmt("#(1 2\n3)"), "#(1 2\n  3)\n");
    }

    #[test]
    fn test_blank_lines_clamped() {
        assert_eq!(fmt("(a)\n\n\n\n(b)"), "(a)\n\n(b)\n");
    }

    #[test]
    fn test_close_paren_pulled_onto_previous_line() {
        assert_eq!(fmt("(foo bar\n)"), "(foo bar)\n");
    }

    #[test]
    fn test_close_paren_not_joined_across_line_comment() {
        assert_eq!(fmt("(foo ; trailing\n)"), "(foo ; trailing\n)\n");
    }

    #[test]
    fn test_close_paren_multiline_placement() {
        let config = FormatConfig {
            close_paren_own_line: CloseParenPlacement::Multiline,
            ..Default::default()
        };
        assert_eq!(
            formatted("(foo bar\nbaz)", &config).0,
            "(foo bar\n     baz\n)\n"
        );
        // single-line forms keep the close on the same line
        assert_eq!(formatted("(foo bar)", &config).0, "(foo bar)\n");
    }

    #[test]
    fn test_close_paren_always_placement() {
        let config = FormatConfig {
            close_paren_own_line: CloseParenPlacement::Always,
            ..Default::default()
        };
        assert_eq!(formatted("(foo bar)", &config).0, "(foo bar\n)\n");
        // empty forms stay together
        assert_eq!(formatted("()", &config).0, "()\n");
    }

    #[test]
    fn test_comment_indents_with_body() {
        assert_eq!(
            fmt("(defun foo ()\n;; does things\n(bar))"),
            "(defun foo ()\n  ;; does things\n  (bar))\n"
        );
    }

    #[test]
    fn test_unmatched_close_reported_and_kept() {
        let (out, diagnostics) = formatted("(foo) )", &FormatConfig::default());
        assert_eq!(out, "(foo))\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unmatched closing"));
        assert_eq!(diagnostics[0].offset, 6);
    }

    #[test]
    fn test_unterminated_form_formats_balanced_region() {
        let (out, diagnostics) = formatted("(foo (bar   1)", &FormatConfig::default());
        // the inner balanced form is normalized; the unterminated outer
        // level only gets same-line spacing fixed
        assert_eq!(out, "(foo (bar 1)\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unterminated form"));
        assert_eq!(diagnostics[0].offset, 0);
    }

    #[test]
    fn test_unterminated_form_keeps_author_line_layout() {
        let (out, diagnostics) = formatted("(foo\n      bar\n", &FormatConfig::default());
        assert_eq!(out, "(foo\n      bar\n");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_leading_blank_lines_removed() {
        assert_eq!(fmt("\n\n(foo)"), "(foo)\n");
    }

    #[test]
    fn test_multiline_string_interior_untouched() {
        assert_eq!(
            fmt("(foo \"a\n   b\"   bar)"),
            "(foo \"a\n   b\" bar)\n"
        );
    }

    #[test]
    fn test_alignment_after_multiline_string() {
        // the column restarts inside the string's last line
        assert_eq!(fmt("(f \"x\ny\"\nz)"), "(f \"x\ny\"\n   z)\n");
    }
}
