//! Edit generation
//!
//! Diffs every whitespace run's existing text against its target and
//! emits a replacement only where they differ. Formatting an
//! already-formatted document therefore yields no edits.

use crate::stream::FormatTokenStream;

/// A whitespace-only replacement over the original document. Offsets are
/// byte positions into the snapshot the tokens were lexed from; edits
/// never overlap and may be applied in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

/// Collect the edits for a stream whose targets have been assigned.
/// Returned in document order.
pub(crate) fn edits_for(stream: &FormatTokenStream) -> Vec<TextEdit> {
    stream
        .tokens()
        .iter()
        .filter(|ft| ft.before.existing != ft.before.target)
        .map(|ft| {
            let span = ft.before.span();
            TextEdit {
                start: span.start,
                end: span.end,
                new_text: ft.before.target.clone(),
            }
        })
        .collect()
}

/// Apply a set of non-overlapping edits (in document order) to the
/// snapshot they were computed against
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.new_text);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatConfig;
    use crate::lexer::lex;
    use crate::walk;

    fn edits(source: &str) -> Vec<TextEdit> {
        let lexed = lex(source).unwrap();
        let mut stream = FormatTokenStream::build(&lexed.tokens);
        walk::assign_targets(&mut stream, &FormatConfig::default());
        edits_for(&stream)
    }

    #[test]
    fn test_no_edits_for_canonical_input() {
        assert!(edits("(foo 1 2)\n").is_empty());
    }

    #[test]
    fn test_edit_covers_only_whitespace() {
        let source = "(foo   1)\n";
        for edit in edits(source) {
            assert!(
                source[edit.start..edit.end]
                    .chars()
                    .all(|c| c.is_whitespace())
            );
        }
    }

    #[test]
    fn test_edits_are_ordered_and_disjoint() {
        let source = "(foo   1\n      2)";
        let edits = edits(source);
        assert!(!edits.is_empty());
        for pair in edits.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_apply_edits_splices() {
        let edits = vec![
            TextEdit {
                start: 4,
                end: 7,
                new_text: " ".to_string(),
            },
            TextEdit {
                start: 9,
                end: 9,
                new_text: "\n".to_string(),
            },
        ];
        assert_eq!(apply_edits("(foo   1)", &edits), "(foo 1)\n");
    }

    #[test]
    fn test_apply_edits_empty() {
        assert_eq!(apply_edits("(foo)\n", &[]), "(foo)\n");
    }
}
