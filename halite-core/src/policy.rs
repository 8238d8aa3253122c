//! Indentation policy table
//!
//! Maps operator names to indentation rules. The walker consults this
//! table when the first element of a list is a symbol; operators not in
//! the table fall back to argument alignment, so lookup is total.

use std::collections::HashMap;

/// How sub-forms past the header are indented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    /// Body sub-forms sit `indent_size` columns from the form's opening
    /// delimiter, regardless of where the header arguments ended up
    BodyIndent,
    /// Sub-forms align under the column immediately following the
    /// operator symbol (conventional call-style indentation)
    ArgumentAligned,
    /// Like `BodyIndent` with an explicit per-operator offset
    FixedOffset(usize),
}

/// Indentation rule for one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentRule {
    /// Sub-forms after the operator that are header positions (aligned,
    /// not body-indented)
    pub header_arity: usize,
    pub style: IndentStyle,
    /// The first header argument is a list of binding pairs; each pair
    /// is treated as a mini body-indent region
    pub binding_list: bool,
}

impl IndentRule {
    pub const fn body(header_arity: usize) -> Self {
        Self {
            header_arity,
            style: IndentStyle::BodyIndent,
            binding_list: false,
        }
    }

    pub const fn body_with_bindings(header_arity: usize) -> Self {
        Self {
            header_arity,
            style: IndentStyle::BodyIndent,
            binding_list: true,
        }
    }

    pub const fn fixed(header_arity: usize, offset: usize) -> Self {
        Self {
            header_arity,
            style: IndentStyle::FixedOffset(offset),
            binding_list: false,
        }
    }

    pub const fn aligned() -> Self {
        Self {
            header_arity: 0,
            style: IndentStyle::ArgumentAligned,
            binding_list: false,
        }
    }

    /// Implicit rule for a binding pair inside a binding list: everything
    /// after the variable is body
    pub const fn binding_pair() -> Self {
        Self {
            header_arity: 0,
            style: IndentStyle::BodyIndent,
            binding_list: false,
        }
    }
}

impl Default for IndentRule {
    fn default() -> Self {
        Self::aligned()
    }
}

/// Lookup from operator name to indentation rule
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: HashMap<String, IndentRule>,
}

impl PolicyTable {
    /// Table with no entries; every operator argument-aligns
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Resolve the rule for an operator symbol. Lookup is
    /// case-insensitive and ignores a package qualifier
    /// (`cl:defun` resolves as `defun`). Unknown operators get the
    /// argument-aligned default.
    pub fn rule(&self, operator: &str) -> IndentRule {
        let name = operator
            .rsplit(':')
            .next()
            .unwrap_or(operator)
            .to_ascii_lowercase();
        self.rules.get(&name).copied().unwrap_or_default()
    }

    /// Add or replace the rule for an operator
    pub fn set(&mut self, operator: &str, rule: IndentRule) {
        self.rules.insert(operator.to_ascii_lowercase(), rule);
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let mut table = Self::empty();

        // Definitions: name and lambda-list are header, the rest is body
        for op in [
            "defun",
            "defmacro",
            "defmethod",
            "defgeneric",
            "deftype",
            "define-condition",
            "define-modify-macro",
        ] {
            table.set(op, IndentRule::body(2));
        }
        table.set("defclass", IndentRule::body(2));
        table.set("defstruct", IndentRule::body(1));
        table.set("defpackage", IndentRule::body(1));
        table.set("defvar", IndentRule::body(1));
        table.set("defparameter", IndentRule::body(1));
        table.set("lambda", IndentRule::body(1));

        // Binding forms: the binding list is the single header argument
        for op in [
            "let",
            "let*",
            "flet",
            "labels",
            "macrolet",
            "symbol-macrolet",
            "handler-bind",
            "restart-bind",
            "prog",
            "prog*",
        ] {
            table.set(op, IndentRule::body_with_bindings(1));
        }
        table.set("do", IndentRule::body_with_bindings(2));
        table.set("do*", IndentRule::body_with_bindings(2));
        table.set("multiple-value-bind", IndentRule::body(2));
        table.set("destructuring-bind", IndentRule::body(2));

        // Conditionals
        table.set("if", IndentRule::fixed(1, 4));
        table.set("when", IndentRule::body(1));
        table.set("unless", IndentRule::body(1));
        table.set("cond", IndentRule::body(0));
        for op in ["case", "ecase", "ccase", "typecase", "etypecase", "ctypecase"] {
            table.set(op, IndentRule::body(1));
        }

        // Iteration
        table.set("dolist", IndentRule::body(1));
        table.set("dotimes", IndentRule::body(1));

        // Body-bearing wrappers
        table.set("progn", IndentRule::body(0));
        table.set("prog1", IndentRule::body(1));
        table.set("prog2", IndentRule::body(2));
        table.set("locally", IndentRule::body(0));
        table.set("tagbody", IndentRule::body(0));
        table.set("block", IndentRule::body(1));
        table.set("catch", IndentRule::body(1));
        table.set("eval-when", IndentRule::body(1));
        table.set("unwind-protect", IndentRule::body(1));
        table.set("ignore-errors", IndentRule::body(0));
        table.set("handler-case", IndentRule::body(1));
        table.set("restart-case", IndentRule::body(1));
        table.set("with-open-file", IndentRule::body(1));
        table.set("with-open-stream", IndentRule::body(1));
        table.set("with-output-to-string", IndentRule::body(1));
        table.set("with-input-from-string", IndentRule::body(1));
        table.set("with-standard-io-syntax", IndentRule::body(0));
        table.set("with-slots", IndentRule::body(2));
        table.set("with-accessors", IndentRule::body(2));

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_operator() {
        let table = PolicyTable::default();
        let rule = table.rule("defun");
        assert_eq!(rule.header_arity, 2);
        assert_eq!(rule.style, IndentStyle::BodyIndent);
    }

    #[test]
    fn test_unknown_operator_falls_back_to_aligned() {
        let table = PolicyTable::default();
        assert_eq!(table.rule("my-function"), IndentRule::aligned());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = PolicyTable::default();
        assert_eq!(table.rule("DEFUN"), table.rule("defun"));
        assert_eq!(table.rule("Let*"), table.rule("let*"));
    }

    #[test]
    fn test_package_qualifier_is_ignored() {
        let table = PolicyTable::default();
        assert_eq!(table.rule("cl:defun"), table.rule("defun"));
        assert_eq!(table.rule("common-lisp::when"), table.rule("when"));
    }

    #[test]
    fn test_binding_forms_flag_binding_list() {
        let table = PolicyTable::default();
        assert!(table.rule("let").binding_list);
        assert!(table.rule("labels").binding_list);
        assert!(!table.rule("when").binding_list);
    }

    #[test]
    fn test_table_is_extensible() {
        let mut table = PolicyTable::default();
        table.set("define-thing", IndentRule::body(1));
        assert_eq!(table.rule("define-thing"), IndentRule::body(1));
    }

    #[test]
    fn test_empty_table() {
        let table = PolicyTable::empty();
        assert_eq!(table.rule("defun"), IndentRule::aligned());
    }
}
