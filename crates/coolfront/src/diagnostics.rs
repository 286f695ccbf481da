//! Positioned diagnostics reported by the scanner and the semantic passes.

use std::fmt;

/// A 1-based source position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}, Column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Position,
    pub kind: ErrorKind,
}

impl Diagnostic {
    pub fn new(pos: Position, kind: ErrorKind) -> Self {
        Self { pos, kind }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.kind)
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("{}", _0)]
    LexError(String),

    #[error("Syntax error at or near \"{}\".", _0)]
    ParseError(String),

    #[error("Type \"{}\" is already defined.", _0)]
    DuplicateType(String),

    #[error("Type \"{}\" is not defined.", _0)]
    TypeNotFound(String),

    #[error("Type \"{}\" forms a cyclic heritage chain.", _0)]
    CyclicInheritance(String),

    #[error("Type \"{}\" cannot inherit from \"{}\".", child, parent)]
    InvalidParent { child: String, parent: String },

    #[error(
        "Method \"{}\" of \"{}\" already defined in \"{}\" with a different signature.",
        method,
        class,
        parent
    )]
    WrongSignatureOverride {
        method: String,
        class: String,
        parent: String,
    },

    #[error("Attribute \"{}\" is already defined in \"{}\".", name, class)]
    AttributeAlreadyDefined { name: String, class: String },

    #[error("Method \"{}\" is already defined in \"{}\".", name, class)]
    MethodAlreadyDefined { name: String, class: String },

    #[error("Variable \"self\" is read-only.")]
    SelfReadOnly,

    #[error("Cannot convert \"{}\" into \"{}\".", from, to)]
    IncompatibleTypes { from: String, to: String },

    #[error("Operation is not defined between \"{}\" and \"{}\".", left, right)]
    InvalidOperation { left: String, right: String },

    #[error("Variable \"{}\" is not defined in \"{}\".", name, scope)]
    VariableNotDefined { name: String, scope: String },

    #[error("Method \"{}\" is not defined in \"{}\".", name, class)]
    MethodNotDefined { name: String, class: String },

    #[error(
        "Method \"{}\" of \"{}\" only accepts {} argument(s), but {} were given.",
        method,
        class,
        expected,
        found
    )]
    ArityMismatch {
        method: String,
        class: String,
        expected: usize,
        found: usize,
    },

    #[error("Type \"{}\" cannot be used as {}.", ty, usage)]
    IllegalSelfType { ty: String, usage: &'static str },

    #[error("Duplicate branch \"{}\" in case expression.", _0)]
    DuplicateCaseBranch(String),

    #[error("The class \"Main\" and its method \"main\" are needed.")]
    MissingMainClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_format() {
        let diagnostic = Diagnostic::new(
            Position::new(3, 14),
            ErrorKind::IncompatibleTypes {
                from: "String".into(),
                to: "Int".into(),
            },
        );
        assert_eq!(
            diagnostic.to_string(),
            "Line 3, Column 14: Cannot convert \"String\" into \"Int\"."
        );
    }
}
