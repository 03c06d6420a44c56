use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::value::Kind;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Error kinds raised by the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `ValueError` -> "ValueError").
///
/// Every error is fatal: nothing in the interpreter recovers mid-execution, the
/// error propagates to the [`Runner`](crate::Runner) and aborts the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// A token does not match the grammar at the current position.
    SyntaxError,
    /// An identifier was redeclared, or used without a declaration.
    NameError,
    /// An operator was applied to operand kinds the dispatch table does not accept.
    TypeError,
    /// A conversion failed: bad escape, bad numeric literal, division by zero.
    ValueError,
    /// A subscript was out of range after negative-index normalization.
    IndexError,
    /// The heap refused an allocation (the configured object limit was hit).
    OutOfMemoryError,
    /// An internal dispatch invariant was violated.
    SystemError,
}

impl ErrorKind {
    /// Creates an error with this kind and the given message.
    #[must_use]
    pub(crate) fn msg(self, message: impl fmt::Display) -> RunError {
        RunError::new(self, message.to_string())
    }

    /// Creates a TypeError for unsupported binary operations.
    ///
    /// Matches the wording used throughout the dispatch table:
    /// `unsupported operand type(s) for operation {op}: {lhs} and {rhs}`
    #[must_use]
    pub(crate) fn binary_type_error(op: &str, lhs: Kind, rhs: Kind) -> RunError {
        Self::TypeError.msg(format!(
            "unsupported operand type(s) for operation {op}: {lhs} and {rhs}"
        ))
    }

    /// Creates a TypeError for unsupported unary operations.
    #[must_use]
    pub(crate) fn unary_type_error(op: &str, operand: Kind) -> RunError {
        Self::TypeError.msg(format!("unsupported operand type for operation {op}: {operand}"))
    }

    /// Creates a TypeError for subscript or length access on a non-sequence.
    #[must_use]
    pub(crate) fn not_subscriptable(kind: Kind) -> RunError {
        Self::TypeError.msg(format!("type {kind} is not subscriptable"))
    }

    /// Creates a ValueError for a failed kind conversion.
    #[must_use]
    pub(crate) fn cannot_convert(from: Kind, to: &str) -> RunError {
        Self::ValueError.msg(format!("cannot convert {from} to {to}"))
    }

    /// Creates an IndexError for a subscript that is out of range after
    /// normalization.
    #[must_use]
    pub(crate) fn index_error(kind: Kind) -> RunError {
        Self::IndexError.msg(format!("{kind} index out of range"))
    }

    /// Creates a ValueError for division or remainder by zero.
    #[must_use]
    pub(crate) fn division_by_zero() -> RunError {
        Self::ValueError.msg("division by zero")
    }

    /// Creates a NameError for a name that is used but was never declared.
    #[must_use]
    pub(crate) fn undeclared(name: &str) -> RunError {
        Self::NameError.msg(format!("identifier {name} undeclared"))
    }

    /// Creates a NameError for a name declared twice at the same scope level.
    #[must_use]
    pub(crate) fn already_declared(name: &str) -> RunError {
        Self::NameError.msg(format!("identifier {name} already declared"))
    }

    /// Creates a NameError for a declared identifier that currently has no
    /// bound value (e.g. a loop variable after its loop finished).
    #[must_use]
    pub(crate) fn unbound(name: &str) -> RunError {
        Self::NameError.msg(format!("identifier {name} is unbound"))
    }

    /// Creates an OutOfMemoryError for a heap that hit its object limit.
    #[must_use]
    pub(crate) fn out_of_memory(limit: usize) -> RunError {
        Self::OutOfMemoryError.msg(format!("heap object limit of {limit} exceeded"))
    }
}

/// Source position of an error: 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A fatal interpreter error: kind, message, and (when known) the source
/// file and position of the offending token.
///
/// Value-model operations raise errors without a position; the statement
/// executor attaches the reader's position on the way out via [`RunError::at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    kind: ErrorKind,
    message: String,
    file: Option<Box<str>>,
    loc: Option<CodeLoc>,
}

impl RunError {
    /// Creates a new error with no source position attached.
    #[must_use]
    pub(crate) fn new(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            file: None,
            loc: None,
        }
    }

    /// Attaches a source position, unless one is already present.
    ///
    /// Errors keep the position closest to where they were raised, so callers
    /// further up the stack can attach unconditionally.
    #[must_use]
    pub(crate) fn at(mut self, file: &str, loc: CodeLoc) -> Self {
        if self.loc.is_none() {
            self.file = Some(file.into());
            self.loc = Some(loc);
        }
        self
    }

    /// The error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message, without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source file the error was raised in, if known.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The source position the error was raised at, if known.
    #[must_use]
    pub fn loc(&self) -> Option<CodeLoc> {
        self.loc
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(file), Some(loc)) = (&self.file, self.loc) {
            writeln!(f, "File \"{file}\", {loc}")?;
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RunError {}
