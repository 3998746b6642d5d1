#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use ascl_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("mismatched types: expected '{expected}', found '{found}'")]
    MismatchedType { expected: String, found: String },

    #[error("mismatched {label} count: expected {expected}, found {found}")]
    MismatchedCount {
        label: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("missing array size")]
    MissingArraySize,

    #[error("array size must be an integer, found '{found}'")]
    InvalidSizeType { found: String },

    #[error("array size must be a positive integer literal within the address space")]
    InvalidSizeValue,

    #[error("mismatched element count: expected {expected}, found {found}")]
    MismatchedElemCount { expected: usize, found: usize },

    #[error("initializer not allowed for '{ty}'")]
    NotAllowedInit { ty: String },

    #[error("type '{ty}' not allowed here")]
    NotAllowedType { ty: String },

    #[error("array requires an aggregate initializer")]
    MissingArrayInit,

    #[error("undefined identifier '{name}'")]
    UndefinedId { name: String },

    #[error("'{ty}' has no member '{name}'")]
    UndefinedField { name: String, ty: String },

    #[error("'{name}' is not callable")]
    NotCallable { name: String },

    #[error("invalid operand type '{ty}'")]
    InvalidOperand { ty: String },
}

/// Recoverable, user-facing diagnostic.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("semantic error: {kind}")]
#[diagnostic(code(ascl::check))]
pub struct SemanticError {
    pub kind: ErrorKind,
    #[label]
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn mismatched_type(expected: impl ToString, found: impl ToString, span: Span) -> Self {
        Self::new(
            ErrorKind::MismatchedType {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            span,
        )
    }

    pub fn mismatched_count(label: &'static str, expected: usize, found: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::MismatchedCount {
                label,
                expected,
                found,
            },
            span,
        )
    }
}

/// A broken invariant of the compiler itself. Aborts the compilation.
#[derive(Debug, Error, Diagnostic)]
#[error("internal compiler error: {message}")]
#[diagnostic(code(ascl::internal))]
pub struct InternalError {
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

impl InternalError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("compilation failed with {} error(s)", .errors.len())]
    #[diagnostic(code(ascl::compile))]
    Semantic {
        #[related]
        errors: Vec<SemanticError>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Internal(#[from] InternalError),
}

impl CompileError {
    pub fn errors(&self) -> &[SemanticError] {
        match self {
            CompileError::Semantic { errors } => errors,
            CompileError::Internal(_) => &[],
        }
    }
}
