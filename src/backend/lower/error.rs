//! Errors raised while lowering

use crate::common::ast::BuiltinValue;
use crate::common::span::Span;
use std::fmt;
use thiserror::Error;

/// Which side of the contract broke
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The resolved AST did not carry what semantic analysis promised
    UpstreamContract,
    /// The lowering itself reached an inconsistent state
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error("unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: String, span: Span },

    #[error("statement is missing its behaviors")]
    MissingBehaviors { span: Span },

    #[error("failed to get constant value for literal of type `{ty}`")]
    MissingLiteralValue { ty: String, span: Span },

    #[error("`{name}` is not a function")]
    NotAFunction { name: String, span: Span },

    #[error("override `{name}` was not substituted before lowering")]
    UnsubstitutedOverride { name: String, span: Span },

    #[error("builtin `{builtin}` is not valid in {position} attributes")]
    InvalidBuiltin {
        builtin: BuiltinValue,
        position: &'static str,
        span: Span,
    },

    #[error("compute entry point `{function}` has no workgroup size")]
    MissingWorkgroupSize { function: String, span: Span },

    #[error("`{statement}` has no enclosing {expected}")]
    UnresolvedControl {
        statement: &'static str,
        expected: &'static str,
        span: Span,
    },

    #[error("internal lowering error: {message}")]
    Internal { message: String, span: Span },
}

impl LowerError {
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        LowerError::Internal {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LowerError::UnresolvedIdentifier { span, .. }
            | LowerError::MissingBehaviors { span }
            | LowerError::MissingLiteralValue { span, .. }
            | LowerError::NotAFunction { span, .. }
            | LowerError::UnsubstitutedOverride { span, .. }
            | LowerError::InvalidBuiltin { span, .. }
            | LowerError::MissingWorkgroupSize { span, .. }
            | LowerError::UnresolvedControl { span, .. }
            | LowerError::Internal { span, .. } => *span,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LowerError::UnresolvedControl { .. } | LowerError::Internal { .. } => {
                ErrorCategory::Internal
            }
            _ => ErrorCategory::UpstreamContract,
        }
    }

    /// Stable code shown in reports
    pub fn code(&self) -> &'static str {
        match self {
            LowerError::UnresolvedIdentifier { .. } => "L001",
            LowerError::MissingBehaviors { .. } => "L002",
            LowerError::MissingLiteralValue { .. } => "L003",
            LowerError::NotAFunction { .. } => "L004",
            LowerError::UnsubstitutedOverride { .. } => "L005",
            LowerError::InvalidBuiltin { .. } => "L006",
            LowerError::MissingWorkgroupSize { .. } => "L007",
            LowerError::UnresolvedControl { .. } => "L100",
            LowerError::Internal { .. } => "L101",
        }
    }
}

/// A lowering error tagged with where it happened
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Function being lowered, `None` at module scope
    pub function: Option<String>,
    pub error: LowerError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "in function `{}`: {}", name, self.error),
            None => write!(f, "at module scope: {}", self.error),
        }
    }
}

/// Every diagnostic recorded while lowering a program, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function: Option<String>, error: LowerError) {
        self.items.push(Diagnostic { function, error });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// The bare errors, in order
    pub fn errors(&self) -> impl Iterator<Item = &LowerError> {
        self.items.iter().map(|d| &d.error)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
