//! Crate-wide error types.
//!
//! Two classes per spec.md §7: user errors carry a reason string and are
//! always returned as `Result`, never panicked; internal invariants use
//! `debug_assert!`/`unreachable!` gated by [`crate::debug_assertions_enabled`]
//! so a release build of a downstream consumer does not pay for checks that
//! only matter while developing this compiler itself.

use thiserror::Error;

/// A user-facing failure from a transformation or form predicate: malformed
/// expression, illegal transformation for the current notation form,
/// dimension mismatch, unknown tensor or index variable, and similar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ReasonError {
    pub reason: String,
}

impl ReasonError {
    pub fn new(reason: impl Into<String>) -> Self {
        ReasonError {
            reason: reason.into(),
        }
    }
}

impl From<&str> for ReasonError {
    fn from(s: &str) -> Self {
        ReasonError::new(s)
    }
}

impl From<String> for ReasonError {
    fn from(s: String) -> Self {
        ReasonError::new(s)
    }
}

/// Top-level error type returned by the crate's public entry points (CLI,
/// frontend, lowerer). Wraps [`ReasonError`] plus the format/parse errors
/// surfaced by the ambient components.
#[derive(Debug, Error)]
pub enum SparseqError {
    #[error(transparent)]
    Reason(#[from] ReasonError),

    #[error("malformed format declaration: {0}")]
    Format(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing external collaborator: {0}")]
    MissingCollaborator(String),
}

pub type Result<T, E = ReasonError> = std::result::Result<T, E>;
