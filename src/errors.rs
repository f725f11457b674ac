//! Error taxonomy: broken invariants, collaborator failures and bad configuration
use crate::keys::Key;
use thiserror::Error;

/// Fatal outcomes of a reconciliation call. Both mean the key bookkeeping or the
/// alignment step is inconsistent, never that the input markup was unusual.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("child count mismatch after alignment: candidate has {candidate}, live has {live}")]
    ChildCountMismatch { candidate: usize, live: usize },

    #[error("no live sibling carries key '{key}'")]
    AnchorNotFound { key: Key },
}

/// Failures reported by a tree implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown node handle: {details}")]
    UnknownNode { details: String },

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },

    #[error("operation '{operation}' is not supported on a {kind} node")]
    WrongKind { operation: &'static str, kind: String },

    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: String, child: String },
}

#[derive(Error, Debug)]
pub enum MorphError {
    #[error("reconciliation aborted: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("tree operation failed: {0}")]
    Tree(#[from] TreeError),

    #[error("invalid options: {0}")]
    Config(#[from] serde_json::Error),
}

impl MorphError {
    /// True for the two fatal invariant outcomes.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, MorphError::Invariant(_))
    }
}

#[cfg(feature = "python")]
impl From<MorphError> for pyo3::PyErr {
    fn from(err: MorphError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_errors_convert_into_morph_error() {
        let err: MorphError = InvariantViolation::ChildCountMismatch {
            candidate: 2,
            live: 3,
        }
        .into();
        assert!(err.is_invariant_violation());
        assert_eq!(
            err.to_string(),
            "reconciliation aborted: child count mismatch after alignment: candidate has 2, live has 3"
        );
    }

    #[test]
    fn tree_errors_are_not_invariant_violations() {
        let err: MorphError = TreeError::UnknownNode {
            details: "#9".into(),
        }
        .into();
        assert!(!err.is_invariant_violation());
    }
}
