// Error type for tree generation.
//
// Generation never fails on metric input: out-of-range values are clamped
// and degenerate parameters degrade to a bare trunk. The variants here are
// either a caller passing the wrong axiom to the grammar, or an internal
// invariant violation (unbalanced symbol stream, broken parent links) that
// means the grammar or a grower is wrong. Callers should surface the latter,
// not retry or swallow them.

use crate::grammar::Symbol;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("axiom must be the growth symbol 'X', got '{found}'")]
    InvalidAxiom { found: Symbol },

    #[error("pop with an empty turtle stack at symbol {offset}")]
    StackUnderflow { offset: usize },

    #[error("symbol stream ended with {open} unclosed branch(es)")]
    UnclosedBranches { open: usize },

    #[error("node {index} references parent {parent}, which is not yet present")]
    OrphanBranch { index: usize, parent: usize },

    #[error("node {index} is a second root")]
    MultipleRoots { index: usize },

    #[error("node {index} is not deeper than its parent {parent}")]
    DepthNotIncreasing { index: usize, parent: usize },
}

impl TreeError {
    /// True for errors that indicate a bug in the grammar or a grower rather
    /// than a bad argument.
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, TreeError::InvalidAxiom { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axiom_errors_are_not_invariant_violations() {
        let err = TreeError::InvalidAxiom {
            found: Symbol::Forward,
        };
        assert!(!err.is_invariant_violation());
        assert_eq!(
            err.to_string(),
            "axiom must be the growth symbol 'X', got 'F'"
        );
    }

    #[test]
    fn structural_errors_are_invariant_violations() {
        assert!(TreeError::StackUnderflow { offset: 3 }.is_invariant_violation());
        assert!(TreeError::UnclosedBranches { open: 1 }.is_invariant_violation());
        assert!(TreeError::OrphanBranch { index: 4, parent: 9 }.is_invariant_violation());
    }
}
