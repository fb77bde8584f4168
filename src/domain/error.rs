//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors describe a tree definition that cannot be built.
///
/// Running a built tree never fails: missing names and degenerate numbers
/// are absorbed by the tree itself. Only construction is validated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid model context: {0}")]
    InvalidContext(String),

    #[error("item name must not be empty (child #{index} of {parent})")]
    EmptyName { parent: String, index: usize },

    #[error("node {name} has {children} children but sigma {sigma} is not positive")]
    InvalidSigma {
        name: String,
        sigma: f64,
        children: usize,
    },

    #[error("{name}.{field}: expected {expected} periods, got {actual}")]
    PeriodMismatch {
        name: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("vintage leaf {0} needs a rotation of at least one period")]
    InvalidRotation(String),

    #[error("region {0} is defined more than once")]
    DuplicateRegion(String),
}
