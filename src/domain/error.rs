//! Domain-level errors (no external dependencies)

use itertools::Itertools;
use thiserror::Error;

use crate::domain::entities::CategoryId;

/// Domain errors represent data-integrity violations in category input.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("duplicate category id: {0}")]
    DuplicateId(CategoryId),

    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    #[error("orphaned categories (parent not found): {}", format_orphans(.orphans))]
    OrphanedCategory {
        /// (category id, missing parent id) pairs
        orphans: Vec<(CategoryId, CategoryId)>,
    },

    #[error("cycle detected in category hierarchy: {}", .chain.iter().join(" -> "))]
    CycleDetected { chain: Vec<CategoryId> },

    #[error("invalid category record at index {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}

fn format_orphans(orphans: &[(CategoryId, CategoryId)]) -> String {
    orphans
        .iter()
        .map(|(id, parent)| format!("{} (parent {})", id, parent))
        .join(", ")
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
