/*!
 * Collection Types
 * Kinds, errors and comparison results for collection objects
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value slots per collection block.
pub const COL_BLOCK_SIZE: usize = 64;

/// How far from the end an insertion point may be before `add` appends and
/// defers the sort instead of shifting. One block width; a tunable, not a
/// correctness constant.
pub const DEFER_SORT_THRESHOLD: usize = COL_BLOCK_SIZE;

/// Collection operation result
pub type ColResult<T> = Result<T, ColError>;

/// Collection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColError {
    #[error("Index {index} out of range for collection of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Operation not valid for this collection kind")]
    InvalidKind,

    #[error("Value already present in set")]
    DuplicateValue,

    #[error("Value is not a member of the collection")]
    ValueNotFound,

    #[error("Comparison yielded no definite ordering")]
    ComparisonUnknown,
}

/// Collection kinds.
///
/// `Set` rejects duplicates, `Multiset` counts them, `Sequence` preserves
/// positions (NULL holes included), `Vobj` is the sequence layout used for
/// virtual object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColKind {
    Set,
    Multiset,
    Sequence,
    Vobj,
}

impl ColKind {
    /// Whether membership is order-based (sets) rather than positional.
    #[inline]
    pub fn is_set_like(self) -> bool {
        matches!(self, ColKind::Set | ColKind::Multiset)
    }
}

/// Algebraic relation between two collections compared as sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetRelation {
    Equal,
    Subset,
    Superset,
    NotEqual,
    /// NULLs prevented a definite answer.
    Unknown,
}
