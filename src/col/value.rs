/*!
 * Value Trait
 * The external tagged-value contract the collection engine builds on
 */

use crate::core::compare::Compare;
use std::cmp::Ordering;

/// The element contract for collections.
///
/// The collection engine never looks inside a value; it only constructs
/// NULLs, clones, and compares. `compare` follows SQL three-valued logic
/// (NULL involved => `Unknown`); `total_cmp` is the strict total order used
/// for sorting and internal tie-breaks and must order NULLs after every
/// non-NULL value. Coercion rules behind the `coerce` flag belong to the
/// implementor.
pub trait Value: Clone {
    /// The NULL value of this domain.
    fn null() -> Self;

    fn is_null(&self) -> bool;

    /// Three-valued comparison. Must be consistent with `total_cmp` on
    /// non-NULL operands.
    fn compare(&self, other: &Self, coerce: bool) -> Compare;

    /// Total order for sorting: never Unknown, NULLs sort last.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Whether this value carries an object reference whose identity is not
    /// final yet. Collections holding such values do not trust their cached
    /// sort order.
    fn has_temporary_reference(&self) -> bool {
        false
    }
}

/// Plain ordered domains: `None` is NULL, comparison ignores coercion.
impl<T: Ord + Clone> Value for Option<T> {
    #[inline]
    fn null() -> Self {
        None
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.is_none()
    }

    #[inline]
    fn compare(&self, other: &Self, _coerce: bool) -> Compare {
        match (self, other) {
            (Some(a), Some(b)) => a.cmp(b).into(),
            _ => Compare::Unknown,
        }
    }

    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
