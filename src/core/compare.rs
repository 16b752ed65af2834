/*!
 * Three-Valued Ordering
 * SQL-style comparison results shared by the collection engine
 */

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of comparing two values under SQL three-valued logic.
///
/// `Unknown` arises whenever a NULL is involved (or two values are not
/// comparable without coercion). Call sites must handle it explicitly;
/// collapsing it to true/false is a correctness bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compare {
    Lt,
    Eq,
    Gt,
    Unknown,
}

impl From<Ordering> for Compare {
    #[inline]
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => Compare::Lt,
            Ordering::Equal => Compare::Eq,
            Ordering::Greater => Compare::Gt,
        }
    }
}
