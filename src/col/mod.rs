/*!
 * Collection Module
 * Set, multiset and sequence semantics over block-indexed value storage
 */

pub mod algebra;
pub mod handle;
pub mod object;
pub mod sort;
pub mod types;
pub mod value;

// Re-export for convenience
pub use algebra::{compare_order, compare_sets, difference_into, intersect_into, union_into};
pub use handle::{ColHandle, Owner};
pub use object::{Col, ColIter};
pub use types::{ColError, ColKind, ColResult, SetRelation, COL_BLOCK_SIZE};
pub use value::Value;
