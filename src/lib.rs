/*!
 * valstore
 * Fixed-size area allocation and tagged-value collection engine
 */

pub mod area;
pub mod col;
pub mod core;

// Re-exports
pub use area::{AllocatorRegistry, Area, AreaError, AreaOptions, AreaPtr, AreaResult, AreaStats};
pub use col::{Col, ColError, ColHandle, ColKind, ColResult, SetRelation, Value};
pub use crate::core::Compare;
