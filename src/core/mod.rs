/*!
 * Core Module
 * Cross-cutting types shared by the allocation and collection layers
 */

pub mod compare;

// Re-export for convenience
pub use compare::Compare;
