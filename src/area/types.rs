/*!
 * Area Types
 * Errors, configuration and diagnostics snapshots for area allocation
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Area operation result
pub type AreaResult<T> = Result<T, AreaError>;

/// Area allocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AreaError {
    #[error("Out of memory in area '{area}': failed to allocate {requested} bytes")]
    OutOfMemory { area: String, requested: usize },

    #[error("Illegal pointer for area '{area}': 0x{address:x}")]
    IllegalPointer { area: String, address: usize },

    #[error("Double free detected in area '{area}' at 0x{address:x}")]
    DoubleFree { area: String, address: usize },

    #[error("Area '{0}' is not registered")]
    NotRegistered(String),
}

/// Sizing and checking policy for one area, fixed at creation time.
///
/// `element_size` is rounded up to an 8-byte multiple; `elements_per_block`
/// is rounded up to the bitmap word granularity. With `integrity` enabled
/// every element carries an 8-byte sentinel prefix used to catch double
/// frees and use-before-init; the prefix changes the element stride, never
/// the pointer handed to callers.
#[derive(Debug, Clone)]
pub struct AreaOptions {
    pub name: String,
    pub element_size: usize,
    pub elements_per_block: usize,
    pub integrity: bool,
}

impl AreaOptions {
    pub fn new(name: impl Into<String>, element_size: usize, elements_per_block: usize) -> Self {
        Self {
            name: name.into(),
            element_size,
            elements_per_block,
            // Checked layout by default in debug builds, plain in release
            integrity: cfg!(debug_assertions),
        }
    }

    pub fn with_integrity(mut self, integrity: bool) -> Self {
        self.integrity = integrity;
        self
    }
}

/// Point-in-time statistics for one area.
///
/// Counters are read without synchronization; values may be slightly stale
/// while other threads allocate or free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStats {
    pub name: String,
    pub element_size: usize,
    pub elements_per_block: usize,
    pub block_count: usize,
    pub capacity: usize,
    pub in_use: usize,
    pub n_allocs: u64,
    pub n_frees: u64,
    pub usage_percentage: f64,
}

/// Aggregate statistics across a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub area_count: usize,
    pub total_capacity: usize,
    pub total_in_use: usize,
    pub areas: Vec<AreaStats>,
}
