/*!
 * Area Module
 * Pool allocation of fixed-size elements from bitmap-tracked blocks
 */

pub mod area;
pub mod bitmap;
pub mod block;
pub mod registry;
pub mod types;

// Re-export for convenience
pub use area::{Area, AreaPtr, LowMemoryCallback};
pub use bitmap::BlockBitmap;
pub use registry::AllocatorRegistry;
pub use types::{AreaError, AreaOptions, AreaResult, AreaStats, RegistryStats};
