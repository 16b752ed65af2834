/*!
 * Allocator Registry
 * Explicit process-wide directory of areas with a bounded lifecycle
 */

use super::area::Area;
use super::types::{AreaError, AreaOptions, AreaResult, RegistryStats};
use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Owns every registered [`Area`].
///
/// The registry lock guards only create/destroy/enumeration; allocation
/// traffic goes straight to the areas and never touches it. Constructed
/// once by the process entry point and shut down explicitly; tests build
/// independent registries for isolation.
pub struct AllocatorRegistry {
    areas: Mutex<Vec<Arc<Area>>>,
}

impl AllocatorRegistry {
    pub fn new() -> Self {
        info!("Allocator registry initialized");
        Self {
            areas: Mutex::new(Vec::new()),
        }
    }

    /// Create and register an area.
    pub fn create(
        &self,
        name: impl Into<String>,
        element_size: usize,
        elements_per_block: usize,
    ) -> AreaResult<Arc<Area>> {
        self.create_with(AreaOptions::new(name, element_size, elements_per_block))
    }

    pub fn create_with(&self, options: AreaOptions) -> AreaResult<Arc<Area>> {
        let area = Arc::new(Area::new(options)?);
        self.areas.lock().push(Arc::clone(&area));
        Ok(area)
    }

    /// Unregister an area and release all of its blocks. Outstanding element
    /// pointers become invalid; the caller guarantees no further use.
    pub fn destroy(&self, area: &Arc<Area>) -> AreaResult<()> {
        let mut areas = self.areas.lock();
        let before = areas.len();
        areas.retain(|a| !Arc::ptr_eq(a, area));
        if areas.len() == before {
            warn!("Destroy of unregistered area '{}'", area.name());
            return Err(AreaError::NotRegistered(area.name().to_string()));
        }
        drop(areas);
        area.flush();
        info!("Area '{}' destroyed", area.name());
        Ok(())
    }

    /// Look up a registered area by name.
    pub fn find(&self, name: &str) -> Option<Arc<Area>> {
        self.areas.lock().iter().find(|a| a.name() == name).cloned()
    }

    pub fn area_count(&self) -> usize {
        self.areas.lock().len()
    }

    /// Flush every registered area.
    pub fn flush_all(&self) {
        for area in self.areas.lock().iter() {
            area.flush();
        }
    }

    /// Tear down all remaining areas. The registry is empty afterwards.
    pub fn shutdown(&self) {
        let mut areas = self.areas.lock();
        for area in areas.drain(..) {
            area.flush();
        }
        info!("Allocator registry shut down");
    }

    /// Aggregate statistics across all areas, best effort.
    pub fn stats(&self) -> RegistryStats {
        let areas: Vec<_> = self.areas.lock().iter().map(|a| a.stats()).collect();
        RegistryStats {
            area_count: areas.len(),
            total_capacity: areas.iter().map(|a| a.capacity).sum(),
            total_in_use: areas.iter().map(|a| a.in_use).sum(),
            areas,
        }
    }

    /// Dump every area's diagnostics.
    pub fn dump(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        let areas: Vec<_> = self.areas.lock().clone();
        writeln!(w, "{} area(s) registered", areas.len())?;
        for area in areas {
            area.dump(w)?;
        }
        Ok(())
    }
}

impl Default for AllocatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocatorRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
