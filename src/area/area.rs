/*!
 * Area Allocator
 * Named pools of fixed-size elements with a lock-free allocation fast path
 */

use super::bitmap::BITMAP_WORD_BITS;
use super::block::{Block, Blockset};
use super::types::{AreaError, AreaOptions, AreaResult, AreaStats};
use arc_swap::{ArcSwap, ArcSwapOption};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sentinel stamped into the integrity prefix on allocation.
const SENTINEL_INITED: u64 = 0x5555_5555_5555_5555;
/// Sentinel stamped into the integrity prefix on free.
const SENTINEL_FREED: u64 = 0x7777_7777_7777_7777;

/// Bytes of the integrity prefix when enabled.
const PREFIX_SIZE: usize = 8;

/// Callback invoked when the backing allocator is exhausted, for emergency
/// cleanup by the owning layer (e.g. aborting an in-flight transaction).
pub type LowMemoryCallback = Box<dyn Fn() + Send + Sync>;

/// An element pointer handed out by an [`Area`].
///
/// Valid until freed back to the area or the area is flushed/destroyed.
/// The pointee is plain uninitialized storage of the area's element size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AreaPtr(NonNull<u8>);

// Safety: an AreaPtr is a stable address into a block buffer; ownership of
// the slot is tracked by the block bitmap, not by the pointer itself.
unsafe impl Send for AreaPtr {}
unsafe impl Sync for AreaPtr {}

impl AreaPtr {
    #[inline]
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// A named pool handing out fixed-size elements from internally managed
/// blocks.
///
/// `allocate`/`free` run without taking any lock in the common case: the
/// hint block and the block directory are read through `arc-swap`, and slot
/// ownership lives in each block's bitmap. Only growing the area by one
/// block is serialized, per area. Blocks are never released individually;
/// the pool only shrinks on [`Area::flush`].
pub struct Area {
    name: String,
    /// Caller-visible element size, padded to an 8-byte multiple.
    element_size: usize,
    /// Bytes per slot including the integrity prefix (if any).
    stride: usize,
    prefix: usize,
    elements_per_block: usize,
    directory: ArcSwap<Blockset>,
    hint: ArcSwapOption<Block>,
    grow_lock: Mutex<()>,
    n_allocs: AtomicU64,
    n_frees: AtomicU64,
    low_memory: Mutex<Option<LowMemoryCallback>>,
}

impl Area {
    /// Create an area and eagerly allocate its first block.
    pub fn new(options: AreaOptions) -> AreaResult<Self> {
        let element_size = options.element_size.max(1).div_ceil(8) * 8;
        let prefix = if options.integrity { PREFIX_SIZE } else { 0 };
        let stride = element_size + prefix;
        let elements_per_block = options
            .elements_per_block
            .max(1)
            .div_ceil(BITMAP_WORD_BITS)
            * BITMAP_WORD_BITS;

        let area = Self {
            name: options.name,
            element_size,
            stride,
            prefix,
            elements_per_block,
            directory: ArcSwap::from_pointee(Blockset::new()),
            hint: ArcSwapOption::const_empty(),
            grow_lock: Mutex::new(()),
            n_allocs: AtomicU64::new(0),
            n_frees: AtomicU64::new(0),
            low_memory: Mutex::new(None),
        };

        let first = area.new_block()?;
        area.directory.load().insert_sorted(Arc::clone(&first));
        area.hint.store(Some(first));

        info!(
            "Area '{}' created: element_size={} ({} stride), {} elements/block",
            area.name, area.element_size, area.stride, area.elements_per_block
        );
        Ok(area)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Padded element size callers may use per allocation.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    #[inline]
    pub fn elements_per_block(&self) -> usize {
        self.elements_per_block
    }

    /// Register a callback run when block allocation fails.
    pub fn set_low_memory_callback(&self, callback: LowMemoryCallback) {
        *self.low_memory.lock() = Some(callback);
    }

    /// Allocate one element.
    ///
    /// Fast path: the hint block, then a lock-free directory scan. Slow
    /// path: take the per-area grow lock, re-check, and add one block.
    pub fn allocate(&self) -> AreaResult<AreaPtr> {
        // 1. Hint block, no lock
        if let Some(hint) = self.hint.load_full() {
            if let Some(ptr) = self.claim_slot(&hint) {
                return Ok(ptr);
            }
        }

        // 2. Scan the whole directory, still no lock
        if let Some(ptr) = self.scan_allocate() {
            return Ok(ptr);
        }

        // 3. Grow by one block, serialized per area
        self.grow_and_allocate()
    }

    /// Confirm `ptr` lies within some block of this area. Slot alignment is
    /// not verified.
    pub fn validate(&self, ptr: AreaPtr) -> AreaResult<()> {
        match self.find_block(ptr.addr()) {
            Some(_) => Ok(()),
            None => {
                warn!("Area '{}': validate failed for 0x{:x}", self.name, ptr.addr());
                Err(AreaError::IllegalPointer {
                    area: self.name.clone(),
                    address: ptr.addr(),
                })
            }
        }
    }

    /// Return one element to the pool.
    pub fn free(&self, ptr: AreaPtr) -> AreaResult<()> {
        let addr = ptr.addr();
        let block = self.find_block(addr).ok_or_else(|| {
            warn!("Area '{}': free of foreign pointer 0x{:x}", self.name, addr);
            AreaError::IllegalPointer {
                area: self.name.clone(),
                address: addr,
            }
        })?;

        let offset = addr - block.base_addr();
        if offset % self.stride != self.prefix {
            warn!("Area '{}': misaligned free at 0x{:x}", self.name, addr);
            return Err(AreaError::IllegalPointer {
                area: self.name.clone(),
                address: addr,
            });
        }
        let index = offset / self.stride;

        if self.prefix != 0 {
            let slot = block.slot_ptr(index).as_ptr() as *mut u64;
            // Safety: slot points at this area's 8-byte prefix, 8-aligned
            unsafe {
                if slot.read() == SENTINEL_FREED {
                    error!("Area '{}': double free at 0x{:x}", self.name, addr);
                    return Err(AreaError::DoubleFree {
                        area: self.name.clone(),
                        address: addr,
                    });
                }
                slot.write(SENTINEL_FREED);
            }
        }

        if !block.bitmap().free_slot(index) {
            error!("Area '{}': double free at 0x{:x}", self.name, addr);
            return Err(AreaError::DoubleFree {
                area: self.name.clone(),
                address: addr,
            });
        }
        self.n_frees.fetch_add(1, Ordering::Relaxed);

        // The freed block now has room; steer the hint at it if the current
        // hint is full. Races are harmless, this is best effort.
        let hint = self.hint.load();
        if hint.as_ref().map_or(true, |h| h.bitmap().is_full()) {
            self.hint.compare_and_swap(&hint, Some(block));
        }
        Ok(())
    }

    /// Release every block and blockset and reset the area to empty.
    /// Outstanding element pointers become invalid.
    pub fn flush(&self) {
        let _guard = self.grow_lock.lock();
        self.hint.store(None);
        self.directory.store(Arc::new(Blockset::new()));
        let allocs = self.n_allocs.swap(0, Ordering::Relaxed);
        let frees = self.n_frees.swap(0, Ordering::Relaxed);
        info!(
            "Area '{}' flushed ({} allocs / {} frees retired)",
            self.name, allocs, frees
        );
    }

    /// Point-in-time statistics; counters are read best-effort.
    pub fn stats(&self) -> AreaStats {
        let mut block_count = 0usize;
        let mut in_use = 0usize;
        let head = self.directory.load_full();
        let mut set = Some(head.as_ref());
        while let Some(bs) = set {
            for i in 0..bs.len() {
                if let Some(block) = bs.get(i) {
                    block_count += 1;
                    in_use += block.bitmap().used_count();
                }
            }
            set = bs.next();
        }

        let capacity = block_count * self.elements_per_block;
        AreaStats {
            name: self.name.clone(),
            element_size: self.element_size,
            elements_per_block: self.elements_per_block,
            block_count,
            capacity,
            in_use,
            n_allocs: self.n_allocs.load(Ordering::Relaxed),
            n_frees: self.n_frees.load(Ordering::Relaxed),
            usage_percentage: if capacity == 0 {
                0.0
            } else {
                (in_use as f64 / capacity as f64) * 100.0
            },
        }
    }

    /// Human-readable diagnostics, advisory only.
    pub fn dump(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        let stats = self.stats();
        writeln!(
            w,
            "Area '{}': {} blocks, {} / {} elements in use ({:.1}%), \
             element_size={}, {} allocs / {} frees",
            stats.name,
            stats.block_count,
            stats.in_use,
            stats.capacity,
            stats.usage_percentage,
            stats.element_size,
            stats.n_allocs,
            stats.n_frees
        )
    }

    /// Live element count derived from the counters.
    pub fn used_count(&self) -> u64 {
        self.n_allocs
            .load(Ordering::Relaxed)
            .saturating_sub(self.n_frees.load(Ordering::Relaxed))
    }

    pub fn block_count(&self) -> usize {
        self.stats().block_count
    }

    /// Total element capacity across all blocks.
    pub fn capacity(&self) -> usize {
        self.stats().capacity
    }

    // Claim a slot from one block and stamp the prefix.
    fn claim_slot(&self, block: &Arc<Block>) -> Option<AreaPtr> {
        let index = block.bitmap().allocate_slot()?;
        let slot = block.slot_ptr(index);
        if self.prefix != 0 {
            // Safety: slot points at this area's 8-byte prefix, 8-aligned
            unsafe { (slot.as_ptr() as *mut u64).write(SENTINEL_INITED) };
        }
        self.n_allocs.fetch_add(1, Ordering::Relaxed);
        // Safety: slot + prefix stays inside the slot's stride
        let user = unsafe { NonNull::new_unchecked(slot.as_ptr().add(self.prefix)) };
        Some(AreaPtr(user))
    }

    // Lock-free scan of every block in the directory.
    fn scan_allocate(&self) -> Option<AreaPtr> {
        let head = self.directory.load_full();
        let mut set = Some(head.as_ref());
        while let Some(bs) = set {
            for i in 0..bs.len() {
                let Some(block) = bs.get(i) else { continue };
                if let Some(ptr) = self.claim_slot(&block) {
                    // Re-point the hint at the block we found if the current
                    // one is full; losing the CAS race just leaves a stale
                    // hint for the next caller to fix.
                    let hint = self.hint.load();
                    if hint.as_ref().map_or(true, |h| h.bitmap().is_full())
                        && !block.bitmap().is_full()
                    {
                        self.hint.compare_and_swap(&hint, Some(block));
                    }
                    return Some(ptr);
                }
            }
            set = bs.next();
        }
        None
    }

    fn grow_and_allocate(&self) -> AreaResult<AreaPtr> {
        let _guard = self.grow_lock.lock();

        // Another thread may have grown the area while we waited
        if let Some(hint) = self.hint.load_full() {
            if let Some(ptr) = self.claim_slot(&hint) {
                return Ok(ptr);
            }
        }

        let block = self.new_block()?;
        let head = self.directory.load_full();
        let mut last = head.as_ref();
        while let Some(next) = last.next() {
            last = next;
        }
        if !last.has_room() {
            last = last.link_next(Box::new(Blockset::new()));
            debug!("Area '{}': appended a new blockset", self.name);
        }
        last.insert_sorted(Arc::clone(&block));
        self.hint.store(Some(Arc::clone(&block)));
        debug!(
            "Area '{}': grew to {} blocks",
            self.name,
            self.block_count()
        );

        // The block is fresh and ours until the hint store above; a slot is
        // guaranteed, but stay fallible rather than unwrap
        self.claim_slot(&block).ok_or_else(|| AreaError::OutOfMemory {
            area: self.name.clone(),
            requested: self.stride,
        })
    }

    fn new_block(&self) -> AreaResult<Arc<Block>> {
        match Block::new(self.stride, self.elements_per_block) {
            Some(block) => Ok(Arc::new(block)),
            None => {
                let requested = self.stride * self.elements_per_block;
                error!(
                    "Area '{}': out of memory allocating a {} byte block",
                    self.name, requested
                );
                if let Some(callback) = self.low_memory.lock().as_ref() {
                    callback();
                }
                Err(AreaError::OutOfMemory {
                    area: self.name.clone(),
                    requested,
                })
            }
        }
    }

    // Address -> owning block, across all blocksets. Blocksets are probed in
    // chain order; only blocks within one blockset are sorted.
    fn find_block(&self, addr: usize) -> Option<Arc<Block>> {
        let head = self.directory.load_full();
        let mut set = Some(head.as_ref());
        while let Some(bs) = set {
            if let Some(block) = bs.find(addr) {
                return Some(block);
            }
            set = bs.next();
        }
        None
    }
}

impl Drop for Area {
    fn drop(&mut self) {
        let live = self.used_count();
        if live > 0 {
            debug!("Area '{}' dropped with {} elements live", self.name, live);
        }
    }
}

impl fmt::Debug for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Area")
            .field("name", &self.name)
            .field("element_size", &self.element_size)
            .field("elements_per_block", &self.elements_per_block)
            .finish()
    }
}
