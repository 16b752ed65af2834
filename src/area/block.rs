/*!
 * Blocks and Blocksets
 * Fixed-size element buffers and the address-sorted block directory
 */

use super::bitmap::BlockBitmap;
use arc_swap::ArcSwapOption;
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Block pointers held by one blockset.
pub const BLOCKSET_CAPACITY: usize = 64;

/// One contiguous buffer of fixed-size elements plus its slot bitmap.
///
/// The buffer never moves after creation; live element pointers stay valid
/// until the whole area is flushed. The buffer is obtained directly from the
/// global allocator so exhaustion surfaces as a fallible call instead of an
/// abort.
#[derive(Debug)]
pub struct Block {
    base: NonNull<u8>,
    layout: Layout,
    stride: usize,
    bitmap: BlockBitmap,
}

// Safety: the buffer is only addressed through bitmap-claimed slots; the
// bitmap serializes slot ownership across threads.
unsafe impl Send for Block {}
unsafe impl Sync for Block {}

impl Block {
    /// Allocate a block of `capacity` elements of `stride` bytes each.
    /// Returns `None` if the backing allocator is exhausted.
    pub fn new(stride: usize, capacity: usize) -> Option<Self> {
        let layout = Layout::from_size_align(stride * capacity, 8).ok()?;
        // Safety: layout has non-zero size (stride and capacity are validated
        // by the area layer)
        let raw = unsafe { alloc(layout) };
        let base = NonNull::new(raw)?;
        Some(Self {
            base,
            layout,
            stride,
            bitmap: BlockBitmap::new(capacity),
        })
    }

    #[inline]
    pub fn bitmap(&self) -> &BlockBitmap {
        &self.bitmap
    }

    /// Base address of the element buffer.
    #[inline]
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// One past the last addressable byte.
    #[inline]
    pub fn end_addr(&self) -> usize {
        self.base_addr() + self.layout.size()
    }

    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base_addr() && addr < self.end_addr()
    }

    /// Pointer to the start of slot `index` (including any sentinel prefix).
    #[inline]
    pub fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.bitmap.capacity());
        // Safety: index is within the buffer by the assertion above
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index * self.stride)) }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // Safety: base/layout came from `alloc` in `new`
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

/// A bounded directory segment: block pointers sorted ascending by base
/// address, with lock-free readers.
///
/// Slots are published through `ArcSwapOption` and counted by an
/// acquire/release `used` counter, so `allocate`-path scans and address
/// lookups never lock. Mutation (sorted insert) happens only under the
/// owning area's grow mutex and grows the visible window before shifting,
/// so a reader racing a shift-insert can observe a transiently duplicated
/// neighbor but never loses sight of a live block; duplicates stay in
/// non-decreasing order and are harmless because every candidate is
/// range-confirmed.
pub struct Blockset {
    used: AtomicUsize,
    items: [ArcSwapOption<Block>; BLOCKSET_CAPACITY],
    next: OnceLock<Box<Blockset>>,
}

impl Blockset {
    pub fn new() -> Self {
        Self {
            used: AtomicUsize::new(0),
            items: std::array::from_fn(|_| ArcSwapOption::const_empty()),
            next: OnceLock::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn has_room(&self) -> bool {
        self.len() < BLOCKSET_CAPACITY
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Arc<Block>> {
        self.items[index].load_full()
    }

    /// Next blockset in the directory chain, if any.
    #[inline]
    pub fn next(&self) -> Option<&Blockset> {
        self.next.get().map(|b| b.as_ref())
    }

    /// Link a new blockset after this one. Caller holds the area grow mutex;
    /// the link is written exactly once.
    pub fn link_next(&self, next: Box<Blockset>) -> &Blockset {
        let _ = self.next.set(next);
        self.next().unwrap_or(self)
    }

    /// Insert a block keeping base-address order. Caller holds the area grow
    /// mutex. Returns `false` when the blockset is full.
    pub fn insert_sorted(&self, block: Arc<Block>) -> bool {
        let n = self.used.load(Ordering::Relaxed);
        if n >= BLOCKSET_CAPACITY {
            return false;
        }

        let base = block.base_addr();
        let mut pos = n;
        for i in 0..n {
            match self.items[i].load_full() {
                Some(existing) if existing.base_addr() > base => {
                    pos = i;
                    break;
                }
                _ => {}
            }
        }

        if pos == n {
            self.items[n].store(Some(block));
            self.used.store(n + 1, Ordering::Release);
            return true;
        }

        // Duplicate the top block into the new slot and grow the visible
        // window before shifting: a concurrent reader then sees every live
        // block at all times, at worst twice, and always in non-decreasing
        // order
        self.items[n].store(self.items[n - 1].load_full());
        self.used.store(n + 1, Ordering::Release);
        let mut i = n - 1;
        while i > pos {
            self.items[i].store(self.items[i - 1].load_full());
            i -= 1;
        }
        self.items[pos].store(Some(block));
        true
    }

    /// Locate the block containing `addr`, if any: quick range reject, then
    /// binary search by base address, then containment confirm.
    pub fn find(&self, addr: usize) -> Option<Arc<Block>> {
        let n = self.len();
        if n == 0 {
            return None;
        }

        let first = self.get(0)?;
        if addr < first.base_addr() {
            return None;
        }
        let last = self.get(n - 1)?;
        if addr >= last.end_addr() {
            return None;
        }

        // Greatest base address <= addr
        let mut lo = 0usize;
        let mut hi = n;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            match self.get(mid) {
                Some(block) if block.base_addr() <= addr => lo = mid,
                _ => hi = mid,
            }
        }

        let candidate = self.get(lo)?;
        candidate.contains(addr).then_some(candidate)
    }
}

impl Default for Blockset {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Blockset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockset")
            .field("used", &self.len())
            .field("chained", &self.next.get().is_some())
            .finish()
    }
}
