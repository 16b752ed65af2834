/*!
 * Block Bitmap
 * Lock-free free/used tracking for the slots of one block
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Bits per bitmap word; block capacities are rounded up to this.
pub const BITMAP_WORD_BITS: usize = 64;

/// Fixed-capacity bitmap over one block's element slots.
///
/// A set bit means the slot is in use. `allocate_slot` and `free_slot` are
/// CAS-based and safe to call from any thread without external locking.
#[derive(Debug)]
pub struct BlockBitmap {
    words: Box<[AtomicU64]>,
    capacity: usize,
}

impl BlockBitmap {
    /// Create a bitmap for `capacity` slots. Capacity must already be a
    /// multiple of [`BITMAP_WORD_BITS`]; the area layer rounds it up.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity % BITMAP_WORD_BITS == 0 && capacity > 0);
        let words = (0..capacity / BITMAP_WORD_BITS)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { words, capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim the first free slot, if any.
    pub fn allocate_slot(&self) -> Option<usize> {
        for (w, word) in self.words.iter().enumerate() {
            let mut current = word.load(Ordering::Relaxed);
            while current != u64::MAX {
                let bit = current.trailing_ones() as usize;
                match word.compare_exchange_weak(
                    current,
                    current | (1u64 << bit),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some(w * BITMAP_WORD_BITS + bit),
                    // Lost the race for this bit; re-read and retry
                    Err(actual) => current = actual,
                }
            }
        }
        None
    }

    /// Release a slot. Returns `false` if the slot was already free.
    pub fn free_slot(&self, index: usize) -> bool {
        debug_assert!(index < self.capacity);
        let mask = 1u64 << (index % BITMAP_WORD_BITS);
        let prior = self.words[index / BITMAP_WORD_BITS].fetch_and(!mask, Ordering::AcqRel);
        prior & mask != 0
    }

    /// Whether a slot is currently in use (advisory under concurrency).
    pub fn is_used(&self, index: usize) -> bool {
        debug_assert!(index < self.capacity);
        let mask = 1u64 << (index % BITMAP_WORD_BITS);
        self.words[index / BITMAP_WORD_BITS].load(Ordering::Acquire) & mask != 0
    }

    /// Number of slots currently in use (advisory under concurrency).
    pub fn used_count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Whether every slot is taken (advisory under concurrency).
    pub fn is_full(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Relaxed) == u64::MAX)
    }
}
