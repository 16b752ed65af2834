/*!
 * Collection Sort
 * NULL partitioning and bottom-up block merge sort
 */

use super::object::Col;
use super::types::COL_BLOCK_SIZE;
use super::value::Value;
use std::cmp::Ordering;
use std::mem;

impl<V: Value> Col<V> {
    /// Destructive ascending sort under the total order, NULLs partitioned
    /// to the end.
    ///
    /// Three phases: a two-pointer pass swapping NULLs behind the last
    /// non-NULL element, an independent comparison sort of each block, then
    /// bottom-up merging of adjacent same-size block runs. The merge streams
    /// into recycled block buffers (drained source blocks plus two scratch
    /// blocks), so scratch space stays O(block size) no matter how large the
    /// collection is. Coercion is never applied while sorting; the order
    /// must be consistent with itself.
    pub fn sort(&mut self) {
        let top = self.move_nulls();
        let b = COL_BLOCK_SIZE;
        if top > 1 {
            let nblocks = top.div_ceil(b);
            for blk in 0..nblocks {
                let hi = b.min(top - blk * b);
                self.blocks[blk][..hi].sort_by(|x, y| x.total_cmp(y));
            }

            let mut run = 1;
            while run < nblocks {
                let mut start = 0;
                while start + run < nblocks {
                    let end = (start + 2 * run).min(nblocks);
                    self.merge_block_runs(start, start + run, end, top);
                    start += 2 * run;
                }
                run *= 2;
            }
        }
        self.sorted = true;
        self.unresolved = false;
    }

    /// Sort the collection unless its cached order is already trusted.
    pub fn ensure_sorted(&mut self) {
        if !self.order_trusted() {
            self.sort();
        }
    }

    // Partition NULLs to the end, preserving nothing about their order.
    // Returns the non-NULL count (the sort's working range).
    fn move_nulls(&mut self) -> usize {
        let mut i = 0usize;
        let mut j = self.size;
        while i < j {
            if !self.slot(i).is_null() {
                i += 1;
            } else if self.slot(j - 1).is_null() {
                j -= 1;
            } else {
                self.swap_slots(i, j - 1);
                i += 1;
                j -= 1;
            }
        }
        i
    }

    fn swap_slots(&mut self, i: usize, j: usize) {
        let b = COL_BLOCK_SIZE;
        let (bi, oi) = (i / b, i % b);
        let (bj, oj) = (j / b, j % b);
        if bi == bj {
            self.blocks[bi].swap(oi, oj);
        } else {
            let (lo, hi) = (bi.min(bj), bi.max(bj));
            let (left, right) = self.blocks.split_at_mut(hi);
            let (x, y) = if bi < bj { (oi, oj) } else { (oj, oi) };
            mem::swap(&mut left[lo][x], &mut right[0][y]);
        }
    }

    // Merge the sorted block runs [start, mid) and [mid, end) into one
    // sorted run. Completed output buffers replace source blocks that have
    // been fully drained; the pool is seeded with two scratch blocks, which
    // is enough because filling one output block always drains at least one
    // more source block.
    fn merge_block_runs(&mut self, start: usize, mid: usize, end: usize, top: usize) {
        let b = COL_BLOCK_SIZE;
        let a_end = mid * b;
        let b_end = (end * b).min(top);
        let mut i = start * b;
        let mut j = a_end;

        let mut free: Vec<Vec<V>> = vec![Vec::with_capacity(b), Vec::with_capacity(b)];
        let mut out: Vec<Vec<V>> = Vec::with_capacity(end - start);
        let mut fill = free.pop().unwrap_or_default();

        while i < a_end || j < b_end {
            let take_a = if i >= a_end {
                false
            } else if j >= b_end {
                true
            } else {
                self.slot(i).total_cmp(self.slot(j)) != Ordering::Greater
            };

            let value = if take_a {
                let v = mem::replace(self.slot_mut(i), V::null());
                i += 1;
                if i % b == 0 {
                    free.push(mem::take(&mut self.blocks[(i - 1) / b]));
                }
                v
            } else {
                let v = mem::replace(self.slot_mut(j), V::null());
                j += 1;
                if j % b == 0 || j == b_end {
                    free.push(mem::take(&mut self.blocks[(j - 1) / b]));
                }
                v
            };

            fill.push(value);
            if fill.len() == b {
                out.push(fill);
                fill = free.pop().unwrap_or_default();
                fill.clear();
            }
        }

        if !fill.is_empty() {
            // Only the globally-last block can be partial; pad it back to a
            // full block of NULLs
            fill.resize_with(b, V::null);
            out.push(fill);
        }
        for (k, block) in out.into_iter().enumerate() {
            self.blocks[start + k] = block;
        }
    }
}
