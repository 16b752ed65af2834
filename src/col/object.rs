/*!
 * Collection Object
 * Set/Multiset/Sequence container over block-indexed value storage
 */

use super::types::{ColError, ColKind, ColResult, COL_BLOCK_SIZE, DEFER_SORT_THRESHOLD};
use super::value::Value;
use crate::core::compare::Compare;
use std::mem;

/// A generic collection of [`Value`]s.
///
/// Storage is a two-level structure: an indirection table of fixed-size
/// value blocks, addressed by `(index / COL_BLOCK_SIZE, index %
/// COL_BLOCK_SIZE)`. Inserting or deleting in the middle shifts only the
/// affected runs, carrying one element across each block boundary, and
/// growth never relocates existing blocks.
///
/// Invariants: logical indices `[0, size)` are addressable; every physical
/// slot at index `>= size` holds NULL; when `sorted` is true for a set-like
/// kind, values ascend under the external comparator with NULLs at the end.
///
/// No internal locking: the owning layer serializes mutation.
#[derive(Clone)]
pub struct Col<V: Value> {
    pub(crate) kind: ColKind,
    pub(crate) size: usize,
    pub(crate) last_insert: usize,
    pub(crate) blocks: Vec<Vec<V>>,
    pub(crate) sorted: bool,
    pub(crate) unresolved: bool,
}

impl<V: Value> Col<V> {
    pub fn new(kind: ColKind) -> Self {
        Self {
            kind,
            size: 0,
            last_insert: 0,
            blocks: Vec::new(),
            sorted: true,
            unresolved: false,
        }
    }

    /// Create with storage pre-expanded to `capacity` slots. Sequences treat
    /// the capacity as meaningful content (NULL-filled); set-like kinds
    /// start logically empty.
    pub fn with_capacity(kind: ColKind, capacity: usize) -> Self {
        let mut col = Self::new(kind);
        if capacity > 0 {
            col.ensure_blocks(capacity - 1);
            if matches!(kind, ColKind::Sequence | ColKind::Vobj) {
                col.size = capacity;
            }
        }
        col
    }

    pub fn set(capacity: usize) -> Self {
        Self::with_capacity(ColKind::Set, capacity)
    }

    pub fn multiset(capacity: usize) -> Self {
        Self::with_capacity(ColKind::Multiset, capacity)
    }

    pub fn sequence(capacity: usize) -> Self {
        Self::with_capacity(ColKind::Sequence, capacity)
    }

    pub fn vobj(capacity: usize) -> Self {
        Self::with_capacity(ColKind::Vobj, capacity)
    }

    #[inline]
    pub fn kind(&self) -> ColKind {
        self.kind
    }

    /// Logical element count, NULL holes included.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Count of non-NULL elements (the true cardinality).
    pub fn cardinality(&self) -> usize {
        self.iter().filter(|v| !v.is_null()).count()
    }

    pub fn has_null(&self) -> bool {
        self.iter().any(|v| v.is_null())
    }

    /// Flag that some element may hold a not-yet-final object reference;
    /// cached sort order is not trusted until the next re-sort.
    pub fn mark_unresolved(&mut self) {
        self.unresolved = true;
    }

    /// Ensure `max_index` is addressable, NULL-filling new slots, and grow
    /// the logical size to cover it.
    pub fn expand(&mut self, max_index: usize) -> ColResult<()> {
        self.ensure_blocks(max_index);
        if max_index + 1 > self.size {
            self.size = max_index + 1;
        }
        Ok(())
    }

    /// Clone out the element at `index`.
    pub fn get(&self, index: usize) -> ColResult<V> {
        if index >= self.size {
            return Err(ColError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(self.slot(index).clone())
    }

    /// Overwrite slot `index`, taking ownership of `value`. Sequences expand
    /// on demand; other kinds bound-check.
    pub fn put(&mut self, index: usize, value: V) -> ColResult<()> {
        if index >= self.size {
            match self.kind {
                ColKind::Sequence | ColKind::Vobj => self.expand(index)?,
                _ => {
                    return Err(ColError::IndexOutOfRange {
                        index,
                        size: self.size,
                    })
                }
            }
        }
        self.note_value(&value, index);
        if self.kind.is_set_like() {
            self.sorted = false;
        }
        *self.slot_mut(index) = value;
        Ok(())
    }

    /// Insert at `index`, shifting everything at or above it up by one.
    pub fn insert(&mut self, index: usize, value: V) -> ColResult<()> {
        if index > self.size {
            if matches!(self.kind, ColKind::Sequence | ColKind::Vobj) {
                return self.put(index, value);
            }
            return Err(ColError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        if self.kind.is_set_like() {
            self.sorted = false;
        }
        self.insert_inner(index, value);
        Ok(())
    }

    /// Delete the element at `index`, shifting the tail down by one.
    pub fn remove(&mut self, index: usize) -> ColResult<V> {
        if index >= self.size {
            return Err(ColError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        let value = mem::replace(self.slot_mut(index), V::null());
        if index + 1 < self.size {
            self.shift_down(index, self.size - 1);
        }
        self.size -= 1;
        self.trim_blocks();
        if self.last_insert >= self.size {
            self.last_insert = self.size.saturating_sub(1);
        }
        Ok(value)
    }

    /// Sorted-insertion index for `value` plus whether an equal element
    /// exists.
    ///
    /// NULL never matches anything and would be appended at the end. Sorted
    /// set-like collections binary search, seeded from the last touched
    /// position; multisets land on the rightmost member of a duplicate run.
    /// Everything else is a linear scan.
    pub fn find(&self, value: &V, coerce: bool) -> ColResult<(usize, bool)> {
        if value.is_null() {
            return Ok((self.size, false));
        }
        if !self.kind.is_set_like() || !self.order_trusted() {
            for i in 0..self.size {
                if self.slot(i).compare(value, coerce) == Compare::Eq {
                    return Ok((i, true));
                }
            }
            return Ok((self.size, false));
        }
        self.sorted_find(value, coerce)
    }

    pub fn is_member(&self, value: &V) -> ColResult<bool> {
        Ok(self.find(value, true)?.1)
    }

    /// Add one element according to the collection kind.
    ///
    /// Sets reject duplicates. When the sorted insertion point is more than
    /// a block width away from the end, the element is appended instead and
    /// the sort deferred, so bulk construction costs one sort pass rather
    /// than a shift per insert.
    pub fn add(&mut self, value: V) -> ColResult<()> {
        match self.kind {
            ColKind::Sequence | ColKind::Vobj => {
                let at = self.size;
                self.ensure_blocks(at);
                self.note_value(&value, at);
                *self.slot_mut(at) = value;
                self.size = at + 1;
                Ok(())
            }
            ColKind::Set => {
                let (idx, found) = self.find(&value, true)?;
                if found {
                    return Err(ColError::DuplicateValue);
                }
                self.place_sorted(idx, value);
                Ok(())
            }
            ColKind::Multiset => {
                if self.order_trusted() {
                    let (idx, found) = self.find(&value, true)?;
                    let pos = if found { idx + 1 } else { idx };
                    self.place_sorted(pos, value);
                } else {
                    self.note_value(&value, self.size);
                    let at = self.size;
                    self.ensure_blocks(at);
                    *self.slot_mut(at) = value;
                    self.size = at + 1;
                }
                Ok(())
            }
        }
    }

    /// Remove one occurrence of `value`. Sequences NULL the matching slot
    /// instead, preserving positions.
    pub fn drop_value(&mut self, value: &V) -> ColResult<()> {
        let (idx, found) = self.find(value, true)?;
        if !found {
            return Err(ColError::ValueNotFound);
        }
        match self.kind {
            ColKind::Sequence | ColKind::Vobj => {
                *self.slot_mut(idx) = V::null();
                Ok(())
            }
            _ => self.remove(idx).map(|_| ()),
        }
    }

    /// Remove NULL elements from set-like collections; a suffix trim when
    /// the collection is sorted (NULLs live at the end). Sequences keep
    /// their NULL holes. Returns the number removed.
    pub fn drop_nulls(&mut self) -> ColResult<usize> {
        if !self.kind.is_set_like() {
            return Ok(0);
        }
        let mut removed = 0;
        if self.order_trusted() {
            while self.size > 0 && self.slot(self.size - 1).is_null() {
                self.size -= 1;
                removed += 1;
            }
            self.trim_blocks();
            if self.last_insert >= self.size {
                self.last_insert = self.size.saturating_sub(1);
            }
        } else {
            for i in (0..self.size).rev() {
                if self.slot(i).is_null() {
                    self.remove(i)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Walk backward over all elements; with `remove_dangling` set, any
    /// object reference the collaborator confirms dangling becomes NULL
    /// (sequences) or is deleted (sets). Returns the resulting cardinality.
    pub fn filter<F>(&mut self, remove_dangling: bool, mut is_dangling: F) -> ColResult<usize>
    where
        F: FnMut(&V) -> bool,
    {
        if remove_dangling {
            for i in (0..self.size).rev() {
                if self.slot(i).is_null() {
                    continue;
                }
                if is_dangling(self.slot(i)) {
                    if self.kind.is_set_like() {
                        self.remove(i)?;
                    } else {
                        *self.slot_mut(i) = V::null();
                    }
                }
            }
        }
        Ok(self.cardinality())
    }

    /// Re-kind the collection in place. Converting to a Set sorts and drops
    /// duplicate values; converting away from set-like kinds freezes the
    /// current order as positional content.
    pub fn convert(&mut self, kind: ColKind) -> ColResult<()> {
        if kind == self.kind {
            return Ok(());
        }
        match kind {
            ColKind::Set => {
                self.sort();
                let mut i = 1;
                while i < self.size {
                    let dup =
                        self.slot(i - 1).compare(self.slot(i), false) == Compare::Eq;
                    if dup {
                        self.remove(i)?;
                    } else {
                        i += 1;
                    }
                }
                self.kind = ColKind::Set;
            }
            ColKind::Multiset => {
                // Positional content was never kept in order; the cached
                // flag still carries the constructor's empty-state value
                if !self.kind.is_set_like() {
                    self.sorted = false;
                }
                self.kind = ColKind::Multiset;
            }
            ColKind::Sequence | ColKind::Vobj => {
                self.kind = kind;
                self.sorted = false;
            }
        }
        Ok(())
    }

    /// Drop all elements and storage.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.size = 0;
        self.last_insert = 0;
        self.sorted = true;
        self.unresolved = false;
    }

    /// Forward iterator over the logical elements. The collection must not
    /// be mutated while the iterator is live.
    pub fn iter(&self) -> ColIter<'_, V> {
        ColIter {
            col: self,
            index: 0,
        }
    }

    /// Snapshot of all logical elements.
    pub fn values(&self) -> Vec<V> {
        self.iter().cloned().collect()
    }

    // ---- internal ----

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> &V {
        &self.blocks[index / COL_BLOCK_SIZE][index % COL_BLOCK_SIZE]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut V {
        &mut self.blocks[index / COL_BLOCK_SIZE][index % COL_BLOCK_SIZE]
    }

    /// Cached order is only trusted when no element may hold a temporary
    /// reference.
    #[inline]
    pub(crate) fn order_trusted(&self) -> bool {
        self.sorted && !self.unresolved
    }

    // Make `max_index` physically addressable, NULL-filling new blocks.
    pub(crate) fn ensure_blocks(&mut self, max_index: usize) {
        let needed = max_index / COL_BLOCK_SIZE + 1;
        while self.blocks.len() < needed {
            let mut block = Vec::with_capacity(COL_BLOCK_SIZE);
            block.resize_with(COL_BLOCK_SIZE, V::null);
            self.blocks.push(block);
        }
    }

    // Release trailing blocks the logical size no longer reaches.
    fn trim_blocks(&mut self) {
        let needed = self.size.div_ceil(COL_BLOCK_SIZE);
        while self.blocks.len() > needed {
            self.blocks.pop();
        }
    }

    fn note_value(&mut self, value: &V, index: usize) {
        if value.has_temporary_reference() {
            self.unresolved = true;
        }
        if !value.is_null() {
            self.last_insert = index;
        }
    }

    pub(crate) fn insert_inner(&mut self, index: usize, value: V) {
        self.ensure_blocks(self.size);
        if index < self.size {
            self.shift_up(index, self.size - 1);
        }
        self.note_value(&value, index);
        *self.slot_mut(index) = value;
        self.size += 1;
    }

    // Ordered insert for `add`: keep the sort when the position is near the
    // end, otherwise append and defer.
    fn place_sorted(&mut self, pos: usize, value: V) {
        if self.order_trusted() {
            if pos + DEFER_SORT_THRESHOLD < self.size {
                let at = self.size;
                self.ensure_blocks(at);
                self.note_value(&value, at);
                *self.slot_mut(at) = value;
                self.size = at + 1;
                self.sorted = false;
            } else {
                // in-order insert keeps the collection sorted
                self.insert_inner(pos, value);
            }
        } else {
            let at = self.size;
            self.ensure_blocks(at);
            self.note_value(&value, at);
            *self.slot_mut(at) = value;
            self.size = at + 1;
        }
    }

    // Move [index, old_top] up to [index+1, old_top+1]. Only whole runs move:
    // each block shifts within itself and hands its last element across the
    // boundary to the next block's first slot.
    fn shift_up(&mut self, index: usize, old_top: usize) {
        let b = COL_BLOCK_SIZE;
        let first = index / b;
        let last = (old_top + 1) / b;
        let off = index % b;

        let mut blk = last;
        while blk > first {
            let hi = if blk == last { (old_top + 1) % b } else { b - 1 };
            let carry = mem::replace(&mut self.blocks[blk - 1][b - 1], V::null());
            self.blocks[blk][..=hi].rotate_right(1);
            self.blocks[blk][0] = carry;
            blk -= 1;
        }
        let hi = if first == last { (old_top + 1) % b } else { b - 1 };
        self.blocks[first][off..=hi].rotate_right(1);
    }

    // Move (index, old_top] down to [index, old_top-1]; the vacated tail
    // slot ends up NULL (the caller nulls slot `index` first).
    fn shift_down(&mut self, index: usize, old_top: usize) {
        let b = COL_BLOCK_SIZE;
        let first = index / b;
        let last = old_top / b;
        let off = index % b;

        let hi_first = if first == last { old_top % b } else { b - 1 };
        self.blocks[first][off..=hi_first].rotate_left(1);
        let mut blk = first + 1;
        while blk <= last {
            let hi = if blk == last { old_top % b } else { b - 1 };
            let carry = mem::replace(&mut self.blocks[blk][0], V::null());
            self.blocks[blk - 1][b - 1] = carry;
            self.blocks[blk][..=hi].rotate_left(1);
            blk += 1;
        }
    }

    // Binary search over the non-NULL prefix of a sorted collection.
    fn sorted_find(&self, value: &V, coerce: bool) -> ColResult<(usize, bool)> {
        let mut top = self.size;
        while top > 0 && self.slot(top - 1).is_null() {
            top -= 1;
        }

        let mut lo = 0usize;
        let mut hi = top;
        // First probe comes from the last touched position: insert/lookup
        // traffic clusters there
        let mut probe = if top == 0 { 0 } else { self.last_insert.min(top - 1) };
        let mut equal_at = None;
        while lo < hi {
            let mid = probe.clamp(lo, hi - 1);
            match self.slot(mid).compare(value, coerce) {
                Compare::Lt => lo = mid + 1,
                Compare::Gt => hi = mid,
                Compare::Eq => {
                    equal_at = Some(mid);
                    break;
                }
                Compare::Unknown => return Err(ColError::ComparisonUnknown),
            }
            probe = lo + (hi - lo) / 2;
        }
        let Some(mid) = equal_at else {
            return Ok((lo, false));
        };
        if self.kind != ColKind::Multiset {
            return Ok((mid, true));
        }

        // Rightmost element of the duplicate run, bounded by the first
        // strictly-greater element
        let mut l = mid;
        let mut h = hi;
        while l + 1 < h {
            let m = l + (h - l) / 2;
            match self.slot(m).compare(value, coerce) {
                Compare::Eq => l = m,
                Compare::Unknown => return Err(ColError::ComparisonUnknown),
                _ => h = m,
            }
        }
        Ok((l, true))
    }
}

impl<V: Value> std::fmt::Debug for Col<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Col")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("sorted", &self.sorted)
            .finish()
    }
}

/// Forward-only iterator over a collection's logical elements.
pub struct ColIter<'a, V: Value> {
    col: &'a Col<V>,
    index: usize,
}

impl<'a, V: Value> Iterator for ColIter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.col.size {
            return None;
        }
        let item = self.col.slot(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.col.size - self.index;
        (rest, Some(rest))
    }
}

impl<'a, V: Value> IntoIterator for &'a Col<V> {
    type Item = &'a V;
    type IntoIter = ColIter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
