/*!
 * Area Allocator Tests
 * Allocation, address lookup, integrity checking and diagnostics
 */

use pretty_assertions::assert_eq;
use valstore::area::{Area, AreaError, AreaOptions};

fn checked_area(name: &str, element_size: usize, per_block: usize) -> Area {
    Area::new(AreaOptions::new(name, element_size, per_block).with_integrity(true)).unwrap()
}

#[test]
fn test_bulk_allocate_and_drain() {
    // element_size=24, alloc_count=256: 300 elements must span >= 2 blocks
    let area = checked_area("bulk", 24, 256);
    let ptrs: Vec<_> = (0..300).map(|_| area.allocate().unwrap()).collect();

    assert!(area.block_count() >= 2);
    assert_eq!(area.used_count(), 300);

    for p in &ptrs {
        area.free(*p).unwrap();
    }
    let stats = area.stats();
    assert_eq!(stats.n_allocs - stats.n_frees, 0);
    assert_eq!(stats.in_use, 0);
}

#[test]
fn test_validate_covers_every_live_pointer() {
    let area = checked_area("validate", 40, 64);
    let ptrs: Vec<_> = (0..200).map(|_| area.allocate().unwrap()).collect();
    for p in &ptrs {
        assert!(area.validate(*p).is_ok());
    }
}

#[test]
fn test_validate_rejects_foreign_pointer() {
    let a = checked_area("a", 24, 64);
    let b = checked_area("b", 24, 64);
    let from_b = b.allocate().unwrap();
    assert!(matches!(
        a.validate(from_b),
        Err(AreaError::IllegalPointer { .. })
    ));
}

#[test]
fn test_double_free_is_distinct_error() {
    let area = checked_area("dbl", 24, 64);
    let p = area.allocate().unwrap();
    area.free(p).unwrap();
    assert!(matches!(area.free(p), Err(AreaError::DoubleFree { .. })));
}

#[test]
fn test_release_layout_detects_double_free_via_bitmap() {
    // Even without the sentinel prefix the bitmap catches the second free
    let area = Area::new(AreaOptions::new("plain", 24, 64).with_integrity(false)).unwrap();
    let p = area.allocate().unwrap();
    area.free(p).unwrap();
    assert!(matches!(area.free(p), Err(AreaError::DoubleFree { .. })));
}

#[test]
fn test_slot_reuse_after_free() {
    let area = checked_area("reuse", 24, 64);
    let ptrs: Vec<_> = (0..64).map(|_| area.allocate().unwrap()).collect();
    area.free(ptrs[10]).unwrap();
    // The freed slot comes back before any growth
    let replacement = area.allocate().unwrap();
    assert_eq!(replacement, ptrs[10]);
    assert_eq!(area.block_count(), 1);
}

#[test]
fn test_pointers_usable_as_storage() {
    let area = checked_area("store", 16, 64);
    let ptrs: Vec<_> = (0..128).map(|_| area.allocate().unwrap()).collect();
    for (n, p) in ptrs.iter().enumerate() {
        // Safety: each slot is 16 bytes and exclusively ours
        unsafe { (p.as_ptr() as *mut u64).write(n as u64) };
    }
    for (n, p) in ptrs.iter().enumerate() {
        assert_eq!(unsafe { (p.as_ptr() as *const u64).read() }, n as u64);
    }
}

#[test]
fn test_stats_and_dump() {
    let area = checked_area("diag", 24, 64);
    for _ in 0..100 {
        area.allocate().unwrap();
    }
    let stats = area.stats();
    assert_eq!(stats.in_use, 100);
    assert_eq!(stats.element_size, 24);
    assert!(stats.usage_percentage > 0.0);

    let mut out = String::new();
    area.dump(&mut out).unwrap();
    assert!(out.contains("diag"));
    assert!(out.contains("100"));
}

#[test]
fn test_flush_then_reuse() {
    let area = checked_area("flush", 24, 64);
    for _ in 0..200 {
        area.allocate().unwrap();
    }
    area.flush();
    assert_eq!(area.used_count(), 0);
    let p = area.allocate().unwrap();
    assert!(area.validate(p).is_ok());
}
