/*!
 * Area Concurrency Tests
 * Parallel allocate/free traffic against one area
 */

use std::collections::HashSet;
use std::sync::Arc;
use valstore::area::{Area, AreaOptions};

#[test]
fn test_parallel_allocations_never_overlap() {
    let area = Arc::new(Area::new(AreaOptions::new("mt", 32, 64)).unwrap());
    let mut joins = Vec::new();
    for _ in 0..8 {
        let area = Arc::clone(&area);
        joins.push(std::thread::spawn(move || {
            (0..250)
                .map(|_| area.allocate().unwrap().addr())
                .collect::<Vec<_>>()
        }));
    }

    let mut seen = HashSet::new();
    for join in joins {
        for addr in join.join().unwrap() {
            assert!(seen.insert(addr), "address 0x{:x} handed out twice", addr);
        }
    }
    assert_eq!(seen.len(), 2000);
    assert_eq!(area.used_count(), 2000);

    // Ranges must not overlap either
    let mut sorted: Vec<_> = seen.into_iter().collect();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        assert!(pair[1] - pair[0] >= 32);
    }
}

#[test]
fn test_parallel_alloc_free_churn() {
    let area = Arc::new(Area::new(AreaOptions::new("churn", 24, 64)).unwrap());
    let mut joins = Vec::new();
    for _ in 0..4 {
        let area = Arc::clone(&area);
        joins.push(std::thread::spawn(move || {
            for _ in 0..100 {
                let batch: Vec<_> = (0..20).map(|_| area.allocate().unwrap()).collect();
                for p in batch {
                    area.free(p).unwrap();
                }
            }
        }));
    }
    for join in joins {
        join.join().unwrap();
    }

    let stats = area.stats();
    assert_eq!(stats.n_allocs, stats.n_frees);
    assert_eq!(stats.in_use, 0);
}

#[test]
fn test_growth_during_concurrent_traffic() {
    let area = Arc::new(Area::new(AreaOptions::new("grow", 16, 64)).unwrap());

    // Pin some live elements, then grow from other threads
    let pinned: Vec<_> = (0..32).map(|_| area.allocate().unwrap()).collect();
    for (n, p) in pinned.iter().enumerate() {
        // Safety: slot is 16 bytes and exclusively ours
        unsafe { (p.as_ptr() as *mut u64).write(n as u64) };
    }

    let mut joins = Vec::new();
    for _ in 0..4 {
        let area = Arc::clone(&area);
        joins.push(std::thread::spawn(move || {
            (0..500).map(|_| area.allocate().unwrap()).for_each(drop);
        }));
    }
    for join in joins {
        join.join().unwrap();
    }

    assert!(area.block_count() >= 2);
    // Growth never moved the pinned elements
    for (n, p) in pinned.iter().enumerate() {
        assert!(area.validate(*p).is_ok());
        assert_eq!(unsafe { (p.as_ptr() as *const u64).read() }, n as u64);
    }
}
