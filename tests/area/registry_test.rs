/*!
 * Registry Tests
 * Area lifecycle through the allocator registry
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::Arc;
use valstore::area::{AllocatorRegistry, AreaError, AreaOptions};

#[test]
#[serial]
fn test_lifecycle_create_use_destroy() {
    let registry = AllocatorRegistry::new();
    let area = registry.create("records", 48, 64).unwrap();
    assert_eq!(registry.area_count(), 1);

    let ptrs: Vec<_> = (0..50).map(|_| area.allocate().unwrap()).collect();
    assert_eq!(area.used_count(), 50);
    for p in ptrs {
        area.free(p).unwrap();
    }

    registry.destroy(&area).unwrap();
    assert_eq!(registry.area_count(), 0);
    assert!(registry.find("records").is_none());
}

#[test]
#[serial]
fn test_destroy_twice_reports_not_registered() {
    let registry = AllocatorRegistry::new();
    let area = registry.create("once", 24, 64).unwrap();
    registry.destroy(&area).unwrap();
    assert!(matches!(
        registry.destroy(&area),
        Err(AreaError::NotRegistered(_))
    ));
}

#[test]
#[serial]
fn test_find_returns_registered_instance() {
    let registry = AllocatorRegistry::new();
    let a = registry.create("strings", 16, 64).unwrap();
    let b = registry.create("numbers", 8, 64).unwrap();
    assert!(Arc::ptr_eq(&a, &registry.find("strings").unwrap()));
    assert!(Arc::ptr_eq(&b, &registry.find("numbers").unwrap()));
    assert!(registry.find("missing").is_none());
}

#[test]
#[serial]
fn test_create_with_options() {
    let registry = AllocatorRegistry::new();
    let area = registry
        .create_with(AreaOptions::new("checked", 24, 64).with_integrity(true))
        .unwrap();
    let p = area.allocate().unwrap();
    area.free(p).unwrap();
    assert!(matches!(area.free(p), Err(AreaError::DoubleFree { .. })));
}

#[test]
#[serial]
fn test_registry_stats_aggregate() {
    let registry = AllocatorRegistry::new();
    let a = registry.create("a", 24, 64).unwrap();
    let b = registry.create("b", 24, 64).unwrap();
    for _ in 0..10 {
        a.allocate().unwrap();
    }
    for _ in 0..5 {
        b.allocate().unwrap();
    }

    let stats = registry.stats();
    assert_eq!(stats.area_count, 2);
    assert_eq!(stats.total_in_use, 15);
    assert!(stats.total_capacity >= 128);
}

#[test]
#[serial]
fn test_flush_all_resets_every_area() {
    let registry = AllocatorRegistry::new();
    let a = registry.create("a", 24, 64).unwrap();
    let b = registry.create("b", 24, 64).unwrap();
    for _ in 0..20 {
        a.allocate().unwrap();
        b.allocate().unwrap();
    }
    registry.flush_all();
    assert_eq!(a.used_count(), 0);
    assert_eq!(b.used_count(), 0);
    // Areas stay registered and usable
    assert_eq!(registry.area_count(), 2);
    assert!(a.allocate().is_ok());
}

#[test]
#[serial]
fn test_shutdown_then_empty() {
    let registry = AllocatorRegistry::new();
    registry.create("a", 8, 64).unwrap();
    registry.create("b", 8, 64).unwrap();
    registry.shutdown();
    assert_eq!(registry.area_count(), 0);
    assert_eq!(registry.stats().area_count, 0);
}
