/*!
 * Collection Property Tests
 * Randomized checks against simple reference models
 */

use proptest::prelude::*;
use std::collections::HashMap;
use valstore::col::{difference_into, intersect_into, union_into, Col};

type C = Col<Option<i64>>;

fn multiset_of(values: &[i64]) -> C {
    let mut col = C::multiset(0);
    for v in values {
        col.add(Some(*v)).unwrap();
    }
    col
}

fn counts(values: &[Option<i64>]) -> HashMap<Option<i64>, usize> {
    let mut map = HashMap::new();
    for v in values {
        *map.entry(*v).or_insert(0) += 1;
    }
    map
}

proptest! {
    #[test]
    fn prop_sort_matches_model(values in prop::collection::vec(
        prop::option::weighted(0.8, -1000i64..1000), 0..300
    )) {
        let mut col = C::sequence(0);
        for v in &values {
            col.add(*v).unwrap();
        }
        col.sort();

        let mut model: Vec<_> = values.iter().filter(|v| v.is_some()).copied().collect();
        model.sort();
        model.resize(values.len(), None);

        prop_assert_eq!(col.values(), model);
        prop_assert!(col.is_sorted());
    }

    #[test]
    fn prop_sort_is_idempotent(values in prop::collection::vec(
        prop::option::weighted(0.8, -100i64..100), 0..200
    )) {
        let mut col = C::multiset(0);
        for v in &values {
            col.add(*v).unwrap();
        }
        col.sort();
        let once = col.values();
        col.sort();
        prop_assert_eq!(col.values(), once);
    }

    #[test]
    fn prop_set_membership(values in prop::collection::hash_set(-500i64..500, 0..200)) {
        let mut set = C::set(0);
        for v in &values {
            set.add(Some(*v)).unwrap();
        }
        prop_assert_eq!(set.cardinality(), values.len());
        for v in &values {
            prop_assert!(set.is_member(&Some(*v)).unwrap());
        }
        prop_assert!(!set.is_member(&Some(1000)).unwrap());
    }

    #[test]
    fn prop_union_counts_add(
        a in prop::collection::vec(0i64..50, 0..100),
        b in prop::collection::vec(0i64..50, 0..100),
    ) {
        let mut out = C::multiset(0);
        union_into(&mut multiset_of(&a), &mut multiset_of(&b), &mut out).unwrap();

        let got = counts(&out.values());
        let ca = counts(&a.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        let cb = counts(&b.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        for (value, n) in &got {
            let expected = ca.get(value).unwrap_or(&0) + cb.get(value).unwrap_or(&0);
            prop_assert_eq!(*n, expected);
        }
        prop_assert_eq!(out.size(), a.len() + b.len());
    }

    #[test]
    fn prop_intersection_counts_min(
        a in prop::collection::vec(0i64..50, 0..100),
        b in prop::collection::vec(0i64..50, 0..100),
    ) {
        let mut out = C::multiset(0);
        intersect_into(&mut multiset_of(&a), &mut multiset_of(&b), &mut out).unwrap();

        let got = counts(&out.values());
        let ca = counts(&a.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        let cb = counts(&b.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        for (value, na) in &ca {
            let expected = (*na).min(*cb.get(value).unwrap_or(&0));
            prop_assert_eq!(*got.get(value).unwrap_or(&0), expected);
        }
    }

    #[test]
    fn prop_difference_counts_saturating_sub(
        a in prop::collection::vec(0i64..50, 0..100),
        b in prop::collection::vec(0i64..50, 0..100),
    ) {
        let mut out = C::multiset(0);
        difference_into(&mut multiset_of(&a), &mut multiset_of(&b), &mut out).unwrap();

        let got = counts(&out.values());
        let ca = counts(&a.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        let cb = counts(&b.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        for (value, na) in &ca {
            let expected = na.saturating_sub(*cb.get(value).unwrap_or(&0));
            prop_assert_eq!(*got.get(value).unwrap_or(&0), expected);
        }
    }

    #[test]
    fn prop_insert_then_remove_is_identity(
        values in prop::collection::vec(-100i64..100, 1..200),
        index in 0usize..200,
        extra in -100i64..100,
    ) {
        let mut seq = C::sequence(0);
        for v in &values {
            seq.add(Some(*v)).unwrap();
        }
        let before = seq.values();
        let at = index % (values.len() + 1);

        seq.insert(at, Some(extra)).unwrap();
        prop_assert_eq!(seq.get(at).unwrap(), Some(extra));
        prop_assert_eq!(seq.size(), values.len() + 1);

        let removed = seq.remove(at).unwrap();
        prop_assert_eq!(removed, Some(extra));
        prop_assert_eq!(seq.values(), before);
    }

    #[test]
    fn prop_drop_nulls_leaves_no_nulls(values in prop::collection::vec(
        prop::option::weighted(0.6, 0i64..50), 0..150
    )) {
        let mut ms = C::multiset(0);
        for v in &values {
            ms.add(*v).unwrap();
        }
        let null_count = values.iter().filter(|v| v.is_none()).count();
        prop_assert_eq!(ms.drop_nulls().unwrap(), null_count);
        prop_assert!(!ms.has_null());
        prop_assert_eq!(ms.size(), values.len() - null_count);
    }
}
