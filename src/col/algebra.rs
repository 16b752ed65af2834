/*!
 * Set Algebra
 * Union, intersection, difference and collection comparison
 */

use super::object::Col;
use super::types::{ColError, ColKind, ColResult, SetRelation};
use super::value::Value;
use crate::core::compare::Compare;
use std::cmp::Ordering;

// Append into the result, letting a Set result collapse duplicates.
fn emit<V: Value>(out: &mut Col<V>, value: V) -> ColResult<()> {
    match out.add(value) {
        Err(ColError::DuplicateValue) if out.kind() == ColKind::Set => Ok(()),
        other => other,
    }
}

fn require_set_like<V: Value>(col: &Col<V>) -> ColResult<()> {
    if col.kind().is_set_like() {
        Ok(())
    } else {
        Err(ColError::InvalidKind)
    }
}

/// Merge every element of `a` and `b` into `out`.
///
/// NULLs are copied through unconditionally and never merge with each other;
/// equal non-NULL pairs emit both copies (a Set result collapses them). The
/// result kind is whatever collection the caller passes in.
pub fn union_into<V: Value>(a: &mut Col<V>, b: &mut Col<V>, out: &mut Col<V>) -> ColResult<()> {
    require_set_like(a)?;
    require_set_like(b)?;
    a.ensure_sorted();
    b.ensure_sorted();

    let (mut i, mut j) = (0usize, 0usize);
    while i < a.size() && j < b.size() {
        if a.slot(i).is_null() {
            emit(out, a.slot(i).clone())?;
            i += 1;
            continue;
        }
        if b.slot(j).is_null() {
            emit(out, b.slot(j).clone())?;
            j += 1;
            continue;
        }
        match a.slot(i).compare(b.slot(j), true) {
            Compare::Lt => {
                emit(out, a.slot(i).clone())?;
                i += 1;
            }
            Compare::Gt => {
                emit(out, b.slot(j).clone())?;
                j += 1;
            }
            Compare::Eq => {
                emit(out, a.slot(i).clone())?;
                emit(out, b.slot(j).clone())?;
                i += 1;
                j += 1;
            }
            // Non-NULL operands the comparator cannot order: fall back to
            // the total order so the merge always advances
            Compare::Unknown => {
                if a.slot(i).total_cmp(b.slot(j)) == Ordering::Greater {
                    emit(out, b.slot(j).clone())?;
                    j += 1;
                } else {
                    emit(out, a.slot(i).clone())?;
                    i += 1;
                }
            }
        }
    }
    while i < a.size() {
        emit(out, a.slot(i).clone())?;
        i += 1;
    }
    while j < b.size() {
        emit(out, b.slot(j).clone())?;
        j += 1;
    }
    Ok(())
}

/// Emit one copy of every pair of equal elements. NULLs never self-match,
/// so they are skipped; Unknown comparisons advance the total-order-smaller
/// side to guarantee forward progress.
pub fn intersect_into<V: Value>(
    a: &mut Col<V>,
    b: &mut Col<V>,
    out: &mut Col<V>,
) -> ColResult<()> {
    require_set_like(a)?;
    require_set_like(b)?;
    a.ensure_sorted();
    b.ensure_sorted();

    let (mut i, mut j) = (0usize, 0usize);
    while i < a.size() && j < b.size() {
        match a.slot(i).compare(b.slot(j), true) {
            Compare::Eq => {
                emit(out, a.slot(i).clone())?;
                i += 1;
                j += 1;
            }
            Compare::Lt => i += 1,
            Compare::Gt => j += 1,
            Compare::Unknown => {
                if a.slot(i).total_cmp(b.slot(j)) == Ordering::Greater {
                    j += 1;
                } else {
                    i += 1;
                }
            }
        }
    }
    Ok(())
}

/// Emit the elements of `a` with one `b` occurrence cancelled per equal
/// pair. NULLs in `a` survive (NULL is never a member of `b`).
pub fn difference_into<V: Value>(
    a: &mut Col<V>,
    b: &mut Col<V>,
    out: &mut Col<V>,
) -> ColResult<()> {
    require_set_like(a)?;
    require_set_like(b)?;
    a.ensure_sorted();
    b.ensure_sorted();

    let (mut i, mut j) = (0usize, 0usize);
    while i < a.size() && j < b.size() {
        match a.slot(i).compare(b.slot(j), true) {
            Compare::Lt => {
                emit(out, a.slot(i).clone())?;
                i += 1;
            }
            Compare::Eq => {
                i += 1;
                j += 1;
            }
            Compare::Gt => j += 1,
            Compare::Unknown => {
                if a.slot(i).total_cmp(b.slot(j)) == Ordering::Greater {
                    j += 1;
                } else {
                    emit(out, a.slot(i).clone())?;
                    i += 1;
                }
            }
        }
    }
    while i < a.size() {
        emit(out, a.slot(i).clone())?;
        i += 1;
    }
    Ok(())
}

/// Compare two collections as algebraic sets.
///
/// A size mismatch can only mean subset or superset; equal sizes are walked
/// element by element. NULLs yield `Unknown` rather than a definite answer.
pub fn compare_sets<V: Value>(a: &mut Col<V>, b: &mut Col<V>) -> ColResult<SetRelation> {
    require_set_like(a)?;
    require_set_like(b)?;
    a.ensure_sorted();
    b.ensure_sorted();

    if a.size() == b.size() {
        for i in 0..a.size() {
            match a.slot(i).compare(b.slot(i), true) {
                Compare::Eq => {}
                Compare::Unknown => return Ok(SetRelation::Unknown),
                _ => return Ok(SetRelation::NotEqual),
            }
        }
        return Ok(SetRelation::Equal);
    }

    let (small, large, relation) = if a.size() < b.size() {
        (&*a, &*b, SetRelation::Subset)
    } else {
        (&*b, &*a, SetRelation::Superset)
    };
    match contains_all(large, small)? {
        Containment::All => Ok(relation),
        Containment::Missing => Ok(SetRelation::NotEqual),
        Containment::Unknown => Ok(SetRelation::Unknown),
    }
}

enum Containment {
    All,
    Missing,
    Unknown,
}

// Merge walk checking that every element of `small` appears in `large`
// (duplicates counted).
fn contains_all<V: Value>(large: &Col<V>, small: &Col<V>) -> ColResult<Containment> {
    let (mut i, mut j) = (0usize, 0usize);
    while i < small.size() {
        if j >= large.size() {
            return Ok(Containment::Missing);
        }
        match small.slot(i).compare(large.slot(j), true) {
            Compare::Eq => {
                i += 1;
                j += 1;
            }
            Compare::Gt => j += 1,
            Compare::Lt => return Ok(Containment::Missing),
            Compare::Unknown => return Ok(Containment::Unknown),
        }
    }
    Ok(Containment::All)
}

/// Strict ordering of two collections, both sorted on demand.
///
/// A size mismatch decides the order before any element is looked at; equal
/// sizes are compared element by element. With `total_order` set the answer
/// is always definite: every element pair is ordered by the total order,
/// NULL ties included.
pub fn compare_order<V: Value>(
    a: &mut Col<V>,
    b: &mut Col<V>,
    total_order: bool,
) -> ColResult<Compare> {
    if a.size() != b.size() {
        return Ok(a.size().cmp(&b.size()).into());
    }
    a.ensure_sorted();
    b.ensure_sorted();

    for i in 0..a.size() {
        let c = if total_order {
            a.slot(i).total_cmp(b.slot(i)).into()
        } else {
            a.slot(i).compare(b.slot(i), true)
        };
        match c {
            Compare::Eq => {}
            other => return Ok(other),
        }
    }
    Ok(Compare::Eq)
}
