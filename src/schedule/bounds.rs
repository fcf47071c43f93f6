//! Coordinate- and iteration-bound derivation for derived index variables
//! (spec.md §4.C4.3). Bounds are half-open intervals `[lo, hi)` over
//! `usize` coordinates.

use crate::interfaces::TensorStorageCollaborator;
use crate::schedule::graph::RelGraph;
use crate::schedule::rel::IndexVarRel;

/// A half-open interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub lo: usize,
    pub hi: usize,
}

impl Bound {
    pub fn new(lo: usize, hi: usize) -> Bound {
        Bound { lo, hi }
    }

    pub fn len(&self) -> usize {
        self.hi.saturating_sub(self.lo)
    }
}

fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Iteration bounds for a `Split`'s `outer`/`inner` children given the
/// parent's bounds and, when available, the outer value already fixed
/// (spec.md §4.C4.3 row "Split k, outer+inner defined").
pub fn split_outer_iter_bounds(parent: Bound, factor: usize) -> Bound {
    Bound::new(ceil_div(parent.lo, factor), ceil_div(parent.hi, factor))
}

pub fn split_inner_iter_bounds(parent: Bound, factor: usize, outer: Option<usize>) -> Bound {
    match outer {
        None => Bound::new(0, factor),
        Some(o) => {
            let coord_lo = parent.lo + o * factor;
            Bound::new(0, factor.min(parent.hi.saturating_sub(coord_lo)))
        }
    }
}

/// Coordinate bounds on the parent once `outer` is defined (children not
/// yet defined): `[lo + outer*k, min(hi, lo + outer*k + k))`.
pub fn split_coord_bounds_outer(parent: Bound, factor: usize, outer: usize) -> Bound {
    let lo = parent.lo + outer * factor;
    Bound::new(lo, parent.hi.min(lo + factor))
}

/// Coordinate bounds on the parent once both `outer` and `inner` are
/// defined: `[lo + outer*k + inner, min(hi, lo + outer*k + inner + 1))`.
pub fn split_coord_bounds_outer_inner(
    parent: Bound,
    factor: usize,
    outer: usize,
    inner: usize,
) -> Bound {
    let lo = parent.lo + outer * factor + inner;
    Bound::new(lo, parent.hi.min(lo + 1))
}

/// `Fuse`'s iteration bound on `fused`: `[outerLo*innerSize + innerLo,
/// outerHi*innerSize + innerHi)`.
pub fn fuse_iter_bounds(outer: Bound, inner: Bound, inner_size: usize) -> Bound {
    Bound::new(
        outer.lo * inner_size + inner.lo,
        outer.hi * inner_size + inner.hi,
    )
}

/// `Pos`'s iteration bounds for a single underived parent: binary-search
/// the access's position array for the parent's coordinate interval,
/// simplifying to the segment's own endpoints when the coordinate bound is
/// exactly `0` or exactly the dimension max (spec.md §4.C4.3,
/// `PosRelNode::locateBounds`).
pub fn locate_bounds(
    storage: &dyn TensorStorageCollaborator,
    rel: &IndexVarRel,
    coord_bound: Bound,
    dim_size: usize,
) -> Result<Bound, crate::error::ReasonError> {
    let pos_rel = match rel {
        IndexVarRel::Pos(p) => p,
        _ => return Err(crate::error::ReasonError::from("locate_bounds requires a Pos relation")),
    };
    let seg = storage.segment_bounds(&pos_rel.access)?;
    let crd = storage.crd_array(&pos_rel.access)?;
    let segment = &crd[seg.lo..seg.hi];

    let lo = if coord_bound.lo == 0 {
        seg.lo
    } else {
        seg.lo + lower_bound(segment, coord_bound.lo)
    };
    let hi = if coord_bound.hi == dim_size {
        seg.hi
    } else {
        seg.lo + lower_bound(segment, coord_bound.hi)
    };
    Ok(Bound::new(lo, hi))
}

/// Index of the first element `>= target` in a sorted slice (standard
/// binary search lower-bound), `segment.len()` if none.
fn lower_bound(segment: &[usize], target: usize) -> usize {
    segment.partition_point(|&x| x < target)
}

/// Derive the iteration bounds for `v` given its producing relation and its
/// (already-bound) parents' bounds, per the table in spec.md §4.C4.3.
/// Returns `None` when `v` is underived (the caller supplies the bound from
/// the dimension/format instead).
pub fn deriv_iter_bounds(graph: &RelGraph, v: &crate::ir::indexvar::IndexVar) -> Option<IterBoundsRequest> {
    let rel = graph.producing_rel(v)?;
    match rel {
        IndexVarRel::Split(s) => {
            if &s.outer == v {
                Some(IterBoundsRequest::SplitOuter { factor: s.factor })
            } else {
                Some(IterBoundsRequest::SplitInner { factor: s.factor })
            }
        }
        IndexVarRel::Fuse(_) => Some(IterBoundsRequest::Fuse),
        IndexVarRel::Pos(_) => Some(IterBoundsRequest::Pos),
    }
}

/// Which bound-derivation rule applies to a derived variable; the caller
/// supplies the concrete parent bounds (and, for `Pos`, a storage
/// collaborator) since those require external state this module does not
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterBoundsRequest {
    SplitOuter { factor: usize },
    SplitInner { factor: usize },
    Fuse,
    Pos,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_outer_ceil_divides() {
        let parent = Bound::new(0, 10);
        assert_eq!(split_outer_iter_bounds(parent, 4), Bound::new(0, 3));
    }

    #[test]
    fn split_inner_tightens_on_last_outer_tile() {
        let parent = Bound::new(0, 10);
        assert_eq!(split_inner_iter_bounds(parent, 4, Some(2)), Bound::new(0, 2));
        assert_eq!(split_inner_iter_bounds(parent, 4, Some(0)), Bound::new(0, 4));
    }

    #[test]
    fn fuse_combines_outer_and_inner() {
        let outer = Bound::new(0, 3);
        let inner = Bound::new(0, 4);
        assert_eq!(fuse_iter_bounds(outer, inner, 4), Bound::new(0, 12));
    }
}
