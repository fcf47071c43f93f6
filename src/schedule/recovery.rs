//! Variable recovery (spec.md §4.C4.4): reconstructing an underived
//! ancestor's coordinate once its derived descendants are defined, and the
//! dual operation of declaring a derived child from an underived
//! coordinate. Grounded on `recoverVariable`/`recoverChild`; the `Fuse`
//! formula (`fused = outer*innerSize + inner`, inverted here) was commented
//! out in the source and is implemented from the bounds table, which
//! already fixes the inverse relationship (see DESIGN.md Open Question 2).

use crate::error::ReasonError;
use crate::ir::expr::Access;
use crate::ir::indexvar::IndexVar;
use crate::schedule::bounds::Bound;
use crate::schedule::rel::IndexVarRel;

/// A single recovery assignment to be emitted as a `LoopIr::Recover` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// `parent = outer*factor + inner`
    SplitParent {
        parent: IndexVar,
        outer: IndexVar,
        inner: IndexVar,
        factor: usize,
    },
    /// `outer = fused / inner_size`
    FuseOuter {
        outer: IndexVar,
        fused: IndexVar,
        inner_size: usize,
    },
    /// `inner = fused % inner_size`
    FuseInner {
        inner: IndexVar,
        fused: IndexVar,
        inner_size: usize,
    },
    /// `parent = crd_array[pos_var] - parent_coord_low`
    PosParent {
        parent: IndexVar,
        pos_var: IndexVar,
        access: Access,
        parent_coord_low: usize,
    },
    /// `pos_var = binary_search_after(crd_array[seg], parent)`
    PosDeclare {
        pos_var: IndexVar,
        access: Access,
        segment: Bound,
        parent: IndexVar,
    },
}

/// Reconstruct `parent`'s coordinate from `outer`/`inner` (both must already
/// be defined).
pub fn split_recover_parent(
    parent: IndexVar,
    outer: IndexVar,
    inner: IndexVar,
    factor: usize,
) -> Recovery {
    Recovery::SplitParent {
        parent,
        outer,
        inner,
        factor,
    }
}

/// Reconstruct `outer_parent`/`inner_parent` from `fused` (spec.md §4.C4.4:
/// `outer = fused/innerSize`, `inner = fused mod innerSize`).
pub fn fuse_recover_parents(rel: &IndexVarRel, inner_size: usize) -> Result<[Recovery; 2], ReasonError> {
    match rel {
        IndexVarRel::Fuse(f) => Ok([
            Recovery::FuseOuter {
                outer: f.outer_parent.clone(),
                fused: f.fused.clone(),
                inner_size,
            },
            Recovery::FuseInner {
                inner: f.inner_parent.clone(),
                fused: f.fused.clone(),
                inner_size,
            },
        ]),
        _ => Err(ReasonError::from("fuse_recover_parents requires a Fuse relation")),
    }
}

/// Reconstruct the `Pos` rel's underived parent from its `pos_var`
/// (spec.md §4.C4.4: `parent = crdArray[posVar] - parentCoordLow`).
pub fn pos_recover_parent(rel: &IndexVarRel, parent_coord_low: usize) -> Result<Recovery, ReasonError> {
    match rel {
        IndexVarRel::Pos(p) => Ok(Recovery::PosParent {
            parent: p.parent.clone(),
            pos_var: p.pos_var.clone(),
            access: p.access.clone(),
            parent_coord_low,
        }),
        _ => Err(ReasonError::from("pos_recover_parent requires a Pos relation")),
    }
}

/// Dually: given an underived coordinate, declare the derived `pos_var`
/// child via binary search over the access's position segment.
pub fn pos_declare_child(rel: &IndexVarRel, segment: Bound) -> Result<Recovery, ReasonError> {
    match rel {
        IndexVarRel::Pos(p) => Ok(Recovery::PosDeclare {
            pos_var: p.pos_var.clone(),
            access: p.access.clone(),
            segment,
            parent: p.parent.clone(),
        }),
        _ => Err(ReasonError::from("pos_declare_child requires a Pos relation")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::rel::{FuseRel, SplitRel};

    #[test]
    fn split_recover_parent_builds_expected_formula() {
        let p = IndexVar::new("i");
        let o = IndexVar::new("i1");
        let n = IndexVar::new("i2");
        let r = split_recover_parent(p.clone(), o.clone(), n.clone(), 4);
        assert_eq!(
            r,
            Recovery::SplitParent {
                parent: p,
                outer: o,
                inner: n,
                factor: 4
            }
        );
    }

    #[test]
    fn fuse_recover_parents_requires_fuse_relation() {
        let i = IndexVar::new("i");
        let rel = IndexVarRel::Split(SplitRel {
            parent: i.clone(),
            outer: i.clone(),
            inner: i,
            factor: 2,
        });
        assert!(fuse_recover_parents(&rel, 4).is_err());
    }

    #[test]
    fn fuse_recover_parents_produces_both_formulas() {
        let op = IndexVar::new("op");
        let ip = IndexVar::new("ip");
        let f = IndexVar::new("f");
        let rel = IndexVarRel::Fuse(FuseRel {
            outer_parent: op.clone(),
            inner_parent: ip.clone(),
            fused: f.clone(),
        });
        let [ro, ri] = fuse_recover_parents(&rel, 8).unwrap();
        assert_eq!(
            ro,
            Recovery::FuseOuter {
                outer: op,
                fused: f.clone(),
                inner_size: 8
            }
        );
        assert_eq!(
            ri,
            Recovery::FuseInner {
                inner: ip,
                fused: f,
                inner_size: 8
            }
        );
    }
}
