//! [`IndexVarRel`]: the relations that derive new index variables from
//! existing ones (spec.md §3, §4.C4.1). These are the edges of the
//! index-variable relation graph built in [`crate::schedule::graph`].

use crate::ir::expr::Access;
use crate::ir::indexvar::IndexVar;

/// `Split(parent, outer, inner, factor)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRel {
    pub parent: IndexVar,
    pub outer: IndexVar,
    pub inner: IndexVar,
    pub factor: usize,
}

/// `Pos(parent, pos_var, access)` -- switches a coordinate variable to
/// iterate over `access`'s position space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosRel {
    pub parent: IndexVar,
    pub pos_var: IndexVar,
    pub access: Access,
}

/// `Fuse(outer_parent, inner_parent, fused)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuseRel {
    pub outer_parent: IndexVar,
    pub inner_parent: IndexVar,
    pub fused: IndexVar,
}

/// A schedule predicate deriving one or more child index variables from one
/// or more parents. `SuchThat`'s predicate list (spec.md §3) is a `Vec` of
/// these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexVarRel {
    Split(SplitRel),
    Pos(PosRel),
    Fuse(FuseRel),
}

impl IndexVarRel {
    pub fn parents(&self) -> Vec<IndexVar> {
        match self {
            IndexVarRel::Split(r) => vec![r.parent.clone()],
            IndexVarRel::Pos(r) => vec![r.parent.clone()],
            IndexVarRel::Fuse(r) => vec![r.outer_parent.clone(), r.inner_parent.clone()],
        }
    }

    pub fn children(&self) -> Vec<IndexVar> {
        match self {
            IndexVarRel::Split(r) => vec![r.outer.clone(), r.inner.clone()],
            IndexVarRel::Pos(r) => vec![r.pos_var.clone()],
            IndexVarRel::Fuse(r) => vec![r.fused.clone()],
        }
    }

    /// Variables that *keep* irregularity from a parent (spec.md §4.C4.2).
    pub fn irregulars(&self) -> Vec<IndexVar> {
        match self {
            IndexVarRel::Split(r) => vec![r.outer.clone()],
            IndexVarRel::Pos(r) => vec![r.pos_var.clone()],
            IndexVarRel::Fuse(r) => vec![r.fused.clone()],
        }
    }
}
