//! Property tests for the invariants spec.md's Scenarios section lists
//! alongside the worked examples: split/fuse round-trips and rel-graph
//! acyclicity/termination. Equality reflexivity and zero-propagation
//! soundness are exercised as unit tests next to the code they cover
//! (`ir/equals.rs`, `notation/zero.rs`); these are the ones that benefit
//! from randomized coverage over many inputs.

use proptest::prelude::*;
use sparseq::ir::indexvar::IndexVar;
use sparseq::schedule::bounds::{fuse_iter_bounds, split_inner_iter_bounds, split_outer_iter_bounds, Bound};
use sparseq::schedule::rel::{IndexVarRel, SplitRel};
use sparseq::schedule::RelGraph;

proptest! {
    /// `Split(k)` of a coordinate `c` in `[0, dim)` must satisfy
    /// `c = outer*k + inner` with `outer`/`inner` inside the bounds the
    /// derivation rules compute for them (spec.md §8 "Split round-trip").
    #[test]
    fn split_round_trip(dim in 1usize..500, factor in 1usize..32, c in 0usize..dim) {
        let parent = Bound::new(0, dim);
        let outer = c / factor;
        let inner = c % factor;

        let outer_bound = split_outer_iter_bounds(parent, factor);
        prop_assert!(outer >= outer_bound.lo && outer < outer_bound.hi);

        let inner_bound = split_inner_iter_bounds(parent, factor, Some(outer));
        prop_assert!(inner >= inner_bound.lo && inner < inner_bound.hi);

        prop_assert_eq!(outer * factor + inner, c);
    }

    /// `Fuse`'s coordinate `fused = outer*innerSize + inner` must invert
    /// back to the same `(outer, inner)` pair it was built from, and must
    /// land inside the bound `fuse_iter_bounds` predicts for the full
    /// cross product of the two parents (spec.md §8 "Fuse round-trip").
    #[test]
    fn fuse_round_trip(outer_hi in 1usize..50, inner_size in 1usize..50, outer in 0usize..outer_hi, inner in 0usize..inner_size) {
        let fused = outer * inner_size + inner;
        prop_assert_eq!(fused / inner_size, outer);
        prop_assert_eq!(fused % inner_size, inner);

        let bound = fuse_iter_bounds(Bound::new(0, outer_hi), Bound::new(0, inner_size), inner_size);
        prop_assert!(fused >= bound.lo && fused < bound.hi);
    }

    /// A chain of `depth` nested splits rooted at one variable must stay a
    /// DAG: every leaf's `underived_ancestors` terminates and names exactly
    /// the root (spec.md §8 "Rel-graph acyclicity").
    #[test]
    fn split_chain_rel_graph_is_acyclic(depth in 1usize..20) {
        let root = IndexVar::new("root");
        let mut rels = Vec::new();
        let mut parent = root.clone();
        let mut leaf = root.clone();
        for n in 0..depth {
            let outer = IndexVar::new(format!("o{n}"));
            let inner = IndexVar::new(format!("n{n}"));
            rels.push(IndexVarRel::Split(SplitRel {
                parent: parent.clone(),
                outer: outer.clone(),
                inner: inner.clone(),
                factor: 2,
            }));
            parent = outer;
            leaf = inner;
        }
        let graph = RelGraph::build(&rels);
        let ancestors = graph.underived_ancestors(&leaf);
        prop_assert_eq!(ancestors, vec![root]);
    }
}
