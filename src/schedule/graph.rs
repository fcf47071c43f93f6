//! The index-variable relation graph (spec.md §4.C4.2), built lazily from
//! the predicate list of an outermost `SuchThat`. Nodes are `IndexVar`s;
//! edges point parent -> child for each relation's `parents` x `children`.
//! Absence of a `SuchThat` gives an empty graph: every variable is both
//! underived and fully-derived.

use crate::ir::indexvar::IndexVar;
use crate::schedule::rel::IndexVarRel;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RelGraph {
    rels: Vec<IndexVarRel>,
    /// child -> index into `rels` of its unique producing relation.
    producer: HashMap<IndexVar, usize>,
    parents_of: HashMap<IndexVar, Vec<IndexVar>>,
    children_of: HashMap<IndexVar, Vec<IndexVar>>,
}

impl RelGraph {
    pub fn build(rels: &[IndexVarRel]) -> RelGraph {
        let mut g = RelGraph {
            rels: rels.to_vec(),
            ..Default::default()
        };
        for (idx, rel) in g.rels.clone().iter().enumerate() {
            let parents = rel.parents();
            let children = rel.children();
            for c in &children {
                g.producer.insert(c.clone(), idx);
                g.parents_of.insert(c.clone(), parents.clone());
            }
            for p in &parents {
                g.children_of
                    .entry(p.clone())
                    .or_default()
                    .extend(children.iter().cloned());
            }
        }
        g
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    pub fn parents(&self, v: &IndexVar) -> Vec<IndexVar> {
        self.parents_of.get(v).cloned().unwrap_or_default()
    }

    pub fn children(&self, v: &IndexVar) -> Vec<IndexVar> {
        self.children_of.get(v).cloned().unwrap_or_default()
    }

    pub fn is_underived(&self, v: &IndexVar) -> bool {
        self.parents(v).is_empty()
    }

    pub fn is_fully_derived(&self, v: &IndexVar) -> bool {
        self.children(v).is_empty()
    }

    pub fn underived_ancestors(&self, v: &IndexVar) -> Vec<IndexVar> {
        let mut out = Vec::new();
        let mut stack = self.parents(v);
        let mut seen = std::collections::HashSet::new();
        while let Some(p) = stack.pop() {
            if !seen.insert(p.clone()) {
                continue;
            }
            if self.is_underived(&p) {
                out.push(p.clone());
            } else {
                stack.extend(self.parents(&p));
            }
        }
        out
    }

    pub fn fully_derived_descendants(&self, v: &IndexVar) -> Vec<IndexVar> {
        let mut out = Vec::new();
        let mut stack = self.children(v);
        let mut seen = std::collections::HashSet::new();
        while let Some(c) = stack.pop() {
            if !seen.insert(c.clone()) {
                continue;
            }
            if self.is_fully_derived(&c) {
                out.push(c.clone());
            } else {
                stack.extend(self.children(&c));
            }
        }
        out
    }

    /// A variable is recoverable if every child is either `defined` or
    /// itself recoverable (spec.md §4.C4.2). Fully-derived variables are
    /// vacuously recoverable.
    pub fn is_recoverable(&self, v: &IndexVar, defined: &[IndexVar]) -> bool {
        self.is_recoverable_inner(v, defined, &mut std::collections::HashSet::new())
    }

    fn is_recoverable_inner(
        &self,
        v: &IndexVar,
        defined: &[IndexVar],
        visiting: &mut std::collections::HashSet<IndexVar>,
    ) -> bool {
        if defined.contains(v) {
            return true;
        }
        if !visiting.insert(v.clone()) {
            return false;
        }
        let result = self
            .children(v)
            .iter()
            .all(|c| defined.contains(c) || self.is_recoverable_inner(c, defined, visiting));
        visiting.remove(v);
        result
    }

    /// Parents that become recoverable once `v` is added to `previously_defined`,
    /// cascading transitively up the graph. A `Fuse` relation's *outer*
    /// parent is excluded when the fused variable has a `Pos`-derived
    /// irregular descendant -- that parent requires its own while-loop and
    /// is never automatically recovered (spec.md §4.C4.2, SPEC_FULL.md §4.C4
    /// supplement on `getPosIteratorDescendant`).
    pub fn newly_recoverable(&self, v: &IndexVar, previously_defined: &[IndexVar]) -> Vec<IndexVar> {
        let mut defined = previously_defined.to_vec();
        if !defined.contains(v) {
            defined.push(v.clone());
        }
        let mut result = Vec::new();
        let mut frontier = vec![v.clone()];
        while let Some(cur) = frontier.pop() {
            for p in self.parents(&cur) {
                if defined.contains(&p) || result.contains(&p) {
                    continue;
                }
                if self.is_excluded_fuse_outer_parent(&p) {
                    continue;
                }
                if self.is_recoverable(&p, &defined) {
                    result.push(p.clone());
                    defined.push(p.clone());
                    frontier.push(p);
                }
            }
        }
        result
    }

    fn is_excluded_fuse_outer_parent(&self, p: &IndexVar) -> bool {
        for rel in &self.rels {
            if let IndexVarRel::Fuse(f) = rel {
                if &f.outer_parent == p {
                    let has_pos_descendant = self.is_pos_variable(&f.fused)
                        || self
                            .fully_derived_descendants(&f.fused)
                            .iter()
                            .any(|d| self.is_pos_variable(d));
                    if has_pos_descendant {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether `v` is derived through a `Pos` relation, directly or via any
    /// underived-bound ancestor chain.
    pub fn is_pos_variable(&self, v: &IndexVar) -> bool {
        if let Some(&idx) = self.producer.get(v) {
            if matches!(self.rels[idx], IndexVarRel::Pos(_)) {
                return true;
            }
            return self.parents(v).iter().any(|p| self.is_pos_variable(p));
        }
        false
    }

    /// Underived variables are irregular; derived variables are irregular
    /// iff their producing relation lists them in `irregulars()`.
    pub fn is_irregular(&self, v: &IndexVar) -> bool {
        match self.producer.get(v) {
            None => true,
            Some(&idx) => self.rels[idx].irregulars().contains(v),
        }
    }

    pub fn producing_rel(&self, v: &IndexVar) -> Option<&IndexVarRel> {
        self.producer.get(v).map(|&idx| &self.rels[idx])
    }

    pub fn rels(&self) -> &[IndexVarRel] {
        &self.rels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::rel::{FuseRel, SplitRel};

    #[test]
    fn empty_graph_makes_every_variable_underived_and_fully_derived() {
        let g = RelGraph::build(&[]);
        let i = IndexVar::new("i");
        assert!(g.is_underived(&i));
        assert!(g.is_fully_derived(&i));
    }

    #[test]
    fn split_children_are_derived_and_parent_is_not_fully_derived() {
        let i = IndexVar::new("i");
        let i1 = IndexVar::new("i1");
        let i2 = IndexVar::new("i2");
        let g = RelGraph::build(&[IndexVarRel::Split(SplitRel {
            parent: i.clone(),
            outer: i1.clone(),
            inner: i2.clone(),
            factor: 4,
        })]);
        assert!(g.is_underived(&i));
        assert!(!g.is_fully_derived(&i));
        assert!(g.is_fully_derived(&i1));
        assert!(g.is_fully_derived(&i2));
        assert_eq!(g.parents(&i1), vec![i.clone()]);
        assert!(g.is_irregular(&i1));
        assert!(!g.is_irregular(&i2));
    }

    #[test]
    fn recoverable_once_all_children_defined() {
        let i = IndexVar::new("i");
        let i1 = IndexVar::new("i1");
        let i2 = IndexVar::new("i2");
        let g = RelGraph::build(&[IndexVarRel::Split(SplitRel {
            parent: i.clone(),
            outer: i1.clone(),
            inner: i2.clone(),
            factor: 4,
        })]);
        assert!(!g.is_recoverable(&i, &[i1.clone()]));
        assert!(g.is_recoverable(&i, &[i1.clone(), i2.clone()]));
        let newly = g.newly_recoverable(&i2, &[i1.clone()]);
        assert_eq!(newly, vec![i.clone()]);
    }

    #[test]
    fn fuse_outer_parent_excluded_when_fused_has_pos_descendant() {
        use crate::ir::expr::Access;
        use crate::ir::tensorvar::{TensorType, TensorVar};
        use crate::schedule::rel::PosRel;
        use crate::types::{Datatype, Format};

        let outer_p = IndexVar::new("op");
        let inner_p = IndexVar::new("ip");
        let fused = IndexVar::new("f");
        let posvar = IndexVar::new("fpos");
        let t = TensorVar::new(
            "b",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![4],
            },
            Format::sparse(1),
        );
        let g = RelGraph::build(&[
            IndexVarRel::Fuse(FuseRel {
                outer_parent: outer_p.clone(),
                inner_parent: inner_p.clone(),
                fused: fused.clone(),
            }),
            IndexVarRel::Pos(PosRel {
                parent: fused.clone(),
                pos_var: posvar.clone(),
                access: Access::new(t, vec![fused.clone()]),
            }),
        ]);
        let newly = g.newly_recoverable(&posvar, &[]);
        assert!(!newly.contains(&outer_p));
    }
}
