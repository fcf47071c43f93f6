//! [`IndexStmt`]: the immutable index-notation statement tree (spec.md
//! §3).

use crate::ir::expr::{Access, CompoundOp, IndexExpr};
use crate::ir::indexvar::IndexVar;
use crate::schedule::rel::IndexVarRel;
use std::rc::Rc;

/// Where a `Forall`'s body should be scheduled to run (spec.md §3). These
/// annotations describe the *generated kernel's* concurrency, not the
/// compiler's own (spec.md §5) -- they carry meaning only downstream, in
/// the external codegen collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParallelUnit {
    NotParallel,
    Default,
    CpuThread,
    CpuVector,
    CpuThreadGroupReduction,
    GpuBlock,
    GpuWarp,
    GpuThread,
    GpuBlockReduction,
    GpuWarpReduction,
}

impl Default for ParallelUnit {
    fn default() -> Self {
        ParallelUnit::NotParallel
    }
}

/// How concurrent writes to the same output location are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceStrategy {
    IgnoreRaces,
    NoRaces,
    Atomics,
    Temporary,
    ParallelReduction,
}

impl Default for RaceStrategy {
    fn default() -> Self {
        RaceStrategy::IgnoreRaces
    }
}

/// `Assignment(lhs, rhs, op?)`. `op` absent means replacement (`=`); present
/// means compound (`+=`, `*=`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub lhs: Access,
    pub rhs: IndexExpr,
    pub op: Option<CompoundOp>,
}

impl Assignment {
    /// Free variables: the index variables on the lhs (spec.md §3 invariant 3).
    pub fn free_vars(&self) -> Vec<IndexVar> {
        self.lhs.indices.clone()
    }

    /// Reduction variables: rhs index variables not free on the lhs, in
    /// first-encountered order with duplicates removed.
    pub fn reduction_vars(&self) -> Vec<IndexVar> {
        let free = self.free_vars();
        let mut seen = Vec::new();
        for v in self.rhs.index_vars() {
            if !free.contains(&v) && !seen.contains(&v) {
                seen.push(v);
            }
        }
        seen
    }

    pub fn is_compound(&self) -> bool {
        self.op.is_some()
    }
}

#[derive(Debug)]
pub enum IndexStmtNode {
    Assignment(Assignment),
    Forall(IndexVar, IndexStmt, ParallelUnit, RaceStrategy),
    Where(IndexStmt, IndexStmt),
    Sequence(IndexStmt, IndexStmt),
    Multi(IndexStmt, IndexStmt),
    Yield(Vec<IndexVar>, IndexExpr),
    SuchThat(IndexStmt, Vec<IndexVarRel>),
}

/// An immutable, structurally-shared index statement.
#[derive(Debug, Clone)]
pub struct IndexStmt(pub(crate) Rc<IndexStmtNode>);

impl IndexStmt {
    pub fn node(&self) -> &IndexStmtNode {
        &self.0
    }

    fn new(node: IndexStmtNode) -> IndexStmt {
        IndexStmt(Rc::new(node))
    }

    pub fn assignment(lhs: Access, rhs: IndexExpr, op: Option<CompoundOp>) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Assignment(Assignment { lhs, rhs, op }))
    }

    pub fn forall(var: IndexVar, body: IndexStmt) -> IndexStmt {
        IndexStmt::forall_with(var, body, ParallelUnit::NotParallel, RaceStrategy::IgnoreRaces)
    }

    pub fn forall_with(
        var: IndexVar,
        body: IndexStmt,
        unit: ParallelUnit,
        race: RaceStrategy,
    ) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Forall(var, body, unit, race))
    }

    pub fn where_(consumer: IndexStmt, producer: IndexStmt) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Where(consumer, producer))
    }

    pub fn sequence(defn: IndexStmt, mutn: IndexStmt) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Sequence(defn, mutn))
    }

    pub fn multi(a: IndexStmt, b: IndexStmt) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Multi(a, b))
    }

    pub fn yield_(vars: Vec<IndexVar>, expr: IndexExpr) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::Yield(vars, expr))
    }

    pub fn such_that(body: IndexStmt, rels: Vec<IndexVarRel>) -> IndexStmt {
        IndexStmt::new(IndexStmtNode::SuchThat(body, rels))
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.node(), IndexStmtNode::Assignment(_))
    }

    pub fn as_assignment(&self) -> Option<&Assignment> {
        match self.node() {
            IndexStmtNode::Assignment(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_such_that(&self) -> Option<(&IndexStmt, &[IndexVarRel])> {
        match self.node() {
            IndexStmtNode::SuchThat(body, rels) => Some((body, rels)),
            _ => None,
        }
    }

    /// The predicate list of the outermost `SuchThat`, or an empty slice if
    /// this statement has none (spec.md §3 invariant 4: `SuchThat` may only
    /// appear as the outermost node).
    pub fn such_that_predicates(&self) -> &[IndexVarRel] {
        match self.node() {
            IndexStmtNode::SuchThat(_, rels) => rels,
            _ => &[],
        }
    }

    /// The statement with any outermost `SuchThat` stripped off.
    pub fn without_such_that(&self) -> IndexStmt {
        match self.node() {
            IndexStmtNode::SuchThat(body, _) => body.clone(),
            _ => self.clone(),
        }
    }
}
