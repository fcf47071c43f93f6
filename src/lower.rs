//! Lowerer entry (spec.md §4.C7): walks a concrete `IndexStmt` plus its
//! rel-graph and merge lattices into an imperative `LoopIr`, handed off to
//! the external `CodegenCollaborator`. Grounded on `original_source/src/
//! lower/lower.h`'s `lower()` entry point, generalized from its DAG-of-
//! tensor-paths strategy to lattice-point lowering (SPEC_FULL.md §4.C7).

use crate::error::ReasonError;
use crate::ir::expr::{Access, IndexExpr};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::{IndexStmt, IndexStmtNode, ParallelUnit, RaceStrategy};
use crate::lattice::{build_lattice, Lattice, LatticePoint};
use crate::schedule::bounds::Bound;
use crate::schedule::graph::RelGraph;
use crate::schedule::recovery::Recovery;
use std::fmt;

/// A recovery assignment to run on entering a loop body, before its
/// sub-body executes (spec.md §4.C4.4, §4.C7: "emit recovery assignments
/// for newly-recoverable variables, then the point's sub-body").
#[derive(Debug, Clone)]
pub struct RecoverStep {
    pub var: IndexVar,
    pub formula: Recovery,
}

/// A guard emitted when a lattice point has more than one iterator, to
/// check their coordinates agree before executing the point's body
/// (spec.md §4.C6: "guards with a coordinate equality when multiple
/// [iterators] are present").
#[derive(Debug, Clone)]
pub struct Guard {
    pub iterators: Vec<Access>,
}

/// What a [`Compute`] assigns into: either a tensor access (`Assignment`)
/// or the statement's free-variable tuple (`Yield`, spec.md §3).
#[derive(Debug, Clone)]
pub enum ComputeTarget {
    Access(Access),
    Yield(Vec<IndexVar>),
}

impl fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeTarget::Access(a) => write!(f, "{a}"),
            ComputeTarget::Yield(vars) => write!(
                f,
                "yield({})",
                vars.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
            ),
        }
    }
}

/// A single computed statement at a lattice point: the point's expression
/// assigned into the enclosing `Forall`'s lhs, or yielded.
#[derive(Debug, Clone)]
pub struct Compute {
    pub target: ComputeTarget,
    pub expr: IndexExpr,
}

/// One loop nest level, corresponding to a single `Forall(v, ...)` and the
/// lattice points computed within its body.
#[derive(Debug, Clone)]
pub struct Loop {
    pub var: IndexVar,
    pub bound: Bound,
    pub unit: ParallelUnit,
    pub race: RaceStrategy,
    pub recoveries: Vec<RecoverStep>,
    pub steps: Vec<LoopStep>,
}

/// One lattice-point step within a loop: an optional guard, the point's
/// compute statement, then any nested loops from the recursive body.
#[derive(Debug, Clone)]
pub struct LoopStep {
    pub guard: Option<Guard>,
    pub compute: Option<Compute>,
    pub nested: Vec<LoopIr>,
}

/// The imperative loop-IR sink produced by lowering a concrete statement;
/// the external `CodegenCollaborator` consumes this (spec.md §4.C7, §6).
#[derive(Debug, Clone)]
pub enum LoopIr {
    Loop(Loop),
    /// A leaf node with no enclosing `Forall` left to lower (an
    /// `Assignment`/`Yield` reached directly, or a `Where` producer run
    /// before its consumer).
    Block(Vec<Compute>),
    Sequence(Box<LoopIr>, Box<LoopIr>),
}

impl fmt::Display for LoopIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_loop_ir(self, 0, f)
    }
}

fn write_loop_ir(ir: &LoopIr, indent: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match ir {
        LoopIr::Loop(l) => {
            writeln!(
                f,
                "{pad}for {} in {}..{} {{",
                l.var, l.bound.lo, l.bound.hi
            )?;
            for r in &l.recoveries {
                writeln!(f, "{pad}  recover {} via {:?}", r.var, r.formula)?;
            }
            for step in &l.steps {
                if let Some(g) = &step.guard {
                    let names: Vec<String> = g.iterators.iter().map(|a| a.to_string()).collect();
                    writeln!(f, "{pad}  if coords_agree({}) {{", names.join(", "))?;
                } else {
                    writeln!(f, "{pad}  {{")?;
                }
                if let Some(c) = &step.compute {
                    writeln!(f, "{pad}    {} = {}", c.target, c.expr)?;
                }
                for nested in &step.nested {
                    write_loop_ir(nested, indent + 2, f)?;
                }
                writeln!(f, "{pad}  }}")?;
            }
            writeln!(f, "{pad}}}")
        }
        LoopIr::Block(computes) => {
            for c in computes {
                writeln!(f, "{pad}{} = {}", c.target, c.expr)?;
            }
            Ok(())
        }
        LoopIr::Sequence(a, b) => {
            write_loop_ir(a, indent, f)?;
            write_loop_ir(b, indent, f)
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.tensor,
            self.indices
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

/// Dimension lookup the lowerer needs for underived variables' iteration
/// bounds (the root bound of a `Forall` over an undeclared-schedule
/// variable is its tensor dimension, supplied by the caller since the IR
/// alone does not carry per-variable dimension after normalization).
pub trait DimensionSource {
    fn dimension(&self, v: &IndexVar) -> Option<usize>;
}

/// A simple `HashMap`-backed [`DimensionSource`], typically built via
/// [`crate::notation::infer_dims`].
impl DimensionSource for std::collections::HashMap<IndexVar, usize> {
    fn dimension(&self, v: &IndexVar) -> Option<usize> {
        self.get(v).copied()
    }
}

/// Lower a concrete statement into a [`LoopIr`] tree (spec.md §4.C7).
pub fn lower(stmt: &IndexStmt, dims: &dyn DimensionSource) -> Result<LoopIr, ReasonError> {
    let (body, rels) = match stmt.as_such_that() {
        Some((body, rels)) => (body.clone(), rels.to_vec()),
        None => (stmt.clone(), Vec::new()),
    };
    let graph = RelGraph::build(&rels);
    lower_stmt(&body, &graph, dims, &mut Vec::new())
}

fn lower_stmt(
    stmt: &IndexStmt,
    graph: &RelGraph,
    dims: &dyn DimensionSource,
    defined: &mut Vec<IndexVar>,
) -> Result<LoopIr, ReasonError> {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => Ok(LoopIr::Block(vec![Compute {
            target: ComputeTarget::Access(a.lhs.clone()),
            expr: a.rhs.clone(),
        }])),
        IndexStmtNode::Yield(vars, e) => Ok(LoopIr::Block(vec![Compute {
            target: ComputeTarget::Yield(vars.clone()),
            expr: e.clone(),
        }])),
        IndexStmtNode::Forall(v, body, unit, race) => {
            lower_forall(v, body, *unit, *race, graph, dims, defined)
        }
        IndexStmtNode::Where(consumer, producer) => {
            let p = lower_stmt(producer, graph, dims, defined)?;
            let c = lower_stmt(consumer, graph, dims, defined)?;
            Ok(LoopIr::Sequence(Box::new(p), Box::new(c)))
        }
        IndexStmtNode::Sequence(d, m) => {
            let d = lower_stmt(d, graph, dims, defined)?;
            let m = lower_stmt(m, graph, dims, defined)?;
            Ok(LoopIr::Sequence(Box::new(d), Box::new(m)))
        }
        IndexStmtNode::Multi(a, b) => {
            let a = lower_stmt(a, graph, dims, defined)?;
            let b = lower_stmt(b, graph, dims, defined)?;
            Ok(LoopIr::Sequence(Box::new(a), Box::new(b)))
        }
        IndexStmtNode::SuchThat(..) => Err(ReasonError::from(
            "SuchThat may only appear as the outermost node (unreachable in a concrete statement)",
        )),
    }
}

fn lower_forall(
    v: &IndexVar,
    body: &IndexStmt,
    unit: ParallelUnit,
    race: RaceStrategy,
    graph: &RelGraph,
    dims: &dyn DimensionSource,
    defined: &mut Vec<IndexVar>,
) -> Result<LoopIr, ReasonError> {
    let bound = iteration_bound(v, graph, dims, defined)?;

    let newly = graph.newly_recoverable(v, defined);
    defined.push(v.clone());
    let recoveries = build_recoveries(&newly, graph, dims, defined)?;
    for r in &newly {
        defined.push(r.clone());
    }

    let lattice = expr_lattice_for(v, body);
    let steps = match lattice {
        Some(lattice) => lower_lattice_points(&lattice, body, graph, dims, defined)?,
        None => {
            let nested = lower_stmt(body, graph, dims, defined)?;
            vec![LoopStep {
                guard: None,
                compute: None,
                nested: vec![nested],
            }]
        }
    };

    for _ in &newly {
        defined.pop();
    }
    defined.pop();

    Ok(LoopIr::Loop(Loop {
        var: v.clone(),
        bound,
        unit,
        race,
        recoveries,
        steps,
    }))
}

fn lower_lattice_points(
    lattice: &Lattice,
    body: &IndexStmt,
    graph: &RelGraph,
    dims: &dyn DimensionSource,
    defined: &mut Vec<IndexVar>,
) -> Result<Vec<LoopStep>, ReasonError> {
    let mut out = Vec::new();
    for point in lattice.points() {
        let specialized = substitute_terminal_expr(body, &point.expr);
        let nested = lower_stmt(&specialized, graph, dims, defined)?;
        out.push(LoopStep {
            guard: guard_for(point),
            compute: None,
            nested: vec![nested],
        });
    }
    Ok(out)
}

/// Rebuild `stmt` with its terminal `Assignment`/`Yield` expression replaced
/// by `expr` -- the counterpart of [`expr_lattice_for`], used so each
/// lattice point lowers against its own specialized partial expression
/// rather than the unrestricted original (spec.md §4.C7 "emit loop(s)
/// corresponding to lattice points").
fn substitute_terminal_expr(stmt: &IndexStmt, expr: &IndexExpr) -> IndexStmt {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => IndexStmt::assignment(a.lhs.clone(), expr.clone(), a.op),
        IndexStmtNode::Yield(vars, _) => IndexStmt::yield_(vars.clone(), expr.clone()),
        IndexStmtNode::Forall(v, b, unit, race) => {
            IndexStmt::forall_with(v.clone(), substitute_terminal_expr(b, expr), *unit, *race)
        }
        IndexStmtNode::Where(c, p) => IndexStmt::where_(substitute_terminal_expr(c, expr), p.clone()),
        IndexStmtNode::Sequence(d, m) => IndexStmt::sequence(substitute_terminal_expr(d, expr), m.clone()),
        IndexStmtNode::Multi(a, b) => IndexStmt::multi(substitute_terminal_expr(a, expr), b.clone()),
        IndexStmtNode::SuchThat(b, rels) => {
            IndexStmt::such_that(substitute_terminal_expr(b, expr), rels.clone())
        }
    }
}

fn guard_for(point: &LatticePoint) -> Option<Guard> {
    if point.iterators.len() > 1 {
        Some(Guard {
            iterators: point.iterators.clone(),
        })
    } else {
        None
    }
}

/// Find the first `Assignment`/`Yield` expression reachable from `body`
/// (through `Forall`/`Where`/etc. wrappers for other variables) to build
/// `v`'s merge lattice against, per spec.md §4.C7 "build the merge lattice
/// for v restricted to body".
pub(crate) fn expr_lattice_for(v: &IndexVar, body: &IndexStmt) -> Option<Lattice> {
    match body.node() {
        IndexStmtNode::Assignment(a) => build_lattice(v, &a.rhs),
        IndexStmtNode::Yield(_, e) => build_lattice(v, e),
        IndexStmtNode::Forall(_, b, _, _) => expr_lattice_for(v, b),
        IndexStmtNode::Where(c, _) => expr_lattice_for(v, c),
        IndexStmtNode::Sequence(d, _) => expr_lattice_for(v, d),
        IndexStmtNode::Multi(a, _) => expr_lattice_for(v, a),
        IndexStmtNode::SuchThat(b, _) => expr_lattice_for(v, b),
    }
}

fn iteration_bound(
    v: &IndexVar,
    graph: &RelGraph,
    dims: &dyn DimensionSource,
    defined: &[IndexVar],
) -> Result<Bound, ReasonError> {
    use crate::schedule::bounds::{
        deriv_iter_bounds, fuse_iter_bounds, split_inner_iter_bounds, split_outer_iter_bounds,
        IterBoundsRequest,
    };

    if graph.is_underived(v) {
        let dim = dims
            .dimension(v)
            .ok_or_else(|| ReasonError::from(format!("no known dimension for underived variable {v}")))?;
        return Ok(Bound::new(0, dim));
    }

    match deriv_iter_bounds(graph, v) {
        Some(IterBoundsRequest::SplitOuter { factor }) => {
            let parent = sole_parent(graph, v)?;
            let parent_bound = iteration_bound(&parent, graph, dims, defined)?;
            Ok(split_outer_iter_bounds(parent_bound, factor))
        }
        Some(IterBoundsRequest::SplitInner { factor }) => {
            let parent = sole_parent(graph, v)?;
            let parent_bound = iteration_bound(&parent, graph, dims, defined)?;
            Ok(split_inner_iter_bounds(parent_bound, factor, None))
        }
        Some(IterBoundsRequest::Fuse) => {
            let parents = graph.parents(v);
            if parents.len() != 2 {
                return Err(ReasonError::from(format!("Fuse relation producing {v} must have two parents")));
            }
            let outer = iteration_bound(&parents[0], graph, dims, defined)?;
            let inner = iteration_bound(&parents[1], graph, dims, defined)?;
            Ok(fuse_iter_bounds(outer, inner, inner.len()))
        }
        Some(IterBoundsRequest::Pos) => Err(ReasonError::from(format!(
            "Pos iteration bounds for {v} require a TensorStorageCollaborator; use crate::schedule::bounds::locate_bounds directly"
        ))),
        None => Err(ReasonError::from(format!(
            "variable {v} has parents but no producing relation (internal invariant)"
        ))),
    }
}

fn sole_parent(graph: &RelGraph, v: &IndexVar) -> Result<IndexVar, ReasonError> {
    let parents = graph.parents(v);
    parents
        .first()
        .cloned()
        .ok_or_else(|| ReasonError::from(format!("variable {v} has no producing relation's parent")))
}

/// Build the recovery formula for each variable in `newly` -- each is a
/// parent whose relation's children just became defined, so it's computable
/// straight from the relation it produces from (spec.md §4.C4.4).
fn build_recoveries(
    newly: &[IndexVar],
    graph: &RelGraph,
    dims: &dyn DimensionSource,
    defined: &[IndexVar],
) -> Result<Vec<RecoverStep>, ReasonError> {
    use crate::schedule::recovery::{fuse_recover_parents, pos_recover_parent, split_recover_parent};
    use crate::schedule::rel::IndexVarRel;

    let mut out = Vec::new();
    for parent in newly {
        let Some(rel) = find_rel_for_parent(graph, parent) else {
            continue;
        };
        match rel {
            IndexVarRel::Split(s) => {
                out.push(RecoverStep {
                    var: parent.clone(),
                    formula: split_recover_parent(s.parent.clone(), s.outer.clone(), s.inner.clone(), s.factor),
                });
            }
            IndexVarRel::Pos(p) => {
                let parent_coord_low = iteration_bound(&p.parent, graph, dims, defined)?.lo;
                out.push(RecoverStep {
                    var: parent.clone(),
                    formula: pos_recover_parent(rel, parent_coord_low)?,
                });
            }
            IndexVarRel::Fuse(f) => {
                let inner_size = iteration_bound(&f.inner_parent, graph, dims, defined)?.len();
                let [outer_recovery, inner_recovery] = fuse_recover_parents(rel, inner_size)?;
                let formula = if &f.outer_parent == parent {
                    outer_recovery
                } else {
                    inner_recovery
                };
                out.push(RecoverStep {
                    var: parent.clone(),
                    formula,
                });
            }
        }
    }
    Ok(out)
}

/// The relation whose `parents()` list names `parent`, i.e. the one that
/// would recover it from its now-defined children.
fn find_rel_for_parent<'a>(graph: &'a RelGraph, parent: &IndexVar) -> Option<&'a crate::schedule::rel::IndexVarRel> {
    graph.rels().iter().find(|rel| rel.parents().contains(parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::tensorvar::{TensorType, TensorVar};
    use crate::types::{Datatype, Format};
    use std::collections::HashMap;

    fn dense_vec(name: &str, n: usize) -> TensorVar {
        TensorVar::new(
            name,
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![n],
            },
            Format::dense(1),
        )
    }

    #[test]
    fn lowers_a_single_dense_forall_into_one_loop() {
        let i = IndexVar::new("i");
        let a = dense_vec("a", 10);
        let b = dense_vec("b", 10);
        let c = dense_vec("c", 10);
        let stmt = IndexStmt::forall(
            i.clone(),
            IndexStmt::assignment(
                crate::ir::expr::Access::new(a, vec![i.clone()]),
                IndexExpr::add(
                    IndexExpr::access(b, vec![i.clone()]),
                    IndexExpr::access(c, vec![i.clone()]),
                ),
                None,
            ),
        );
        let mut dims = HashMap::new();
        dims.insert(i, 10usize);
        let ir = lower(&stmt, &dims).unwrap();
        match ir {
            LoopIr::Loop(l) => {
                assert_eq!(l.bound, Bound::new(0, 10));
                assert_eq!(l.steps.len(), 1);
            }
            other => panic!("expected a Loop, got {other:?}"),
        }
    }

    #[test]
    fn display_renders_nested_loop_text() {
        let i = IndexVar::new("i");
        let a = dense_vec("a", 4);
        let b = dense_vec("b", 4);
        let stmt = IndexStmt::forall(
            i.clone(),
            IndexStmt::assignment(
                crate::ir::expr::Access::new(a, vec![i.clone()]),
                IndexExpr::access(b, vec![i.clone()]),
                None,
            ),
        );
        let mut dims = HashMap::new();
        dims.insert(i, 4usize);
        let ir = lower(&stmt, &dims).unwrap();
        let text = ir.to_string();
        assert!(text.contains("for i in 0..4"));
    }

    /// `pos()` applied to a `Split`'s inner variable must thread a real
    /// `parent_coord_low` (derived the same way `iteration_bound` derives a
    /// `Split` child's bound) through `build_recoveries`'s `Pos` branch
    /// rather than a bare literal `0`. Drives `build_recoveries` directly:
    /// `lower()` cannot itself run a loop over a pos variable without a
    /// `TensorStorageCollaborator` (see the `Err` in `iteration_bound`'s
    /// `Pos` arm), so this is the finest granularity at which the threaded
    /// value is observable.
    #[test]
    fn pos_recovery_after_split_threads_a_derived_coord_low() {
        use crate::schedule::rel::{IndexVarRel, PosRel, SplitRel};
        use crate::schedule::recovery::Recovery;

        let i = IndexVar::new("i");
        let i0 = IndexVar::new("i0");
        let i1 = IndexVar::new("i1");
        let ipos = IndexVar::new("ipos");
        let access = crate::ir::expr::Access::new(dense_vec("a", 16), vec![i1.clone()]);

        let rels = vec![
            IndexVarRel::Split(SplitRel {
                parent: i.clone(),
                outer: i0.clone(),
                inner: i1.clone(),
                factor: 4,
            }),
            IndexVarRel::Pos(PosRel {
                parent: i1.clone(),
                pos_var: ipos.clone(),
                access: access.clone(),
            }),
        ];
        let graph = RelGraph::build(&rels);

        let mut dims = HashMap::new();
        dims.insert(i.clone(), 16usize);
        let defined = vec![i0.clone(), ipos.clone()];

        let recoveries = build_recoveries(&[i1.clone()], &graph, &dims, &defined).unwrap();
        assert_eq!(recoveries.len(), 1);
        match &recoveries[0].formula {
            Recovery::PosParent {
                parent,
                pos_var,
                access: rec_access,
                parent_coord_low,
            } => {
                assert_eq!(parent, &i1);
                assert_eq!(pos_var, &ipos);
                assert_eq!(rec_access, &access);
                assert_eq!(*parent_coord_low, iteration_bound(&i1, &graph, &dims, &defined).unwrap().lo);
            }
            other => panic!("expected a PosParent recovery, got {other:?}"),
        }
    }
}
