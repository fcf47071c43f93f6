//! Notation-form predicates (spec.md §4.C3): einsum ⊂ reduction ⊂ concrete.
//! Each predicate returns `Ok(())` or an `Err` reason identifying the first
//! violating site, mirroring `isEinsumNotation`/`isReductionNotation`/
//! `isConcreteNotation`.

use crate::error::ReasonError;
use crate::ir::expr::{IndexExpr, IndexExprNode};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::{IndexStmt, IndexStmtNode};
use crate::schedule::graph::RelGraph;

/// einsum: a single assignment, no top-level additive operator below the
/// first multiplicative one (Mul-over-Add normal form), and no `Reduction`.
pub fn is_einsum(stmt: &IndexStmt) -> Result<(), ReasonError> {
    let a = stmt
        .as_assignment()
        .ok_or_else(|| ReasonError::from("einsum notation requires a single top-level Assignment"))?;
    check_einsum_expr(&a.rhs, false)
}

fn check_einsum_expr(e: &IndexExpr, below_mul: bool) -> Result<(), ReasonError> {
    match e.node() {
        IndexExprNode::Access(_) | IndexExprNode::Literal(_) => Ok(()),
        IndexExprNode::Neg(x) | IndexExprNode::Sqrt(x) => check_einsum_expr(x, below_mul),
        IndexExprNode::Add(a, b) | IndexExprNode::Sub(a, b) => {
            if below_mul {
                return Err(ReasonError::from(format!(
                    "einsum notation forbids an additive operator below a multiplicative one: {}",
                    e
                )));
            }
            check_einsum_expr(a, false)?;
            check_einsum_expr(b, false)
        }
        IndexExprNode::Mul(a, b) | IndexExprNode::Div(a, b) => {
            check_einsum_expr(a, true)?;
            check_einsum_expr(b, true)
        }
        IndexExprNode::Cast(_, _) => Err(ReasonError::from(format!(
            "einsum notation forbids Cast: {}",
            e
        ))),
        IndexExprNode::CallIntrinsic(..) => Err(ReasonError::from(format!(
            "einsum notation forbids CallIntrinsic: {}",
            e
        ))),
        IndexExprNode::Reduction(..) => Err(ReasonError::from(format!(
            "einsum notation forbids Reduction nodes: {}",
            e
        ))),
    }
}

/// reduction: single Assignment; every rhs variable not free on the lhs is
/// bound by an enclosing `Reduction`.
pub fn is_reduction(stmt: &IndexStmt) -> Result<(), ReasonError> {
    let a = stmt.as_assignment().ok_or_else(|| {
        ReasonError::from("reduction notation requires a single top-level Assignment")
    })?;
    let free = a.free_vars();
    check_reduction_expr(&a.rhs, &free)
}

fn check_reduction_expr(e: &IndexExpr, bound: &[IndexVar]) -> Result<(), ReasonError> {
    match e.node() {
        IndexExprNode::Access(acc) => {
            for v in &acc.indices {
                if !bound.contains(v) {
                    return Err(ReasonError::from(format!(
                        "variable {} is free on the rhs but neither lhs-free nor bound by a Reduction",
                        v
                    )));
                }
            }
            Ok(())
        }
        IndexExprNode::Literal(_) => Ok(()),
        IndexExprNode::Neg(x) | IndexExprNode::Sqrt(x) | IndexExprNode::Cast(_, x) => {
            check_reduction_expr(x, bound)
        }
        IndexExprNode::Add(a, b)
        | IndexExprNode::Sub(a, b)
        | IndexExprNode::Mul(a, b)
        | IndexExprNode::Div(a, b) => {
            check_reduction_expr(a, bound)?;
            check_reduction_expr(b, bound)
        }
        IndexExprNode::CallIntrinsic(_, args) => {
            for arg in args {
                check_reduction_expr(arg, bound)?;
            }
            Ok(())
        }
        IndexExprNode::Reduction(_, var, body) => {
            let mut extended = bound.to_vec();
            extended.push(var.clone());
            check_reduction_expr(body, &extended)
        }
    }
}

/// concrete: every `Access` variable is bound, fully-derived, or
/// recoverable; no `Reduction` remains; compound op required when reduction
/// variables exist; `SuchThat` (if present) is outermost and unique.
pub fn is_concrete(stmt: &IndexStmt) -> Result<(), ReasonError> {
    let (body, rels) = match stmt.as_such_that() {
        Some((body, rels)) => (body.clone(), rels.to_vec()),
        None => (stmt.clone(), Vec::new()),
    };
    if body.such_that_predicates_anywhere_but_outermost() {
        return Err(ReasonError::from(
            "SuchThat may only appear as the outermost node of a concrete statement",
        ));
    }
    let graph = RelGraph::build(&rels);
    let mut bound = Vec::new();
    check_concrete_stmt(&body, &graph, &mut bound)
}

fn check_concrete_stmt(
    stmt: &IndexStmt,
    graph: &RelGraph,
    bound: &mut Vec<IndexVar>,
) -> Result<(), ReasonError> {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => {
            check_concrete_expr(&a.rhs, graph, bound)?;
            for v in &a.lhs.indices {
                check_access_var(v, graph, bound)?;
            }
            let reduction_vars: Vec<IndexVar> = a
                .rhs
                .index_vars()
                .into_iter()
                .filter(|v| !a.free_vars().contains(v))
                .collect();
            if !reduction_vars.is_empty() && a.op.is_none() {
                return Err(ReasonError::from(
                    "concrete notation requires a compound-assignment operator when reduction variables exist",
                ));
            }
            Ok(())
        }
        IndexStmtNode::Forall(var, body, _, _) => {
            bound.push(var.clone());
            let r = check_concrete_stmt(body, graph, bound);
            bound.pop();
            r
        }
        IndexStmtNode::Where(c, p) => {
            check_concrete_stmt(c, graph, bound)?;
            check_concrete_stmt(p, graph, bound)
        }
        IndexStmtNode::Sequence(d, m) => {
            check_concrete_stmt(d, graph, bound)?;
            check_concrete_stmt(m, graph, bound)
        }
        IndexStmtNode::Multi(a, b) => {
            check_concrete_stmt(a, graph, bound)?;
            check_concrete_stmt(b, graph, bound)
        }
        IndexStmtNode::Yield(vars, e) => {
            for v in vars {
                check_access_var(v, graph, bound)?;
            }
            check_concrete_expr(e, graph, bound)
        }
        IndexStmtNode::SuchThat(..) => Err(ReasonError::from(
            "SuchThat may only appear as the outermost node of a concrete statement",
        )),
    }
}

fn check_concrete_expr(
    e: &IndexExpr,
    graph: &RelGraph,
    bound: &[IndexVar],
) -> Result<(), ReasonError> {
    match e.node() {
        IndexExprNode::Access(a) => {
            for v in &a.indices {
                check_access_var(v, graph, bound)?;
            }
            Ok(())
        }
        IndexExprNode::Literal(_) => Ok(()),
        IndexExprNode::Neg(x) | IndexExprNode::Sqrt(x) | IndexExprNode::Cast(_, x) => {
            check_concrete_expr(x, graph, bound)
        }
        IndexExprNode::Add(a, b)
        | IndexExprNode::Sub(a, b)
        | IndexExprNode::Mul(a, b)
        | IndexExprNode::Div(a, b) => {
            check_concrete_expr(a, graph, bound)?;
            check_concrete_expr(b, graph, bound)
        }
        IndexExprNode::CallIntrinsic(_, args) => {
            for arg in args {
                check_concrete_expr(arg, graph, bound)?;
            }
            Ok(())
        }
        IndexExprNode::Reduction(..) => Err(ReasonError::from(format!(
            "concrete notation forbids remaining Reduction nodes: {}",
            e
        ))),
    }
}

fn check_access_var(v: &IndexVar, graph: &RelGraph, bound: &[IndexVar]) -> Result<(), ReasonError> {
    if bound.contains(v) || graph.is_fully_derived(v) || graph.is_recoverable(v, bound) {
        Ok(())
    } else {
        Err(ReasonError::from(format!(
            "variable {} is neither bound by an enclosing Forall, fully-derived, nor recoverable",
            v
        )))
    }
}

impl IndexStmt {
    fn such_that_predicates_anywhere_but_outermost(&self) -> bool {
        fn walk(s: &IndexStmt, at_outer: bool) -> bool {
            match s.node() {
                IndexStmtNode::SuchThat(body, _) => {
                    if !at_outer {
                        return true;
                    }
                    walk(body, false)
                }
                IndexStmtNode::Assignment(_) => false,
                IndexStmtNode::Forall(_, body, _, _) => walk(body, false),
                IndexStmtNode::Where(c, p) => walk(c, false) || walk(p, false),
                IndexStmtNode::Sequence(d, m) => walk(d, false) || walk(m, false),
                IndexStmtNode::Multi(a, b) => walk(a, false) || walk(b, false),
                IndexStmtNode::Yield(..) => false,
            }
        }
        walk(self, true)
    }
}
