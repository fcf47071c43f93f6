//! `concretize`: lift einsum-form notation to reduction-form, then
//! reduction-form to concrete-form (spec.md §4.C3), grounded line-for-line
//! on `makeReductionNotation`/`makeConcreteNotation`.

use crate::error::ReasonError;
use crate::ir::expr::{Access, CompoundOp, IndexExpr, IndexExprNode};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::{Assignment, IndexStmt};
use crate::ir::tensorvar::{TensorType, TensorVar};
use crate::notation::classify::{is_concrete, is_einsum, is_reduction};
use crate::notation::typecheck::infer_dims;
use std::collections::HashMap;

/// If `stmt` is einsum-form, lift to reduction-form; if reduction-form,
/// lift to concrete-form; if already concrete, return it unchanged. Fails
/// if `stmt` matches none of the three forms.
pub fn concretize(stmt: &IndexStmt) -> Result<IndexStmt, ReasonError> {
    if is_concrete(stmt).is_ok() {
        return Ok(stmt.clone());
    }
    if is_reduction(stmt).is_ok() {
        return lift_to_concrete(stmt);
    }
    if is_einsum(stmt).is_ok() {
        return lift_to_concrete(&lift_to_reduction(stmt)?);
    }
    Err(ReasonError::from(
        "statement matches none of einsum, reduction, or concrete notation",
    ))
}

/// Wraps the rhs of a single `Assignment` with `Reduction(Add, v, ...)` for
/// every non-free variable `v`, outermost-to-innermost in reverse access
/// order, once per additive term (so a sum is pushed down over `+` but not
/// over `*`); grounded on `MakeReductionNotation`'s `only_one_term` tracking.
pub fn lift_to_reduction(stmt: &IndexStmt) -> Result<IndexStmt, ReasonError> {
    let a = stmt
        .as_assignment()
        .ok_or_else(|| ReasonError::from("lift_to_reduction requires a single top-level Assignment"))?;
    let free = a.free_vars();
    let mut only_one_term = true;
    let rhs = add_reductions_over_terms(&a.rhs, &free, &mut only_one_term);
    let rhs = if only_one_term {
        add_reductions(&a.rhs, &free)
    } else {
        rhs
    };
    Ok(IndexStmt::assignment(a.lhs.clone(), rhs, a.op))
}

/// Recurse through top-level `Add`/`Sub` terms, wrapping each additive leaf
/// term in its own `Reduction` chain; sets `only_one_term` to false the
/// moment any `Add`/`Sub` is visited.
fn add_reductions_over_terms(e: &IndexExpr, free: &[IndexVar], only_one_term: &mut bool) -> IndexExpr {
    match e.node() {
        IndexExprNode::Add(a, b) => {
            *only_one_term = false;
            IndexExpr::add(
                add_reductions_over_terms(a, free, only_one_term),
                add_reductions_over_terms(b, free, only_one_term),
            )
        }
        IndexExprNode::Sub(a, b) => {
            *only_one_term = false;
            IndexExpr::sub(
                add_reductions_over_terms(a, free, only_one_term),
                add_reductions_over_terms(b, free, only_one_term),
            )
        }
        _ => add_reductions(e, free),
    }
}

/// Wrap `term` in a `Reduction(Add, v, ...)` for each variable appearing in
/// `term` but not in `free`, outermost-to-innermost in reverse access order
/// (reverse of `getIndexVars(term)`, deduplicated).
fn add_reductions(term: &IndexExpr, free: &[IndexVar]) -> IndexExpr {
    let mut vars: Vec<IndexVar> = Vec::new();
    for v in term.index_vars() {
        if !free.contains(&v) && !vars.contains(&v) {
            vars.push(v);
        }
    }
    let mut body = term.clone();
    for v in vars.into_iter().rev() {
        body = IndexExpr::sum(v, body);
    }
    body
}

/// Lift a reduction-form statement to concrete form (spec.md §4.C3):
/// strip top-level `Reduction`s into an explicit compound `Assignment`
/// wrapped in `Forall`s (innermost-first in encounter order), then wrap
/// remaining free variables in outer `Forall`s, then replace any
/// still-nested `Reduction`s with scratch-`TensorVar` `Where` producers.
pub fn lift_to_concrete(stmt: &IndexStmt) -> Result<IndexStmt, ReasonError> {
    let a = stmt
        .as_assignment()
        .ok_or_else(|| ReasonError::from("lift_to_concrete requires a single top-level Assignment"))?;

    let (stripped_vars, inner_body) = strip_top_level_reductions(&a.rhs);
    let op = if stripped_vars.is_empty() {
        a.op
    } else {
        Some(a.op.unwrap_or(CompoundOp::Add))
    };
    let reduced_assignment = IndexStmt::assignment(a.lhs.clone(), inner_body, op);

    let mut wrapped = reduced_assignment;
    for v in stripped_vars.into_iter().rev() {
        wrapped = IndexStmt::forall(v, wrapped);
    }

    let free = a.free_vars();
    for v in free.into_iter().rev() {
        wrapped = IndexStmt::forall(v, wrapped);
    }

    let dims = infer_dims(&wrapped).unwrap_or_default();
    replace_reductions_with_wheres(&wrapped, &dims)
}

/// Pass 1 (`RemoveTopLevelReductions`): strip a chain of top-level
/// `Reduction`s off the rhs, recording their variables in encounter order.
fn strip_top_level_reductions(e: &IndexExpr) -> (Vec<IndexVar>, IndexExpr) {
    match e.node() {
        IndexExprNode::Reduction(_, var, body) => {
            let (mut rest, inner) = strip_top_level_reductions(body);
            rest.insert(0, var.clone());
            (rest, inner)
        }
        _ => (Vec::new(), e.clone()),
    }
}

/// Pass 2 (`ReplaceReductionsWithWheres`): repeatedly replace the first
/// remaining nested `Reduction` with a scratch `TensorVar` and a producer
/// `Where`, until none remain (a fixpoint loop around a single-replacement
/// rewriter).
fn replace_reductions_with_wheres(
    stmt: &IndexStmt,
    dims: &HashMap<IndexVar, usize>,
) -> Result<IndexStmt, ReasonError> {
    let mut current = stmt.clone();
    loop {
        match replace_first_reduction(&current, dims)? {
            Some(next) => current = next,
            None => return Ok(current),
        }
    }
}

fn replace_first_reduction(
    stmt: &IndexStmt,
    dims: &HashMap<IndexVar, usize>,
) -> Result<Option<IndexStmt>, ReasonError> {
    match stmt.node() {
        crate::ir::stmt::IndexStmtNode::Assignment(a) => {
            match replace_first_reduction_expr(&a.rhs, &a.lhs, dims)? {
                Some((new_rhs, producer)) => {
                    let consumer = IndexStmt::assignment(a.lhs.clone(), new_rhs, a.op);
                    Ok(Some(IndexStmt::where_(consumer, producer)))
                }
                None => Ok(None),
            }
        }
        crate::ir::stmt::IndexStmtNode::Forall(v, body, unit, race) => {
            Ok(replace_first_reduction(body, dims)?
                .map(|nb| IndexStmt::forall_with(v.clone(), nb, *unit, *race)))
        }
        crate::ir::stmt::IndexStmtNode::Where(c, p) => {
            if let Some(nc) = replace_first_reduction(c, dims)? {
                return Ok(Some(IndexStmt::where_(nc, p.clone())));
            }
            Ok(replace_first_reduction(p, dims)?.map(|np| IndexStmt::where_(c.clone(), np)))
        }
        crate::ir::stmt::IndexStmtNode::Sequence(d, m) => {
            if let Some(nd) = replace_first_reduction(d, dims)? {
                return Ok(Some(IndexStmt::sequence(nd, m.clone())));
            }
            Ok(replace_first_reduction(m, dims)?.map(|nm| IndexStmt::sequence(d.clone(), nm)))
        }
        crate::ir::stmt::IndexStmtNode::Multi(x, y) => {
            if let Some(nx) = replace_first_reduction(x, dims)? {
                return Ok(Some(IndexStmt::multi(nx, y.clone())));
            }
            Ok(replace_first_reduction(y, dims)?.map(|ny| IndexStmt::multi(x.clone(), ny)))
        }
        crate::ir::stmt::IndexStmtNode::SuchThat(body, rels) => {
            Ok(replace_first_reduction(body, dims)?.map(|nb| IndexStmt::such_that(nb, rels.clone())))
        }
        crate::ir::stmt::IndexStmtNode::Yield(..) => Ok(None),
    }
}

/// Find the first `Reduction` anywhere in `e` (pre-order), and if found,
/// return `e` with that reduction replaced by an access to a fresh scratch
/// tensor, plus the producer statement `forall(var, scratch OP= body)`.
fn replace_first_reduction_expr(
    e: &IndexExpr,
    lhs: &Access,
    dims: &HashMap<IndexVar, usize>,
) -> Result<Option<(IndexExpr, IndexStmt)>, ReasonError> {
    match e.node() {
        IndexExprNode::Reduction(op, var, body) => {
            let free_in_body: Vec<IndexVar> = body
                .index_vars()
                .into_iter()
                .filter(|v| v != var)
                .collect();
            let mut seen = Vec::new();
            let mut scratch_indices = Vec::new();
            for v in free_in_body {
                if !seen.contains(&v) {
                    seen.push(v.clone());
                    scratch_indices.push(v);
                }
            }
            let mut shape = Vec::with_capacity(scratch_indices.len());
            for v in &scratch_indices {
                let size = dims.get(v).copied().ok_or_else(|| {
                    ReasonError::from(format!(
                        "no established dimension for index variable {} in scratch tensor",
                        v
                    ))
                })?;
                shape.push(size);
            }
            let scratch_ty = TensorType {
                datatype: lhs.tensor.ty().datatype,
                shape,
            };
            let scratch_format = crate::types::Format::dense(scratch_indices.len());
            let scratch = TensorVar::new("scratch", scratch_ty, scratch_format);
            let scratch_access = Access::new(scratch.clone(), scratch_indices.clone());
            let producer = IndexStmt::forall(
                var.clone(),
                IndexStmt::assignment(scratch_access.clone(), body.clone(), Some(*op)),
            );
            Ok(Some((IndexExpr::access(scratch, scratch_indices), producer)))
        }
        IndexExprNode::Access(_) | IndexExprNode::Literal(_) => Ok(None),
        IndexExprNode::Neg(x) => Ok(replace_first_reduction_expr(x, lhs, dims)?
            .map(|(nx, p)| (IndexExpr::neg(nx), p))),
        IndexExprNode::Sqrt(x) => Ok(replace_first_reduction_expr(x, lhs, dims)?
            .map(|(nx, p)| (IndexExpr::sqrt(nx), p))),
        IndexExprNode::Cast(ty, x) => {
            let ty = *ty;
            Ok(replace_first_reduction_expr(x, lhs, dims)?
                .map(|(nx, p)| (IndexExpr::cast(ty, nx), p)))
        }
        IndexExprNode::Add(a, b) => replace_first_in_pair(a, b, lhs, dims, IndexExpr::add),
        IndexExprNode::Sub(a, b) => replace_first_in_pair(a, b, lhs, dims, IndexExpr::sub),
        IndexExprNode::Mul(a, b) => replace_first_in_pair(a, b, lhs, dims, IndexExpr::mul),
        IndexExprNode::Div(a, b) => replace_first_in_pair(a, b, lhs, dims, IndexExpr::div),
        IndexExprNode::CallIntrinsic(id, args) => {
            let id = *id;
            for (idx, arg) in args.iter().enumerate() {
                if let Some((na, p)) = replace_first_reduction_expr(arg, lhs, dims)? {
                    let mut new_args = args.clone();
                    new_args[idx] = na;
                    return Ok(Some((IndexExpr::call_intrinsic(id, new_args), p)));
                }
            }
            Ok(None)
        }
    }
}

fn replace_first_in_pair(
    a: &IndexExpr,
    b: &IndexExpr,
    lhs: &Access,
    dims: &HashMap<IndexVar, usize>,
    build: fn(IndexExpr, IndexExpr) -> IndexExpr,
) -> Result<Option<(IndexExpr, IndexStmt)>, ReasonError> {
    if let Some((na, p)) = replace_first_reduction_expr(a, lhs, dims)? {
        return Ok(Some((build(na, b.clone()), p)));
    }
    if let Some((nb, p)) = replace_first_reduction_expr(b, lhs, dims)? {
        return Ok(Some((build(a.clone(), nb), p)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::tensorvar::TensorType;
    use crate::types::{Datatype, Format};

    fn vec_tensor(name: &str, n: usize) -> TensorVar {
        TensorVar::new(
            name,
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![n],
            },
            Format::dense(1),
        )
    }

    fn matrix_tensor(name: &str, m: usize, n: usize) -> TensorVar {
        TensorVar::new(
            name,
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![m, n],
            },
            Format::dense(2),
        )
    }

    fn order3_tensor(name: &str, a: usize, b: usize, c: usize) -> TensorVar {
        TensorVar::new(
            name,
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![a, b, c],
            },
            Format::dense(3),
        )
    }

    /// Walks a chain of nested `Forall`s, returning their variables
    /// outermost-first.
    fn forall_chain(stmt: &IndexStmt) -> Vec<IndexVar> {
        let mut out = Vec::new();
        let mut cur = stmt.clone();
        while let crate::ir::stmt::IndexStmtNode::Forall(v, body, ..) = cur.node() {
            out.push(v.clone());
            cur = body.clone();
        }
        out
    }

    #[test]
    fn lift_dot_product_to_reduction() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let alpha = TensorVar::new(
            "alpha",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![],
            },
            Format::dense(0),
        );
        let stmt = IndexStmt::assignment(
            Access::new(alpha, vec![]),
            IndexExpr::mul(
                IndexExpr::access(a, vec![i.clone()]),
                IndexExpr::access(b, vec![i]),
            ),
            None,
        );
        let reduction = lift_to_reduction(&stmt).unwrap();
        assert!(is_reduction(&reduction).is_ok());
        assert!(reduction.as_assignment().unwrap().rhs.is_reduction());
    }

    #[test]
    fn concretize_matmul_style_einsum_produces_concrete_form() {
        let i = IndexVar::new("i");
        let j = IndexVar::new("j");
        let k = IndexVar::new("k");
        let a = matrix_tensor("a", 4, 4);
        let b = matrix_tensor("b", 4, 4);
        let c = matrix_tensor("c", 4, 4);
        let stmt = IndexStmt::assignment(
            Access::new(a, vec![i.clone(), j.clone()]),
            IndexExpr::mul(
                IndexExpr::access(b, vec![i, k.clone()]),
                IndexExpr::access(c, vec![k, j]),
            ),
            None,
        );
        let concrete = concretize(&stmt).unwrap();
        assert!(is_concrete(&concrete).is_ok());
    }

    /// MTTKRP (`A(i,l) = B(i,j,k)*C(j,l)*D(k,l)`, free = [i,l]) has two
    /// reduction variables, `j` and `k`, encountered in that order while
    /// walking the product term. The outermost reduction must be the
    /// first-encountered one (`j`), matching `Forall(i, Forall(l, Forall(j,
    /// Forall(k, ...))))`, not the reverse.
    #[test]
    fn concretize_mttkrp_nests_reduction_foralls_in_encounter_order() {
        let i = IndexVar::new("i");
        let j = IndexVar::new("j");
        let k = IndexVar::new("k");
        let l = IndexVar::new("l");
        let a = matrix_tensor("a", 4, 4);
        let b = order3_tensor("b", 4, 4, 4);
        let c = matrix_tensor("c", 4, 4);
        let d = matrix_tensor("d", 4, 4);
        let stmt = IndexStmt::assignment(
            Access::new(a, vec![i.clone(), l.clone()]),
            IndexExpr::mul(
                IndexExpr::mul(
                    IndexExpr::access(b, vec![i.clone(), j.clone(), k.clone()]),
                    IndexExpr::access(c, vec![j.clone(), l.clone()]),
                ),
                IndexExpr::access(d, vec![k.clone(), l.clone()]),
            ),
            None,
        );
        let concrete = concretize(&stmt).unwrap();
        assert!(is_concrete(&concrete).is_ok());
        assert_eq!(forall_chain(&concrete), vec![i, l, j, k]);
    }
}
