//! Zero propagation (spec.md §4.C3): a rewriter that pushes a set of
//! structurally-zero `Access`es upward through an expression tree according
//! to semiring axioms, and drops any `Assignment` whose rhs collapses to
//! zero, treating its lhs tensor as zero at every later access.

use crate::error::ReasonError;
use crate::ir::expr::{Access, IndexExpr, IndexExprNode};
use crate::ir::stmt::{IndexStmt, IndexStmtNode};
use crate::ir::tensorvar::TensorVar;
use std::collections::HashSet;

/// The set of accesses known to be structurally zero, keyed by tensor
/// identity (an access to a zeroed tensor is zero regardless of indices,
/// since a dropped `Assignment`'s lhs is zero at *every* access site).
#[derive(Debug, Clone, Default)]
pub struct ZeroedAccesses {
    tensors: HashSet<TensorVar>,
}

impl ZeroedAccesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tensor(mut self, tensor: TensorVar) -> Self {
        self.tensors.insert(tensor);
        self
    }

    fn contains(&self, access: &Access) -> bool {
        self.tensors.contains(&access.tensor)
    }

    fn insert(&mut self, tensor: TensorVar) {
        self.tensors.insert(tensor);
    }
}

/// Rewrite `stmt`, propagating the accesses in `zeroed` upward through
/// every expression and dropping any `Assignment` whose rhs reduces to
/// zero. `Sequence` and `Multi` are not supported (spec.md §4.C3, §9 open
/// question: the source's `zero` visitor refuses them); see DESIGN.md
/// Open Question 1.
pub fn zero(stmt: &IndexStmt, zeroed: &ZeroedAccesses) -> Result<IndexStmt, ReasonError> {
    let mut zeroed = zeroed.clone();
    zero_stmt(stmt, &mut zeroed)
}

fn zero_stmt(stmt: &IndexStmt, zeroed: &mut ZeroedAccesses) -> Result<IndexStmt, ReasonError> {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => {
            let rhs = zero_expr(&a.rhs, zeroed);
            if is_zero_expr(&rhs) {
                zeroed.insert(a.lhs.tensor.clone());
                Ok(IndexStmt::yield_(Vec::new(), IndexExpr::zero(a.lhs.tensor.ty().datatype)))
            } else {
                Ok(IndexStmt::assignment(a.lhs.clone(), rhs, a.op))
            }
        }
        IndexStmtNode::Forall(v, body, unit, race) => {
            let nb = zero_stmt(body, zeroed)?;
            Ok(IndexStmt::forall_with(v.clone(), nb, *unit, *race))
        }
        IndexStmtNode::Where(c, p) => {
            // Producer runs first: its zero facts about its own lhs feed
            // into the consumer.
            let np = zero_stmt(p, zeroed)?;
            let nc = zero_stmt(c, zeroed)?;
            Ok(IndexStmt::where_(nc, np))
        }
        IndexStmtNode::Sequence(..) => Err(ReasonError::from(
            "zero propagation does not support Sequence (spec.md §4.C3, §9 open question)",
        )),
        IndexStmtNode::Multi(..) => Err(ReasonError::from(
            "zero propagation does not support Multi (spec.md §4.C3, §9 open question)",
        )),
        IndexStmtNode::Yield(vars, e) => {
            Ok(IndexStmt::yield_(vars.clone(), zero_expr(e, zeroed)))
        }
        IndexStmtNode::SuchThat(body, rels) => {
            let nb = zero_stmt(body, zeroed)?;
            Ok(IndexStmt::such_that(nb, rels.clone()))
        }
    }
}

/// Whether `e` is literally the zero value (i.e. was reduced to a zero
/// literal by this pass, not merely evaluates to zero at runtime).
fn is_zero_expr(e: &IndexExpr) -> bool {
    matches!(e.node(), IndexExprNode::Literal(v) if v.is_zero())
}

fn zero_expr(e: &IndexExpr, zeroed: &ZeroedAccesses) -> IndexExpr {
    match e.node() {
        IndexExprNode::Access(a) => {
            if zeroed.contains(a) {
                IndexExpr::zero(a.tensor.ty().datatype)
            } else {
                e.clone()
            }
        }
        IndexExprNode::Literal(_) => e.clone(),
        IndexExprNode::Neg(x) => {
            let nx = zero_expr(x, zeroed);
            if is_zero_expr(&nx) {
                nx
            } else {
                IndexExpr::neg(nx)
            }
        }
        IndexExprNode::Sqrt(x) => {
            let nx = zero_expr(x, zeroed);
            if is_zero_expr(&nx) {
                nx
            } else {
                IndexExpr::sqrt(nx)
            }
        }
        IndexExprNode::Cast(ty, x) => {
            let nx = zero_expr(x, zeroed);
            if is_zero_expr(&nx) {
                IndexExpr::zero(*ty)
            } else {
                IndexExpr::cast(*ty, nx)
            }
        }
        IndexExprNode::Add(a, b) => disjunction(e, a, b, zeroed, false),
        IndexExprNode::Sub(a, b) => disjunction(e, a, b, zeroed, true),
        IndexExprNode::Mul(a, b) => {
            let na = zero_expr(a, zeroed);
            let nb = zero_expr(b, zeroed);
            if is_zero_expr(&na) {
                na
            } else if is_zero_expr(&nb) {
                nb
            } else {
                IndexExpr::mul(na, nb)
            }
        }
        IndexExprNode::Div(a, b) => {
            let na = zero_expr(a, zeroed);
            let nb = zero_expr(b, zeroed);
            if is_zero_expr(&na) {
                na
            } else {
                IndexExpr::div(na, nb)
            }
        }
        IndexExprNode::CallIntrinsic(id, args) => {
            let new_args: Vec<IndexExpr> = args.iter().map(|a| zero_expr(a, zeroed)).collect();
            for &pos in id.zero_preserving_positions() {
                if let Some(arg) = new_args.get(pos) {
                    if is_zero_expr(arg) {
                        return IndexExpr::zero(result_datatype(e));
                    }
                }
            }
            IndexExpr::call_intrinsic(*id, new_args)
        }
        IndexExprNode::Reduction(op, var, body) => {
            let nb = zero_expr(body, zeroed);
            if is_zero_expr(&nb) {
                nb
            } else {
                IndexExpr::reduction(*op, var.clone(), nb)
            }
        }
    }
}

/// `Add`/`Sub` are disjunctive: a zero operand simplifies away, leaving the
/// other operand (sign-flipped if it was `Sub`'s second operand).
fn disjunction(
    original: &IndexExpr,
    a: &IndexExpr,
    b: &IndexExpr,
    zeroed: &ZeroedAccesses,
    is_sub: bool,
) -> IndexExpr {
    let na = zero_expr(a, zeroed);
    let nb = zero_expr(b, zeroed);
    match (is_zero_expr(&na), is_zero_expr(&nb)) {
        (true, true) => na,
        (true, false) => {
            if is_sub {
                IndexExpr::neg(nb)
            } else {
                nb
            }
        }
        (false, true) => na,
        (false, false) => {
            let _ = original;
            if is_sub {
                IndexExpr::sub(na, nb)
            } else {
                IndexExpr::add(na, nb)
            }
        }
    }
}

/// The literal's own datatype cannot be recovered from a `CallIntrinsic`
/// node directly (it has no declared result type); fall back to the
/// datatype of the first literal or access operand found, defaulting to
/// `Float64` if none is found (a call with no typed operand is not
/// expected to occur in well-formed notation).
fn result_datatype(e: &IndexExpr) -> crate::types::Datatype {
    match e.node() {
        IndexExprNode::CallIntrinsic(_, args) => {
            args.iter().find_map(datatype_of).unwrap_or(crate::types::Datatype::Float64)
        }
        _ => crate::types::Datatype::Float64,
    }
}

fn datatype_of(e: &IndexExpr) -> Option<crate::types::Datatype> {
    match e.node() {
        IndexExprNode::Access(a) => Some(a.tensor.ty().datatype),
        IndexExprNode::Literal(v) => Some(v.datatype()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::indexvar::IndexVar;
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

    #[test]
    fn zeroed_access_collapses_multiplication() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let access_a = Access::new(a.clone(), vec![i.clone()]);
        let stmt = IndexStmt::assignment(
            Access::new(b, vec![i.clone()]),
            IndexExpr::mul(IndexExpr::access(a, vec![i.clone()]), IndexExpr::access(
                vec_tensor("c", 10),
                vec![i],
            )),
            None,
        );
        let zeroed = ZeroedAccesses::new().with_tensor(access_a.tensor.clone());
        let result = zero(&stmt, &zeroed).unwrap();
        match result.node() {
            IndexStmtNode::Yield(_, e) => assert!(is_zero_expr(e)),
            other => panic!("expected dropped assignment to become a zero Yield, got {other:?}"),
        }
    }

    #[test]
    fn disjunctive_add_keeps_nonzero_operand() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let c = vec_tensor("c", 10);
        let stmt = IndexStmt::assignment(
            Access::new(c, vec![i.clone()]),
            IndexExpr::add(
                IndexExpr::access(a.clone(), vec![i.clone()]),
                IndexExpr::access(b, vec![i]),
            ),
            None,
        );
        let zeroed = ZeroedAccesses::new().with_tensor(a);
        let result = zero(&stmt, &zeroed).unwrap();
        let a = result.as_assignment().unwrap();
        assert!(a.rhs.is_access());
    }

    #[test]
    fn sequence_is_rejected() {
        let stub = IndexStmt::yield_(Vec::new(), IndexExpr::zero(Datatype::Float64));
        let stmt = IndexStmt::sequence(stub.clone(), stub);
        assert!(zero(&stmt, &ZeroedAccesses::new()).is_err());
    }
}
