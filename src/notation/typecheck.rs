//! Dimension type-checking (spec.md §3 invariant 6, §4.C3, §8): every
//! dimension indexed by the same `IndexVar` across all `Access`es in a
//! statement must agree in size. Runs at `Assignment` construction time
//! conceptually; exposed here as a free function so callers (notation
//! normalization, the reference frontend) can check or infer dimensions
//! explicitly without re-deriving this walk.

use crate::error::ReasonError;
use crate::ir::expr::{IndexExpr, IndexExprNode};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::{IndexStmt, IndexStmtNode};
use std::collections::HashMap;

/// Walks every `Access` in `stmt` and checks that each `IndexVar` is used
/// at a consistent dimension everywhere it appears; returns the agreed
/// dimension map, or the first mismatch found.
pub fn infer_dims(stmt: &IndexStmt) -> Result<HashMap<IndexVar, usize>, ReasonError> {
    let mut dims = HashMap::new();
    walk_stmt(stmt, &mut dims)?;
    Ok(dims)
}

/// Like [`infer_dims`] but only validates, discarding the map.
pub fn check_dimensions(stmt: &IndexStmt) -> Result<(), ReasonError> {
    infer_dims(stmt).map(|_| ())
}

fn walk_stmt(stmt: &IndexStmt, dims: &mut HashMap<IndexVar, usize>) -> Result<(), ReasonError> {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => {
            record_access(&a.lhs.tensor.ty().shape, &a.lhs.indices, dims)?;
            walk_expr(&a.rhs, dims)
        }
        IndexStmtNode::Forall(_, body, _, _) => walk_stmt(body, dims),
        IndexStmtNode::Where(c, p) => {
            walk_stmt(c, dims)?;
            walk_stmt(p, dims)
        }
        IndexStmtNode::Sequence(d, m) => {
            walk_stmt(d, dims)?;
            walk_stmt(m, dims)
        }
        IndexStmtNode::Multi(a, b) => {
            walk_stmt(a, dims)?;
            walk_stmt(b, dims)
        }
        IndexStmtNode::Yield(_, e) => walk_expr(e, dims),
        IndexStmtNode::SuchThat(body, _) => walk_stmt(body, dims),
    }
}

fn walk_expr(e: &IndexExpr, dims: &mut HashMap<IndexVar, usize>) -> Result<(), ReasonError> {
    match e.node() {
        IndexExprNode::Access(a) => record_access(&a.tensor.ty().shape, &a.indices, dims),
        IndexExprNode::Literal(_) => Ok(()),
        IndexExprNode::Neg(x) | IndexExprNode::Sqrt(x) | IndexExprNode::Cast(_, x) => {
            walk_expr(x, dims)
        }
        IndexExprNode::Add(a, b)
        | IndexExprNode::Sub(a, b)
        | IndexExprNode::Mul(a, b)
        | IndexExprNode::Div(a, b) => {
            walk_expr(a, dims)?;
            walk_expr(b, dims)
        }
        IndexExprNode::CallIntrinsic(_, args) => {
            for arg in args {
                walk_expr(arg, dims)?;
            }
            Ok(())
        }
        IndexExprNode::Reduction(_, _, body) => walk_expr(body, dims),
    }
}

fn record_access(
    shape: &[usize],
    indices: &[IndexVar],
    dims: &mut HashMap<IndexVar, usize>,
) -> Result<(), ReasonError> {
    for (pos, v) in indices.iter().enumerate() {
        let size = shape[pos];
        match dims.get(v) {
            Some(&established) if established != size => {
                return Err(ReasonError::from(format!(
                    "index variable {} used at dimension {} here but {} elsewhere",
                    v, size, established
                )));
            }
            Some(_) => {}
            None => {
                dims.insert(v.clone(), size);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::Access;
    use crate::ir::tensorvar::{TensorType, TensorVar};
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
    fn agreeing_dimensions_pass() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let stmt = IndexStmt::assignment(
            Access::new(a, vec![i.clone()]),
            IndexExpr::access(b, vec![i]),
            None,
        );
        assert!(check_dimensions(&stmt).is_ok());
    }

    #[test]
    fn conflicting_dimensions_fail() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 5);
        let stmt = IndexStmt::assignment(
            Access::new(a, vec![i.clone()]),
            IndexExpr::access(b, vec![i]),
            None,
        );
        assert!(check_dimensions(&stmt).is_err());
    }
}
