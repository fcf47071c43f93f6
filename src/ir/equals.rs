//! Structural equality for [`IndexExpr`]/[`IndexStmt`] (spec.md §4.C2).
//!
//! Recursive, visitor-driven: every node kind compares its own tagged data
//! plus its children pairwise; mismatched kinds are never equal. This is
//! the crate's only notion of IR equality -- it is intentionally distinct
//! from pointer/`Rc::ptr_eq` identity, so two independently-built but
//! structurally identical trees compare equal (spec.md §8 "Equality
//! reflexivity" property).

use crate::ir::expr::{IndexExpr, IndexExprNode};
use crate::ir::stmt::{IndexStmt, IndexStmtNode};
use crate::types::LiteralValue;

/// Byte-level literal comparison (spec.md §9: "compare raw byte payloads --
/// avoids NaN subtleties"). Two NaNs with identical bit patterns compare
/// equal here even though plain IEEE-754 `==` would say `false`; `0.0` and
/// `-0.0` compare unequal here even though IEEE-754 `==` would say `true`.
pub fn literal_bytes_equal(a: LiteralValue, b: LiteralValue) -> bool {
    use LiteralValue::*;
    match (a, b) {
        (Bool(x), Bool(y)) => x == y,
        (Int8(x), Int8(y)) => x == y,
        (Int16(x), Int16(y)) => x == y,
        (Int32(x), Int32(y)) => x == y,
        (Int64(x), Int64(y)) => x == y,
        (UInt8(x), UInt8(y)) => x == y,
        (UInt16(x), UInt16(y)) => x == y,
        (UInt32(x), UInt32(y)) => x == y,
        (UInt64(x), UInt64(y)) => x == y,
        (Float32(x), Float32(y)) => x.to_bits() == y.to_bits(),
        (Float64(x), Float64(y)) => x.to_bits() == y.to_bits(),
        (Complex64(xr, xi), Complex64(yr, yi)) => {
            xr.to_bits() == yr.to_bits() && xi.to_bits() == yi.to_bits()
        }
        (Complex128(xr, xi), Complex128(yr, yi)) => {
            xr.to_bits() == yr.to_bits() && xi.to_bits() == yi.to_bits()
        }
        _ => false,
    }
}

pub fn expr_equals(a: &IndexExpr, b: &IndexExpr) -> bool {
    use IndexExprNode::*;
    match (a.node(), b.node()) {
        (Access(x), Access(y)) => x.tensor == y.tensor && x.indices == y.indices,
        (Literal(x), Literal(y)) => literal_bytes_equal(*x, *y),
        (Neg(x), Neg(y)) | (Sqrt(x), Sqrt(y)) => expr_equals(x, y),
        (Cast(tx, x), Cast(ty, y)) => tx == ty && expr_equals(x, y),
        (Add(xa, xb), Add(ya, yb))
        | (Sub(xa, xb), Sub(ya, yb))
        | (Mul(xa, xb), Mul(ya, yb))
        | (Div(xa, xb), Div(ya, yb)) => expr_equals(xa, ya) && expr_equals(xb, yb),
        (CallIntrinsic(xi, xargs), CallIntrinsic(yi, yargs)) => {
            xi == yi
                && xargs.len() == yargs.len()
                && xargs.iter().zip(yargs).all(|(p, q)| expr_equals(p, q))
        }
        (Reduction(xop, xvar, xbody), Reduction(yop, yvar, ybody)) => {
            xop == yop && xvar == yvar && expr_equals(xbody, ybody)
        }
        _ => false,
    }
}

pub fn stmt_equals(a: &IndexStmt, b: &IndexStmt) -> bool {
    use IndexStmtNode::*;
    match (a.node(), b.node()) {
        (Assignment(x), Assignment(y)) => {
            x.lhs.tensor == y.lhs.tensor
                && x.lhs.indices == y.lhs.indices
                && expr_equals(&x.rhs, &y.rhs)
                && x.op == y.op
        }
        (Forall(xv, xs, xu, xr), Forall(yv, ys, yu, yr)) => {
            xv == yv && stmt_equals(xs, ys) && xu == yu && xr == yr
        }
        (Where(xc, xp), Where(yc, yp)) | (Sequence(xc, xp), Sequence(yc, yp)) => {
            stmt_equals(xc, yc) && stmt_equals(xp, yp)
        }
        (Multi(xa, xb), Multi(ya, yb)) => stmt_equals(xa, ya) && stmt_equals(xb, yb),
        (Yield(xv, xe), Yield(yv, ye)) => xv == yv && expr_equals(xe, ye),
        (SuchThat(xs, xrels), SuchThat(ys, yrels)) => xrels == yrels && stmt_equals(xs, ys),
        _ => false,
    }
}

impl PartialEq for IndexExpr {
    fn eq(&self, other: &Self) -> bool {
        expr_equals(self, other)
    }
}
impl Eq for IndexExpr {}

impl PartialEq for IndexStmt {
    fn eq(&self, other: &Self) -> bool {
        stmt_equals(self, other)
    }
}
impl Eq for IndexStmt {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::Access;
    use crate::ir::indexvar::IndexVar;
    use crate::ir::stmt::IndexStmt;
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
    fn reflexivity_on_access() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let e1 = IndexExpr::access(a.clone(), vec![i.clone()]);
        let e2 = IndexExpr::access(a, vec![i]);
        assert_eq!(e1, e2);
    }

    #[test]
    fn distinct_tensorvars_are_not_equal() {
        let i = IndexVar::new("i");
        let a1 = vec_tensor("a", 10);
        let a2 = vec_tensor("a", 10);
        let e1 = IndexExpr::access(a1, vec![i.clone()]);
        let e2 = IndexExpr::access(a2, vec![i]);
        assert_ne!(e1, e2, "TensorVar equality is by identity, not attributes");
    }

    #[test]
    fn nan_bit_patterns_compare_equal_but_zero_and_neg_zero_do_not() {
        let n1 = LiteralValue::Float64(f64::NAN);
        let n2 = LiteralValue::Float64(f64::NAN);
        assert!(literal_bytes_equal(n1, n2));
        assert!(!literal_bytes_equal(
            LiteralValue::Float64(0.0),
            LiteralValue::Float64(-0.0)
        ));
    }

    #[test]
    fn assignment_equality_requires_same_op() {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let lhs = Access::new(a, vec![i.clone()]);
        let rhs = IndexExpr::access(b, vec![i]);
        let s1 = IndexStmt::assignment(lhs.clone(), rhs.clone(), None);
        let s2 = IndexStmt::assignment(lhs, rhs, Some(crate::ir::expr::CompoundOp::Add));
        assert_ne!(s1, s2);
    }
}
