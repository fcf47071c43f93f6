//! Visitor and rewriter frameworks for the index-notation IR (spec.md §4.C2,
//! §9). A plain `Visitor` handler defaults to recursing on children when
//! not overridden; a `Strict*Visitor` has no default bodies at all, so
//! forgetting to handle a node kind -- including one added later -- is a
//! compile error rather than a silently-skipped case (spec.md §9: "the
//! 'strict' variant becomes a compiler-enforced exhaustiveness check").
//!
//! `Rewriter`s are the same idea but return owned replacement trees; the
//! default body for every node kind rebuilds that node from its rewritten
//! children, so a pass overrides only the node kinds it cares about
//! (grounded on the source's `IndexNotationRewriter`).

use crate::ir::expr::{Access, CompoundOp, IndexExpr, IndexExprNode};
use crate::ir::indexvar::IndexVar;
use crate::ir::intrinsic::IntrinsicId;
use crate::ir::stmt::{Assignment, IndexStmt, IndexStmtNode, ParallelUnit, RaceStrategy};
use crate::schedule::rel::IndexVarRel;
use crate::types::{Datatype, LiteralValue};

/// Expression visitor with default-recursing handlers.
pub trait ExprVisitor {
    fn visit_expr(&mut self, e: &IndexExpr) {
        walk_expr(self, e)
    }
    fn visit_access(&mut self, _a: &Access) {}
    fn visit_literal(&mut self, _v: LiteralValue) {}
    fn visit_neg(&mut self, e: &IndexExpr) {
        self.visit_expr(e)
    }
    fn visit_sqrt(&mut self, e: &IndexExpr) {
        self.visit_expr(e)
    }
    fn visit_cast(&mut self, _ty: Datatype, e: &IndexExpr) {
        self.visit_expr(e)
    }
    fn visit_add(&mut self, a: &IndexExpr, b: &IndexExpr) {
        self.visit_expr(a);
        self.visit_expr(b);
    }
    fn visit_sub(&mut self, a: &IndexExpr, b: &IndexExpr) {
        self.visit_expr(a);
        self.visit_expr(b);
    }
    fn visit_mul(&mut self, a: &IndexExpr, b: &IndexExpr) {
        self.visit_expr(a);
        self.visit_expr(b);
    }
    fn visit_div(&mut self, a: &IndexExpr, b: &IndexExpr) {
        self.visit_expr(a);
        self.visit_expr(b);
    }
    fn visit_call_intrinsic(&mut self, _id: IntrinsicId, args: &[IndexExpr]) {
        for a in args {
            self.visit_expr(a);
        }
    }
    fn visit_reduction(&mut self, _op: CompoundOp, _var: &IndexVar, body: &IndexExpr) {
        self.visit_expr(body);
    }
}

/// Dispatch helper used by [`ExprVisitor::visit_expr`]'s default body.
pub fn walk_expr<V: ExprVisitor + ?Sized>(v: &mut V, e: &IndexExpr) {
    match e.node() {
        IndexExprNode::Access(a) => v.visit_access(a),
        IndexExprNode::Literal(val) => v.visit_literal(*val),
        IndexExprNode::Neg(x) => v.visit_neg(x),
        IndexExprNode::Sqrt(x) => v.visit_sqrt(x),
        IndexExprNode::Cast(ty, x) => v.visit_cast(*ty, x),
        IndexExprNode::Add(a, b) => v.visit_add(a, b),
        IndexExprNode::Sub(a, b) => v.visit_sub(a, b),
        IndexExprNode::Mul(a, b) => v.visit_mul(a, b),
        IndexExprNode::Div(a, b) => v.visit_div(a, b),
        IndexExprNode::CallIntrinsic(id, args) => v.visit_call_intrinsic(*id, args),
        IndexExprNode::Reduction(op, var, body) => v.visit_reduction(*op, var, body),
    }
}

/// Statement visitor; recurses into expression children via [`ExprVisitor`].
pub trait StmtVisitor: ExprVisitor {
    fn visit_stmt(&mut self, s: &IndexStmt) {
        walk_stmt(self, s)
    }
    fn visit_assignment(&mut self, a: &Assignment) {
        self.visit_expr(&a.rhs);
    }
    fn visit_forall(
        &mut self,
        _var: &IndexVar,
        body: &IndexStmt,
        _unit: ParallelUnit,
        _race: RaceStrategy,
    ) {
        self.visit_stmt(body);
    }
    fn visit_where(&mut self, consumer: &IndexStmt, producer: &IndexStmt) {
        self.visit_stmt(consumer);
        self.visit_stmt(producer);
    }
    fn visit_sequence(&mut self, defn: &IndexStmt, mutn: &IndexStmt) {
        self.visit_stmt(defn);
        self.visit_stmt(mutn);
    }
    fn visit_multi(&mut self, a: &IndexStmt, b: &IndexStmt) {
        self.visit_stmt(a);
        self.visit_stmt(b);
    }
    fn visit_yield(&mut self, _vars: &[IndexVar], expr: &IndexExpr) {
        self.visit_expr(expr);
    }
    fn visit_such_that(&mut self, body: &IndexStmt, _rels: &[IndexVarRel]) {
        self.visit_stmt(body);
    }
}

pub fn walk_stmt<V: StmtVisitor + ?Sized>(v: &mut V, s: &IndexStmt) {
    match s.node() {
        IndexStmtNode::Assignment(a) => v.visit_assignment(a),
        IndexStmtNode::Forall(var, body, unit, race) => v.visit_forall(var, body, *unit, *race),
        IndexStmtNode::Where(c, p) => v.visit_where(c, p),
        IndexStmtNode::Sequence(d, m) => v.visit_sequence(d, m),
        IndexStmtNode::Multi(a, b) => v.visit_multi(a, b),
        IndexStmtNode::Yield(vars, e) => v.visit_yield(vars, e),
        IndexStmtNode::SuchThat(body, rels) => v.visit_such_that(body, rels),
    }
}

/// Expression rewriter: every handler defaults to rebuilding its node from
/// rewritten children. Override only the node kinds a pass changes.
pub trait ExprRewriter {
    fn rewrite_expr(&mut self, e: &IndexExpr) -> IndexExpr {
        match e.node() {
            IndexExprNode::Access(a) => self.rewrite_access(a),
            IndexExprNode::Literal(v) => self.rewrite_literal(*v),
            IndexExprNode::Neg(x) => self.rewrite_neg(x),
            IndexExprNode::Sqrt(x) => self.rewrite_sqrt(x),
            IndexExprNode::Cast(ty, x) => self.rewrite_cast(*ty, x),
            IndexExprNode::Add(a, b) => self.rewrite_add(a, b),
            IndexExprNode::Sub(a, b) => self.rewrite_sub(a, b),
            IndexExprNode::Mul(a, b) => self.rewrite_mul(a, b),
            IndexExprNode::Div(a, b) => self.rewrite_div(a, b),
            IndexExprNode::CallIntrinsic(id, args) => self.rewrite_call_intrinsic(*id, args),
            IndexExprNode::Reduction(op, var, body) => self.rewrite_reduction(*op, var, body),
        }
    }

    fn rewrite_access(&mut self, a: &Access) -> IndexExpr {
        IndexExpr::access(a.tensor.clone(), a.indices.clone())
    }
    fn rewrite_literal(&mut self, v: LiteralValue) -> IndexExpr {
        IndexExpr::literal(v)
    }
    fn rewrite_neg(&mut self, x: &IndexExpr) -> IndexExpr {
        IndexExpr::neg(self.rewrite_expr(x))
    }
    fn rewrite_sqrt(&mut self, x: &IndexExpr) -> IndexExpr {
        IndexExpr::sqrt(self.rewrite_expr(x))
    }
    fn rewrite_cast(&mut self, ty: Datatype, x: &IndexExpr) -> IndexExpr {
        IndexExpr::cast(ty, self.rewrite_expr(x))
    }
    fn rewrite_add(&mut self, a: &IndexExpr, b: &IndexExpr) -> IndexExpr {
        IndexExpr::add(self.rewrite_expr(a), self.rewrite_expr(b))
    }
    fn rewrite_sub(&mut self, a: &IndexExpr, b: &IndexExpr) -> IndexExpr {
        IndexExpr::sub(self.rewrite_expr(a), self.rewrite_expr(b))
    }
    fn rewrite_mul(&mut self, a: &IndexExpr, b: &IndexExpr) -> IndexExpr {
        IndexExpr::mul(self.rewrite_expr(a), self.rewrite_expr(b))
    }
    fn rewrite_div(&mut self, a: &IndexExpr, b: &IndexExpr) -> IndexExpr {
        IndexExpr::div(self.rewrite_expr(a), self.rewrite_expr(b))
    }
    fn rewrite_call_intrinsic(&mut self, id: IntrinsicId, args: &[IndexExpr]) -> IndexExpr {
        IndexExpr::call_intrinsic(id, args.iter().map(|a| self.rewrite_expr(a)).collect())
    }
    fn rewrite_reduction(&mut self, op: CompoundOp, var: &IndexVar, body: &IndexExpr) -> IndexExpr {
        IndexExpr::reduction(op, var.clone(), self.rewrite_expr(body))
    }
}

/// Statement rewriter; rewrites expression children via [`ExprRewriter`].
pub trait StmtRewriter: ExprRewriter {
    fn rewrite_stmt(&mut self, s: &IndexStmt) -> IndexStmt {
        match s.node() {
            IndexStmtNode::Assignment(a) => self.rewrite_assignment(a),
            IndexStmtNode::Forall(var, body, unit, race) => {
                self.rewrite_forall(var, body, *unit, *race)
            }
            IndexStmtNode::Where(c, p) => self.rewrite_where(c, p),
            IndexStmtNode::Sequence(d, m) => self.rewrite_sequence(d, m),
            IndexStmtNode::Multi(a, b) => self.rewrite_multi(a, b),
            IndexStmtNode::Yield(vars, e) => self.rewrite_yield(vars, e),
            IndexStmtNode::SuchThat(body, rels) => self.rewrite_such_that(body, rels),
        }
    }

    fn rewrite_assignment(&mut self, a: &Assignment) -> IndexStmt {
        IndexStmt::assignment(a.lhs.clone(), self.rewrite_expr(&a.rhs), a.op)
    }
    fn rewrite_forall(
        &mut self,
        var: &IndexVar,
        body: &IndexStmt,
        unit: ParallelUnit,
        race: RaceStrategy,
    ) -> IndexStmt {
        IndexStmt::forall_with(var.clone(), self.rewrite_stmt(body), unit, race)
    }
    fn rewrite_where(&mut self, consumer: &IndexStmt, producer: &IndexStmt) -> IndexStmt {
        IndexStmt::where_(self.rewrite_stmt(consumer), self.rewrite_stmt(producer))
    }
    fn rewrite_sequence(&mut self, defn: &IndexStmt, mutn: &IndexStmt) -> IndexStmt {
        IndexStmt::sequence(self.rewrite_stmt(defn), self.rewrite_stmt(mutn))
    }
    fn rewrite_multi(&mut self, a: &IndexStmt, b: &IndexStmt) -> IndexStmt {
        IndexStmt::multi(self.rewrite_stmt(a), self.rewrite_stmt(b))
    }
    fn rewrite_yield(&mut self, vars: &[IndexVar], expr: &IndexExpr) -> IndexStmt {
        IndexStmt::yield_(vars.to_vec(), self.rewrite_expr(expr))
    }
    fn rewrite_such_that(&mut self, body: &IndexStmt, rels: &[IndexVarRel]) -> IndexStmt {
        IndexStmt::such_that(self.rewrite_stmt(body), rels.to_vec())
    }
}

/// Exhaustiveness-checked expression visitor: adding a new [`IndexExprNode`]
/// variant without updating every implementor is a compile error, since
/// there are no default bodies to silently fall back on.
pub trait StrictExprVisitor {
    fn visit_access(&mut self, a: &Access);
    fn visit_literal(&mut self, v: LiteralValue);
    fn visit_neg(&mut self, e: &IndexExpr);
    fn visit_sqrt(&mut self, e: &IndexExpr);
    fn visit_cast(&mut self, ty: Datatype, e: &IndexExpr);
    fn visit_add(&mut self, a: &IndexExpr, b: &IndexExpr);
    fn visit_sub(&mut self, a: &IndexExpr, b: &IndexExpr);
    fn visit_mul(&mut self, a: &IndexExpr, b: &IndexExpr);
    fn visit_div(&mut self, a: &IndexExpr, b: &IndexExpr);
    fn visit_call_intrinsic(&mut self, id: IntrinsicId, args: &[IndexExpr]);
    fn visit_reduction(&mut self, op: CompoundOp, var: &IndexVar, body: &IndexExpr);
}

pub fn walk_expr_strict<V: StrictExprVisitor + ?Sized>(v: &mut V, e: &IndexExpr) {
    match e.node() {
        IndexExprNode::Access(a) => v.visit_access(a),
        IndexExprNode::Literal(val) => v.visit_literal(*val),
        IndexExprNode::Neg(x) => v.visit_neg(x),
        IndexExprNode::Sqrt(x) => v.visit_sqrt(x),
        IndexExprNode::Cast(ty, x) => v.visit_cast(*ty, x),
        IndexExprNode::Add(a, b) => v.visit_add(a, b),
        IndexExprNode::Sub(a, b) => v.visit_sub(a, b),
        IndexExprNode::Mul(a, b) => v.visit_mul(a, b),
        IndexExprNode::Div(a, b) => v.visit_div(a, b),
        IndexExprNode::CallIntrinsic(id, args) => v.visit_call_intrinsic(*id, args),
        IndexExprNode::Reduction(op, var, body) => v.visit_reduction(*op, var, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::tensorvar::{TensorType, TensorVar};
    use crate::types::{Datatype, Format};

    struct CountAccesses(usize);
    impl ExprVisitor for CountAccesses {
        fn visit_access(&mut self, _a: &Access) {
            self.0 += 1;
        }
    }

    #[test]
    fn default_recursion_visits_every_access() {
        let i = IndexVar::new("i");
        let t = TensorVar::new(
            "a",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![4],
            },
            Format::dense(1),
        );
        let e = IndexExpr::add(
            IndexExpr::access(t.clone(), vec![i.clone()]),
            IndexExpr::access(t, vec![i]),
        );
        let mut counter = CountAccesses(0);
        counter.visit_expr(&e);
        assert_eq!(counter.0, 2);
    }
}
