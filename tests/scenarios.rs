//! End-to-end scenarios spanning concretize -> schedule -> lower, one per
//! worked example in spec.md's Scenarios section. Scenarios 1-3 and 5 are
//! exercised at the unit level inside `lattice.rs`/`notation/normalize.rs`;
//! these integration tests cover the ones that need the full pipeline.

use sparseq::ir::expr::{Access, IndexExpr};
use sparseq::ir::stmt::IndexStmtNode;
use sparseq::ir::tensorvar::{TensorType, TensorVar};
use sparseq::notation::concretize;
use sparseq::schedule::rel::IndexVarRel;
use sparseq::schedule::transform::{pos, split};
use sparseq::schedule::RelGraph;
use sparseq::types::{Datatype, Format};
use sparseq::{lower, IndexStmt, IndexVar};
use std::collections::HashMap;

fn vec_tensor(name: &str, n: usize, format: Format) -> TensorVar {
    TensorVar::new(
        name,
        TensorType {
            datatype: Datatype::Float64,
            shape: vec![n],
        },
        format,
    )
}

fn dense_vector_add(n: usize) -> (IndexStmt, IndexVar) {
    let i = IndexVar::new("i");
    let a = vec_tensor("a", n, Format::dense(1));
    let b = vec_tensor("b", n, Format::dense(1));
    let c = vec_tensor("c", n, Format::dense(1));
    let stmt = IndexStmt::assignment(
        Access::new(a, vec![i.clone()]),
        IndexExpr::add(
            IndexExpr::access(b, vec![i.clone()]),
            IndexExpr::access(c, vec![i.clone()]),
        ),
        None,
    );
    (stmt, i)
}

/// Scenario 4: `split(i,i0,i1,4)` on a dense vector add must yield
/// `SuchThat([Split(i,i0,i1,4)], Forall(i0, Forall(i1, ...)))`, and the
/// split's bounds must divide the parent dimension as spec.md says.
#[test]
fn split_then_execute_produces_nested_foralls_with_correct_bounds() {
    let (raw_stmt, i) = dense_vector_add(16);
    let stmt = concretize(&raw_stmt).unwrap();
    let i0 = IndexVar::new("i0");
    let i1 = IndexVar::new("i1");
    let scheduled = split(&stmt, i.clone(), i0.clone(), i1.clone(), 4).unwrap();

    let (body, rels) = scheduled.as_such_that().unwrap();
    assert_eq!(rels.len(), 1);
    match &rels[0] {
        IndexVarRel::Split(r) => {
            assert_eq!(r.parent, i);
            assert_eq!(r.outer, i0);
            assert_eq!(r.inner, i1);
            assert_eq!(r.factor, 4);
        }
        _ => panic!("expected a Split relation"),
    }

    let (v0, inner) = match body.node() {
        IndexStmtNode::Forall(v, inner, ..) => (v.clone(), inner),
        _ => panic!("expected outer Forall"),
    };
    assert_eq!(v0, i0);
    let v1 = match inner.node() {
        IndexStmtNode::Forall(v, ..) => v.clone(),
        _ => panic!("expected inner Forall"),
    };
    assert_eq!(v1, i1);

    let mut dims: HashMap<IndexVar, usize> = HashMap::new();
    dims.insert(i, 16);
    let ir = lower(&scheduled, &dims).unwrap();
    let rendered = ir.to_string();
    assert!(rendered.contains("i0"));
    assert!(rendered.contains("i1"));
}

/// Scenario 6: `pos(i,ipos,A(i))` then `split(ipos,iposO,iposI,2)` must
/// leave `iposI` a pos variable with underived ancestor `i`, recoverable
/// once both split children are bound.
#[test]
fn pos_then_split_reordering_builds_expected_rel_graph() {
    let i = IndexVar::new("i");
    let ipos = IndexVar::new("ipos");
    let ipos_o = IndexVar::new("iposO");
    let ipos_i = IndexVar::new("iposI");

    let a = vec_tensor("a", 16, Format::sparse(1));
    let access = Access::new(a, vec![i.clone()]);

    let base = IndexStmt::forall(i.clone(), IndexStmt::yield_(vec![i.clone()], IndexExpr::access(access.tensor.clone(), vec![i.clone()])));
    let after_pos = pos(&base, i.clone(), ipos.clone(), access.clone()).unwrap();
    let after_split = split(&after_pos, ipos.clone(), ipos_o.clone(), ipos_i.clone(), 2).unwrap();

    let (_, rels) = after_split.as_such_that().unwrap();
    let graph = RelGraph::build(rels);

    assert!(graph.is_pos_variable(&ipos_i));
    assert_eq!(graph.underived_ancestors(&ipos_i), vec![i.clone()]);
    assert!(graph.is_recoverable(&i, &[ipos_o, ipos_i]));
}

/// A sanity check that the full pipeline (concretize -> lower) produces a
/// loop nest for the simplest dense case, matching scenario 1's lattice.
#[test]
fn dense_vector_add_lowers_to_a_single_forall_loop() {
    let (raw_stmt, i) = dense_vector_add(8);
    let stmt = concretize(&raw_stmt).unwrap();
    let mut dims = HashMap::new();
    dims.insert(i, 8);
    let ir = lower(&stmt, &dims).unwrap();
    let rendered = ir.to_string();
    assert!(rendered.contains("for i in"));
}
