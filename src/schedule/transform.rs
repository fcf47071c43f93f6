//! Schedule transformations (spec.md §4.C4.1): functions `IndexStmt ->
//! Result<IndexStmt, ReasonError>` that rewrite the nested `Forall`
//! structure and/or the outer `SuchThat` predicate list. Grounded on
//! `IndexStmt::split/reorder/fuse/pos` in `index_notation.cpp`.

use crate::error::ReasonError;
use crate::ir::indexvar::IndexVar;
use crate::ir::expr::Access;
use crate::ir::stmt::{IndexStmt, IndexStmtNode, ParallelUnit, RaceStrategy};
use crate::schedule::rel::{FuseRel, IndexVarRel, PosRel, SplitRel};
use std::collections::HashSet;

/// Locate the contiguous nested chain `Forall(olds[0], Forall(olds[1], ...))`
/// and replace it with `Forall(news[0], Forall(news[1], ...))`, preserving
/// the innermost original's body, parallel unit, and race strategy on the
/// innermost new variable (`ForAllReplace`, spec.md §4.C4.1).
pub fn forall_replace(stmt: &IndexStmt, olds: &[IndexVar], news: &[IndexVar]) -> Result<IndexStmt, ReasonError> {
    let (result, found) = replace_first_chain(stmt, olds, news);
    if found {
        Ok(result)
    } else {
        Err(ReasonError::from(format!(
            "no contiguous nested Forall chain matching {:?} was found",
            olds.iter().map(|v| v.to_string()).collect::<Vec<_>>()
        )))
    }
}

fn try_match_chain(
    stmt: &IndexStmt,
    olds: &[IndexVar],
) -> Option<(IndexStmt, ParallelUnit, RaceStrategy)> {
    match (olds.split_first(), stmt.node()) {
        (Some((head, rest)), IndexStmtNode::Forall(v, body, unit, race)) if v == head => {
            if rest.is_empty() {
                Some((body.clone(), *unit, *race))
            } else {
                try_match_chain(body, rest)
            }
        }
        _ => None,
    }
}

fn build_chain(news: &[IndexVar], body: IndexStmt, innermost_unit: ParallelUnit, innermost_race: RaceStrategy) -> IndexStmt {
    match news.split_last() {
        None => body,
        Some((last, rest)) => {
            let mut acc = IndexStmt::forall_with(last.clone(), body, innermost_unit, innermost_race);
            for v in rest.iter().rev() {
                acc = IndexStmt::forall(v.clone(), acc);
            }
            acc
        }
    }
}

fn replace_first_chain(stmt: &IndexStmt, olds: &[IndexVar], news: &[IndexVar]) -> (IndexStmt, bool) {
    if let Some((body, unit, race)) = try_match_chain(stmt, olds) {
        return (build_chain(news, body, unit, race), true);
    }
    descend(stmt, &mut |s| replace_first_chain(s, olds, news))
}

/// Shared recursive-descent skeleton: tries `f` at the current node (the
/// caller already tried the root before calling `descend`), otherwise
/// recurses into children, stopping at the first subtree where `f` or a
/// nested call succeeds.
fn descend(stmt: &IndexStmt, f: &mut dyn FnMut(&IndexStmt) -> (IndexStmt, bool)) -> (IndexStmt, bool) {
    match stmt.node() {
        IndexStmtNode::Assignment(_) | IndexStmtNode::Yield(..) => (stmt.clone(), false),
        IndexStmtNode::Forall(v, body, unit, race) => {
            let (nb, found) = f(body);
            (IndexStmt::forall_with(v.clone(), nb, *unit, *race), found)
        }
        IndexStmtNode::Where(c, p) => {
            let (nc, found) = f(c);
            if found {
                (IndexStmt::where_(nc, p.clone()), true)
            } else {
                let (np, found2) = f(p);
                (IndexStmt::where_(c.clone(), np), found2)
            }
        }
        IndexStmtNode::Sequence(d, m) => {
            let (nd, found) = f(d);
            if found {
                (IndexStmt::sequence(nd, m.clone()), true)
            } else {
                let (nm, found2) = f(m);
                (IndexStmt::sequence(d.clone(), nm), found2)
            }
        }
        IndexStmtNode::Multi(a, b) => {
            let (na, found) = f(a);
            if found {
                (IndexStmt::multi(na, b.clone()), true)
            } else {
                let (nb, found2) = f(b);
                (IndexStmt::multi(a.clone(), nb), found2)
            }
        }
        IndexStmtNode::SuchThat(body, rels) => {
            let (nb, found) = f(body);
            (IndexStmt::such_that(nb, rels.clone()), found)
        }
    }
}

/// `split(i, i1, i2, k)`: introduces `Split(i,i1,i2,k)`, replaces every
/// `Forall(i,...)` with `Forall(i1, Forall(i2,...))`.
pub fn split(stmt: &IndexStmt, i: IndexVar, i1: IndexVar, i2: IndexVar, factor: usize) -> Result<IndexStmt, ReasonError> {
    if factor == 0 {
        return Err(ReasonError::from("split factor must be nonzero"));
    }
    let rewritten = forall_replace(stmt, std::slice::from_ref(&i), &[i1.clone(), i2.clone()])?;
    Ok(add_such_that_predicates(
        &rewritten,
        vec![IndexVarRel::Split(SplitRel {
            parent: i,
            outer: i1,
            inner: i2,
            factor,
        })],
    ))
}

/// `fuse(i, j, f)`: introduces `Fuse(i,j,f)`, replaces `Forall(i,
/// Forall(j,...))` with `Forall(f,...)`. `i` and `j` must be immediately
/// nested in that order.
pub fn fuse(stmt: &IndexStmt, i: IndexVar, j: IndexVar, f: IndexVar) -> Result<IndexStmt, ReasonError> {
    let rewritten = forall_replace(stmt, &[i.clone(), j.clone()], std::slice::from_ref(&f))?;
    Ok(add_such_that_predicates(
        &rewritten,
        vec![IndexVarRel::Fuse(FuseRel {
            outer_parent: i,
            inner_parent: j,
            fused: f,
        })],
    ))
}

/// `pos(i, ipos, a)`: introduces `Pos(i, ipos, a)`, replaces `Forall(i,...)`
/// with `Forall(ipos,...)`.
pub fn pos(stmt: &IndexStmt, i: IndexVar, ipos: IndexVar, access: Access) -> Result<IndexStmt, ReasonError> {
    let rewritten = forall_replace(stmt, std::slice::from_ref(&i), std::slice::from_ref(&ipos))?;
    Ok(add_such_that_predicates(
        &rewritten,
        vec![IndexVarRel::Pos(PosRel {
            parent: i,
            pos_var: ipos,
            access,
        })],
    ))
}

/// `reorder(path)`: rewrite a contiguous immediately-nested `Forall` group
/// to the given permutation; fails unless the variables found form exactly
/// that set as a contiguous nested chain.
pub fn reorder(stmt: &IndexStmt, path: Vec<IndexVar>) -> Result<IndexStmt, ReasonError> {
    let target: HashSet<IndexVar> = path.iter().cloned().collect();
    if target.len() != path.len() {
        return Err(ReasonError::from("reorder requires distinct index variables"));
    }
    let (result, found) = reorder_descend(stmt, &path, &target);
    if found {
        Ok(result)
    } else {
        Err(ReasonError::from(
            "reorder requires a contiguous nested Forall chain over exactly the given variables",
        ))
    }
}

fn match_chain_by_set(
    stmt: &IndexStmt,
    len: usize,
    target: &HashSet<IndexVar>,
) -> Option<(IndexStmt, ParallelUnit, RaceStrategy)> {
    let mut cur = stmt.clone();
    let mut collected = Vec::with_capacity(len);
    let mut last_unit = ParallelUnit::NotParallel;
    let mut last_race = RaceStrategy::IgnoreRaces;
    for _ in 0..len {
        let (v, body, unit, race) = match cur.node() {
            IndexStmtNode::Forall(v, body, unit, race) => (v.clone(), body.clone(), *unit, *race),
            _ => return None,
        };
        collected.push(v);
        last_unit = unit;
        last_race = race;
        cur = body;
    }
    let set: HashSet<IndexVar> = collected.into_iter().collect();
    if &set == target {
        Some((cur, last_unit, last_race))
    } else {
        None
    }
}

fn reorder_descend(stmt: &IndexStmt, path: &[IndexVar], target: &HashSet<IndexVar>) -> (IndexStmt, bool) {
    if let Some((body, unit, race)) = match_chain_by_set(stmt, path.len(), target) {
        return (build_chain(path, body, unit, race), true);
    }
    descend(stmt, &mut |s| reorder_descend(s, path, target))
}

/// `parallelize(i, unit, race)`: annotate the matching `Forall` with the
/// parallel unit and race strategy; fails if `race` is `NoRaces` while `i`
/// is bound as a reduction variable in a nested compound assignment.
pub fn parallelize(stmt: &IndexStmt, i: IndexVar, unit: ParallelUnit, race: RaceStrategy) -> Result<IndexStmt, ReasonError> {
    let body = find_forall_body(stmt, &i)
        .ok_or_else(|| ReasonError::from(format!("no Forall({}) found to parallelize", i)))?;
    if race == RaceStrategy::NoRaces && contains_compound_reduction(&body, &i) {
        return Err(ReasonError::from(format!(
            "parallelize: NoRaces is inconsistent with {} being a reduction variable",
            i
        )));
    }
    let (result, found) = set_forall_annotation(stmt, &i, unit, race);
    if found {
        Ok(result)
    } else {
        Err(ReasonError::from(format!("no Forall({}) found to parallelize", i)))
    }
}

fn find_forall_body(stmt: &IndexStmt, target: &IndexVar) -> Option<IndexStmt> {
    match stmt.node() {
        IndexStmtNode::Forall(v, body, _, _) if v == target => Some(body.clone()),
        IndexStmtNode::Forall(_, body, _, _) => find_forall_body(body, target),
        IndexStmtNode::Where(c, p) => find_forall_body(c, target).or_else(|| find_forall_body(p, target)),
        IndexStmtNode::Sequence(d, m) => find_forall_body(d, target).or_else(|| find_forall_body(m, target)),
        IndexStmtNode::Multi(a, b) => find_forall_body(a, target).or_else(|| find_forall_body(b, target)),
        IndexStmtNode::SuchThat(body, _) => find_forall_body(body, target),
        IndexStmtNode::Assignment(_) | IndexStmtNode::Yield(..) => None,
    }
}

fn contains_compound_reduction(stmt: &IndexStmt, target: &IndexVar) -> bool {
    match stmt.node() {
        IndexStmtNode::Assignment(a) => a.op.is_some() && a.reduction_vars().contains(target),
        IndexStmtNode::Forall(_, body, _, _) => contains_compound_reduction(body, target),
        IndexStmtNode::Where(c, p) => contains_compound_reduction(c, target) || contains_compound_reduction(p, target),
        IndexStmtNode::Sequence(d, m) => contains_compound_reduction(d, target) || contains_compound_reduction(m, target),
        IndexStmtNode::Multi(a, b) => contains_compound_reduction(a, target) || contains_compound_reduction(b, target),
        IndexStmtNode::SuchThat(body, _) => contains_compound_reduction(body, target),
        IndexStmtNode::Yield(..) => false,
    }
}

fn set_forall_annotation(stmt: &IndexStmt, target: &IndexVar, unit: ParallelUnit, race: RaceStrategy) -> (IndexStmt, bool) {
    match stmt.node() {
        IndexStmtNode::Forall(v, body, _, _) if v == target => {
            (IndexStmt::forall_with(v.clone(), body.clone(), unit, race), true)
        }
        _ => descend(stmt, &mut |s| set_forall_annotation(s, target, unit, race)),
    }
}

/// `AddSuchThatPredicates(rels)`: lifts or augments the outer `SuchThat`
/// with the given relations.
pub fn add_such_that_predicates(stmt: &IndexStmt, new_rels: Vec<IndexVarRel>) -> IndexStmt {
    match stmt.as_such_that() {
        Some((body, existing)) => {
            let mut merged = existing.to_vec();
            merged.extend(new_rels);
            IndexStmt::such_that(body.clone(), merged)
        }
        None => IndexStmt::such_that(stmt.clone(), new_rels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::IndexExpr;
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

    fn vector_add() -> (IndexStmt, IndexVar) {
        let i = IndexVar::new("i");
        let a = vec_tensor("a", 10);
        let b = vec_tensor("b", 10);
        let c = vec_tensor("c", 10);
        let assign = IndexStmt::assignment(
            crate::ir::expr::Access::new(a, vec![i.clone()]),
            IndexExpr::add(
                IndexExpr::access(b, vec![i.clone()]),
                IndexExpr::access(c, vec![i.clone()]),
            ),
            None,
        );
        (IndexStmt::forall(i.clone(), assign), i)
    }

    #[test]
    fn split_introduces_nested_foralls_and_predicate() {
        let (stmt, i) = vector_add();
        let i1 = IndexVar::new("i1");
        let i2 = IndexVar::new("i2");
        let out = split(&stmt, i, i1.clone(), i2.clone(), 4).unwrap();
        let (body, rels) = out.as_such_that().unwrap();
        assert_eq!(rels.len(), 1);
        match body.node() {
            IndexStmtNode::Forall(v1, inner, _, _) => {
                assert_eq!(v1, &i1);
                match inner.node() {
                    IndexStmtNode::Forall(v2, _, _, _) => assert_eq!(v2, &i2),
                    _ => panic!("expected nested Forall"),
                }
            }
            _ => panic!("expected outer Forall"),
        }
    }

    #[test]
    fn split_on_missing_variable_fails() {
        let (stmt, _i) = vector_add();
        let missing = IndexVar::new("q");
        let i1 = IndexVar::new("i1");
        let i2 = IndexVar::new("i2");
        assert!(split(&stmt, missing, i1, i2, 4).is_err());
    }

    #[test]
    fn parallelize_rejects_no_races_on_reduction_variable() {
        let i = IndexVar::new("i");
        let k = IndexVar::new("k");
        let a = vec_tensor("a", 10);
        let b = TensorVar::new(
            "b",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![10, 10],
            },
            Format::dense(2),
        );
        let assign = IndexStmt::assignment(
            crate::ir::expr::Access::new(a, vec![i.clone()]),
            IndexExpr::access(b, vec![i.clone(), k.clone()]),
            Some(crate::ir::expr::CompoundOp::Add),
        );
        let stmt = IndexStmt::forall(i.clone(), IndexStmt::forall(k.clone(), assign));
        assert!(parallelize(&stmt, k, ParallelUnit::CpuThread, RaceStrategy::NoRaces).is_err());
    }
}
