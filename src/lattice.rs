//! Merge-lattice builder (spec.md §4.C6): for an index variable `v` of a
//! concrete statement, builds the lattice of iterator intersections/unions
//! that defines `v`'s loop body.
//!
//! No original lattice source file was retrieved (the kept `original_
//! source` snapshot predates the merge-lattice rewrite); built directly
//! from spec.md §4.C6 and the point sets pinned down by §8 scenarios 1-3.

use crate::ir::expr::{Access, IndexExpr, IndexExprNode};
use crate::ir::indexvar::IndexVar;
use crate::types::ModeFormatKind;

/// One point of a [`Lattice`]: the set of iterators that must be stepped in
/// lockstep to reach this point, the (possibly larger) set of accesses
/// whose value the point's expression reads, and the expression to
/// evaluate here.
#[derive(Debug, Clone)]
pub struct LatticePoint {
    /// Accesses whose iterator must be advanced to visit this point
    /// (Locate-capable accesses are excluded here; they're read
    /// positionally instead, spec.md §4.C6 construction step 2).
    pub iterators: Vec<Access>,
    /// Every access this point's expression reads, including Locate-only
    /// ones.
    pub accesses: Vec<Access>,
    pub expr: IndexExpr,
}

impl LatticePoint {
    fn leaf(access: Access, steps: bool, expr: IndexExpr) -> LatticePoint {
        LatticePoint {
            iterators: if steps { vec![access.clone()] } else { Vec::new() },
            accesses: vec![access],
            expr,
        }
    }

    fn merge(a: &LatticePoint, b: &LatticePoint, op: fn(IndexExpr, IndexExpr) -> IndexExpr) -> LatticePoint {
        let mut iterators = a.iterators.clone();
        for it in &b.iterators {
            if !iterators.contains(it) {
                iterators.push(it.clone());
            }
        }
        let mut accesses = a.accesses.clone();
        for ac in &b.accesses {
            if !accesses.contains(ac) {
                accesses.push(ac.clone());
            }
        }
        LatticePoint {
            iterators,
            accesses,
            expr: op(a.expr.clone(), b.expr.clone()),
        }
    }
}

impl PartialEq for LatticePoint {
    fn eq(&self, other: &Self) -> bool {
        self.iterators == other.iterators && self.expr == other.expr
    }
}

/// A nonempty DAG of [`LatticePoint`]s with the intersection of every
/// contributing iterator as the unique maximal (`top`) point and the union
/// as the minimal (`bottom`) point (spec.md §4.C6, §8 "Lattice ⊤/⊥").
/// Points are stored most-specific (top) first.
#[derive(Debug, Clone)]
pub struct Lattice {
    points: Vec<LatticePoint>,
}

impl Lattice {
    fn single(point: LatticePoint) -> Lattice {
        Lattice { points: vec![point] }
    }

    pub fn points(&self) -> &[LatticePoint] {
        &self.points
    }

    pub fn top(&self) -> &LatticePoint {
        &self.points[0]
    }

    pub fn bottom(&self) -> &LatticePoint {
        self.points.last().unwrap()
    }

    /// Intersection merge (`Mul`/`Div`/zero-preserving intrinsic args):
    /// every pairing of a point from `a` with a point from `b`, since both
    /// operands must be present to contribute (spec.md §4.C6 step 1).
    fn conjunction(a: &Lattice, b: &Lattice, op: fn(IndexExpr, IndexExpr) -> IndexExpr) -> Lattice {
        let mut points = Vec::new();
        for pa in &a.points {
            for pb in &b.points {
                points.push(LatticePoint::merge(pa, pb, op));
            }
        }
        Lattice { points }.remove_dominated()
    }

    /// Union merge (`Add`/`Sub`): the cross-product (intersection) points
    /// plus each operand's own points standing alone, since either operand
    /// may be exhausted while the other still contributes (spec.md §4.C6
    /// step 1, §8 scenario 3). An operand whose own point has no steppable
    /// iterator (purely dense/Locate operands) is never "exhausted"
    /// independently, so its solo point is not appended -- only the
    /// cross-product top point covers it.
    fn disjunction(a: &Lattice, b: &Lattice, op: fn(IndexExpr, IndexExpr) -> IndexExpr) -> Lattice {
        let mut points = Vec::new();
        for pa in &a.points {
            for pb in &b.points {
                points.push(LatticePoint::merge(pa, pb, op));
            }
        }
        points.extend(a.points.iter().filter(|p| !p.iterators.is_empty()).cloned());
        points.extend(b.points.iter().filter(|p| !p.iterators.is_empty()).cloned());
        Lattice { points }.remove_dominated()
    }

    /// Drop exact duplicate points: same iterator set and structurally
    /// equal expression (spec.md §4.C6 step 3: "this collapses redundant
    /// overlap cases for dense operands").
    fn remove_dominated(self) -> Lattice {
        let mut kept: Vec<LatticePoint> = Vec::new();
        for p in self.points {
            if !kept.iter().any(|q| q.iterators == p.iterators && q.expr == p.expr) {
                kept.push(p);
            }
        }
        kept.sort_by_key(|p| std::cmp::Reverse(p.iterators.len()));
        Lattice { points: kept }
    }
}

/// Whether `kind` grants `Locate` (random access by coordinate), which
/// removes the access from the merge/step set per spec.md §4.C6 step 2.
fn has_locate(kind: ModeFormatKind) -> bool {
    matches!(kind, ModeFormatKind::Dense)
}

/// The format-mode kind governing access `a`'s iteration over `v`: the
/// mode at the position `v` occupies in `a`'s index list.
fn mode_kind_for(a: &Access, v: &IndexVar) -> Option<ModeFormatKind> {
    let pos = a.indices.iter().position(|iv| iv == v)?;
    Some(a.tensor.format().mode(pos).kind)
}

/// Build the merge lattice for `v` over expression `e` (typically a
/// concrete `Assignment`'s rhs restricted to `v`'s `Forall` body).
pub fn build_lattice(v: &IndexVar, e: &IndexExpr) -> Option<Lattice> {
    match e.node() {
        IndexExprNode::Access(a) => {
            if !a.indices.contains(v) {
                return None;
            }
            let kind = mode_kind_for(a, v).unwrap_or(ModeFormatKind::Dense);
            let steps = !has_locate(kind);
            Some(Lattice::single(LatticePoint::leaf(a.clone(), steps, e.clone())))
        }
        IndexExprNode::Literal(_) => None,
        IndexExprNode::Neg(x) => build_lattice(v, x).map(|l| map_exprs(l, IndexExpr::neg)),
        IndexExprNode::Sqrt(x) => build_lattice(v, x).map(|l| map_exprs(l, IndexExpr::sqrt)),
        IndexExprNode::Cast(ty, x) => {
            let ty = *ty;
            build_lattice(v, x).map(|l| map_exprs(l, move |e| IndexExpr::cast(ty, e)))
        }
        IndexExprNode::Add(a, b) => combine(v, a, b, IndexExpr::add, true),
        IndexExprNode::Sub(a, b) => combine(v, a, b, IndexExpr::sub, true),
        IndexExprNode::Mul(a, b) => combine(v, a, b, IndexExpr::mul, false),
        IndexExprNode::Div(a, b) => combine(v, a, b, IndexExpr::div, false),
        IndexExprNode::CallIntrinsic(id, args) => {
            let preserving: Vec<usize> = id.zero_preserving_positions().to_vec();
            let mut lattice: Option<Lattice> = None;
            for (idx, arg) in args.iter().enumerate() {
                if let Some(al) = build_lattice(v, arg) {
                    let conjunctive = preserving.contains(&idx);
                    lattice = Some(match lattice {
                        None => al,
                        Some(prev) => {
                            if conjunctive {
                                Lattice::conjunction(&prev, &al, |a, _| a)
                            } else {
                                Lattice::disjunction(&prev, &al, |a, _| a)
                            }
                        }
                    });
                }
            }
            lattice.map(|l| map_exprs(l, {
                let id = *id;
                let args = args.clone();
                move |_| IndexExpr::call_intrinsic(id, args.clone())
            }))
        }
        IndexExprNode::Reduction(_, var, body) => {
            if var == v {
                None
            } else {
                build_lattice(v, body)
            }
        }
    }
}

fn combine(
    v: &IndexVar,
    a: &IndexExpr,
    b: &IndexExpr,
    op: fn(IndexExpr, IndexExpr) -> IndexExpr,
    disjunctive: bool,
) -> Option<Lattice> {
    match (build_lattice(v, a), build_lattice(v, b)) {
        (Some(la), Some(lb)) => Some(if disjunctive {
            Lattice::disjunction(&la, &lb, op)
        } else {
            Lattice::conjunction(&la, &lb, op)
        }),
        (Some(la), None) => Some(map_exprs(la, move |e| op(e, b.clone()))),
        (None, Some(lb)) => Some(map_exprs(lb, move |e| op(a.clone(), e))),
        (None, None) => None,
    }
}

fn map_exprs(lattice: Lattice, f: impl Fn(IndexExpr) -> IndexExpr) -> Lattice {
    let points = lattice
        .points
        .into_iter()
        .map(|p| LatticePoint {
            iterators: p.iterators,
            accesses: p.accesses,
            expr: f(p.expr),
        })
        .collect();
    Lattice { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::tensorvar::{TensorType, TensorVar};
    use crate::types::{Datatype, Format};

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

    fn sparse_vec(name: &str, n: usize) -> TensorVar {
        TensorVar::new(
            name,
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![n],
            },
            Format::sparse(1),
        )
    }

    #[test]
    fn dense_vector_add_has_one_point() {
        let i = IndexVar::new("i");
        let b = dense_vec("b", 10);
        let c = dense_vec("c", 10);
        let e = IndexExpr::add(
            IndexExpr::access(b, vec![i.clone()]),
            IndexExpr::access(c, vec![i.clone()]),
        );
        let lattice = build_lattice(&i, &e).unwrap();
        assert_eq!(lattice.points().len(), 1);
        assert!(lattice.top().iterators.is_empty());
    }

    #[test]
    fn sparse_times_sparse_is_single_conjunction_point() {
        let i = IndexVar::new("i");
        let a = sparse_vec("a", 10);
        let b = sparse_vec("b", 10);
        let e = IndexExpr::mul(
            IndexExpr::access(a, vec![i.clone()]),
            IndexExpr::access(b, vec![i.clone()]),
        );
        let lattice = build_lattice(&i, &e).unwrap();
        assert_eq!(lattice.points().len(), 1);
        assert_eq!(lattice.top().iterators.len(), 2);
    }

    #[test]
    fn sparse_plus_sparse_has_three_points() {
        let i = IndexVar::new("i");
        let a = sparse_vec("a", 10);
        let b = sparse_vec("b", 10);
        let e = IndexExpr::add(
            IndexExpr::access(a, vec![i.clone()]),
            IndexExpr::access(b, vec![i.clone()]),
        );
        let lattice = build_lattice(&i, &e).unwrap();
        assert_eq!(lattice.points().len(), 3);
        assert_eq!(lattice.top().iterators.len(), 2);
    }
}
