//! [`IndexExpr`]: the immutable index-notation expression tree (spec.md
//! §3). Nodes are `Rc`-owned so equal subtrees can be shared cheaply
//! (spec.md §9); equality is always structural, never by pointer -- see
//! [`crate::ir::equals`].

use crate::ir::indexvar::IndexVar;
use crate::ir::tensorvar::TensorVar;
use crate::types::{Datatype, LiteralValue};
use std::rc::Rc;

/// The operator a [`Reduction`] or a compound [`crate::ir::stmt::Assignment`]
/// is tagged with. The source represents this as an "empty" operator node
/// (e.g. a freshly constructed `AddNode` with no children) used purely as a
/// tag (spec.md §3: "op is always an empty Add/Mul/... node used only as an
/// operator tag"); a plain enum is the idiomatic Rust rendering of that tag
/// and preserves the same equality/semantics without representing a binary
/// node that is never actually evaluated with two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundOp {
    Add,
    Mul,
    Max,
    Min,
    BitOr,
    BitAnd,
}

impl CompoundOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompoundOp::Add => "+=",
            CompoundOp::Mul => "*=",
            CompoundOp::Max => "max=",
            CompoundOp::Min => "min=",
            CompoundOp::BitOr => "|=",
            CompoundOp::BitAnd => "&=",
        }
    }
}

/// An access of a tensor variable at a tuple of index variables. Structural
/// equality requires identical `TensorVar` identity and identical index-var
/// sequence (spec.md §4.C2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub tensor: TensorVar,
    pub indices: Vec<IndexVar>,
}

impl Access {
    pub fn new(tensor: TensorVar, indices: Vec<IndexVar>) -> Access {
        assert_eq!(
            tensor.order(),
            indices.len(),
            "Access index-var count must equal tensor order (spec.md §3 invariant 2)"
        );
        Access { tensor, indices }
    }
}

#[derive(Debug)]
pub enum IndexExprNode {
    Access(Access),
    Literal(LiteralValue),
    Neg(IndexExpr),
    Sqrt(IndexExpr),
    Cast(Datatype, IndexExpr),
    Add(IndexExpr, IndexExpr),
    Sub(IndexExpr, IndexExpr),
    Mul(IndexExpr, IndexExpr),
    Div(IndexExpr, IndexExpr),
    CallIntrinsic(crate::ir::intrinsic::IntrinsicId, Vec<IndexExpr>),
    /// `op` tags which reduction this is (spec.md §3); `var` is bound within
    /// `body`.
    Reduction(CompoundOp, IndexVar, IndexExpr),
}

/// An immutable, structurally-shared index expression.
#[derive(Debug, Clone)]
pub struct IndexExpr(pub(crate) Rc<IndexExprNode>);

impl IndexExpr {
    pub fn node(&self) -> &IndexExprNode {
        &self.0
    }

    fn new(node: IndexExprNode) -> IndexExpr {
        IndexExpr(Rc::new(node))
    }

    pub fn access(tensor: TensorVar, indices: Vec<IndexVar>) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Access(Access::new(tensor, indices)))
    }

    pub fn literal(value: LiteralValue) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Literal(value))
    }

    pub fn zero(ty: Datatype) -> IndexExpr {
        IndexExpr::literal(LiteralValue::zero(ty))
    }

    pub fn neg(e: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Neg(e))
    }

    pub fn sqrt(e: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Sqrt(e))
    }

    pub fn cast(ty: Datatype, e: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Cast(ty, e))
    }

    pub fn add(a: IndexExpr, b: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Add(a, b))
    }

    pub fn sub(a: IndexExpr, b: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Sub(a, b))
    }

    pub fn mul(a: IndexExpr, b: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Mul(a, b))
    }

    pub fn div(a: IndexExpr, b: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Div(a, b))
    }

    pub fn call_intrinsic(id: crate::ir::intrinsic::IntrinsicId, args: Vec<IndexExpr>) -> IndexExpr {
        IndexExpr::new(IndexExprNode::CallIntrinsic(id, args))
    }

    pub fn reduction(op: CompoundOp, var: IndexVar, body: IndexExpr) -> IndexExpr {
        IndexExpr::new(IndexExprNode::Reduction(op, var, body))
    }

    pub fn sum(var: IndexVar, body: IndexExpr) -> IndexExpr {
        IndexExpr::reduction(CompoundOp::Add, var, body)
    }

    pub fn is_reduction(&self) -> bool {
        matches!(self.node(), IndexExprNode::Reduction(..))
    }

    pub fn is_access(&self) -> bool {
        matches!(self.node(), IndexExprNode::Access(..))
    }

    /// The index variables appearing anywhere in this expression, in the
    /// order their enclosing `Access` nodes are visited (pre-order,
    /// left-to-right), with duplicates kept (callers that need a set can
    /// dedupe).
    pub fn index_vars(&self) -> Vec<IndexVar> {
        let mut out = Vec::new();
        collect_index_vars(self, &mut out);
        out
    }
}

fn collect_index_vars(expr: &IndexExpr, out: &mut Vec<IndexVar>) {
    match expr.node() {
        IndexExprNode::Access(a) => out.extend(a.indices.iter().cloned()),
        IndexExprNode::Literal(_) => {}
        IndexExprNode::Neg(e) | IndexExprNode::Sqrt(e) | IndexExprNode::Cast(_, e) => {
            collect_index_vars(e, out)
        }
        IndexExprNode::Add(a, b)
        | IndexExprNode::Sub(a, b)
        | IndexExprNode::Mul(a, b)
        | IndexExprNode::Div(a, b) => {
            collect_index_vars(a, out);
            collect_index_vars(b, out);
        }
        IndexExprNode::CallIntrinsic(_, args) => {
            for a in args {
                collect_index_vars(a, out);
            }
        }
        IndexExprNode::Reduction(_, _, body) => collect_index_vars(body, out),
    }
}

impl std::ops::Neg for IndexExpr {
    type Output = IndexExpr;
    fn neg(self) -> IndexExpr {
        IndexExpr::neg(self)
    }
}

impl std::ops::Add for IndexExpr {
    type Output = IndexExpr;
    fn add(self, rhs: IndexExpr) -> IndexExpr {
        IndexExpr::add(self, rhs)
    }
}

impl std::ops::Sub for IndexExpr {
    type Output = IndexExpr;
    fn sub(self, rhs: IndexExpr) -> IndexExpr {
        IndexExpr::sub(self, rhs)
    }
}

impl std::ops::Mul for IndexExpr {
    type Output = IndexExpr;
    fn mul(self, rhs: IndexExpr) -> IndexExpr {
        IndexExpr::mul(self, rhs)
    }
}

impl std::ops::Div for IndexExpr {
    type Output = IndexExpr;
    fn div(self, rhs: IndexExpr) -> IndexExpr {
        IndexExpr::div(self, rhs)
    }
}
