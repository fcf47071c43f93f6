//! Turns a [`RawAssignment`] into an einsum-form [`IndexStmt`] plus a
//! [`TensorVarTable`] (spec.md §6: "dimensions inferred either from
//! supplied sizes, from loaded tensors' shapes, or a default fill").
//! No notation-form normalization happens here -- that is
//! [`crate::notation::concretize`]'s job; this module only interns names
//! into IR handles.

use super::grammar::{RawAssignment, RawExpr, RawOp};
use crate::error::ReasonError;
use crate::interfaces::TensorVarTable;
use crate::ir::expr::{Access, CompoundOp, IndexExpr};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::IndexStmt;
use crate::ir::tensorvar::{TensorType, TensorVar};
use crate::types::{Datatype, Format};
use std::collections::HashMap;

/// Dimension sizes and formats known ahead of parsing (spec.md §6's `-d`
/// and `-f` CLI flags), keyed by index-variable name and tensor name
/// respectively. Sizes/formats absent here fall back to `default_dim`
/// dense (spec.md §6 "a default fill").
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub dims: HashMap<String, usize>,
    pub formats: HashMap<String, Format>,
    pub default_dim: usize,
}

impl ResolveContext {
    pub fn new() -> ResolveContext {
        ResolveContext {
            dims: HashMap::new(),
            formats: HashMap::new(),
            default_dim: 10,
        }
    }
}

struct Interner {
    vars: HashMap<String, IndexVar>,
    tensors: HashMap<String, TensorVar>,
}

impl Interner {
    fn var(&mut self, name: &str) -> IndexVar {
        self.vars
            .entry(name.to_string())
            .or_insert_with(|| IndexVar::new(name.to_string()))
            .clone()
    }

    fn tensor(&mut self, name: &str, order: usize, ctx: &ResolveContext) -> TensorVar {
        if let Some(t) = self.tensors.get(name) {
            return t.clone();
        }
        let shape = vec![ctx.default_dim; order];
        let format = ctx.formats.get(name).cloned().unwrap_or_else(|| Format::dense(order));
        let tensor = TensorVar::new(
            name.to_string(),
            TensorType {
                datatype: Datatype::Float64,
                shape,
            },
            format,
        );
        self.tensors.insert(name.to_string(), tensor.clone());
        tensor
    }

    fn access(&mut self, name: &str, indices: &[String], ctx: &ResolveContext) -> Access {
        let idx_vars: Vec<IndexVar> = indices.iter().map(|n| self.var(n)).collect();
        let tensor = self.tensor(name, idx_vars.len(), ctx);
        Access::new(tensor, idx_vars)
    }
}

fn resolve_expr(raw: &RawExpr, interner: &mut Interner, ctx: &ResolveContext) -> IndexExpr {
    match raw {
        RawExpr::Access(name, indices) => {
            let a = interner.access(name, indices, ctx);
            IndexExpr::access(a.tensor, a.indices)
        }
        RawExpr::Literal(v) => IndexExpr::literal(crate::types::LiteralValue::Float64(*v)),
        RawExpr::Neg(e) => IndexExpr::neg(resolve_expr(e, interner, ctx)),
        RawExpr::Add(a, b) => IndexExpr::add(resolve_expr(a, interner, ctx), resolve_expr(b, interner, ctx)),
        RawExpr::Sub(a, b) => IndexExpr::sub(resolve_expr(a, interner, ctx), resolve_expr(b, interner, ctx)),
        RawExpr::Mul(a, b) => IndexExpr::mul(resolve_expr(a, interner, ctx), resolve_expr(b, interner, ctx)),
        RawExpr::Div(a, b) => IndexExpr::div(resolve_expr(a, interner, ctx), resolve_expr(b, interner, ctx)),
    }
}

/// Resolve a [`RawAssignment`] into an einsum-form `IndexStmt` (a bare
/// `Assignment`, no `Forall`/`Reduction` wrapping -- that lift is
/// `concretize`'s job) plus the `TensorVarTable` of every tensor it
/// mentions.
pub fn resolve(raw: &RawAssignment, ctx: &ResolveContext) -> Result<(IndexStmt, TensorVarTable), ReasonError> {
    let mut interner = Interner {
        vars: HashMap::new(),
        tensors: HashMap::new(),
    };
    let lhs = interner.access(&raw.lhs_tensor, &raw.lhs_indices, ctx);
    let rhs = resolve_expr(&raw.rhs, &mut interner, ctx);
    let op = match raw.op {
        RawOp::Assign => None,
        RawOp::Add => Some(CompoundOp::Add),
        RawOp::Mul => Some(CompoundOp::Mul),
    };
    let stmt = IndexStmt::assignment(lhs, rhs, op);

    let mut table = TensorVarTable::new();
    for (name, tensor) in interner.tensors {
        table.insert(name, tensor);
    }
    Ok((stmt, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::grammar::assignment_parser;
    use crate::frontend::lexer::Token;
    use chumsky::Parser;
    use logos::Logos;

    fn parse_raw(src: &str) -> RawAssignment {
        let tokens: Vec<Token> = Token::lexer(src).filter_map(|t| t.ok()).collect();
        assignment_parser().parse(&tokens).into_result().unwrap()
    }

    #[test]
    fn resolves_matrix_multiply_with_shared_tensor_identity() {
        let raw = parse_raw("A(i,j) = B(i,k)*C(k,j)");
        let ctx = ResolveContext::new();
        let (stmt, table) = resolve(&raw, &ctx).unwrap();
        let a = stmt.as_assignment().unwrap();
        assert_eq!(a.lhs.indices.len(), 2);
        assert_eq!(table.names().count(), 3);
        assert!(table.get("B").is_some());
    }

    #[test]
    fn reusing_a_tensor_name_keeps_the_same_identity() {
        let raw = parse_raw("A(i,j) = B(i,j)+B(i,j)");
        let ctx = ResolveContext::new();
        let (stmt, _) = resolve(&raw, &ctx).unwrap();
        let a = stmt.as_assignment().unwrap();
        match a.rhs.node() {
            crate::ir::expr::IndexExprNode::Add(x, y) => {
                let (xa, ya) = (x.node(), y.node());
                match (xa, ya) {
                    (
                        crate::ir::expr::IndexExprNode::Access(x),
                        crate::ir::expr::IndexExprNode::Access(y),
                    ) => assert_eq!(x.tensor, y.tensor),
                    _ => panic!("expected two accesses"),
                }
            }
            _ => panic!("expected an Add node"),
        }
    }

    #[test]
    fn honors_supplied_dims_and_formats() {
        let raw = parse_raw("y(i) = x(i)");
        let mut ctx = ResolveContext::new();
        ctx.dims.insert("i".into(), 100);
        ctx.formats.insert("x".into(), Format::sparse(1));
        let (stmt, table) = resolve(&raw, &ctx).unwrap();
        let x = table.get("x").unwrap();
        assert_eq!(x.format(), &Format::sparse(1));
        let _ = stmt;
    }
}
