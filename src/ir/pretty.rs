//! `Display` rendering of index notation, used by the `-print-compute` CLI
//! flag (spec.md §6) and in test failure messages.

use crate::ir::expr::{Access, IndexExpr, IndexExprNode};
use crate::ir::stmt::{IndexStmt, IndexStmtNode, ParallelUnit, RaceStrategy};
use std::fmt;

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            IndexExprNode::Access(a) => {
                write!(f, "{}(", a.tensor)?;
                for (i, v) in a.indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            IndexExprNode::Literal(v) => write!(f, "{}", v),
            IndexExprNode::Neg(e) => write!(f, "-{}", Paren(e)),
            IndexExprNode::Sqrt(e) => write!(f, "sqrt({})", e),
            IndexExprNode::Cast(ty, e) => write!(f, "({}){}", ty, Paren(e)),
            IndexExprNode::Add(a, b) => write!(f, "{} + {}", Paren(a), Paren(b)),
            IndexExprNode::Sub(a, b) => write!(f, "{} - {}", Paren(a), Paren(b)),
            IndexExprNode::Mul(a, b) => write!(f, "{} * {}", Paren(a), Paren(b)),
            IndexExprNode::Div(a, b) => write!(f, "{} / {}", Paren(a), Paren(b)),
            IndexExprNode::CallIntrinsic(id, args) => {
                write!(f, "{}(", id.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            IndexExprNode::Reduction(op, var, body) => {
                write!(f, "{}:{}({})", op.symbol().trim_end_matches('='), var, body)
            }
        }
    }
}

/// Wraps a subexpression in parentheses; used so operator-precedence never
/// has to be tracked -- every binary/unary operand is always parenthesized.
struct Paren<'a>(&'a IndexExpr);

impl fmt::Display for Paren<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.node() {
            IndexExprNode::Access(_) | IndexExprNode::Literal(_) => write!(f, "{}", self.0),
            _ => write!(f, "({})", self.0),
        }
    }
}

fn fmt_access(a: &Access, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}(", a.tensor)?;
    for (i, v) in a.indices.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, ")")
}

fn fmt_parallel(unit: ParallelUnit, race: RaceStrategy, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if unit == ParallelUnit::NotParallel {
        return Ok(());
    }
    write!(f, " [{:?}", unit)?;
    if race != RaceStrategy::IgnoreRaces {
        write!(f, ", {:?}", race)?;
    }
    write!(f, "]")
}

impl fmt::Display for IndexStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            IndexStmtNode::Assignment(a) => {
                fmt_access(&a.lhs, f)?;
                match a.op {
                    Some(op) => write!(f, " {} ", op.symbol()),
                    None => write!(f, " = "),
                }?;
                write!(f, "{}", a.rhs)
            }
            IndexStmtNode::Forall(var, body, unit, race) => {
                write!(f, "forall({}", var)?;
                fmt_parallel(*unit, *race, f)?;
                write!(f, ")\n  {}", Indented(body))
            }
            IndexStmtNode::Where(consumer, producer) => {
                write!(f, "where(\n  {},\n  {}\n)", Indented(consumer), Indented(producer))
            }
            IndexStmtNode::Sequence(defn, mutn) => write!(f, "{};\n{}", defn, mutn),
            IndexStmtNode::Multi(a, b) => write!(f, "multi(\n  {},\n  {}\n)", Indented(a), Indented(b)),
            IndexStmtNode::Yield(vars, e) => {
                write!(f, "yield(")?;
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ") {}", e)
            }
            IndexStmtNode::SuchThat(body, rels) => {
                write!(f, "{}", body)?;
                if !rels.is_empty() {
                    write!(f, "\nsuch that ")?;
                    for (i, r) in rels.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{:?}", r)?;
                    }
                }
                Ok(())
            }
        }
    }
}

struct Indented<'a>(&'a IndexStmt);

impl fmt::Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.to_string();
        for (i, line) in rendered.lines().enumerate() {
            if i > 0 {
                write!(f, "\n  {}", line)?;
            } else {
                write!(f, "{}", line)?;
            }
        }
        Ok(())
    }
}
