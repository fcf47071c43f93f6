//! [`TensorVar`]: identity, type, format, and an attached (mostly inert)
//! per-tensor schedule record.

use crate::ids::Id;
use crate::ir::indexvar::IndexVar;
use crate::types::{Datatype, Format};
use std::fmt;
use std::rc::Rc;

/// A tensor's scalar type and shape (ordered list of dimension sizes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorType {
    pub datatype: Datatype,
    pub shape: Vec<usize>,
}

impl TensorType {
    pub fn order(&self) -> usize {
        self.shape.len()
    }
}

/// A per-tensor schedule record. In the original system this mostly hosts
/// workspace/precompute hints whose accessors are no-ops (spec.md §9:
/// "`workspace` methods on IndexExpr in the source are no-ops --
/// implementations may omit this method entirely"); kept minimal here as a
/// list of index variables this tensor has been asked to precompute over,
/// which downstream scheduling code is free to ignore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TensorSchedule {
    precompute: Vec<IndexVar>,
}

impl TensorSchedule {
    pub fn precompute(&self) -> &[IndexVar] {
        &self.precompute
    }

    pub fn with_precompute(mut self, vars: Vec<IndexVar>) -> Self {
        self.precompute = vars;
        self
    }
}

struct TensorVarData {
    id: Id,
    name: String,
    ty: TensorType,
    format: Format,
    schedule: TensorSchedule,
}

/// A tensor variable. Identity -- not value -- defines equality: two
/// `TensorVar`s built with identical name/type/format are still distinct
/// (spec.md §3).
#[derive(Clone)]
pub struct TensorVar(Rc<TensorVarData>);

impl TensorVar {
    pub fn new(name: impl Into<String>, ty: TensorType, format: Format) -> TensorVar {
        TensorVar(Rc::new(TensorVarData {
            id: Id::fresh(),
            name: name.into(),
            ty,
            format,
            schedule: TensorSchedule::default(),
        }))
    }

    pub fn id(&self) -> Id {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &TensorType {
        &self.0.ty
    }

    pub fn format(&self) -> &Format {
        &self.0.format
    }

    pub fn order(&self) -> usize {
        self.0.ty.order()
    }

    pub fn schedule(&self) -> &TensorSchedule {
        &self.0.schedule
    }
}

impl PartialEq for TensorVar {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for TensorVar {}

impl std::hash::Hash for TensorVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for TensorVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id.raw())
    }
}

impl fmt::Display for TensorVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}
