//! External collaborator boundaries (spec.md §6). The middle end never
//! reads/writes tensor storage or emits imperative code itself -- it calls
//! out through these traits. Each has an in-memory test double used by the
//! crate's own tests and, for `CodegenCollaborator`, by `-print-assembly`.

use crate::error::ReasonError;
use crate::ir::expr::Access;
use crate::ir::stmt::IndexStmt;
use crate::ir::tensorvar::TensorVar;
use crate::lower::LoopIr;
use crate::schedule::bounds::Bound;
use std::collections::HashMap;

/// A mode iterator's capability vector (spec.md §4.C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CoordinateIterate,
    PositionIterate,
    Locate,
    Insert,
    Append,
    Size,
    Width,
}

/// `textual source -> (einsum-form IndexStmt, inferred TensorVar table)`.
pub trait ParserCollaborator {
    fn parse(&self, src: &str) -> Result<(IndexStmt, TensorVarTable), ReasonError>;
}

/// `Access -> {crd-array, pos-array, per-mode capabilities, segment bounds}`,
/// consulted by bound derivation (§4.C4.3) and the iterator model (§4.C5).
pub trait TensorStorageCollaborator {
    fn crd_array(&self, access: &Access) -> Result<Vec<usize>, ReasonError>;
    fn pos_array(&self, access: &Access) -> Result<Vec<usize>, ReasonError>;
    fn capabilities(&self, access: &Access) -> Result<Vec<Capability>, ReasonError>;
    fn segment_bounds(&self, access: &Access) -> Result<Bound, ReasonError>;
}

/// Consumes the concrete statement, its rel-graph, and the per-variable
/// merge lattices, and emits imperative code. The crate ships no real
/// backend, only [`PrintingCodegen`].
pub trait CodegenCollaborator {
    fn emit(&self, program: &LoopIr) -> Result<(), ReasonError>;
}

/// Maps a parsed tensor name to its `TensorVar`, with dimensions inferred
/// from supplied sizes, loaded tensors' shapes, or a default fill
/// (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct TensorVarTable {
    vars: HashMap<String, TensorVar>,
}

impl TensorVarTable {
    pub fn new() -> TensorVarTable {
        TensorVarTable::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, var: TensorVar) {
        self.vars.insert(name.into(), var);
    }

    pub fn get(&self, name: &str) -> Option<&TensorVar> {
        self.vars.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

/// In-memory [`TensorStorageCollaborator`] fake backed by `Vec<usize>`,
/// used by tests and by the CLI when a flag only needs bound derivation,
/// not an actual kernel run.
#[derive(Debug, Clone, Default)]
pub struct MapTensorStorage {
    crd: HashMap<String, Vec<usize>>,
    pos: HashMap<String, Vec<usize>>,
    caps: HashMap<String, Vec<Capability>>,
    segments: HashMap<String, Bound>,
}

impl MapTensorStorage {
    pub fn new() -> MapTensorStorage {
        MapTensorStorage::default()
    }

    fn key(access: &Access) -> String {
        format!(
            "{}[{}]",
            access.tensor,
            access
                .indices
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    pub fn with_dense(mut self, access: &Access, dim: usize) -> Self {
        self.caps.insert(
            Self::key(access),
            vec![Capability::CoordinateIterate, Capability::Locate, Capability::Insert, Capability::Width],
        );
        self.segments.insert(Self::key(access), Bound::new(0, dim));
        self
    }

    pub fn with_sparse(mut self, access: &Access, crd: Vec<usize>, pos: Vec<usize>) -> Self {
        let seg = Bound::new(*pos.first().unwrap_or(&0), *pos.last().unwrap_or(&0));
        self.caps.insert(
            Self::key(access),
            vec![Capability::PositionIterate, Capability::Append, Capability::Size],
        );
        self.segments.insert(Self::key(access), seg);
        self.crd.insert(Self::key(access), crd);
        self.pos.insert(Self::key(access), pos);
        self
    }
}

impl TensorStorageCollaborator for MapTensorStorage {
    fn crd_array(&self, access: &Access) -> Result<Vec<usize>, ReasonError> {
        self.crd
            .get(&Self::key(access))
            .cloned()
            .ok_or_else(|| ReasonError::from(format!("no crd-array registered for {}", access.tensor)))
    }

    fn pos_array(&self, access: &Access) -> Result<Vec<usize>, ReasonError> {
        self.pos
            .get(&Self::key(access))
            .cloned()
            .ok_or_else(|| ReasonError::from(format!("no pos-array registered for {}", access.tensor)))
    }

    fn capabilities(&self, access: &Access) -> Result<Vec<Capability>, ReasonError> {
        self.caps
            .get(&Self::key(access))
            .cloned()
            .ok_or_else(|| ReasonError::from(format!("no capabilities registered for {}", access.tensor)))
    }

    fn segment_bounds(&self, access: &Access) -> Result<Bound, ReasonError> {
        self.segments
            .get(&Self::key(access))
            .copied()
            .ok_or_else(|| ReasonError::from(format!("no segment bounds registered for {}", access.tensor)))
    }
}

/// [`CodegenCollaborator`] test double that renders the `LoopIr` as text;
/// backs the `-print-assembly` CLI flag.
#[derive(Debug, Default)]
pub struct PrintingCodegen {
    pub rendered: std::cell::RefCell<String>,
}

impl CodegenCollaborator for PrintingCodegen {
    fn emit(&self, program: &LoopIr) -> Result<(), ReasonError> {
        *self.rendered.borrow_mut() = program.to_string();
        Ok(())
    }
}
