//! Schedule algebra (spec.md §4.C4): the index-variable relation graph,
//! bound derivation, variable recovery, and the transformation functions
//! that build `SuchThat`-annotated concrete statements.

pub mod bounds;
pub mod graph;
pub mod recovery;
pub mod rel;
pub mod transform;

pub use graph::RelGraph;
pub use rel::{FuseRel, IndexVarRel, PosRel, SplitRel};
