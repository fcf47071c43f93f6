//! Iterator model (spec.md §4.C5): per-mode iterator capability vectors and
//! the tree of mode iterators mirroring a tensor's format, rooted at a
//! virtual iterator over `[0,1)`.

use crate::interfaces::Capability;
use crate::ir::expr::Access;
use crate::schedule::bounds::Bound;
use crate::types::ModeFormatKind;
use std::collections::HashMap;

/// Capability vector contributed by a dense mode (spec.md §4.C5: "Dense ⇒
/// {CoordinateIterate, Locate, Insert, Width}").
pub const DENSE_CAPABILITIES: &[Capability] = &[
    Capability::CoordinateIterate,
    Capability::Locate,
    Capability::Insert,
    Capability::Width,
];

/// Capability vector contributed by a sparse mode (spec.md §4.C5: "Sparse
/// ⇒ {PositionIterate, Append, Size}").
pub const SPARSE_CAPABILITIES: &[Capability] = &[
    Capability::PositionIterate,
    Capability::Append,
    Capability::Size,
];

pub fn capabilities_for(kind: ModeFormatKind) -> &'static [Capability] {
    match kind {
        ModeFormatKind::Dense => DENSE_CAPABILITIES,
        ModeFormatKind::Sparse => SPARSE_CAPABILITIES,
    }
}

/// One node of an iterator tree: a single mode of a single access, keyed by
/// `(Access, mode index)` (spec.md §4.C5). `mode` is `None` for the virtual
/// root iterator over `[0,1)`.
#[derive(Debug, Clone)]
pub struct ModeIterator {
    pub access: Access,
    pub mode: Option<usize>,
    pub kind: Option<ModeFormatKind>,
    pub capabilities: Vec<Capability>,
    pub bound: Bound,
}

impl ModeIterator {
    /// The virtual root iterator every access's mode-0 iterator descends
    /// from, ranging over `[0,1)` (spec.md §4.C5: "a root (virtual)
    /// iterator has child = outermost level").
    pub fn root(access: Access) -> ModeIterator {
        ModeIterator {
            access,
            mode: None,
            kind: None,
            capabilities: Vec::new(),
            bound: Bound::new(0, 1),
        }
    }

    pub fn leaf(access: Access, mode: usize, kind: ModeFormatKind, bound: Bound) -> ModeIterator {
        ModeIterator {
            access,
            mode: Some(mode),
            kind: Some(kind),
            capabilities: capabilities_for(kind).to_vec(),
            bound,
        }
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn is_root(&self) -> bool {
        self.mode.is_none()
    }
}

/// Key identifying one node in an [`IteratorTree`]: the access it belongs
/// to plus which mode (`None` = virtual root).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IteratorKey {
    access_key: String,
    mode: Option<usize>,
}

fn access_key(access: &Access) -> String {
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

/// The tree of mode iterators for a single access, built from its format
/// and (for sparse modes) the storage collaborator's segment bounds. The
/// root is the virtual `[0,1)` iterator; children are chained one per
/// mode, in the format's storage order (spec.md §4.C5).
#[derive(Debug, Clone, Default)]
pub struct IteratorTree {
    nodes: HashMap<IteratorKey, ModeIterator>,
}

impl IteratorTree {
    pub fn new() -> IteratorTree {
        IteratorTree::default()
    }

    /// Build the chain of mode iterators for `access`, using `dim_size` per
    /// mode (dense) or `segment` per mode (sparse, from the storage
    /// collaborator). `dense_dims`/`sparse_segments` are keyed by mode
    /// index; a mode missing from both maps is treated as dense with a
    /// bound of `[0,1)` (degenerate, callers normally supply every mode).
    pub fn build(
        &mut self,
        access: &Access,
        dense_dims: &HashMap<usize, usize>,
        sparse_segments: &HashMap<usize, Bound>,
    ) {
        let root_key = IteratorKey {
            access_key: access_key(access),
            mode: None,
        };
        self.nodes
            .entry(root_key)
            .or_insert_with(|| ModeIterator::root(access.clone()));

        let format = access.tensor.format();
        for mode in 0..format.order() {
            let kind = format.mode(mode).kind;
            let bound = match kind {
                ModeFormatKind::Dense => {
                    Bound::new(0, dense_dims.get(&mode).copied().unwrap_or(1))
                }
                ModeFormatKind::Sparse => sparse_segments
                    .get(&mode)
                    .copied()
                    .unwrap_or(Bound::new(0, 0)),
            };
            let key = IteratorKey {
                access_key: access_key(access),
                mode: Some(mode),
            };
            self.nodes
                .entry(key)
                .or_insert_with(|| ModeIterator::leaf(access.clone(), mode, kind, bound));
        }
    }

    pub fn root(&self, access: &Access) -> Option<&ModeIterator> {
        self.nodes.get(&IteratorKey {
            access_key: access_key(access),
            mode: None,
        })
    }

    pub fn mode(&self, access: &Access, mode: usize) -> Option<&ModeIterator> {
        self.nodes.get(&IteratorKey {
            access_key: access_key(access),
            mode: Some(mode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::indexvar::IndexVar;
    use crate::ir::tensorvar::{TensorType, TensorVar};
    use crate::types::{Datatype, Format};

    #[test]
    fn dense_mode_has_coordinate_iterate_and_locate() {
        let i = IndexVar::new("i");
        let tensor = TensorVar::new(
            "a",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![10],
            },
            Format::dense(1),
        );
        let access = Access::new(tensor, vec![i]);
        let mut tree = IteratorTree::new();
        let mut dims = HashMap::new();
        dims.insert(0, 10);
        tree.build(&access, &dims, &HashMap::new());
        let root = tree.root(&access).unwrap();
        assert!(root.is_root());
        assert_eq!(root.bound, Bound::new(0, 1));
        let m0 = tree.mode(&access, 0).unwrap();
        assert!(m0.has(Capability::CoordinateIterate));
        assert!(m0.has(Capability::Locate));
        assert_eq!(m0.bound, Bound::new(0, 10));
    }

    #[test]
    fn sparse_mode_has_position_iterate_and_segment_bound() {
        let i = IndexVar::new("i");
        let tensor = TensorVar::new(
            "a",
            TensorType {
                datatype: Datatype::Float64,
                shape: vec![10],
            },
            Format::sparse(1),
        );
        let access = Access::new(tensor, vec![i]);
        let mut tree = IteratorTree::new();
        let mut segs = HashMap::new();
        segs.insert(0, Bound::new(0, 3));
        tree.build(&access, &HashMap::new(), &segs);
        let m0 = tree.mode(&access, 0).unwrap();
        assert!(m0.has(Capability::PositionIterate));
        assert!(!m0.has(Capability::Locate));
        assert_eq!(m0.bound, Bound::new(0, 3));
    }
}
