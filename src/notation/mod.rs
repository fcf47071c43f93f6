//! Notation-form classification and normalization (spec.md §4.C3): the
//! einsum/reduction/concrete form predicates, the `concretize` lift
//! between them, dimension type-checking, and zero propagation.

pub mod classify;
pub mod normalize;
pub mod typecheck;
pub mod zero;

pub use classify::{is_concrete, is_einsum, is_reduction};
pub use normalize::concretize;
pub use typecheck::{check_dimensions, infer_dims};
pub use zero::{zero, ZeroedAccesses};
