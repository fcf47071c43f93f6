//! Scalar datatypes and per-tensor format declarations (spec.md §3, §4.C1).

use crate::error::ReasonError;
use std::fmt;

/// Scalar datatype tag. Carries byte width; no total order is defined or
/// needed (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Datatype {
    /// Byte width of the scalar representation.
    pub fn byte_width(self) -> usize {
        use Datatype::*;
        match self {
            Bool | Int8 | UInt8 => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 => 4,
            Int64 | UInt64 | Float64 | Complex64 => 8,
            Complex128 => 16,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Datatype::Float32 | Datatype::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Datatype::Complex64 | Datatype::Complex128)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Datatype::Bool => "bool",
            Datatype::Int8 => "i8",
            Datatype::Int16 => "i16",
            Datatype::Int32 => "i32",
            Datatype::Int64 => "i64",
            Datatype::UInt8 => "u8",
            Datatype::UInt16 => "u16",
            Datatype::UInt32 => "u32",
            Datatype::UInt64 => "u64",
            Datatype::Float32 => "f32",
            Datatype::Float64 => "f64",
            Datatype::Complex64 => "complex64",
            Datatype::Complex128 => "complex128",
        };
        write!(f, "{s}")
    }
}

/// A literal payload, one Rust-native representation per [`Datatype`]
/// variant. This type's derived `PartialEq` is plain Rust/IEEE-754
/// equality (so `-0.0 == 0.0` and `NaN != NaN`), used for everyday value
/// comparisons like [`LiteralValue::is_zero`]. Structural *IR* equality
/// (spec.md §4.C2, §9: "compare raw byte payloads -- avoids NaN
/// subtleties") is a different, stricter relation and lives in
/// [`crate::ir::equals::literal_bytes_equal`], which compares bit
/// patterns so two NaNs with identical bits compare equal and `-0.0`
/// compares unequal to `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Complex64(f32, f32),
    Complex128(f64, f64),
}

impl LiteralValue {
    pub fn datatype(self) -> Datatype {
        match self {
            LiteralValue::Bool(_) => Datatype::Bool,
            LiteralValue::Int8(_) => Datatype::Int8,
            LiteralValue::Int16(_) => Datatype::Int16,
            LiteralValue::Int32(_) => Datatype::Int32,
            LiteralValue::Int64(_) => Datatype::Int64,
            LiteralValue::UInt8(_) => Datatype::UInt8,
            LiteralValue::UInt16(_) => Datatype::UInt16,
            LiteralValue::UInt32(_) => Datatype::UInt32,
            LiteralValue::UInt64(_) => Datatype::UInt64,
            LiteralValue::Float32(_) => Datatype::Float32,
            LiteralValue::Float64(_) => Datatype::Float64,
            LiteralValue::Complex64(..) => Datatype::Complex64,
            LiteralValue::Complex128(..) => Datatype::Complex128,
        }
    }

    /// The additive identity for this literal's datatype.
    pub fn zero(ty: Datatype) -> LiteralValue {
        match ty {
            Datatype::Bool => LiteralValue::Bool(false),
            Datatype::Int8 => LiteralValue::Int8(0),
            Datatype::Int16 => LiteralValue::Int16(0),
            Datatype::Int32 => LiteralValue::Int32(0),
            Datatype::Int64 => LiteralValue::Int64(0),
            Datatype::UInt8 => LiteralValue::UInt8(0),
            Datatype::UInt16 => LiteralValue::UInt16(0),
            Datatype::UInt32 => LiteralValue::UInt32(0),
            Datatype::UInt64 => LiteralValue::UInt64(0),
            Datatype::Float32 => LiteralValue::Float32(0.0),
            Datatype::Float64 => LiteralValue::Float64(0.0),
            Datatype::Complex64 => LiteralValue::Complex64(0.0, 0.0),
            Datatype::Complex128 => LiteralValue::Complex128(0.0, 0.0),
        }
    }

    /// Whether this literal is the additive identity for its type.
    /// `-0.0` counts as zero here (see DESIGN.md open-question decision 3);
    /// this is distinct from [`LiteralValue`]'s `PartialEq`, which compares
    /// exact payloads and so distinguishes `0.0` from `-0.0`.
    pub fn is_zero(self) -> bool {
        match self {
            LiteralValue::Bool(b) => !b,
            LiteralValue::Int8(v) => v == 0,
            LiteralValue::Int16(v) => v == 0,
            LiteralValue::Int32(v) => v == 0,
            LiteralValue::Int64(v) => v == 0,
            LiteralValue::UInt8(v) => v == 0,
            LiteralValue::UInt16(v) => v == 0,
            LiteralValue::UInt32(v) => v == 0,
            LiteralValue::UInt64(v) => v == 0,
            LiteralValue::Float32(v) => v == 0.0,
            LiteralValue::Float64(v) => v == 0.0,
            LiteralValue::Complex64(re, im) => re == 0.0 && im == 0.0,
            LiteralValue::Complex128(re, im) => re == 0.0 && im == 0.0,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(v) => write!(f, "{v}"),
            LiteralValue::Int8(v) => write!(f, "{v}"),
            LiteralValue::Int16(v) => write!(f, "{v}"),
            LiteralValue::Int32(v) => write!(f, "{v}"),
            LiteralValue::Int64(v) => write!(f, "{v}"),
            LiteralValue::UInt8(v) => write!(f, "{v}"),
            LiteralValue::UInt16(v) => write!(f, "{v}"),
            LiteralValue::UInt32(v) => write!(f, "{v}"),
            LiteralValue::UInt64(v) => write!(f, "{v}"),
            LiteralValue::Float32(v) => write!(f, "{v}"),
            LiteralValue::Float64(v) => write!(f, "{v}"),
            LiteralValue::Complex64(re, im) => write!(f, "({re}+{im}i)"),
            LiteralValue::Complex128(re, im) => write!(f, "({re}+{im}i)"),
        }
    }
}

/// Per-mode storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeFormatKind {
    Dense,
    Sparse,
}

/// One mode of a [`Format`]: its storage kind and its position in the
/// tensor's shape (spec.md §3: "ordered sequence of mode formats").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeFormat {
    pub kind: ModeFormatKind,
    pub ordering: usize,
}

/// A tensor's format: one [`ModeFormat`] per mode, in storage order. The
/// `ordering` fields across all modes must form a permutation of
/// `0..order` (spec.md §3 invariant 2 analog for Format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Format {
    modes: Vec<ModeFormat>,
}

impl Format {
    /// Build a format from `(kind, ordering)` pairs, one per mode.
    /// Fails unless `ordering` values form a permutation of `0..len`.
    pub fn new(modes: Vec<ModeFormat>) -> Result<Format, ReasonError> {
        let n = modes.len();
        let mut seen = vec![false; n];
        for m in &modes {
            if m.ordering >= n || seen[m.ordering] {
                return Err(ReasonError::new(format!(
                    "format orderings must be a permutation of 0..{n}, got ordering {}",
                    m.ordering
                )));
            }
            seen[m.ordering] = true;
        }
        Ok(Format { modes })
    }

    /// Convenience constructor: all-dense format in natural order.
    pub fn dense(order: usize) -> Format {
        let modes = (0..order)
            .map(|i| ModeFormat {
                kind: ModeFormatKind::Dense,
                ordering: i,
            })
            .collect();
        Format { modes }
    }

    /// Convenience constructor: all-sparse format in natural (row-major-ish)
    /// order, commonly used for CSF-style tensors.
    pub fn sparse(order: usize) -> Format {
        let modes = (0..order)
            .map(|i| ModeFormat {
                kind: ModeFormatKind::Sparse,
                ordering: i,
            })
            .collect();
        Format { modes }
    }

    pub fn order(&self) -> usize {
        self.modes.len()
    }

    pub fn modes(&self) -> &[ModeFormat] {
        &self.modes
    }

    pub fn mode(&self, i: usize) -> ModeFormat {
        self.modes[i]
    }

    pub fn is_dense(&self, i: usize) -> bool {
        self.modes[i].kind == ModeFormatKind::Dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_rejects_non_permutation() {
        let modes = vec![
            ModeFormat {
                kind: ModeFormatKind::Dense,
                ordering: 0,
            },
            ModeFormat {
                kind: ModeFormatKind::Sparse,
                ordering: 0,
            },
        ];
        assert!(Format::new(modes).is_err());
    }

    #[test]
    fn dense_format_equality() {
        let a = Format::dense(2);
        let b = Format::dense(2);
        assert_eq!(a, b);
    }

    #[test]
    fn literal_zero_treats_negative_zero_as_zero() {
        assert!(LiteralValue::Float64(-0.0).is_zero());
        assert!(LiteralValue::Float64(-0.0) == LiteralValue::Float64(0.0));
    }
}
