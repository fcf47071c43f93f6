//! Intrinsic call identifiers (spec.md §3) and the zero-preservation table
//! the notation normalizer's zero-propagation rewriter (spec.md §4.C3)
//! consults to decide whether a zero argument at a given position forces
//! the whole call to zero.

/// Identifier for a `CallIntrinsic` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicId {
    Mod,
    Abs,
    Pow,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Sqrt,
    Cbrt,
    Square,
    Cube,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    Max,
    Min,
    Heaviside,
    Not,
}

impl IntrinsicId {
    /// Argument positions (0-indexed) at which a zero argument is known to
    /// force this intrinsic's result to zero, i.e. `f(..., 0, ...) == 0`
    /// regardless of the other arguments. Used by zero propagation
    /// (spec.md §4.C3) to treat a `CallIntrinsic` as a conjunctive node at
    /// these positions. Positions not listed are *not* assumed
    /// zero-preserving (conservative default).
    pub fn zero_preserving_positions(self) -> &'static [usize] {
        use IntrinsicId::*;
        match self {
            Abs | Sqrt | Cbrt | Square | Cube | Sin | Tan | Sinh | Tanh | Asinh | Atanh | Asin => {
                &[0]
            }
            Mod | Pow | Atan2 | Heaviside => &[0],
            // Comparisons, transcendentals without f(0)=0, max/min (sign
            // dependent on the other operand), and boolean negation are
            // not zero-preserving at any position.
            Cos | Cosh | Acos | Acosh | Exp | Log | Log10 | Atan | Gt | Lt | Gte | Lte | Eq
            | Neq | Max | Min | Not => &[],
        }
    }

    pub fn name(self) -> &'static str {
        use IntrinsicId::*;
        match self {
            Mod => "mod",
            Abs => "abs",
            Pow => "pow",
            Exp => "exp",
            Log => "log",
            Log10 => "log10",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Asin => "asin",
            Acos => "acos",
            Atan => "atan",
            Atan2 => "atan2",
            Sinh => "sinh",
            Cosh => "cosh",
            Tanh => "tanh",
            Asinh => "asinh",
            Acosh => "acosh",
            Atanh => "atanh",
            Sqrt => "sqrt",
            Cbrt => "cbrt",
            Square => "square",
            Cube => "cube",
            Gt => "gt",
            Lt => "lt",
            Gte => "gte",
            Lte => "lte",
            Eq => "eq",
            Neq => "neq",
            Max => "max",
            Min => "min",
            Heaviside => "heaviside",
            Not => "not",
        }
    }
}
