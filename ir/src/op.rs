//! Operation descriptors.
//!
//! A [`KernelSpec`] is the compile-time description of one kernel: an
//! [`Operation`] kind, the output shape, and the alignment declarations for
//! each input. It is constructed once by the (external) tensor-graph
//! compiler, lowered into index expressions, emitted as a kernel, then
//! invoked any number of times with fresh call-time metadata.

use crate::scalar::ScalarExpr;
use crate::shape::{Shape, element_count};
use crate::types::ReduceOp;
use crate::view::ArgSpec;

/// Positional guard for piecewise kernels.
///
/// Each guard is an equality or range test over the linear work index,
/// compiled from the same div/mod vocabulary as address expressions. Guards
/// express structured initializers: identity matrices, one-hot masks, and
/// fixed overrides at boundary indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Output position lies on the diagonal of a `dim` x `dim` matrix:
    /// `i / dim == i % dim`.
    Diagonal { dim: usize },
    /// Position is within the first `count` elements of each span of
    /// `extent`: `i % extent < count`.
    Leading { extent: usize, count: usize },
    /// Exact position match: `i == index`.
    Position { index: usize },
}

impl Guard {
    /// Test the guard against a linear work index.
    #[inline]
    pub fn matches(&self, i: usize) -> bool {
        match *self {
            Guard::Diagonal { dim } => i / dim == i % dim,
            Guard::Leading { extent, count } => i % extent < count,
            Guard::Position { index } => i == index,
        }
    }
}

/// One arm of a piecewise kernel: a guard and the value it selects.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectArm {
    pub guard: Guard,
    pub value: ScalarExpr,
}

/// Normalization variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeKind {
    /// Subtract the per-group mean.
    MeanCenter,
    /// Subtract the per-group mean and divide by the per-group standard
    /// deviation, stabilized by `epsilon` under the square root.
    Standardize { epsilon: f64 },
}

/// Kernel operation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Pure elementwise function of zero or more inputs; one store per item.
    Map { expr: ScalarExpr },
    /// Fixed-window reduction: `window` consecutive input elements collapse
    /// into one output element. The window is baked into the kernel so the
    /// inner loop bound is a compile-time constant.
    Reduce { op: ReduceOp, window: usize },
    /// Piecewise constant/conditional output keyed by position: the first
    /// matching arm wins, otherwise `default` applies.
    Select { arms: Vec<SelectArm>, default: ScalarExpr },
    /// Two-pass group normalization, emitted as a stats/apply kernel pair
    /// sharing one group constant.
    Normalize { group: usize, kind: NormalizeKind },
    /// Pure index-permutation copy of a single input.
    Gather,
}

impl Operation {
    /// Short name used in log and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Map { .. } => "map",
            Operation::Reduce { .. } => "reduce",
            Operation::Select { .. } => "select",
            Operation::Normalize { .. } => "normalize",
            Operation::Gather => "gather",
        }
    }
}

/// Complete compile-time description of one kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelSpec {
    pub operation: Operation,
    /// Logical shape of the output tensor.
    pub output_shape: Shape,
    /// Input arguments in declaration order (the output is implicit and
    /// always occupies buffer slot 0 of the invocation ABI).
    pub inputs: Vec<ArgSpec>,
    /// Output stores go through the view's leading stride instead of densely,
    /// for writes into a padded or interleaved destination.
    pub strided_output: bool,
}

impl KernelSpec {
    pub fn new(operation: Operation, output_shape: Shape, inputs: Vec<ArgSpec>) -> Self {
        Self { operation, output_shape, inputs, strided_output: false }
    }

    /// Mark the output as stride-scaled.
    pub fn strided(mut self) -> Self {
        self.strided_output = true;
        self
    }

    /// Number of elements in the output tensor.
    pub fn output_count(&self) -> usize {
        element_count(&self.output_shape)
    }
}
