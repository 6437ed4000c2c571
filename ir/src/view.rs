//! Buffer views and shape-alignment declarations.
//!
//! A [`ShapeView`] is the call-time description of one argument's placement
//! inside a flat buffer: base offset, iterated extent, and leading stride.
//! The same compiled kernel is invoked many times with different views; the
//! compiled index expressions read the view fields at evaluation time, so no
//! recompilation is needed when only the layout changes.
//!
//! An [`ArgSpec`] is the compile-time counterpart: the argument's own shape
//! plus a declaration of how its dimensions align to the output's. The
//! index-expression compiler consumes `ArgSpec`s; the dispatcher consumes
//! `ShapeView`s.

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{Result, ZeroViewExtentSnafu};
use crate::shape::{Shape, element_count};

/// Call-time layout of one kernel argument within its flat buffer.
///
/// Mirrors the per-argument `offset`/`size`/`dim0` metadata arrays of the
/// invocation ABI. The buffer handle itself travels separately; a view never
/// owns storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeView {
    /// Base displacement into the buffer where this argument begins.
    pub offset: usize,
    /// Size of the iterated dimension; broadcast wrap-around divisor.
    pub extent: usize,
    /// Elements to advance one step along the outermost iterated dimension.
    /// Differs from the natural row length when writing into a padded or
    /// strided destination.
    pub leading_stride: usize,
}

impl ShapeView {
    /// Create a view, rejecting a zero extent (it is used as a divisor).
    ///
    /// Whether every address derived from this view stays inside the
    /// argument's allocation is a caller-established precondition; it is
    /// asserted in debug builds only.
    pub fn new(offset: usize, extent: usize, leading_stride: usize) -> Result<Self> {
        ensure!(extent > 0, ZeroViewExtentSnafu { offset });
        Ok(Self { offset, extent, leading_stride })
    }

    /// Dense view over `extent` elements starting at the buffer origin.
    pub fn contiguous(extent: usize) -> Self {
        Self { offset: 0, extent, leading_stride: 1 }
    }

    /// Same layout shifted to a new base offset.
    pub fn at_offset(self, offset: usize) -> Self {
        Self { offset, ..self }
    }
}

/// How an input argument's dimensions align to the output's traversal.
///
/// This is declared metadata, produced by the (external) tensor-graph
/// compiler. The index-expression compiler trusts the declaration and
/// validates it against the shapes; it never infers alignment, in particular
/// never from extent equality alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    /// Element-for-element identical traversal to the output.
    Same,
    /// Smaller than the output; values repeat via modulo wrap-around.
    /// The argument's element count must divide the output's evenly.
    Broadcast,
    /// Same dimensions as the output but traversed in a different order.
    /// `order[d]` names the input axis that corresponds to output axis `d`.
    Permuted { order: SmallVec<[usize; 4]> },
    /// Collapsed by a fixed-size contiguous reduction window: `window`
    /// consecutive input elements produce one output element.
    Reduced { window: usize },
}

/// One argument's compile-time description: its shape and its alignment to
/// the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub shape: Shape,
    pub align: Alignment,
}

impl ArgSpec {
    pub fn new(shape: Shape, align: Alignment) -> Self {
        Self { shape, align }
    }

    /// Shorthand for an argument traversed exactly like the output.
    pub fn same(shape: Shape) -> Self {
        Self { shape, align: Alignment::Same }
    }

    /// Shorthand for a modulo-broadcast argument.
    pub fn broadcast(shape: Shape) -> Self {
        Self { shape, align: Alignment::Broadcast }
    }

    /// Total number of elements in this argument's logical tensor.
    pub fn element_count(&self) -> usize {
        element_count(&self.shape)
    }
}
