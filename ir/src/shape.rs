//! Concrete shape utilities.
//!
//! Shapes here are fully concrete (no symbolic dimensions): every kernel is
//! compiled for one output shape and reused across call sites that differ
//! only in offset/extent/stride metadata, never in shape.

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{EmptyShapeSnafu, Result, ZeroDimensionSnafu};

/// Shape type - ordered list of dimension extents, outermost first.
///
/// Uses SmallVec with inline capacity of 4 to avoid heap allocation for
/// common tensor ranks (1D-4D).
pub type Shape = SmallVec<[usize; 4]>;

/// Total number of elements described by a shape.
pub fn element_count(shape: &Shape) -> usize {
    shape.iter().product()
}

/// Validate a shape specification: non-empty, all dimensions positive.
///
/// Zero-size dimensions are rejected here rather than deferred to runtime,
/// where they would turn into a division or modulo by zero inside a kernel.
///
/// # Errors
/// Returns an error if the shape is empty or any dimension is zero.
pub fn validate_shape(dims: &[usize]) -> Result<Shape> {
    ensure!(!dims.is_empty(), EmptyShapeSnafu);
    ensure!(dims.iter().all(|&d| d > 0), ZeroDimensionSnafu { shape: dims.to_vec() });
    Ok(Shape::from_slice(dims))
}

/// Row-major strides for a shape, outermost first.
///
/// `strides_for(&[3, 4, 5])` yields `[20, 5, 1]`: advancing one step along
/// dimension `d` moves `strides[d]` elements in the flat buffer.
pub fn strides_for(shape: &Shape) -> Shape {
    let mut strides = Shape::from_elem(1, shape.len());
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}
