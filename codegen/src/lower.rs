//! Index-expression lowering.
//!
//! [`compile`] turns a [`KernelSpec`] into one closed-form address expression
//! per kernel argument (output first), plus the size of the work space. The
//! lowering is pure arithmetic over declared shapes; it performs every
//! structural check the dispatcher will later rely on, so an expression that
//! compiles can be evaluated without bounds concerns for any call-time view
//! that matches the declared shapes.
//!
//! The compiler trusts declarations and never infers alignment. In
//! particular, when several input axes share an extent the declared axis
//! order is used as-is; extent equality alone never reorders anything.

use smallvec::SmallVec;
use snafu::{ResultExt, ensure};
use tracing::trace;

use veld_ir::{
    Alignment, ArgSpec, Guard, IndexExpr, KernelSpec, Operation, PermTerm, Shape, element_count,
    strides_for, validate_shape,
};

use crate::error::{
    AritySnafu, GroupMismatchSnafu, GuardCountSnafu, NonUniformBroadcastSnafu,
    InvalidPermutationSnafu, PermutationRankSnafu, PermutationShapeSnafu,
    ReducedOutsideReduceSnafu, Result, SameSizeMismatchSnafu, ScalarInputSnafu, ShapeSnafu,
    UnsupportedAlignmentSnafu, WindowMismatchSnafu, WindowSizeSnafu, ZeroGroupSnafu,
    ZeroGuardDivisorSnafu, ZeroWindowSnafu,
};

/// Result of lowering one kernel: address expressions in buffer-slot order
/// (output at index 0) and the number of work items one invocation covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    pub index: SmallVec<[IndexExpr; 4]>,
    pub work_total: usize,
}

/// Lower a kernel description into per-argument index expressions.
///
/// # Errors
///
/// Fails closed on any alignment the declared shapes do not prove:
/// non-uniform broadcasts, malformed or mismatched permutations, windows and
/// groups that do not tile the work space, zero-size dimensions, and scalar
/// expressions reading unbound inputs.
pub fn compile(spec: &KernelSpec) -> Result<Lowered> {
    let operation = spec.operation.name();
    let output_shape = validate_shape(&spec.output_shape).context(ShapeSnafu { operation })?;
    let total = element_count(&output_shape);

    let out_expr = if spec.strided_output { IndexExpr::Strided } else { IndexExpr::Identity };
    let mut index: SmallVec<[IndexExpr; 4]> = SmallVec::new();
    index.push(out_expr);

    match &spec.operation {
        Operation::Map { expr } => {
            expr.validate_inputs(spec.inputs.len()).context(ScalarInputSnafu { operation })?;
            for (argument, arg) in spec.inputs.iter().enumerate() {
                index.push(lower_input(operation, argument, arg, &output_shape, total)?);
            }
        }
        Operation::Select { arms, default } => {
            for (arm, sel) in arms.iter().enumerate() {
                validate_guard(operation, arm, &sel.guard)?;
                sel.value.validate_inputs(spec.inputs.len()).context(ScalarInputSnafu { operation })?;
            }
            default.validate_inputs(spec.inputs.len()).context(ScalarInputSnafu { operation })?;
            for (argument, arg) in spec.inputs.iter().enumerate() {
                index.push(lower_input(operation, argument, arg, &output_shape, total)?);
            }
        }
        Operation::Gather => {
            ensure!(
                spec.inputs.len() == 1,
                AritySnafu { operation, expected: 1usize, actual: spec.inputs.len() }
            );
            index.push(lower_input(operation, 0, &spec.inputs[0], &output_shape, total)?);
        }
        Operation::Reduce { window, .. } => {
            ensure!(*window > 0, ZeroWindowSnafu { operation });
            ensure!(
                spec.inputs.len() == 1,
                AritySnafu { operation, expected: 1usize, actual: spec.inputs.len() }
            );
            let arg = &spec.inputs[0];
            validate_shape(&arg.shape).context(ShapeSnafu { operation })?;
            let Alignment::Reduced { window: declared } = &arg.align else {
                return UnsupportedAlignmentSnafu { operation, argument: 0usize }.fail();
            };
            ensure!(
                declared == window,
                WindowMismatchSnafu {
                    operation,
                    argument: 0usize,
                    expected: *window,
                    declared: *declared,
                }
            );
            let actual = arg.element_count();
            ensure!(
                actual == total * window,
                WindowSizeSnafu { operation, argument: 0usize, window: *window, total, actual }
            );
            index.push(IndexExpr::WindowBase { window: *window });
        }
        Operation::Normalize { group, .. } => {
            ensure!(*group > 0, ZeroGroupSnafu { operation });
            ensure!(total % group == 0, GroupMismatchSnafu { operation, group: *group, total });
            ensure!(
                spec.inputs.len() == 1,
                AritySnafu { operation, expected: 1usize, actual: spec.inputs.len() }
            );
            let arg = &spec.inputs[0];
            validate_shape(&arg.shape).context(ShapeSnafu { operation })?;
            ensure!(
                arg.align == Alignment::Same,
                UnsupportedAlignmentSnafu { operation, argument: 0usize }
            );
            ensure!(
                arg.element_count() == total,
                SameSizeMismatchSnafu {
                    operation,
                    argument: 0usize,
                    expected: total,
                    actual: arg.element_count(),
                }
            );
            // Apply-side expressions: slot 1 reads the data element-for-element,
            // slot 2 reads the per-group statistics buffer the paired stats
            // kernel fills (one element per group).
            index.push(IndexExpr::Identity);
            index.push(IndexExpr::Grouped { group: *group });
        }
    }

    trace!(operation, work_total = total, arguments = index.len(), "lowered kernel addressing");
    Ok(Lowered { index, work_total: total })
}

/// Lower one input of an elementwise-spaced kernel (map, select, gather).
fn lower_input(
    operation: &'static str,
    argument: usize,
    arg: &ArgSpec,
    output_shape: &Shape,
    total: usize,
) -> Result<IndexExpr> {
    let shape = validate_shape(&arg.shape).context(ShapeSnafu { operation })?;
    let count = element_count(&shape);

    match &arg.align {
        Alignment::Same => {
            ensure!(
                count == total,
                SameSizeMismatchSnafu { operation, argument, expected: total, actual: count }
            );
            Ok(IndexExpr::Identity)
        }
        Alignment::Broadcast => {
            ensure!(
                total % count == 0,
                NonUniformBroadcastSnafu { operation, argument, extent: count, total }
            );
            Ok(IndexExpr::Broadcast)
        }
        Alignment::Permuted { order } => {
            lower_permutation(operation, argument, order, &shape, output_shape)
        }
        Alignment::Reduced { .. } => ReducedOutsideReduceSnafu { operation, argument }.fail(),
    }
}

/// Build the div/mod term sum for a permuted traversal.
///
/// For output axis `d`, the component of the linear index along that axis is
/// `i / out_strides[d] % out_shape[d]`; it is rescaled by the input's natural
/// stride for the axis the declaration maps it to.
fn lower_permutation(
    operation: &'static str,
    argument: usize,
    order: &[usize],
    input_shape: &Shape,
    output_shape: &Shape,
) -> Result<IndexExpr> {
    let rank = output_shape.len();
    ensure!(
        order.len() == rank && input_shape.len() == rank,
        PermutationRankSnafu {
            operation,
            argument,
            expected: rank,
            actual: if order.len() != rank { order.len() } else { input_shape.len() },
        }
    );

    let mut seen = vec![false; rank];
    for &axis in order {
        if axis >= rank || seen[axis] {
            return InvalidPermutationSnafu { operation, argument, order: order.to_vec() }.fail();
        }
        seen[axis] = true;
    }

    for (axis, &source) in order.iter().enumerate() {
        ensure!(
            input_shape[source] == output_shape[axis],
            PermutationShapeSnafu {
                operation,
                argument,
                axis,
                expected: output_shape[axis],
                actual: input_shape[source],
            }
        );
    }

    // The identity order degenerates to a plain identical traversal.
    if order.iter().enumerate().all(|(d, &s)| d == s) {
        return Ok(IndexExpr::Identity);
    }

    let out_strides = strides_for(output_shape);
    let in_strides = strides_for(input_shape);
    let terms = order
        .iter()
        .enumerate()
        .filter(|&(axis, _)| output_shape[axis] > 1)
        .map(|(axis, &source)| PermTerm {
            div: out_strides[axis],
            rem: output_shape[axis],
            scale: in_strides[source],
        })
        .collect();

    Ok(IndexExpr::Permuted { terms })
}

fn validate_guard(operation: &'static str, arm: usize, guard: &Guard) -> Result<()> {
    match *guard {
        Guard::Diagonal { dim } => {
            ensure!(dim > 0, ZeroGuardDivisorSnafu { operation, arm });
        }
        Guard::Leading { extent, count } => {
            ensure!(extent > 0, ZeroGuardDivisorSnafu { operation, arm });
            ensure!(count <= extent, GuardCountSnafu { operation, arm, count, extent });
        }
        Guard::Position { .. } => {}
    }
    Ok(())
}
