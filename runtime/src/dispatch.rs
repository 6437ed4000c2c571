//! Kernel dispatch.
//!
//! [`dispatch`] is the single entry point through which kernels touch
//! memory. It validates the invocation contract up front (arity, view
//! extents, addressing bounds, output aliasing), pins every buffer for the
//! duration of the call, then drives the kernel with a fixed pool of
//! grid-stride workers. A dispatch that passes validation cannot address
//! outside its buffers or race on the output, so the worker loop itself runs
//! unchecked in release builds.
//!
//! Workers share the kernel and metadata by reference; each owns a disjoint
//! [`WorkSpan`], so no synchronization happens between validation and the
//! end of the scope.

use smallvec::SmallVec;
use snafu::{ResultExt, ensure};
use tracing::debug;

use veld_codegen::emit::{EmittedKernel, Kernel, NormalizePair};
use veld_device::{Buffer, Pin};
use veld_ir::{IndexExpr, ShapeView, WorkRange};

use crate::context::ExecutionContext;
use crate::error::{
    ArityMismatchSnafu, ExtentMismatchSnafu, OutOfBoundsSnafu, OutputAliasedSnafu, PinSnafu,
    Result, ZeroExtentSnafu, ZeroStrideSnafu,
};

/// One bound argument: a buffer and the view describing the argument's
/// placement inside it.
#[derive(Clone, Copy)]
pub struct KernelArg<'a> {
    pub buffer: &'a Buffer,
    pub view: ShapeView,
}

impl<'a> KernelArg<'a> {
    pub fn new(buffer: &'a Buffer, view: ShapeView) -> Self {
        Self { buffer, view }
    }

    /// Bind a buffer as one dense contiguous argument.
    pub fn dense(buffer: &'a Buffer) -> Self {
        Self { buffer, view: ShapeView::contiguous(buffer.len()) }
    }
}

/// Validate the invocation contract and run `kernel` to completion.
///
/// # Errors
///
/// Fails without touching any buffer when the bound slots do not satisfy the
/// kernel's contract: wrong arity, a zero view extent, addressing that can
/// reach past a buffer, an input sharing storage with the output, or a
/// buffer already pinned elsewhere.
pub fn dispatch(
    context: &ExecutionContext,
    kernel: &Kernel,
    output: KernelArg<'_>,
    inputs: &[KernelArg<'_>],
) -> Result<()> {
    let name = kernel.name();
    let actual = inputs.len() + 1;
    ensure!(
        actual == kernel.arity(),
        ArityMismatchSnafu { kernel: name, expected: kernel.arity(), actual }
    );

    let mut views: SmallVec<[ShapeView; 4]> = SmallVec::with_capacity(actual);
    views.push(output.view);
    views.extend(inputs.iter().map(|arg| arg.view));

    for (slot, view) in views.iter().enumerate() {
        ensure!(view.extent > 0, ZeroExtentSnafu { kernel: name, slot });
        match kernel.index_expr(slot) {
            // A zero stride would collapse every store onto one address.
            IndexExpr::Strided => {
                ensure!(view.leading_stride > 0, ZeroStrideSnafu { kernel: name, slot });
            }
            // Wrap-around must land back on element 0 exactly at the end of
            // the work space, the same divisibility the compiler requires of
            // the declared shapes.
            IndexExpr::Broadcast => {
                ensure!(
                    kernel.work_total() % view.extent == 0,
                    ExtentMismatchSnafu {
                        kernel: name,
                        slot,
                        extent: view.extent,
                        total: kernel.work_total(),
                    }
                );
            }
            _ => {}
        }
    }

    for (slot, arg) in inputs.iter().enumerate() {
        ensure!(
            !arg.buffer.shares_storage(output.buffer),
            OutputAliasedSnafu { kernel: name, slot: slot + 1 }
        );
    }

    let mut lens: SmallVec<[usize; 4]> = SmallVec::with_capacity(actual);
    lens.push(output.buffer.len());
    lens.extend(inputs.iter().map(|arg| arg.buffer.len()));

    for (slot, (&available, view)) in lens.iter().zip(&views).enumerate() {
        let required = kernel.address_bound(slot, view);
        ensure!(
            required <= available,
            OutOfBoundsSnafu { kernel: name, slot, required, available }
        );
    }

    // Pins hold the storage borrows for the whole invocation: the output
    // exclusively, inputs shared. An input secretly backed by the output's
    // storage was already rejected above; distinct storages cannot conflict.
    let mut out_pin = output.buffer.pin_mut().context(PinSnafu { kernel: name, slot: 0usize })?;
    let input_pins = inputs
        .iter()
        .enumerate()
        .map(|(slot, arg)| arg.buffer.pin().context(PinSnafu { kernel: name, slot: slot + 1 }))
        .collect::<Result<Vec<Pin<'_>>>>()?;

    let mut buffers: SmallVec<[*mut f64; 4]> = SmallVec::with_capacity(actual);
    buffers.push(out_pin.ptr());
    buffers.extend(input_pins.iter().map(|pin| pin.ptr()));

    run_workers(context, kernel, &buffers, &lens, &views);
    Ok(())
}

/// Run the stats and apply halves of a normalization pair in order, staging
/// the per-group statistics through a scratch buffer.
///
/// # Errors
/// Propagates contract violations from either half.
pub fn dispatch_normalize(
    context: &ExecutionContext,
    pair: &NormalizePair,
    output: KernelArg<'_>,
    input: KernelArg<'_>,
) -> Result<()> {
    let means = Buffer::zeroed(pair.group_count());
    let means_view = ShapeView::contiguous(pair.group_count());

    dispatch(context, &pair.stats, KernelArg::new(&means, means_view), &[input])?;
    dispatch(context, &pair.apply, output, &[input, KernelArg::new(&means, means_view)])
}

/// Dispatch whatever [`veld_codegen::emit::emit`] produced.
///
/// # Errors
/// Fails on contract violations, including a wrong input count for a
/// normalization pair.
pub fn dispatch_emitted(
    context: &ExecutionContext,
    kernel: &EmittedKernel,
    output: KernelArg<'_>,
    inputs: &[KernelArg<'_>],
) -> Result<()> {
    match kernel {
        EmittedKernel::Single(kernel) => dispatch(context, kernel, output, inputs),
        EmittedKernel::NormalizePair(pair) => {
            ensure!(
                inputs.len() == 1,
                ArityMismatchSnafu { kernel: "normalize", expected: 2usize, actual: inputs.len() + 1 }
            );
            dispatch_normalize(context, pair, output, inputs[0])
        }
    }
}

fn run_workers(
    context: &ExecutionContext,
    kernel: &Kernel,
    buffers: &[*mut f64],
    lens: &[usize],
    views: &[ShapeView],
) {
    let range = WorkRange::new(kernel.work_total(), context.worker_count());
    debug!(
        kernel = kernel.name(),
        work_total = kernel.work_total(),
        workers = context.worker_count(),
        "dispatching kernel"
    );

    if context.worker_count() == 1 {
        for span in range.spans() {
            unsafe { kernel.apply(buffers, lens, views, span) };
        }
        return;
    }

    // *mut f64 is not Sync, so &[*mut f64] cannot cross into the scope.
    // Pointers and usize share size and alignment; carry the slice as usize
    // and transmute back inside each worker. The pins above keep the
    // pointers valid until the scope ends.
    debug_assert_eq!(std::mem::size_of::<*mut f64>(), std::mem::size_of::<usize>());
    debug_assert_eq!(std::mem::align_of::<*mut f64>(), std::mem::align_of::<usize>());
    let addrs: &[usize] = unsafe { std::mem::transmute::<&[*mut f64], &[usize]>(buffers) };

    rayon::scope(|s| {
        for span in range.spans() {
            s.spawn(move |_| {
                let ptrs: &[*mut f64] = unsafe { std::mem::transmute::<&[usize], &[*mut f64]>(addrs) };
                unsafe { kernel.apply(ptrs, lens, views, span) };
            });
        }
    });
}
