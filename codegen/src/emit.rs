//! Kernel emission.
//!
//! [`emit`] turns a validated [`KernelSpec`] into an executable [`Kernel`]:
//! the lowered index expressions plus a tagged body that an interpreter walks
//! once per work item. Bodies are data, not source text; the same kernel
//! value is reused across call sites, re-parameterized only by the views and
//! buffers supplied at dispatch.
//!
//! Normalization emits a [`NormalizePair`]: a stats kernel that fills a
//! per-group mean buffer, then an apply kernel that reads it back through a
//! grouped lookup. The pair shares one group constant by construction.

use smallvec::{SmallVec, smallvec};
use tracing::debug;

use veld_ir::{
    Alignment, ArgSpec, IndexExpr, KernelSpec, NormalizeKind, Operation, ReduceOp, ScalarExpr,
    SelectArm, ShapeView, WorkSpan,
};

use crate::error::Result;
use crate::lower;

/// Interpreted kernel body. One variant per operation family; the inner
/// match runs once per work item.
#[derive(Debug, Clone, PartialEq)]
enum KernelBody {
    /// Load every input, evaluate the expression, store.
    Map { expr: ScalarExpr },
    /// Fold `window` consecutive input elements; `scale` post-multiplies the
    /// accumulated value (1 everywhere except mean statistics, which bake
    /// `1 / window` so no second pass is needed).
    Reduce { op: ReduceOp, window: usize, scale: f64 },
    /// First matching positional guard wins; `default` otherwise.
    Select { arms: Vec<SelectArm>, default: ScalarExpr },
    /// Center (and optionally scale) each element by its group statistics.
    NormalizeApply { group: usize, kind: NormalizeKind },
    /// Copy through the permuted address expression.
    Gather,
}

/// An executable kernel: lowered addressing plus an interpreted body.
///
/// `apply` runs one worker's span of the grid-stride loop. The kernel itself
/// is immutable and shared; all per-invocation state travels through the
/// argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    name: &'static str,
    body: KernelBody,
    /// Address expression per buffer slot, output first.
    index: SmallVec<[IndexExpr; 4]>,
    /// Buffer slots per invocation, output included.
    arity: usize,
    work_total: usize,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of buffer slots one invocation binds, output included.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Work items one full invocation covers.
    pub fn work_total(&self) -> usize {
        self.work_total
    }

    /// Address expression baked for buffer slot `slot`.
    ///
    /// The dispatcher inspects this to validate the call-time view against
    /// the expression's assumptions (nonzero stride for stride-scaled slots,
    /// uniform wrap-around for broadcast slots).
    pub fn index_expr(&self, slot: usize) -> &IndexExpr {
        &self.index[slot]
    }

    /// Exclusive upper bound of the addresses buffer slot `slot` can see
    /// under `view` across a full invocation.
    pub fn address_bound(&self, slot: usize, view: &ShapeView) -> usize {
        self.index[slot].address_bound(self.work_total, view)
    }

    /// Run this kernel over one worker's span.
    ///
    /// # Safety
    ///
    /// The caller must guarantee, for the duration of the call:
    ///
    /// - `buffers`, `lens`, and `views` all have length [`arity`](Self::arity),
    ///   with the output in slot 0;
    /// - each `buffers[j]` points to at least `lens[j]` valid `f64`s, and
    ///   every address the slot's index expression resolves under `views[j]`
    ///   for indices in `[0, work_total)` is below `lens[j]`;
    /// - no input buffer aliases the output buffer.
    ///
    /// The dispatcher establishes all of these before spawning workers;
    /// addresses are re-checked here in debug builds only.
    pub unsafe fn apply(
        &self,
        buffers: &[*mut f64],
        lens: &[usize],
        views: &[ShapeView],
        span: WorkSpan,
    ) {
        debug_assert_eq!(buffers.len(), self.arity);
        debug_assert_eq!(lens.len(), self.arity);
        debug_assert_eq!(views.len(), self.arity);
        debug_assert!(span.step > 0 && span.total <= self.work_total);

        let mut loads: SmallVec<[f64; 4]> = smallvec![0.0; self.arity - 1];

        let mut i = span.start;
        while i < span.total {
            let out_addr = self.index[0].resolve(i, &views[0]);
            debug_assert!(out_addr < lens[0], "output address {out_addr} out of bounds");

            let value = match &self.body {
                KernelBody::Map { expr } => {
                    self.load_inputs(i, buffers, lens, views, &mut loads);
                    expr.eval(&loads)
                }
                KernelBody::Select { arms, default } => {
                    self.load_inputs(i, buffers, lens, views, &mut loads);
                    let value =
                        arms.iter().find(|arm| arm.guard.matches(i)).map_or(default, |arm| &arm.value);
                    value.eval(&loads)
                }
                KernelBody::Gather => {
                    let addr = self.index[1].resolve(i, &views[1]);
                    debug_assert!(addr < lens[1], "gather address {addr} out of bounds");
                    unsafe { *buffers[1].add(addr) }
                }
                KernelBody::Reduce { op, window, scale } => {
                    let base = self.index[1].resolve(i, &views[1]);
                    debug_assert!(base + window - 1 < lens[1], "window at {base} out of bounds");
                    let mut acc = op.identity();
                    for k in 0..*window {
                        acc = op.fold(acc, unsafe { *buffers[1].add(base + k) });
                    }
                    acc * scale
                }
                KernelBody::NormalizeApply { group, kind } => {
                    let x_addr = self.index[1].resolve(i, &views[1]);
                    let mean_addr = self.index[2].resolve(i, &views[2]);
                    debug_assert!(x_addr < lens[1] && mean_addr < lens[2]);
                    let x = unsafe { *buffers[1].add(x_addr) };
                    let mean = unsafe { *buffers[2].add(mean_addr) };
                    let centered = x - mean;
                    match kind {
                        NormalizeKind::MeanCenter => centered,
                        NormalizeKind::Standardize { epsilon } => {
                            // Variance is re-folded here over the group base
                            // rather than staged through a second statistics
                            // buffer; the arity stays at three.
                            let base = views[1].offset + (i / group) * group;
                            let mut acc = 0.0;
                            for k in 0..*group {
                                let d = unsafe { *buffers[1].add(base + k) } - mean;
                                acc += d * d;
                            }
                            centered / (acc / *group as f64 + epsilon).sqrt()
                        }
                    }
                }
            };

            unsafe { *buffers[0].add(out_addr) = value };
            i += span.step;
        }
    }

    /// Resolve and load every input slot's value for work item `i`.
    #[inline]
    fn load_inputs(
        &self,
        i: usize,
        buffers: &[*mut f64],
        lens: &[usize],
        views: &[ShapeView],
        loads: &mut [f64],
    ) {
        for j in 1..self.arity {
            let addr = self.index[j].resolve(i, &views[j]);
            debug_assert!(addr < lens[j], "input {j} address {addr} out of bounds");
            loads[j - 1] = unsafe { *buffers[j].add(addr) };
        }
    }
}

/// Two-kernel normalization: statistics first, then the elementwise apply.
///
/// The dispatcher runs `stats` to completion into an intermediate buffer of
/// [`group_count`](Self::group_count) elements, then runs `apply` with that
/// buffer bound to slot 2.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizePair {
    pub stats: Kernel,
    pub apply: Kernel,
    pub group: usize,
}

impl NormalizePair {
    /// Elements in the intermediate statistics buffer (one per group).
    pub fn group_count(&self) -> usize {
        self.stats.work_total
    }
}

/// What `emit` produces: most operations compile to one kernel,
/// normalization to a pair.
#[derive(Debug, Clone, PartialEq)]
pub enum EmittedKernel {
    Single(Kernel),
    NormalizePair(NormalizePair),
}

/// Emit an executable kernel from a validated description.
///
/// # Errors
///
/// Propagates every lowering failure from [`lower::compile`]; emission adds
/// no failure modes of its own.
pub fn emit(spec: &KernelSpec) -> Result<EmittedKernel> {
    let lowered = lower::compile(spec)?;
    let arity = lowered.index.len();

    let emitted = match &spec.operation {
        Operation::Map { expr } => EmittedKernel::Single(Kernel {
            name: "map",
            body: KernelBody::Map { expr: expr.clone() },
            index: lowered.index,
            arity,
            work_total: lowered.work_total,
        }),
        Operation::Select { arms, default } => EmittedKernel::Single(Kernel {
            name: "select",
            body: KernelBody::Select { arms: arms.clone(), default: default.clone() },
            index: lowered.index,
            arity,
            work_total: lowered.work_total,
        }),
        Operation::Gather => EmittedKernel::Single(Kernel {
            name: "gather",
            body: KernelBody::Gather,
            index: lowered.index,
            arity,
            work_total: lowered.work_total,
        }),
        Operation::Reduce { op, window } => EmittedKernel::Single(Kernel {
            name: reduce_name(*op),
            body: KernelBody::Reduce { op: *op, window: *window, scale: 1.0 },
            index: lowered.index,
            arity,
            work_total: lowered.work_total,
        }),
        Operation::Normalize { group, kind } => {
            let groups = lowered.work_total / group;
            let stats_spec = KernelSpec::new(
                Operation::Reduce { op: ReduceOp::Sum, window: *group },
                smallvec![groups],
                vec![ArgSpec::new(
                    spec.inputs[0].shape.clone(),
                    Alignment::Reduced { window: *group },
                )],
            );
            let stats_lowered = lower::compile(&stats_spec)?;
            let stats = Kernel {
                name: "normalize_stats",
                body: KernelBody::Reduce {
                    op: ReduceOp::Sum,
                    window: *group,
                    scale: 1.0 / *group as f64,
                },
                index: stats_lowered.index,
                arity: 2,
                work_total: groups,
            };
            let apply = Kernel {
                name: "normalize_apply",
                body: KernelBody::NormalizeApply { group: *group, kind: *kind },
                index: lowered.index,
                arity,
                work_total: lowered.work_total,
            };
            EmittedKernel::NormalizePair(NormalizePair { stats, apply, group: *group })
        }
    };

    match &emitted {
        EmittedKernel::Single(k) => {
            debug!(name = k.name, arity = k.arity, work_total = k.work_total, "emitted kernel");
        }
        EmittedKernel::NormalizePair(pair) => {
            debug!(
                group = pair.group,
                groups = pair.group_count(),
                work_total = pair.apply.work_total,
                "emitted normalization pair"
            );
        }
    }

    Ok(emitted)
}

fn reduce_name(op: ReduceOp) -> &'static str {
    match op {
        ReduceOp::Sum => "reduce_sum",
        ReduceOp::Product => "reduce_product",
        ReduceOp::Max => "reduce_max",
    }
}
