//! Compiled index expressions.
//!
//! An [`IndexExpr`] is a pure integer function from a linear work-item index
//! to a flat buffer address, built from integer division and modulo only.
//! One expression is compiled per kernel argument and evaluated once per work
//! item, so every variant resolves in O(1) with branch-light arithmetic.
//!
//! Division and modulo constants baked into an expression are validated
//! nonzero at compile time; the call-time divisors (`extent`) are validated
//! at dispatch entry. Evaluation itself performs no checks in release builds.

use smallvec::SmallVec;

use crate::view::ShapeView;

/// One div/mod term of a permuted traversal:
/// `(i / div % rem) * scale`.
///
/// `div` and `rem` reconstruct one output dimension component from the linear
/// index; `scale` re-multiplies it by the input's natural stride for the
/// corresponding axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermTerm {
    pub div: usize,
    pub rem: usize,
    pub scale: usize,
}

/// Closed-form address function of the linear work-item index.
///
/// Call-time parameters (`offset`, `extent`, `leading_stride`) come from the
/// [`ShapeView`] supplied at dispatch; structural constants (permutation
/// terms, windows, groups) are baked at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexExpr {
    /// `addr = i` - identical traversal.
    Identity,
    /// `addr = i % extent` - modulo broadcast of a smaller argument.
    Broadcast,
    /// `addr = i * leading_stride` - strided (padded) destination placement.
    Strided,
    /// `addr = sum((i / div % rem) * scale)` - transposed traversal
    /// reconstructed from nested div/mod components.
    Permuted { terms: SmallVec<[PermTerm; 4]> },
    /// `addr = i * window` - base of the reduction window feeding output
    /// element `i`; the reduce loop adds `k` in `[0, window)`.
    WindowBase { window: usize },
    /// `addr = (i / group) * group` - first element of the group containing
    /// work item `i`, in the same index space as `i`.
    GroupBase { group: usize },
    /// `addr = i / group` - lookup into a per-group aggregate (one element
    /// per group, e.g. a previously computed mean).
    Grouped { group: usize },
}

impl IndexExpr {
    /// Resolve the flat buffer address for work item `i` under `view`.
    #[inline]
    pub fn resolve(&self, i: usize, view: &ShapeView) -> usize {
        view.offset
            + match self {
                IndexExpr::Identity => i,
                IndexExpr::Broadcast => i % view.extent,
                IndexExpr::Strided => i * view.leading_stride,
                IndexExpr::Permuted { terms } => {
                    terms.iter().map(|t| (i / t.div % t.rem) * t.scale).sum()
                }
                IndexExpr::WindowBase { window } => i * window,
                IndexExpr::GroupBase { group } => (i / group) * group,
                IndexExpr::Grouped { group } => i / group,
            }
    }

    /// Exclusive upper bound of the addresses this expression can resolve
    /// for work items in `[0, total)` under `view`.
    ///
    /// The dispatcher compares this against the bound buffer's length before
    /// any worker runs; a kernel whose bound fits never computes an address
    /// outside its buffer.
    pub fn address_bound(&self, total: usize, view: &ShapeView) -> usize {
        if total == 0 {
            return view.offset;
        }
        view.offset
            + match self {
                IndexExpr::Identity => total,
                IndexExpr::Broadcast => view.extent.min(total),
                IndexExpr::Strided => (total - 1) * view.leading_stride + 1,
                IndexExpr::Permuted { terms } => {
                    terms.iter().map(|t| (t.rem - 1) * t.scale).sum::<usize>() + 1
                }
                IndexExpr::WindowBase { window } => total * window,
                IndexExpr::GroupBase { .. } => total,
                IndexExpr::Grouped { group } => total.div_ceil(*group),
            }
    }
}
