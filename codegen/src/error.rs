use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Compilation failures.
///
/// Every variant names the operation being compiled and the rule it violated.
/// The compiler fails closed: any alignment it cannot prove correct from the
/// declared shapes is rejected here rather than papered over with a guessed
/// address formula.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Output or input shape failed structural validation.
    #[snafu(display("{operation}: invalid shape: {source}"))]
    Shape { operation: &'static str, source: veld_ir::Error },

    /// Wrong number of inputs for the operation kind.
    #[snafu(display("{operation}: expects {expected} input(s), got {actual}"))]
    Arity { operation: &'static str, expected: usize, actual: usize },

    /// A `Same`-aligned input does not match the work space size.
    #[snafu(display(
        "{operation}: input {argument} declared same-aligned has {actual} \
         elements where the work space has {expected}"
    ))]
    SameSizeMismatch { operation: &'static str, argument: usize, expected: usize, actual: usize },

    /// A broadcast input's element count does not divide the work space
    /// evenly, so modulo wrap-around would misalign partway through.
    #[snafu(display(
        "{operation}: input {argument} with {extent} elements does not divide \
         the work space of {total} evenly; refusing non-uniform broadcast"
    ))]
    NonUniformBroadcast { operation: &'static str, argument: usize, extent: usize, total: usize },

    /// Declared axis order is not a permutation of `0..rank`.
    #[snafu(display("{operation}: input {argument} order {order:?} is not a permutation"))]
    InvalidPermutation { operation: &'static str, argument: usize, order: Vec<usize> },

    /// Permutation order length does not match the output rank.
    #[snafu(display(
        "{operation}: input {argument} permutation has rank {actual}, output has rank {expected}"
    ))]
    PermutationRank { operation: &'static str, argument: usize, expected: usize, actual: usize },

    /// A permuted input's dimension disagrees with the output dimension it is
    /// declared to feed.
    #[snafu(display(
        "{operation}: input {argument} axis {axis} has extent {actual}, \
         output expects {expected} under the declared order"
    ))]
    PermutationShape {
        operation: &'static str,
        argument: usize,
        axis: usize,
        expected: usize,
        actual: usize,
    },

    /// Reduction or normalization window must be positive.
    #[snafu(display("{operation}: window must be positive"))]
    ZeroWindow { operation: &'static str },

    /// A `Reduced`-aligned input declares a different window than the
    /// operation it feeds.
    #[snafu(display(
        "{operation}: input {argument} declares window {declared}, operation uses {expected}"
    ))]
    WindowMismatch { operation: &'static str, argument: usize, expected: usize, declared: usize },

    /// `Reduced` alignment is only meaningful under a reduction.
    #[snafu(display("{operation}: input {argument} declares a reduction window"))]
    ReducedOutsideReduce { operation: &'static str, argument: usize },

    /// Input alignment kind is not valid for this operation.
    #[snafu(display("{operation}: input {argument} alignment is not supported here"))]
    UnsupportedAlignment { operation: &'static str, argument: usize },

    /// Reduced input length must be exactly window times the output total.
    #[snafu(display(
        "{operation}: input {argument} has {actual} elements, \
         expected window {window} times output total {total}"
    ))]
    WindowSize { operation: &'static str, argument: usize, window: usize, total: usize, actual: usize },

    /// Normalization group must be positive.
    #[snafu(display("{operation}: group size must be positive"))]
    ZeroGroup { operation: &'static str },

    /// Normalization group must tile the work space exactly.
    #[snafu(display("{operation}: group size {group} does not divide element count {total}"))]
    GroupMismatch { operation: &'static str, group: usize, total: usize },

    /// A positional guard carries a zero divisor.
    #[snafu(display("{operation}: arm {arm} guard has a zero divisor"))]
    ZeroGuardDivisor { operation: &'static str, arm: usize },

    /// A leading-run guard that covers its whole span never discriminates.
    #[snafu(display(
        "{operation}: arm {arm} guard count {count} exceeds its span extent {extent}"
    ))]
    GuardCount { operation: &'static str, arm: usize, count: usize, extent: usize },

    /// A scalar expression reads an input the kernel does not bind.
    #[snafu(display("{operation}: {source}"))]
    ScalarInput { operation: &'static str, source: veld_ir::Error },
}
