use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Contract violations caught at dispatch entry.
///
/// Each check here closes off one class of undefined behavior in the worker
/// loop: wrong slot counts, zero divisors, out-of-range addressing, and
/// read/write overlap. A dispatch that passes validation runs every worker
/// without further checks in release builds.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Worker pools must have at least one worker.
    #[snafu(display("worker count must be positive"))]
    ZeroWorkers,

    /// Bound buffer count does not match the kernel's arity.
    #[snafu(display("kernel {kernel}: expects {expected} buffer slots, got {actual}"))]
    ArityMismatch { kernel: &'static str, expected: usize, actual: usize },

    /// A view carries a zero extent, which kernels use as a divisor.
    #[snafu(display("kernel {kernel}: buffer slot {slot} view has zero extent"))]
    ZeroExtent { kernel: &'static str, slot: usize },

    /// A stride-scaled slot carries a zero leading stride, which would
    /// collapse every work item onto one address and race the workers.
    #[snafu(display("kernel {kernel}: buffer slot {slot} view has zero leading stride"))]
    ZeroStride { kernel: &'static str, slot: usize },

    /// A broadcast slot's call-time extent does not divide the work space,
    /// which the compiler refuses at compile time for declared shapes.
    #[snafu(display(
        "kernel {kernel}: buffer slot {slot} extent {extent} does not divide \
         the work space of {total} evenly"
    ))]
    ExtentMismatch { kernel: &'static str, slot: usize, extent: usize, total: usize },

    /// An input shares storage with the output; workers would race.
    #[snafu(display("kernel {kernel}: input slot {slot} shares storage with the output"))]
    OutputAliased { kernel: &'static str, slot: usize },

    /// The kernel's addressing can reach past a bound buffer.
    #[snafu(display(
        "kernel {kernel}: buffer slot {slot} addressing reaches {required} elements, \
         buffer holds {available}"
    ))]
    OutOfBounds { kernel: &'static str, slot: usize, required: usize, available: usize },

    /// A buffer could not be pinned for the invocation.
    #[snafu(display("kernel {kernel}: buffer slot {slot} pin failed: {source}"))]
    Pin { kernel: &'static str, slot: usize, source: veld_device::Error },
}
