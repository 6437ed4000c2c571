use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Shape contains a zero-size dimension.
    #[snafu(display("shape {shape:?} contains a zero-size dimension"))]
    ZeroDimension { shape: Vec<usize> },

    /// Shape has no dimensions at all.
    #[snafu(display("shape must have at least one dimension"))]
    EmptyShape,

    /// View extent must be positive (it is used as a modulo divisor).
    #[snafu(display("view extent must be positive, got 0 (offset {offset})"))]
    ZeroViewExtent { offset: usize },

    /// Scalar expression references an input argument that does not exist.
    #[snafu(display("scalar expression reads input {index} but only {available} inputs are bound"))]
    InputOutOfRange { index: usize, available: usize },
}
