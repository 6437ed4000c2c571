use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// View bounds exceed the parent buffer.
    #[snafu(display(
        "view [{offset}, {offset} + {len}) exceeds buffer of {buffer_len} elements"
    ))]
    InvalidView { offset: usize, len: usize, buffer_len: usize },

    /// Host copy size does not match the buffer view.
    #[snafu(display("expected {expected} elements, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// The underlying storage is already pinned incompatibly (a write pin is
    /// exclusive against every other pin of the same storage).
    #[snafu(display("buffer storage is already pinned for conflicting access"))]
    PinConflict,
}
