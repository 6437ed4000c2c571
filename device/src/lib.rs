//! Host buffer management.
//!
//! - [`buffer`] - Refcounted flat `f64` buffers, offset views, and the pin
//!   API the dispatcher uses to hand raw pointers to kernel workers
//! - [`error`] - Buffer errors (bounds, sizes, pin conflicts)

pub mod buffer;
pub mod error;

#[cfg(test)]
mod test;

pub use buffer::{Buffer, BufferId, Pin, PinMut};
pub use error::{Error, Result};
