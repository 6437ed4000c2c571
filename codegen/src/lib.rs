//! Index-expression compiler and kernel emitter.
//!
//! This crate turns operation descriptions ([`veld_ir::KernelSpec`]) into
//! executable kernels in two stages:
//!
//! - [`lower`] - Compile per-argument closed-form address expressions from
//!   the declared shapes and alignments, failing closed on anything the
//!   declarations do not prove
//! - [`emit`] - Package the lowered addressing with an interpreted kernel
//!   body; normalization becomes a stats/apply kernel pair
//! - [`error`] - Compilation errors, each naming the operation and the rule
//!   it violated
//!
//! Compilation happens once per operation; the emitted kernel is then
//! dispatched any number of times with fresh call-time views.

pub mod emit;
pub mod error;
pub mod lower;


pub use emit::{EmittedKernel, Kernel, NormalizePair, emit};
pub use error::{Error, Result};
pub use lower::{Lowered, compile};
