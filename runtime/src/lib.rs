//! Kernel dispatcher.
//!
//! This crate owns the boundary between safe code and kernel execution:
//!
//! - [`context`] - Worker pool geometry ([`ExecutionContext`], default 20
//!   workers)
//! - [`dispatch`] - Contract validation at dispatch entry and the
//!   grid-stride worker scope
//! - [`error`] - Contract violations, reported before any buffer is touched
//!
//! The division of labor with `veld-codegen` is strict: compilation rejects
//! every malformed shape relationship, dispatch rejects every malformed
//! invocation, and the worker loop itself performs no checks in release
//! builds.

pub mod context;
pub mod dispatch;
pub mod error;


pub use context::{DEFAULT_WORKER_COUNT, ExecutionContext};
pub use dispatch::{KernelArg, dispatch, dispatch_emitted, dispatch_normalize};
pub use error::{Error, Result};
