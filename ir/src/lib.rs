//! Data model for the veld kernel compiler.
//!
//! This crate defines the types shared by the index-expression compiler
//! (`veld-codegen`) and the dispatcher (`veld-runtime`):
//!
//! - [`shape`] - Concrete shapes and row-major stride utilities
//! - [`view`] - Per-argument buffer views and shape-alignment declarations
//! - [`expr`] - Compiled index expressions (linear work index -> flat address)
//! - [`scalar`] - Element-level arithmetic expressions and their evaluator
//! - [`types`] - Scalar, comparison, and reduction operators
//! - [`op`] - Operation descriptors consumed by the kernel emitter
//! - [`work`] - Grid-stride work partitioning
//! - [`error`] - Error types and result handling
//!
//! All buffer elements are IEEE-754 doubles; addresses are plain `usize`
//! offsets into flat backing arrays.

pub mod error;
pub mod expr;
pub mod op;
pub mod scalar;
pub mod shape;
pub mod types;
pub mod view;
pub mod work;


pub use error::{Error, Result};
pub use expr::{IndexExpr, PermTerm};
pub use op::{Guard, KernelSpec, NormalizeKind, Operation, SelectArm};
pub use scalar::ScalarExpr;
pub use shape::{Shape, element_count, strides_for, validate_shape};
pub use types::{BinaryOp, CmpOp, ReduceOp, UnaryOp};
pub use view::{Alignment, ArgSpec, ShapeView};
pub use work::{WorkRange, WorkSpan};
