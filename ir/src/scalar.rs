//! Element-level arithmetic expressions.
//!
//! A [`ScalarExpr`] describes the right-hand side of a map kernel's single
//! assignment: a tree over the values loaded from the kernel's inputs.
//! It is evaluated by a tight recursive interpreter rather than rendered to
//! source text; the tree is fixed per kernel, so evaluation is allocation-free.

use crate::error::{InputOutOfRangeSnafu, Result};
use crate::types::{BinaryOp, CmpOp, UnaryOp};

/// Scalar expression over the values loaded for one work item.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    /// Literal constant.
    Const(f64),
    /// Value loaded from input argument `index` (0 = first input).
    Input(usize),
    Unary(UnaryOp, Box<ScalarExpr>),
    Binary(BinaryOp, Box<ScalarExpr>, Box<ScalarExpr>),
    /// Comparison-select: `if cmp(lhs, rhs) { then } else { otherwise }`.
    Select {
        cmp: CmpOp,
        lhs: Box<ScalarExpr>,
        rhs: Box<ScalarExpr>,
        then: Box<ScalarExpr>,
        otherwise: Box<ScalarExpr>,
    },
}

impl ScalarExpr {
    pub fn constant(v: f64) -> Self {
        ScalarExpr::Const(v)
    }

    pub fn input(index: usize) -> Self {
        ScalarExpr::Input(index)
    }

    pub fn unary(self, op: UnaryOp) -> Self {
        ScalarExpr::Unary(op, Box::new(self))
    }

    pub fn binary(self, op: BinaryOp, rhs: ScalarExpr) -> Self {
        ScalarExpr::Binary(op, Box::new(self), Box::new(rhs))
    }

    pub fn select(cmp: CmpOp, lhs: ScalarExpr, rhs: ScalarExpr, then: ScalarExpr, otherwise: ScalarExpr) -> Self {
        ScalarExpr::Select {
            cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn neg(self) -> Self {
        self.unary(UnaryOp::Neg)
    }

    pub fn exp(self) -> Self {
        self.unary(UnaryOp::Exp)
    }

    pub fn sqrt(self) -> Self {
        self.unary(UnaryOp::Sqrt)
    }

    pub fn add(self, rhs: ScalarExpr) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(self, rhs: ScalarExpr) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(self, rhs: ScalarExpr) -> Self {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(self, rhs: ScalarExpr) -> Self {
        self.binary(BinaryOp::Div, rhs)
    }

    pub fn pow(self, rhs: ScalarExpr) -> Self {
        self.binary(BinaryOp::Pow, rhs)
    }

    /// Evaluate against the values loaded for one work item.
    ///
    /// `loads[j]` is the value read from input argument `j` at its resolved
    /// address. Out-of-range input references must have been rejected by
    /// [`validate_inputs`](Self::validate_inputs) before the kernel was
    /// emitted; here they would panic via slice indexing.
    #[inline]
    pub fn eval(&self, loads: &[f64]) -> f64 {
        match self {
            ScalarExpr::Const(v) => *v,
            ScalarExpr::Input(index) => loads[*index],
            ScalarExpr::Unary(op, e) => op.apply(e.eval(loads)),
            ScalarExpr::Binary(op, a, b) => op.apply(a.eval(loads), b.eval(loads)),
            ScalarExpr::Select { cmp, lhs, rhs, then, otherwise } => {
                if cmp.test(lhs.eval(loads), rhs.eval(loads)) {
                    then.eval(loads)
                } else {
                    otherwise.eval(loads)
                }
            }
        }
    }

    /// Check that every `Input` reference is within the bound input count.
    pub fn validate_inputs(&self, available: usize) -> Result<()> {
        match self {
            ScalarExpr::Const(_) => Ok(()),
            ScalarExpr::Input(index) => {
                snafu::ensure!(*index < available, InputOutOfRangeSnafu { index: *index, available });
                Ok(())
            }
            ScalarExpr::Unary(_, e) => e.validate_inputs(available),
            ScalarExpr::Binary(_, a, b) => {
                a.validate_inputs(available)?;
                b.validate_inputs(available)
            }
            ScalarExpr::Select { lhs, rhs, then, otherwise, .. } => {
                lhs.validate_inputs(available)?;
                rhs.validate_inputs(available)?;
                then.validate_inputs(available)?;
                otherwise.validate_inputs(available)
            }
        }
    }
}
