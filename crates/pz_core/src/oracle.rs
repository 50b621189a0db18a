//! The transfer-function oracle consumed by the root search.
//!
//! The search never looks inside a circuit. It samples a function whose zeros
//! are the roots it is after (a network determinant for poles, a cofactor for
//! zeros) through this trait.

use crate::scaled::ScaledComplex;
use num_complex::Complex64;
use thiserror::Error;

/// Outcome of a single oracle evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// The function value at `s`, already scaled to preserve dynamic range.
    Value(ScaledComplex),
    /// The system is singular at `s`; the search treats this as a trivial root.
    Singular,
}

impl Evaluation {
    pub fn from_complex(value: Complex64) -> Self {
        Evaluation::Value(ScaledComplex::new(value))
    }
}

/// Hard oracle failures. These abort the search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    #[error("oracle could not allocate its factorization workspace")]
    Allocation,
    #[error("{0}")]
    Failed(String),
}

/// Core interface implemented by anything the root search can sample.
pub trait TransferOracle {
    /// Size of the underlying matrix. No more than this many roots are sought.
    fn size(&self) -> usize;

    /// Evaluate the function at complex frequency `s`.
    fn evaluate(&mut self, s: Complex64) -> Result<Evaluation, OracleError>;
}

impl<O: TransferOracle + ?Sized> TransferOracle for &mut O {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn evaluate(&mut self, s: Complex64) -> Result<Evaluation, OracleError> {
        (**self).evaluate(s)
    }
}

/// Adapts a closure into an oracle, mostly for tests and quick experiments.
pub struct FnOracle<F> {
    size: usize,
    f: F,
}

impl<F> FnOracle<F>
where
    F: FnMut(Complex64) -> Result<Evaluation, OracleError>,
{
    pub fn new(size: usize, f: F) -> Self {
        Self { size, f }
    }
}

impl<F> TransferOracle for FnOracle<F>
where
    F: FnMut(Complex64) -> Result<Evaluation, OracleError>,
{
    fn size(&self) -> usize {
        self.size
    }

    fn evaluate(&mut self, s: Complex64) -> Result<Evaluation, OracleError> {
        (self.f)(s)
    }
}
