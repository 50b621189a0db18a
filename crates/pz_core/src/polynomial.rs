//! Polynomial and rational transfer functions.

use crate::oracle::{Evaluation, OracleError, TransferOracle};
use anyhow::{bail, Result};
use num_complex::Complex64;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// Real polynomial with coefficients in ascending powers of `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Builds a polynomial from ascending coefficients. Trailing zeros are trimmed.
    pub fn new(coefficients: Vec<f64>) -> Result<Self> {
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            bail!("Polynomial coefficients must be finite; got {bad}.");
        }
        let mut coefficients = coefficients;
        while coefficients.last().is_some_and(|c| *c == 0.0) {
            coefficients.pop();
        }
        Ok(Self { coefficients })
    }

    /// Monic polynomial with the given roots.
    ///
    /// Complex roots must be accompanied by their conjugates so the coefficients
    /// stay real.
    pub fn from_roots(roots: &[Complex64]) -> Result<Self> {
        let mut product = vec![Complex64::one()];
        for &root in roots {
            let mut next = vec![Complex64::zero(); product.len() + 1];
            for (power, &c) in product.iter().enumerate() {
                next[power + 1] += c;
                next[power] -= c * root;
            }
            product = next;
        }
        let scale = product.iter().map(|c| c.norm()).fold(1.0, f64::max);
        if product.iter().any(|c| c.im.abs() > 1e-9 * scale) {
            bail!("Complex roots must appear in conjugate pairs.");
        }
        Self::new(product.into_iter().map(|c| c.re).collect())
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Degree of the polynomial; the zero polynomial reports 0.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation at complex `s`.
    pub fn eval(&self, s: Complex64) -> Complex64 {
        self.coefficients
            .iter()
            .rev()
            .fold(Complex64::zero(), |acc, &c| acc * s + c)
    }
}

/// A polynomial sampled as an oracle, claiming `size` as the matrix size.
#[derive(Debug, Clone)]
pub struct PolynomialOracle {
    polynomial: Polynomial,
    size: usize,
}

impl PolynomialOracle {
    pub fn new(polynomial: Polynomial, size: usize) -> Self {
        Self { polynomial, size }
    }
}

impl TransferOracle for PolynomialOracle {
    fn size(&self) -> usize {
        self.size
    }

    fn evaluate(&mut self, s: Complex64) -> std::result::Result<Evaluation, OracleError> {
        Ok(Evaluation::from_complex(self.polynomial.eval(s)))
    }
}

/// `H(s) = numerator(s) / denominator(s)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationalFunction {
    numerator: Polynomial,
    denominator: Polynomial,
    size: usize,
}

impl RationalFunction {
    /// The matrix size defaults to one more than the larger degree, so the
    /// root cap never binds before every root is found.
    pub fn new(numerator: Polynomial, denominator: Polynomial) -> Result<Self> {
        if denominator.is_zero() {
            bail!("Denominator polynomial must not be identically zero.");
        }
        let size = numerator.degree().max(denominator.degree()) + 1;
        Ok(Self {
            numerator,
            denominator,
            size,
        })
    }

    pub fn from_coefficients(numerator: Vec<f64>, denominator: Vec<f64>) -> Result<Self> {
        Self::new(Polynomial::new(numerator)?, Polynomial::new(denominator)?)
    }

    pub fn with_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            bail!("Matrix size must be positive.");
        }
        self.size = size;
        Ok(self)
    }

    pub fn numerator(&self) -> &Polynomial {
        &self.numerator
    }

    pub fn denominator(&self) -> &Polynomial {
        &self.denominator
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn eval(&self, s: Complex64) -> Complex64 {
        self.numerator.eval(s) / self.denominator.eval(s)
    }

    /// Oracle whose roots are the poles of `H`.
    pub fn pole_oracle(&self) -> PolynomialOracle {
        PolynomialOracle::new(self.denominator.clone(), self.size)
    }

    /// Oracle whose roots are the zeros of `H`.
    pub fn zero_oracle(&self) -> PolynomialOracle {
        PolynomialOracle::new(self.numerator.clone(), self.size)
    }
}
