//! Small-signal node networks assembled by nodal stamping.
//!
//! The network admittance is `Y(s) = G + sC`. Its determinant vanishes at the
//! poles; the cofactor of entry (input, output) vanishes at the zeros of the
//! transimpedance `V(output) / I(input)`.

use crate::oracle::{Evaluation, OracleError, TransferOracle};
use crate::scaled::ScaledComplex;
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use nalgebra_sparse::convert::serial::convert_coo_dense;
use nalgebra_sparse::CooMatrix;
use num_complex::Complex64;

/// Node indices run from 0; `None` is ground.
#[derive(Debug, Clone)]
pub struct LinearNetwork {
    nodes: usize,
    g: CooMatrix<f64>,
    c: CooMatrix<f64>,
}

impl LinearNetwork {
    pub fn new(nodes: usize) -> Result<Self> {
        if nodes == 0 {
            bail!("Network must have at least one non-ground node.");
        }
        Ok(Self {
            nodes,
            g: CooMatrix::new(nodes, nodes),
            c: CooMatrix::new(nodes, nodes),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn stamp_conductance(
        &mut self,
        n1: Option<usize>,
        n2: Option<usize>,
        g: f64,
    ) -> Result<()> {
        check_finite("conductance", g)?;
        self.check_nodes(&[n1, n2])?;
        stamp_two_terminal(&mut self.g, n1, n2, g);
        Ok(())
    }

    pub fn stamp_resistor(
        &mut self,
        n1: Option<usize>,
        n2: Option<usize>,
        ohms: f64,
    ) -> Result<()> {
        if !(ohms > 0.0) {
            bail!("Resistance must be positive; got {ohms}.");
        }
        self.stamp_conductance(n1, n2, 1.0 / ohms)
    }

    pub fn stamp_capacitance(
        &mut self,
        n1: Option<usize>,
        n2: Option<usize>,
        farads: f64,
    ) -> Result<()> {
        check_finite("capacitance", farads)?;
        self.check_nodes(&[n1, n2])?;
        stamp_two_terminal(&mut self.c, n1, n2, farads);
        Ok(())
    }

    /// Voltage-controlled current source: `gm * (V(ctrl_p) - V(ctrl_n))`
    /// flows from `out_p` to `out_n` through the source.
    pub fn stamp_transconductance(
        &mut self,
        out_p: Option<usize>,
        out_n: Option<usize>,
        ctrl_p: Option<usize>,
        ctrl_n: Option<usize>,
        gm: f64,
    ) -> Result<()> {
        check_finite("transconductance", gm)?;
        self.check_nodes(&[out_p, out_n, ctrl_p, ctrl_n])?;
        for (row, row_sign) in [(out_p, 1.0), (out_n, -1.0)] {
            for (col, col_sign) in [(ctrl_p, 1.0), (ctrl_n, -1.0)] {
                if let (Some(i), Some(j)) = (row, col) {
                    self.g.push(i, j, row_sign * col_sign * gm);
                }
            }
        }
        Ok(())
    }

    pub fn conductance_matrix(&self) -> DMatrix<f64> {
        convert_coo_dense(&self.g)
    }

    pub fn capacitance_matrix(&self) -> DMatrix<f64> {
        convert_coo_dense(&self.c)
    }

    /// Oracle for `det(G + sC)`.
    pub fn pole_oracle(&self) -> NetworkOracle {
        NetworkOracle {
            g: self.conductance_matrix(),
            c: self.capacitance_matrix(),
            sign: 1.0,
        }
    }

    /// Oracle for the cofactor of entry (`input`, `output`) of `G + sC`.
    pub fn zero_oracle(&self, input: usize, output: usize) -> Result<NetworkOracle> {
        self.check_nodes(&[Some(input), Some(output)])?;
        let minor = |m: DMatrix<f64>| m.remove_row(input).remove_column(output);
        Ok(NetworkOracle {
            g: minor(self.conductance_matrix()),
            c: minor(self.capacitance_matrix()),
            sign: if (input + output) % 2 == 0 { 1.0 } else { -1.0 },
        })
    }

    fn check_nodes(&self, nodes: &[Option<usize>]) -> Result<()> {
        for node in nodes.iter().flatten() {
            if *node >= self.nodes {
                bail!(
                    "Node {node} is out of range for a network with {} nodes.",
                    self.nodes
                );
            }
        }
        Ok(())
    }
}

fn check_finite(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        bail!("{what} must be finite; got {value}.");
    }
    Ok(())
}

fn stamp_two_terminal(
    matrix: &mut CooMatrix<f64>,
    n1: Option<usize>,
    n2: Option<usize>,
    value: f64,
) {
    if let Some(i) = n1 {
        matrix.push(i, i, value);
    }
    if let Some(j) = n2 {
        matrix.push(j, j, value);
    }
    if let (Some(i), Some(j)) = (n1, n2) {
        matrix.push(i, j, -value);
        matrix.push(j, i, -value);
    }
}

/// Determinant of `sign * (G + sC)`, evaluated by LU factorization.
#[derive(Debug, Clone)]
pub struct NetworkOracle {
    g: DMatrix<f64>,
    c: DMatrix<f64>,
    sign: f64,
}

impl TransferOracle for NetworkOracle {
    fn size(&self) -> usize {
        self.g.nrows()
    }

    fn evaluate(&mut self, s: Complex64) -> std::result::Result<Evaluation, OracleError> {
        if self.g.nrows() == 0 {
            return Ok(Evaluation::from_complex(Complex64::new(self.sign, 0.0)));
        }
        let y = self.g.map(|v| Complex64::new(v, 0.0)) + self.c.map(|v| Complex64::new(v, 0.0)) * s;
        let lu = y.lu();
        if !lu.is_invertible() {
            return Ok(Evaluation::Singular);
        }
        let u = lu.u();
        let parity: Complex64 = lu.p().determinant();
        let det = (0..u.nrows()).fold(
            ScaledComplex::new(parity * self.sign),
            |acc, i| acc * ScaledComplex::new(u[(i, i)]),
        );
        if det.is_finite() {
            Ok(Evaluation::Value(det))
        } else {
            Err(OracleError::Failed(format!(
                "determinant overflowed at s = {s}"
            )))
        }
    }
}

impl NetworkOracle {
    /// Plain determinant, for checks outside the search.
    pub fn determinant(&mut self, s: Complex64) -> std::result::Result<Complex64, OracleError> {
        match self.evaluate(s)? {
            Evaluation::Value(value) => Ok(value.to_complex()),
            Evaluation::Singular => Ok(Complex64::new(0.0, 0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two RC sections: node 0 to ground through g1 and c1, g2 from 0 to 1, c2 from 1 to ground.
    fn ladder() -> LinearNetwork {
        let mut net = LinearNetwork::new(2).expect("network");
        net.stamp_conductance(Some(0), None, 1.0).expect("g1");
        net.stamp_capacitance(Some(0), None, 1.0).expect("c1");
        net.stamp_conductance(Some(0), Some(1), 1.0).expect("g2");
        net.stamp_capacitance(Some(1), None, 1.0).expect("c2");
        net
    }

    #[test]
    fn stamps_accumulate_into_dense_matrices() {
        let g = ladder().conductance_matrix();
        assert_eq!(g[(0, 0)], 2.0);
        assert_eq!(g[(0, 1)], -1.0);
        assert_eq!(g[(1, 0)], -1.0);
        assert_eq!(g[(1, 1)], 1.0);
        let c = ladder().capacitance_matrix();
        assert_eq!(c[(0, 0)], 1.0);
        assert_eq!(c[(0, 1)], 0.0);
    }

    #[test]
    fn pole_oracle_is_the_admittance_determinant() {
        let mut oracle = ladder().pole_oracle();
        assert_eq!(oracle.size(), 2);
        for s in [Complex64::new(0.5, 0.0), Complex64::new(-1.0, 2.0)] {
            // (2 + s)(1 + s) - 1
            let expected = s * s + 3.0 * s + 1.0;
            let det = oracle.determinant(s).expect("determinant");
            assert!((det - expected).norm() < 1e-12, "{det} vs {expected}");
        }
    }

    #[test]
    fn zero_oracle_uses_signed_cofactor() {
        let net = ladder();
        let mut through = net.zero_oracle(0, 1).expect("cofactor");
        assert_eq!(through.size(), 1);
        let value = through.determinant(Complex64::new(3.0, 0.0)).expect("det");
        assert!((value - Complex64::new(1.0, 0.0)).norm() < 1e-12);

        let mut driving = net.zero_oracle(1, 1).expect("cofactor");
        let value = driving.determinant(Complex64::new(-2.0, 0.0)).expect("det");
        assert!(value.norm() < 1e-12);
    }

    #[test]
    fn singular_admittance_is_reported() {
        let mut net = LinearNetwork::new(1).expect("network");
        net.stamp_capacitance(Some(0), None, 1e-6).expect("cap");
        let mut oracle = net.pole_oracle();
        assert_eq!(oracle.evaluate(Complex64::new(0.0, 0.0)), Ok(Evaluation::Singular));
        assert!(matches!(
            oracle.evaluate(Complex64::new(1.0, 0.0)),
            Ok(Evaluation::Value(_))
        ));
    }

    #[test]
    fn transconductance_stamps_four_entries() {
        let mut net = LinearNetwork::new(2).expect("network");
        net.stamp_transconductance(Some(1), None, Some(0), None, 0.5)
            .expect("vccs");
        let g = net.conductance_matrix();
        assert_eq!(g[(1, 0)], 0.5);
        assert_eq!(g[(0, 0)], 0.0);
        assert_eq!(g[(0, 1)], 0.0);
    }

    #[test]
    fn invalid_nodes_and_values_are_rejected() {
        let mut net = LinearNetwork::new(2).expect("network");
        assert!(net.stamp_conductance(Some(2), None, 1.0).is_err());
        assert!(net.stamp_capacitance(Some(0), None, f64::INFINITY).is_err());
        assert!(net.stamp_resistor(Some(0), None, 0.0).is_err());
        assert!(net.zero_oracle(0, 5).is_err());
        assert!(LinearNetwork::new(0).is_err());
    }
}
