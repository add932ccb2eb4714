//! Lagrange interpolation for retarded-time lookups.
//!
//! A retarded delay $r / c$ rarely lands on a time step, so values are read
//! off the history by interpolating between neighbouring steps:
//!
//! $$ f(t_n + x\,\Delta t) \approx \sum_{p=0}^{P} L_p(x)\, f(t_{n+p}) $$
//!
//! The same bases, integrated exactly, give the Adams predictor and corrector
//! weights used by [`crate::integrator`].

use ndarray::Array2;

use crate::error::SimulationError;

/// Split `x` into its floor and the fractional remainder in `[0, 1)`.
pub fn split_double(x: f64) -> (i64, f64) {
    let n = x.floor();
    (n as i64, x - n)
}

/// Lagrange basis polynomials over a set of distinct nodes.
///
/// Each basis polynomial is stored in monomial form, so derivatives and
/// integrals are exact.
#[derive(Debug, Clone)]
pub struct LagrangeBasis {
    nodes: Vec<f64>,
    /// `coefficients[[j, m]]` is the coefficient of $x^m$ in $L_j$.
    coefficients: Array2<f64>,
}

impl LagrangeBasis {
    /// Build the basis for `nodes`.
    ///
    /// Fails on an empty node set or on repeated nodes.
    pub fn new(nodes: &[f64]) -> Result<Self, SimulationError> {
        if nodes.is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "Lagrange basis needs at least one node".into(),
            ));
        }
        for (i, a) in nodes.iter().enumerate() {
            if nodes[i + 1..].iter().any(|b| (a - b).abs() < 1e-14) {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "Lagrange nodes must be distinct, {} repeats",
                    a
                )));
            }
        }
        Ok(Self::from_distinct_nodes(nodes.to_vec()))
    }

    fn from_distinct_nodes(nodes: Vec<f64>) -> Self {
        let n = nodes.len();
        let mut coefficients = Array2::zeros((n, n));

        for (j, &xj) in nodes.iter().enumerate() {
            let mut poly = vec![0.0; n];
            poly[0] = 1.0;
            let mut degree = 0;

            for (k, &xk) in nodes.iter().enumerate() {
                if k == j {
                    continue;
                }
                // poly <- poly * (x - xk) / (xj - xk)
                let denom = xj - xk;
                for m in (0..=degree + 1).rev() {
                    let shifted = if m > 0 { poly[m - 1] } else { 0.0 };
                    let current = if m <= degree { poly[m] } else { 0.0 };
                    poly[m] = (shifted - xk * current) / denom;
                }
                degree += 1;
            }

            for (m, c) in poly.into_iter().enumerate() {
                coefficients[[j, m]] = c;
            }
        }

        Self {
            nodes,
            coefficients,
        }
    }

    /// Polynomial degree of each basis function.
    pub fn order(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// $L_j(x)$.
    pub fn evaluate(&self, j: usize, x: f64) -> f64 {
        self.coefficients
            .row(j)
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// $L_j^{(d)}(x)$, the `d`-th derivative.
    pub fn derivative(&self, j: usize, d: usize, x: f64) -> f64 {
        let row = self.coefficients.row(j);
        let mut acc = 0.0;
        for m in (d..row.len()).rev() {
            acc = acc * x + row[m] * falling_factorial(m, d);
        }
        acc
    }

    /// $\int_a^b L_j(x)\,dx$.
    pub fn integral(&self, j: usize, a: f64, b: f64) -> f64 {
        self.coefficients
            .row(j)
            .iter()
            .enumerate()
            .map(|(m, &c)| {
                let p = (m + 1) as i32;
                c * (b.powi(p) - a.powi(p)) / p as f64
            })
            .sum()
    }
}

/// $m! / (m - d)!$
fn falling_factorial(m: usize, d: usize) -> f64 {
    ((m - d + 1)..=m).map(|k| k as f64).product()
}

/// Lagrange basis on the uniform nodes $0, 1, \dots, P$ with a reusable
/// derivative table.
#[derive(Debug, Clone)]
pub struct UniformLagrangeSet {
    basis: LagrangeBasis,
    /// `evaluations[[d, p]]` = $L_p^{(d)}(x) / \Delta t^d$ at the last query.
    pub evaluations: Array2<f64>,
}

impl UniformLagrangeSet {
    pub fn new(order: usize) -> Self {
        let nodes = (0..=order).map(|p| p as f64).collect();
        Self {
            basis: LagrangeBasis::from_distinct_nodes(nodes),
            evaluations: Array2::zeros((order + 1, order + 1)),
        }
    }

    pub fn order(&self) -> usize {
        self.basis.order()
    }

    /// Fill [`UniformLagrangeSet::evaluations`] at fractional offset `x`.
    ///
    /// Row `d` holds the `d`-th time derivative of each basis function, so
    /// it is divided by `dt^d`. Row 0 is the plain interpolation weight.
    pub fn evaluate_derivative_table_at_x(&mut self, x: f64, dt: f64) {
        let order = self.order();
        let mut scale = 1.0;
        for d in 0..=order {
            for p in 0..=order {
                self.evaluations[[d, p]] = self.basis.derivative(p, d, x) * scale;
            }
            scale /= dt;
        }
    }
}
