//! Retarded interactions between emitters.
//!
//! The [`Interaction`] trait defines the interface every field source
//! implements. [`aim::AimInteraction`] evaluates the retarded coupling on a
//! grid with FFT-diagonalised kernels; [`direct::DirectInteraction`] sums
//! every emitter pair explicitly and serves as its reference.
//!
//! Both share the same retardation rule: a source at distance $r$ is read
//! at the fractional delay $r / (c\,\Delta t)$ through a Lagrange stencil on
//! the steps just before the retarded time, and the coupling is divided by a
//! [`Normalization`] of the separation.

pub mod aim;
pub mod direct;

use nalgebra::Vector3;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::history::History;
use crate::interpolation::{split_double, UniformLagrangeSet};

/// A field source evaluated from the solution history.
pub trait Interaction {
    /// Field seen by every emitter at time step `step`.
    ///
    /// Only history entries strictly before `step` are read, so calling this
    /// repeatedly for the same step without touching those entries returns
    /// identical results.
    fn evaluate(
        &mut self,
        history: &History,
        step: i64,
    ) -> Result<&Array1<Complex64>, SimulationError>;

    /// How many steps into the past `evaluate(step)` reaches.
    fn history_depth(&self) -> usize;

    /// Human-readable name of the interaction.
    fn name(&self) -> &str;
}

/// Scalar weight of a separation vector; couplings are divided by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// $1$
    #[default]
    Unit,
    /// $\|\mathbf{r}\|$
    Distance,
    /// $4\pi\|\mathbf{r}\|$, the Green's function of the Poisson equation.
    Poisson,
}

impl Normalization {
    pub fn apply(&self, r: &Vector3<f64>) -> f64 {
        match self {
            Self::Unit => 1.0,
            Self::Distance => r.norm(),
            Self::Poisson => 4.0 * std::f64::consts::PI * r.norm(),
        }
    }
}

/// Fill `lagrange.evaluations` for a source `distance` away and return the
/// whole-step part of the delay.
///
/// Weight `p` of row 0 then belongs to time shift `n + p`.
pub(crate) fn retardation_stencil(
    lagrange: &mut UniformLagrangeSet,
    distance: f64,
    c: f64,
    dt: f64,
) -> i64 {
    let (n, frac) = split_double(distance / (c * dt));
    lagrange.evaluate_derivative_table_at_x(frac, dt);
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalizations() {
        let r = Vector3::new(3.0, 0.0, 4.0);
        assert_eq!(Normalization::Unit.apply(&r), 1.0);
        assert_abs_diff_eq!(Normalization::Distance.apply(&r), 5.0);
        assert_abs_diff_eq!(Normalization::Poisson.apply(&r), 20.0 * std::f64::consts::PI);
    }

    #[test]
    fn test_normalization_names() {
        let n: Normalization = serde_json::from_str("\"poisson\"").unwrap();
        assert_eq!(n, Normalization::Poisson);
    }

    #[test]
    fn test_retardation_on_step() {
        let mut lagrange = UniformLagrangeSet::new(3);
        let n = retardation_stencil(&mut lagrange, 6.0, 2.0, 0.5);
        assert_eq!(n, 6);
        assert_abs_diff_eq!(lagrange.evaluations[[0, 0]], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(lagrange.evaluations[[0, 1]], 0.0, epsilon = 1e-14);
    }
}
