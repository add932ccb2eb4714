//! Optical Bloch equations for two-level quantum dots.
//!
//! In the frame rotating at the laser frequency $\omega_L$, with ground-state
//! population $\rho_{00}$ and coherence $\rho_{01}$:
//!
//! $$ \dot\rho_{00} = \operatorname{Im}(\Omega\rho_{01}) + \frac{1 - \rho_{00}}{T_1} $$
//! $$ \dot\rho_{01} = i\Delta\rho_{01} + \frac{i}{2}\Omega^*(1 - 2\rho_{00}) - \frac{\rho_{01}}{T_2} $$
//!
//! where $\Delta = \omega_0 - \omega_L$ and the Rabi frequency
//! $\Omega = \mathbf{d}\cdot\mathbf{E}_\text{pulse} + g\,E_\text{int}$ combines
//! the incident pulse with the interaction field.

use ndarray::{array, Array1, ArrayView1};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::history::{RHO_00, RHO_01};
use crate::integrator::Rhs;
use crate::pulse::GaussianPulse;
use crate::types::QuantumDot;

/// Parameters shared by all dots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlochParams {
    /// Frequency $\omega_L$ of the rotating frame.
    #[serde(default)]
    pub laser_frequency: f64,
    /// Scale $g$ applied to the interaction field.
    #[serde(default = "default_coupling")]
    pub coupling: f64,
}

fn default_coupling() -> f64 {
    1.0
}

impl Default for BlochParams {
    fn default() -> Self {
        Self {
            laser_frequency: 0.0,
            coupling: default_coupling(),
        }
    }
}

pub struct BlochRhs {
    dots: Vec<QuantumDot>,
    pulse: Option<GaussianPulse>,
    params: BlochParams,
}

impl BlochRhs {
    /// `dots` must be in history order (i.e. after grid construction).
    pub fn new(dots: Vec<QuantumDot>, pulse: Option<GaussianPulse>, params: BlochParams) -> Self {
        Self { dots, pulse, params }
    }

    pub fn dots(&self) -> &[QuantumDot] {
        &self.dots
    }

    /// Rabi frequency of dot `emitter` at `time`.
    pub fn rabi_frequency(&self, emitter: usize, time: f64, field: Complex64) -> Complex64 {
        let dot = &self.dots[emitter];
        let drive = self
            .pulse
            .as_ref()
            .map_or(0.0, |p| dot.dipole.dot(&p.field(&dot.position, time)));
        Complex64::new(drive, 0.0) + field * self.params.coupling
    }
}

impl Rhs for BlochRhs {
    fn derivative(
        &self,
        emitter: usize,
        time: f64,
        solution: ArrayView1<'_, Complex64>,
        field: Complex64,
    ) -> Array1<Complex64> {
        let dot = &self.dots[emitter];
        let rabi = self.rabi_frequency(emitter, time, field);
        let detuning = dot.frequency - self.params.laser_frequency;
        let i = Complex64::i();

        let rho_00 = solution[RHO_00];
        let rho_01 = solution[RHO_01];

        let d00 = (rabi * rho_01).im + (1.0 - rho_00.re) / dot.t1();
        let d01 = i * detuning * rho_01 + i * rabi.conj() * (1.0 - 2.0 * rho_00) / 2.0 - rho_01 / dot.t2();

        array![Complex64::new(d00, 0.0), d01]
    }
}
