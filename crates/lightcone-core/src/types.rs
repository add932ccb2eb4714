//! Core types shared across the lightcone framework.
//!
//! The interaction engines only ever need an emitter's position; everything
//! else about a quantum dot is consumed by the right-hand side of the Bloch
//! equations.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Anything with a fixed position that can radiate into, and observe, the
/// retarded field.
pub trait Emitter {
    /// Position in 3D space (simulation length units).
    fn position(&self) -> Vector3<f64>;
}

impl Emitter for Vector3<f64> {
    fn position(&self) -> Vector3<f64> {
        *self
    }
}

/// A two-level quantum dot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumDot {
    /// Position in 3D space.
    pub position: Vector3<f64>,
    /// Transition (angular) frequency $\omega_0$.
    pub frequency: f64,
    /// Transition dipole moment.
    pub dipole: Vector3<f64>,
    /// Relaxation times $[T_1, T_2]$. Infinite values switch a channel off.
    #[serde(default = "no_damping")]
    pub damping: [f64; 2],
}

fn no_damping() -> [f64; 2] {
    [f64::INFINITY, f64::INFINITY]
}

impl QuantumDot {
    /// Create an undamped, resonant-at-zero dot at `position`.
    pub fn new(position: Vector3<f64>, dipole: Vector3<f64>) -> Self {
        Self {
            position,
            frequency: 0.0,
            dipole,
            damping: no_damping(),
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_damping(mut self, t1: f64, t2: f64) -> Self {
        self.damping = [t1, t2];
        self
    }

    /// Population relaxation time $T_1$.
    pub fn t1(&self) -> f64 {
        self.damping[0]
    }

    /// Dephasing time $T_2$.
    pub fn t2(&self) -> f64 {
        self.damping[1]
    }
}

impl Emitter for QuantumDot {
    fn position(&self) -> Vector3<f64> {
        self.position
    }
}
