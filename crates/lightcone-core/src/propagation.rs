//! Frame propagators.
//!
//! Solutions are usually stored in a frame rotating at the laser frequency
//! $\omega_L$, while the retarded field propagates in the lab frame. A
//! propagator supplies the phase that takes a history value back to the lab
//! frame at its own time; interactions apply it to each source layer and
//! undo it at the observation time.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Time-dependent phase between the stored frame and the lab frame.
pub trait FramePropagator: Send + Sync {
    /// Phase that maps a stored value at `time` into the lab frame.
    fn lab_phase(&self, time: f64) -> Complex64;
}

/// Frame rotating at angular frequency `frequency`: phase $e^{-i\omega t}$.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatingFramePropagator {
    pub frequency: f64,
}

impl RotatingFramePropagator {
    pub fn new(frequency: f64) -> Self {
        Self { frequency }
    }
}

impl FramePropagator for RotatingFramePropagator {
    fn lab_phase(&self, time: f64) -> Complex64 {
        Complex64::from_polar(1.0, -self.frequency * time)
    }
}
