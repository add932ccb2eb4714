//! Incident Gaussian pulse.
//!
//! A plane-wave pulse travelling along $\mathbf{k}$ with carrier frequency
//! $\omega_L$. In the frame rotating at $\omega_L$ only the slowly varying
//! envelope survives:
//!
//! $$ \mathbf{E}(\mathbf{r}, t) = E_0\,\hat{\mathbf{e}}
//!    \exp\left[-\frac{1}{2}\left(\frac{t - \mathbf{k}\cdot\mathbf{r}/\omega_L - t_0}{\sigma}\right)^2\right] $$

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianPulse {
    /// Peak amplitude $E_0$.
    pub amplitude: f64,
    /// Time $t_0$ at which the peak crosses the origin.
    pub delay: f64,
    /// Temporal width $\sigma$.
    pub width: f64,
    /// Carrier (laser) angular frequency $\omega_L$.
    pub frequency: f64,
    /// Wavevector $\mathbf{k}$.
    pub wavevector: Vector3<f64>,
    /// Unit polarisation $\hat{\mathbf{e}}$.
    pub polarization: Vector3<f64>,
}

impl GaussianPulse {
    /// Time at which the pulse peak reaches `r`, relative to its origin crossing.
    fn arrival(&self, r: &Vector3<f64>) -> f64 {
        if self.frequency == 0.0 {
            0.0
        } else {
            self.wavevector.dot(r) / self.frequency
        }
    }

    /// Scalar envelope at `r`, `t`.
    pub fn envelope(&self, r: &Vector3<f64>, t: f64) -> f64 {
        let u = (t - self.arrival(r) - self.delay) / self.width;
        self.amplitude * (-0.5 * u * u).exp()
    }

    /// Rotating-frame field vector at `r`, `t`.
    pub fn field(&self, r: &Vector3<f64>, t: f64) -> Vector3<f64> {
        self.polarization * self.envelope(r, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pulse() -> GaussianPulse {
        GaussianPulse {
            amplitude: 2.0,
            delay: 5.0,
            width: 1.0,
            frequency: 2.0,
            wavevector: Vector3::new(0.0, 0.0, 2.0),
            polarization: Vector3::x(),
        }
    }

    #[test]
    fn test_peak_at_delay() {
        let p = pulse();
        assert_abs_diff_eq!(p.envelope(&Vector3::zeros(), 5.0), 2.0);
        assert_abs_diff_eq!(p.envelope(&Vector3::zeros(), 6.0), 2.0 * (-0.5f64).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_peak_is_retarded_along_wavevector() {
        let p = pulse();
        // |k| / w = 1, so the peak reaches z = 3 three time units later.
        let r = Vector3::new(0.0, 0.0, 3.0);
        assert_abs_diff_eq!(p.envelope(&r, 8.0), 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(p.field(&r, 8.0), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-14);
    }
}
