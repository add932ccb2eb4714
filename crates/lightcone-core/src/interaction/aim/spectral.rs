//! Spectral (diagonalised) form of the circulant Green's table.
//!
//! Each time layer of the circulant is real, so its 3D transform obeys
//! $\hat G(\mathbf{k}) = \overline{\hat G(-\mathbf{k})}$ and only the bins
//! $k_z \in [0, n_z]$ along the last axis are stored. The table is built
//! once and shared read-only between engines.

use log::info;
use ndarray::{s, Array3, Array4, Axis};
use num_complex::Complex64;

use lightcone_compute::{Direction, SpectralBackend};

use crate::error::SimulationError;

#[derive(Debug, Clone)]
pub struct SpectralTable {
    /// Shape `[T, 2nx, 2ny, nz + 1]`.
    data: Array4<Complex64>,
    /// Full circulant lengths `[2nx, 2ny, 2nz]`.
    full: [usize; 3],
}

impl SpectralTable {
    /// Transform every time layer of `circulant` (shape `[T, 2nx, 2ny, 2nz]`).
    pub fn from_circulant(
        circulant: &Array4<f64>,
        backend: &dyn SpectralBackend,
    ) -> Result<Self, SimulationError> {
        let shape = circulant.shape();
        let full = [shape[1], shape[2], shape[3]];
        if full.iter().any(|&n| n == 0 || n % 2 != 0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "circulant spatial lengths must be even, got {:?}",
                full
            )));
        }
        let half = full[2] / 2 + 1;
        let mut data = Array4::zeros((shape[0], full[0], full[1], half));

        for (t, layer) in circulant.axis_iter(Axis(0)).enumerate() {
            let mut spectrum: Array3<Complex64> = layer.mapv(|v| Complex64::new(v, 0.0));

            backend.transform_axis(spectrum.view_mut(), Axis(2), Direction::Forward)?;
            let mut folded = spectrum.slice(s![.., .., ..half]).to_owned();
            backend.transform_axis(folded.view_mut(), Axis(1), Direction::Forward)?;
            backend.transform_axis(folded.view_mut(), Axis(0), Direction::Forward)?;

            data.index_axis_mut(Axis(0), t).assign(&folded);
        }

        info!(
            "Spectral Green's table ready: {} time shifts x {:?} bins ({})",
            shape[0],
            data.shape()[1..].to_vec(),
            backend.device_info().name
        );

        Ok(Self { data, full })
    }

    /// Number of time shifts.
    pub fn time_steps(&self) -> usize {
        self.data.shape()[0]
    }

    /// Full (unfolded) spatial lengths `[2nx, 2ny, 2nz]`.
    pub fn spatial_shape(&self) -> [usize; 3] {
        self.full
    }

    /// The stored half spectrum.
    pub fn data(&self) -> &Array4<Complex64> {
        &self.data
    }

    /// Spectral coefficient at any bin of the full spectrum.
    #[inline]
    pub fn coefficient(&self, t: usize, kx: usize, ky: usize, kz: usize) -> Complex64 {
        let [nx, ny, nz] = self.full;
        if kz <= nz / 2 {
            self.data[[t, kx, ky, kz]]
        } else {
            self.data[[t, (nx - kx) % nx, (ny - ky) % ny, nz - kz]].conj()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::interaction::aim::circulant::build_circulant;
    use crate::interaction::Normalization;
    use approx::assert_abs_diff_eq;
    use lightcone_compute::CpuBackend;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    fn synthetic(shape: [usize; 4]) -> Array4<f64> {
        Array4::from_shape_fn(shape, |(t, x, y, z)| {
            ((t + 1) as f64 * 0.3 + x as f64 - 0.7 * y as f64 + (z * z) as f64 * 0.11).sin()
        })
    }

    fn brute_force(g: &Array4<f64>, t: usize, k: [usize; 3]) -> Complex64 {
        let n = [g.shape()[1], g.shape()[2], g.shape()[3]];
        let mut acc = Complex64::new(0.0, 0.0);
        for x in 0..n[0] {
            for y in 0..n[1] {
                for z in 0..n[2] {
                    let phase = -2.0
                        * PI
                        * ((k[0] * x) as f64 / n[0] as f64
                            + (k[1] * y) as f64 / n[1] as f64
                            + (k[2] * z) as f64 / n[2] as f64);
                    acc += Complex64::from_polar(g[[t, x, y, z]], phase);
                }
            }
        }
        acc
    }

    #[test]
    fn test_matches_dft_over_full_spectrum() {
        let g = synthetic([2, 4, 6, 4]);
        let table = SpectralTable::from_circulant(&g, &CpuBackend::new()).unwrap();
        assert_eq!(table.data().shape(), &[2, 4, 6, 3]);

        for t in 0..2 {
            for kx in 0..4 {
                for ky in 0..6 {
                    for kz in 0..4 {
                        let expected = brute_force(&g, t, [kx, ky, kz]);
                        let got = table.coefficient(t, kx, ky, kz);
                        assert_abs_diff_eq!(got.re, expected.re, epsilon = 1e-10);
                        assert_abs_diff_eq!(got.im, expected.im, epsilon = 1e-10);
                    }
                }
            }
        }
    }

    #[test]
    fn test_conjugate_symmetry() {
        let g = synthetic([1, 4, 4, 6]);
        let table = SpectralTable::from_circulant(&g, &CpuBackend::new()).unwrap();
        // kz = 0 and kz = nz are self-conjugate planes.
        for &kz in &[0usize, 3] {
            for kx in 0..4 {
                for ky in 0..4 {
                    let a = table.coefficient(0, kx, ky, kz);
                    let b = table.coefficient(0, (4 - kx) % 4, (4 - ky) % 4, (6 - kz) % 6);
                    assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-10);
                    assert_abs_diff_eq!(a.im, -b.im, epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_symmetric_kernel_has_real_spectrum() {
        let grid = Grid::from_dimensions(Vector3::repeat(1.0), Vector3::new(3, 4, 2), Vector3::zeros()).unwrap();
        let g = build_circulant(&grid, 1.0, 1.0, 3, Normalization::Distance);
        let table = SpectralTable::from_circulant(&g, &CpuBackend::new()).unwrap();
        assert!(table.data().iter().all(|c| c.im.abs() < 1e-10));
    }

    #[test]
    fn test_odd_lengths_rejected() {
        let g = Array4::<f64>::zeros((1, 4, 3, 4));
        assert!(SpectralTable::from_circulant(&g, &CpuBackend::new()).is_err());
    }
}
