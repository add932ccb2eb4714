//! Circulant embedding of the retarded Green's function.
//!
//! The coupling between two boxes depends only on their offset, so for each
//! time shift $t$ it is a three-level Toeplitz matrix. Embedding it in a
//! circulant of twice the length per axis lets an FFT diagonalise it. Only
//! the first row is needed:
//!
//! $$ G_t[\mathbf{k}] = \frac{L_{t-n}(f)}{N(\Delta\mathbf{r}_\mathbf{k})},
//!    \qquad n + f = \frac{|\Delta\mathbf{r}_\mathbf{k}|}{c\,\Delta t} $$
//!
//! with $G_t = 0$ wherever $t - n$ falls outside the Lagrange stencil. An
//! axis offset $k$ is mirrored to $2n_a - k$; the offset $n_a$ itself has no
//! Toeplitz counterpart and stays zero.

use log::debug;
use ndarray::Array4;

use crate::grid::Grid;
use crate::interaction::{retardation_stencil, Normalization};
use crate::interpolation::UniformLagrangeSet;

/// First rows of the circulant coupling, shaped
/// [`Grid::circulant_shape`]`(c, dt, interp_order)`.
///
/// Shift 0 and the zero offset are left at zero: the first is non-causal and
/// the second is the singular self term.
pub fn build_circulant(
    grid: &Grid,
    c: f64,
    dt: f64,
    interp_order: usize,
    normalization: Normalization,
) -> Array4<f64> {
    let shape = grid.circulant_shape(c, dt, interp_order);
    let mut gmatrix = Array4::<f64>::zeros(shape);
    let mut lagrange = UniformLagrangeSet::new(interp_order);

    let dims = grid.dimensions().map(|d| d as usize);
    let origin = grid.spatial_coord_of_box(0);

    for box_idx in 1..grid.num_gridpoints() {
        let coord = grid.idx_to_coord(box_idx).map(|k| k as usize);
        let dr = grid.spatial_coord_of_box(box_idx) - origin;

        let n = retardation_stencil(&mut lagrange, dr.norm(), c, dt);
        let norm = normalization.apply(&dr);

        let xs = mirrored(coord.x, dims.x);
        let ys = mirrored(coord.y, dims.y);
        let zs = mirrored(coord.z, dims.z);

        for p in 0..=interp_order {
            let t = n + p as i64;
            if t <= 0 || t as usize >= shape[0] {
                continue;
            }
            let value = lagrange.evaluations[[0, p]] / norm;

            for &x in &xs {
                for &y in &ys {
                    for &z in &zs {
                        gmatrix[[t as usize, x, y, z]] = value;
                    }
                }
            }
        }
    }

    debug!("Circulant Green's table: shape {:?}, normalization {:?}", shape, normalization);
    gmatrix
}

/// Positions of axis offset `k` in a circulant of length `2n`.
fn mirrored(k: usize, n: usize) -> Vec<usize> {
    if k > 0 && k < n {
        vec![k, 2 * n - k]
    } else {
        vec![k]
    }
}
