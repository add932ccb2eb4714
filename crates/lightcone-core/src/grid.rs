//! Padded box lattice covering every emitter.
//!
//! Space is divided into axis-aligned boxes of size `spacing`. A box is named
//! either by its integer coordinate (relative to the lower grid bound) or by
//! a scalar index under the row-major convention
//!
//! $$ \text{idx} = z + n_z (y + n_y x) $$
//!
//! which is also the memory order of an `ndarray` of shape `(nx, ny, nz)`.
//! The grid is immutable after construction.

use std::ops::Range;

use log::{debug, info};
use nalgebra::Vector3;

use crate::error::SimulationError;
use crate::types::Emitter;

/// Signed offset of the `n`-th stencil point along one axis.
///
/// The sequence `0, +1, -1, +2, -2, ...` keeps an expansion stencil as
/// centred as its point count allows.
pub fn grid_sequence(n: usize) -> i64 {
    let n = n as i64;
    if n % 2 == 0 {
        -n / 2
    } else {
        (n + 1) / 2
    }
}

/// A regular grid of boxes enclosing a set of emitters.
#[derive(Debug, Clone)]
pub struct Grid {
    spacing: Vector3<f64>,
    /// Inclusive lower and exclusive upper box coordinate.
    bounds: [Vector3<i64>; 2],
    dimensions: Vector3<i64>,
    num_gridpoints: usize,
    max_diagonal: f64,
    /// Contiguous emitter range of every box (after sorting).
    boxes: Vec<Range<usize>>,
}

impl Grid {
    /// Build the smallest grid enclosing `emitters`, padded by `padding` boxes
    /// below and `padding + 1` boxes above.
    ///
    /// The extra box above guarantees that an emitter sitting exactly on the
    /// upper boundary still has a containing box.
    ///
    /// The emitters are stably sorted by box index so that the emitters of
    /// each box form a contiguous range (see [`Grid::box_contents`]). Callers
    /// must not rely on emitter indices from before construction.
    pub fn new<E: Emitter>(
        spacing: Vector3<f64>,
        emitters: &mut [E],
        padding: usize,
    ) -> Result<Self, SimulationError> {
        validate_spacing(&spacing)?;

        let first = emitters.first().ok_or_else(|| {
            SimulationError::InvalidConfiguration("cannot build a grid around zero emitters".into())
        })?;
        if let Some(bad) = emitters.iter().position(|e| !e.position().iter().all(|v| v.is_finite())) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "emitter {} has a non-finite position {:?}",
                bad,
                emitters[bad].position()
            )));
        }
        let start = floor_div(&first.position(), &spacing);

        let (lo, hi) = emitters.iter().fold((start, start), |(lo, hi), e| {
            let c = floor_div(&e.position(), &spacing);
            (lo.zip_map(&c, i64::min), hi.zip_map(&c, i64::max))
        });

        let pad = padding as i64;
        let lower = lo - Vector3::repeat(pad);
        let upper = hi + Vector3::repeat(pad + 1);

        let mut grid = Self::with_bounds(spacing, [lower, upper])?;

        emitters.sort_by_key(|e| grid.associated_grid_index(&e.position()));
        let keys: Vec<usize> = emitters
            .iter()
            .map(|e| grid.associated_grid_index(&e.position()))
            .collect();
        grid.boxes = contiguous_ranges(&keys, grid.num_gridpoints);

        info!(
            "Grid: {}x{}x{} boxes ({} total) around {} emitters",
            grid.dimensions.x,
            grid.dimensions.y,
            grid.dimensions.z,
            grid.num_gridpoints,
            emitters.len()
        );
        debug!("Grid bounds: {:?} .. {:?}", grid.bounds[0], grid.bounds[1]);

        Ok(grid)
    }

    /// Build an emitter-free grid of `dimensions` boxes whose lower corner is
    /// box coordinate `origin`.
    pub fn from_dimensions(
        spacing: Vector3<f64>,
        dimensions: Vector3<i64>,
        origin: Vector3<i64>,
    ) -> Result<Self, SimulationError> {
        validate_spacing(&spacing)?;
        Self::with_bounds(spacing, [origin, origin + dimensions])
    }

    fn with_bounds(
        spacing: Vector3<f64>,
        bounds: [Vector3<i64>; 2],
    ) -> Result<Self, SimulationError> {
        let dimensions = bounds[1] - bounds[0];
        if dimensions.iter().any(|&d| d <= 0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "grid dimensions must be positive, got {:?}",
                dimensions
            )));
        }

        let num_gridpoints = dimensions.iter().product::<i64>() as usize;
        let max_diagonal = dimensions.map(|d| d as f64).component_mul(&spacing).norm();

        Ok(Self {
            spacing,
            bounds,
            dimensions,
            num_gridpoints,
            max_diagonal,
            boxes: vec![0..0; num_gridpoints],
        })
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    /// `[lower, upper)` box coordinates.
    pub fn bounds(&self) -> &[Vector3<i64>; 2] {
        &self.bounds
    }

    pub fn dimensions(&self) -> &Vector3<i64> {
        &self.dimensions
    }

    pub fn num_gridpoints(&self) -> usize {
        self.num_gridpoints
    }

    /// Euclidean length of the grid's body diagonal.
    pub fn max_diagonal(&self) -> f64 {
        self.max_diagonal
    }

    /// Absolute box coordinate containing `pos` (floor division, so negative
    /// positions round towards $-\infty$).
    pub fn grid_coordinate(&self, pos: &Vector3<f64>) -> Vector3<i64> {
        floor_div(pos, &self.spacing)
    }

    /// Scalar index of the box containing `pos`.
    pub fn associated_grid_index(&self, pos: &Vector3<f64>) -> usize {
        self.coord_to_idx(&(self.grid_coordinate(pos) - self.bounds[0]))
    }

    /// Scalar index of a coordinate relative to the lower bound.
    ///
    /// The coordinate must lie inside the grid; use
    /// [`Grid::checked_coord_to_idx`] when that is not known.
    #[inline]
    pub fn coord_to_idx(&self, coord: &Vector3<i64>) -> usize {
        debug_assert!(self.contains(coord), "coordinate {:?} outside grid", coord);
        let d = &self.dimensions;
        (coord.z + d.z * (coord.y + d.y * coord.x)) as usize
    }

    /// Like [`Grid::coord_to_idx`] but `None` for coordinates off the grid.
    pub fn checked_coord_to_idx(&self, coord: &Vector3<i64>) -> Option<usize> {
        self.contains(coord).then(|| self.coord_to_idx(coord))
    }

    /// Inverse of [`Grid::coord_to_idx`].
    #[inline]
    pub fn idx_to_coord(&self, idx: usize) -> Vector3<i64> {
        let d = &self.dimensions;
        let idx = idx as i64;
        let nynz = d.y * d.z;
        let x = idx.div_euclid(nynz);
        let rem = idx.rem_euclid(nynz);
        Vector3::new(x, rem.div_euclid(d.z), rem.rem_euclid(d.z))
    }

    /// Whether a relative coordinate lies in `[0, dimensions)`.
    pub fn contains(&self, coord: &Vector3<i64>) -> bool {
        coord
            .iter()
            .zip(self.dimensions.iter())
            .all(|(&c, &d)| (0..d).contains(&c))
    }

    /// Lower-corner position of a box; `associated_grid_index` maps it back
    /// to `box_id`.
    pub fn spatial_coord_of_box(&self, box_id: usize) -> Vector3<f64> {
        (self.idx_to_coord(box_id) + self.bounds[0])
            .map(|c| c as f64)
            .component_mul(&self.spacing)
    }

    /// Range of (sorted) emitter indices that fall inside box `box_id`.
    pub fn box_contents(&self, box_id: usize) -> Range<usize> {
        self.boxes[box_id].clone()
    }

    /// Number of whole time steps a signal at speed `c` needs to cross the
    /// grid diagonal. Always at least one.
    pub fn max_transit_steps(&self, c: f64, dt: f64) -> usize {
        ((self.max_diagonal / (c * dt)).ceil() as usize).max(1)
    }

    /// Shape `[time, 2nx, 2ny, 2nz]` of the circulant embedding, with `pad`
    /// extra time slots beyond the transit time.
    pub fn circulant_shape(&self, c: f64, dt: f64, pad: usize) -> [usize; 4] {
        [
            self.max_transit_steps(c, dt) + pad,
            2 * self.dimensions.x as usize,
            2 * self.dimensions.y as usize,
            2 * self.dimensions.z as usize,
        ]
    }

    /// The `(order + 1)^3` box indices of the expansion stencil around `pos`,
    /// in lexicographic order of the per-axis offsets from [`grid_sequence`].
    pub fn expansion_box_indices(
        &self,
        pos: &Vector3<f64>,
        order: usize,
    ) -> Result<Vec<usize>, SimulationError> {
        let origin = self.grid_coordinate(pos) - self.bounds[0];
        let mut indices = Vec::with_capacity((order + 1).pow(3));

        for nx in 0..=order {
            for ny in 0..=order {
                for nz in 0..=order {
                    let delta = Vector3::new(grid_sequence(nx), grid_sequence(ny), grid_sequence(nz));
                    let coord = origin + delta;
                    let idx = self.checked_coord_to_idx(&coord).ok_or(
                        SimulationError::StencilOutOfBounds {
                            coord: [coord.x, coord.y, coord.z],
                            dimensions: [self.dimensions.x, self.dimensions.y, self.dimensions.z],
                        },
                    )?;
                    indices.push(idx);
                }
            }
        }

        Ok(indices)
    }
}

fn validate_spacing(spacing: &Vector3<f64>) -> Result<(), SimulationError> {
    if spacing.iter().all(|&s| s.is_finite() && s > 0.0) {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfiguration(format!(
            "grid spacing must be positive and finite, got {:?}",
            spacing
        )))
    }
}

fn floor_div(pos: &Vector3<f64>, spacing: &Vector3<f64>) -> Vector3<i64> {
    pos.component_div(spacing).map(|v| v.floor() as i64)
}

/// Given sorted box keys, the emitter range of every box.
fn contiguous_ranges(keys: &[usize], num_boxes: usize) -> Vec<Range<usize>> {
    let mut boxes = vec![0..0; num_boxes];
    let mut start = 0;
    while start < keys.len() {
        let key = keys[start];
        let end = start + keys[start..].iter().take_while(|&&k| k == key).count();
        boxes[key] = start..end;
        start = end;
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Vector3<f64> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn test_grid_sequence_alternates() {
        let seq: Vec<i64> = (0..6).map(grid_sequence).collect();
        assert_eq!(seq, vec![0, 1, -1, 2, -2, 3]);
    }

    #[test]
    fn test_index_bijection() {
        let grid = Grid::from_dimensions(unit(), Vector3::new(3, 4, 5), Vector3::zeros()).unwrap();
        assert_eq!(grid.num_gridpoints(), 60);

        for idx in 0..grid.num_gridpoints() {
            assert_eq!(grid.coord_to_idx(&grid.idx_to_coord(idx)), idx);
        }
        for x in 0..3 {
            for y in 0..4 {
                for z in 0..5 {
                    let c = Vector3::new(x, y, z);
                    assert_eq!(grid.idx_to_coord(grid.coord_to_idx(&c)), c);
                }
            }
        }
    }

    #[test]
    fn test_row_major_convention() {
        let grid = Grid::from_dimensions(unit(), Vector3::new(2, 3, 4), Vector3::zeros()).unwrap();
        assert_eq!(grid.coord_to_idx(&Vector3::new(0, 0, 1)), 1);
        assert_eq!(grid.coord_to_idx(&Vector3::new(0, 1, 0)), 4);
        assert_eq!(grid.coord_to_idx(&Vector3::new(1, 0, 0)), 12);
    }

    #[test]
    fn test_floor_handles_negative_positions() {
        let grid = Grid::from_dimensions(unit(), Vector3::new(4, 4, 4), Vector3::repeat(-2)).unwrap();
        assert_eq!(grid.grid_coordinate(&Vector3::new(-0.5, 0.5, -1.0)), Vector3::new(-1, 0, -1));
    }

    #[test]
    fn test_padding_contains_every_emitter() {
        let mut points = vec![
            Vector3::new(-2.5, 0.1, 3.9),
            Vector3::new(1.2, -0.7, 0.0),
            Vector3::new(0.0, 2.0, -4.2),
        ];
        let grid = Grid::new(Vector3::new(0.5, 1.0, 2.0), &mut points, 2).unwrap();
        let [lo, hi] = *grid.bounds();

        for p in &points {
            let c = grid.grid_coordinate(p);
            for axis in 0..3 {
                assert!(lo[axis] < c[axis] && c[axis] < hi[axis], "{:?} not inside {:?}..{:?}", c, lo, hi);
            }
        }
        assert_eq!(lo, Vector3::new(-5 - 2, -1 - 2, -3 - 2));
        assert_eq!(hi, Vector3::new(2 + 3, 2 + 3, 1 + 3));
    }

    #[test]
    fn test_corner_emitters_on_grid() {
        let mut points = vec![Vector3::zeros(), Vector3::new(4.0, 4.0, 4.0)];
        let grid = Grid::new(unit(), &mut points, 0).unwrap();

        assert_eq!(*grid.dimensions(), Vector3::new(5, 5, 5));
        assert_eq!(grid.num_gridpoints(), 125);
        assert_eq!(points[1], grid.spatial_coord_of_box(grid.num_gridpoints() - 1));
        assert_eq!(grid.max_transit_steps(1.0, 1.0), 9);
        assert_eq!(grid.circulant_shape(1.0, 1.0, 3), [12, 10, 10, 10]);
    }

    #[test]
    fn test_spatial_coord_round_trip() {
        let grid = Grid::from_dimensions(Vector3::new(0.5, 0.25, 2.0), Vector3::new(3, 2, 4), Vector3::new(-1, 2, -3))
            .unwrap();
        for idx in 0..grid.num_gridpoints() {
            assert_eq!(grid.associated_grid_index(&grid.spatial_coord_of_box(idx)), idx);
        }
    }

    #[test]
    fn test_emitters_sorted_into_contiguous_boxes() {
        let mut points = vec![
            Vector3::new(2.5, 0.5, 0.5),
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(2.2, 0.1, 0.9),
            Vector3::new(0.1, 0.2, 0.3),
        ];
        let grid = Grid::new(unit(), &mut points, 0).unwrap();

        let keys: Vec<usize> = points.iter().map(|p| grid.associated_grid_index(p)).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        // Stable: original relative order within a box is preserved.
        assert_eq!(points[0], Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(points[2], Vector3::new(2.5, 0.5, 0.5));

        let first = grid.associated_grid_index(&points[0]);
        let last = grid.associated_grid_index(&points[3]);
        assert_eq!(grid.box_contents(first), 0..2);
        assert_eq!(grid.box_contents(last), 2..4);
        assert!(grid.box_contents(grid.coord_to_idx(&Vector3::new(1, 0, 0))).is_empty());
    }

    #[test]
    fn test_expansion_stencil() {
        let mut points = vec![Vector3::new(1.5, 1.5, 1.5), Vector3::new(3.5, 3.5, 3.5)];
        let grid = Grid::new(unit(), &mut points, 2).unwrap();

        let p = points[0];
        let zeroth = grid.expansion_box_indices(&p, 0).unwrap();
        assert_eq!(zeroth, vec![grid.associated_grid_index(&p)]);

        let first = grid.expansion_box_indices(&p, 1).unwrap();
        assert_eq!(first.len(), 8);
        let origin = grid.grid_coordinate(&p) - grid.bounds()[0];
        assert_eq!(first[1], grid.coord_to_idx(&(origin + Vector3::new(0, 0, 1))));
        assert_eq!(first[7], grid.coord_to_idx(&(origin + Vector3::new(1, 1, 1))));

        assert_eq!(grid.expansion_box_indices(&p, 3).unwrap().len(), 64);
    }

    #[test]
    fn test_stencil_off_grid_is_an_error() {
        let mut points = vec![Vector3::zeros(), Vector3::new(2.0, 2.0, 2.0)];
        let grid = Grid::new(unit(), &mut points, 0).unwrap();
        let err = grid.expansion_box_indices(&points[0], 3);
        assert!(matches!(err, Err(SimulationError::StencilOutOfBounds { .. })));
    }

    #[test]
    fn test_invalid_configurations() {
        let mut none: Vec<Vector3<f64>> = Vec::new();
        assert!(matches!(
            Grid::new(unit(), &mut none, 1),
            Err(SimulationError::InvalidConfiguration(_))
        ));

        let mut one = vec![Vector3::zeros()];
        assert!(matches!(
            Grid::new(Vector3::new(1.0, 0.0, 1.0), &mut one, 1),
            Err(SimulationError::InvalidConfiguration(_))
        ));

        assert!(matches!(
            Grid::from_dimensions(unit(), Vector3::new(2, 0, 2), Vector3::zeros()),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_non_finite_positions_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut points = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.5, bad, 0.0)];
            let err = Grid::new(unit(), &mut points, 1).unwrap_err();
            assert!(
                matches!(&err, SimulationError::InvalidConfiguration(m) if m.contains("emitter 1")),
                "{}",
                err
            );
        }

        let mut first_bad = vec![Vector3::new(f64::NAN, 0.0, 0.0)];
        assert!(matches!(
            Grid::new(unit(), &mut first_bad, 0),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }
}
