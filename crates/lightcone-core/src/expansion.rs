//! Expansion tables mapping emitters onto their grid stencil.
//!
//! An emitter at $\mathbf{r}$ is represented on the grid by weights $w_i$ on
//! the $(P+1)^3$ stencil boxes $\mathbf{q}_i$ around it, chosen so that every
//! tensor monomial up to order $P$ per axis is reproduced:
//!
//! $$ \sum_i w_i \prod_{a} \left(\frac{q_{i,a} - r_a}{h_a}\right)^{m_a}
//!    = \delta_{\mathbf{m},\mathbf{0}} $$
//!
//! Gradient weights solve the same system with the right-hand side of
//! $\partial_a$ at $\mathbf{r}$. The square moment matrix is solved with a
//! partial-pivot LU from `faer`.

use faer::linalg::solvers::SpSolver;
use log::debug;
use nalgebra::Vector3;
use ndarray::{Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::grid::{grid_sequence, Grid};
use crate::history::{History, RHO_01};
use crate::types::Emitter;

/// Weight of one stencil box for one emitter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Expansion {
    /// Box index on the grid.
    pub index: usize,
    /// `[value, d/dx, d/dy, d/dz]` weights.
    pub weights: [f64; 4],
}

impl Expansion {
    pub fn value(&self) -> f64 {
        self.weights[0]
    }

    /// Gradient weight along `axis` (0, 1 or 2).
    pub fn gradient(&self, axis: usize) -> f64 {
        self.weights[axis + 1]
    }
}

/// Expansions of every emitter, indexed `(emitter, stencil point)`.
#[derive(Debug, Clone)]
pub struct ExpansionTable {
    table: Array2<Expansion>,
    order: usize,
}

impl ExpansionTable {
    pub fn new(table: Array2<Expansion>, order: usize) -> Result<Self, SimulationError> {
        let expected = (order + 1).pow(3);
        if table.ncols() != expected {
            return Err(SimulationError::InvalidConfiguration(format!(
                "expansion table of order {} needs {} stencil points, got {}",
                order,
                expected,
                table.ncols()
            )));
        }
        Ok(Self { table, order })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn num_emitters(&self) -> usize {
        self.table.nrows()
    }

    pub fn stencil_size(&self) -> usize {
        self.table.ncols()
    }

    /// Stencil of one emitter.
    pub fn row(&self, emitter: usize) -> ArrayView1<'_, Expansion> {
        self.table.row(emitter)
    }

    pub fn table(&self) -> &Array2<Expansion> {
        &self.table
    }
}

/// Builds [`ExpansionTable`]s by moment matching on the grid stencil.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresExpansionSolver;

impl LeastSquaresExpansionSolver {
    /// Expansions of `emitters` onto `grid` with `order + 1` stencil points
    /// per axis.
    ///
    /// # Arguments
    /// * `order` - Polynomial order reproduced per axis
    /// * `grid` - Grid the stencil indices refer to
    /// * `emitters` - Emitters in the order the table rows should follow
    pub fn get_expansions<E: Emitter>(
        order: usize,
        grid: &Grid,
        emitters: &[E],
    ) -> Result<ExpansionTable, SimulationError> {
        let n = (order + 1).pow(3);
        let mut table = Array2::from_elem((emitters.len(), n), Expansion::default());

        // Monomial exponents in the same lexicographic order as the stencil.
        let exponents: Vec<[usize; 3]> = (0..=order)
            .flat_map(|a| (0..=order).flat_map(move |b| (0..=order).map(move |c| [a, b, c])))
            .collect();

        let spacing = grid.spacing();

        for (e, emitter) in emitters.iter().enumerate() {
            let pos = emitter.position();
            let indices = grid.expansion_box_indices(&pos, order)?;

            let scaled: Vec<Vector3<f64>> = indices
                .iter()
                .map(|&idx| (grid.spatial_coord_of_box(idx) - pos).component_div(spacing))
                .collect();

            let weights = solve_moments(&exponents, &scaled, spacing)?;

            for (i, &index) in indices.iter().enumerate() {
                table[[e, i]] = Expansion {
                    index,
                    weights: weights[i],
                };
            }
        }

        debug!(
            "Expansion table: {} emitters x {} stencil points (order {})",
            emitters.len(),
            n,
            order
        );

        ExpansionTable::new(table, order)
    }
}

/// Solve the moment system for the value and the three gradient weights.
fn solve_moments(
    exponents: &[[usize; 3]],
    points: &[Vector3<f64>],
    spacing: &Vector3<f64>,
) -> Result<Vec<[f64; 4]>, SimulationError> {
    let n = points.len();

    let moment = faer::Mat::<f64>::from_fn(n, n, |m, i| {
        let [a, b, c] = exponents[m];
        let p = &points[i];
        p.x.powi(a as i32) * p.y.powi(b as i32) * p.z.powi(c as i32)
    });
    let lu = moment.partial_piv_lu();

    // Right-hand sides: constant term, then the linear term of each axis.
    let targets: [([usize; 3], f64); 4] = [
        ([0, 0, 0], 1.0),
        ([1, 0, 0], 1.0 / spacing.x),
        ([0, 1, 0], 1.0 / spacing.y),
        ([0, 0, 1], 1.0 / spacing.z),
    ];

    let mut weights = vec![[0.0; 4]; n];
    for (k, (exponent, scale)) in targets.iter().enumerate() {
        let Some(row) = exponents.iter().position(|e| e == exponent) else {
            // Order 0 carries no gradient information.
            continue;
        };
        let rhs = faer::Col::<f64>::from_fn(n, |m| if m == row { *scale } else { 0.0 });
        let sol = lu.solve(&rhs);
        for i in 0..n {
            let w = sol[i];
            if !w.is_finite() {
                return Err(SimulationError::InvalidConfiguration(
                    "singular expansion moment system".into(),
                ));
            }
            weights[i][k] = w;
        }
    }

    Ok(weights)
}

/// Which quantity of an emitter's history is projected onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionFunction {
    /// The coherence $\rho_{01}$ itself.
    #[default]
    Identity,
    /// $\dot\rho_{01}$.
    TimeDerivative,
    DerivativeX,
    DerivativeY,
    DerivativeZ,
}

impl ExpansionFunction {
    /// Contribution of one history entry (shaped `(slot, component)`) to one
    /// stencil box.
    pub fn apply(&self, expansion: &Expansion, entry: ArrayView2<'_, Complex64>) -> Complex64 {
        match self {
            Self::Identity => entry[[History::VALUE, RHO_01]] * expansion.value(),
            Self::TimeDerivative => entry[[History::DERIVATIVE, RHO_01]] * expansion.value(),
            Self::DerivativeX => entry[[History::VALUE, RHO_01]] * expansion.gradient(0),
            Self::DerivativeY => entry[[History::VALUE, RHO_01]] * expansion.gradient(1),
            Self::DerivativeZ => entry[[History::VALUE, RHO_01]] * expansion.gradient(2),
        }
    }
}
