//! Adaptive Integral Method (AIM) interaction engine.
//!
//! The retarded field at emitter $i$ and step $k$,
//!
//! $$ E_i(k) = \sum_{j \ne i} \frac{s_j(t_k - r_{ij}/c)}{N(\mathbf{r}_{ij})} $$
//!
//! costs $O(N^2)$ per step when summed directly. AIM instead projects every
//! source onto a regular grid through its [`ExpansionTable`], convolves the
//! grid with the retarded kernel for each causal time shift, and gathers the
//! result back at the emitters. Because the kernel is Toeplitz in space, the
//! convolution is an elementwise product in the Fourier domain:
//!
//! $$ \hat{o}(k) = \sum_{t=1}^{T-1} \hat{G}_t \odot \hat{s}(k - t) $$
//!
//! Each transformed source layer $\hat s(j)$ is cached under the history's
//! identity and the write stamp of step $j$, so every history step is
//! projected and transformed once over a run, and again only if it is
//! rewritten.

pub mod circulant;
pub mod spectral;

use std::sync::Arc;

use log::{debug, info, trace};
use ndarray::{Array1, Array3, Zip};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use lightcone_compute::{Direction, SpectralBackend};

use crate::error::SimulationError;
use crate::expansion::{ExpansionFunction, ExpansionTable};
use crate::grid::Grid;
use crate::history::History;
use crate::interaction::{Interaction, Normalization};
use crate::propagation::FramePropagator;

use circulant::build_circulant;
use spectral::SpectralTable;

/// Numerical parameters of an AIM interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimParams {
    /// Propagation speed.
    #[serde(default = "default_c")]
    pub c: f64,
    /// Time step.
    pub dt: f64,
    /// Order of the retarded-time Lagrange stencil.
    #[serde(default = "default_interpolation_order")]
    pub interpolation_order: usize,
    /// Polynomial order of the spatial expansion.
    #[serde(default)]
    pub expansion_order: usize,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub expansion_function: ExpansionFunction,
}

fn default_c() -> f64 {
    1.0
}

fn default_interpolation_order() -> usize {
    3
}

impl AimParams {
    pub fn new(c: f64, dt: f64) -> Self {
        Self {
            c,
            dt,
            interpolation_order: default_interpolation_order(),
            expansion_order: 0,
            normalization: Normalization::default(),
            expansion_function: ExpansionFunction::default(),
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "propagation speed must be positive, got {}",
                self.c
            )));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        Ok(())
    }
}

/// What a cached source layer was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceKey {
    history: u64,
    step: i64,
    revision: u64,
}

/// One transformed source layer, tagged with the entry it was built from.
#[derive(Debug, Clone)]
struct SourceLayer {
    key: Option<SourceKey>,
    data: Array3<Complex64>,
}

pub struct AimInteraction {
    grid: Grid,
    expansions: ExpansionTable,
    expansion_function: ExpansionFunction,
    table: Arc<SpectralTable>,
    backend: Arc<dyn SpectralBackend>,
    propagator: Option<Arc<dyn FramePropagator>>,
    dt: f64,
    /// Ring of transformed sources, slot `step mod T`.
    sources: Vec<SourceLayer>,
    observed: Array3<Complex64>,
    results: Array1<Complex64>,
}

impl AimInteraction {
    /// Build the Green's tables for `grid` and set up the engine.
    ///
    /// # Arguments
    /// * `params` - Propagation and stencil parameters
    /// * `grid` - Grid the expansions refer to
    /// * `expansions` - One row per emitter, in history order
    /// * `backend` - FFT execution capability
    /// * `propagator` - Optional frame phase applied to sources and results
    pub fn new(
        params: &AimParams,
        grid: Grid,
        expansions: ExpansionTable,
        backend: Arc<dyn SpectralBackend>,
        propagator: Option<Arc<dyn FramePropagator>>,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let circulant = build_circulant(
            &grid,
            params.c,
            params.dt,
            params.interpolation_order,
            params.normalization,
        );
        let table = Arc::new(SpectralTable::from_circulant(&circulant, backend.as_ref())?);

        Self::with_table(
            table,
            grid,
            expansions,
            params.expansion_function,
            params.dt,
            backend,
            propagator,
        )
    }

    /// Set up an engine around an existing spectral table.
    pub fn with_table(
        table: Arc<SpectralTable>,
        grid: Grid,
        expansions: ExpansionTable,
        expansion_function: ExpansionFunction,
        dt: f64,
        backend: Arc<dyn SpectralBackend>,
        propagator: Option<Arc<dyn FramePropagator>>,
    ) -> Result<Self, SimulationError> {
        let d = grid.dimensions();
        let expected = [2 * d.x as usize, 2 * d.y as usize, 2 * d.z as usize];
        if table.spatial_shape() != expected {
            return Err(SimulationError::InvalidConfiguration(format!(
                "spectral table is {:?} but the grid needs {:?}",
                table.spatial_shape(),
                expected
            )));
        }
        if let Some(bad) = expansions
            .table()
            .iter()
            .find(|e| e.index >= grid.num_gridpoints())
        {
            return Err(SimulationError::InvalidConfiguration(format!(
                "expansion refers to box {} on a grid of {}",
                bad.index,
                grid.num_gridpoints()
            )));
        }

        let layer = SourceLayer {
            key: None,
            data: Array3::zeros(expected),
        };
        let sources = vec![layer; table.time_steps()];

        info!(
            "AIM interaction: {} emitters, {} time shifts, {:?} circulant on {}",
            expansions.num_emitters(),
            table.time_steps(),
            expected,
            backend.device_info().name
        );

        Ok(Self {
            results: Array1::zeros(expansions.num_emitters()),
            observed: Array3::zeros(expected),
            grid,
            expansions,
            expansion_function,
            table,
            backend,
            propagator,
            dt,
            sources,
        })
    }

    /// The shared spectral table.
    pub fn table(&self) -> &Arc<SpectralTable> {
        &self.table
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Forget every cached source layer.
    pub fn clear_source_cache(&mut self) {
        for layer in &mut self.sources {
            layer.key = None;
        }
    }

    fn phase(&self, step: i64) -> Complex64 {
        self.propagator
            .as_ref()
            .map_or(Complex64::new(1.0, 0.0), |p| p.lab_phase(step as f64 * self.dt))
    }

    /// Project history step `key.step` onto the grid and transform it into
    /// `slot`.
    fn fill_source(&mut self, history: &History, key: SourceKey, slot: usize) -> Result<(), SimulationError> {
        let step = key.step;
        let phase = self.phase(step);
        let layer = &mut self.sources[slot];
        layer.data.fill(Complex64::new(0.0, 0.0));

        for e in 0..self.expansions.num_emitters() {
            let entry = history.entry(e, step);
            for expansion in self.expansions.row(e).iter() {
                let c = self.grid.idx_to_coord(expansion.index);
                layer.data[[c.x as usize, c.y as usize, c.z as usize]] +=
                    self.expansion_function.apply(expansion, entry) * phase;
            }
        }

        self.backend.transform(layer.data.view_mut(), Direction::Forward)?;
        layer.key = Some(key);
        trace!("AIM source layer for step {} cached in slot {}", step, slot);
        Ok(())
    }
}

impl Interaction for AimInteraction {
    fn evaluate(
        &mut self,
        history: &History,
        step: i64,
    ) -> Result<&Array1<Complex64>, SimulationError> {
        let depth = self.history_depth() as i64;
        if step - depth < history.first_index() {
            return Err(SimulationError::UninitializedHistory {
                requested: step - depth,
                earliest: history.first_index(),
            });
        }
        if step - 1 > history.last_index() {
            return Err(SimulationError::HistoryExhausted { step: history.last_index() });
        }
        if history.num_emitters() != self.expansions.num_emitters() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "history holds {} emitters but the expansion table {}",
                history.num_emitters(),
                self.expansions.num_emitters()
            )));
        }

        let num_shifts = self.table.time_steps();
        self.observed.fill(Complex64::new(0.0, 0.0));

        for t in 1..num_shifts {
            let source_step = step - t as i64;
            let slot = source_step.rem_euclid(num_shifts as i64) as usize;
            let key = SourceKey {
                history: history.id(),
                step: source_step,
                revision: history.revision(source_step),
            };
            if self.sources[slot].key != Some(key) {
                self.fill_source(history, key, slot)?;
            }

            let table = &self.table;
            Zip::indexed(&mut self.observed)
                .and(&self.sources[slot].data)
                .for_each(|(x, y, z), obs, &src| {
                    *obs += table.coefficient(t, x, y, z) * src;
                });
        }

        self.backend.transform(self.observed.view_mut(), Direction::Inverse)?;

        let scale = 1.0 / self.observed.len() as f64;
        let phase = self.phase(step).conj() * scale;

        for e in 0..self.expansions.num_emitters() {
            let mut acc = Complex64::new(0.0, 0.0);
            for expansion in self.expansions.row(e).iter() {
                let c = self.grid.idx_to_coord(expansion.index);
                acc += self.observed[[c.x as usize, c.y as usize, c.z as usize]] * expansion.value();
            }
            self.results[e] = acc * phase;
        }

        debug!("AIM evaluated step {}", step);
        Ok(&self.results)
    }

    fn history_depth(&self) -> usize {
        self.table.time_steps() - 1
    }

    fn name(&self) -> &str {
        "aim"
    }
}
