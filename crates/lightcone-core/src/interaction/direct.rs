//! Pairwise retarded interaction.
//!
//! Sums every ordered emitter pair explicitly with the same Lagrange
//! retardation and normalization as the AIM kernel. Cost is $O(N^2)$ per
//! step; used as the reference the grid method is checked against and for
//! small ensembles where building a grid does not pay off.

use std::sync::Arc;

use log::info;
use ndarray::Array1;
use num_complex::Complex64;

use crate::error::SimulationError;
use crate::history::{History, RHO_01};
use crate::interaction::{retardation_stencil, Interaction, Normalization};
use crate::interpolation::UniformLagrangeSet;
use crate::propagation::FramePropagator;
use crate::types::Emitter;

/// Retarded coupling of one ordered pair.
#[derive(Debug, Clone)]
struct PairCoupling {
    observer: usize,
    source: usize,
    /// Whole-step part of the delay; weight `p` belongs to shift `shift + p`.
    shift: i64,
    weights: Vec<f64>,
}

pub struct DirectInteraction {
    couplings: Vec<PairCoupling>,
    propagator: Option<Arc<dyn FramePropagator>>,
    dt: f64,
    depth: usize,
    results: Array1<Complex64>,
}

impl DirectInteraction {
    /// Precompute the couplings of every pair of distinct, non-coincident
    /// emitters.
    pub fn new<E: Emitter>(
        emitters: &[E],
        c: f64,
        dt: f64,
        interp_order: usize,
        normalization: Normalization,
        propagator: Option<Arc<dyn FramePropagator>>,
    ) -> Result<Self, SimulationError> {
        if !(c > 0.0 && dt > 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "propagation speed and time step must be positive, got c = {}, dt = {}",
                c, dt
            )));
        }

        let mut lagrange = UniformLagrangeSet::new(interp_order);
        let mut couplings = Vec::new();
        let mut depth = 1;

        for (observer, obs) in emitters.iter().enumerate() {
            for (source, src) in emitters.iter().enumerate() {
                let dr = obs.position() - src.position();
                if observer == source || dr.norm() < 1e-12 {
                    continue;
                }
                let shift = retardation_stencil(&mut lagrange, dr.norm(), c, dt);
                let norm = normalization.apply(&dr);
                let weights = lagrange.evaluations.row(0).iter().map(|w| w / norm).collect();

                depth = depth.max(shift as usize + interp_order);
                couplings.push(PairCoupling {
                    observer,
                    source,
                    shift,
                    weights,
                });
            }
        }

        info!(
            "Direct interaction: {} emitters, {} pair couplings",
            emitters.len(),
            couplings.len()
        );

        Ok(Self {
            couplings,
            propagator,
            dt,
            depth,
            results: Array1::zeros(emitters.len()),
        })
    }

    fn phase(&self, step: i64) -> Complex64 {
        self.propagator
            .as_ref()
            .map_or(Complex64::new(1.0, 0.0), |p| p.lab_phase(step as f64 * self.dt))
    }
}

impl Interaction for DirectInteraction {
    fn evaluate(
        &mut self,
        history: &History,
        step: i64,
    ) -> Result<&Array1<Complex64>, SimulationError> {
        let depth = self.depth as i64;
        if step - depth < history.first_index() {
            return Err(SimulationError::UninitializedHistory {
                requested: step - depth,
                earliest: history.first_index(),
            });
        }
        if step - 1 > history.last_index() {
            return Err(SimulationError::HistoryExhausted { step: history.last_index() });
        }
        if history.num_emitters() != self.results.len() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "history holds {} emitters but the interaction was built for {}",
                history.num_emitters(),
                self.results.len()
            )));
        }

        self.results.fill(Complex64::new(0.0, 0.0));

        for pair in &self.couplings {
            let mut acc = Complex64::new(0.0, 0.0);
            for (p, w) in pair.weights.iter().enumerate() {
                let t = pair.shift + p as i64;
                if t <= 0 {
                    continue;
                }
                let j = step - t;
                acc += history.get(pair.source, j, History::VALUE)[RHO_01] * self.phase(j) * *w;
            }
            self.results[pair.observer] += acc;
        }

        let phase = self.phase(step).conj();
        self.results.mapv_inplace(|v| v * phase);
        Ok(&self.results)
    }

    fn history_depth(&self) -> usize {
        self.depth
    }

    fn name(&self) -> &str {
        "direct"
    }
}
