//! Fixed-order predictor-corrector time stepping.
//!
//! Each [`Integrator::step`] advances every emitter from step $n$ to $n+1$:
//!
//! 1. **Predict** $y_{n+1}$ from past derivatives (Adams-Bashforth row).
//! 2. **Evaluate** the summed interaction field at $n+1$. Interactions only
//!    read steps up to $n$, so the field is final before the corrector runs.
//! 3. **Correct** with one Adams-Moulton sweep using $f(y^{(p)}_{n+1})$.
//! 4. **Commit** the corrected value and its derivative to the history.

pub mod bloch;
pub mod weights;

use log::{info, trace};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

use crate::error::SimulationError;
use crate::history::History;
use crate::interaction::Interaction;

pub use weights::Weights;

/// Right-hand side $\dot y = f(y, E)$ of one emitter.
pub trait Rhs {
    /// Time derivative of `solution` for `emitter` at `time` under the
    /// interaction `field`.
    fn derivative(
        &self,
        emitter: usize,
        time: f64,
        solution: ArrayView1<'_, Complex64>,
        field: Complex64,
    ) -> Array1<Complex64>;
}

impl<F> Rhs for F
where
    F: Fn(usize, f64, ArrayView1<'_, Complex64>, Complex64) -> Array1<Complex64>,
{
    fn derivative(
        &self,
        emitter: usize,
        time: f64,
        solution: ArrayView1<'_, Complex64>,
        field: Complex64,
    ) -> Array1<Complex64> {
        self(emitter, time, solution, field)
    }
}

pub struct Integrator<R: Rhs> {
    history: History,
    weights: Weights,
    rhs: R,
    interactions: Vec<Box<dyn Interaction>>,
    dt: f64,
    now: i64,
    field: Array1<Complex64>,
}

impl<R: Rhs> Integrator<R> {
    /// Set up stepping from time index 0.
    ///
    /// Both slots of every history entry in `[first_index, 0]` must already
    /// be seeded: the value and its derivative.
    ///
    /// # Arguments
    /// * `history` - Seeded solution history
    /// * `weights` - Predictor and corrector tables
    /// * `dt` - Time step (only used to pass times to `rhs`)
    /// * `rhs` - Right-hand side of the governing equations
    /// * `interactions` - Field sources summed at every step
    pub fn new(
        history: History,
        weights: Weights,
        dt: f64,
        rhs: R,
        interactions: Vec<Box<dyn Interaction>>,
    ) -> Result<Self, SimulationError> {
        if history.time_extent() < weights.width() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "history holds {} time steps but order {} needs at least {}",
                history.time_extent(),
                weights.order(),
                weights.width()
            )));
        }
        for interaction in &interactions {
            let depth = interaction.history_depth();
            if history.window() < depth {
                return Err(SimulationError::UninitializedHistory {
                    requested: -(depth as i64),
                    earliest: history.first_index(),
                });
            }
        }

        info!(
            "Integrator: order {}, {} emitters, {} steps, interactions [{}]",
            weights.order(),
            history.num_emitters(),
            history.last_index(),
            interactions
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let field = Array1::zeros(history.num_emitters());
        Ok(Self {
            history,
            weights,
            rhs,
            interactions,
            dt,
            now: 0,
            field,
        })
    }

    /// Index of the latest committed step.
    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// Summed field of the last evaluated step.
    pub fn field(&self) -> &Array1<Complex64> {
        &self.field
    }

    /// Weight row for the current amount of history (startup policy).
    fn row(&self) -> usize {
        let available = (self.now - self.history.first_index() + 1) as usize;
        available.min(self.weights.order()) - 1
    }

    /// Advance one step.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if self.now >= self.history.last_index() {
            return Err(SimulationError::HistoryExhausted { step: self.now });
        }
        let row = self.row();
        let next = self.now + 1;
        let time = next as f64 * self.dt;

        self.predictor(row, next);
        self.evaluator(next)?;

        for e in 0..self.history.num_emitters() {
            let predicted = self.rhs.derivative(
                e,
                time,
                self.history.get(e, next, History::VALUE),
                self.field[e],
            );
            self.history.set(e, next, History::DERIVATIVE, &predicted);
        }

        self.corrector(row, next);

        for e in 0..self.history.num_emitters() {
            let committed = self.rhs.derivative(
                e,
                time,
                self.history.get(e, next, History::VALUE),
                self.field[e],
            );
            self.history.set(e, next, History::DERIVATIVE, &committed);
        }

        self.now = next;
        trace!("Step {} committed (weight row {})", next, row);
        Ok(())
    }

    /// Step until the history is full.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        while self.now < self.history.last_index() {
            self.step()?;
        }
        Ok(())
    }

    /// $y_{n+1} = y_n + \sum_j \mathrm{ps}_{rj} f_{n-j}$
    fn predictor(&mut self, row: usize, next: i64) {
        for e in 0..self.history.num_emitters() {
            let mut y = self.history.get(e, self.now, History::VALUE).to_owned();
            for j in 0..=row {
                let f = self.history.get(e, self.now - j as i64, History::DERIVATIVE);
                y.scaled_add(Complex64::new(self.weights.ps[[row, j]], 0.0), &f);
            }
            self.history.set(e, next, History::VALUE, &y);
        }
    }

    fn evaluator(&mut self, next: i64) -> Result<(), SimulationError> {
        self.field.fill(Complex64::new(0.0, 0.0));
        for interaction in &mut self.interactions {
            let contribution = interaction.evaluate(&self.history, next)?;
            self.field += contribution;
        }
        Ok(())
    }

    /// $y_{n+1} = y_n + \beta_r f^{(p)}_{n+1} + \sum_j \mathrm{cs}_{rj} f_{n-j}$
    fn corrector(&mut self, row: usize, next: i64) {
        for e in 0..self.history.num_emitters() {
            let mut y = self.history.get(e, self.now, History::VALUE).to_owned();
            let future = self.history.get(e, next, History::DERIVATIVE);
            y.scaled_add(Complex64::new(self.weights.future_coefs[row], 0.0), &future);
            for j in 0..=row {
                let f = self.history.get(e, self.now - j as i64, History::DERIVATIVE);
                y.scaled_add(Complex64::new(self.weights.cs[[row, j]], 0.0), &f);
            }
            self.history.set(e, next, History::VALUE, &y);
        }
    }
}
