//! Adams predictor and corrector weights.
//!
//! Row `r` of each table uses the `r + 1` most recent derivatives
//! $f_n, f_{n-1}, \dots, f_{n-r}$:
//!
//! $$ y_{n+1}^{(p)} = y_n + \sum_{j=0}^{r} \mathrm{ps}_{rj} f_{n-j}, \qquad
//!    y_{n+1} = y_n + \beta_r f_{n+1} + \sum_{j=0}^{r} \mathrm{cs}_{rj} f_{n-j} $$
//!
//! Predictor rows are Adams-Bashforth formulas and corrector rows are
//! Adams-Moulton formulas, both obtained by integrating the Lagrange basis
//! over one step. Low rows are the startup formulas used before enough
//! history exists for the full order.

use ndarray::Array2;

use crate::error::SimulationError;
use crate::interpolation::LagrangeBasis;

#[derive(Debug, Clone)]
pub struct Weights {
    /// Predictor weights, shape `(order, order)`.
    pub ps: Array2<f64>,
    /// Corrector weights for past derivatives, shape `(order, order)`.
    pub cs: Array2<f64>,
    /// Corrector weight $\beta_r$ of the freshly evaluated derivative, per row.
    pub future_coefs: Vec<f64>,
    order: usize,
}

impl Weights {
    pub fn new(order: usize, dt: f64) -> Result<Self, SimulationError> {
        if order == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "predictor-corrector order must be at least 1".into(),
            ));
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "time step must be positive, got {}",
                dt
            )));
        }

        let mut ps = Array2::zeros((order, order));
        let mut cs = Array2::zeros((order, order));
        let mut future_coefs = Vec::with_capacity(order);

        for r in 0..order {
            let past: Vec<f64> = (0..=r).map(|j| -(j as f64)).collect();

            let bashforth = LagrangeBasis::new(&past)?;
            for j in 0..=r {
                ps[[r, j]] = dt * bashforth.integral(j, 0.0, 1.0);
            }

            let mut nodes = vec![1.0];
            nodes.extend_from_slice(&past);
            let moulton = LagrangeBasis::new(&nodes)?;
            future_coefs.push(dt * moulton.integral(0, 0.0, 1.0));
            for j in 0..=r {
                cs[[r, j]] = dt * moulton.integral(j + 1, 0.0, 1.0);
            }
        }

        Ok(Self {
            ps,
            cs,
            future_coefs,
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of past derivatives the full-order formulas use.
    pub fn width(&self) -> usize {
        self.order
    }

    /// Implicit self-term of the full-order corrector.
    pub fn future_coef(&self) -> f64 {
        self.future_coefs[self.order - 1]
    }
}
