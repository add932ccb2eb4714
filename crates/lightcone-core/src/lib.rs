//! # Lightcone Core
//!
//! The numerical backbone of the lightcone framework. This crate advances a
//! collection of two-level emitters ("quantum dots") that interact through a
//! retarded field, using a fixed-order predictor-corrector integrator and the
//! Adaptive Integral Method (AIM) to evaluate the retarded interaction on a
//! regular grid with FFT-diagonalised Toeplitz kernels.
//!
//! ## Architecture
//!
//! Every field source implements the [`interaction::Interaction`] trait, which
//! maps a [`history::History`] and a step index to one complex field value per
//! emitter. The [`integrator::Integrator`] sums all interactions at each
//! sub-stage and feeds the result to a right-hand side such as
//! [`integrator::bloch::BlochRhs`].
//!
//! ## Modules
//!
//! - [`types`] - Emitters and shared parameter structs.
//! - [`grid`] - Padded box lattice covering all emitters.
//! - [`interpolation`] - Lagrange bases for retarded-time interpolation.
//! - [`expansion`] - Emitter-to-grid expansion tables.
//! - [`history`] - Solution history indexed from a movable origin.
//! - [`interaction`] - Interaction trait, AIM engine and direct reference.
//! - [`propagation`] - Rotating-frame phase factors.
//! - [`pulse`] - Incident Gaussian pulse.
//! - [`integrator`] - Predictor-corrector weights and stepping.

pub mod error;
pub mod expansion;
pub mod grid;
pub mod history;
pub mod integrator;
pub mod interaction;
pub mod interpolation;
pub mod propagation;
pub mod pulse;
pub mod types;

pub use error::SimulationError;
