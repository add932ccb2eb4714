//! Error type shared by every stage of a simulation run.
//!
//! All variants are unrecoverable for the current run: they signal a
//! configuration mistake by the caller, detected eagerly at construction or
//! on first use.

use lightcone_compute::ComputeError;
use thiserror::Error;

/// Errors that can occur while setting up or stepping a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Expansion stencil leaves the grid: coordinate {coord:?} outside dimensions {dimensions:?}")]
    StencilOutOfBounds {
        coord: [i64; 3],
        dimensions: [i64; 3],
    },

    #[error("History not initialised: step {requested} requested, earliest available is {earliest}")]
    UninitializedHistory { requested: i64, earliest: i64 },

    #[error("History exhausted: cannot advance past step {step}")]
    HistoryExhausted { step: i64 },

    #[error("Spectral backend error: {0}")]
    Compute(#[from] ComputeError),
}
