//! # Lightcone Compute
//!
//! Spectral transform backends for the lightcone framework. This crate
//! provides a [`SpectralBackend`](backend::SpectralBackend) trait that isolates
//! the AIM engine from the numeric library that executes the FFTs.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | CPU (rustfft + Rayon) | `cpu` (default) | Implemented |

pub mod backend;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{ComputeError, DeviceInfo, Direction, SpectralBackend};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
