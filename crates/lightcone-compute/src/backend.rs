//! Spectral backend trait and device description.
//!
//! The [`SpectralBackend`] trait is the only way the physics code in
//! `lightcone-core` touches an FFT library. A backend is stateless from the
//! caller's point of view: it receives a buffer and a [`Direction`] and
//! transforms the buffer in place. Plans, scratch space and thread pools are
//! backend internals.

use ndarray::{ArrayViewMut3, Axis};
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from spectral backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Describes the execution resources of a backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub threads: usize,
}

/// Sign convention of a discrete Fourier transform.
///
/// Both directions are unnormalised (as in FFTW and rustfft): a forward
/// transform followed by an inverse transform scales the data by the number
/// of transformed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// $X_k = \sum_n x_n e^{-2\pi i k n / N}$
    Forward,
    /// $x_n = \sum_k X_k e^{+2\pi i k n / N}$
    Inverse,
}

/// Abstraction over FFT execution.
///
/// Implementations must be deterministic: the same input produces
/// bit-identical output regardless of how many threads the backend uses.
pub trait SpectralBackend: Send + Sync {
    /// Return information about the backend.
    fn device_info(&self) -> DeviceInfo;

    /// Transform every one-dimensional lane of `data` along `axis`.
    fn transform_axis(
        &self,
        data: ArrayViewMut3<'_, Complex64>,
        axis: Axis,
        direction: Direction,
    ) -> Result<(), ComputeError>;

    /// Full three-dimensional transform (all axes, outermost first).
    fn transform(
        &self,
        mut data: ArrayViewMut3<'_, Complex64>,
        direction: Direction,
    ) -> Result<(), ComputeError> {
        for axis in 0..3 {
            self.transform_axis(data.view_mut(), Axis(axis), direction)?;
        }
        Ok(())
    }
}
