//! CPU spectral backend using rustfft plans and Rayon lane parallelism.

use std::sync::{Arc, Mutex};

use ndarray::{ArrayViewMut3, Axis};
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::backend::{ComputeError, DeviceInfo, Direction, SpectralBackend};

/// CPU backend that transforms independent lanes in parallel.
///
/// Each lane is transformed by the same cached plan and lanes never share
/// scratch data, so results do not depend on the thread count.
pub struct CpuBackend {
    planner: Mutex<FftPlanner<f64>>,
    pool: Option<rayon::ThreadPool>,
    num_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend using the global Rayon pool.
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
            pool: None,
            num_threads: rayon::current_num_threads(),
        }
    }

    /// Create a CPU backend with a dedicated pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        Ok(Self {
            planner: Mutex::new(FftPlanner::new()),
            num_threads: pool.current_num_threads(),
            pool: Some(pool),
        })
    }

    fn plan(&self, len: usize, direction: Direction) -> Result<Arc<dyn Fft<f64>>, ComputeError> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| ComputeError::Unavailable("FFT planner lock poisoned".into()))?;
        Ok(match direction {
            Direction::Forward => planner.plan_fft_forward(len),
            Direction::Inverse => planner.plan_fft_inverse(len),
        })
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            threads: self.num_threads,
        }
    }

    fn transform_axis(
        &self,
        mut data: ArrayViewMut3<'_, Complex64>,
        axis: Axis,
        direction: Direction,
    ) -> Result<(), ComputeError> {
        if axis.index() >= data.ndim() {
            return Err(ComputeError::ShapeMismatch(format!(
                "axis {} out of range for a {}-d buffer",
                axis.index(),
                data.ndim()
            )));
        }
        let len = data.len_of(axis);
        if len <= 1 || data.is_empty() {
            return Ok(());
        }

        let fft = self.plan(len, direction)?;

        // Gather lanes into contiguous buffers; rustfft wants unit stride.
        let mut lanes: Vec<Vec<Complex64>> =
            data.lanes(axis).into_iter().map(|lane| lane.to_vec()).collect();

        let process = |lanes: &mut Vec<Vec<Complex64>>| {
            lanes.par_iter_mut().for_each(|lane| fft.process(lane));
        };
        match &self.pool {
            Some(pool) => pool.install(|| process(&mut lanes)),
            None => process(&mut lanes),
        }

        for (mut dst, src) in data.lanes_mut(axis).into_iter().zip(&lanes) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = *s;
            }
        }
        Ok(())
    }
}
