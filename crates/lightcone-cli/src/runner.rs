//! Simulation runner: ties together dots, interactions, and the integrator.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info};
use nalgebra::Vector3;
use ndarray::array;
use num_complex::Complex64;
use serde::Serialize;

use lightcone_compute::{CpuBackend, SpectralBackend};
use lightcone_core::expansion::LeastSquaresExpansionSolver;
use lightcone_core::grid::Grid;
use lightcone_core::history::{History, RHO_00, RHO_01};
use lightcone_core::integrator::bloch::BlochRhs;
use lightcone_core::integrator::{Integrator, Rhs, Weights};
use lightcone_core::interaction::aim::AimInteraction;
use lightcone_core::interaction::direct::DirectInteraction;
use lightcone_core::interaction::Interaction;
use lightcone_core::propagation::{FramePropagator, RotatingFramePropagator};
use lightcone_core::types::QuantumDot;
use lightcone_geometry::discretise::discretise_lattice;
use lightcone_geometry::parsers::load_dots;

use crate::config::{DotsConfig, InteractionKind, JobConfig};

/// Results from a simulation run.
pub struct SimulationOutput {
    /// Dots in history order.
    pub dots: Vec<QuantumDot>,
    pub history: History,
    pub summary: RunSummary,
}

/// Machine-readable description of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub num_dots: usize,
    pub num_steps: usize,
    pub dt: f64,
    pub c: f64,
    pub interaction: InteractionKind,
    pub grid_dimensions: Option<[i64; 3]>,
    pub history_depth: usize,
    pub integrator_order: usize,
    pub final_populations: Vec<f64>,
    pub elapsed_seconds: f64,
}

/// Gather the dots from every source in the job.
pub fn collect_dots(config: &DotsConfig) -> Result<Vec<QuantumDot>> {
    let mut dots = config.dot.clone();

    if let Some(path) = &config.file {
        let loaded = load_dots(path).with_context(|| format!("loading dots from {}", path.display()))?;
        info!("Dot file '{}': {} dots", path.display(), loaded.len());
        dots.extend(loaded);
    }

    if let Some(lattice) = &config.lattice {
        let generated = discretise_lattice(lattice);
        info!(
            "Lattice: {} dots (spacing={})",
            generated.len(),
            lattice.spacing
        );
        dots.extend(generated);
    }

    if dots.is_empty() {
        anyhow::bail!("No dots generated, check the [dots] section");
    }
    Ok(dots)
}

/// Run a full simulation from a parsed job configuration.
pub fn run_simulation(job: &JobConfig) -> Result<SimulationOutput> {
    let started = Instant::now();
    let sim = &job.simulation;
    let mut dots = collect_dots(&job.dots)?;
    info!("Total dots: {}", dots.len());

    let propagator: Option<Arc<dyn FramePropagator>> = if job.bloch.laser_frequency != 0.0 {
        Some(Arc::new(RotatingFramePropagator::new(job.bloch.laser_frequency)))
    } else {
        None
    };

    let mut grid_dimensions = None;
    let mut interactions: Vec<Box<dyn Interaction>> = Vec::new();
    match sim.interaction {
        InteractionKind::Aim => {
            let params = job.aim.params(sim.c, sim.dt);
            // Sorts the dots into box order, which is also history order.
            let grid = Grid::new(Vector3::from(job.aim.spacing), &mut dots, job.aim.padding())?;
            let dims = grid.dimensions();
            info!(
                "Grid: {} x {} x {} boxes, {} transit steps",
                dims.x,
                dims.y,
                dims.z,
                grid.max_transit_steps(sim.c, sim.dt)
            );
            grid_dimensions = Some([dims.x, dims.y, dims.z]);

            let expansions =
                LeastSquaresExpansionSolver::get_expansions(params.expansion_order, &grid, &dots)?;
            let backend = create_backend(job.aim.threads)?;
            let aim = AimInteraction::new(&params, grid, expansions, backend, propagator)?;
            interactions.push(Box::new(aim));
        }
        InteractionKind::Direct => {
            let direct = DirectInteraction::new(
                &dots,
                sim.c,
                sim.dt,
                job.aim.interpolation_order,
                job.aim.normalization,
                propagator,
            )?;
            interactions.push(Box::new(direct));
        }
        InteractionKind::None => info!("Interaction: none (independent dots)"),
    }

    let depth = interactions.iter().map(|i| i.history_depth()).max().unwrap_or(0);
    let weights = Weights::new(sim.integrator_order, sim.dt)?;
    let window = sim.history_window.unwrap_or(depth);
    if window < depth {
        anyhow::bail!(
            "simulation.history_window = {} is shallower than the interaction depth {}",
            window,
            depth
        );
    }

    debug!("History window {} for interaction depth {}", window, depth);

    let rhs = BlochRhs::new(dots.clone(), job.pulse.clone(), job.bloch.clone());
    let history = seed_ground_state(&rhs, window, sim.num_steps, sim.dt);

    let mut integrator = Integrator::new(history, weights, sim.dt, rhs, interactions)?;

    let report_every = (sim.num_steps / 10).max(1);
    while integrator.now() < sim.num_steps as i64 {
        integrator
            .step()
            .with_context(|| format!("step {}", integrator.now() + 1))?;
        let n = integrator.now() as usize;
        if n % report_every == 0 || n == sim.num_steps {
            let excited = mean_excitation(integrator.history(), n as i64);
            info!(
                "[{}/{}] t={:.4}: mean excitation={:.6e}",
                n,
                sim.num_steps,
                n as f64 * sim.dt,
                excited
            );
        }
    }

    let history = integrator.into_history();
    let final_populations = (0..dots.len())
        .map(|e| history.get(e, sim.num_steps as i64, History::VALUE)[RHO_00].re)
        .collect();

    let summary = RunSummary {
        version: env!("CARGO_PKG_VERSION").to_string(),
        num_dots: dots.len(),
        num_steps: sim.num_steps,
        dt: sim.dt,
        c: sim.c,
        interaction: sim.interaction,
        grid_dimensions,
        history_depth: depth,
        integrator_order: sim.integrator_order,
        final_populations,
        elapsed_seconds: started.elapsed().as_secs_f64(),
    };

    Ok(SimulationOutput {
        dots,
        history,
        summary,
    })
}

/// History with every dot in its ground state for `t <= 0`.
///
/// The derivative slot of each seeded step is the right-hand side at that
/// time with no interaction field, so a pulse already on at `t <= 0` is seen
/// by the first predictor.
fn seed_ground_state(rhs: &BlochRhs, window: usize, num_steps: usize, dt: f64) -> History {
    let ground = array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
    let num_dots = rhs.dots().len();
    let mut history = History::new(num_dots, window, num_steps);
    history.fill(&ground);

    let zero = Complex64::new(0.0, 0.0);
    for e in 0..num_dots {
        for t in history.first_index()..=0 {
            let d = rhs.derivative(e, t as f64 * dt, ground.view(), zero);
            history.set(e, t, History::DERIVATIVE, &d);
        }
    }
    history
}

fn mean_excitation(history: &History, time: i64) -> f64 {
    let n = history.num_emitters();
    let total: f64 = (0..n)
        .map(|e| 1.0 - history.get(e, time, History::VALUE)[RHO_00].re)
        .sum();
    total / n as f64
}

/// Write per-dot populations and coherences to a CSV file with a metadata
/// header.
pub fn write_populations_csv(output: &SimulationOutput, path: &Path, job: &JobConfig) -> Result<()> {
    use std::io::{BufWriter, Write};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let mut file = BufWriter::new(file);
    let sim = &job.simulation;

    writeln!(file, "# Lightcone retarded Bloch solver: populations")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# dt: {}, c: {}, interaction: {:?}, integrator_order: {}",
        sim.dt, sim.c, sim.interaction, sim.integrator_order
    )?;
    for (i, dot) in output.dots.iter().enumerate() {
        writeln!(
            file,
            "# dot {}: position=({}, {}, {}), frequency={}",
            i, dot.position.x, dot.position.y, dot.position.z, dot.frequency
        )?;
    }
    writeln!(file, "#")?;

    let mut header = String::from("step,time");
    for i in 0..output.dots.len() {
        header.push_str(&format!(",rho00_{},abs_rho01_{}", i, i));
    }
    writeln!(file, "{}", header)?;

    for step in (0..=sim.num_steps).step_by(job.output.stride) {
        let t = step as i64;
        write!(file, "{},{:.6e}", step, step as f64 * sim.dt)?;
        for e in 0..output.dots.len() {
            let rho = output.history.get(e, t, History::VALUE);
            write!(file, ",{:.9e},{:.9e}", rho[RHO_00].re, rho[RHO_01].norm())?;
        }
        writeln!(file)?;
    }
    file.flush()?;

    println!("Populations written to: {}", path.display());
    Ok(())
}

/// Write the run summary to a JSON file.
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Summary (JSON) written to: {}", path.display());
    Ok(())
}

/// Create the CPU spectral backend, on a dedicated pool if `threads` is set.
fn create_backend(threads: Option<usize>) -> Result<Arc<dyn SpectralBackend>> {
    let backend = match threads {
        Some(n) => CpuBackend::with_threads(n)?,
        None => CpuBackend::new(),
    };
    debug!("Backend: {}", backend.device_info().name);
    Ok(Arc::new(backend))
}
