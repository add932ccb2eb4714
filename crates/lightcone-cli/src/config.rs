//! TOML configuration deserialisation for simulation jobs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lightcone_core::expansion::ExpansionFunction;
use lightcone_core::integrator::bloch::BlochParams;
use lightcone_core::interaction::aim::AimParams;
use lightcone_core::interaction::Normalization;
use lightcone_core::pulse::GaussianPulse;
use lightcone_core::types::QuantumDot;
use lightcone_geometry::discretise::LatticeSpec;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub aim: AimConfig,
    pub dots: DotsConfig,
    #[serde(default)]
    pub pulse: Option<GaussianPulse>,
    #[serde(default)]
    pub bloch: BlochParams,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Time stepping parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Propagation speed (default: 1).
    #[serde(default = "default_c")]
    pub c: f64,
    pub dt: f64,
    pub num_steps: usize,
    /// Predictor-corrector order (default: 4).
    #[serde(default = "default_integrator_order")]
    pub integrator_order: usize,
    /// Depth of the pre-seeded history. Default: the interaction's depth.
    #[serde(default)]
    pub history_window: Option<usize>,
    /// Which retarded interaction couples the dots (default: "aim").
    #[serde(default)]
    pub interaction: InteractionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    #[default]
    Aim,
    Direct,
    None,
}

fn default_c() -> f64 {
    1.0
}
fn default_integrator_order() -> usize {
    4
}

/// Grid and stencil parameters for the AIM interaction.
#[derive(Debug, Deserialize)]
pub struct AimConfig {
    /// Box size along x, y, z (default: 1 on every axis).
    #[serde(default = "default_spacing")]
    pub spacing: [f64; 3],
    #[serde(default = "default_interpolation_order")]
    pub interpolation_order: usize,
    #[serde(default)]
    pub expansion_order: usize,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub expansion_function: ExpansionFunction,
    /// Boxes added around the dots. Default: the expansion order.
    #[serde(default)]
    pub padding: Option<usize>,
    /// FFT worker threads. Default: the global Rayon pool.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            spacing: default_spacing(),
            interpolation_order: default_interpolation_order(),
            expansion_order: 0,
            normalization: Normalization::default(),
            expansion_function: ExpansionFunction::default(),
            padding: None,
            threads: None,
        }
    }
}

fn default_spacing() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}
fn default_interpolation_order() -> usize {
    3
}

impl AimConfig {
    pub fn params(&self, c: f64, dt: f64) -> AimParams {
        AimParams {
            c,
            dt,
            interpolation_order: self.interpolation_order,
            expansion_order: self.expansion_order,
            normalization: self.normalization,
            expansion_function: self.expansion_function,
        }
    }

    pub fn padding(&self) -> usize {
        self.padding.unwrap_or(self.expansion_order)
    }
}

/// Dot sources; all given sources are concatenated.
#[derive(Debug, Default, Deserialize)]
pub struct DotsConfig {
    /// Inline `[[dots.dot]]` tables.
    #[serde(default)]
    pub dot: Vec<QuantumDot>,
    /// Plain-text dot file, relative to the job file.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub lattice: Option<LatticeSpec>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save populations as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_populations: bool,
    /// Whether to also save a JSON run summary (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Write every n-th step to the CSV (default: 1).
    #[serde(default = "default_stride")]
    pub stride: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_populations: true,
            save_json: false,
            stride: default_stride(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}
fn default_stride() -> usize {
    1
}

impl JobConfig {
    /// Reject values that would only fail deep inside the run.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.dt > 0.0 && sim.c > 0.0) {
            anyhow::bail!("simulation.dt and simulation.c must be positive");
        }
        if sim.num_steps == 0 {
            anyhow::bail!("simulation.num_steps must be at least 1");
        }
        if sim.integrator_order == 0 {
            anyhow::bail!("simulation.integrator_order must be at least 1");
        }
        if self.aim.spacing.iter().any(|&s| s <= 0.0) {
            anyhow::bail!("aim.spacing must be positive on every axis");
        }
        if self.output.stride == 0 {
            anyhow::bail!("output.stride must be at least 1");
        }
        if self.dots.dot.is_empty() && self.dots.file.is_none() && self.dots.lattice.is_none() {
            anyhow::bail!("no dots: give [[dots.dot]] entries, dots.file or [dots.lattice]");
        }
        Ok(())
    }
}

/// Load and parse a TOML job configuration file.
///
/// A relative `dots.file` is resolved against the job file's directory.
pub fn load_config(path: &Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading job file {}", path.display()))?;
    let mut config: JobConfig =
        toml::from_str(&content).with_context(|| format!("parsing job file {}", path.display()))?;

    if let (Some(file), Some(dir)) = (&config.dots.file, path.parent()) {
        if file.is_relative() {
            config.dots.file = Some(dir.join(file));
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
[simulation]
dt = 0.5
num_steps = 100

[aim]
spacing = [1.0, 1.0, 2.0]
normalization = "poisson"

[[dots.dot]]
position = [0.0, 0.0, 0.0]
frequency = 1.0
dipole = [0.0, 0.0, 1.0]

[[dots.dot]]
position = [3.0, 0.0, 0.0]
frequency = 1.0
dipole = [0.0, 0.0, 1.0]
damping = [10.0, 20.0]

[pulse]
amplitude = 0.1
delay = 10.0
width = 2.0
frequency = 1.0
wavevector = [0.0, 0.0, 1.0]
polarization = [0.0, 0.0, 1.0]
"#;

    #[test]
    fn test_parse_job_with_defaults() {
        let job: JobConfig = toml::from_str(JOB).unwrap();
        job.validate().unwrap();

        assert_eq!(job.simulation.c, 1.0);
        assert_eq!(job.simulation.integrator_order, 4);
        assert_eq!(job.simulation.interaction, InteractionKind::Aim);
        assert_eq!(job.aim.normalization, Normalization::Poisson);
        assert_eq!(job.aim.padding(), 0);
        assert_eq!(job.dots.dot.len(), 2);
        assert!(job.dots.dot[0].t1().is_infinite());
        assert_eq!(job.dots.dot[1].t2(), 20.0);
        assert!(job.pulse.is_some());
        assert_eq!(job.bloch.coupling, 1.0);
        assert!(job.output.save_populations);
    }

    #[test]
    fn test_job_without_dots_is_rejected() {
        let job: JobConfig = toml::from_str("[simulation]\ndt = 1.0\nnum_steps = 4\n[dots]\n").unwrap();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_lattice_dots() {
        let src = r#"
[simulation]
dt = 1.0
num_steps = 4
interaction = "direct"

[dots.lattice]
spacing = 2.0
dipole = [1.0, 0.0, 0.0]
region = { type = "cuboid", centre = [0.0, 0.0, 0.0], half_extents = [1.0, 1.0, 1.0] }
"#;
        let job: JobConfig = toml::from_str(src).unwrap();
        job.validate().unwrap();
        assert_eq!(job.simulation.interaction, InteractionKind::Direct);
        assert_eq!(job.dots.lattice.unwrap().spacing, 2.0);
    }
}
