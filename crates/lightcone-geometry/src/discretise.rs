//! Regular lattices of quantum dots.
//!
//! Given a [`Region`](crate::primitives::Region), this module places
//! identical dots on a cubic lattice of spacing $a$ anchored at the region's
//! lower bounding-box corner, keeping those inside the region.

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use lightcone_core::types::QuantumDot;

use crate::primitives::Region;

/// Parameters of a dot lattice, as read from a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeSpec {
    pub region: Region,
    /// Lattice constant.
    pub spacing: f64,
    /// Transition frequency of every dot.
    #[serde(default)]
    pub frequency: f64,
    /// Dipole moment of every dot.
    pub dipole: [f64; 3],
    /// `[T1, T2]`; omitted means undamped.
    #[serde(default)]
    pub damping: Option<[f64; 2]>,
}

/// Fill `spec.region` with dots.
///
/// # Arguments
/// * `spec` - Region, lattice constant and per-dot parameters.
///
/// # Returns
/// The dots in x-major order, or an empty vector for a non-positive spacing.
pub fn discretise_lattice(spec: &LatticeSpec) -> Vec<QuantumDot> {
    if !(spec.spacing > 0.0 && spec.spacing.is_finite()) {
        return Vec::new();
    }

    let (min, max) = spec.region.bounding_box();
    let counts = (max - min).map(|extent| (extent / spec.spacing + 1e-9).floor() as usize + 1);
    let dipole = Vector3::from(spec.dipole);

    let mut dots = Vec::new();
    for i in 0..counts.x {
        for j in 0..counts.y {
            for k in 0..counts.z {
                let p = min + Vector3::new(i as f64, j as f64, k as f64) * spec.spacing;
                if spec.region.contains(&p) {
                    let mut dot = QuantumDot::new(p, dipole).with_frequency(spec.frequency);
                    if let Some([t1, t2]) = spec.damping {
                        dot = dot.with_damping(t1, t2);
                    }
                    dots.push(dot);
                }
            }
        }
    }

    debug!("Lattice of {} dots at spacing {}", dots.len(), spec.spacing);
    dots
}
