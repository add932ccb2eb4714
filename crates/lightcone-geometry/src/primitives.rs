//! Regions that bound a regular lattice of dots.
//!
//! Each region is a closed volume described by a few TOML parameters and can
//! be filled with dots by the [`discretise`](crate::discretise) module.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A closed volume in 3D space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Region {
    Sphere(Sphere),
    Cuboid(Cuboid),
}

/// A sphere defined by its centre and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub centre: [f64; 3],
    pub radius: f64,
}

/// An axis-aligned cuboid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub centre: [f64; 3],
    /// Half-extents along x, y, z.
    pub half_extents: [f64; 3],
}

impl Region {
    /// Check whether a point lies inside (or on the boundary of) this region.
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        match self {
            Region::Sphere(s) => {
                (point - Vector3::from(s.centre)).norm_squared() <= s.radius * s.radius + 1e-12
            }
            Region::Cuboid(c) => (0..3).all(|a| (point[a] - c.centre[a]).abs() <= c.half_extents[a] + 1e-12),
        }
    }

    /// Axis-aligned bounding box: returns (min_corner, max_corner).
    pub fn bounding_box(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (centre, half) = match self {
            Region::Sphere(s) => (Vector3::from(s.centre), Vector3::repeat(s.radius)),
            Region::Cuboid(c) => (Vector3::from(c.centre), Vector3::from(c.half_extents)),
        };
        (centre - half, centre + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sphere_containment() {
        let sphere = Region::Sphere(Sphere {
            centre: [1.0, 0.0, 0.0],
            radius: 2.0,
        });
        assert!(sphere.contains(&Vector3::new(3.0, 0.0, 0.0)));
        assert!(!sphere.contains(&Vector3::new(3.0, 0.1, 0.0)));
        let (lo, hi) = sphere.bounding_box();
        assert_eq!(lo, Vector3::new(-1.0, -2.0, -2.0));
        assert_eq!(hi, Vector3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_cuboid_containment() {
        let cuboid = Region::Cuboid(Cuboid {
            centre: [0.0, 0.0, 0.0],
            half_extents: [1.0, 2.0, 0.5],
        });
        assert!(cuboid.contains(&Vector3::new(-1.0, 2.0, 0.5)));
        assert!(!cuboid.contains(&Vector3::new(0.0, 0.0, 0.6)));

        let (lo, hi) = cuboid.bounding_box();
        for a in 0..3 {
            assert_abs_diff_eq!(hi[a] - lo[a], 2.0 * [1.0, 2.0, 0.5][a], epsilon = 1e-12);
            assert_abs_diff_eq!(0.5 * (hi[a] + lo[a]), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_region_from_toml_tag() {
        let region: Region = toml::from_str("type = \"sphere\"\ncentre = [0.0, 0.0, 0.0]\nradius = 3.0\n").unwrap();
        assert!(matches!(region, Region::Sphere(Sphere { radius, .. }) if radius == 3.0));
    }
}
