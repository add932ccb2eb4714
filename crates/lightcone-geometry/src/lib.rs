//! # Lightcone Geometry
//!
//! Dot ensembles for the lightcone framework. This crate provides:
//!
//! - **Regions** ([`primitives`]) - Spheres and cuboids that bound a lattice.
//! - **Discretisation** ([`discretise`]) - Fills a region with identical
//!   quantum dots on a cubic lattice.
//! - **File parsers** ([`parsers`]) - Read and write plain-text dot tables.

pub mod discretise;
pub mod parsers;
pub mod primitives;
