//! File format parsers for dot ensembles.
//!
//! Supported formats:
//! - [`dots`] - plain-text dot tables, one dot per line

pub mod dots;

use std::path::Path;

use thiserror::Error;

use lightcone_core::types::QuantumDot;

/// Errors during dot file parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    FormatError { line: usize, message: String },
}

/// Read and parse a dot file from disk.
pub fn load_dots(path: &Path) -> Result<Vec<QuantumDot>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    dots::parse_dots(&content)
}
