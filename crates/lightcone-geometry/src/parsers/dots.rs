//! Parser for plain-text dot files.
//!
//! One dot per line, whitespace separated:
//! ```text
//! # x y z frequency dx dy dz T1 T2
//! 0.0 0.0 0.0 2278.9 0.0 0.0 1.0 10.0 20.0
//! 4.0 4.0 4.0 2278.9 0.0 0.0 1.0 10.0 20.0
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. The two damping
//! columns may be omitted together, in which case the dot is undamped.

use std::fmt::Write;

use nalgebra::Vector3;

use lightcone_core::types::QuantumDot;

use super::ParseError;

/// Parse a dot file from a string.
pub fn parse_dots(content: &str) -> Result<Vec<QuantumDot>, ParseError> {
    let mut dots = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 7 && parts.len() != 9 {
            return Err(ParseError::FormatError {
                line: idx + 1,
                message: format!(
                    "Expected 'x y z frequency dx dy dz [T1 T2]', got {} columns",
                    parts.len()
                ),
            });
        }

        let mut values = [0.0; 9];
        for (v, part) in values.iter_mut().zip(&parts) {
            *v = part.parse().map_err(|_| ParseError::FormatError {
                line: idx + 1,
                message: format!("Invalid number: {}", part),
            })?;
        }

        let mut dot = QuantumDot::new(
            Vector3::new(values[0], values[1], values[2]),
            Vector3::new(values[4], values[5], values[6]),
        )
        .with_frequency(values[3]);
        if parts.len() == 9 {
            dot = dot.with_damping(values[7], values[8]);
        }
        dots.push(dot);
    }

    Ok(dots)
}

/// Write dots in the format [`parse_dots`] reads.
pub fn format_dots(dots: &[QuantumDot]) -> String {
    let mut s = String::from("# x y z frequency dx dy dz T1 T2\n");
    for d in dots {
        let _ = writeln!(
            s,
            "{} {} {} {} {} {} {} {} {}",
            d.position.x,
            d.position.y,
            d.position.z,
            d.frequency,
            d.dipole.x,
            d.dipole.y,
            d.dipole.z,
            d.t1(),
            d.t2()
        );
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_file() {
        let content = "# two dots\n0 0 0 2.5 0 0 1 10 20\n\n4.0 4.0 4.0 2.5 1 0 0\n";
        let dots = parse_dots(content).unwrap();
        assert_eq!(dots.len(), 2);
        assert_eq!(dots[0].t1(), 10.0);
        assert_eq!(dots[0].dipole, Vector3::z());
        assert_eq!(dots[1].position, Vector3::new(4.0, 4.0, 4.0));
        assert!(dots[1].t2().is_infinite());
    }

    #[test]
    fn test_bad_number_reports_line() {
        let content = "0 0 0 1 0 0 1\n0 0 x 1 0 0 1\n";
        let err = parse_dots(content).unwrap_err().to_string();
        assert!(err.contains("line 2") && err.contains("Invalid"), "{}", err);
    }

    #[test]
    fn test_wrong_column_count() {
        let err = parse_dots("1 2 3 4 5\n").unwrap_err();
        assert!(matches!(err, ParseError::FormatError { line: 1, .. }));
    }

    #[test]
    fn test_written_file_reads_back() {
        let dots = vec![
            QuantumDot::new(Vector3::new(0.5, -1.0, 2.0), Vector3::x())
                .with_frequency(3.0)
                .with_damping(1.0, 2.0),
            QuantumDot::new(Vector3::zeros(), Vector3::y()),
        ];
        let parsed = parse_dots(&format_dots(&dots)).unwrap();
        assert_eq!(parsed, dots);
    }
}
