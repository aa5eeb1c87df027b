//! Plain-text density-field reader.
//!
//! The file format is one whitespace-separated floating value per element,
//! row-major over the `ny x nx` element grid (top row first). Lines starting
//! with `#` are comments. The solver orders elements column-major, so the
//! reader transposes while loading and returns values ready for
//! `Problem::load_densities`.

use crate::error::{IoError, Result};
use std::fs;
use std::path::Path;

/// Read an initial-density file for an `nx` x `ny` element grid.
///
/// Returns the densities in the solver's column-major element order.
pub fn read_density_file(
    path: &Path,
    num_elements_x: usize,
    num_elements_y: usize,
) -> Result<Vec<f64>> {
    let contents = fs::read_to_string(path)?;
    parse_density_text(&contents, num_elements_x, num_elements_y)
        .map_err(|err| IoError::Parse(format!("{}: {}", path.display(), err)))
}

fn parse_density_text(text: &str, nx: usize, ny: usize) -> std::result::Result<Vec<f64>, String> {
    let mut row_major = Vec::with_capacity(nx * ny);
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| format!("not a number: {:?}", token))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("density {} outside [0, 1]", value));
            }
            row_major.push(value);
        }
    }
    if row_major.len() != nx * ny {
        return Err(format!(
            "expected {} values for a {}x{} grid, found {}",
            nx * ny,
            nx,
            ny,
            row_major.len()
        ));
    }

    // Row-major (ny rows of nx values) to the solver's column-major order.
    let mut column_major = vec![0.0; nx * ny];
    for row in 0..ny {
        for col in 0..nx {
            column_major[col * ny + row] = row_major[row * nx + col];
        }
    }
    Ok(column_major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_major_grid() {
        let text = "# header\n0.1 0.2 0.3\n0.4 0.5 0.6\n";
        let values = parse_density_text(text, 3, 2).unwrap();
        // Column-major: first column of the grid is (0.1, 0.4).
        assert_eq!(values, vec![0.1, 0.4, 0.2, 0.5, 0.3, 0.6]);
    }

    #[test]
    fn rejects_wrong_count() {
        assert!(parse_density_text("0.5 0.5 0.5", 2, 2).is_err());
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(parse_density_text("0.5 1.5 0.5 0.5", 2, 2).is_err());
        assert!(parse_density_text("0.5 abc 0.5 0.5", 2, 2).is_err());
    }

    #[test]
    fn missing_file_reports_io_error() {
        let missing = Path::new("definitely/not/here.txt");
        assert!(matches!(
            read_density_file(missing, 2, 2),
            Err(IoError::Io(_))
        ));
    }
}
