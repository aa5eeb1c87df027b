//! Density-field writer.
//!
//! Writes the same plain-text format the reader consumes: a small header of
//! `#` comment lines, then the field row-major over the `ny x nx` grid. The
//! precision is chosen so a write/read round trip reproduces the field
//! bit-for-bit.

use crate::error::{IoError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a density field (solver column-major order) to `path`.
pub fn write_density_file(
    path: &Path,
    densities: &[f64],
    num_elements_x: usize,
    num_elements_y: usize,
) -> Result<()> {
    if densities.len() != num_elements_x * num_elements_y {
        return Err(IoError::InvalidData(format!(
            "field has {} values for a {}x{} grid",
            densities.len(),
            num_elements_x,
            num_elements_y
        )));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "# density field, {} x {} elements, row-major",
        num_elements_x, num_elements_y
    )?;
    for row in 0..num_elements_y {
        let mut line = String::new();
        for col in 0..num_elements_x {
            if col > 0 {
                line.push(' ');
            }
            line.push_str(&format!("{:.16e}", densities[col * num_elements_y + row]));
        }
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::read_density_file;

    #[test]
    fn writer_and_reader_round_trip() {
        let path = std::env::temp_dir().join("topo2d_density_roundtrip.txt");
        let field = vec![0.1, 0.9, 0.25, 0.75, 0.5, 1.0];
        write_density_file(&path, &field, 3, 2).unwrap();
        let back = read_density_file(&path, 3, 2).unwrap();
        assert_eq!(back, field);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_mismatched_field() {
        let path = std::env::temp_dir().join("topo2d_density_bad.txt");
        assert!(matches!(
            write_density_file(&path, &[0.5; 5], 3, 2),
            Err(IoError::InvalidData(_))
        ));
    }
}
