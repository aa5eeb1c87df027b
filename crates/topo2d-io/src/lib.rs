//! File I/O collaborators for the topology optimization core.
//!
//! The solver core never touches the filesystem; reading an initial density
//! field and writing design snapshots happen here.

pub mod density;
pub mod error;
pub mod output;

pub use density::read_density_file;
pub use error::{IoError, Result};
pub use output::write_density_file;
