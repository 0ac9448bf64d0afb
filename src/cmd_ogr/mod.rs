//! Subcommand modules for the `ogr` binary.

pub mod codon;
pub mod cover;
pub mod parity;
pub mod refine;
