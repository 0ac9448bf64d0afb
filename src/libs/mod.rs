pub mod codon;
pub mod coverage;
pub mod error;
pub mod external;
pub mod io;
pub mod manifest;
pub mod refine;
pub mod store;

pub use error::RefineError;
