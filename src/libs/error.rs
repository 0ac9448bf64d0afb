use thiserror::Error;

/// Errors of the refinement engine.
///
/// Per-sequence problems (see [`crate::libs::codon::Skip`]) and non-convergence
/// never show up here. Everything but `Io` aborts a whole run; see
/// [`RefineError::is_fatal`].
#[derive(Error, Debug)]
pub enum RefineError {
    /// A record with an empty identifier, an empty residue string or a duplicated id
    #[error("Malformed record in {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    /// Protein and nucleotide identifier sets differ
    #[error("Identifier mismatch in {context}: only protein [{only_protein}], only nucleotide [{only_nucleotide}]")]
    IdentifierMismatch {
        context: String,
        only_protein: String,
        only_nucleotide: String,
    },

    /// Rows of an alignment do not share one width
    #[error("Ragged alignment: row {id} has {len} columns, expected {width}")]
    RaggedAlignment { id: String, len: usize, width: usize },

    #[error("Aligner failed on {label}: {reason}")]
    AlignerFailure { label: String, reason: String },

    #[error("Trimmer failed on {label}: {reason}")]
    TrimmerFailure { label: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RefineError {
    /// An `Io` failure while refining one orthogroup stays local to it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RefineError::Io(_))
    }
}
