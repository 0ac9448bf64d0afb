use crate::libs::codon::is_gap;
use crate::libs::error::RefineError;
use crate::libs::store::Alignment;
use indexmap::{IndexMap, IndexSet};

/// Residues of a trimmed row over the row length before trimming.
///
/// `full_len` shorter than the row itself falls back to the row length. A
/// zero length gives coverage 0.
///
/// ```
/// use ogr::libs::coverage::coverage;
/// assert_eq!(coverage("MK--", 4), 0.5);
/// assert_eq!(coverage("MK", 8), 0.25);
/// assert_eq!(coverage("", 0), 0.0);
/// ```
pub fn coverage(row: &str, full_len: usize) -> f64 {
    let full_len = full_len.max(row.len());
    if full_len == 0 {
        return 0.0;
    }
    residues(row) as f64 / full_len as f64
}

/// Non-gap characters of a row
pub fn residues(row: &str) -> usize {
    row.bytes().filter(|&c| !is_gap(c)).count()
}

/// Accepted thresholds lie in `(0.1, 1.0]`.
pub fn check_min_coverage(min_coverage: f64) -> Result<(), RefineError> {
    if min_coverage > 0.1 && min_coverage <= 1.0 {
        Ok(())
    } else {
        Err(RefineError::InvalidConfig(format!(
            "minimum coverage {} is outside (0.1, 1.0]",
            min_coverage
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub retained: IndexSet<String>,
    pub discarded: IndexSet<String>,
    /// id => coverage, for every row that was evaluated
    pub coverage: IndexMap<String, f64>,
}

impl Partition {
    pub fn passes(&self, id: &str) -> bool {
        self.retained.contains(id)
    }
}

/// Splits the rows of a trimmed alignment by their coverage.
///
/// `full_width` is the width of the alignment before trimming, so columns the
/// trimmer removed count against every row.
pub fn filter(
    alignment: &Alignment,
    full_width: usize,
    min_coverage: f64,
) -> Result<Partition, RefineError> {
    check_min_coverage(min_coverage)?;

    let mut partition = Partition::default();
    for (id, row) in alignment.rows() {
        let cov = coverage(row, full_width);
        partition.coverage.insert(id.clone(), cov);
        if cov >= min_coverage {
            partition.retained.insert(id.clone());
        } else {
            partition.discarded.insert(id.clone());
        }
    }

    Ok(partition)
}

/// Outcome of filtering a protein alignment together with its codon alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedPartition {
    /// Ids that survive into the next round
    pub retained: IndexSet<String>,
    pub discarded: IndexSet<String>,
    pub protein: Partition,
    pub nucleotide: Option<Partition>,
    /// Ids whose protein and nucleotide rows disagree
    pub divergent: IndexSet<String>,
}

/// Filters each type on its own rows.
///
/// `protein` and `nucleotide` pair a trimmed alignment with its width before
/// trimming. An id is retained when its protein row passes and, if it has a nucleotide
/// row, that row passes too. The per-type partitions are left as they are, so
/// the two `.trim.filter` outputs can differ; such ids are listed in
/// `divergent`. Ids of `expected` that are absent from the protein alignment
/// are discarded.
pub fn filter_paired(
    protein: (&Alignment, usize),
    nucleotide: Option<(&Alignment, usize)>,
    expected: &IndexSet<String>,
    min_coverage: f64,
) -> Result<PairedPartition, RefineError> {
    let protein = filter(protein.0, protein.1, min_coverage)?;
    let nucleotide = match nucleotide {
        Some((aln, width)) => Some(filter(aln, width, min_coverage)?),
        None => None,
    };

    let mut paired = PairedPartition::default();
    for id in expected {
        let protein_ok = protein.passes(id);
        let nucleotide_ok = match &nucleotide {
            Some(nt) if nt.coverage.contains_key(id) => {
                let nt_ok = nt.passes(id);
                if nt_ok != protein_ok {
                    paired.divergent.insert(id.clone());
                }
                nt_ok
            }
            _ => true,
        };

        if protein_ok && nucleotide_ok {
            paired.retained.insert(id.clone());
        } else {
            paired.discarded.insert(id.clone());
        }
    }
    paired.protein = protein;
    paired.nucleotide = nucleotide;

    Ok(paired)
}
