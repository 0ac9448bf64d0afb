//! Back-translation of protein alignment rows into codon alignment rows.

use crate::libs::error::RefineError;
use crate::libs::store::{Alignment, SeqSet};

pub const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

/// Why a sequence was left out of the codon alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skip {
    /// Fewer codons than ungapped residues
    InsufficientCodons,
    /// The coding sequence can't be split into exactly one codon per residue
    FrameMismatch,
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::InsufficientCodons => write!(f, "InsufficientCodons"),
            Skip::FrameMismatch => write!(f, "FrameMismatch"),
        }
    }
}

pub fn is_gap(c: u8) -> bool {
    c == b'-' || c == b'.'
}

pub fn is_wildcard(c: u8) -> bool {
    matches!(c, b'X' | b'x' | b'?')
}

fn ends_with_stop(cds: &[u8]) -> bool {
    if cds.len() < 3 {
        return false;
    }
    let tail = cds[cds.len() - 3..].to_ascii_uppercase();
    STOP_CODONS.iter().any(|stop| tail.as_slice() == stop.as_slice())
}

/// Maps one aligned protein row onto its coding sequence.
///
/// Gap columns become `---`. Wildcard columns (`X`, `?`) become `???` while
/// still consuming a codon. Other columns take the next codon verbatim.
/// A trailing stop codon is dropped when it is the only thing keeping the
/// frame from matching.
///
/// ```
/// use ogr::libs::codon::map_to_codon_alignment;
/// assert_eq!(
///     map_to_codon_alignment("MA-K", "ATGGCAAAATAA").unwrap(),
///     "ATGGCA---AAA"
/// );
/// ```
pub fn map_to_codon_alignment(protein_aligned: &str, raw_cds: &str) -> Result<String, Skip> {
    let protein = protein_aligned.as_bytes();
    let mut cds = raw_cds.as_bytes();

    let residues = protein.iter().filter(|&&c| !is_gap(c)).count();
    if cds.len() / 3 < residues {
        return Err(Skip::InsufficientCodons);
    }

    if cds.len() != residues * 3 {
        if !ends_with_stop(cds) {
            return Err(Skip::FrameMismatch);
        }
        cds = &cds[..cds.len() - 3];
        if cds.len() != residues * 3 {
            return Err(Skip::FrameMismatch);
        }
    }

    let mut codons = cds.chunks_exact(3);
    let mut out = String::with_capacity(protein.len() * 3);
    for &c in protein {
        if is_gap(c) {
            out.push_str("---");
            continue;
        }

        let codon = codons.next().ok_or(Skip::FrameMismatch)?;
        if is_wildcard(c) {
            out.push_str("???");
        } else {
            out.push_str(&String::from_utf8_lossy(codon));
        }
    }

    Ok(out)
}

/// Codon alignment of every protein row that has a coding sequence in `cds`.
///
/// Rows that can't be mapped are left out and returned with their reason.
pub fn map_alignment(
    protein: &Alignment,
    cds: &SeqSet,
) -> Result<(Alignment, Vec<(String, Skip)>), RefineError> {
    let mut rows = SeqSet::new();
    let mut skipped = vec![];

    for (id, row) in protein.rows() {
        let Some(raw) = cds.get(id) else {
            continue;
        };
        match map_to_codon_alignment(row, raw) {
            Ok(codon_row) => {
                rows.insert(id.clone(), codon_row);
            }
            Err(skip) => {
                log::debug!("{}: {}", id, skip);
                skipped.push((id.clone(), skip));
            }
        }
    }

    Ok((Alignment::new(rows)?, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_gaps(s: &str) -> String {
        s.chars().filter(|&c| c != '-').collect()
    }

    #[test]
    fn test_exact_length() {
        let cds = "ATGGCAAAACTG";
        let out = map_to_codon_alignment("-MA-KL", cds).unwrap();
        assert_eq!(out, "---ATGGCA---AAACTG");
        assert_eq!(strip_gaps(&out), cds);
        assert_eq!(out.len(), 18);
    }

    #[test]
    fn test_trailing_stop() {
        assert_eq!(
            map_to_codon_alignment("MA-K", "ATGGCAAAATAA").unwrap(),
            "ATGGCA---AAA"
        );
        // lowercase stop
        assert_eq!(
            map_to_codon_alignment("MAK", "atggcaaaatga").unwrap(),
            "atggcaaaa"
        );
    }

    #[test]
    fn test_frame_mismatch() {
        // extra codon that is not a stop
        assert_eq!(
            map_to_codon_alignment("MAK", "ATGGCAAAACTG"),
            Err(Skip::FrameMismatch)
        );
        // partial codon
        assert_eq!(
            map_to_codon_alignment("MAK", "ATGGCAAAAC"),
            Err(Skip::FrameMismatch)
        );
        // stop removed, still one codon too many
        assert_eq!(
            map_to_codon_alignment("MA", "ATGGCAAAATAG"),
            Err(Skip::FrameMismatch)
        );
    }

    #[test]
    fn test_insufficient_codons() {
        assert_eq!(
            map_to_codon_alignment("MAKL", "ATGGCAAAA"),
            Err(Skip::InsufficientCodons)
        );
        assert_eq!(
            map_to_codon_alignment("MAK", "ATGGCAAA"),
            Err(Skip::InsufficientCodons)
        );
    }

    #[test]
    fn test_wildcard_consumes_codon() {
        assert_eq!(
            map_to_codon_alignment("MX-K", "ATGNNNAAA").unwrap(),
            "ATG???---AAA"
        );
        assert_eq!(
            map_to_codon_alignment("M?K", "ATGGCAAAA").unwrap(),
            "ATG???AAA"
        );
    }

    #[test]
    fn test_idempotent() {
        let first = map_to_codon_alignment("M-AK.", "ATGGCAAAA").unwrap();
        let second = map_to_codon_alignment("M-AK.", "ATGGCAAAA").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "ATG---GCAAAA---");
    }

    #[test]
    fn test_map_alignment() {
        let rows: SeqSet = [("a", "MA-K"), ("b", "MAQK"), ("c", "M--K")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let protein = Alignment::new(rows).unwrap();

        let cds: SeqSet = [
            ("a", "ATGGCAAAATAA"),
            ("b", "ATGGCACAAAAAC"),
            ("c", "ATGAAA"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let (codon, skipped) = map_alignment(&protein, &cds).unwrap();
        assert_eq!(codon.len(), 2);
        assert_eq!(codon.width(), 12);
        assert_eq!(codon.get("a").unwrap(), "ATGGCA---AAA");
        assert_eq!(codon.get("c").unwrap(), "ATG------AAA");
        assert_eq!(skipped, vec![("b".to_string(), Skip::FrameMismatch)]);

        // the protein alignment is untouched
        assert_eq!(protein.len(), 3);
    }
}
