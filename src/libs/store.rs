//! Per-orthogroup FASTA records.
//!
//! An orthogroup `N` lives in a directory as `N.faa` (protein) and optionally
//! `N.fna` (coding sequences), either of them possibly gzipped. Records keep
//! their insertion order everywhere.

use crate::libs::error::RefineError;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Residues are wrapped at this width when written
pub const LINE_WIDTH: usize = 60;

/// id => residues, in file order
pub type SeqSet = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqKind {
    Protein,
    Nucleotide,
}

impl SeqKind {
    pub fn extension(&self) -> &'static str {
        match self {
            SeqKind::Protein => "faa",
            SeqKind::Nucleotide => "fna",
        }
    }
}

impl std::fmt::Display for SeqKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeqKind::Protein => write!(f, "protein"),
            SeqKind::Nucleotide => write!(f, "nucleotide"),
        }
    }
}

/// The raw sequences of one orthogroup.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthogroupSet {
    pub id: String,
    pub protein: SeqSet,
    pub nucleotide: Option<SeqSet>,
}

impl OrthogroupSet {
    /// Loads `N.faa` and, when `nucleotide` is set, `N.fna` from `dir`.
    ///
    /// The two files must hold the same identifiers.
    pub fn load<P: AsRef<Path>>(dir: P, id: &str, nucleotide: bool) -> Result<Self, RefineError> {
        let dir = dir.as_ref();
        let protein = load(SeqKind::Protein, member_path(dir, id, SeqKind::Protein))?;

        let nucleotide = if nucleotide {
            let nt = load(SeqKind::Nucleotide, member_path(dir, id, SeqKind::Nucleotide))?;
            assert_identifier_parity(&protein, &nt, id)?;
            Some(nt)
        } else {
            None
        };

        Ok(Self {
            id: id.to_string(),
            protein,
            nucleotide,
        })
    }

    pub fn len(&self) -> usize {
        self.protein.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protein.is_empty()
    }

    pub fn ids(&self) -> IndexSet<String> {
        self.protein.keys().cloned().collect()
    }
}

/// `dir/N.faa`, or `dir/N.faa.gz` when only the gzipped file exists.
pub fn member_path(dir: &Path, id: &str, kind: SeqKind) -> PathBuf {
    let plain = dir.join(format!("{}.{}", id, kind.extension()));
    let gz = dir.join(format!("{}.{}.gz", id, kind.extension()));
    if !plain.is_file() && gz.is_file() {
        gz
    } else {
        plain
    }
}

/// A set of rows sharing one width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    rows: SeqSet,
    width: usize,
}

impl Alignment {
    /// ```
    /// use ogr::libs::store::{Alignment, SeqSet};
    /// let mut rows = SeqSet::new();
    /// rows.insert("a".to_string(), "MK-".to_string());
    /// rows.insert("b".to_string(), "M-K".to_string());
    /// let aln = Alignment::new(rows).unwrap();
    /// assert_eq!(aln.width(), 3);
    /// assert_eq!(aln.len(), 2);
    /// ```
    pub fn new(rows: SeqSet) -> Result<Self, RefineError> {
        let width = rows.values().next().map(|s| s.len()).unwrap_or(0);
        for (id, row) in &rows {
            if row.len() != width {
                return Err(RefineError::RaggedAlignment {
                    id: id.to_string(),
                    len: row.len(),
                    width,
                });
            }
        }

        Ok(Self { rows, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &SeqSet {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&String> {
        self.rows.get(id)
    }

    pub fn ids(&self) -> IndexSet<String> {
        self.rows.keys().cloned().collect()
    }

    /// Rows of `ids`, in alignment order. The width is kept even when every
    /// remaining row has a gap in some column.
    pub fn subset(&self, ids: &IndexSet<String>) -> Alignment {
        let rows = self
            .rows
            .iter()
            .filter(|(id, _)| ids.contains(*id))
            .map(|(id, row)| (id.clone(), row.clone()))
            .collect();

        Alignment {
            rows,
            width: self.width,
        }
    }
}

/// Parses a FASTA file (plain or gzipped).
///
/// Whitespace inside residue lines is dropped. Empty identifiers, empty
/// residue strings and duplicated identifiers are rejected.
pub fn load<P: AsRef<Path>>(kind: SeqKind, path: P) -> Result<SeqSet, RefineError> {
    let path = path.as_ref();
    let malformed = |reason: String| RefineError::MalformedRecord {
        path: path.display().to_string(),
        reason,
    };

    let reader = crate::reader(path)?;
    let mut fa_in = noodles_fasta::io::Reader::new(reader);

    let mut set = SeqSet::new();
    for result in fa_in.records() {
        let record = result.map_err(|e| malformed(e.to_string()))?;
        let name = String::from_utf8(record.name().into()).map_err(|e| malformed(e.to_string()))?;
        if name.is_empty() {
            return Err(malformed("empty identifier".to_string()));
        }

        let residues: String = record
            .sequence()
            .as_ref()
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|&b| b as char)
            .collect();
        if residues.is_empty() {
            return Err(malformed(format!("{} record {} has no residues", kind, name)));
        }

        if set.contains_key(&name) {
            return Err(malformed(format!("duplicated {} identifier {}", kind, name)));
        }
        set.insert(name, residues);
    }

    Ok(set)
}

/// Writes records in insertion order, residues wrapped at [`LINE_WIDTH`].
pub fn write<P: AsRef<Path>>(set: &SeqSet, path: P) -> Result<(), RefineError> {
    let writer = crate::writer(path.as_ref())?;
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(LINE_WIDTH)
        .build_from_writer(writer);

    for (id, residues) in set {
        let definition = noodles_fasta::record::Definition::new(id.to_string(), None);
        let sequence = noodles_fasta::record::Sequence::from(residues.as_bytes().to_vec());
        let record = noodles_fasta::Record::new(definition, sequence);
        fa_out.write_record(&record)?;
    }
    fa_out.get_mut().flush()?;

    Ok(())
}

/// Raw records of the `ids` that are present, preserving the order of `set`.
pub fn subset(set: &SeqSet, ids: &IndexSet<String>) -> SeqSet {
    set.iter()
        .filter(|(id, _)| ids.contains(*id))
        .map(|(id, residues)| (id.clone(), residues.clone()))
        .collect()
}

/// Fails when the two sets do not carry exactly the same identifiers.
pub fn assert_identifier_parity(
    protein: &SeqSet,
    nucleotide: &SeqSet,
    context: &str,
) -> Result<(), RefineError> {
    let protein: IndexSet<String> = protein.keys().cloned().collect();
    let nucleotide: IndexSet<String> = nucleotide.keys().cloned().collect();
    assert_set_parity(&protein, &nucleotide, context)
}

pub fn assert_set_parity(
    protein: &IndexSet<String>,
    nucleotide: &IndexSet<String>,
    context: &str,
) -> Result<(), RefineError> {
    if protein == nucleotide {
        return Ok(());
    }

    Err(RefineError::IdentifierMismatch {
        context: context.to_string(),
        only_protein: protein.difference(nucleotide).join(","),
        only_nucleotide: nucleotide.difference(protein).join(","),
    })
}

/// Orthogroup ids found in `dir` for one sequence kind, sorted.
///
/// `N.faa` and `N.faa.gz` both give `N`; other extensions are ignored.
pub fn scan_dir<P: AsRef<Path>>(dir: P, kind: SeqKind) -> Result<IndexSet<String>, RefineError> {
    let suffix = format!(".{}", kind.extension());
    let mut ids = vec![];
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if let Some(stem) = name.strip_suffix(&suffix) {
            if !stem.is_empty() {
                ids.push(stem.to_string());
            }
        }
    }

    Ok(ids.into_iter().sorted().collect())
}

/// Checks that every orthogroup with a `.faa` also has a `.fna`, and the reverse.
pub fn assert_dir_parity<P: AsRef<Path>>(dir: P) -> Result<IndexSet<String>, RefineError> {
    let dir = dir.as_ref();
    let faa = scan_dir(dir, SeqKind::Protein)?;
    let fna = scan_dir(dir, SeqKind::Nucleotide)?;
    assert_set_parity(&faa, &fna, &dir.display().to_string())?;

    Ok(faa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seq_set(pairs: &[(&str, &str)]) -> SeqSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_keeps_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.faa");
        std::fs::write(&path, ">c desc\nMK\nLV\n>a\nMA\n>b\nMQ\n").unwrap();

        let set = load(SeqKind::Protein, &path).unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        assert_eq!(set["c"], "MKLV");
    }

    #[test]
    fn test_load_empty_residues() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.faa");
        std::fs::write(&path, ">a\nMK\n>b\n\n>c\nMA\n").unwrap();

        assert!(matches!(
            load(SeqKind::Protein, &path),
            Err(RefineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_load_empty_identifier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.faa");
        std::fs::write(&path, ">\nMK\n").unwrap();

        assert!(matches!(
            load(SeqKind::Protein, &path),
            Err(RefineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_load_duplicate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.fna");
        std::fs::write(&path, ">a\nATG\n>a\nATG\n").unwrap();

        assert!(matches!(
            load(SeqKind::Nucleotide, &path),
            Err(RefineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_write_wraps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.fna");
        let long = "ACGT".repeat(40);
        let set = seq_set(&[("x", &long), ("y", "ATG")]);

        write(&set, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">x");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[2].len(), 60);
        assert_eq!(lines[3].len(), 40);
        assert_eq!(lines[4], ">y");
        assert_eq!(lines[5], "ATG");

        let back = load(SeqKind::Nucleotide, &path).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_write_full_device() {
        let path = Path::new("/dev/full");
        if !path.exists() {
            return;
        }
        let set = seq_set(&[("a", "MKLV")]);
        assert!(matches!(write(&set, path), Err(RefineError::Io(_))));
    }

    #[test]
    fn test_identifier_parity() {
        let p = seq_set(&[("a", "M"), ("b", "M")]);
        let n = seq_set(&[("b", "ATG"), ("a", "ATG")]);
        assert!(assert_identifier_parity(&p, &n, "1").is_ok());

        let n = seq_set(&[("a", "ATG"), ("c", "ATG")]);
        match assert_identifier_parity(&p, &n, "1") {
            Err(RefineError::IdentifierMismatch {
                only_protein,
                only_nucleotide,
                ..
            }) => {
                assert_eq!(only_protein, "b");
                assert_eq!(only_nucleotide, "c");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alignment_ragged() {
        let rows = seq_set(&[("a", "MK-"), ("b", "MK")]);
        assert!(matches!(
            Alignment::new(rows),
            Err(RefineError::RaggedAlignment { len: 2, width: 3, .. })
        ));
    }

    #[test]
    fn test_subset() {
        let set = seq_set(&[("a", "M"), ("b", "K"), ("c", "L")]);
        let ids: IndexSet<String> = ["c", "a"].iter().map(|s| s.to_string()).collect();
        let sub = subset(&set, &ids);
        assert_eq!(sub.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_dir_parity() {
        let dir = tempdir().unwrap();
        for name in ["1.faa", "1.fna", "2.faa", "2.fna", "notes.txt"] {
            std::fs::write(dir.path().join(name), ">a\nATG\n").unwrap();
        }
        let ids = assert_dir_parity(dir.path()).unwrap();
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["1", "2"]);

        std::fs::write(dir.path().join("3.faa"), ">a\nM\n").unwrap();
        assert!(matches!(
            assert_dir_parity(dir.path()),
            Err(RefineError::IdentifierMismatch { .. })
        ));
    }

    #[test]
    fn test_dir_gzipped() {
        use flate2::write::GzEncoder;

        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("1.faa"), ">a\nMK\n>b\nMA\n").unwrap();
        std::fs::write(dir.path().join("1.fna"), ">a\nATGAAA\n>b\nATGGCA\n").unwrap();
        for (name, text) in [
            ("2.faa.gz", ">a\nMK\n>b\nMA\n"),
            ("2.fna.gz", ">a\nATGAAA\n>b\nATGGCA\n"),
        ] {
            let file = std::fs::File::create(dir.path().join(name)).unwrap();
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            encoder.write_all(text.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }

        let ids = assert_dir_parity(dir.path()).unwrap();
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["1", "2"]);

        let og = OrthogroupSet::load(dir.path(), "2", true).unwrap();
        assert_eq!(og.len(), 2);
        assert_eq!(og.nucleotide.unwrap()["b"], "ATGGCA");
    }

    #[test]
    fn test_orthogroup_load() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("7.faa"), ">a\nMK\n>b\nMA\n").unwrap();
        std::fs::write(dir.path().join("7.fna"), ">a\nATGAAA\n>b\nATGGCA\n").unwrap();

        let og = OrthogroupSet::load(dir.path(), "7", true).unwrap();
        assert_eq!(og.len(), 2);
        assert!(og.nucleotide.is_some());

        std::fs::write(dir.path().join("7.fna"), ">a\nATGAAA\n").unwrap();
        assert!(matches!(
            OrthogroupSet::load(dir.path(), "7", true),
            Err(RefineError::IdentifierMismatch { .. })
        ));
    }
}
