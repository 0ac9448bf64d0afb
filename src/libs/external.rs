//! External aligners and trimmers.
//!
//! Records go in and come out in memory; files are only written inside the
//! scratch directory handed over by the caller.

use crate::libs::error::RefineError;
use crate::libs::store::{self, Alignment, SeqKind, SeqSet};
use cmd_lib::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimMode {
    /// trimAl's `-automated1` heuristic
    Automated,
    /// trimAl's `-gt`: keep columns where at least this fraction of the
    /// sequences have no gap
    GapThreshold(f64),
}

impl TrimMode {
    pub fn validate(&self) -> Result<(), RefineError> {
        match self {
            TrimMode::Automated => Ok(()),
            TrimMode::GapThreshold(gt) if (0.0..=1.0).contains(gt) => Ok(()),
            TrimMode::GapThreshold(gt) => Err(RefineError::InvalidConfig(format!(
                "gap threshold {} is outside [0.0, 1.0]",
                gt
            ))),
        }
    }
}

pub trait Aligner: Send + Sync {
    fn name(&self) -> &str;

    /// Aligns `records`. `label` names the scratch files and the error.
    fn align(&self, label: &str, records: &SeqSet, scratch: &Path)
        -> Result<Alignment, RefineError>;
}

pub trait Trimmer: Send + Sync {
    fn name(&self) -> &str;

    fn trim(
        &self,
        label: &str,
        alignment: &Alignment,
        mode: TrimMode,
        scratch: &Path,
    ) -> Result<Alignment, RefineError>;
}

fn locate(bin: &str) -> Result<String, String> {
    which::which(bin)
        .map(|p| p.display().to_string())
        .map_err(|_| format!("{} not found in PATH", bin))
}

// Reads a tool's output; an unreadable, empty or ragged result is `fail`
fn read_output<F>(path: &Path, fail: F) -> Result<Alignment, RefineError>
where
    F: Fn(String) -> RefineError,
{
    let rows = store::load(SeqKind::Protein, path).map_err(|e| fail(e.to_string()))?;
    if rows.is_empty() {
        return Err(fail("no records in output".to_string()));
    }
    Alignment::new(rows).map_err(|e| fail(e.to_string()))
}

/// MAFFT with `--auto`
#[derive(Debug, Clone)]
pub struct Mafft {
    bin: String,
    threads: usize,
}

impl Mafft {
    pub fn new(threads: usize) -> Result<Self, RefineError> {
        let bin = locate("mafft").map_err(|reason| RefineError::AlignerFailure {
            label: "mafft".to_string(),
            reason,
        })?;
        Ok(Self { bin, threads })
    }
}

impl Aligner for Mafft {
    fn name(&self) -> &str {
        "mafft"
    }

    fn align(
        &self,
        label: &str,
        records: &SeqSet,
        scratch: &Path,
    ) -> Result<Alignment, RefineError> {
        let fail = |reason: String| RefineError::AlignerFailure {
            label: label.to_string(),
            reason,
        };

        let input = scratch.join(label);
        let output = scratch.join(format!("{}.aln", label));
        store::write(records, &input)?;

        let bin = &self.bin;
        let threads = self.threads;
        let infile = input.display().to_string();
        let outfile = output.display().to_string();
        run_cmd!(${bin} --auto --thread ${threads} --quiet ${infile} > ${outfile})
            .map_err(|e| fail(e.to_string()))?;

        read_output(&output, fail)
    }
}

/// MUSCLE 5 (`-align`)
#[derive(Debug, Clone)]
pub struct Muscle {
    bin: String,
    threads: usize,
}

impl Muscle {
    pub fn new(threads: usize) -> Result<Self, RefineError> {
        let bin = locate("muscle").map_err(|reason| RefineError::AlignerFailure {
            label: "muscle".to_string(),
            reason,
        })?;
        Ok(Self { bin, threads })
    }
}

impl Aligner for Muscle {
    fn name(&self) -> &str {
        "muscle"
    }

    fn align(
        &self,
        label: &str,
        records: &SeqSet,
        scratch: &Path,
    ) -> Result<Alignment, RefineError> {
        let fail = |reason: String| RefineError::AlignerFailure {
            label: label.to_string(),
            reason,
        };

        let input = scratch.join(label);
        let output = scratch.join(format!("{}.aln", label));
        store::write(records, &input)?;

        let bin = &self.bin;
        let threads = self.threads;
        let infile = input.display().to_string();
        let outfile = output.display().to_string();
        run_cmd!(${bin} -align ${infile} -output ${outfile} -threads ${threads})
            .map_err(|e| fail(e.to_string()))?;

        read_output(&output, fail)
    }
}

#[derive(Debug, Clone)]
pub struct TrimAl {
    bin: String,
}

impl TrimAl {
    pub fn new() -> Result<Self, RefineError> {
        let bin = locate("trimal").map_err(|reason| RefineError::TrimmerFailure {
            label: "trimal".to_string(),
            reason,
        })?;
        Ok(Self { bin })
    }
}

impl Trimmer for TrimAl {
    fn name(&self) -> &str {
        "trimal"
    }

    fn trim(
        &self,
        label: &str,
        alignment: &Alignment,
        mode: TrimMode,
        scratch: &Path,
    ) -> Result<Alignment, RefineError> {
        let fail = |reason: String| RefineError::TrimmerFailure {
            label: label.to_string(),
            reason,
        };

        let input = scratch.join(label);
        let output = scratch.join(format!("{}.trim", label));
        store::write(alignment.rows(), &input)?;

        let bin = &self.bin;
        let infile = input.display().to_string();
        let outfile = output.display().to_string();
        let result = match mode {
            TrimMode::Automated => {
                run_cmd!(${bin} -in ${infile} -out ${outfile} -fasta -automated1)
            }
            TrimMode::GapThreshold(gt) => {
                run_cmd!(${bin} -in ${infile} -out ${outfile} -fasta -gt ${gt})
            }
        };
        result.map_err(|e| fail(e.to_string()))?;

        read_output(&output, fail)
    }
}
