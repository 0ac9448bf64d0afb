//! The align / trim / filter fixed-point loop.
//!
//! Each round works on the raw records of the current survivors:
//!
//! * align the protein records
//! * back-translate the rows into codons when nucleotide output is requested
//! * trim every alignment
//! * drop rows whose trimmed coverage is too low
//!
//! The loop stops when a round removes nothing, when the survivors fall below
//! [`MIN_MEMBERS`], or at the iteration cap.
//!
//! Coverage is measured against the width of the alignment before trimming.

use crate::libs::codon;
use crate::libs::coverage::{self, PairedPartition};
use crate::libs::error::RefineError;
use crate::libs::external::{Aligner, TrimMode, Trimmer};
use crate::libs::manifest::{Entry, Event};
use crate::libs::store::{self, Alignment, OrthogroupSet, SeqKind};
use indexmap::IndexSet;
use rayon::prelude::*;
use std::path::Path;

/// Orthogroups smaller than this never enter the loop
pub const MIN_MEMBERS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RefineConfig {
    pub min_coverage: f64,
    /// `None` disables trimming and filtering
    pub trim: Option<TrimMode>,
    pub max_iter: usize,
    /// Also build codon alignments from `N.fna`
    pub nucleotide: bool,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.5,
            trim: None,
            max_iter: 5,
            nucleotide: false,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<(), RefineError> {
        coverage::check_min_coverage(self.min_coverage)?;
        if self.max_iter < 1 {
            return Err(RefineError::InvalidConfig(
                "the iteration cap must be at least 1".to_string(),
            ));
        }
        if let Some(mode) = &self.trim {
            mode.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementState {
    pub iteration: usize,
    pub surviving: IndexSet<String>,
    pub changed: bool,
}

impl RefinementState {
    pub fn new(ids: IndexSet<String>) -> Self {
        Self {
            iteration: 0,
            surviving: ids,
            changed: true,
        }
    }

    /// Keeps the survivors that are also in `retained`. Ids outside the
    /// current survivors are ignored, so the set never grows.
    pub fn advance(&mut self, retained: &IndexSet<String>) -> bool {
        let next: IndexSet<String> = self
            .surviving
            .iter()
            .filter(|id| retained.contains(*id))
            .cloned()
            .collect();
        self.changed = next.len() != self.surviving.len();
        self.surviving = next;
        self.changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Converged,
    NonConverged,
    Depleted,
    /// Abandoned after a non-fatal error, see [`RefineError::is_fatal`]
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Converged => write!(f, "converged"),
            Status::NonConverged => write!(f, "non_converged"),
            Status::Depleted => write!(f, "depleted"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub orthogroup: String,
    pub input: usize,
    pub rounds: usize,
    pub status: Status,
    pub survivors: IndexSet<String>,
    pub entries: Vec<Entry>,
}

impl Outcome {
    fn failed(og: &OrthogroupSet, err: &RefineError) -> Self {
        let detail = err.to_string().replace(['\t', '\n'], " ");
        Self {
            orthogroup: og.id.clone(),
            input: og.len(),
            rounds: 0,
            status: Status::Failed,
            survivors: IndexSet::new(),
            entries: vec![Entry::new(&og.id, Event::Failed, None, detail)],
        }
    }
}

pub struct RefinementLoop<'a> {
    config: RefineConfig,
    aligner: &'a dyn Aligner,
    trimmer: Option<&'a dyn Trimmer>,
}

impl<'a> RefinementLoop<'a> {
    pub fn new(
        config: RefineConfig,
        aligner: &'a dyn Aligner,
        trimmer: Option<&'a dyn Trimmer>,
    ) -> Result<Self, RefineError> {
        config.validate()?;
        if config.trim.is_some() && trimmer.is_none() {
            return Err(RefineError::InvalidConfig(
                "a trimming mode is set but no trimmer is available".to_string(),
            ));
        }

        Ok(Self {
            config,
            aligner,
            trimmer,
        })
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Refines one orthogroup, writing its alignments into `outdir`.
    pub fn run(&self, og: &OrthogroupSet, outdir: &Path) -> Result<Outcome, RefineError> {
        if self.config.nucleotide {
            let empty = store::SeqSet::new();
            let cds = og.nucleotide.as_ref().unwrap_or(&empty);
            store::assert_identifier_parity(&og.protein, cds, &og.id)?;
        }

        let mut state = RefinementState::new(og.ids());
        let mut entries = vec![];
        let mut skipped: IndexSet<String> = IndexSet::new();

        let status = loop {
            state.iteration += 1;
            log::debug!(
                "{}: round {} with {} sequences",
                og.id,
                state.iteration,
                state.surviving.len()
            );

            let Some(retained) = self.round(og, &state, outdir, &mut entries, &mut skipped)?
            else {
                state.changed = false;
                break Status::Converged;
            };

            if !state.advance(&retained) {
                break Status::Converged;
            }

            if state.surviving.len() < MIN_MEMBERS {
                log::warn!(
                    "{}: only {} sequences left after round {}",
                    og.id,
                    state.surviving.len(),
                    state.iteration
                );
                entries.push(Entry::new(
                    &og.id,
                    Event::Depleted,
                    None,
                    format!("round={} survivors={}", state.iteration, state.surviving.len()),
                ));
                break Status::Depleted;
            }

            if state.iteration >= self.config.max_iter {
                log::warn!(
                    "{}: not converged after {} rounds",
                    og.id,
                    state.iteration
                );
                entries.push(Entry::new(
                    &og.id,
                    Event::NonConverged,
                    None,
                    format!("rounds={} survivors={}", state.iteration, state.surviving.len()),
                ));
                break Status::NonConverged;
            }
        };

        log::info!(
            "{}: {} after {} round(s), {}/{} sequences kept",
            og.id,
            status,
            state.iteration,
            state.surviving.len(),
            og.len()
        );

        Ok(Outcome {
            orthogroup: og.id.clone(),
            input: og.len(),
            rounds: state.iteration,
            status,
            survivors: state.surviving,
            entries,
        })
    }

    // One pass; returns the retained ids, or None when nothing is filtered
    fn round(
        &self,
        og: &OrthogroupSet,
        state: &RefinementState,
        outdir: &Path,
        entries: &mut Vec<Entry>,
        skipped: &mut IndexSet<String>,
    ) -> Result<Option<IndexSet<String>>, RefineError> {
        let id = og.id.as_str();
        let faa = SeqKind::Protein.extension();
        let fna = SeqKind::Nucleotide.extension();
        let out = |suffix: String| outdir.join(format!("{}.{}", id, suffix));

        // Removed on drop, whichever way this function returns
        let scratch = tempfile::Builder::new()
            .prefix(&format!(".{}.round{}.", id, state.iteration))
            .tempdir_in(outdir)?;

        //----------------------------
        // Align
        //----------------------------
        let raw = store::subset(&og.protein, &state.surviving);
        let label = format!("{}.{}", id, faa);
        let protein = self.aligner.align(&label, &raw, scratch.path())?;
        if protein.ids() != state.surviving {
            return Err(RefineError::AlignerFailure {
                label,
                reason: "aligned identifiers differ from the input".to_string(),
            });
        }
        store::write(protein.rows(), out(format!("{}.aln", faa)))?;

        //----------------------------
        // Codons
        //----------------------------
        let codon = match &og.nucleotide {
            Some(cds) if self.config.nucleotide => {
                let (codon, skips) = codon::map_alignment(&protein, cds)?;
                for (seq, skip) in skips {
                    if skipped.insert(seq.clone()) {
                        log::warn!("{}: {} left out of the codon alignment: {}", id, seq, skip);
                        entries.push(Entry::new(
                            id,
                            Event::CodonSkip,
                            Some(&seq),
                            skip.to_string(),
                        ));
                    }
                }
                store::write(codon.rows(), out(format!("{}.aln", fna)))?;
                Some(codon)
            }
            _ => None,
        };

        //----------------------------
        // Trim
        //----------------------------
        let (Some(mode), Some(trimmer)) = (self.config.trim, self.trimmer) else {
            return Ok(None);
        };

        let protein_trim =
            trimmer.trim(&format!("{}.{}.aln", id, faa), &protein, mode, scratch.path())?;
        store::write(protein_trim.rows(), out(format!("{}.aln.trim", faa)))?;

        let codon_trim = match &codon {
            Some(aln) if aln.is_empty() => Some(Alignment::default()),
            Some(aln) => Some(trimmer.trim(
                &format!("{}.{}.aln", id, fna),
                aln,
                mode,
                scratch.path(),
            )?),
            None => None,
        };
        if let Some(aln) = &codon_trim {
            store::write(aln.rows(), out(format!("{}.aln.trim", fna)))?;
        }

        //----------------------------
        // Filter
        //----------------------------
        let partition = coverage::filter_paired(
            (&protein_trim, protein.width()),
            codon_trim.as_ref().zip(codon.as_ref().map(|aln| aln.width())),
            &state.surviving,
            self.config.min_coverage,
        )?;

        store::write(
            &store::subset(protein_trim.rows(), &partition.protein.retained),
            out(format!("{}.aln.trim.filter", faa)),
        )?;
        if let (Some(aln), Some(nt)) = (&codon_trim, &partition.nucleotide) {
            store::write(
                &store::subset(aln.rows(), &nt.retained),
                out(format!("{}.aln.trim.filter", fna)),
            )?;
        }

        self.record(id, state.iteration, &partition, entries);

        Ok(Some(partition.retained))
    }

    fn record(&self, id: &str, round: usize, partition: &PairedPartition, entries: &mut Vec<Entry>) {
        let describe = |seq: &str| {
            let mut detail = format!("round={}", round);
            if let Some(cov) = partition.protein.coverage.get(seq) {
                detail += &format!(" protein={:.4}", cov);
            }
            if let Some(cov) = partition
                .nucleotide
                .as_ref()
                .and_then(|nt| nt.coverage.get(seq))
            {
                detail += &format!(" nucleotide={:.4}", cov);
            }
            detail
        };

        for seq in &partition.discarded {
            log::debug!("{}: discarded {} ({})", id, seq, describe(seq));
            entries.push(Entry::new(id, Event::Discarded, Some(seq), describe(seq)));
        }
        for seq in &partition.divergent {
            log::warn!(
                "{}: protein and nucleotide coverage disagree for {} ({})",
                id,
                seq,
                describe(seq)
            );
            entries.push(Entry::new(id, Event::Divergent, Some(seq), describe(seq)));
        }
    }
}

/// Loads every orthogroup of `indir`.
///
/// With `nucleotide` set, the `.faa` and `.fna` files must pair up. Orthogroups
/// with fewer than [`MIN_MEMBERS`] sequences are returned as manifest entries
/// instead.
pub fn prepare<P: AsRef<Path>>(
    indir: P,
    nucleotide: bool,
) -> Result<(Vec<OrthogroupSet>, Vec<Entry>), RefineError> {
    let indir = indir.as_ref();
    let ids = if nucleotide {
        store::assert_dir_parity(indir)?
    } else {
        store::scan_dir(indir, SeqKind::Protein)?
    };

    let mut orthogroups = vec![];
    let mut excluded = vec![];
    for id in &ids {
        let og = OrthogroupSet::load(indir, id, nucleotide)?;
        if og.len() < MIN_MEMBERS {
            log::debug!("{}: {} sequences, excluded", id, og.len());
            excluded.push(Entry::new(
                id,
                Event::Excluded,
                None,
                format!("members={}", og.len()),
            ));
        } else {
            orthogroups.push(og);
        }
    }

    Ok((orthogroups, excluded))
}

/// Runs the loop over all orthogroups on `workers` threads.
///
/// The first fatal error stops the run. An orthogroup hitting a non-fatal one
/// ends as [`Status::Failed`] and the others carry on. Outcomes keep the input
/// order.
pub fn run_all(
    refiner: &RefinementLoop,
    orthogroups: &[OrthogroupSet],
    outdir: &Path,
    workers: usize,
) -> anyhow::Result<Vec<Outcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    let outcomes = pool.install(|| {
        orthogroups
            .par_iter()
            .map(|og| match refiner.run(og, outdir) {
                Err(err) if !err.is_fatal() => {
                    log::error!("{}: {}", og.id, err);
                    Ok(Outcome::failed(og, &err))
                }
                result => result,
            })
            .collect::<Result<Vec<_>, RefineError>>()
    })?;

    Ok(outcomes)
}
