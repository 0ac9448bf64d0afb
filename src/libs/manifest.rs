use crate::libs::refine::Outcome;
use std::io::Write;
use std::path::Path;

/// Things worth telling the user about once a run has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Orthogroup with too few members to enter the loop
    Excluded,
    /// Sequence removed by the coverage filter
    Discarded,
    /// Sequence left out of the codon alignment
    CodonSkip,
    /// Protein and codon rows of one sequence disagree on coverage
    Divergent,
    /// Iteration cap reached before convergence
    NonConverged,
    /// Survivors fell below the minimum membership
    Depleted,
    /// Orthogroup abandoned after a non-fatal error
    Failed,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Event::Excluded => "excluded",
            Event::Discarded => "discarded",
            Event::CodonSkip => "codon_skip",
            Event::Divergent => "divergent",
            Event::NonConverged => "non_converged",
            Event::Depleted => "depleted",
            Event::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub orthogroup: String,
    pub event: Event,
    pub sequence: Option<String>,
    pub detail: String,
}

impl Entry {
    pub fn new(orthogroup: &str, event: Event, sequence: Option<&str>, detail: String) -> Self {
        Self {
            orthogroup: orthogroup.to_string(),
            event,
            sequence: sequence.map(|s| s.to_string()),
            detail,
        }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.orthogroup,
            self.event,
            self.sequence.as_deref().unwrap_or("."),
            self.detail
        )
    }
}

pub fn write_manifest<P: AsRef<Path>>(path: P, entries: &[Entry]) -> anyhow::Result<()> {
    let mut writer = crate::writer(path.as_ref())?;
    writer.write_all(b"#orthogroup\tevent\tsequence\tdetail\n")?;
    for entry in entries {
        writer.write_fmt(format_args!("{}\n", entry))?;
    }
    writer.flush()?;

    Ok(())
}

/// One line per refined orthogroup
pub fn write_summary<P: AsRef<Path>>(path: P, outcomes: &[Outcome]) -> anyhow::Result<()> {
    let mut writer = crate::writer(path.as_ref())?;
    writer.write_all(b"#orthogroup\tinput\tsurvivors\trounds\tstatus\n")?;
    for outcome in outcomes {
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\t{}\n",
            outcome.orthogroup,
            outcome.input,
            outcome.survivors.len(),
            outcome.rounds,
            outcome.status
        ))?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_line() {
        let e = Entry::new("12", Event::CodonSkip, Some("seqA"), "FrameMismatch".to_string());
        assert_eq!(e.to_string(), "12\tcodon_skip\tseqA\tFrameMismatch");

        let e = Entry::new("12", Event::NonConverged, None, "rounds=5".to_string());
        assert_eq!(e.to_string(), "12\tnon_converged\t.\trounds=5");
    }

    #[test]
    fn test_write_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.tsv");
        let entries = vec![
            Entry::new("1", Event::Excluded, None, "members=2".to_string()),
            Entry::new("2", Event::Discarded, Some("x"), "round=1".to_string()),
        ];
        write_manifest(&path, &entries).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("#orthogroup"));
        assert!(text.contains("2\tdiscarded\tx\tround=1\n"));
    }
}
