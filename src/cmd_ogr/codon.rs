use clap::*;
use ogr::libs::codon;
use ogr::libs::store::{self, Alignment, SeqKind};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("codon")
        .about("Back-translates a protein alignment into a codon alignment")
        .after_help(
            r###"
Builds a codon alignment from an aligned protein file and the raw coding sequences.

Notes:
* Both files must contain the same identifiers
* A gap column becomes `---`; an `X` or `?` column becomes `???` and uses up one codon
* A trailing stop codon is dropped when it is the only extra codon
* Sequences whose coding sequence doesn't fit the protein are left out
  and reported as InsufficientCodons or FrameMismatch
* Supports both plain text and gzipped (.gz) files

Examples:
1. Write the codon alignment to the screen:
   ogr codon 1.faa.aln 1.fna

2. Write to a file:
   ogr codon 1.faa.aln 1.fna -o 1.fna.aln

"###,
        )
        .arg(
            Arg::new("protein")
                .required(true)
                .index(1)
                .help("Aligned protein file"),
        )
        .arg(
            Arg::new("cds")
                .required(true)
                .index(2)
                .help("Raw coding sequences"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("protein").unwrap();
    let cdsfile = args.get_one::<String>("cds").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();

    //----------------------------
    // Ops
    //----------------------------
    let protein = store::load(SeqKind::Protein, infile)?;
    let cds = store::load(SeqKind::Nucleotide, cdsfile)?;
    store::assert_identifier_parity(&protein, &cds, infile)?;

    let protein = Alignment::new(protein)?;
    let (aln, skipped) = codon::map_alignment(&protein, &cds)?;
    for (id, skip) in &skipped {
        log::warn!("{} skipped: {}", id, skip);
    }

    //----------------------------
    // Output
    //----------------------------
    store::write(aln.rows(), outfile)?;

    Ok(())
}
