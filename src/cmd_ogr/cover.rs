use clap::*;
use ogr::libs::coverage;
use ogr::libs::store::{self, Alignment, SeqKind};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cover")
        .about("Reports per-sequence coverage of an alignment")
        .after_help(
            r###"
Coverage is the number of residues (not `-` or `.`) in a row divided by the
width of the alignment before trimming. Pass that alignment with --untrimmed;
without it the width of <infile> is used.

Output columns:
    #id  residues  width  coverage  status

`width` is the denominator of coverage.

`status` is `pass` when coverage >= --coverage, otherwise `fail`.

Examples:
1. Coverage of a trimmed alignment:
   ogr cover 1.faa.aln.trim

2. Against the alignment before trimming:
   ogr cover 1.faa.aln.trim --untrimmed 1.faa.aln

3. A stricter threshold:
   ogr cover 1.faa.aln.trim --coverage 0.8

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Aligned FASTA file"),
        )
        .arg(
            Arg::new("untrimmed")
                .long("untrimmed")
                .num_args(1)
                .help("The alignment before trimming"),
        )
        .arg(
            Arg::new("coverage")
                .long("coverage")
                .short('c')
                .num_args(1)
                .default_value("0.5")
                .value_parser(value_parser!(f64))
                .help("Minimum coverage, in (0.1, 1.0]"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let opt_coverage = *args.get_one::<f64>("coverage").unwrap();
    let mut writer = ogr::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let aln = Alignment::new(store::load(SeqKind::Protein, infile)?)?;
    let width = match args.get_one::<String>("untrimmed") {
        Some(untrimmed) => Alignment::new(store::load(SeqKind::Protein, untrimmed)?)?.width(),
        None => aln.width(),
    };
    let width = width.max(aln.width());
    let partition = coverage::filter(&aln, width, opt_coverage)?;

    //----------------------------
    // Output
    //----------------------------
    writer.write_all(b"#id\tresidues\twidth\tcoverage\tstatus\n")?;
    for (id, row) in aln.rows() {
        let status = if partition.passes(id) { "pass" } else { "fail" };
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{:.4}\t{}\n",
            id,
            coverage::residues(row),
            width,
            partition.coverage[id],
            status
        ))?;
    }

    Ok(())
}
