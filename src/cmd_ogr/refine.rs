use clap::*;
use ogr::libs::external::{Aligner, Mafft, Muscle, TrimAl, TrimMode, Trimmer};
use ogr::libs::manifest;
use ogr::libs::refine::{self, RefineConfig, RefinementLoop, Status};
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("refine")
        .about("Iteratively align, trim and filter orthogroups")
        .after_help(
            r###"
Refines the alignment of every orthogroup found in <indir>.

* <indir> holds one `N.faa` per orthogroup `N`, and `N.fna` with --nt
    * Orthogroups with fewer than 3 sequences are skipped
    * With --nt every `.faa` needs a `.fna` with the same identifiers
    * Gzipped `N.faa.gz` / `N.fna.gz` are accepted

* Each round aligns the current sequences, back-translates them into codons (--nt),
  trims the alignments and drops sequences whose coverage is below --coverage.
  Coverage is the number of residues left after trimming divided by the row length
  before trimming.
  Rounds repeat with the survivors until none is dropped or --max-iter is reached.

* Trimming is either `--automated` (trimAl -automated1) or `--gt F` (trimAl -gt F).
  `--gt F` keeps the columns where at least a fraction F of the sequences have no gap.
  Without either, every orthogroup is aligned once.

* Outputs in <outdir>:
    * N.faa.aln / N.fna.aln
    * N.faa.aln.trim / N.fna.aln.trim
    * N.faa.aln.trim.filter / N.fna.aln.trim.filter
    * manifest.tsv - excluded orthogroups, discarded and skipped sequences, non-converged
      and failed orthogroups
    * summary.tsv  - one line per refined orthogroup

* --parallel is the total number of CPUs; each external tool gets --threads of them

* This pipeline depends on `mafft` (or `muscle`) and `trimal`

Examples:
1. Protein only, automated trimming:
   ogr refine orthogroups/ --automated -o refined

2. Codon alignments, gap threshold, 16 CPUs in total:
   ogr refine orthogroups/ --nt --gt 0.6 --coverage 0.5 --parallel 16 --threads 2

"###,
        )
        .arg(
            Arg::new("indir")
                .required(true)
                .index(1)
                .help("Directory containing N.faa (and N.fna) files"),
        )
        .arg(
            Arg::new("nt")
                .long("nt")
                .action(ArgAction::SetTrue)
                .help("Also build codon alignments from N.fna"),
        )
        .arg(
            Arg::new("coverage")
                .long("coverage")
                .short('c')
                .num_args(1)
                .default_value("0.5")
                .value_parser(value_parser!(f64))
                .help("Minimum fraction of non-gap columns in a trimmed row, in (0.1, 1.0]"),
        )
        .arg(
            Arg::new("automated")
                .long("automated")
                .action(ArgAction::SetTrue)
                .help("Trim with trimAl's automated heuristic"),
        )
        .arg(
            Arg::new("gt")
                .long("gt")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .conflicts_with("automated")
                .help("Keep columns with at least this fraction of ungapped sequences, in [0.0, 1.0]"),
        )
        .arg(
            Arg::new("max_iter")
                .long("max-iter")
                .num_args(1)
                .default_value("5")
                .value_parser(value_parser!(usize))
                .help("Maximum number of rounds"),
        )
        .arg(
            Arg::new("aligner")
                .long("aligner")
                .value_parser(["mafft", "muscle"])
                .default_value("mafft")
                .help("External aligner"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of CPUs in total"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads of each external tool"),
        )
        .arg(
            Arg::new("outdir")
                .short('o')
                .long("outdir")
                .num_args(1)
                .default_value("refined")
                .help("Output location"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let indir = args.get_one::<String>("indir").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    let opt_threads = (*args.get_one::<usize>("threads").unwrap()).max(1);

    let trim = if args.get_flag("automated") {
        Some(TrimMode::Automated)
    } else {
        args.get_one::<f64>("gt").map(|gt| TrimMode::GapThreshold(*gt))
    };

    let config = RefineConfig {
        min_coverage: *args.get_one::<f64>("coverage").unwrap(),
        trim,
        max_iter: *args.get_one::<usize>("max_iter").unwrap(),
        nucleotide: args.get_flag("nt"),
    };
    config.validate()?;

    let (orthogroups, mut entries) = refine::prepare(indir, config.nucleotide)?;
    log::info!(
        "{} orthogroups to refine, {} excluded",
        orthogroups.len(),
        entries.len()
    );

    //----------------------------
    // Tools
    //----------------------------
    let aligner: Box<dyn Aligner> = match args.get_one::<String>("aligner").unwrap().as_str() {
        "muscle" => Box::new(Muscle::new(opt_threads)?),
        _ => Box::new(Mafft::new(opt_threads)?),
    };
    let trimmer = match config.trim {
        Some(_) => Some(TrimAl::new()?),
        None => None,
    };
    log::info!(
        "aligner = {}, trimmer = {}",
        aligner.name(),
        trimmer.as_ref().map(|t| t.name()).unwrap_or("none")
    );

    let refiner = RefinementLoop::new(
        config,
        aligner.as_ref(),
        trimmer.as_ref().map(|t| t as &dyn Trimmer),
    )?;

    //----------------------------
    // Operating
    //----------------------------
    std::fs::create_dir_all(outdir)?;
    let workers = (opt_parallel / opt_threads).max(1);
    let outcomes = refine::run_all(&refiner, &orthogroups, Path::new(outdir), workers)?;

    //----------------------------
    // Output
    //----------------------------
    for outcome in &outcomes {
        entries.extend(outcome.entries.iter().cloned());
    }
    manifest::write_manifest(Path::new(outdir).join("manifest.tsv"), &entries)?;
    manifest::write_summary(Path::new(outdir).join("summary.tsv"), &outcomes)?;

    let count = |status: Status| outcomes.iter().filter(|o| o.status == status).count();
    log::info!(
        "==> {} converged, {} not converged, {} depleted, {} failed",
        count(Status::Converged),
        count(Status::NonConverged),
        count(Status::Depleted),
        count(Status::Failed)
    );

    Ok(())
}
