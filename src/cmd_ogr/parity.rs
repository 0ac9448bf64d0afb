use clap::*;
use ogr::libs::store::{self, OrthogroupSet};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("parity")
        .about("Checks that protein and coding sequence files pair up")
        .after_help(
            r###"
Every `N.faa` in <indir> needs an `N.fna`, and the reverse.
The two files of an orthogroup must hold the same identifiers.

Prints `N<TAB>members` for each orthogroup; exits with an error on the first mismatch.

"###,
        )
        .arg(
            Arg::new("indir")
                .required(true)
                .index(1)
                .help("Directory containing N.faa and N.fna files"),
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
    let indir = args.get_one::<String>("indir").unwrap();
    let mut writer = ogr::writer(args.get_one::<String>("outfile").unwrap())?;

    let ids = store::assert_dir_parity(indir)?;
    for id in &ids {
        let og = OrthogroupSet::load(indir, id, true)?;
        writer.write_fmt(format_args!("{}\t{}\n", id, og.len()))?;
    }

    Ok(())
}
