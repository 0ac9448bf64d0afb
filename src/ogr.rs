extern crate clap;
use clap::*;

mod cmd_ogr;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("ogr")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`ogr` - Orthogroup Refiner")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_ogr::refine::make_subcommand())
        .subcommand(cmd_ogr::codon::make_subcommand())
        .subcommand(cmd_ogr::cover::make_subcommand())
        .subcommand(cmd_ogr::parity::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Pipeline:
    * refine - Align, trim and filter orthogroups until nothing changes

* Single steps:
    * codon  - Back-translate a protein alignment into a codon alignment
    * cover  - Per-sequence coverage of an alignment
    * parity - Check that .faa and .fna files pair up

Set RUST_LOG=debug to see every discarded or skipped sequence.

"###,
        );

    // Check which subcommand the user ran...
    match app.get_matches().subcommand() {
        Some(("refine", sub_matches)) => cmd_ogr::refine::execute(sub_matches),
        Some(("codon", sub_matches)) => cmd_ogr::codon::execute(sub_matches),
        Some(("cover", sub_matches)) => cmd_ogr::cover::execute(sub_matches),
        Some(("parity", sub_matches)) => cmd_ogr::parity::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
