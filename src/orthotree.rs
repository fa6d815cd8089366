extern crate clap;
use clap::*;

mod cmd_orthotree;

fn main() -> anyhow::Result<()> {
    let app = Command::new("orthotree")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`orthotree` - Orthogroups, rooted species trees and gene-tree reconciliation")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Verbosity: -v for progress, -vv for debug messages"),
        )
        .subcommand(cmd_orthotree::graph::make_subcommand())
        .subcommand(cmd_orthotree::mcl::make_subcommand())
        .subcommand(cmd_orthotree::cluster::make_subcommand())
        .subcommand(cmd_orthotree::root::make_subcommand())
        .subcommand(cmd_orthotree::recon::make_subcommand())
        .subcommand(cmd_orthotree::hog_trees::make_subcommand())
        .subcommand(cmd_orthotree::stats::make_subcommand())
        .subcommand(cmd_orthotree::run::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Orthogroups:
    * graph   - Score matrices to an MCL graph file
    * mcl     - Markov clustering of an MCL graph file
    * cluster - Graph, MCL and orthogroup tables

* Species tree:
    * root - Root a species tree with gene duplications

* Orthologs:
    * recon     - Reconcile gene trees: orthologs, duplications, HOGs
    * hog-trees - Gene trees of hierarchical orthogroups
    * stats     - Duplication statistics

* Pipelines:
    * run - cluster, root, recon in one working directory

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("graph", sub_matches)) => cmd_orthotree::graph::execute(sub_matches),
        Some(("mcl", sub_matches)) => cmd_orthotree::mcl::execute(sub_matches),
        Some(("cluster", sub_matches)) => cmd_orthotree::cluster::execute(sub_matches),
        Some(("root", sub_matches)) => cmd_orthotree::root::execute(sub_matches),
        Some(("recon", sub_matches)) => cmd_orthotree::recon::execute(sub_matches),
        Some(("hog-trees", sub_matches)) => cmd_orthotree::hog_trees::execute(sub_matches),
        Some(("stats", sub_matches)) => cmd_orthotree::stats::execute(sub_matches),
        Some(("run", sub_matches)) => cmd_orthotree::run::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
