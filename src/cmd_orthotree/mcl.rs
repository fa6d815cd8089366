use clap::*;
use itertools::Itertools;
use orthotree::libs::graph;
use orthotree::libs::mcl::{self, MclParams};
use orthotree::libs::pool::WorkerPool;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("mcl")
        .about("Markov clustering of a graph in MCL matrix format")
        .after_help(
            r###"
Clusters an existing MCL matrix file, e.g. the output of `orthotree graph`.

Notes:
* Each output line is one cluster: tab-separated node indices, ascending.
* Clusters are ordered by their smallest node.
* Nodes without edges are not reported.
* Higher inflation gives more, smaller clusters.

Examples:
1. Default inflation (1.2):
   orthotree mcl graph.txt

2. Tighter clusters:
   orthotree mcl graph.txt -I 2.0 -o clusters.tsv

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input filename. [stdin] for standard input"),
        )
        .arg(
            Arg::new("inflation")
                .long("inflation")
                .short('I')
                .num_args(1)
                .default_value("1.2")
                .value_parser(value_parser!(f64))
                .help("MCL inflation parameter, greater than 1"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
        .arg(super::arg_parallel())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let config = orthotree::libs::config::Config::from_args(args)?;
    let mut writer = orthotree::writer(args.get_one::<String>("outfile").unwrap())?;
    let pool = WorkerPool::new(config.threads)?;

    //----------------------------
    // Ops
    //----------------------------
    let graph = graph::read_mcl(args.get_one::<String>("infile").unwrap())?;
    let clusters = mcl::cluster(&graph, &MclParams::with_inflation(config.inflation), &pool);

    //----------------------------
    // Output
    //----------------------------
    for cluster in &clusters {
        writer.write_fmt(format_args!("{}\n", cluster.iter().join("\t")))?;
    }
    writer.flush()?;

    Ok(())
}
