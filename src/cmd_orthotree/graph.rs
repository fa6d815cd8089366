use clap::*;
use orthotree::libs::graph;
use orthotree::libs::ids::load_workdir;
use orthotree::libs::matrix::MatrixStore;
use orthotree::libs::pool::WorkerPool;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("graph")
        .about("Builds the MCL similarity graph from per-species score matrices")
        .after_help(
            r###"
Combines the score matrices of a working directory into one symmetric,
weighted graph in MCL matrix format.

Notes:
* The working directory holds:
    * SpeciesIDs.txt   - `0: Name.fa` lines
    * SequenceIDs.txt  - `0_5: accession description` lines
    * Scores{i}_{j}.tsv[.gz] - `query<TAB>hit<TAB>score`, one per ordered species pair
* A gene pair is joined when either direction has a hit; the weight is the
  sum of both directions.
* Each species is processed by one worker into its own shard; shards are
  concatenated in species order.

Examples:
1. Write the graph to a file:
   orthotree graph WorkingDirectory -o graph.txt

2. Use four threads:
   orthotree graph WorkingDirectory -p 4 -o graph.txt

"###,
        )
        .arg(
            Arg::new("workdir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Working directory with the ID maps and score matrices"),
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
    let workdir = Path::new(args.get_one::<String>("workdir").unwrap());
    let outfile = args.get_one::<String>("outfile").unwrap();
    let pool = WorkerPool::new(*args.get_one::<usize>("parallel").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let (species, seqs) = load_workdir(workdir)?;
    let store = MatrixStore::new(workdir, seqs.counts());

    let shards = tempfile::TempDir::new()?;
    let graph = graph::build(&store, seqs.counts(), &pool, Some(shards.path()))?;
    graph::merge_shards(shards.path(), species.len(), graph.n_nodes(), outfile)?;

    log::info!(
        "{} nodes and {} edges written to {}",
        graph.n_nodes(),
        graph.n_edges(),
        outfile
    );

    Ok(())
}
