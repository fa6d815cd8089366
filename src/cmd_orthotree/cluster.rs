use clap::*;
use orthotree::libs::config::Config;
use orthotree::libs::graph;
use orthotree::libs::ids::{load_workdir, SequenceMap, SpeciesMap};
use orthotree::libs::matrix::MatrixStore;
use orthotree::libs::mcl::{self, MclParams};
use orthotree::libs::orthogroups::Orthogroups;
use orthotree::libs::pool::WorkerPool;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cluster")
        .about("Infers orthogroups: similarity graph, MCL and orthogroup tables")
        .after_help(
            r###"
Builds the similarity graph of a working directory, clusters it with MCL
and writes the orthogroup tables.

Notes:
* Outputs, under the output directory:
    * Orthogroups/Orthogroups.tsv, Orthogroups.txt, Orthogroups.GeneCount.tsv
    * Orthogroups/Orthogroups_UnassignedGenes.tsv, Orthogroups_SpeciesOverlaps.tsv
    * Orthogroups/Orthogroups_SequenceIDs.txt - input of `orthotree recon`
    * Orthogroups/clusters_I{inflation}.txt   - clusters in MCL format
    * Comparative_Genomics_Statistics/Statistics_PerSpecies.tsv
* Orthogroup order (`--order`):
    * size      - largest first, ties by smallest gene (default)
    * insertion - the order MCL found them
* Genes without any hit become single-gene orthogroups at the end.
* `--graph` keeps the MCL graph as WorkingDirectory/graph.txt.

Examples:
1. Default settings:
   orthotree cluster WorkingDirectory -o Results

2. Inflation 1.5 on 8 threads, keep the graph:
   orthotree cluster WorkingDirectory -I 1.5 -p 8 --graph -o Results

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
            Arg::new("inflation")
                .long("inflation")
                .short('I')
                .num_args(1)
                .default_value("1.2")
                .value_parser(value_parser!(f64))
                .help("MCL inflation parameter, greater than 1"),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .num_args(1)
                .default_value("size")
                .value_parser(["size", "insertion"])
                .help("Orthogroup numbering"),
        )
        .arg(
            Arg::new("graph")
                .long("graph")
                .action(ArgAction::SetTrue)
                .help("Keep the MCL graph file"),
        )
        .arg(super::arg_outdir("Results"))
        .arg(super::arg_parallel())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let config = Config::from_args(args)?;
    let workdir = Path::new(args.get_one::<String>("workdir").unwrap());
    let keep_graph = args.get_flag("graph");
    let pool = WorkerPool::new(config.threads)?;

    //----------------------------
    // Ops
    //----------------------------
    let (species, seqs) = load_workdir(workdir)?;
    run(workdir, &species, &seqs, &config, &pool, keep_graph)?;

    Ok(())
}

/// Graph, clusters and tables. Returns the orthogroups.
pub fn run(
    workdir: &Path,
    species: &SpeciesMap,
    seqs: &SequenceMap,
    config: &Config,
    pool: &WorkerPool,
    keep_graph: bool,
) -> anyhow::Result<Orthogroups> {
    let store = MatrixStore::new(workdir, seqs.counts());

    let graph = if keep_graph {
        let dir = config.outdir.join("WorkingDirectory");
        orthotree::libs::io::create_dir(&dir)?;
        let graph = graph::build(&store, seqs.counts(), pool, Some(&dir))?;
        let outfile = dir.join("graph.txt");
        graph::merge_shards(&dir, species.len(), graph.n_nodes(), &outfile.display().to_string())?;
        for i in 0..species.len() {
            std::fs::remove_file(graph::shard_path(&dir, i))?;
        }
        graph
    } else {
        graph::build(&store, seqs.counts(), pool, None)?
    };
    log::info!("Graph: {} genes, {} edges", graph.n_nodes(), graph.n_edges());

    let params = MclParams::with_inflation(config.inflation);
    let clusters = mcl::cluster(&graph, &params, pool);
    let ogs = Orthogroups::from_clusters(clusters, seqs, config.og_order);
    log::info!(
        "{} orthogroups, {} genes assigned to multi-gene orthogroups",
        ogs.len(),
        ogs.n_assigned()
    );

    let og_dir = config.outdir.join("Orthogroups");
    ogs.write_tables(&og_dir, species, seqs)?;
    ogs.write_clusters(&og_dir.join(format!("clusters_I{}.txt", config.inflation)), seqs)?;
    orthotree::libs::io::write_file(
        &config
            .outdir
            .join("Comparative_Genomics_Statistics")
            .join("Statistics_PerSpecies.tsv"),
        &ogs.species_statistics(species, seqs),
    )?;

    Ok(ogs)
}
