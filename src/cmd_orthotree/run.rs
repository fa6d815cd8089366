use clap::*;
use orthotree::libs::config::Config;
use orthotree::libs::ids::load_workdir;
use orthotree::libs::pool::WorkerPool;
use orthotree::libs::species_tree::SpeciesTree;
use std::path::{Path, PathBuf};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("run")
        .about("Runs cluster, root and recon on one working directory")
        .after_help(
            r###"
The whole pipeline: orthogroups from the score matrices, a rooted species
tree, then reconciliation, orthologs, duplications, HOGs and statistics.

Notes:
* Gene trees are read from WorkingDirectory/Gene_Trees unless `--gene-trees`
  is given. They are named after the orthogroups of this run, so they must
  have been inferred for the same clustering.
* Species tree:
    * `--species-tree` - a rooted tree with species names, used as is and
      validated before anything else runs
    * `--tree`         - an unrooted tree with species IDs, rooted with
      the gene trees (see `orthotree root`)
    * neither is needed for two species

Examples:
1. orthotree run WorkingDirectory --tree SpeciesTree_unrooted.txt -p 8 -o Results

2. orthotree run WorkingDirectory --species-tree rooted.nwk --fewer-open-files

"###,
        )
        .arg(
            Arg::new("workdir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Working directory with the ID maps, score matrices and gene trees"),
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
            Arg::new("tree")
                .long("tree")
                .num_args(1)
                .conflicts_with("species_tree")
                .help("Unrooted species tree, leaves are species IDs"),
        )
        .arg(
            Arg::new("species_tree")
                .long("species-tree")
                .num_args(1)
                .help("Rooted species tree, leaves are species names"),
        )
        .arg(
            Arg::new("gene_trees")
                .long("gene-trees")
                .num_args(1)
                .help("Directory of gene trees [default: WORKDIR/Gene_Trees]"),
        )
        .arg(
            Arg::new("fewer_open_files")
                .long("fewer-open-files")
                .action(ArgAction::SetTrue)
                .help("One ortholog file per species instead of one per species pair"),
        )
        .arg(
            Arg::new("min_seq")
                .long("min-seq")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Smallest orthogroup analysed with a gene tree"),
        )
        .arg(
            Arg::new("split_paralogous_clades")
                .long("split-paralogous-clades")
                .action(ArgAction::SetTrue)
                .help("Split paralogous clades below speciation nodes into separate ortholog groups"),
        )
        .arg(
            Arg::new("hog_trees")
                .long("hog-trees")
                .action(ArgAction::SetTrue)
                .help("Also write the gene tree of every HOG"),
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
    let gene_trees = args
        .get_one::<String>("gene_trees")
        .map(PathBuf::from)
        .unwrap_or_else(|| workdir.join("Gene_Trees"));
    let pool = WorkerPool::new(config.threads)?;

    //----------------------------
    // Inputs
    //----------------------------
    let (species, seqs) = load_workdir(workdir)?;
    let user_tree = match args.get_one::<String>("species_tree") {
        Some(infile) => Some(SpeciesTree::from_file(infile, &species)?),
        None => None,
    };
    if user_tree.is_none() && !args.contains_id("tree") && species.len() > 2 {
        anyhow::bail!("--tree or --species-tree is needed for {} species", species.len());
    }
    // an unrooted tree is checked before clustering too
    let unrooted = if user_tree.is_some() {
        None
    } else {
        let tree_file = args.get_one::<String>("tree").map(|s| s.as_str());
        Some(super::root::unrooted_tree(&species, tree_file)?)
    };

    //----------------------------
    // Stages
    //----------------------------
    log::info!("Clustering");
    let ogs = super::cluster::run(workdir, &species, &seqs, &config, &pool, false)?;

    let species_tree = match (user_tree, unrooted) {
        (Some(tree), _) => tree,
        (None, Some(unrooted)) => {
            log::info!("Rooting the species tree");
            super::root::run(&species, &unrooted, &gene_trees, &config, &pool)?
        }
        (None, None) => anyhow::bail!("no species tree"),
    };

    log::info!("Reconciling gene trees");
    super::recon::run(&species, &seqs, &species_tree, &ogs, &gene_trees, &config, &pool)?;

    log::info!("Results in {}", config.outdir.display());
    Ok(())
}
