use clap::*;
use orthotree::libs::hog;
use orthotree::libs::pool::WorkerPool;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("hog-trees")
        .about("Cuts the gene tree of every HOG out of the resolved gene trees")
        .after_help(
            r###"
Reads the HOG tables and writes one tree per HOG: the gene tree clade named
in `Gene Tree Parent Clade`, pruned to the genes of the HOG.

Notes:
* The gene trees are the rooted, labelled trees of `orthotree recon`
  (Resolved_Gene_Trees/), whose internal nodes are n0, n1, ...
* Rows without a clade (`-`, orthogroups of 2 or 3 genes) have no tree.
* A clade missing from its gene tree is reported and the row skipped.
* Output: {HOG}_tree.txt, e.g. N1.HOG0000003_tree.txt

Examples:
1. orthotree hog-trees Results/Phylogenetic_Hierarchical_Orthogroups \
       --gene-trees Results/Resolved_Gene_Trees -o Results/Resolved_HOG_Trees

"###,
        )
        .arg(
            Arg::new("hog_dir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Directory of N{k}.tsv HOG tables"),
        )
        .arg(
            Arg::new("gene_trees")
                .long("gene-trees")
                .num_args(1)
                .required(true)
                .help("Directory of resolved gene trees"),
        )
        .arg(super::arg_outdir("Resolved_HOG_Trees"))
        .arg(super::arg_parallel())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let hog_dir = Path::new(args.get_one::<String>("hog_dir").unwrap());
    let gene_trees = Path::new(args.get_one::<String>("gene_trees").unwrap());
    let outdir = Path::new(args.get_one::<String>("outdir").unwrap());
    let pool = WorkerPool::new(*args.get_one::<usize>("parallel").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let n = hog::write_hog_trees(hog_dir, gene_trees, outdir, &pool)?;
    log::info!("{} HOG trees written to {}", n, outdir.display());

    Ok(())
}
